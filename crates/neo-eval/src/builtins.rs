//! The allow-listed built-in functions.
//!
//! Student code sees exactly these names (plus `True`, `False`, `None` and
//! whatever the host adds, such as `print`). Nothing here touches I/O.

use std::cmp::Ordering;

use crate::env::Builtins;
use crate::error::{EvalResult, RuntimeError};
use crate::evaluator::Evaluator;
use crate::ops;
use crate::value::{repr_str, CallArgs, Dict, Number, Range, Value};

/// An allow-listed built-in callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    // Types
    Int,
    Float,
    Str,
    Bool,
    List,
    Tuple,
    Dict,
    Set,
    // Functions
    Range,
    Len,
    Abs,
    Min,
    Max,
    Round,
    Sorted,
    Reversed,
    Enumerate,
    Zip,
    Map,
    Filter,
}

impl Builtin {
    pub const ALL: [Builtin; 20] = [
        Builtin::Int,
        Builtin::Float,
        Builtin::Str,
        Builtin::Bool,
        Builtin::List,
        Builtin::Tuple,
        Builtin::Dict,
        Builtin::Set,
        Builtin::Range,
        Builtin::Len,
        Builtin::Abs,
        Builtin::Min,
        Builtin::Max,
        Builtin::Round,
        Builtin::Sorted,
        Builtin::Reversed,
        Builtin::Enumerate,
        Builtin::Zip,
        Builtin::Map,
        Builtin::Filter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Str => "str",
            Builtin::Bool => "bool",
            Builtin::List => "list",
            Builtin::Tuple => "tuple",
            Builtin::Dict => "dict",
            Builtin::Set => "set",
            Builtin::Range => "range",
            Builtin::Len => "len",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Round => "round",
            Builtin::Sorted => "sorted",
            Builtin::Reversed => "reversed",
            Builtin::Enumerate => "enumerate",
            Builtin::Zip => "zip",
            Builtin::Map => "map",
            Builtin::Filter => "filter",
        }
    }

    /// Whether the name is a type constructor (`<class 'int'>`).
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Builtin::Int
                | Builtin::Float
                | Builtin::Str
                | Builtin::Bool
                | Builtin::List
                | Builtin::Tuple
                | Builtin::Dict
                | Builtin::Set
                | Builtin::Range
                | Builtin::Reversed
                | Builtin::Enumerate
                | Builtin::Zip
                | Builtin::Map
                | Builtin::Filter
        )
    }
}

/// The built-ins table: every [`Builtin`] plus `True`, `False` and `None`.
pub fn builtin_table() -> Builtins {
    let mut table: Builtins = Builtin::ALL
        .iter()
        .map(|b| (b.name().to_string(), Value::Builtin(*b)))
        .collect();
    table.insert("True".to_string(), Value::Bool(true));
    table.insert("False".to_string(), Value::Bool(false));
    table.insert("None".to_string(), Value::None);
    table
}

/// Call a built-in.
pub(crate) fn call_builtin(ev: &mut Evaluator, builtin: Builtin, mut args: CallArgs) -> EvalResult<Value> {
    let name = builtin.name();
    match builtin {
        Builtin::Int => {
            let base = args.take_keyword("base");
            args.reject_keywords(name)?;
            args.expect_count(name, 0, 2)?;
            let mut positional = args.positional.into_iter();
            let value = positional.next();
            let base = positional.next().or(base);
            match (value, base) {
                (None, None) => Ok(Value::Int(0)),
                (None, Some(_)) => Err(RuntimeError::type_error("int() missing string argument")),
                (Some(value), None) => to_int(&value).map(Value::Int),
                (Some(Value::Str(s)), Some(base)) => {
                    let base = base.as_index().ok_or_else(|| {
                        RuntimeError::type_error(format!(
                            "'{}' object cannot be interpreted as an integer",
                            base.type_name()
                        ))
                    })?;
                    parse_int(&s, base).map(Value::Int)
                }
                (Some(_), Some(_)) => Err(RuntimeError::type_error(
                    "int() can't convert non-string with explicit base",
                )),
            }
        }
        Builtin::Float => {
            args.reject_keywords(name)?;
            args.expect_count(name, 0, 1)?;
            match args.positional.first() {
                Some(value) => to_float(value).map(Value::Float),
                None => Ok(Value::Float(0.0)),
            }
        }
        Builtin::Str => {
            args.reject_keywords(name)?;
            args.expect_count(name, 0, 1)?;
            match args.positional.first() {
                Some(value) => value.to_str().map(Value::str),
                None => Ok(Value::str("")),
            }
        }
        Builtin::Bool => {
            args.reject_keywords(name)?;
            args.expect_count(name, 0, 1)?;
            Ok(Value::Bool(
                args.positional.first().is_some_and(Value::is_truthy),
            ))
        }
        Builtin::List => {
            args.reject_keywords(name)?;
            args.expect_count(name, 0, 1)?;
            match args.positional.first() {
                Some(iterable) => Ok(Value::list(ops::collect(iterable)?)),
                None => Ok(Value::list(Vec::new())),
            }
        }
        Builtin::Tuple => {
            args.reject_keywords(name)?;
            args.expect_count(name, 0, 1)?;
            match args.positional.first() {
                Some(Value::Tuple(items)) => Ok(Value::Tuple(items.clone())),
                Some(iterable) => Ok(Value::tuple(ops::collect(iterable)?)),
                None => Ok(Value::tuple(Vec::new())),
            }
        }
        Builtin::Set => {
            args.reject_keywords(name)?;
            args.expect_count(name, 0, 1)?;
            match args.positional.first() {
                Some(iterable) => Ok(Value::set(Dict::from_keys(ops::collect(iterable)?)?)),
                None => Ok(Value::set(Dict::new())),
            }
        }
        Builtin::Dict => {
            args.expect_count(name, 0, 1)?;
            let mut dict = Dict::new();
            if let Some(source) = args.positional.first() {
                update_dict(&mut dict, source)?;
            }
            for (key, value) in args.keywords {
                dict.insert(Value::str(key), value)?;
            }
            Ok(Value::dict(dict))
        }
        Builtin::Range => {
            args.reject_keywords(name)?;
            args.expect_count(name, 1, 3)?;
            let ints = args
                .positional
                .iter()
                .map(|v| {
                    v.as_index().ok_or_else(|| {
                        RuntimeError::type_error(format!(
                            "'{}' object cannot be interpreted as an integer",
                            v.type_name()
                        ))
                    })
                })
                .collect::<EvalResult<Vec<i64>>>()?;
            let (start, stop, step) = match ints.as_slice() {
                [stop] => (0, *stop, 1),
                [start, stop] => (*start, *stop, 1),
                [start, stop, step, ..] => (*start, *stop, *step),
                [] => (0, 0, 1),
            };
            if step == 0 {
                return Err(RuntimeError::value_error("range() arg 3 must not be zero"));
            }
            Ok(Value::Range(Range { start, stop, step }))
        }
        Builtin::Len => {
            args.reject_keywords(name)?;
            args.expect_count(name, 1, 1)?;
            ops::length(&args.positional[0]).map(Value::Int)
        }
        Builtin::Abs => {
            args.reject_keywords(name)?;
            args.expect_count(name, 1, 1)?;
            let value = &args.positional[0];
            match value.as_number() {
                Some(Number::Int(n)) => n
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| RuntimeError::overflow("integer result too large")),
                Some(Number::Float(f)) => Ok(Value::Float(f.abs())),
                None => Err(RuntimeError::type_error(format!(
                    "bad operand type for abs(): '{}'",
                    value.type_name()
                ))),
            }
        }
        Builtin::Min => min_max(ev, args, Ordering::Less),
        Builtin::Max => min_max(ev, args, Ordering::Greater),
        Builtin::Round => {
            let ndigits = args.take_keyword("ndigits");
            args.reject_keywords(name)?;
            args.expect_count(name, 1, 2)?;
            let ndigits = args.positional.get(1).cloned().or(ndigits);
            round(&args.positional[0], ndigits.as_ref())
        }
        Builtin::Sorted => {
            let key = args.take_keyword("key");
            let reverse = args.take_keyword("reverse");
            args.reject_keywords(name)?;
            if args.len() != 1 {
                return Err(RuntimeError::type_error(format!(
                    "sorted expected 1 argument, got {}",
                    args.len()
                )));
            }
            let items = ops::collect(&args.positional[0])?;
            let reverse = reverse.is_some_and(|r| r.is_truthy());
            sort_values(ev, items, key.as_ref(), reverse).map(Value::list)
        }
        Builtin::Reversed => {
            args.reject_keywords(name)?;
            args.expect_count(name, 1, 1)?;
            let seq = &args.positional[0];
            let mut items = match seq {
                Value::List(_)
                | Value::Tuple(_)
                | Value::Str(_)
                | Value::Range(_)
                | Value::Dict(_)
                | Value::DictView(..) => ops::collect(seq)?,
                _ => {
                    return Err(RuntimeError::type_error(format!(
                        "'{}' object is not reversible",
                        seq.type_name()
                    )))
                }
            };
            items.reverse();
            let kind = if matches!(seq, Value::List(_)) {
                "list_reverseiterator"
            } else {
                "reversed"
            };
            Ok(Value::iterator(kind, items))
        }
        Builtin::Enumerate => {
            let start = args.take_keyword("start");
            args.reject_keywords(name)?;
            args.expect_count(name, 1, 2)?;
            let start = args.positional.get(1).cloned().or(start);
            let mut index = match start {
                Some(v) => v.as_index().ok_or_else(|| {
                    RuntimeError::type_error(format!(
                        "'{}' object cannot be interpreted as an integer",
                        v.type_name()
                    ))
                })?,
                None => 0,
            };
            let mut pairs = Vec::new();
            for item in ops::iterate(&args.positional[0])? {
                pairs.push(Value::tuple(vec![Value::Int(index), item]));
                index += 1;
            }
            Ok(Value::iterator("enumerate", pairs))
        }
        Builtin::Zip => {
            args.reject_keywords(name)?;
            let mut iters = args
                .positional
                .iter()
                .map(ops::iterate)
                .collect::<EvalResult<Vec<_>>>()?;
            let mut rows = Vec::new();
            if !iters.is_empty() {
                'rows: loop {
                    let mut row = Vec::with_capacity(iters.len());
                    for iter in iters.iter_mut() {
                        match iter.next() {
                            Some(item) => row.push(item),
                            None => break 'rows,
                        }
                    }
                    rows.push(Value::tuple(row));
                }
            }
            Ok(Value::iterator("zip", rows))
        }
        Builtin::Map => {
            args.reject_keywords(name)?;
            if args.len() < 2 {
                return Err(RuntimeError::type_error(
                    "map() must have at least two arguments.",
                ));
            }
            let mut positional = args.positional.into_iter();
            let func = positional.next().unwrap_or(Value::None);
            let mut iters = positional
                .map(|v| ops::iterate(&v))
                .collect::<EvalResult<Vec<_>>>()?;
            let mut results = Vec::new();
            'items: loop {
                let mut call_args = Vec::with_capacity(iters.len());
                for iter in iters.iter_mut() {
                    match iter.next() {
                        Some(item) => call_args.push(item),
                        None => break 'items,
                    }
                }
                results.push(ev.call_value(&func, CallArgs::new(call_args))?);
            }
            Ok(Value::iterator("map", results))
        }
        Builtin::Filter => {
            args.reject_keywords(name)?;
            args.expect_count(name, 2, 2)?;
            let func = &args.positional[0];
            let mut kept = Vec::new();
            for item in ops::iterate(&args.positional[1])? {
                let keep = if func.is_none() {
                    item.is_truthy()
                } else {
                    ev.call_value(func, CallArgs::new(vec![item.clone()]))?
                        .is_truthy()
                };
                if keep {
                    kept.push(item);
                }
            }
            Ok(Value::iterator("filter", kept))
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Conversions
// ══════════════════════════════════════════════════════════════════════════════

/// `int(value)`: truncates floats and parses decimal strings.
pub fn to_int(value: &Value) -> EvalResult<i64> {
    match value {
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Int(n) => Ok(*n),
        Value::Float(f) => float_to_int(*f),
        Value::Str(s) => parse_int(s, 10),
        _ => Err(RuntimeError::type_error(format!(
            "int() argument must be a string, a bytes-like object or a real number, not '{}'",
            value.type_name()
        ))),
    }
}

fn float_to_int(f: f64) -> EvalResult<i64> {
    if f.is_nan() {
        return Err(RuntimeError::value_error("cannot convert float NaN to integer"));
    }
    if f.is_infinite() {
        return Err(RuntimeError::overflow("cannot convert float infinity to integer"));
    }
    let t = f.trunc();
    if t < -9.223_372_036_854_776e18 || t >= 9.223_372_036_854_776e18 {
        return Err(RuntimeError::overflow("int too large to convert"));
    }
    Ok(t as i64)
}

/// Parse an integer literal the way `int(text, base)` does.
pub fn parse_int(text: &str, base: i64) -> EvalResult<i64> {
    let invalid = || {
        RuntimeError::value_error(format!(
            "invalid literal for int() with base {base}: {}",
            repr_str(text)
        ))
    };
    if base != 0 && !(2..=36).contains(&base) {
        return Err(RuntimeError::value_error("int() base must be >= 2 and <= 36, or 0"));
    }
    let trimmed = text.trim();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let lower = rest.to_ascii_lowercase();
    let (radix, digits, prefixed) = match (base, lower.get(..2)) {
        (0 | 16, Some("0x")) => (16, &rest[2..], true),
        (0 | 8, Some("0o")) => (8, &rest[2..], true),
        (0 | 2, Some("0b")) => (2, &rest[2..], true),
        (0, _) => (10, rest, false),
        (b, _) => (b as u32, rest, false),
    };
    let digits = match digits.strip_prefix('_') {
        Some(after) if prefixed => after,
        _ => digits,
    };
    if digits.is_empty()
        || digits.starts_with(['_', '+', '-'])
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return Err(invalid());
    }
    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    let magnitude = u64::from_str_radix(&cleaned, radix).map_err(|e| {
        use std::num::IntErrorKind;
        match e.kind() {
            IntErrorKind::PosOverflow => RuntimeError::overflow("int too large to convert"),
            _ => invalid(),
        }
    })?;
    if negative {
        0i64.checked_sub_unsigned(magnitude)
            .ok_or_else(|| RuntimeError::overflow("int too large to convert"))
    } else {
        i64::try_from(magnitude).map_err(|_| RuntimeError::overflow("int too large to convert"))
    }
}

/// `float(value)`
pub fn to_float(value: &Value) -> EvalResult<f64> {
    match value {
        Value::Bool(b) => Ok(f64::from(u8::from(*b))),
        Value::Int(n) => Ok(*n as f64),
        Value::Float(f) => Ok(*f),
        Value::Str(s) => parse_float(s),
        _ => Err(RuntimeError::type_error(format!(
            "float() argument must be a string or a real number, not '{}'",
            value.type_name()
        ))),
    }
}

fn parse_float(text: &str) -> EvalResult<f64> {
    let invalid = || {
        RuntimeError::value_error(format!(
            "could not convert string to float: {}",
            repr_str(text)
        ))
    };
    let trimmed = text.trim();
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    let lower = unsigned.to_ascii_lowercase();
    if matches!(lower.as_str(), "inf" | "infinity" | "nan") {
        return trimmed.to_ascii_lowercase().parse::<f64>().map_err(|_| invalid());
    }
    let ok_chars = unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-' | '_'));
    let bad_underscore = trimmed.split('_').skip(1).any(|part| {
        !part.starts_with(|c: char| c.is_ascii_digit())
    }) || trimmed
        .split('_')
        .rev()
        .skip(1)
        .any(|part| !part.ends_with(|c: char| c.is_ascii_digit()));
    if trimmed.is_empty() || !ok_chars || bad_underscore {
        return Err(invalid());
    }
    trimmed.replace('_', "").parse::<f64>().map_err(|_| invalid())
}

/// Merge a mapping or an iterable of key/value pairs into `dict`.
pub(crate) fn update_dict(dict: &mut Dict, source: &Value) -> EvalResult<()> {
    if let Value::Dict(other) = source {
        for (k, v) in other.borrow().entries() {
            dict.insert(k.clone(), v.clone())?;
        }
        return Ok(());
    }
    for (i, item) in ops::iterate(source)?.enumerate() {
        let pair = ops::collect(&item).map_err(|_| {
            RuntimeError::type_error(format!(
                "cannot convert dictionary update sequence element #{i} to a sequence"
            ))
        })?;
        let [key, value]: [Value; 2] = pair.try_into().map_err(|pair: Vec<Value>| {
            RuntimeError::value_error(format!(
                "dictionary update sequence element #{i} has length {}; 2 is required",
                pair.len()
            ))
        })?;
        dict.insert(key, value)?;
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// min / max / round / sorted
// ══════════════════════════════════════════════════════════════════════════════

fn min_max(ev: &mut Evaluator, mut args: CallArgs, want: Ordering) -> EvalResult<Value> {
    let name = if want == Ordering::Less { "min" } else { "max" };
    let key = args.take_keyword("key").filter(|k| !k.is_none());
    let default = args.take_keyword("default");
    args.reject_keywords(name)?;
    let items = match args.len() {
        0 => {
            return Err(RuntimeError::type_error(format!(
                "{name} expected at least 1 argument, got 0"
            )))
        }
        1 => ops::collect(&args.positional[0])?,
        _ => {
            if default.is_some() {
                return Err(RuntimeError::type_error(format!(
                    "Cannot specify a default for {name}() with multiple positional arguments"
                )));
            }
            args.positional
        }
    };
    let mut best: Option<(Value, Value)> = None;
    for item in items {
        let item_key = match &key {
            Some(func) => ev.call_value(func, CallArgs::new(vec![item.clone()]))?,
            None => item.clone(),
        };
        let replace = match &best {
            None => true,
            Some((best_key, _)) => ops::sort_cmp(&item_key, best_key)? == want,
        };
        if replace {
            best = Some((item_key, item));
        }
    }
    match (best, default) {
        (Some((_, item)), _) => Ok(item),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(RuntimeError::value_error(format!(
            "{name}() iterable argument is empty"
        ))),
    }
}

fn round(value: &Value, ndigits: Option<&Value>) -> EvalResult<Value> {
    let number = value.as_number().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "type {} doesn't define __round__ method",
            value.type_name()
        ))
    })?;
    let ndigits = match ndigits {
        None | Some(Value::None) => None,
        Some(v) => Some(v.as_index().ok_or_else(|| {
            RuntimeError::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                v.type_name()
            ))
        })?),
    };
    match (number, ndigits) {
        (Number::Int(n), None) => Ok(Value::Int(n)),
        (Number::Float(f), None) => float_to_int(f.round_ties_even()).map(Value::Int),
        (Number::Int(n), Some(d)) if d >= 0 => Ok(Value::Int(n)),
        (Number::Int(n), Some(d)) => {
            let Some(p) = u32::try_from(-d).ok().and_then(|e| 10i64.checked_pow(e)) else {
                return Ok(Value::Int(0));
            };
            let rem = n.rem_euclid(p);
            let base = n - rem;
            let up = rem * 2 > p || (rem * 2 == p && (base / p) % 2 != 0);
            Ok(Value::Int(if up { base + p } else { base }))
        }
        (Number::Float(f), Some(d)) => {
            if !f.is_finite() || d > 300 {
                return Ok(Value::Float(f));
            }
            if d >= 0 {
                let digits = d as usize;
                let text = format!("{f:.digits$}");
                Ok(Value::Float(text.parse().unwrap_or(f)))
            } else {
                let p = 10f64.powi((-d).min(400) as i32);
                Ok(Value::Float((f / p).round_ties_even() * p))
            }
        }
    }
}

/// Stable, fallible sort shared by `sorted()` and `list.sort()`.
pub(crate) fn sort_values(
    ev: &mut Evaluator,
    items: Vec<Value>,
    key: Option<&Value>,
    reverse: bool,
) -> EvalResult<Vec<Value>> {
    let key = key.filter(|k| !k.is_none());
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let k = match key {
            Some(func) => ev.call_value(func, CallArgs::new(vec![item.clone()]))?,
            None => item.clone(),
        };
        keyed.push((k, item));
    }
    let sorted = merge_sort(keyed, &|a: &Value, b: &Value| {
        let ordering = if reverse {
            ops::sort_cmp(b, a)?
        } else {
            ops::sort_cmp(a, b)?
        };
        Ok(ordering == Ordering::Less)
    })?;
    Ok(sorted.into_iter().map(|(_, item)| item).collect())
}

type Less<'a> = dyn Fn(&Value, &Value) -> EvalResult<bool> + 'a;

fn merge_sort(mut items: Vec<(Value, Value)>, less: &Less<'_>) -> EvalResult<Vec<(Value, Value)>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, less)?;
    let right = merge_sort(right, less)?;
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => less(&r.0, &l.0)?,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        out.extend(next);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_table_contents() {
        let table = builtin_table();
        assert_eq!(table.len(), 23);
        for name in ["open", "eval", "exec", "__import__", "getattr", "type", "print"] {
            assert!(!table.contains_key(name), "{name} must not be built in");
        }
        assert_eq!(table["None"], Value::None);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(" 42 ", 10).unwrap(), 42);
        assert_eq!(parse_int("-1_000", 10).unwrap(), -1000);
        assert_eq!(parse_int("ff", 16).unwrap(), 255);
        assert_eq!(parse_int("0x1F", 0).unwrap(), 31);
        let err = parse_int("4.5", 10).unwrap_err();
        assert_eq!(err.message, "invalid literal for int() with base 10: '4.5'");
        assert!(parse_int("", 10).is_err());
        assert!(parse_int("1__0", 10).is_err());
    }

    #[test]
    fn test_to_int_truncates_floats() {
        assert_eq!(to_int(&Value::Float(3.9)).unwrap(), 3);
        assert_eq!(to_int(&Value::Float(-3.9)).unwrap(), -3);
        assert_eq!(to_int(&Value::Bool(true)).unwrap(), 1);
        let err = to_int(&Value::Float(f64::NAN)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueError);
        let err = to_int(&Value::None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_to_float() {
        assert_eq!(to_float(&Value::str("0.5")).unwrap(), 0.5);
        assert_eq!(to_float(&Value::str(" 1e3 ")).unwrap(), 1000.0);
        assert!(to_float(&Value::str("-inf")).unwrap().is_infinite());
        let err = to_float(&Value::str("fast")).unwrap_err();
        assert_eq!(err.message, "could not convert string to float: 'fast'");
    }

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(round(&Value::Float(2.5), None).unwrap(), Value::Int(2));
        assert_eq!(round(&Value::Float(3.5), None).unwrap(), Value::Int(4));
        assert_eq!(round(&Value::Float(2.675), Some(&Value::Int(2))).unwrap(), Value::Float(2.67));
        assert_eq!(round(&Value::Int(1250), Some(&Value::Int(-2))).unwrap(), Value::Int(1200));
        assert_eq!(round(&Value::Int(1350), Some(&Value::Int(-2))).unwrap(), Value::Int(1400));
    }
}

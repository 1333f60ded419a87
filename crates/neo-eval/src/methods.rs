//! Methods of the built-in container and string types.

use crate::builtins::{sort_values, update_dict};
use crate::error::{ErrorKind, EvalResult, RuntimeError};
use crate::evaluator::Evaluator;
use crate::format::format_string;
use crate::ops;
use crate::value::{CallArgs, Dict, DictViewKind, Value};

const LIST_METHODS: &[&str] = &[
    "append", "extend", "insert", "pop", "remove", "index", "count", "sort", "reverse", "clear",
    "copy",
];

const STR_METHODS: &[&str] = &[
    "upper",
    "lower",
    "strip",
    "lstrip",
    "rstrip",
    "split",
    "join",
    "replace",
    "startswith",
    "endswith",
    "find",
    "count",
    "isdigit",
    "isalpha",
    "title",
    "capitalize",
    "format",
];

const DICT_METHODS: &[&str] = &[
    "keys", "values", "items", "get", "pop", "update", "clear", "copy", "setdefault",
];

const SET_METHODS: &[&str] = &[
    "add",
    "remove",
    "discard",
    "pop",
    "clear",
    "union",
    "intersection",
    "difference",
];

/// Whether `receiver.name` is a known method.
pub(crate) fn has_method(receiver: &Value, name: &str) -> bool {
    let table = match receiver {
        Value::List(_) => LIST_METHODS,
        Value::Str(_) => STR_METHODS,
        Value::Dict(_) => DICT_METHODS,
        Value::Set(_) => SET_METHODS,
        _ => return false,
    };
    table.contains(&name)
}

/// Call `receiver.name(*args)`.
pub(crate) fn call_method(
    ev: &mut Evaluator,
    receiver: &Value,
    name: &str,
    args: CallArgs,
) -> EvalResult<Value> {
    let qualified = format!("{}.{name}", receiver.type_name());
    match receiver {
        Value::List(_) => list_method(ev, receiver, name, &qualified, args),
        Value::Str(s) => str_method(s, name, &qualified, args),
        Value::Dict(_) => dict_method(receiver, name, &qualified, args),
        Value::Set(_) => set_method(receiver, name, &qualified, args),
        _ => Err(RuntimeError::attribute_error(receiver.type_name(), name)),
    }
}

fn arg(args: &CallArgs, i: usize) -> Value {
    args.positional.get(i).cloned().unwrap_or(Value::None)
}

fn index_arg(value: &Value) -> EvalResult<i64> {
    value.as_index().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

fn str_arg(value: &Value, method: &str) -> EvalResult<String> {
    match value {
        Value::Str(s) => Ok(s.to_string()),
        _ => Err(RuntimeError::type_error(format!(
            "{method}() argument must be str, not {}",
            value.type_name()
        ))),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// list
// ══════════════════════════════════════════════════════════════════════════════

fn list_method(
    ev: &mut Evaluator,
    receiver: &Value,
    name: &str,
    qualified: &str,
    mut args: CallArgs,
) -> EvalResult<Value> {
    let Value::List(list) = receiver else {
        return Err(RuntimeError::attribute_error(receiver.type_name(), name));
    };
    if name == "sort" {
        let key = args.take_keyword("key");
        let reverse = args.take_keyword("reverse").is_some_and(|r| r.is_truthy());
        args.reject_keywords(qualified)?;
        args.expect_count(qualified, 0, 0)?;
        let items = list.borrow().clone();
        let sorted = sort_values(ev, items, key.as_ref(), reverse)?;
        *list.borrow_mut() = sorted;
        return Ok(Value::None);
    }
    args.reject_keywords(qualified)?;
    match name {
        "append" => {
            args.expect_count(qualified, 1, 1)?;
            list.borrow_mut().push(arg(&args, 0));
            Ok(Value::None)
        }
        "extend" => {
            args.expect_count(qualified, 1, 1)?;
            let items = ops::collect(&args.positional[0])?;
            list.borrow_mut().extend(items);
            Ok(Value::None)
        }
        "insert" => {
            args.expect_count(qualified, 2, 2)?;
            let mut items = list.borrow_mut();
            let len = items.len() as i64;
            let i = index_arg(&args.positional[0])?;
            let pos = if i < 0 { (i + len).max(0) } else { i.min(len) };
            items.insert(pos as usize, arg(&args, 1));
            Ok(Value::None)
        }
        "pop" => {
            args.expect_count(qualified, 0, 1)?;
            let mut items = list.borrow_mut();
            if items.is_empty() {
                return Err(RuntimeError::index_error("pop from empty list"));
            }
            let len = items.len() as i64;
            let i = match args.positional.first() {
                Some(v) => index_arg(v)?,
                None => -1,
            };
            let pos = if i < 0 { i + len } else { i };
            if pos < 0 || pos >= len {
                return Err(RuntimeError::index_error("pop index out of range"));
            }
            Ok(items.remove(pos as usize))
        }
        "remove" => {
            args.expect_count(qualified, 1, 1)?;
            let target = &args.positional[0];
            let found = position_of(&list.borrow(), target, 0, usize::MAX)?;
            match found {
                Some(pos) => {
                    list.borrow_mut().remove(pos);
                    Ok(Value::None)
                }
                None => Err(RuntimeError::value_error("list.remove(x): x not in list")),
            }
        }
        "index" => {
            args.expect_count(qualified, 1, 3)?;
            let items = list.borrow();
            let len = items.len() as i64;
            let resolve = |v: Option<&Value>, default: i64| -> EvalResult<usize> {
                let i = match v {
                    Some(v) => index_arg(v)?,
                    None => default,
                };
                Ok((if i < 0 { i + len } else { i }).clamp(0, len) as usize)
            };
            let start = resolve(args.positional.get(1), 0)?;
            let end = resolve(args.positional.get(2), len)?;
            let target = &args.positional[0];
            match position_of(&items, target, start, end)? {
                Some(i) => Ok(Value::Int(i as i64)),
                None => Err(RuntimeError::value_error(format!("{} is not in list", target.repr()?))),
            }
        }
        "count" => {
            args.expect_count(qualified, 1, 1)?;
            let target = &args.positional[0];
            let mut n = 0;
            for item in list.borrow().iter() {
                if item.py_eq(target)? {
                    n += 1;
                }
            }
            Ok(Value::Int(n))
        }
        "reverse" => {
            args.expect_count(qualified, 0, 0)?;
            list.borrow_mut().reverse();
            Ok(Value::None)
        }
        "clear" => {
            args.expect_count(qualified, 0, 0)?;
            list.borrow_mut().clear();
            Ok(Value::None)
        }
        "copy" => {
            args.expect_count(qualified, 0, 0)?;
            Ok(Value::list(list.borrow().clone()))
        }
        _ => Err(RuntimeError::attribute_error("list", name)),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// str
// ══════════════════════════════════════════════════════════════════════════════

fn str_method(s: &str, name: &str, qualified: &str, mut args: CallArgs) -> EvalResult<Value> {
    match name {
        "format" => return format_string(s, &args).map(Value::str),
        "split" => {
            let sep = args.take_keyword("sep");
            let maxsplit = args.take_keyword("maxsplit");
            args.reject_keywords(qualified)?;
            args.expect_count(qualified, 0, 2)?;
            let sep = args.positional.first().cloned().or(sep).unwrap_or(Value::None);
            let maxsplit = match args.positional.get(1).cloned().or(maxsplit) {
                Some(v) => index_arg(&v)?,
                None => -1,
            };
            return split(s, &sep, maxsplit);
        }
        _ => {}
    }
    args.reject_keywords(qualified)?;
    let text = |v: String| Ok(Value::str(v));
    match name {
        "upper" => {
            args.expect_count(qualified, 0, 0)?;
            text(s.to_uppercase())
        }
        "lower" => {
            args.expect_count(qualified, 0, 0)?;
            text(s.to_lowercase())
        }
        "strip" | "lstrip" | "rstrip" => {
            args.expect_count(qualified, 0, 1)?;
            let chars: Option<Vec<char>> = match args.positional.first() {
                None | Some(Value::None) => None,
                Some(v) => Some(str_arg(v, name)?.chars().collect()),
            };
            let matches = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            text(match name {
                "strip" => s.trim_matches(matches).to_string(),
                "lstrip" => s.trim_start_matches(matches).to_string(),
                _ => s.trim_end_matches(matches).to_string(),
            })
        }
        "join" => {
            args.expect_count(qualified, 1, 1)?;
            let mut parts = Vec::new();
            for (i, item) in ops::iterate(&args.positional[0])?.enumerate() {
                match item {
                    Value::Str(part) => parts.push(part.to_string()),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "sequence item {i}: expected str instance, {} found",
                            other.type_name()
                        )))
                    }
                }
            }
            text(parts.join(s))
        }
        "replace" => {
            args.expect_count(qualified, 2, 3)?;
            let old = str_arg(&args.positional[0], name)?;
            let new = str_arg(&args.positional[1], name)?;
            match args.positional.get(2) {
                Some(count) => {
                    let count = index_arg(count)?;
                    if count < 0 {
                        text(s.replace(&old, &new))
                    } else {
                        text(s.replacen(&old, &new, count as usize))
                    }
                }
                None => text(s.replace(&old, &new)),
            }
        }
        "startswith" | "endswith" => {
            args.expect_count(qualified, 1, 1)?;
            let candidates = match &args.positional[0] {
                Value::Str(p) => vec![p.to_string()],
                Value::Tuple(items) => items
                    .iter()
                    .map(|v| str_arg(v, name))
                    .collect::<EvalResult<Vec<_>>>()?,
                other => {
                    return Err(RuntimeError::type_error(format!(
                        "{name} first arg must be str or a tuple of str, not {}",
                        other.type_name()
                    )))
                }
            };
            let hit = candidates.iter().any(|p| {
                if name == "startswith" {
                    s.starts_with(p.as_str())
                } else {
                    s.ends_with(p.as_str())
                }
            });
            Ok(Value::Bool(hit))
        }
        "find" => {
            args.expect_count(qualified, 1, 1)?;
            let needle = str_arg(&args.positional[0], name)?;
            let index = s
                .find(&needle)
                .map(|byte| s[..byte].chars().count() as i64)
                .unwrap_or(-1);
            Ok(Value::Int(index))
        }
        "count" => {
            args.expect_count(qualified, 1, 1)?;
            let needle = str_arg(&args.positional[0], name)?;
            let n = if needle.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(needle.as_str()).count()
            };
            Ok(Value::Int(n as i64))
        }
        "isdigit" => {
            args.expect_count(qualified, 0, 0)?;
            Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit())))
        }
        "isalpha" => {
            args.expect_count(qualified, 0, 0)?;
            Ok(Value::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic)))
        }
        "title" => {
            args.expect_count(qualified, 0, 0)?;
            let mut out = String::with_capacity(s.len());
            let mut in_word = false;
            for c in s.chars() {
                if c.is_alphabetic() {
                    if in_word {
                        out.extend(c.to_lowercase());
                    } else {
                        out.extend(c.to_uppercase());
                    }
                    in_word = true;
                } else {
                    out.push(c);
                    in_word = false;
                }
            }
            text(out)
        }
        "capitalize" => {
            args.expect_count(qualified, 0, 0)?;
            let mut chars = s.chars();
            text(match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            })
        }
        _ => Err(RuntimeError::attribute_error("str", name)),
    }
}

fn split(s: &str, sep: &Value, maxsplit: i64) -> EvalResult<Value> {
    let limit = if maxsplit < 0 { usize::MAX } else { maxsplit as usize };
    let parts: Vec<Value> = match sep {
        Value::None => {
            let mut parts = Vec::new();
            let mut rest = s.trim_start();
            while !rest.is_empty() {
                if parts.len() == limit {
                    parts.push(Value::str(rest));
                    break;
                }
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                parts.push(Value::str(&rest[..end]));
                rest = rest[end..].trim_start();
            }
            parts
        }
        Value::Str(sep) => {
            if sep.is_empty() {
                return Err(RuntimeError::value_error("empty separator"));
            }
            match limit {
                usize::MAX => s.split(sep.as_ref()).map(Value::str).collect(),
                n => s.splitn(n + 1, sep.as_ref()).map(Value::str).collect(),
            }
        }
        other => {
            return Err(RuntimeError::type_error(format!(
                "must be str or None, not {}",
                other.type_name()
            )))
        }
    };
    Ok(Value::list(parts))
}

/// First position in `start..end` holding a value equal to `target`.
fn position_of(items: &[Value], target: &Value, start: usize, end: usize) -> EvalResult<Option<usize>> {
    for (i, item) in items.iter().enumerate().take(end).skip(start) {
        if item.py_eq(target)? {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

// ══════════════════════════════════════════════════════════════════════════════
// dict
// ══════════════════════════════════════════════════════════════════════════════

fn dict_method(receiver: &Value, name: &str, qualified: &str, args: CallArgs) -> EvalResult<Value> {
    let Value::Dict(dict) = receiver else {
        return Err(RuntimeError::attribute_error(receiver.type_name(), name));
    };
    if name == "update" {
        args.expect_count(qualified, 0, 1)?;
        let mut d = dict.borrow().clone();
        if let Some(source) = args.positional.first() {
            update_dict(&mut d, source)?;
        }
        for (key, value) in args.keywords {
            d.insert(Value::str(key), value)?;
        }
        *dict.borrow_mut() = d;
        return Ok(Value::None);
    }
    args.reject_keywords(qualified)?;
    let view = |kind| Ok(Value::DictView(kind, dict.clone()));
    match name {
        "keys" => {
            args.expect_count(qualified, 0, 0)?;
            view(DictViewKind::Keys)
        }
        "values" => {
            args.expect_count(qualified, 0, 0)?;
            view(DictViewKind::Values)
        }
        "items" => {
            args.expect_count(qualified, 0, 0)?;
            view(DictViewKind::Items)
        }
        "get" => {
            args.expect_count(qualified, 1, 2)?;
            Ok(dict.borrow().get(&args.positional[0])?.unwrap_or_else(|| arg(&args, 1)))
        }
        "pop" => {
            args.expect_count(qualified, 1, 2)?;
            let key = &args.positional[0];
            match dict.borrow_mut().remove(key)? {
                Some(value) => Ok(value),
                None => args
                    .positional
                    .get(1)
                    .cloned()
                    .ok_or_else(|| RuntimeError::key_error(key)),
            }
        }
        "setdefault" => {
            args.expect_count(qualified, 1, 2)?;
            let key = &args.positional[0];
            let mut d = dict.borrow_mut();
            if let Some(existing) = d.get(key)? {
                return Ok(existing);
            }
            let default = arg(&args, 1);
            d.insert(key.clone(), default.clone())?;
            Ok(default)
        }
        "clear" => {
            args.expect_count(qualified, 0, 0)?;
            dict.borrow_mut().clear();
            Ok(Value::None)
        }
        "copy" => {
            args.expect_count(qualified, 0, 0)?;
            Ok(Value::dict(dict.borrow().clone()))
        }
        _ => Err(RuntimeError::attribute_error("dict", name)),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// set
// ══════════════════════════════════════════════════════════════════════════════

fn set_method(receiver: &Value, name: &str, qualified: &str, args: CallArgs) -> EvalResult<Value> {
    let Value::Set(set) = receiver else {
        return Err(RuntimeError::attribute_error(receiver.type_name(), name));
    };
    args.reject_keywords(qualified)?;
    match name {
        "add" => {
            args.expect_count(qualified, 1, 1)?;
            set.borrow_mut().add(arg(&args, 0))?;
            Ok(Value::None)
        }
        "remove" => {
            args.expect_count(qualified, 1, 1)?;
            let key = &args.positional[0];
            match set.borrow_mut().remove(key)? {
                Some(_) => Ok(Value::None),
                None => Err(RuntimeError::key_error(key)),
            }
        }
        "discard" => {
            args.expect_count(qualified, 1, 1)?;
            set.borrow_mut().remove(&args.positional[0])?;
            Ok(Value::None)
        }
        "pop" => {
            args.expect_count(qualified, 0, 0)?;
            set.borrow_mut()
                .pop_first()
                .map(|(key, _)| key)
                .ok_or_else(|| RuntimeError::new(ErrorKind::KeyError, "'pop from an empty set'"))
        }
        "clear" => {
            args.expect_count(qualified, 0, 0)?;
            set.borrow_mut().clear();
            Ok(Value::None)
        }
        "union" | "intersection" | "difference" => {
            let mut result = set.borrow().clone();
            for other in &args.positional {
                let other = Dict::from_keys(ops::collect(other)?)?;
                result = match name {
                    "union" => {
                        for key in other.keys() {
                            result.add(key.clone())?;
                        }
                        result
                    }
                    "intersection" => keep_where(&result, &other, true)?,
                    _ => keep_where(&result, &other, false)?,
                };
            }
            Ok(Value::set(result))
        }
        _ => Err(RuntimeError::attribute_error("set", name)),
    }
}

/// Members of `set` whose presence in `other` equals `present`.
fn keep_where(set: &Dict, other: &Dict, present: bool) -> EvalResult<Dict> {
    let mut out = Dict::new();
    for key in set.keys() {
        if other.contains(key)? == present {
            out.add(key.clone())?;
        }
    }
    Ok(out)
}

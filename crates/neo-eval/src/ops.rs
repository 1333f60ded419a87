//! Operators, iteration, unpacking and subscripting.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use neo_types::ast::{BinOp, CmpOp, UnaryOp};

use crate::error::{ErrorKind, EvalResult, RuntimeError};
use crate::limits::{descend, with_stack};
use crate::value::{
    span_len, Dict, DictViewKind, IterValue, ListItems, Number, Range, Value, SSIZE_OVERFLOW,
};

/// Longest string or sequence a repetition may produce.
const MAX_REPEAT_LEN: usize = 100_000_000;

// ══════════════════════════════════════════════════════════════════════════════
// Arithmetic
// ══════════════════════════════════════════════════════════════════════════════

fn unsupported(op: &str, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
}

fn int_overflow() -> RuntimeError {
    RuntimeError::overflow("integer result too large")
}

/// Evaluate `left op right`.
pub fn binary_op(op: BinOp, left: &Value, right: &Value) -> EvalResult<Value> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return numeric_op(op, a, b);
    }
    match op {
        BinOp::Add => add(left, right),
        BinOp::Sub => match (left, right) {
            (Value::Set(a), Value::Set(b)) => {
                let b = b.borrow();
                let mut out = Dict::new();
                for key in a.borrow().keys() {
                    if !b.contains(key)? {
                        out.add(key.clone())?;
                    }
                }
                Ok(Value::set(out))
            }
            _ => Err(unsupported("-", left, right)),
        },
        BinOp::Mul => multiply(left, right),
        BinOp::Pow => Err(unsupported("** or pow()", left, right)),
        _ => Err(unsupported(op.symbol(), left, right)),
    }
}

fn add(left: &Value, right: &Value) -> EvalResult<Value> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(a);
            s.push_str(b);
            Ok(Value::str(s))
        }
        (Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (Value::Tuple(a), Value::Tuple(b)) => {
            let mut items = a.to_vec();
            items.extend(b.iter().cloned());
            Ok(Value::tuple(items))
        }
        (Value::Str(_) | Value::List(_) | Value::Tuple(_), _) => {
            Err(RuntimeError::type_error(format!(
                "can only concatenate {} (not \"{}\") to {}",
                left.type_name(),
                right.type_name(),
                left.type_name()
            )))
        }
        _ => Err(unsupported("+", left, right)),
    }
}

fn multiply(left: &Value, right: &Value) -> EvalResult<Value> {
    let (seq, count) = match (left, right) {
        (Value::Str(_) | Value::List(_) | Value::Tuple(_), other) => (left, other),
        (other, Value::Str(_) | Value::List(_) | Value::Tuple(_)) => (right, other),
        _ => return Err(unsupported("*", left, right)),
    };
    let Some(n) = count.as_index() else {
        return Err(RuntimeError::type_error(format!(
            "can't multiply sequence by non-int of type '{}'",
            count.type_name()
        )));
    };
    let n = n.max(0) as usize;
    let too_long = |len: usize| len.checked_mul(n).map_or(true, |total| total > MAX_REPEAT_LEN);
    match seq {
        Value::Str(s) => {
            if too_long(s.len()) {
                return Err(RuntimeError::overflow("repeated string is too long"));
            }
            Ok(Value::str(s.repeat(n)))
        }
        Value::List(items) => {
            let items = items.borrow();
            if too_long(items.len()) {
                return Err(RuntimeError::overflow("repeated list is too long"));
            }
            Ok(Value::list(repeat_items(&items, n)))
        }
        Value::Tuple(items) => {
            if too_long(items.len()) {
                return Err(RuntimeError::overflow("repeated tuple is too long"));
            }
            Ok(Value::tuple(repeat_items(items, n)))
        }
        _ => Err(unsupported("*", left, right)),
    }
}

fn repeat_items(items: &[Value], n: usize) -> Vec<Value> {
    let mut out = Vec::with_capacity(items.len() * n);
    for _ in 0..n {
        out.extend(items.iter().cloned());
    }
    out
}

fn numeric_op(op: BinOp, a: Number, b: Number) -> EvalResult<Value> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_op(op, x, y),
        _ => float_op(op, a.to_f64(), b.to_f64()),
    }
}

fn int_op(op: BinOp, x: i64, y: i64) -> EvalResult<Value> {
    let result = match op {
        BinOp::Add => x.checked_add(y).ok_or_else(int_overflow)?,
        BinOp::Sub => x.checked_sub(y).ok_or_else(int_overflow)?,
        BinOp::Mul => x.checked_mul(y).ok_or_else(int_overflow)?,
        BinOp::Div => {
            if y == 0 {
                return Err(RuntimeError::zero_division("division by zero"));
            }
            return Ok(Value::Float(x as f64 / y as f64));
        }
        BinOp::FloorDiv => {
            if y == 0 {
                return Err(RuntimeError::zero_division("integer division or modulo by zero"));
            }
            let q = x.checked_div(y).ok_or_else(int_overflow)?;
            if x % y != 0 && ((x < 0) != (y < 0)) {
                q - 1
            } else {
                q
            }
        }
        BinOp::Mod => {
            if y == 0 {
                return Err(RuntimeError::zero_division("integer division or modulo by zero"));
            }
            let r = x.checked_rem(y).unwrap_or(0);
            if r != 0 && ((r < 0) != (y < 0)) {
                r + y
            } else {
                r
            }
        }
        BinOp::Pow => {
            if y < 0 {
                return float_op(op, x as f64, y as f64);
            }
            let exp = u32::try_from(y).map_err(|_| int_overflow())?;
            x.checked_pow(exp).ok_or_else(int_overflow)?
        }
    };
    Ok(Value::Int(result))
}

fn float_op(op: BinOp, x: f64, y: f64) -> EvalResult<Value> {
    let result = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => {
            if y == 0.0 {
                return Err(RuntimeError::zero_division("float division by zero"));
            }
            x / y
        }
        BinOp::FloorDiv => {
            if y == 0.0 {
                return Err(RuntimeError::zero_division("float floor division by zero"));
            }
            let m = x % y;
            let mut div = (x - m) / y;
            if m != 0.0 && ((y < 0.0) != (m < 0.0)) {
                div -= 1.0;
            }
            div.floor()
        }
        BinOp::Mod => {
            if y == 0.0 {
                return Err(RuntimeError::zero_division("float modulo"));
            }
            let m = x % y;
            if m != 0.0 && ((m < 0.0) != (y < 0.0)) {
                m + y
            } else {
                m
            }
        }
        BinOp::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err(RuntimeError::zero_division(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            if x < 0.0 && y.fract() != 0.0 {
                return Err(RuntimeError::value_error(
                    "negative number cannot be raised to a fractional power",
                ));
            }
            let r = x.powf(y);
            if r.is_infinite() && x.is_finite() && y.is_finite() {
                return Err(RuntimeError::overflow("numerical result out of range"));
            }
            r
        }
    };
    Ok(Value::Float(result))
}

/// Evaluate a unary operator.
pub fn unary_op(op: UnaryOp, operand: &Value) -> EvalResult<Value> {
    if op == UnaryOp::Not {
        return Ok(Value::Bool(!operand.is_truthy()));
    }
    let symbol = if op == UnaryOp::Neg { "-" } else { "+" };
    match (op, operand.as_number()) {
        (UnaryOp::Neg, Some(Number::Int(n))) => {
            Ok(Value::Int(n.checked_neg().ok_or_else(int_overflow)?))
        }
        (UnaryOp::Neg, Some(Number::Float(f))) => Ok(Value::Float(-f)),
        (_, Some(Number::Int(n))) => Ok(Value::Int(n)),
        (_, Some(Number::Float(f))) => Ok(Value::Float(f)),
        _ => Err(RuntimeError::type_error(format!(
            "bad operand type for unary {symbol}: '{}'",
            operand.type_name()
        ))),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Comparison
// ══════════════════════════════════════════════════════════════════════════════

/// Evaluate one link of a comparison chain.
pub fn compare(op: CmpOp, left: &Value, right: &Value) -> EvalResult<bool> {
    Ok(match op {
        CmpOp::Eq => left.py_eq(right)?,
        CmpOp::NotEq => !left.py_eq(right)?,
        CmpOp::Is => left.is_same(right),
        CmpOp::IsNot => !left.is_same(right),
        CmpOp::In => contains(right, left)?,
        CmpOp::NotIn => !contains(right, left)?,
        CmpOp::Lt | CmpOp::LtE | CmpOp::Gt | CmpOp::GtE => {
            if let (Value::Set(a), Value::Set(b)) = (left, right) {
                return set_relation(op, &a.borrow(), &b.borrow());
            }
            let Some(ordering) = partial_cmp(left, right, op.symbol())? else {
                return Ok(false);
            };
            match op {
                CmpOp::Lt => ordering == Ordering::Less,
                CmpOp::LtE => ordering != Ordering::Greater,
                CmpOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }
        }
    })
}

fn set_relation(op: CmpOp, a: &Dict, b: &Dict) -> EvalResult<bool> {
    let subset = |x: &Dict, y: &Dict| -> EvalResult<bool> {
        for key in x.keys() {
            if !y.contains(key)? {
                return Ok(false);
            }
        }
        Ok(true)
    };
    Ok(match op {
        CmpOp::LtE => subset(a, b)?,
        CmpOp::Lt => a.len() < b.len() && subset(a, b)?,
        CmpOp::GtE => subset(b, a)?,
        _ => a.len() > b.len() && subset(b, a)?,
    })
}

/// Python ordering between two values. `None` means unordered (NaN).
pub fn partial_cmp(left: &Value, right: &Value, symbol: &str) -> EvalResult<Option<Ordering>> {
    cmp_at(left, right, symbol, 0)
}

fn cmp_at(left: &Value, right: &Value, symbol: &str, depth: usize) -> EvalResult<Option<Ordering>> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return Ok(match (a, b) {
            (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
            _ => a.to_f64().partial_cmp(&b.to_f64()),
        });
    }
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) => seq_cmp(&a.borrow(), &b.borrow(), symbol, depth),
        (Value::Tuple(a), Value::Tuple(b)) => seq_cmp(a, b, symbol, depth),
        _ => Err(RuntimeError::type_error(format!(
            "'{symbol}' not supported between instances of '{}' and '{}'",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn seq_cmp(a: &[Value], b: &[Value], symbol: &str, depth: usize) -> EvalResult<Option<Ordering>> {
    let depth = descend(depth, "in comparison")?;
    for (x, y) in a.iter().zip(b) {
        if !x.py_eq(y)? {
            return with_stack(|| cmp_at(x, y, symbol, depth));
        }
    }
    Ok(Some(a.len().cmp(&b.len())))
}

/// Total ordering used by `sorted`, `min` and `max`; NaN sorts as equal.
pub fn sort_cmp(left: &Value, right: &Value) -> EvalResult<Ordering> {
    Ok(partial_cmp(left, right, "<")?.unwrap_or(Ordering::Equal))
}

/// `item in container`
pub fn contains(container: &Value, item: &Value) -> EvalResult<bool> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_ref())),
            _ => Err(RuntimeError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                item.type_name()
            ))),
        },
        Value::List(items) => any_equal(&items.borrow(), item),
        Value::Tuple(items) => any_equal(items, item),
        Value::Dict(d) | Value::Set(d) | Value::DictView(DictViewKind::Keys, d) => {
            d.borrow().contains(item)
        }
        Value::DictView(kind, d) => any_equal(&kind.collect(&d.borrow()), item),
        Value::Range(r) => Ok(match item.as_number() {
            Some(Number::Int(n)) => r.contains(n),
            Some(Number::Float(f)) => f.fract() == 0.0 && r.contains(f as i64),
            None => false,
        }),
        Value::Iterator(it) => {
            while let Some(v) = it.next() {
                if v.py_eq(item)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(RuntimeError::type_error(format!(
            "argument of type '{}' is not iterable",
            container.type_name()
        ))),
    }
}

fn any_equal(items: &[Value], item: &Value) -> EvalResult<bool> {
    for v in items {
        if v.py_eq(item)? {
            return Ok(true);
        }
    }
    Ok(false)
}

// ══════════════════════════════════════════════════════════════════════════════
// Iteration
// ══════════════════════════════════════════════════════════════════════════════

/// Iterator over the elements of an iterable value.
///
/// Lists are iterated live by position, so appending during a `for` loop
/// extends the loop as in Python.
pub enum ValueIter {
    List {
        items: Rc<ListItems>,
        pos: usize,
    },
    Owned(std::vec::IntoIter<Value>),
    /// A snapshot of a dict or set that must not change size while the
    /// loop runs.
    Watched {
        source: Rc<RefCell<Dict>>,
        size: usize,
        what: &'static str,
        items: std::vec::IntoIter<Value>,
    },
    Range {
        next: i64,
        remaining: i128,
        step: i64,
    },
    Shared(Rc<IterValue>),
}

impl ValueIter {
    /// Like [`Iterator::next`], but fails once a watched dict or set has
    /// been resized by the loop body.
    pub fn try_next(&mut self) -> EvalResult<Option<Value>> {
        if let ValueIter::Watched { source, size, what, .. } = self {
            if source.borrow().len() != *size {
                return Err(RuntimeError::new(
                    ErrorKind::RuntimeError,
                    format!("{what} changed size during iteration"),
                ));
            }
        }
        Ok(self.next())
    }

    fn watched(source: &Rc<RefCell<Dict>>, what: &'static str, items: Vec<Value>) -> Self {
        ValueIter::Watched {
            source: source.clone(),
            size: source.borrow().len(),
            what,
            items: items.into_iter(),
        }
    }
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            ValueIter::List { items, pos } => {
                let value = items.borrow().get(*pos).cloned();
                *pos += 1;
                value
            }
            ValueIter::Owned(iter) | ValueIter::Watched { items: iter, .. } => iter.next(),
            ValueIter::Range {
                next,
                remaining,
                step,
            } => {
                if *remaining <= 0 {
                    return None;
                }
                let value = *next;
                *remaining -= 1;
                *next = next.wrapping_add(*step);
                Some(Value::Int(value))
            }
            ValueIter::Shared(it) => it.next(),
        }
    }
}

/// `iter(value)`
pub fn iterate(value: &Value) -> EvalResult<ValueIter> {
    Ok(match value {
        Value::List(items) => ValueIter::List {
            items: items.clone(),
            pos: 0,
        },
        Value::Tuple(items) => ValueIter::Owned(items.to_vec().into_iter()),
        Value::Str(s) => ValueIter::Owned(
            s.chars()
                .map(|c| Value::str(c.encode_utf8(&mut [0; 4])))
                .collect::<Vec<_>>()
                .into_iter(),
        ),
        Value::Dict(d) => {
            let keys = d.borrow().keys().cloned().collect();
            ValueIter::watched(d, "dictionary", keys)
        }
        Value::Set(d) => {
            let keys = d.borrow().keys().cloned().collect();
            ValueIter::watched(d, "Set", keys)
        }
        Value::DictView(kind, d) => {
            let items = kind.collect(&d.borrow());
            ValueIter::watched(d, "dictionary", items)
        }
        Value::Range(r) => ValueIter::Range {
            next: r.start,
            remaining: r.count(),
            step: r.step,
        },
        Value::Iterator(it) => ValueIter::Shared(it.clone()),
        _ => {
            return Err(RuntimeError::type_error(format!(
                "'{}' object is not iterable",
                value.type_name()
            )))
        }
    })
}

/// Collect every element of an iterable.
pub fn collect(value: &Value) -> EvalResult<Vec<Value>> {
    Ok(iterate(value)?.collect())
}

/// Unpack an iterable into exactly `expected` values.
pub fn unpack(value: &Value, expected: usize) -> EvalResult<Vec<Value>> {
    let iter = iterate(value).map_err(|_| {
        RuntimeError::type_error(format!(
            "cannot unpack non-iterable {} object",
            value.type_name()
        ))
    })?;
    let mut items = Vec::with_capacity(expected);
    for item in iter {
        if items.len() == expected {
            return Err(RuntimeError::value_error(format!(
                "too many values to unpack (expected {expected})"
            )));
        }
        items.push(item);
    }
    if items.len() < expected {
        return Err(RuntimeError::value_error(format!(
            "not enough values to unpack (expected {expected}, got {})",
            items.len()
        )));
    }
    Ok(items)
}

/// Length of a sized value, for `len()`.
pub fn length(value: &Value) -> EvalResult<i64> {
    let len = match value {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Tuple(items) => items.len(),
        Value::Dict(d) | Value::Set(d) | Value::DictView(_, d) => d.borrow().len(),
        Value::Range(r) => return r.len(),
        _ => {
            return Err(RuntimeError::type_error(format!(
                "object of type '{}' has no len()",
                value.type_name()
            )))
        }
    };
    Ok(len as i64)
}

// ══════════════════════════════════════════════════════════════════════════════
// Subscripts
// ══════════════════════════════════════════════════════════════════════════════

/// Evaluated `lower:upper:step` bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SliceBounds {
    pub lower: Option<i64>,
    pub upper: Option<i64>,
    pub step: Option<i64>,
}

impl SliceBounds {
    /// Python's `slice.indices(len)`: clamped start and stop plus the step.
    fn resolve(&self, len: i128) -> EvalResult<(i128, i128, i128)> {
        let step = i128::from(self.step.unwrap_or(1));
        if step == 0 {
            return Err(RuntimeError::value_error("slice step cannot be zero"));
        }
        let clamp = |bound: i64, low: i128, high: i128| {
            let b = i128::from(bound);
            (if b < 0 { b + len } else { b }).clamp(low, high)
        };
        let (start, stop) = if step > 0 {
            (
                self.lower.map_or(0, |b| clamp(b, 0, len)),
                self.upper.map_or(len, |b| clamp(b, 0, len)),
            )
        } else {
            (
                self.lower.map_or(len - 1, |b| clamp(b, -1, len - 1)),
                self.upper.map_or(-1, |b| clamp(b, -1, len - 1)),
            )
        };
        Ok((start, stop, step))
    }

    /// Positions selected from a sequence of length `len`.
    pub fn indices(&self, len: usize) -> EvalResult<Vec<usize>> {
        let (start, stop, step) = self.resolve(len as i128)?;
        Ok((0..span_len(start, stop, step))
            .map(|k| (start + k * step) as usize)
            .collect())
    }
}

fn index_type_error(container: &Value, index: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "{} indices must be integers or slices, not {}",
        container.type_name(),
        index.type_name()
    ))
}

fn normalize_index(index: i64, len: usize, container: &str) -> EvalResult<usize> {
    let len = len as i64;
    let i = if index < 0 { index + len } else { index };
    if i < 0 || i >= len {
        return Err(RuntimeError::index_error(format!("{container} index out of range")));
    }
    Ok(i as usize)
}

/// `container[index]`
pub fn get_item(container: &Value, index: &Value) -> EvalResult<Value> {
    match container {
        Value::Dict(d) => d
            .borrow()
            .get(index)?
            .ok_or_else(|| RuntimeError::key_error(index)),
        Value::List(items) => {
            let items = items.borrow();
            let i = index
                .as_index()
                .ok_or_else(|| index_type_error(container, index))?;
            Ok(items[normalize_index(i, items.len(), "list")?].clone())
        }
        Value::Tuple(items) => {
            let i = index
                .as_index()
                .ok_or_else(|| index_type_error(container, index))?;
            Ok(items[normalize_index(i, items.len(), "tuple")?].clone())
        }
        Value::Str(s) => {
            let i = index.as_index().ok_or_else(|| {
                RuntimeError::type_error(format!(
                    "string indices must be integers, not '{}'",
                    index.type_name()
                ))
            })?;
            let chars: Vec<char> = s.chars().collect();
            let c = chars[normalize_index(i, chars.len(), "string")?];
            Ok(Value::str(c.encode_utf8(&mut [0; 4])))
        }
        Value::Range(r) => {
            let i = index.as_index().ok_or_else(|| {
                RuntimeError::type_error(format!(
                    "range indices must be integers or slices, not {}",
                    index.type_name()
                ))
            })?;
            let len = r.count();
            let i = i128::from(i);
            let pos = if i < 0 { i + len } else { i };
            if pos < 0 || pos >= len {
                return Err(RuntimeError::index_error("range object index out of range"));
            }
            Ok(Value::Int(r.at(pos)))
        }
        _ => Err(RuntimeError::type_error(format!(
            "'{}' object is not subscriptable",
            container.type_name()
        ))),
    }
}

/// `container[lower:upper:step]`
pub fn get_slice(container: &Value, bounds: SliceBounds) -> EvalResult<Value> {
    match container {
        Value::List(items) => {
            let items = items.borrow();
            let picked = bounds.indices(items.len())?;
            Ok(Value::list(picked.into_iter().map(|i| items[i].clone()).collect()))
        }
        Value::Tuple(items) => {
            let picked = bounds.indices(items.len())?;
            Ok(Value::tuple(picked.into_iter().map(|i| items[i].clone()).collect()))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let picked = bounds.indices(chars.len())?;
            Ok(Value::str(picked.into_iter().map(|i| chars[i]).collect::<String>()))
        }
        Value::Range(r) => {
            let (start, stop, step) = bounds.resolve(r.count())?;
            let position = |i: i128| i128::from(r.start) + i * i128::from(r.step);
            let fit = |n: i128| i64::try_from(n).map_err(|_| RuntimeError::overflow(SSIZE_OVERFLOW));
            Ok(Value::Range(Range {
                start: fit(position(start))?,
                stop: fit(position(stop))?,
                step: fit(step * i128::from(r.step))?,
            }))
        }
        _ => Err(RuntimeError::type_error(format!(
            "'{}' object is not subscriptable",
            container.type_name()
        ))),
    }
}

/// `container[index] = value`
pub fn set_item(container: &Value, index: &Value, value: Value) -> EvalResult<()> {
    match container {
        Value::Dict(d) => d.borrow_mut().insert(index.clone(), value),
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let i = index
                .as_index()
                .ok_or_else(|| index_type_error(container, index))?;
            let pos = normalize_index(i, items.len(), "list assignment")?;
            items[pos] = value;
            Ok(())
        }
        _ => Err(RuntimeError::type_error(format!(
            "'{}' object does not support item assignment",
            container.type_name()
        ))),
    }
}

/// `container[lower:upper:step] = value`
pub fn set_slice(container: &Value, bounds: SliceBounds, value: &Value) -> EvalResult<()> {
    let Value::List(items) = container else {
        return Err(RuntimeError::type_error(format!(
            "'{}' object does not support item assignment",
            container.type_name()
        )));
    };
    let replacement = collect(value).map_err(|_| {
        RuntimeError::type_error("can only assign an iterable")
    })?;
    let mut items = items.borrow_mut();
    let step = bounds.step.unwrap_or(1);
    if step == 1 {
        let len = items.len() as i64;
        let resolve = |b: i64| (if b < 0 { b + len } else { b }).clamp(0, len) as usize;
        let start = bounds.lower.map_or(0, resolve);
        let stop = bounds.upper.map_or(len as usize, resolve).max(start);
        items.splice(start..stop, replacement);
        return Ok(());
    }
    let picked = bounds.indices(items.len())?;
    if picked.len() != replacement.len() {
        return Err(RuntimeError::value_error(format!(
            "attempt to assign sequence of size {} to extended slice of size {}",
            replacement.len(),
            picked.len()
        )));
    }
    for (i, v) in picked.into_iter().zip(replacement) {
        items[i] = v;
    }
    Ok(())
}

/// `del container[index]`
pub fn del_item(container: &Value, index: &Value) -> EvalResult<()> {
    match container {
        Value::Dict(d) => match d.borrow_mut().remove(index)? {
            Some(_) => Ok(()),
            None => Err(RuntimeError::key_error(index)),
        },
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let i = index
                .as_index()
                .ok_or_else(|| index_type_error(container, index))?;
            let pos = normalize_index(i, items.len(), "list assignment")?;
            items.remove(pos);
            Ok(())
        }
        _ => Err(RuntimeError::type_error(format!(
            "'{}' object doesn't support item deletion",
            container.type_name()
        ))),
    }
}

/// `del container[lower:upper:step]`
pub fn del_slice(container: &Value, bounds: SliceBounds) -> EvalResult<()> {
    let Value::List(items) = container else {
        return Err(RuntimeError::type_error(format!(
            "'{}' object doesn't support item deletion",
            container.type_name()
        )));
    };
    let mut items = items.borrow_mut();
    let mut picked = bounds.indices(items.len())?;
    picked.sort_unstable();
    for i in picked.into_iter().rev() {
        items.remove(i);
    }
    Ok(())
}

/// Convert an index-like value into a slice bound.
pub fn slice_bound(value: &Value) -> EvalResult<Option<i64>> {
    match value {
        Value::None => Ok(None),
        v => v.as_index().map(Some).ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::TypeError,
                "slice indices must be integers or None or have an __index__ method",
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Int(n)
    }

    #[test]
    fn test_floor_division_and_modulo_follow_python() {
        assert_eq!(binary_op(BinOp::FloorDiv, &int(-7), &int(2)).unwrap(), int(-4));
        assert_eq!(binary_op(BinOp::Mod, &int(-7), &int(2)).unwrap(), int(1));
        assert_eq!(binary_op(BinOp::Mod, &int(7), &int(-2)).unwrap(), int(-1));
        assert_eq!(
            binary_op(BinOp::FloorDiv, &Value::Float(7.5), &int(2)).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(
            binary_op(BinOp::Mod, &Value::Float(-1.0), &int(3)).unwrap(),
            Value::Float(2.0)
        );
    }

    #[test]
    fn test_division_by_zero_messages() {
        let err = binary_op(BinOp::Div, &int(1), &int(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ZeroDivisionError);
        assert_eq!(err.message, "division by zero");
        let err = binary_op(BinOp::Mod, &int(1), &int(0)).unwrap_err();
        assert_eq!(err.message, "integer division or modulo by zero");
        let err = binary_op(BinOp::Div, &Value::Float(1.0), &int(0)).unwrap_err();
        assert_eq!(err.message, "float division by zero");
    }

    #[test]
    fn test_true_division_yields_float() {
        assert_eq!(binary_op(BinOp::Div, &int(6), &int(3)).unwrap().repr().unwrap(), "2.0");
    }

    #[test]
    fn test_integer_overflow() {
        let err = binary_op(BinOp::Mul, &int(i64::MAX), &int(2)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OverflowError);
        assert!(binary_op(BinOp::Pow, &int(2), &int(64)).is_err());
        assert_eq!(binary_op(BinOp::Pow, &int(2), &int(10)).unwrap(), int(1024));
        assert_eq!(binary_op(BinOp::Pow, &int(2), &int(-1)).unwrap(), Value::Float(0.5));
    }

    #[test]
    fn test_concatenation_errors() {
        let err = binary_op(BinOp::Add, &Value::str("a"), &int(1)).unwrap_err();
        assert_eq!(err.message, "can only concatenate str (not \"int\") to str");
        let err = binary_op(BinOp::Add, &int(1), &Value::str("a")).unwrap_err();
        assert_eq!(err.message, "unsupported operand type(s) for +: 'int' and 'str'");
    }

    #[test]
    fn test_sequence_repetition() {
        assert_eq!(binary_op(BinOp::Mul, &Value::str("ab"), &int(3)).unwrap(), Value::str("ababab"));
        assert_eq!(binary_op(BinOp::Mul, &int(2), &Value::list(vec![int(0)])).unwrap().repr().unwrap(), "[0, 0]");
        assert_eq!(binary_op(BinOp::Mul, &Value::str("x"), &int(-1)).unwrap(), Value::str(""));
    }

    #[test]
    fn test_mixed_ordering_is_type_error() {
        let err = compare(CmpOp::Lt, &Value::str("a"), &int(1)).unwrap_err();
        assert_eq!(err.message, "'<' not supported between instances of 'str' and 'int'");
        assert!(compare(CmpOp::Lt, &int(1), &Value::Float(1.5)).unwrap());
        assert!(compare(
            CmpOp::Lt,
            &Value::list(vec![int(1), int(2)]),
            &Value::list(vec![int(1), int(3)])
        )
        .unwrap());
    }

    #[test]
    fn test_membership() {
        assert!(contains(&Value::str("robot"), &Value::str("bot")).unwrap());
        let err = contains(&Value::str("robot"), &int(1)).unwrap_err();
        assert_eq!(err.message, "'in <string>' requires string as left operand, not int");
        let r = Value::Range(Range { start: 0, stop: 10, step: 2 });
        assert!(contains(&r, &int(4)).unwrap());
        assert!(!contains(&r, &int(5)).unwrap());
    }

    #[test]
    fn test_slices() {
        let list = Value::list((0..5).map(int).collect());
        let all = SliceBounds::default();
        assert_eq!(get_slice(&list, all).unwrap().repr().unwrap(), "[0, 1, 2, 3, 4]");
        let rev = SliceBounds { step: Some(-1), ..Default::default() };
        assert_eq!(get_slice(&list, rev).unwrap().repr().unwrap(), "[4, 3, 2, 1, 0]");
        let mid = SliceBounds { lower: Some(1), upper: Some(-1), step: None };
        assert_eq!(get_slice(&list, mid).unwrap().repr().unwrap(), "[1, 2, 3]");
        let s = Value::str("hello");
        let every_other = SliceBounds { step: Some(2), ..Default::default() };
        assert_eq!(get_slice(&s, every_other).unwrap(), Value::str("hlo"));
    }

    #[test]
    fn test_slice_assignment_and_deletion() {
        let list = Value::list((0..5).map(int).collect());
        let bounds = SliceBounds { lower: Some(1), upper: Some(3), step: None };
        set_slice(&list, bounds, &Value::list(vec![int(9)])).unwrap();
        assert_eq!(list.repr().unwrap(), "[0, 9, 3, 4]");
        del_slice(&list, SliceBounds { lower: Some(2), ..Default::default() }).unwrap();
        assert_eq!(list.repr().unwrap(), "[0, 9]");
    }

    #[test]
    fn test_index_errors() {
        let list = Value::list(vec![int(1)]);
        let err = get_item(&list, &int(3)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndexError);
        assert_eq!(err.message, "list index out of range");
        assert_eq!(get_item(&list, &int(-1)).unwrap(), int(1));
        let err = get_item(&int(5), &int(0)).unwrap_err();
        assert_eq!(err.message, "'int' object is not subscriptable");
    }

    #[test]
    fn test_unpack_counts() {
        let pair = Value::tuple(vec![int(1), int(2)]);
        assert_eq!(unpack(&pair, 2).unwrap().len(), 2);
        let err = unpack(&pair, 3).unwrap_err();
        assert_eq!(err.message, "not enough values to unpack (expected 3, got 2)");
        let err = unpack(&pair, 1).unwrap_err();
        assert_eq!(err.message, "too many values to unpack (expected 1)");
        let err = unpack(&int(1), 2).unwrap_err();
        assert_eq!(err.message, "cannot unpack non-iterable int object");
    }

    #[test]
    fn test_range_index_and_length_near_word_limits() {
        let wide = Value::Range(Range { start: -(1 << 62), stop: 1 << 62, step: 1 });
        let err = length(&wide).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OverflowError);
        assert_eq!(get_item(&wide, &int(-1)).unwrap(), int((1 << 62) - 1));
        assert_eq!(get_item(&wide, &int(0)).unwrap(), int(-(1 << 62)));

        let coarse = Value::Range(Range { start: i64::MIN, stop: i64::MAX, step: i64::MAX });
        assert_eq!(get_item(&coarse, &int(2)).unwrap(), int(i64::MAX - 1));
        let err = get_item(&coarse, &int(3)).unwrap_err();
        assert_eq!(err.message, "range object index out of range");
    }

    #[test]
    fn test_range_slices_keep_python_bounds() {
        let r = Value::Range(Range { start: 0, stop: 10, step: 1 });
        let every_third = SliceBounds { step: Some(3), ..Default::default() };
        assert_eq!(get_slice(&r, every_third).unwrap().repr().unwrap(), "range(0, 10, 3)");
        let reversed = SliceBounds { step: Some(-1), ..Default::default() };
        assert_eq!(get_slice(&r, reversed).unwrap().repr().unwrap(), "range(9, -1, -1)");
        let widest = get_slice(&r, SliceBounds { step: Some(i64::MAX), ..Default::default() });
        assert_eq!(widest.unwrap().repr().unwrap(), format!("range(0, 10, {})", i64::MAX));
        let huge = Value::Range(Range { start: 0, stop: 10, step: 1 << 62 });
        let err = get_slice(&huge, SliceBounds { step: Some(4), ..Default::default() }).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OverflowError);
    }

    #[test]
    fn test_dict_resized_during_iteration() {
        let mut d = Dict::new();
        d.insert(Value::str("a"), int(1)).unwrap();
        let dict = Value::dict(d);
        let mut iter = iterate(&dict).unwrap();
        assert_eq!(iter.try_next().unwrap(), Some(Value::str("a")));
        set_item(&dict, &Value::str("b"), int(2)).unwrap();
        let err = iter.try_next().unwrap_err();
        assert_eq!(err.kind, ErrorKind::RuntimeError);
        assert_eq!(err.message, "dictionary changed size during iteration");

        let set = Value::set(Dict::from_keys([int(1), int(2)]).unwrap());
        let mut iter = iterate(&set).unwrap();
        if let Value::Set(members) = &set {
            members.borrow_mut().clear();
        }
        assert_eq!(iter.try_next().unwrap_err().message, "Set changed size during iteration");
    }

    #[test]
    fn test_dict_value_updates_do_not_trip_iteration() {
        let mut d = Dict::new();
        d.insert(Value::str("a"), int(1)).unwrap();
        let dict = Value::dict(d);
        let mut iter = iterate(&dict).unwrap();
        set_item(&dict, &Value::str("a"), int(5)).unwrap();
        assert_eq!(iter.try_next().unwrap(), Some(Value::str("a")));
        assert_eq!(iter.try_next().unwrap(), None);
    }

    #[test]
    fn test_live_list_iteration() {
        let list = Value::list(vec![int(1)]);
        let mut iter = iterate(&list).unwrap();
        assert_eq!(iter.next(), Some(int(1)));
        if let Value::List(items) = &list {
            items.borrow_mut().push(int(2));
        }
        assert_eq!(iter.next(), Some(int(2)));
        assert_eq!(iter.next(), None);
    }
}

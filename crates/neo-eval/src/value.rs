//! Runtime values of the student language.
//!
//! Containers (`list`, `dict`, `set`) are shared and mutable by reference,
//! like Python's: assigning a list to two names aliases it. Everything is
//! `Rc`-based, so an evaluator and its values live on a single thread.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::mem;
use std::ops::Deref;
use std::rc::Rc;

use neo_types::ast::{Expr, Stmt};

use crate::builtins::Builtin;
use crate::env::{Scope, ScopeInfo};
use crate::error::{ErrorKind, EvalResult, RuntimeError};
use crate::limits::{descend, with_stack};

const REPR_CONTEXT: &str = "while getting the repr of an object";
const COMPARE_CONTEXT: &str = "in comparison";

// ══════════════════════════════════════════════════════════════════════════════
// Value
// ══════════════════════════════════════════════════════════════════════════════

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<ListItems>),
    Tuple(Rc<TupleItems>),
    Dict(Rc<RefCell<Dict>>),
    /// A set; stored as a [`Dict`] whose values are all `None`.
    Set(Rc<RefCell<Dict>>),
    /// Live `dict.keys()` / `values()` / `items()` view.
    DictView(DictViewKind, Rc<RefCell<Dict>>),
    Range(Range),
    /// Single-pass iterator (`map`, `filter`, `zip`, generator expressions…).
    Iterator(Rc<IterValue>),
    /// A `def` function or a `lambda`.
    Function(Rc<Function>),
    /// An allow-listed built-in (`len`, `int`, `sorted`, …).
    Builtin(Builtin),
    /// A host-provided callable (`print`, `delay`, arm operations).
    Native(Rc<NativeFunction>),
    /// A built-in method bound to its receiver, e.g. `items.append`.
    Method(Rc<BoundMethod>),
    /// A host object exposing attributes to student code (the arm facade).
    Host(Rc<dyn HostObject>),
}

impl Value {
    /// Build a `str` value.
    pub fn str(s: impl AsRef<str>) -> Value {
        Value::Str(Rc::from(s.as_ref()))
    }

    /// Build a new `list` value.
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(ListItems(RefCell::new(items))))
    }

    /// Build a `tuple` value.
    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::new(TupleItems(items)))
    }

    /// Build a `dict` value.
    pub fn dict(dict: Dict) -> Value {
        Value::Dict(Rc::new(RefCell::new(dict)))
    }

    /// Build a `set` value.
    pub fn set(set: Dict) -> Value {
        Value::Set(Rc::new(RefCell::new(set)))
    }

    /// Build a single-pass iterator value.
    pub fn iterator(kind: &'static str, items: impl IntoIterator<Item = Value>) -> Value {
        Value::Iterator(Rc::new(IterValue {
            kind,
            items: RefCell::new(items.into_iter().collect()),
        }))
    }

    /// Wrap a host closure as a callable value.
    pub fn native(
        name: impl Into<String>,
        func: impl Fn(CallArgs) -> EvalResult<Value> + 'static,
    ) -> Value {
        Value::Native(Rc::new(NativeFunction {
            name: name.into(),
            func: Box::new(func),
        }))
    }

    /// Python type name, as shown in error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Set(_) => "set",
            Value::DictView(kind, _) => kind.type_name(),
            Value::Range(_) => "range",
            Value::Iterator(it) => it.kind,
            Value::Function(_) => "function",
            Value::Builtin(b) if b.is_type() => "type",
            Value::Builtin(_) | Value::Native(_) => "builtin_function_or_method",
            Value::Method(_) => "builtin_function_or_method",
            Value::Host(host) => host.type_name(),
        }
    }

    /// Python truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(d) | Value::Set(d) | Value::DictView(_, d) => !d.borrow().is_empty(),
            Value::Range(r) => !r.is_empty(),
            _ => true,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Whether the value can be called.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::Builtin(_) | Value::Native(_) | Value::Method(_)
        )
    }

    /// `str(value)`
    pub fn to_str(&self) -> EvalResult<String> {
        match self {
            Value::Str(s) => Ok(s.to_string()),
            _ => self.repr(),
        }
    }

    /// `repr(value)`. Fails with `RecursionError` when containers nest
    /// deeper than the recursion limit.
    pub fn repr(&self) -> EvalResult<String> {
        let mut out = String::new();
        let mut seen = HashSet::new();
        write_repr(self, &mut out, &mut seen, 0)?;
        Ok(out)
    }

    /// Python `==`.
    pub fn py_eq(&self, other: &Value) -> EvalResult<bool> {
        eq_at(self, other, 0)
    }

    /// Python `is`: identity for shared objects, equality for scalars.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || (a.is_empty() && b.is_empty()),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) | (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => {
                !matches!(self, Value::Range(_) | Value::DictView(..))
                    && matches!(self.py_eq(other), Ok(true))
            }
        }
    }

    /// Numeric view of `bool`, `int` and `float`.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            Value::Int(n) => Some(Number::Int(*n)),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    /// Integer view for indices and counts (`bool` and `int` only).
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Key used for dict and set membership. Fails for unhashable values.
    pub fn hash_key(&self) -> EvalResult<HashKey> {
        self.hash_key_at(0)
    }

    fn hash_key_at(&self, depth: usize) -> EvalResult<HashKey> {
        Ok(match self {
            Value::None => HashKey::None,
            Value::Bool(b) => HashKey::Int(i64::from(*b)),
            Value::Int(n) => HashKey::Int(*n),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 9.2e18 {
                    HashKey::Int(*f as i64)
                } else {
                    HashKey::Float(f.to_bits())
                }
            }
            Value::Str(s) => HashKey::Str(s.clone()),
            Value::Tuple(items) => {
                let depth = descend(depth, "while hashing a tuple")?;
                HashKey::Tuple(
                    items
                        .iter()
                        .map(|item| with_stack(|| item.hash_key_at(depth)))
                        .collect::<EvalResult<Vec<_>>>()?,
                )
            }
            Value::Range(r) => {
                let (first, last, step) = r.normalized();
                HashKey::Range(first, last, step)
            }
            Value::Builtin(b) => HashKey::Builtin(b.name()),
            Value::Function(f) => HashKey::Identity(Rc::as_ptr(f) as *const () as usize),
            Value::Native(f) => HashKey::Identity(Rc::as_ptr(f) as *const () as usize),
            Value::Iterator(it) => HashKey::Identity(Rc::as_ptr(it) as *const () as usize),
            Value::Host(h) => HashKey::Identity(Rc::as_ptr(h) as *const () as usize),
            Value::List(_)
            | Value::Dict(_)
            | Value::Set(_)
            | Value::DictView(..)
            | Value::Method(_) => {
                return Err(RuntimeError::new(
                    ErrorKind::TypeError,
                    format!("unhashable type: '{}'", self.type_name()),
                ))
            }
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.py_eq(other), Ok(true))
    }
}

/// Values nested past the recursion limit display as `...`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str().as_deref().unwrap_or("..."))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.repr().as_deref().unwrap_or("..."))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

fn eq_at(left: &Value, right: &Value, depth: usize) -> EvalResult<bool> {
    Ok(match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            Rc::ptr_eq(a, b) || seq_eq(&a.borrow(), &b.borrow(), depth)?
        }
        (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b) || seq_eq(a, b, depth)?,
        (Value::Dict(a), Value::Dict(b)) => {
            Rc::ptr_eq(a, b) || a.borrow().dict_eq(&b.borrow(), depth)?
        }
        (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b) || a.borrow().keys_eq(&b.borrow()),
        (Value::Range(a), Value::Range(b)) => a.normalized() == b.normalized(),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
        (Value::Builtin(a), Value::Builtin(b)) => a == b,
        (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
        (Value::Host(a), Value::Host(b)) => Rc::ptr_eq(a, b),
        (Value::Method(a), Value::Method(b)) => {
            a.name == b.name && a.receiver.is_same(&b.receiver)
        }
        _ => match (left.as_number(), right.as_number()) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => a == b,
            (Some(a), Some(b)) => a.to_f64() == b.to_f64(),
            _ => false,
        },
    })
}

fn seq_eq(a: &[Value], b: &[Value], depth: usize) -> EvalResult<bool> {
    if a.len() != b.len() {
        return Ok(false);
    }
    let depth = descend(depth, COMPARE_CONTEXT)?;
    for (x, y) in a.iter().zip(b) {
        if !with_stack(|| eq_at(x, y, depth))? {
            return Ok(false);
        }
    }
    Ok(true)
}

// ── Container storage ─────────────────────────────────────────────────────

/// Elements of a `list`.
pub struct ListItems(RefCell<Vec<Value>>);

impl Deref for ListItems {
    type Target = RefCell<Vec<Value>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for ListItems {
    fn drop(&mut self) {
        release(mem::take(self.0.get_mut()));
    }
}

/// Elements of a `tuple`.
pub struct TupleItems(Vec<Value>);

impl Deref for TupleItems {
    type Target = Vec<Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for TupleItems {
    fn drop(&mut self) {
        release(mem::take(&mut self.0));
    }
}

/// Drop `values` with an explicit work list instead of recursion, so a
/// list nested a million levels deep frees in constant stack.
fn release(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match value {
            Value::List(items) => {
                if let Some(mut items) = Rc::into_inner(items) {
                    pending.append(items.0.get_mut());
                }
            }
            Value::Tuple(items) => {
                if let Some(mut items) = Rc::into_inner(items) {
                    pending.append(&mut items.0);
                }
            }
            Value::Dict(dict) | Value::Set(dict) | Value::DictView(_, dict) => {
                if let Some(dict) = Rc::into_inner(dict) {
                    dict.into_inner().drain_into(&mut pending);
                }
            }
            _ => {}
        }
    }
}

// ── Numbers ───────────────────────────────────────────────────────────────

/// A number extracted from `bool`, `int` or `float`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn to_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Hashing & Dict
// ══════════════════════════════════════════════════════════════════════════════

/// Hashable projection of a value. Numbers that compare equal share a key
/// (`1`, `1.0` and `True` are the same dict key).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    None,
    Int(i64),
    Float(u64),
    Str(Rc<str>),
    Tuple(Vec<HashKey>),
    Range(i64, i64, i64),
    Builtin(&'static str),
    Identity(usize),
}

/// Insertion-ordered hash map backing `dict` and `set`.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
    index: HashMap<HashKey, usize>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> EvalResult<Option<Value>> {
        let hk = key.hash_key()?;
        Ok(self.index.get(&hk).map(|&i| self.entries[i].1.clone()))
    }

    pub fn contains(&self, key: &Value) -> EvalResult<bool> {
        Ok(self.index.contains_key(&key.hash_key()?))
    }

    /// Insert or replace. An existing key keeps its original position.
    pub fn insert(&mut self, key: Value, value: Value) -> EvalResult<()> {
        let hk = key.hash_key()?;
        match self.index.get(&hk) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(hk, self.entries.len());
                self.entries.push((key, value));
            }
        }
        Ok(())
    }

    /// Add a set member.
    pub fn add(&mut self, key: Value) -> EvalResult<()> {
        let hk = key.hash_key()?;
        if !self.index.contains_key(&hk) {
            self.index.insert(hk, self.entries.len());
            self.entries.push((key, Value::None));
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &Value) -> EvalResult<Option<Value>> {
        let hk = key.hash_key()?;
        let Some(i) = self.index.remove(&hk) else {
            return Ok(None);
        };
        let (_, value) = self.entries.remove(i);
        for pos in self.index.values_mut() {
            if *pos > i {
                *pos -= 1;
            }
        }
        Ok(Some(value))
    }

    /// Remove and return the first entry (used by `set.pop`).
    pub fn pop_first(&mut self) -> Option<(Value, Value)> {
        let key = self.entries.first()?.0.clone();
        let value = self.remove(&key).ok().flatten()?;
        Some((key, value))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    fn dict_eq(&self, other: &Dict, depth: usize) -> EvalResult<bool> {
        if self.len() != other.len() {
            return Ok(false);
        }
        let depth = descend(depth, COMPARE_CONTEXT)?;
        for (k, v) in &self.entries {
            let Ok(Some(theirs)) = other.get(k) else {
                return Ok(false);
            };
            if !with_stack(|| eq_at(v, &theirs, depth))? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Move every key and value onto `out`, leaving the dict empty.
    fn drain_into(&mut self, out: &mut Vec<Value>) {
        self.index.clear();
        for (k, v) in self.entries.drain(..) {
            out.push(k);
            out.push(v);
        }
    }

    fn keys_eq(&self, other: &Dict) -> bool {
        self.len() == other.len() && self.keys().all(|k| matches!(other.contains(k), Ok(true)))
    }

    /// Build a set from values, skipping duplicates.
    pub fn from_keys(keys: impl IntoIterator<Item = Value>) -> EvalResult<Dict> {
        let mut set = Dict::new();
        for key in keys {
            set.add(key)?;
        }
        Ok(set)
    }
}

impl Drop for Dict {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            let mut pending = Vec::with_capacity(self.entries.len() * 2);
            self.drain_into(&mut pending);
            release(pending);
        }
    }
}

/// Which view `dict.keys()`, `dict.values()` or `dict.items()` produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictViewKind {
    Keys,
    Values,
    Items,
}

impl DictViewKind {
    pub fn type_name(self) -> &'static str {
        match self {
            DictViewKind::Keys => "dict_keys",
            DictViewKind::Values => "dict_values",
            DictViewKind::Items => "dict_items",
        }
    }

    /// Snapshot the view's current contents.
    pub fn collect(self, dict: &Dict) -> Vec<Value> {
        match self {
            DictViewKind::Keys => dict.keys().cloned().collect(),
            DictViewKind::Values => dict.values().cloned().collect(),
            DictViewKind::Items => dict
                .entries()
                .iter()
                .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
                .collect(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Range & Iterators
// ══════════════════════════════════════════════════════════════════════════════

/// `range(start, stop, step)`; `step` is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl Range {
    /// Number of elements. Wider than `i64` so `range(-2**63, 2**63 - 1)`
    /// is counted exactly.
    pub fn count(&self) -> i128 {
        span_len(self.start.into(), self.stop.into(), self.step.into())
    }

    /// `len(range)`; fails when the length does not fit in an `int`.
    pub fn len(&self) -> EvalResult<i64> {
        i64::try_from(self.count()).map_err(|_| RuntimeError::overflow(SSIZE_OVERFLOW))
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Element at a position in `0..count()`.
    pub fn at(&self, i: i128) -> i64 {
        (i128::from(self.start) + i * i128::from(self.step)) as i64
    }

    pub fn contains(&self, n: i64) -> bool {
        let count = self.count();
        if count == 0 {
            return false;
        }
        let offset = i128::from(n) - i128::from(self.start);
        let step = i128::from(self.step);
        offset % step == 0 && (0..count).contains(&(offset / step))
    }

    /// `(first, last, step)`; ranges with the same elements compare equal.
    fn normalized(&self) -> (i64, i64, i64) {
        match self.count() {
            0 => (0, -1, 1),
            1 => (self.start, self.start, 1),
            n => (self.start, self.at(n - 1), self.step),
        }
    }
}

/// Message Python gives when a length or index exceeds a machine word.
pub(crate) const SSIZE_OVERFLOW: &str = "Python int too large to convert to C ssize_t";

/// Number of steps from `start` toward `stop` (exclusive).
pub(crate) fn span_len(start: i128, stop: i128, step: i128) -> i128 {
    if step > 0 && start < stop {
        (stop - start - 1) / step + 1
    } else if step < 0 && start > stop {
        (start - stop - 1) / (-step) + 1
    } else {
        0
    }
}

/// Shared state of a single-pass iterator.
pub struct IterValue {
    /// Python type name: `map`, `filter`, `zip`, `enumerate`, `generator`…
    pub kind: &'static str,
    pub items: RefCell<VecDeque<Value>>,
}

impl IterValue {
    pub fn next(&self) -> Option<Value> {
        self.items.borrow_mut().pop_front()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Callables
// ══════════════════════════════════════════════════════════════════════════════

/// Body of a user-defined function.
pub enum FunctionBody {
    Block(Rc<[Stmt]>),
    Lambda(Rc<Expr>),
}

/// A user-defined function or lambda.
pub struct Function {
    pub name: String,
    /// Line of the `def` or `lambda`.
    pub line: u32,
    pub params: Vec<String>,
    /// Default values, aligned with `params`.
    pub defaults: Vec<Option<Value>>,
    pub body: FunctionBody,
    /// Scope the function was defined in (`None` at module level).
    pub closure: Option<Rc<Scope>>,
    /// Local and `global` names of the body, resolved at definition time.
    pub info: Rc<ScopeInfo>,
}

/// Arguments of a call: positional values and `name=value` keywords.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords(positional: Vec<Value>, keywords: Vec<(String, Value)>) -> Self {
        Self {
            positional,
            keywords,
        }
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    /// Remove and return a keyword argument.
    pub fn take_keyword(&mut self, name: &str) -> Option<Value> {
        let pos = self.keywords.iter().position(|(k, _)| k == name)?;
        Some(self.keywords.remove(pos).1)
    }

    /// Fail if any keyword argument is left over.
    pub fn reject_keywords(&self, func: &str) -> EvalResult<()> {
        match self.keywords.first() {
            Some((name, _)) => Err(RuntimeError::new(
                ErrorKind::TypeError,
                format!("{func}() got an unexpected keyword argument '{name}'"),
            )),
            None => Ok(()),
        }
    }

    /// Check the positional count lies in `min..=max`.
    pub fn expect_count(&self, func: &str, min: usize, max: usize) -> EvalResult<()> {
        let n = self.positional.len();
        if n >= min && n <= max {
            return Ok(());
        }
        let message = if min == max {
            match min {
                0 => format!("{func}() takes no arguments ({n} given)"),
                1 => format!("{func}() takes exactly one argument ({n} given)"),
                _ => format!("{func}() takes exactly {min} arguments ({n} given)"),
            }
        } else if n < min {
            format!("{func}() expected at least {min} argument{}, got {n}", plural(min))
        } else {
            format!("{func}() expected at most {max} argument{}, got {n}", plural(max))
        };
        Err(RuntimeError::new(ErrorKind::TypeError, message))
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Host callable signature.
pub type NativeFn = dyn Fn(CallArgs) -> EvalResult<Value>;

/// A callable provided by the embedding application.
pub struct NativeFunction {
    pub name: String,
    pub func: Box<NativeFn>,
}

impl NativeFunction {
    pub fn call(&self, args: CallArgs) -> EvalResult<Value> {
        (self.func)(args)
    }
}

/// A built-in method bound to its receiver.
pub struct BoundMethod {
    pub receiver: Value,
    pub name: String,
}

/// An object supplied by the host whose attributes student code may read.
///
/// Attribute writes are always rejected by the evaluator.
pub trait HostObject {
    /// Type name used in `repr` and error messages.
    fn type_name(&self) -> &str;

    /// Look up a public attribute (names never start with `_`).
    fn attribute(&self, name: &str) -> Option<Value>;

    fn repr(&self) -> String {
        format!("<{} object>", self.type_name())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// repr()
// ══════════════════════════════════════════════════════════════════════════════

fn write_repr(
    value: &Value,
    out: &mut String,
    seen: &mut HashSet<usize>,
    depth: usize,
) -> EvalResult<()> {
    match value {
        Value::None => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Float(f) => out.push_str(&format_float(*f)),
        Value::Str(s) => out.push_str(&repr_str(s)),
        Value::List(items) => {
            let id = Rc::as_ptr(items) as *const () as usize;
            if !seen.insert(id) {
                out.push_str("[...]");
                return Ok(());
            }
            out.push('[');
            write_items(&items.borrow(), out, seen, depth)?;
            out.push(']');
            seen.remove(&id);
        }
        Value::Tuple(items) => {
            out.push('(');
            write_items(items, out, seen, depth)?;
            if items.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        Value::Dict(dict) => {
            let id = Rc::as_ptr(dict) as *const () as usize;
            if !seen.insert(id) {
                out.push_str("{...}");
                return Ok(());
            }
            let depth = descend(depth, REPR_CONTEXT)?;
            out.push('{');
            for (i, (k, v)) in dict.borrow().entries().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                with_stack(|| write_repr(k, out, seen, depth))?;
                out.push_str(": ");
                with_stack(|| write_repr(v, out, seen, depth))?;
            }
            out.push('}');
            seen.remove(&id);
        }
        Value::Set(set) => {
            let set = set.borrow();
            if set.is_empty() {
                out.push_str("set()");
                return Ok(());
            }
            let depth = descend(depth, REPR_CONTEXT)?;
            out.push('{');
            for (i, k) in set.keys().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                with_stack(|| write_repr(k, out, seen, depth))?;
            }
            out.push('}');
        }
        Value::DictView(kind, dict) => {
            out.push_str(kind.type_name());
            out.push_str("([");
            write_items(&kind.collect(&dict.borrow()), out, seen, depth)?;
            out.push_str("])");
        }
        Value::Range(r) => {
            if r.step == 1 {
                out.push_str(&format!("range({}, {})", r.start, r.stop));
            } else {
                out.push_str(&format!("range({}, {}, {})", r.start, r.stop, r.step));
            }
        }
        Value::Iterator(it) => match it.kind {
            "generator" => out.push_str("<generator object <genexpr>>"),
            kind => out.push_str(&format!("<{kind} object>")),
        },
        Value::Function(f) => out.push_str(&format!("<function {}>", f.name)),
        Value::Builtin(b) if b.is_type() => out.push_str(&format!("<class '{}'>", b.name())),
        Value::Builtin(b) => out.push_str(&format!("<built-in function {}>", b.name())),
        Value::Native(f) => out.push_str(&format!("<built-in function {}>", f.name)),
        Value::Method(m) => out.push_str(&format!(
            "<built-in method {} of {} object>",
            m.name,
            m.receiver.type_name()
        )),
        Value::Host(h) => out.push_str(&h.repr()),
    }
    Ok(())
}

fn write_items(
    items: &[Value],
    out: &mut String,
    seen: &mut HashSet<usize>,
    depth: usize,
) -> EvalResult<()> {
    let depth = descend(depth, REPR_CONTEXT)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        with_stack(|| write_repr(item, out, seen, depth))?;
    }
    Ok(())
}

/// Quote a string the way Python's `repr` does.
pub fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Format a float like Python's `repr`: shortest round-trip digits,
/// positional between 1e-4 and 1e16, scientific outside.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    // `{:e}` yields the shortest round-trip mantissa, e.g. "1.2345e4"
    let sci = format!("{f:e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let negative = mantissa.starts_with('-');
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let sign = if negative { "-" } else { "" };

    if (-4..16).contains(&exp) {
        let point = exp + 1; // digits before the decimal point
        let body = if point <= 0 {
            format!("0.{}{}", "0".repeat((-point) as usize), digits)
        } else if point as usize >= digits.len() {
            format!("{}{}.0", digits, "0".repeat(point as usize - digits.len()))
        } else {
            let (int_part, frac) = digits.split_at(point as usize);
            format!("{int_part}.{frac}")
        };
        format!("{sign}{body}")
    } else {
        let (first, rest) = digits.split_at(1);
        let mantissa = if rest.is_empty() {
            first.to_string()
        } else {
            format!("{first}.{rest}")
        };
        let exp_sign = if exp < 0 { '-' } else { '+' };
        format!("{sign}{mantissa}e{exp_sign}{:02}", exp.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_repr_matches_python() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(123456789.0), "123456789.0");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(0.00001), "1e-05");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn test_str_repr_quotes() {
        assert_eq!(repr_str("hi"), "'hi'");
        assert_eq!(repr_str("it's"), "\"it's\"");
        assert_eq!(repr_str("a\nb"), "'a\\nb'");
        assert_eq!(repr_str("both ' and \""), "'both \\' and \"'");
    }

    #[test]
    fn test_container_repr() {
        let list = Value::list(vec![Value::Int(1), Value::str("a"), Value::None]);
        assert_eq!(list.repr().unwrap(), "[1, 'a', None]");
        assert_eq!(Value::tuple(vec![Value::Int(1)]).repr().unwrap(), "(1,)");
        assert_eq!(Value::tuple(vec![]).repr().unwrap(), "()");
        let mut d = Dict::new();
        d.insert(Value::str("k"), Value::Int(2)).unwrap();
        assert_eq!(Value::dict(d).repr().unwrap(), "{'k': 2}");
        assert_eq!(Value::set(Dict::new()).repr().unwrap(), "set()");
        let r = Range { start: 0, stop: 3, step: 1 };
        assert_eq!(Value::Range(r).repr().unwrap(), "range(0, 3)");
    }

    #[test]
    fn test_recursive_list_repr() {
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(list.repr().unwrap(), "[1, [...]]");
    }

    #[test]
    fn test_numeric_equality_across_types() {
        assert!(Value::Int(1).py_eq(&Value::Float(1.0)).unwrap());
        assert!(Value::Bool(true).py_eq(&Value::Int(1)).unwrap());
        assert!(!Value::Int(1).py_eq(&Value::str("1")).unwrap());
    }

    #[test]
    fn test_dict_keys_unify_numbers() {
        let mut d = Dict::new();
        d.insert(Value::Int(1), Value::str("int")).unwrap();
        d.insert(Value::Float(1.0), Value::str("float")).unwrap();
        d.insert(Value::Bool(true), Value::str("bool")).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d.get(&Value::Int(1)).unwrap(), Some(Value::str("bool")));
        assert_eq!(d.keys().next().unwrap().repr().unwrap(), "1");
    }

    #[test]
    fn test_dict_remove_keeps_order() {
        let mut d = Dict::new();
        for k in ["a", "b", "c"] {
            d.insert(Value::str(k), Value::None).unwrap();
        }
        d.remove(&Value::str("a")).unwrap();
        d.insert(Value::str("a"), Value::None).unwrap();
        let keys: Vec<String> = d.keys().map(|k| k.to_str().unwrap()).collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
        assert_eq!(d.get(&Value::str("c")).unwrap(), Some(Value::None));
    }

    #[test]
    fn test_unhashable_key() {
        let err = Value::list(vec![]).hash_key().unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(err.message, "unhashable type: 'list'");
    }

    #[test]
    fn test_range_len_and_contains() {
        let r = Range { start: 0, stop: 10, step: 3 };
        assert_eq!(r.len().unwrap(), 4);
        assert!(r.contains(9));
        assert!(!r.contains(10));
        let down = Range { start: 5, stop: 0, step: -2 };
        assert_eq!(down.len().unwrap(), 3);
        assert!(down.contains(1));
        assert!(Range { start: 3, stop: 3, step: 1 }.is_empty());
    }

    #[test]
    fn test_widest_range_counts_without_wrapping() {
        let widest = Range { start: i64::MIN, stop: i64::MAX, step: 1 };
        assert_eq!(widest.count(), i128::from(u64::MAX));
        let err = widest.len().unwrap_err();
        assert_eq!(err.kind, ErrorKind::OverflowError);
        assert_eq!(err.message, "Python int too large to convert to C ssize_t");

        let half = Range { start: -(1 << 62), stop: 1 << 62, step: 1 };
        assert!(half.len().is_err());
        assert_eq!(half.at(half.count() - 1), (1 << 62) - 1);

        let coarse = Range { start: i64::MIN, stop: i64::MAX, step: i64::MAX };
        assert_eq!(coarse.count(), 3);
        assert_eq!(coarse.at(2), i64::MAX - 1);
        assert!(coarse.contains(-1));
    }

    #[test]
    fn test_ranges_with_same_elements_are_equal() {
        let a = Value::Range(Range { start: 0, stop: 10, step: 3 });
        let b = Value::Range(Range { start: 0, stop: 11, step: 3 });
        let c = Value::Range(Range { start: 0, stop: 1, step: 5 });
        let d = Value::Range(Range { start: 0, stop: 1, step: 1 });
        let empty = Value::Range(Range { start: 5, stop: 0, step: 1 });
        assert_eq!(a, b);
        assert_eq!(c, d);
        assert_ne!(d, empty);
        assert_eq!(a.hash_key().unwrap(), b.hash_key().unwrap());
    }

    fn nest_lists(depth: usize) -> Value {
        let mut value = Value::list(vec![]);
        for _ in 0..depth {
            value = Value::list(vec![value]);
        }
        value
    }

    #[test]
    fn test_deep_repr_raises_recursion_error() {
        let _limit = crate::limits::NestingScope::enter(50);
        assert!(nest_lists(40).repr().is_ok());
        let err = nest_lists(60).to_str().unwrap_err();
        assert_eq!(err.kind, ErrorKind::RecursionError);
        assert_eq!(
            err.message,
            "maximum recursion depth exceeded while getting the repr of an object"
        );
    }

    #[test]
    fn test_deep_equality_raises_recursion_error() {
        let _limit = crate::limits::NestingScope::enter(50);
        assert!(nest_lists(40).py_eq(&nest_lists(40)).unwrap());
        let err = nest_lists(60).py_eq(&nest_lists(60)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RecursionError);
        assert!(err.message.ends_with("in comparison"));
        assert_ne!(nest_lists(60), nest_lists(60));
    }

    #[test]
    fn test_deeply_nested_containers_drop_on_small_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                drop(nest_lists(1_000_000));
                let mut tuple = Value::tuple(vec![]);
                for _ in 0..1_000_000 {
                    tuple = Value::tuple(vec![tuple]);
                }
                drop(tuple);
                let mut dict = Value::dict(Dict::new());
                for _ in 0..1_000_000 {
                    let mut outer = Dict::new();
                    outer.insert(Value::str("next"), dict).unwrap();
                    dict = Value::dict(outer);
                }
                drop(dict);
            })
            .unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_shared_child_survives_parent_drop() {
        let child = Value::list(vec![Value::Int(7)]);
        drop(Value::list(vec![child.clone(), Value::tuple(vec![child.clone()])]));
        assert_eq!(child.repr().unwrap(), "[7]");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::str("").is_truthy());
        assert!(!Value::list(vec![]).is_truthy());
        assert!(Value::list(vec![Value::None]).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
    }
}

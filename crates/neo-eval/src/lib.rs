//! NEO tree-walking evaluator.
//!
//! Executes the beginner Python subset parsed by `neo-parser` directly from
//! the AST. The host supplies the globals namespace (for example the robot
//! facade and a capturing `print`) and the allow-listed built-ins from
//! [`builtin_table`]; student code can reach nothing else.
//!
//! Values are reference counted with interior mutability, so an
//! [`Evaluator`] and everything it produces stay on the thread that created
//! them. Use an [`InterruptHandle`] to stop a run from another thread.

mod builtins;
mod env;
mod error;
mod evaluator;
mod format;
mod limits;
mod methods;
mod ops;
mod value;

pub use builtins::{builtin_table, parse_int, to_float, to_int, Builtin};
pub use env::{new_namespace, Builtins, Environment, Namespace};
pub use error::{ErrorKind, EvalResult, Frame, RuntimeError};
pub use evaluator::{DisplayHook, Evaluator};
pub use format::format_value;
pub use limits::{InterruptHandle, Limits, DEFAULT_RECURSION_LIMIT, SLEEP_SLICE};
pub use value::{
    format_float, repr_str, CallArgs, Dict, Function, HostObject, ListItems, NativeFunction, Range,
    TupleItems, Value,
};

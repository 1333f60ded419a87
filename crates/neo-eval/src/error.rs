//! Runtime error types for the NEO evaluator.

use std::fmt;

use neo_types::STUDENT_FILE;

use crate::value::Value;

/// Kind of a runtime failure, named after the Python exception it mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NameError,
    UnboundLocalError,
    TypeError,
    ValueError,
    ZeroDivisionError,
    IndexError,
    KeyError,
    AttributeError,
    ImportError,
    AssertionError,
    RecursionError,
    OverflowError,
    StopIteration,
    /// A container was mutated in a way the running loop cannot follow.
    RuntimeError,
    /// The host asked the running program to stop.
    KeyboardInterrupt,
    /// The configured step limit ran out.
    ExecutionLimit,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::NameError => "NameError",
            Self::UnboundLocalError => "UnboundLocalError",
            Self::TypeError => "TypeError",
            Self::ValueError => "ValueError",
            Self::ZeroDivisionError => "ZeroDivisionError",
            Self::IndexError => "IndexError",
            Self::KeyError => "KeyError",
            Self::AttributeError => "AttributeError",
            Self::ImportError => "ImportError",
            Self::AssertionError => "AssertionError",
            Self::RecursionError => "RecursionError",
            Self::OverflowError => "OverflowError",
            Self::StopIteration => "StopIteration",
            Self::RuntimeError => "RuntimeError",
            Self::KeyboardInterrupt => "KeyboardInterrupt",
            Self::ExecutionLimit => "ExecutionLimit",
        }
    }

    /// Whether a bare `except:` may handle this error.
    pub fn is_catchable(self) -> bool {
        !matches!(self, Self::KeyboardInterrupt | Self::ExecutionLimit)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of a runtime traceback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// `<module>`, `<lambda>`, or the function name.
    pub function: String,
    /// Source file the frame executes; student code is [`STUDENT_FILE`].
    pub file: String,
    /// 1-based line being executed when the error occurred.
    pub line: u32,
}

/// A runtime failure raised by student code, a built-in, or the host.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Frames innermost first. Empty until the error leaves the statement
    /// that raised it.
    pub traceback: Vec<Frame>,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            traceback: Vec::new(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValueError, message)
    }

    pub fn name_error(name: &str) -> Self {
        Self::new(ErrorKind::NameError, format!("name '{name}' is not defined"))
    }

    pub fn attribute_error(type_name: &str, attr: &str) -> Self {
        Self::new(
            ErrorKind::AttributeError,
            format!("'{type_name}' object has no attribute '{attr}'"),
        )
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IndexError, message)
    }

    /// `KeyError` whose message is the key's repr, as Python prints it.
    pub fn key_error(key: &Value) -> Self {
        Self::new(ErrorKind::KeyError, format!("{key:?}"))
    }

    /// `RecursionError`; `context` names the operation that nested too deep.
    pub fn recursion(context: &str) -> Self {
        let message = if context.is_empty() {
            "maximum recursion depth exceeded".to_string()
        } else {
            format!("maximum recursion depth exceeded {context}")
        };
        Self::new(ErrorKind::RecursionError, message)
    }

    pub fn zero_division(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ZeroDivisionError, message)
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OverflowError, message)
    }

    pub fn interrupted() -> Self {
        Self::new(ErrorKind::KeyboardInterrupt, "execution stopped by user")
    }

    /// Line of the innermost frame belonging to student code.
    pub fn student_line(&self) -> Option<u32> {
        self.traceback
            .iter()
            .find(|frame| frame.file == STUDENT_FILE)
            .map(|frame| frame.line)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, RuntimeError>;

/// How a statement finished.
#[derive(Debug, Clone)]
pub(crate) enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = RuntimeError::zero_division("division by zero");
        assert_eq!(err.to_string(), "ZeroDivisionError: division by zero");
        let bare = RuntimeError::new(ErrorKind::AssertionError, "");
        assert_eq!(bare.to_string(), "AssertionError");
    }

    #[test]
    fn test_key_error_uses_repr() {
        let err = RuntimeError::key_error(&Value::str("speed"));
        assert_eq!(err.message, "'speed'");
    }

    #[test]
    fn test_student_line_picks_innermost_student_frame() {
        let mut err = RuntimeError::name_error("x");
        err.traceback = vec![
            Frame {
                function: "print".into(),
                file: "<host>".into(),
                line: 0,
            },
            Frame {
                function: "f".into(),
                file: STUDENT_FILE.into(),
                line: 4,
            },
            Frame {
                function: "<module>".into(),
                file: STUDENT_FILE.into(),
                line: 9,
            },
        ];
        assert_eq!(err.student_line(), Some(4));
    }

    #[test]
    fn test_interrupt_is_not_catchable() {
        assert!(!ErrorKind::KeyboardInterrupt.is_catchable());
        assert!(!ErrorKind::ExecutionLimit.is_catchable());
        assert!(ErrorKind::ValueError.is_catchable());
    }
}

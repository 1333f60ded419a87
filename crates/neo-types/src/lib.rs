//! Shared types for the NEO student-code toolchain.
//!
//! This crate defines the AST node types, source spans, syntax-error types,
//! and other shared data structures used by the lexer, parser and evaluator.

mod error;
mod span;
pub mod ast;

pub use error::{ErrorCategory, ErrorCode, SyntaxError, SyntaxErrors, MAX_ERRORS};
pub use span::{SourceFile, Span, STUDENT_FILE};

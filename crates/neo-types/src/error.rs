use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of errors collected before the lexer/parser stop.
pub const MAX_ERRORS: usize = 20;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Indentation,
    Structure,
}

/// Numeric error code (E100–E399).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNCLOSED_BRACKET: Self = Self(101);
    pub const UNTERMINATED_STRING: Self = Self(102);
    pub const UNSUPPORTED_KEYWORD: Self = Self(103);
    pub const INVALID_TARGET: Self = Self(104);
    pub const INVALID_LITERAL: Self = Self(105);
    pub const INVALID_CHARACTER: Self = Self(106);

    // ── Indentation errors (E200–E299) ──
    pub const UNEXPECTED_INDENT: Self = Self(200);
    pub const EXPECTED_INDENT: Self = Self(201);
    pub const INCONSISTENT_DEDENT: Self = Self(202);

    // ── Structure errors (E300–E399) ──
    pub const NESTING_LIMIT_EXCEEDED: Self = Self(300);
    pub const MISPLACED_STATEMENT: Self = Self(301);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            200..=299 => ErrorCategory::Indentation,
            300..=399 => ErrorCategory::Structure,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Indentation => write!(f, "indentation"),
            Self::Structure => write!(f, "structure"),
        }
    }
}

/// A structured compile-time error in student code.
///
/// The executor renders these as `Syntax Error (line N): <message>`; front
/// ends that want more context can use the span and source line directly.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{span}: {code} [{category}] {message}")]
pub struct SyntaxError {
    /// Source file name.
    pub file: String,
    /// Error code (e.g., E100).
    pub code: ErrorCode,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Source location.
    #[serde(flatten)]
    pub span: Span,
    /// The exact source line for context.
    pub source_line: String,
    /// Optional fix suggestion shown to the student.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl SyntaxError {
    /// Create a new error.
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
            suggestion: None,
        }
    }

    /// Attach a fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// 1-based line of the offending token.
    pub fn line(&self) -> u32 {
        self.span.start_line
    }
}

/// Errors collected by one lexing or parsing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxErrors {
    pub errors: Vec<SyntaxError>,
    pub total_errors: usize,
}

impl SyntaxErrors {
    /// Create an empty collection.
    pub fn empty() -> Self {
        Self {
            errors: Vec::new(),
            total_errors: 0,
        }
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Whether the error cap has been reached.
    pub fn is_full(&self) -> bool {
        self.total_errors >= MAX_ERRORS
    }

    /// Add an error, respecting the MAX_ERRORS limit.
    pub fn push_error(&mut self, error: SyntaxError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// Append every error of `other`, keeping source order.
    pub fn extend(&mut self, other: SyntaxErrors) {
        for error in other.errors {
            self.push_error(error);
        }
    }

    /// The error reported to the student: the one earliest in the source.
    pub fn first(&self) -> Option<&SyntaxError> {
        self.errors
            .iter()
            .min_by_key(|e| (e.span.start_line, e.span.start_col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_category() {
        assert_eq!(
            ErrorCode::UNEXPECTED_TOKEN.category(),
            ErrorCategory::Syntax
        );
        assert_eq!(
            ErrorCode::INCONSISTENT_DEDENT.category(),
            ErrorCategory::Indentation
        );
        assert_eq!(
            ErrorCode::NESTING_LIMIT_EXCEEDED.category(),
            ErrorCategory::Structure
        );
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::UNEXPECTED_TOKEN), "E100");
        assert_eq!(format!("{}", ErrorCode::EXPECTED_INDENT), "E201");
    }

    #[test]
    fn test_syntax_error_display() {
        let err = SyntaxError::new(
            "<student>",
            ErrorCode::UNEXPECTED_TOKEN,
            "expected ')', got end of input",
            Span::new(1, 15, 1, 15),
            "arm.turn_left(",
        );
        assert_eq!(
            err.to_string(),
            "1:15: E100 [syntax] expected ')', got end of input"
        );
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn test_syntax_error_with_suggestion() {
        let err = SyntaxError::new(
            "<student>",
            ErrorCode::EXPECTED_INDENT,
            "expected an indented block",
            Span::point(2, 1),
            "arm.grab()",
        )
        .with_suggestion("indent the body of the block with four spaces");
        assert_eq!(
            err.suggestion.as_deref(),
            Some("indent the body of the block with four spaces")
        );
    }

    #[test]
    fn test_syntax_error_json_serialization() {
        let err = SyntaxError::new(
            "<student>",
            ErrorCode::UNTERMINATED_STRING,
            "unterminated string literal",
            Span::new(3, 7, 3, 12),
            "print('hi",
        );
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"code\":102"));
        assert!(json.contains("\"line\":3"));
        assert!(json.contains("\"category\":\"syntax\""));
        assert!(!json.contains("suggestion"));

        let back: SyntaxError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.code, err.code);
        assert_eq!(back.span, err.span);
    }

    #[test]
    fn test_syntax_errors_max_limit() {
        let mut errs = SyntaxErrors::empty();
        for i in 0..25 {
            errs.push_error(SyntaxError::new(
                "<student>",
                ErrorCode::UNEXPECTED_TOKEN,
                format!("Error {i}"),
                Span::point(i as u32 + 1, 1),
                "",
            ));
        }
        assert_eq!(errs.errors.len(), 20);
        assert_eq!(errs.total_errors, 25);
        assert!(errs.is_full());
    }

    #[test]
    fn test_first_is_earliest_in_source() {
        let mut errs = SyntaxErrors::empty();
        errs.push_error(SyntaxError::new(
            "<student>",
            ErrorCode::UNEXPECTED_TOKEN,
            "later",
            Span::point(4, 2),
            "",
        ));
        errs.push_error(SyntaxError::new(
            "<student>",
            ErrorCode::UNTERMINATED_STRING,
            "earlier",
            Span::point(2, 9),
            "",
        ));
        assert_eq!(errs.first().map(|e| e.message.as_str()), Some("earlier"));
        assert!(SyntaxErrors::empty().first().is_none());
    }
}

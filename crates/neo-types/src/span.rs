use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Region of student source covered by a token or AST node.
///
/// Lines and columns are 1-based; `end_col` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "line")]
    pub start_line: u32,
    #[serde(rename = "column")]
    pub start_col: u32,
    pub end_line: u32,
    #[serde(rename = "end_column")]
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Empty span at one position (end of input, missing tokens).
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }

    fn start(&self) -> (u32, u32) {
        (self.start_line, self.start_col)
    }

    fn end(&self) -> (u32, u32) {
        (self.end_line, self.end_col)
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        let (start_line, start_col) = self.start().min(other.start());
        let (end_line, end_col) = self.end().max(other.end());
        Span::new(start_line, start_col, end_line, end_col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line, col) = self.start();
        write!(f, "{line}:{col}")
    }
}

/// Name given to student code in spans, frames and error messages.
pub const STUDENT_FILE: &str = "<student>";

/// Program text plus a line index used to quote the offending line in
/// syntax errors.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    lines: Vec<Range<usize>>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let mut lines = Vec::new();
        let mut start = 0;
        for (newline, _) in source.match_indices('\n') {
            lines.push(start..newline);
            start = newline + 1;
        }
        lines.push(start..source.len());
        Self {
            name: name.into(),
            source,
            lines,
        }
    }

    /// Wrap student-authored code under the [`STUDENT_FILE`] name.
    pub fn student(source: impl Into<String>) -> Self {
        Self::new(STUDENT_FILE, source)
    }

    /// Text of 1-based line `number` without its line terminator.
    pub fn line(&self, number: u32) -> Option<&str> {
        let range = self.lines.get(usize::try_from(number).ok()?.checked_sub(1)?)?;
        Some(self.source[range.clone()].trim_end_matches('\r'))
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_spans_lines() {
        let call = Span::new(1, 1, 1, 15);
        let arg = Span::new(2, 5, 2, 9);
        assert_eq!(call.merge(arg), Span::new(1, 1, 2, 9));
        assert_eq!(arg.merge(call), Span::new(1, 1, 2, 9));
    }

    #[test]
    fn test_merge_same_line_takes_outer_columns() {
        let merged = Span::new(3, 5, 3, 10).merge(Span::new(3, 2, 3, 8));
        assert_eq!(merged, Span::new(3, 2, 3, 10));
    }

    #[test]
    fn test_point_and_display() {
        let eof = Span::point(4, 1);
        assert_eq!(eof.start(), eof.end());
        assert_eq!(Span::new(3, 7, 3, 15).to_string(), "3:7");
    }

    #[test]
    fn test_span_json_field_names() {
        let json = serde_json::to_string(&Span::new(2, 4, 2, 9)).unwrap();
        assert!(json.contains("\"line\":2"));
        assert!(json.contains("\"column\":4"));
        assert!(json.contains("\"end_column\":9"));
    }

    #[test]
    fn test_line_lookup() {
        let src = SourceFile::student("arm.grab()\ndelay(1)\nprint('hi')");
        assert_eq!(src.name, STUDENT_FILE);
        assert_eq!(src.line(1), Some("arm.grab()"));
        assert_eq!(src.line(3), Some("print('hi')"));
        assert_eq!(src.line(0), None);
        assert_eq!(src.line(4), None);
    }

    #[test]
    fn test_crlf_and_trailing_newline() {
        let src = SourceFile::student("x = 1\r\ny = 2\r\n");
        assert_eq!(src.line(2), Some("y = 2"));
        assert_eq!(src.line(3), Some(""));
        assert_eq!(src.line_count(), 3);
    }

    #[test]
    fn test_empty_source_has_one_line() {
        let src = SourceFile::student("");
        assert_eq!(src.line_count(), 1);
        assert_eq!(src.line(1), Some(""));
    }
}

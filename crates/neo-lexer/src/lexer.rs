//! Tokenizer for student programs.
//!
//! - Python-style layout: `Newline`, `Indent` and `Dedent` tokens from
//!   leading whitespace, implicit line joining inside brackets, `\` continuation
//! - `#` comments stripped, blank lines skipped
//! - Single, double and triple-quoted strings, `r` and `f` prefixes
//! - f-string interpolation with `{expr}` / `{expr:spec}` via a mode stack
//! - Bad characters are reported and skipped, up to [`neo_types::MAX_ERRORS`]

use std::collections::VecDeque;

use neo_types::{ErrorCode, SourceFile, Span, SyntaxError, SyntaxErrors};

use crate::token::{Token, TokenKind};

/// Width a tab advances indentation to (next multiple of 8).
const TAB_WIDTH: u32 = 8;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Quoting of the string currently being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Quote {
    ch: u8,
    triple: bool,
    raw: bool,
}

/// Lexer mode: tracks whether we're scanning code, f-string text, or an
/// f-string replacement field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Normal code scanning.
    Normal,
    /// Inside f-string text: scanning until the closing quote or `{`.
    FString(Quote),
    /// Inside a `{...}` replacement field. `base` is the bracket nesting
    /// depth at the opening `{`, so we know which `}` closes the field.
    Interpolation { base: usize, quote: Quote },
}

/// Byte-level scanner producing [`Token`]s.
pub struct Lexer<'src> {
    source: &'src [u8],
    source_file: &'src SourceFile,
    pos: usize,
    line: u32,
    /// Counted in characters, not bytes.
    col: u32,
    errors: SyntaxErrors,
    /// Mode stack for f-string interpolation.
    mode_stack: Vec<Mode>,
    /// Tokens queued ahead of the scanner (dedent runs, `{` after f-string text).
    pending: VecDeque<Token>,
    /// Indentation widths of the enclosing blocks; always starts with 0.
    indent_stack: Vec<u32>,
    /// Open brackets with their spans, for implicit line joining.
    nesting: Vec<(u8, Span)>,
    /// Whether the scanner sits at the start of a physical line.
    at_line_start: bool,
    /// Whether a significant token was emitted since the last `Newline`.
    line_open: bool,
}

/// Tokens and errors of one lexing pass.
pub struct LexResult {
    /// Terminated by a single [`TokenKind::Eof`].
    pub tokens: Vec<Token>,
    pub errors: SyntaxErrors,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        let source = source_file.source.as_bytes();
        Self {
            source,
            source_file,
            // a UTF-8 byte-order mark is not part of the program
            pos: if source.starts_with(UTF8_BOM) { UTF8_BOM.len() } else { 0 },
            line: 1,
            col: 1,
            errors: SyntaxErrors::empty(),
            mode_stack: vec![Mode::Normal],
            pending: VecDeque::new(),
            indent_stack: vec![0],
            nesting: Vec::new(),
            at_line_start: true,
            line_open: false,
        }
    }

    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.is_full() {
                break;
            }

            let token = match self.pending.pop_front() {
                Some(pending) => pending,
                None => match self.current_mode() {
                    Mode::Normal | Mode::Interpolation { .. } => self.scan_normal(),
                    Mode::FString(quote) => {
                        let (line, col) = (self.line, self.col);
                        self.scan_fstring_text(quote, false, line, col)
                    }
                },
            };

            match token.kind {
                TokenKind::Newline => self.line_open = false,
                TokenKind::Indent | TokenKind::Dedent | TokenKind::Eof => {}
                _ => self.line_open = true,
            }

            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        if !matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Mode stack helpers
    // ─────────────────────────────────────────────────────────────

    fn current_mode(&self) -> Mode {
        *self.mode_stack.last().unwrap_or(&Mode::Normal)
    }

    fn replace_mode(&mut self, mode: Mode) {
        if self.mode_stack.len() > 1 {
            self.mode_stack.pop();
        }
        self.mode_stack.push(mode);
    }

    fn pop_mode(&mut self) {
        if self.mode_stack.len() > 1 {
            self.mode_stack.pop();
        }
    }

    fn in_fstring(&self) -> bool {
        self.mode_stack
            .iter()
            .any(|m| !matches!(m, Mode::Normal))
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if ch & 0xC0 != 0x80 {
            // UTF-8 continuation bytes don't start a new column
            self.col += 1;
        }
        Some(ch)
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = SyntaxError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    fn emit_error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = SyntaxError::new(&self.source_file.name, code, message, span, source_line)
            .with_suggestion(suggestion);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace, comments & layout
    // ─────────────────────────────────────────────────────────────

    /// Skip spaces, tabs and form feeds (NOT newlines: those are layout).
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b' ' || ch == b'\t' || ch == b'\r' || ch == 0x0C {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip a `#` comment up to (not including) the newline.
    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b'\n' {
                break;
            }
            self.advance();
        }
    }

    /// Measure leading whitespace of a logical line and produce `Indent` or
    /// `Dedent` tokens. Blank and comment-only lines never change indentation.
    fn handle_indentation(&mut self) -> Option<Token> {
        let mut width = 0u32;
        while let Some(ch) = self.peek() {
            match ch {
                b' ' => width += 1,
                b'\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                0x0C => width = 0,
                _ => break,
            }
            self.advance();
        }

        match self.peek() {
            None | Some(b'\n') | Some(b'#') | Some(b'\r') => return None,
            _ => {}
        }

        let span = Span::point(self.line, 1);
        let current = *self.indent_stack.last().unwrap_or(&0);
        if width > current {
            self.indent_stack.push(width);
            return Some(Token::new(TokenKind::Indent, span));
        }
        if width < current {
            while self.indent_stack.len() > 1
                && *self.indent_stack.last().unwrap_or(&0) > width
            {
                self.indent_stack.pop();
                self.pending.push_back(Token::new(TokenKind::Dedent, span));
            }
            if *self.indent_stack.last().unwrap_or(&0) != width {
                self.emit_error(
                    ErrorCode::INCONSISTENT_DEDENT,
                    "unindent does not match any outer indentation level",
                    Span::new(self.line, 1, self.line, self.col),
                );
            }
            return self.pending.pop_front();
        }
        None
    }

    /// Queue the layout tokens that close the file and return the first.
    fn finish(&mut self) -> Token {
        if self.in_fstring() {
            self.emit_error(
                ErrorCode::UNTERMINATED_STRING,
                "unterminated f-string literal",
                self.current_span(),
            );
            self.mode_stack.truncate(1);
        }
        if let Some((open, span)) = self.nesting.first().copied() {
            self.emit_error(
                ErrorCode::UNCLOSED_BRACKET,
                format!("'{}' was never closed", open as char),
                span,
            );
            self.nesting.clear();
        }

        let span = self.current_span();
        if self.line_open {
            self.pending.push_back(Token::new(TokenKind::Newline, span));
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.pending.push_back(Token::new(TokenKind::Dedent, span));
        }
        self.pending.push_back(Token::new(TokenKind::Eof, span));
        self.pending
            .pop_front()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, span))
    }

    // ─────────────────────────────────────────────────────────────
    // Normal-mode scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan one token in normal (code) mode.
    fn scan_normal(&mut self) -> Token {
        loop {
            if self.errors.is_full() {
                return Token::new(TokenKind::Eof, self.current_span());
            }

            if self.at_line_start {
                self.at_line_start = false;
                if self.nesting.is_empty() && !self.in_fstring() {
                    if let Some(token) = self.handle_indentation() {
                        return token;
                    }
                }
            }

            self.skip_whitespace();

            match self.peek() {
                None => return self.finish(),
                Some(b'#') => {
                    self.skip_comment();
                    continue;
                }
                Some(b'\\') if matches!(self.peek_at(1), Some(b'\n')) => {
                    self.advance();
                    self.advance();
                    continue;
                }
                Some(b'\\')
                    if self.peek_at(1) == Some(b'\r') && self.peek_at(2) == Some(b'\n') =>
                {
                    self.advance();
                    self.advance();
                    self.advance();
                    continue;
                }
                Some(b'\n') => {
                    let start_line = self.line;
                    let start_col = self.col;
                    self.advance();
                    if let Mode::Interpolation { quote, .. } = self.current_mode() {
                        if !quote.triple {
                            self.emit_error(
                                ErrorCode::UNTERMINATED_STRING,
                                "f-string: expecting '}'",
                                Span::point(start_line, start_col),
                            );
                            self.mode_stack.truncate(1);
                        }
                    }
                    if !self.nesting.is_empty() || self.in_fstring() {
                        // Implicit line joining
                        continue;
                    }
                    self.at_line_start = true;
                    if !self.line_open {
                        // Blank line
                        continue;
                    }
                    return Token::new(TokenKind::Newline, Span::point(start_line, start_col));
                }
                Some(_) => return self.scan_token(),
            }
        }
    }

    /// Scan one significant token at the cursor.
    fn scan_token(&mut self) -> Token {
        let start_line = self.line;
        let start_col = self.col;
        let start_pos = self.pos;

        // Replacement-field delimiters inside an f-string
        if let Mode::Interpolation { base, quote } = self.current_mode() {
            if self.nesting.len() == base {
                match self.peek() {
                    Some(b'}') => {
                        self.advance();
                        self.replace_mode(Mode::FString(quote));
                        return Token::new(
                            TokenKind::InterpolationEnd,
                            self.span_from(start_line, start_col),
                        );
                    }
                    Some(b':') => {
                        self.advance();
                        return self.scan_format_spec(start_line, start_col);
                    }
                    _ => {}
                }
            }
        }

        let Some(ch) = self.advance() else {
            return self.finish();
        };

        match ch {
            // ── String literals ──
            b'"' | b'\'' => self.scan_string(ch, false, start_line, start_col),

            // ── Number literals ──
            b'0'..=b'9' => self.scan_number(start_pos, start_line, start_col),
            b'.' if matches!(self.peek(), Some(b'0'..=b'9')) => {
                self.scan_number(start_pos, start_line, start_col)
            }

            // ── Identifiers, keywords & prefixed strings ──
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | 0x80..=0xFF => {
                self.scan_identifier(start_pos, start_line, start_col)
            }

            // operators
            b'+' => self.with_eq(TokenKind::Plus, TokenKind::PlusEq, start_line, start_col),
            b'-' => self.with_eq(TokenKind::Minus, TokenKind::MinusEq, start_line, start_col),
            b'%' => self.with_eq(TokenKind::Percent, TokenKind::PercentEq, start_line, start_col),
            b'*' => {
                if self.peek() == Some(b'*') {
                    self.advance();
                    self.with_eq(TokenKind::StarStar, TokenKind::StarStarEq, start_line, start_col)
                } else {
                    self.with_eq(TokenKind::Star, TokenKind::StarEq, start_line, start_col)
                }
            }
            b'/' => {
                if self.peek() == Some(b'/') {
                    self.advance();
                    self.with_eq(
                        TokenKind::SlashSlash,
                        TokenKind::SlashSlashEq,
                        start_line,
                        start_col,
                    )
                } else {
                    self.with_eq(TokenKind::Slash, TokenKind::SlashEq, start_line, start_col)
                }
            }
            b'=' => self.with_eq(TokenKind::Eq, TokenKind::EqEq, start_line, start_col),
            b'<' => self.with_eq(TokenKind::Less, TokenKind::LessEq, start_line, start_col),
            b'>' => self.with_eq(TokenKind::Greater, TokenKind::GreaterEq, start_line, start_col),
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    Token::new(TokenKind::BangEq, self.span_from(start_line, start_col))
                } else {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::INVALID_CHARACTER,
                        "invalid syntax '!'",
                        span,
                        "use 'not' for boolean negation, or '!=' for inequality",
                    );
                    self.scan_normal()
                }
            }

            // ── Brackets ──
            b'(' | b'[' | b'{' => {
                let span = self.span_from(start_line, start_col);
                self.nesting.push((ch, span));
                let kind = match ch {
                    b'(' => TokenKind::LParen,
                    b'[' => TokenKind::LBracket,
                    _ => TokenKind::LBrace,
                };
                Token::new(kind, span)
            }
            b')' | b']' | b'}' => {
                let span = self.span_from(start_line, start_col);
                self.close_bracket(ch, span);
                let kind = match ch {
                    b')' => TokenKind::RParen,
                    b']' => TokenKind::RBracket,
                    _ => TokenKind::RBrace,
                };
                Token::new(kind, span)
            }

            // ── Punctuation ──
            b',' => Token::new(TokenKind::Comma, self.span_from(start_line, start_col)),
            b':' => Token::new(TokenKind::Colon, self.span_from(start_line, start_col)),
            b';' => Token::new(TokenKind::Semicolon, self.span_from(start_line, start_col)),
            b'.' => Token::new(TokenKind::Dot, self.span_from(start_line, start_col)),

            b'&' | b'|' | b'^' | b'~' | b'@' => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::INVALID_CHARACTER,
                    format!("operator '{}' is not supported", ch as char),
                    span,
                );
                self.scan_normal()
            }

            _ => {
                // Swallow the rest of a multi-byte character
                while matches!(self.peek(), Some(b) if b & 0xC0 == 0x80) {
                    self.advance();
                }
                let text = String::from_utf8_lossy(&self.source[start_pos..self.pos]).into_owned();
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::INVALID_CHARACTER,
                    format!("invalid character '{text}'"),
                    span,
                );
                // skip it and keep scanning
                self.scan_normal()
            }
        }
    }

    /// Produce `plain`, or `with_eq` if the next character is `=`.
    fn with_eq(
        &mut self,
        plain: TokenKind,
        with_eq: TokenKind,
        start_line: u32,
        start_col: u32,
    ) -> Token {
        let kind = if self.peek() == Some(b'=') {
            self.advance();
            with_eq
        } else {
            plain
        };
        Token::new(kind, self.span_from(start_line, start_col))
    }

    fn close_bracket(&mut self, close: u8, span: Span) {
        let expected_open = match close {
            b')' => b'(',
            b']' => b'[',
            _ => b'{',
        };
        match self.nesting.last().copied() {
            Some((open, _)) if open == expected_open => {
                self.nesting.pop();
            }
            Some((open, _)) => {
                self.emit_error(
                    ErrorCode::UNCLOSED_BRACKET,
                    format!(
                        "closing parenthesis '{}' does not match opening parenthesis '{}'",
                        close as char, open as char
                    ),
                    span,
                );
                self.nesting.pop();
            }
            None => {
                self.emit_error(
                    ErrorCode::UNCLOSED_BRACKET,
                    format!("unmatched '{}'", close as char),
                    span,
                );
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> Token {
        let first = self.source[start_pos];

        // Prefixed integers: 0x.., 0o.., 0b..
        if first == b'0' {
            let radix = match self.peek() {
                Some(b'x' | b'X') => Some(16),
                Some(b'o' | b'O') => Some(8),
                Some(b'b' | b'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                let digits_start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
                    self.advance();
                }
                let digits: String = String::from_utf8_lossy(&self.source[digits_start..self.pos])
                    .chars()
                    .filter(|c| *c != '_')
                    .collect();
                let span = self.span_from(start_line, start_col);
                return match i64::from_str_radix(&digits, radix) {
                    Ok(value) => Token::new(TokenKind::Int(value), span),
                    Err(_) => {
                        self.emit_error(ErrorCode::INVALID_LITERAL, "invalid integer literal", span);
                        Token::new(TokenKind::Int(0), span)
                    }
                };
            }
        }

        let mut is_float = first == b'.';
        self.eat_digits();

        if !is_float && self.peek() == Some(b'.') {
            // `1.` and `1.5` are floats; `1..` is not our concern
            is_float = true;
            self.advance();
            self.eat_digits();
        }

        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign = matches!(self.peek_at(1), Some(b'+' | b'-'));
            let digit_at = if sign { 2 } else { 1 };
            if matches!(self.peek_at(digit_at), Some(b'0'..=b'9')) {
                is_float = true;
                self.advance();
                if sign {
                    self.advance();
                }
                self.eat_digits();
            }
        }

        let span = self.span_from(start_line, start_col);

        if matches!(self.peek(), Some(c) if c.is_ascii_alphabetic() || c == b'_') {
            self.emit_error(ErrorCode::INVALID_LITERAL, "invalid decimal literal", span);
            while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
                self.advance();
            }
        }

        let text: String = String::from_utf8_lossy(&self.source[start_pos..self.pos])
            .chars()
            .filter(|c| *c != '_')
            .collect();

        if is_float {
            let value: f64 = text.parse().unwrap_or(0.0);
            Token::new(TokenKind::Float(value), span)
        } else if text.starts_with('0')
            && text.bytes().all(|b| b.is_ascii_digit())
            && text.bytes().any(|b| b != b'0')
        {
            self.emit_error(
                ErrorCode::INVALID_LITERAL,
                "leading zeros in decimal integer literals are not permitted; \
                 use an 0o prefix for octal integers",
                span,
            );
            Token::new(TokenKind::Int(0), span)
        } else {
            match text.parse::<i64>() {
                Ok(value) => Token::new(TokenKind::Int(value), span),
                Err(_) => {
                    self.emit_error(
                        ErrorCode::INVALID_LITERAL,
                        "integer literal is too large",
                        span,
                    );
                    Token::new(TokenKind::Int(0), span)
                }
            }
        }
    }

    fn eat_digits(&mut self) {
        while let Some(b'0'..=b'9' | b'_') = self.peek() {
            self.advance();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, start_pos: usize, start_line: u32, start_col: u32) -> Token {
        // First character was already consumed
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' || ch >= 0x80 {
                self.advance();
            } else {
                break;
            }
        }

        let text = String::from_utf8_lossy(&self.source[start_pos..self.pos]).into_owned();

        // String prefixes: r'..', f'..', rf'..', fr'..'
        if let Some(quote @ (b'"' | b'\'')) = self.peek() {
            let lower = text.to_ascii_lowercase();
            let prefix = match lower.as_str() {
                "r" => Some((true, false)),
                "f" => Some((false, true)),
                "rf" | "fr" => Some((true, true)),
                _ => None,
            };
            if let Some((raw, fstring)) = prefix {
                self.advance();
                if fstring {
                    let quote = self.open_quote(quote, raw);
                    return self.scan_fstring_text(quote, true, start_line, start_col);
                }
                return self.scan_string(quote, raw, start_line, start_col);
            }
        }

        let span = self.span_from(start_line, start_col);
        let kind = TokenKind::from_keyword(&text).unwrap_or(TokenKind::Identifier(text));
        Token::new(kind, span)
    }

    // ─────────────────────────────────────────────────────────────
    // String literals & f-strings
    // ─────────────────────────────────────────────────────────────

    /// Determine the quoting after the opening quote character was consumed.
    fn open_quote(&mut self, ch: u8, raw: bool) -> Quote {
        let triple = self.peek() == Some(ch) && self.peek_at(1) == Some(ch);
        if triple {
            self.advance();
            self.advance();
        }
        Quote { ch, triple, raw }
    }

    /// Whether the cursor sits on the closing quote; consumes it if so.
    fn eat_closing_quote(&mut self, quote: Quote) -> bool {
        if self.peek() != Some(quote.ch) {
            return false;
        }
        if quote.triple {
            if self.peek_at(1) == Some(quote.ch) && self.peek_at(2) == Some(quote.ch) {
                self.advance();
                self.advance();
                self.advance();
                return true;
            }
            return false;
        }
        self.advance();
        true
    }

    /// Scan a plain string literal after its opening quote.
    fn scan_string(&mut self, ch: u8, raw: bool, start_line: u32, start_col: u32) -> Token {
        let quote = self.open_quote(ch, raw);
        let mut buf = Vec::new();

        loop {
            if self.eat_closing_quote(quote) {
                let text = String::from_utf8_lossy(&buf).into_owned();
                return Token::new(TokenKind::Str(text), self.span_from(start_line, start_col));
            }
            match self.peek() {
                None => {
                    self.report_unterminated(quote, start_line, start_col);
                    let text = String::from_utf8_lossy(&buf).into_owned();
                    return Token::new(TokenKind::Str(text), self.span_from(start_line, start_col));
                }
                Some(b'\n') if !quote.triple => {
                    self.report_unterminated(quote, start_line, start_col);
                    let text = String::from_utf8_lossy(&buf).into_owned();
                    return Token::new(TokenKind::Str(text), self.span_from(start_line, start_col));
                }
                Some(b'\\') if !quote.raw => self.scan_escape_sequence(&mut buf),
                Some(b'\\') => {
                    // Raw strings keep the backslash but still can't end on an escaped quote
                    self.advance();
                    buf.push(b'\\');
                    if let Some(next) = self.peek() {
                        if next == quote.ch || next == b'\\' {
                            self.advance();
                            buf.push(next);
                        }
                    }
                }
                Some(c) => {
                    self.advance();
                    buf.push(c);
                }
            }
        }
    }

    /// Scan f-string text, either right after the opening quote
    /// (`at_start`) or after a replacement field closed.
    fn scan_fstring_text(
        &mut self,
        quote: Quote,
        at_start: bool,
        start_line: u32,
        start_col: u32,
    ) -> Token {
        let mut buf = Vec::new();

        let finish = |lexer: &mut Self, buf: Vec<u8>, end: bool| {
            let text = String::from_utf8_lossy(&buf).into_owned();
            let span = lexer.span_from(start_line, start_col);
            let kind = match (at_start, end) {
                (true, true) => TokenKind::Str(text),
                (true, false) => TokenKind::FStringStart(text),
                (false, false) => TokenKind::FStringMiddle(text),
                (false, true) => TokenKind::FStringEnd(text),
            };
            Token::new(kind, span)
        };

        loop {
            if self.eat_closing_quote(quote) {
                if !at_start {
                    self.pop_mode();
                }
                return finish(self, buf, true);
            }
            match self.peek() {
                None => {
                    self.report_unterminated(quote, start_line, start_col);
                    self.mode_stack.truncate(1);
                    return finish(self, buf, true);
                }
                Some(b'\n') if !quote.triple => {
                    self.report_unterminated(quote, start_line, start_col);
                    self.mode_stack.truncate(1);
                    return finish(self, buf, true);
                }
                Some(b'{') if self.peek_at(1) == Some(b'{') => {
                    self.advance();
                    self.advance();
                    buf.push(b'{');
                }
                Some(b'}') if self.peek_at(1) == Some(b'}') => {
                    self.advance();
                    self.advance();
                    buf.push(b'}');
                }
                Some(b'}') => {
                    let span = self.current_span();
                    self.advance();
                    self.emit_error(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "f-string: single '}' is not allowed",
                        span,
                    );
                }
                Some(b'{') => {
                    let brace_span = self.current_span();
                    self.advance();
                    let field = Mode::Interpolation {
                        base: self.nesting.len(),
                        quote,
                    };
                    if at_start {
                        self.mode_stack.push(field);
                    } else {
                        self.replace_mode(field);
                    }
                    self.pending
                        .push_back(Token::new(TokenKind::InterpolationStart, brace_span));
                    return finish(self, buf, false);
                }
                Some(b'\\') if !quote.raw => self.scan_escape_sequence(&mut buf),
                Some(c) => {
                    self.advance();
                    buf.push(c);
                }
            }
        }
    }

    /// Scan the `spec` of `{expr:spec}` after the colon.
    fn scan_format_spec(&mut self, start_line: u32, start_col: u32) -> Token {
        let start_pos = self.pos;
        while let Some(ch) = self.peek() {
            if ch == b'}' || ch == b'\n' || ch == b'{' {
                break;
            }
            self.advance();
        }
        let spec = String::from_utf8_lossy(&self.source[start_pos..self.pos]).into_owned();
        Token::new(TokenKind::FormatSpec(spec), self.span_from(start_line, start_col))
    }

    fn report_unterminated(&mut self, quote: Quote, start_line: u32, start_col: u32) {
        let message = if quote.triple {
            format!("unterminated triple-quoted string literal (detected at line {})", self.line)
        } else {
            format!("unterminated string literal (detected at line {})", self.line)
        };
        self.emit_error(
            ErrorCode::UNTERMINATED_STRING,
            message,
            Span::point(start_line, start_col),
        );
    }

    /// Scan an escape sequence starting at the `\` and append its value.
    fn scan_escape_sequence(&mut self, buf: &mut Vec<u8>) {
        let start_line = self.line;
        let start_col = self.col;
        self.advance(); // consume the '\'

        let push_char = |buf: &mut Vec<u8>, c: char| {
            let mut tmp = [0u8; 4];
            buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
        };

        match self.advance() {
            Some(b'\n') => {} // line continuation inside the string
            Some(b'\\') => buf.push(b'\\'),
            Some(b'\'') => buf.push(b'\''),
            Some(b'"') => buf.push(b'"'),
            Some(b'n') => buf.push(b'\n'),
            Some(b't') => buf.push(b'\t'),
            Some(b'r') => buf.push(b'\r'),
            Some(b'0') => buf.push(0),
            Some(b'a') => buf.push(0x07),
            Some(b'b') => buf.push(0x08),
            Some(b'f') => buf.push(0x0C),
            Some(b'v') => buf.push(0x0B),
            Some(kind @ (b'x' | b'u' | b'U')) => {
                let len = match kind {
                    b'x' => 2,
                    b'u' => 4,
                    _ => 8,
                };
                let digits_start = self.pos;
                for _ in 0..len {
                    if matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                        self.advance();
                    }
                }
                let digits = String::from_utf8_lossy(&self.source[digits_start..self.pos]);
                match u32::from_str_radix(&digits, 16).ok().filter(|_| digits.len() == len) {
                    Some(code) => match char::from_u32(code) {
                        Some(c) => push_char(buf, c),
                        None => push_char(buf, char::REPLACEMENT_CHARACTER),
                    },
                    None => {
                        let span = self.span_from(start_line, start_col);
                        self.emit_error(
                            ErrorCode::INVALID_LITERAL,
                            format!("truncated \\{}XX escape", kind as char),
                            span,
                        );
                    }
                }
            }
            Some(other) => {
                // Unknown escapes are kept verbatim
                buf.push(b'\\');
                buf.push(other);
            }
            None => {
                let span = self.span_from(start_line, start_col);
                self.emit_error(
                    ErrorCode::UNTERMINATED_STRING,
                    "unexpected end of input in escape sequence",
                    span,
                );
            }
        }
    }
}

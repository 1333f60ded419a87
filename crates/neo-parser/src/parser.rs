//! Parser state shared by the statement and expression grammars.

use neo_lexer::token::{Token, TokenKind};
use neo_types::ast::{Ident, Module};
use neo_types::{ErrorCode, SourceFile, Span, SyntaxError, SyntaxErrors};

/// Maximum nesting of expressions (parentheses, unary chains, lambdas).
pub(crate) const MAX_EXPR_DEPTH: u32 = 64;

/// Maximum nesting of compound statements.
pub(crate) const MAX_BLOCK_DEPTH: u32 = 20;

/// Recursive-descent parser for student programs.
///
/// On an error the parser records it, skips to the next statement and keeps
/// going, so one run reports several mistakes.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    /// Quoted in error messages.
    source_file: &'src SourceFile,
    /// Collected errors.
    errors: SyntaxErrors,
    /// Current expression nesting depth.
    pub(crate) expr_depth: u32,
    /// Current compound-statement nesting depth.
    pub(crate) block_depth: u32,
    /// Enclosing loops in the current function body (for `break`/`continue`).
    pub(crate) loop_depth: u32,
    /// Enclosing `def`s (for `return`).
    pub(crate) function_depth: u32,
}

/// Result of parsing.
pub struct ParseResult {
    /// The module, present only when parsing produced no errors.
    pub module: Option<Module>,
    pub errors: SyntaxErrors,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: SyntaxErrors::empty(),
            expr_depth: 0,
            block_depth: 0,
            loop_depth: 0,
            function_depth: 0,
        }
    }

    pub(crate) fn peek(&self) -> Token {
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some(token) => token.clone(),
            None => Token::new(TokenKind::Eof, Span::point(1, 1)),
        }
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    /// Consume the current token. `Eof` is never consumed.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::point(1, 1)
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or_else(|| Span::point(1, 1))
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// Consume the current token if it is `kind`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Kind of the token `n` places after the current one.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    pub(crate) fn skip_newlines(&mut self) {
        while self.check_exact(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// Expect the end of a logical line. Reports an error otherwise.
    pub(crate) fn expect_newline(&mut self) -> Option<()> {
        if self.at_end() || self.eat(&TokenKind::Newline) {
            return Some(());
        }
        self.error_invalid_syntax();
        None
    }

    /// Consume `expected` or report "expected X, got Y".
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check_exact(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected '{}', got {}", expected, self.describe_current()),
            );
            None
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            TokenKind::Unsupported(kw) => {
                self.error_unsupported_keyword(&kw);
                None
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected a name, got {}", self.describe_current()),
                );
                None
            }
        }
    }

    /// Dotted module path: `a.b.c`.
    pub(crate) fn expect_dotted_name(&mut self) -> Option<String> {
        let mut name = self.expect_identifier()?.name;
        while self.eat(&TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.expect_identifier()?.name);
        }
        Some(name)
    }

    /// Human-readable description of the current token for messages.
    pub(crate) fn describe_current(&self) -> String {
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Eof => self.peek_kind().to_string(),
            TokenKind::Indent => "an indent".to_string(),
            TokenKind::Dedent => "a dedent".to_string(),
            other => format!("'{other}'"),
        }
    }

    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let error = SyntaxError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(error);
    }

    /// Generic "invalid syntax" error at the current token.
    pub(crate) fn error_invalid_syntax(&mut self) {
        let message = match self.peek_kind() {
            TokenKind::Unsupported(kw) => {
                let kw = kw.clone();
                self.error_unsupported_keyword(&kw);
                return;
            }
            TokenKind::Eof => "invalid syntax: unexpected end of input".to_string(),
            TokenKind::Indent => {
                self.error_at_current(ErrorCode::UNEXPECTED_INDENT, "unexpected indent");
                return;
            }
            _ => format!("invalid syntax: unexpected {}", self.describe_current()),
        };
        self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, message);
    }

    pub(crate) fn error_unsupported_keyword(&mut self, kw: &str) {
        let span = self.current_span();
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let error = SyntaxError::new(
            &self.source_file.name,
            ErrorCode::UNSUPPORTED_KEYWORD,
            format!("'{kw}' is not supported in NEO Robot programs"),
            span,
            source_line,
        )
        .with_suggestion("stick to functions, loops and if-statements");
        self.errors.push_error(error);
    }

    /// Stop once the error cap is reached.
    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.is_full()
    }

    /// Skip tokens until the start of the next statement.
    pub(crate) fn synchronize(&mut self) {
        let mut depth = 0u32;
        while !self.at_end() {
            match self.peek_kind() {
                TokenKind::Newline if depth == 0 => {
                    self.advance();
                    self.skip_newlines();
                    // The failed statement's body belongs to it
                    if self.check_exact(&TokenKind::Indent) {
                        self.skip_indented_block();
                    }
                    return;
                }
                TokenKind::Dedent if depth == 0 => return,
                TokenKind::Indent => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::Dedent => {
                    depth -= 1;
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Skip an `Indent ... Dedent` run including nested blocks.
    pub(crate) fn skip_indented_block(&mut self) {
        let mut depth = 0u32;
        while !self.at_end() {
            match self.advance().kind {
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    /// Parse the token stream into a [`Module`].
    pub fn parse(mut self) -> ParseResult {
        self.skip_newlines();
        let module = self.parse_module();
        let module = if self.errors.has_errors() {
            None
        } else {
            Some(module)
        };
        ParseResult {
            module,
            errors: self.errors,
        }
    }
}

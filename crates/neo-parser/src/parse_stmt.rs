//! Statement parsing: simple statements, compound statements and blocks.

use neo_lexer::token::TokenKind;
use neo_types::ast::*;
use neo_types::{ErrorCode, Span};

use crate::parser::{Parser, MAX_BLOCK_DEPTH};

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Module & Blocks
    // ══════════════════════════════════════════════════════════════════════════

    /// `Module = { Statement }`
    pub(crate) fn parse_module(&mut self) -> Module {
        let mut body = Vec::new();
        while !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if self.eat(&TokenKind::Dedent) {
                continue;
            }
            match self.parse_statement() {
                Some(stmts) => body.extend(stmts),
                None => self.synchronize(),
            }
            self.skip_newlines();
        }
        Module { body }
    }

    /// Parse the body after a compound statement's `:`.
    ///
    /// Either an indented block on following lines, or simple statements on
    /// the same line (`if x: y = 1`).
    fn parse_block(&mut self, owner: &str, owner_line: u32) -> Option<Vec<Stmt>> {
        if !self.eat(&TokenKind::Newline) {
            return self.parse_simple_statements();
        }
        self.skip_newlines();
        if !self.eat(&TokenKind::Indent) {
            self.error_at_current(
                ErrorCode::EXPECTED_INDENT,
                format!("expected an indented block after '{owner}' statement on line {owner_line}"),
            );
            return None;
        }

        self.block_depth += 1;
        if self.block_depth > MAX_BLOCK_DEPTH {
            self.error_at(
                ErrorCode::NESTING_LIMIT_EXCEEDED,
                "too many statically nested blocks",
                self.previous_span(),
            );
            self.block_depth -= 1;
            self.skip_to_dedent();
            return None;
        }

        let mut stmts = Vec::new();
        while !self.check_exact(&TokenKind::Dedent) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            match self.parse_statement() {
                Some(parsed) => stmts.extend(parsed),
                None => self.synchronize(),
            }
            self.skip_newlines();
        }
        self.eat(&TokenKind::Dedent);
        self.block_depth -= 1;
        Some(stmts)
    }

    /// Consume the rest of the current indented block, including its `Dedent`.
    fn skip_to_dedent(&mut self) {
        let mut depth = 1u32;
        while !self.at_end() {
            match self.advance().kind {
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse one statement line. Simple statements separated by `;` yield
    /// several [`Stmt`]s.
    pub(crate) fn parse_statement(&mut self) -> Option<Vec<Stmt>> {
        match self.peek_kind() {
            TokenKind::If => self.parse_if().map(|s| vec![s]),
            TokenKind::While => self.parse_while().map(|s| vec![s]),
            TokenKind::For => self.parse_for().map(|s| vec![s]),
            TokenKind::Def => self.parse_def().map(|s| vec![s]),
            TokenKind::Try => self.parse_try().map(|s| vec![s]),
            TokenKind::Indent => {
                self.error_at_current(ErrorCode::UNEXPECTED_INDENT, "unexpected indent");
                self.skip_indented_block();
                None
            }
            TokenKind::Elif | TokenKind::Else | TokenKind::Except | TokenKind::Finally => {
                let kw = self.peek_kind().to_string();
                self.error_at_current(
                    ErrorCode::MISPLACED_STATEMENT,
                    format!("'{kw}' without a matching block before it"),
                );
                None
            }
            _ => self.parse_simple_statements(),
        }
    }

    /// `SimpleStmts = SimpleStmt { ";" SimpleStmt } [";"] Newline`
    fn parse_simple_statements(&mut self) -> Option<Vec<Stmt>> {
        let mut stmts = vec![self.parse_simple_statement()?];
        while self.eat(&TokenKind::Semicolon) {
            if self.check_exact(&TokenKind::Newline) || self.at_end() {
                break;
            }
            stmts.push(self.parse_simple_statement()?);
        }
        self.expect_newline()?;
        Some(stmts)
    }

    fn parse_simple_statement(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::Pass => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Break => {
                if self.loop_depth == 0 {
                    self.error_at_current(ErrorCode::MISPLACED_STATEMENT, "'break' outside loop");
                    return None;
                }
                self.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                if self.loop_depth == 0 {
                    self.error_at_current(
                        ErrorCode::MISPLACED_STATEMENT,
                        "'continue' not properly in loop",
                    );
                    return None;
                }
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Return => {
                if self.function_depth == 0 {
                    self.error_at_current(
                        ErrorCode::MISPLACED_STATEMENT,
                        "'return' outside function",
                    );
                    return None;
                }
                self.advance();
                if self.at_statement_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_testlist()?))
                }
            }
            TokenKind::Global => {
                self.advance();
                let mut names = vec![self.expect_identifier()?];
                while self.eat(&TokenKind::Comma) {
                    names.push(self.expect_identifier()?);
                }
                StmtKind::Global(names)
            }
            TokenKind::Del => {
                self.advance();
                let mut targets = vec![self.parse_postfix()?];
                while self.eat(&TokenKind::Comma) {
                    if self.at_statement_end() {
                        break;
                    }
                    targets.push(self.parse_postfix()?);
                }
                for target in &targets {
                    if !matches!(
                        target.kind,
                        ExprKind::Name(_) | ExprKind::Subscript { .. } | ExprKind::Attribute { .. }
                    ) {
                        self.error_at(
                            ErrorCode::INVALID_TARGET,
                            format!("cannot delete {}", describe_expr(target)),
                            target.span,
                        );
                        return None;
                    }
                }
                StmtKind::Del(targets)
            }
            TokenKind::Assert => {
                self.advance();
                let test = self.parse_test()?;
                let message = if self.eat(&TokenKind::Comma) {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                StmtKind::Assert { test, message }
            }
            TokenKind::Import => {
                self.advance();
                let mut names = vec![self.parse_import_name(true)?];
                while self.eat(&TokenKind::Comma) {
                    names.push(self.parse_import_name(true)?);
                }
                StmtKind::Import(names)
            }
            TokenKind::From => {
                self.advance();
                let module = self.expect_dotted_name()?;
                self.expect(&TokenKind::Import)?;
                let mut names = Vec::new();
                if !self.eat(&TokenKind::Star) {
                    let parenthesized = self.eat(&TokenKind::LParen);
                    names.push(self.parse_import_name(false)?);
                    while self.eat(&TokenKind::Comma) {
                        if parenthesized && self.check_exact(&TokenKind::RParen) {
                            break;
                        }
                        names.push(self.parse_import_name(false)?);
                    }
                    if parenthesized {
                        self.expect(&TokenKind::RParen)?;
                    }
                }
                StmtKind::ImportFrom { module, names }
            }
            TokenKind::Unsupported(kw) => {
                self.error_unsupported_keyword(&kw);
                return None;
            }
            _ => return self.parse_expression_statement(start),
        };
        Some(Stmt::new(kind, start.merge(self.previous_span())))
    }

    fn parse_import_name(&mut self, dotted: bool) -> Option<ImportName> {
        let name = if dotted {
            self.expect_dotted_name()?
        } else {
            self.expect_identifier()?.name
        };
        let alias = if self.eat(&TokenKind::As) {
            Some(self.expect_identifier()?.name)
        } else {
            None
        };
        Some(ImportName { name, alias })
    }

    /// Expression statement, assignment or augmented assignment.
    fn parse_expression_statement(&mut self, start: Span) -> Option<Stmt> {
        let first = self.parse_testlist()?;

        if let Some(op) = self.match_aug_assign_op() {
            self.advance();
            if !matches!(
                first.kind,
                ExprKind::Name(_) | ExprKind::Subscript { .. } | ExprKind::Attribute { .. }
            ) {
                self.error_at(
                    ErrorCode::INVALID_TARGET,
                    format!(
                        "'{}' is an illegal expression for augmented assignment",
                        describe_expr(&first)
                    ),
                    first.span,
                );
                return None;
            }
            let value = self.parse_testlist()?;
            let span = start.merge(self.previous_span());
            return Some(Stmt::new(
                StmtKind::AugAssign {
                    target: first,
                    op,
                    value,
                },
                span,
            ));
        }

        if !self.check_exact(&TokenKind::Eq) {
            let span = start.merge(self.previous_span());
            return Some(Stmt::new(StmtKind::Expr(first), span));
        }

        let mut targets = vec![first];
        let value = loop {
            self.advance(); // eat `=`
            let next = self.parse_testlist()?;
            if self.check_exact(&TokenKind::Eq) {
                targets.push(next);
            } else {
                break next;
            }
        };

        for target in &targets {
            if !target.is_assign_target() {
                let message = match &target.kind {
                    ExprKind::Call { .. } => {
                        "cannot assign to function call here. Maybe you meant '==' instead of '='?"
                            .to_string()
                    }
                    _ => format!("cannot assign to {}", describe_expr(target)),
                };
                self.error_at(ErrorCode::INVALID_TARGET, message, target.span);
                return None;
            }
        }

        let span = start.merge(self.previous_span());
        Some(Stmt::new(StmtKind::Assign { targets, value }, span))
    }

    fn match_aug_assign_op(&self) -> Option<BinOp> {
        match self.peek_kind() {
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            TokenKind::SlashSlashEq => Some(BinOp::FloorDiv),
            TokenKind::PercentEq => Some(BinOp::Mod),
            TokenKind::StarStarEq => Some(BinOp::Pow),
            _ => None,
        }
    }

    /// Whether the current token ends a simple statement.
    pub(crate) fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
        )
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Compound Statements
    // ══════════════════════════════════════════════════════════════════════════

    /// `if test: block { elif test: block } [ else: block ]`
    fn parse_if(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `if` / `elif`
        let test = self.parse_test()?;
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_block("if", start.start_line)?;

        let orelse = match self.peek_kind() {
            TokenKind::Elif => vec![self.parse_if()?],
            TokenKind::Else => {
                let else_span = self.advance().span;
                self.expect(&TokenKind::Colon)?;
                self.parse_block("else", else_span.start_line)?
            }
            _ => Vec::new(),
        };

        let span = start.merge(self.previous_span());
        Some(Stmt::new(StmtKind::If(IfStmt { test, body, orelse }), span))
    }

    /// `while test: block [ else: block ]`
    fn parse_while(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `while`
        let test = self.parse_test()?;
        self.expect(&TokenKind::Colon)?;
        self.loop_depth += 1;
        let body = self.parse_block("while", start.start_line);
        self.loop_depth -= 1;
        let body = body?;
        let orelse = self.parse_loop_else()?;
        let span = start.merge(self.previous_span());
        Some(Stmt::new(
            StmtKind::While(WhileStmt { test, body, orelse }),
            span,
        ))
    }

    /// `for targets in testlist: block [ else: block ]`
    fn parse_for(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `for`
        let target = self.parse_target_list()?;
        self.expect(&TokenKind::In)?;
        let iter = self.parse_testlist()?;
        self.expect(&TokenKind::Colon)?;
        self.loop_depth += 1;
        let body = self.parse_block("for", start.start_line);
        self.loop_depth -= 1;
        let body = body?;
        let orelse = self.parse_loop_else()?;
        let span = start.merge(self.previous_span());
        Some(Stmt::new(
            StmtKind::For(ForStmt {
                target,
                iter,
                body,
                orelse,
            }),
            span,
        ))
    }

    fn parse_loop_else(&mut self) -> Option<Vec<Stmt>> {
        if !self.check_exact(&TokenKind::Else) {
            return Some(Vec::new());
        }
        let else_span = self.advance().span;
        self.expect(&TokenKind::Colon)?;
        self.parse_block("else", else_span.start_line)
    }

    /// `def name(params): block`
    fn parse_def(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `def`
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LParen)?;
        let params = self.parse_params(&TokenKind::RParen)?;
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::Colon)?;

        let saved_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;
        let body = self.parse_block("function definition", start.start_line);
        self.function_depth -= 1;
        self.loop_depth = saved_loops;
        let body = body?;

        let span = start.merge(self.previous_span());
        Some(Stmt::new(
            StmtKind::FunctionDef(FunctionDef { name, params, body }),
            span,
        ))
    }

    /// Parameter list for `def` and `lambda`, up to (not including) `close`.
    pub(crate) fn parse_params(&mut self, close: &TokenKind) -> Option<Vec<Param>> {
        let mut params: Vec<Param> = Vec::new();
        while !self.check_exact(close) {
            if matches!(self.peek_kind(), TokenKind::Star | TokenKind::StarStar) {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "'*args' and '**kwargs' parameters are not supported",
                );
                return None;
            }
            let name = self.expect_identifier()?;
            if params.iter().any(|p| p.name.name == name.name) {
                self.error_at(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("duplicate argument '{}' in function definition", name.name),
                    name.span,
                );
                return None;
            }
            let default = if self.eat(&TokenKind::Eq) {
                Some(self.parse_test()?)
            } else {
                if params.iter().any(|p| p.default.is_some()) {
                    self.error_at(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "non-default argument follows default argument",
                        name.span,
                    );
                    return None;
                }
                None
            };
            params.push(Param { name, default });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(params)
    }

    /// `try: block except: block [else: block] [finally: block]`
    fn parse_try(&mut self) -> Option<Stmt> {
        let start = self.advance().span; // eat `try`
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_block("try", start.start_line)?;

        let mut handler = None;
        if self.check_exact(&TokenKind::Except) {
            let except_span = self.advance().span;
            if !self.check_exact(&TokenKind::Colon) {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "only a bare 'except:' is supported",
                );
                return None;
            }
            self.advance();
            handler = Some(self.parse_block("except", except_span.start_line)?);
            if self.check_exact(&TokenKind::Except) {
                self.error_at_current(
                    ErrorCode::MISPLACED_STATEMENT,
                    "a bare 'except:' must be the only handler",
                );
                return None;
            }
        }

        let mut orelse = Vec::new();
        if handler.is_some() && self.check_exact(&TokenKind::Else) {
            let else_span = self.advance().span;
            self.expect(&TokenKind::Colon)?;
            orelse = self.parse_block("else", else_span.start_line)?;
        }

        let mut finalbody = Vec::new();
        if self.check_exact(&TokenKind::Finally) {
            let finally_span = self.advance().span;
            self.expect(&TokenKind::Colon)?;
            finalbody = self.parse_block("finally", finally_span.start_line)?;
        } else if handler.is_none() {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                "expected 'except' or 'finally' block",
            );
            return None;
        }

        let span = start.merge(self.previous_span());
        Some(Stmt::new(
            StmtKind::Try(TryStmt {
                body,
                handler,
                orelse,
                finalbody,
            }),
            span,
        ))
    }
}

/// Short description of an expression for error messages.
pub(crate) fn describe_expr(expr: &Expr) -> &'static str {
    match &expr.kind {
        ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Str(_)
        | ExprKind::Bool(_)
        | ExprKind::None => "literal",
        ExprKind::FString(_) => "f-string expression",
        ExprKind::Call { .. } => "function call",
        ExprKind::Binary { .. } | ExprKind::Unary { .. } => "expression",
        ExprKind::BoolOp { .. } => "expression",
        ExprKind::Compare { .. } => "comparison",
        ExprKind::IfExp { .. } => "conditional expression",
        ExprKind::Lambda { .. } => "lambda",
        ExprKind::Tuple(_) => "tuple",
        ExprKind::List(_) => "list",
        ExprKind::Dict(_) => "dict literal",
        ExprKind::Set(_) => "set display",
        ExprKind::ListComp { .. } => "list comprehension",
        ExprKind::SetComp { .. } => "set comprehension",
        ExprKind::DictComp { .. } => "dict comprehension",
        ExprKind::GeneratorExp { .. } => "generator expression",
        ExprKind::Name(_) => "name",
        ExprKind::Attribute { .. } => "attribute",
        ExprKind::Subscript { .. } | ExprKind::Slice { .. } => "subscript",
    }
}

//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 10. `lambda`
//! 9. `a if cond else b`
//! 8. `or`
//! 7. `and`
//! 6. `not`
//! 5. `==`, `!=`, `<`, `>`, `<=`, `>=`, `in`, `not in`, `is`, `is not` (chaining)
//! 4. `+`, `-`
//! 3. `*`, `/`, `//`, `%`
//! 2. unary `-`, `+`
//! 1. `**` (right-associative), then `.` / `()` / `[]` postfix

use neo_lexer::token::TokenKind;
use neo_types::ast::*;
use neo_types::{ErrorCode, Span};

use crate::parser::{Parser, MAX_EXPR_DEPTH};

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Points
    // ══════════════════════════════════════════════════════════════════════════

    /// `TestList = Test { "," Test } [","]`: a bare tuple when a comma appears.
    pub(crate) fn parse_testlist(&mut self) -> Option<Expr> {
        let first = self.parse_test()?;
        if !self.check_exact(&TokenKind::Comma) {
            return Some(first);
        }
        let start = first.span;
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if !self.starts_expression() {
                break;
            }
            items.push(self.parse_test()?);
        }
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::Tuple(items), span))
    }

    /// `Test = Lambda | OrTest [ "if" OrTest "else" Test ]`
    pub(crate) fn parse_test(&mut self) -> Option<Expr> {
        self.enter_nested()?;
        let result = self.parse_test_inner();
        self.expr_depth -= 1;
        result
    }

    fn parse_test_inner(&mut self) -> Option<Expr> {
        if self.check_exact(&TokenKind::Lambda) {
            return self.parse_lambda();
        }
        let body = self.parse_or()?;
        if !self.check_exact(&TokenKind::If) {
            return Some(body);
        }
        self.advance(); // eat `if`
        let test = self.parse_or()?;
        if !self.eat(&TokenKind::Else) {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                "expected 'else' after 'if' expression",
            );
            return None;
        }
        let orelse = self.parse_test()?;
        let span = body.span.merge(orelse.span);
        Some(Expr::new(
            ExprKind::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
            span,
        ))
    }

    /// Targets of `for` loops and comprehensions. Parsed at postfix level so
    /// the following `in` is not taken as a comparison.
    pub(crate) fn parse_target_list(&mut self) -> Option<Expr> {
        let first = self.parse_postfix()?;
        let mut items = vec![first];
        let mut is_tuple = false;
        while self.check_exact(&TokenKind::Comma) {
            self.advance();
            is_tuple = true;
            if self.check_exact(&TokenKind::In) {
                break;
            }
            items.push(self.parse_postfix()?);
        }
        let target = if is_tuple {
            let span = items[0].span.merge(self.previous_span());
            Expr::new(ExprKind::Tuple(items), span)
        } else {
            items.remove(0)
        };
        if !target.is_assign_target() {
            self.error_at(
                ErrorCode::INVALID_TARGET,
                format!("cannot assign to {}", crate::parse_stmt::describe_expr(&target)),
                target.span,
            );
            return None;
        }
        Some(target)
    }

    fn enter_nested(&mut self) -> Option<()> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPR_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_LIMIT_EXCEEDED,
                format!("expression is too deeply nested (maximum depth is {MAX_EXPR_DEPTH})"),
            );
            self.expr_depth -= 1;
            return None;
        }
        Some(())
    }

    /// Whether the current token can begin an expression.
    pub(crate) fn starts_expression(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::Str(_)
                | TokenKind::FStringStart(_)
                | TokenKind::Identifier(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::None
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Minus
                | TokenKind::Plus
                | TokenKind::Not
                | TokenKind::Lambda
        )
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Lambda
    // ══════════════════════════════════════════════════════════════════════════

    /// `lambda params: Test`
    fn parse_lambda(&mut self) -> Option<Expr> {
        let start = self.advance().span; // eat `lambda`
        let params = self.parse_params(&TokenKind::Colon)?;
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_test()?;
        let span = start.merge(body.span);
        Some(Expr::new(
            ExprKind::Lambda {
                params,
                body: Box::new(body),
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `OrTest = AndTest { "or" AndTest }`
    pub(crate) fn parse_or(&mut self) -> Option<Expr> {
        let first = self.parse_and()?;
        if !self.check_exact(&TokenKind::Or) {
            return Some(first);
        }
        let mut values = vec![first];
        while self.eat(&TokenKind::Or) {
            values.push(self.parse_and()?);
        }
        let span = values[0].span.merge(values[values.len() - 1].span);
        Some(Expr::new(
            ExprKind::BoolOp {
                op: BoolOp::Or,
                values,
            },
            span,
        ))
    }

    /// `AndTest = NotTest { "and" NotTest }`
    fn parse_and(&mut self) -> Option<Expr> {
        let first = self.parse_not()?;
        if !self.check_exact(&TokenKind::And) {
            return Some(first);
        }
        let mut values = vec![first];
        while self.eat(&TokenKind::And) {
            values.push(self.parse_not()?);
        }
        let span = values[0].span.merge(values[values.len() - 1].span);
        Some(Expr::new(
            ExprKind::BoolOp {
                op: BoolOp::And,
                values,
            },
            span,
        ))
    }

    /// `NotTest = "not" NotTest | Comparison`
    fn parse_not(&mut self) -> Option<Expr> {
        if !self.check_exact(&TokenKind::Not) {
            return self.parse_comparison();
        }
        let start = self.advance().span;
        self.enter_nested()?;
        let operand = self.parse_not();
        self.expr_depth -= 1;
        let operand = operand?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `Comparison = Arith { CompOp Arith }`: chains like Python: `a < b < c`.
    fn parse_comparison(&mut self) -> Option<Expr> {
        let left = self.parse_arith()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some(op) = self.eat_comparison_op() {
            ops.push(op);
            comparators.push(self.parse_arith()?);
        }
        if ops.is_empty() {
            return Some(left);
        }
        let span = left.span.merge(self.previous_span());
        Some(Expr::new(
            ExprKind::Compare {
                left: Box::new(left),
                ops,
                comparators,
            },
            span,
        ))
    }

    /// Consume a comparison operator (one or two tokens) if present.
    fn eat_comparison_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek_kind() {
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::BangEq => CmpOp::NotEq,
            TokenKind::Less => CmpOp::Lt,
            TokenKind::Greater => CmpOp::Gt,
            TokenKind::LessEq => CmpOp::LtE,
            TokenKind::GreaterEq => CmpOp::GtE,
            TokenKind::In => CmpOp::In,
            TokenKind::Not if self.look_ahead(1) == &TokenKind::In => {
                self.advance();
                CmpOp::NotIn
            }
            TokenKind::Is if self.look_ahead(1) == &TokenKind::Not => {
                self.advance();
                CmpOp::IsNot
            }
            TokenKind::Is => CmpOp::Is,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    /// `Arith = Term { ("+" | "-") Term }`
    fn parse_arith(&mut self) -> Option<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    /// `Term = Factor { ("*" | "/" | "//" | "%") Factor }`
    fn parse_term(&mut self) -> Option<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::SlashSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = binary(left, op, right);
        }
        Some(left)
    }

    /// `Factor = ("-" | "+") Factor | Power`
    fn parse_factor(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        let start = self.advance().span;
        self.enter_nested()?;
        let operand = self.parse_factor();
        self.expr_depth -= 1;
        let operand = operand?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `Power = Postfix [ "**" Factor ]`: `-2 ** 2` is `-(2 ** 2)`.
    fn parse_power(&mut self) -> Option<Expr> {
        let base = self.parse_postfix()?;
        if !self.eat(&TokenKind::StarStar) {
            return Some(base);
        }
        self.enter_nested()?;
        let exponent = self.parse_factor();
        self.expr_depth -= 1;
        Some(binary(base, BinOp::Pow, exponent?))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Postfix: calls, subscripts, attributes
    // ══════════════════════════════════════════════════════════════════════════

    /// `Postfix = Atom { Call | Subscript | "." Name }`
    pub(crate) fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let (args, keywords) = self.parse_call_args()?;
                    self.expect(&TokenKind::RParen)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            func: Box::new(expr),
                            args,
                            keywords,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_subscript()?;
                    self.expect(&TokenKind::RBracket)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Subscript {
                            value: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.expect_identifier()?;
                    let span = expr.span.merge(attr.span);
                    expr = Expr::new(
                        ExprKind::Attribute {
                            value: Box::new(expr),
                            attr,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Some(expr)
    }

    /// Arguments between `(` and `)`: positional, then `name=value`.
    fn parse_call_args(&mut self) -> Option<(Vec<Expr>, Vec<Keyword>)> {
        let mut args = Vec::new();
        let mut keywords: Vec<Keyword> = Vec::new();

        while !self.check_exact(&TokenKind::RParen) {
            if matches!(self.peek_kind(), TokenKind::Star | TokenKind::StarStar) {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "argument unpacking with '*' is not supported",
                );
                return None;
            }

            let is_keyword = matches!(self.peek_kind(), TokenKind::Identifier(_))
                && self.look_ahead(1) == &TokenKind::Eq;
            if is_keyword {
                let name = self.expect_identifier()?;
                self.advance(); // eat `=`
                if keywords.iter().any(|k| k.name.name == name.name) {
                    self.error_at(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("keyword argument repeated: {}", name.name),
                        name.span,
                    );
                    return None;
                }
                let value = self.parse_test()?;
                keywords.push(Keyword { name, value });
            } else {
                if !keywords.is_empty() {
                    self.error_at_current(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "positional argument follows keyword argument",
                    );
                    return None;
                }
                let arg = self.parse_test()?;
                if self.check_exact(&TokenKind::For) {
                    // `f(x for x in xs)`: a lone generator argument
                    let generators = self.parse_comprehension_clauses()?;
                    let span = arg.span.merge(self.previous_span());
                    args.push(Expr::new(
                        ExprKind::GeneratorExp {
                            element: Box::new(arg),
                            generators,
                        },
                        span,
                    ));
                } else {
                    args.push(arg);
                }
            }

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some((args, keywords))
    }

    /// Subscript index: an expression, a tuple, or a slice `a:b:c`.
    fn parse_subscript(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let lower = if self.check_exact(&TokenKind::Colon) {
            None
        } else {
            let first = self.parse_test()?;
            if !self.check_exact(&TokenKind::Colon) {
                if self.check_exact(&TokenKind::Comma) {
                    let mut items = vec![first];
                    while self.eat(&TokenKind::Comma) {
                        if self.check_exact(&TokenKind::RBracket) {
                            break;
                        }
                        items.push(self.parse_test()?);
                    }
                    let span = start.merge(self.previous_span());
                    return Some(Expr::new(ExprKind::Tuple(items), span));
                }
                return Some(first);
            }
            Some(Box::new(first))
        };

        self.expect(&TokenKind::Colon)?;
        let upper = if matches!(self.peek_kind(), TokenKind::Colon | TokenKind::RBracket) {
            None
        } else {
            Some(Box::new(self.parse_test()?))
        };
        let step = if self.eat(&TokenKind::Colon) && !self.check_exact(&TokenKind::RBracket) {
            Some(Box::new(self.parse_test()?))
        } else {
            None
        };
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::Slice { lower, upper, step }, span))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Atoms
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_atom(&mut self) -> Option<Expr> {
        let token = self.peek();
        let span = token.span;
        match token.kind {
            TokenKind::Int(n) => {
                self.advance();
                Some(Expr::new(ExprKind::Int(n), span))
            }
            TokenKind::Float(n) => {
                self.advance();
                Some(Expr::new(ExprKind::Float(n), span))
            }
            TokenKind::Str(_) | TokenKind::FStringStart(_) => self.parse_strings(),
            TokenKind::True => {
                self.advance();
                Some(Expr::new(ExprKind::Bool(true), span))
            }
            TokenKind::False => {
                self.advance();
                Some(Expr::new(ExprKind::Bool(false), span))
            }
            TokenKind::None => {
                self.advance();
                Some(Expr::new(ExprKind::None, span))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Some(Expr::new(ExprKind::Name(name), span))
            }
            TokenKind::LParen => self.parse_paren(),
            TokenKind::LBracket => self.parse_list_display(),
            TokenKind::LBrace => self.parse_brace_display(),
            _ => {
                self.error_invalid_syntax();
                None
            }
        }
    }

    /// `( )`, `( Test )`, `( Test, ... )` or a generator expression.
    fn parse_paren(&mut self) -> Option<Expr> {
        let start = self.advance().span; // eat `(`
        if self.eat(&TokenKind::RParen) {
            let span = start.merge(self.previous_span());
            return Some(Expr::new(ExprKind::Tuple(Vec::new()), span));
        }

        let first = self.parse_test()?;
        if self.check_exact(&TokenKind::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(&TokenKind::RParen)?;
            let span = start.merge(self.previous_span());
            return Some(Expr::new(
                ExprKind::GeneratorExp {
                    element: Box::new(first),
                    generators,
                },
                span,
            ));
        }

        if !self.check_exact(&TokenKind::Comma) {
            self.expect(&TokenKind::RParen)?;
            return Some(first);
        }

        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check_exact(&TokenKind::RParen) {
                break;
            }
            items.push(self.parse_test()?);
        }
        self.expect(&TokenKind::RParen)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::Tuple(items), span))
    }

    /// `[ ]`, `[ a, b ]` or `[ x for x in xs ]`
    fn parse_list_display(&mut self) -> Option<Expr> {
        let start = self.advance().span; // eat `[`
        if self.eat(&TokenKind::RBracket) {
            let span = start.merge(self.previous_span());
            return Some(Expr::new(ExprKind::List(Vec::new()), span));
        }

        let first = self.parse_test()?;
        if self.check_exact(&TokenKind::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(&TokenKind::RBracket)?;
            let span = start.merge(self.previous_span());
            return Some(Expr::new(
                ExprKind::ListComp {
                    element: Box::new(first),
                    generators,
                },
                span,
            ));
        }

        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check_exact(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_test()?);
        }
        self.expect(&TokenKind::RBracket)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::List(items), span))
    }

    /// `{}` / `{k: v, ...}` / `{a, b}` and their comprehensions.
    fn parse_brace_display(&mut self) -> Option<Expr> {
        let start = self.advance().span; // eat `{`
        if self.eat(&TokenKind::RBrace) {
            let span = start.merge(self.previous_span());
            return Some(Expr::new(ExprKind::Dict(Vec::new()), span));
        }

        let first = self.parse_test()?;

        if self.eat(&TokenKind::Colon) {
            let value = self.parse_test()?;
            if self.check_exact(&TokenKind::For) {
                let generators = self.parse_comprehension_clauses()?;
                self.expect(&TokenKind::RBrace)?;
                let span = start.merge(self.previous_span());
                return Some(Expr::new(
                    ExprKind::DictComp {
                        key: Box::new(first),
                        value: Box::new(value),
                        generators,
                    },
                    span,
                ));
            }
            let mut entries = vec![(first, value)];
            while self.eat(&TokenKind::Comma) {
                if self.check_exact(&TokenKind::RBrace) {
                    break;
                }
                let key = self.parse_test()?;
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_test()?;
                entries.push((key, value));
            }
            self.expect(&TokenKind::RBrace)?;
            let span = start.merge(self.previous_span());
            return Some(Expr::new(ExprKind::Dict(entries), span));
        }

        if self.check_exact(&TokenKind::For) {
            let generators = self.parse_comprehension_clauses()?;
            self.expect(&TokenKind::RBrace)?;
            let span = start.merge(self.previous_span());
            return Some(Expr::new(
                ExprKind::SetComp {
                    element: Box::new(first),
                    generators,
                },
                span,
            ));
        }

        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check_exact(&TokenKind::RBrace) {
                break;
            }
            items.push(self.parse_test()?);
        }
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::Set(items), span))
    }

    /// One or more `for target in iter { if cond }` clauses.
    fn parse_comprehension_clauses(&mut self) -> Option<Vec<Comprehension>> {
        let mut generators = Vec::new();
        while self.eat(&TokenKind::For) {
            let target = self.parse_target_list()?;
            self.expect(&TokenKind::In)?;
            let iter = self.parse_or()?;
            let mut conditions = Vec::new();
            while self.eat(&TokenKind::If) {
                conditions.push(self.parse_or()?);
            }
            generators.push(Comprehension {
                target,
                iter,
                conditions,
            });
        }
        Some(generators)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Strings & f-strings
    // ══════════════════════════════════════════════════════════════════════════

    /// One or more adjacent string literals, concatenated.
    fn parse_strings(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let mut parts: Vec<FStringPart> = Vec::new();
        let mut has_fields = false;

        loop {
            match self.peek_kind().clone() {
                TokenKind::Str(text) => {
                    self.advance();
                    push_literal(&mut parts, &text);
                }
                TokenKind::FStringStart(text) => {
                    self.advance();
                    push_literal(&mut parts, &text);
                    has_fields = true;
                    self.parse_fstring_rest(&mut parts)?;
                }
                _ => break,
            }
        }

        let span = start.merge(self.previous_span());
        if !has_fields {
            let text = parts
                .into_iter()
                .map(|p| match p {
                    FStringPart::Literal(s) => s,
                    FStringPart::Expr { .. } => String::new(),
                })
                .collect();
            return Some(Expr::new(ExprKind::Str(text), span));
        }
        Some(Expr::new(ExprKind::FString(parts), span))
    }

    /// Replacement fields and text after an `FStringStart`.
    fn parse_fstring_rest(&mut self, parts: &mut Vec<FStringPart>) -> Option<()> {
        loop {
            self.expect(&TokenKind::InterpolationStart)?;
            if self.check_exact(&TokenKind::InterpolationEnd) {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "f-string: empty expression not allowed",
                );
                return None;
            }
            let expr = self.parse_testlist()?;
            let format_spec = match self.peek_kind().clone() {
                TokenKind::FormatSpec(spec) => {
                    self.advance();
                    Some(spec)
                }
                _ => None,
            };
            if !self.check_exact(&TokenKind::InterpolationEnd) {
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "f-string: expecting '}'");
                return None;
            }
            self.advance();
            parts.push(FStringPart::Expr { expr, format_spec });

            match self.peek_kind().clone() {
                TokenKind::FStringMiddle(text) => {
                    self.advance();
                    push_literal(parts, &text);
                }
                TokenKind::FStringEnd(text) => {
                    self.advance();
                    push_literal(parts, &text);
                    return Some(());
                }
                _ => {
                    self.error_at_current(ErrorCode::UNTERMINATED_STRING, "unterminated f-string");
                    return None;
                }
            }
        }
    }
}

fn push_literal(parts: &mut Vec<FStringPart>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(FStringPart::Literal(last)) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(FStringPart::Literal(text.to_string()));
    }
}

fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
    let span: Span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

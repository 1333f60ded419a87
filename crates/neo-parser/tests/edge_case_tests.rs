//! Edge-case parser tests: syntax errors, indentation errors, misplaced
//! statements, nesting limits and error recovery.

use neo_lexer::Lexer;
use neo_parser::{ParseResult, Parser};
use neo_types::{ErrorCode, SourceFile};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn parse(source: &str) -> ParseResult {
    let sf = SourceFile::student(source);
    let lex = Lexer::new(&sf).lex();
    assert!(
        !lex.errors.has_errors(),
        "unexpected lexer errors: {:?}",
        lex.errors.errors
    );
    Parser::new(lex.tokens, &sf).parse()
}

/// First reported error as (line, code, message).
fn first_error(source: &str) -> (u32, ErrorCode, String) {
    let result = parse(source);
    assert!(result.module.is_none(), "module should be withheld on error");
    let err = result.errors.first().expect("expected an error");
    (err.line(), err.code, err.message.clone())
}

// ─────────────────────────────────────────────────────────────────────
// Invalid syntax
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_missing_closing_paren_argument() {
    let (line, code, msg) = first_error("arm.turn_left(45 90)");
    assert_eq!(line, 1);
    assert_eq!(code, ErrorCode::UNEXPECTED_TOKEN);
    assert_eq!(msg, "expected ')', got '90'");
}

#[test]
fn test_missing_colon() {
    let (line, _, msg) = first_error("x = 1\nif x > 0\n    arm.grab()\n");
    assert_eq!(line, 2);
    assert_eq!(msg, "expected ':', got end of line");
}

#[test]
fn test_dangling_operator() {
    let (line, code, msg) = first_error("x = 1 +\n");
    assert_eq!(line, 1);
    assert_eq!(code, ErrorCode::UNEXPECTED_TOKEN);
    assert_eq!(msg, "invalid syntax: unexpected end of line");
}

#[test]
fn test_two_expressions_on_one_line() {
    let (_, _, msg) = first_error("print('a') print('b')");
    assert_eq!(msg, "invalid syntax: unexpected 'print'");
}

#[test]
fn test_unsupported_keyword() {
    let (line, code, msg) = first_error("x = 1\nclass Robot:\n    pass\n");
    assert_eq!(line, 2);
    assert_eq!(code, ErrorCode::UNSUPPORTED_KEYWORD);
    assert_eq!(msg, "'class' is not supported in NEO Robot programs");
}

#[test]
fn test_unsupported_keyword_in_expression() {
    let (_, code, _) = first_error("x = yield 5");
    assert_eq!(code, ErrorCode::UNSUPPORTED_KEYWORD);
}

#[test]
fn test_assign_to_literal() {
    let (_, code, msg) = first_error("5 = x");
    assert_eq!(code, ErrorCode::INVALID_TARGET);
    assert_eq!(msg, "cannot assign to literal");
}

#[test]
fn test_assign_to_call() {
    let (_, _, msg) = first_error("arm.position() = 5");
    assert_eq!(
        msg,
        "cannot assign to function call here. Maybe you meant '==' instead of '='?"
    );
}

#[test]
fn test_augmented_assign_to_tuple() {
    let (_, code, msg) = first_error("a, b += 1");
    assert_eq!(code, ErrorCode::INVALID_TARGET);
    assert_eq!(msg, "'tuple' is an illegal expression for augmented assignment");
}

#[test]
fn test_delete_literal() {
    let (_, _, msg) = first_error("del 5");
    assert_eq!(msg, "cannot delete literal");
}

#[test]
fn test_conditional_expression_requires_else() {
    let (_, _, msg) = first_error("x = 1 if y");
    assert_eq!(msg, "expected 'else' after 'if' expression");
}

#[test]
fn test_positional_after_keyword() {
    let (_, _, msg) = first_error("f(a=1, 2)");
    assert_eq!(msg, "positional argument follows keyword argument");
}

#[test]
fn test_star_args_rejected() {
    let (_, _, msg) = first_error("def f(*args):\n    pass\n");
    assert_eq!(msg, "'*args' and '**kwargs' parameters are not supported");
}

#[test]
fn test_non_default_after_default() {
    let (_, _, msg) = first_error("def f(a=1, b):\n    pass\n");
    assert_eq!(msg, "non-default argument follows default argument");
}

#[test]
fn test_duplicate_parameter() {
    let (_, _, msg) = first_error("def f(a, a):\n    pass\n");
    assert_eq!(msg, "duplicate argument 'a' in function definition");
}

#[test]
fn test_empty_fstring_field() {
    let (_, _, msg) = first_error("print(f'{}')");
    assert_eq!(msg, "f-string: empty expression not allowed");
}

// ─────────────────────────────────────────────────────────────────────
// Indentation
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_expected_indented_block() {
    let (line, code, msg) = first_error("for i in range(3):\nprint(i)\n");
    assert_eq!(line, 2);
    assert_eq!(code, ErrorCode::EXPECTED_INDENT);
    assert_eq!(msg, "expected an indented block after 'for' statement on line 1");
}

#[test]
fn test_expected_indented_block_at_end_of_input() {
    let (_, code, msg) = first_error("def f():\n");
    assert_eq!(code, ErrorCode::EXPECTED_INDENT);
    assert_eq!(
        msg,
        "expected an indented block after 'function definition' statement on line 1"
    );
}

#[test]
fn test_unexpected_indent() {
    let (line, code, msg) = first_error("x = 1\n    y = 2\n");
    assert_eq!(line, 2);
    assert_eq!(code, ErrorCode::UNEXPECTED_INDENT);
    assert_eq!(msg, "unexpected indent");
}

// ─────────────────────────────────────────────────────────────────────
// Misplaced statements
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_break_outside_loop() {
    let (_, code, msg) = first_error("break");
    assert_eq!(code, ErrorCode::MISPLACED_STATEMENT);
    assert_eq!(msg, "'break' outside loop");
}

#[test]
fn test_continue_in_function_inside_loop() {
    let (_, _, msg) = first_error("for i in xs:\n    def f():\n        continue\n");
    assert_eq!(msg, "'continue' not properly in loop");
}

#[test]
fn test_return_outside_function() {
    let (_, _, msg) = first_error("return 5");
    assert_eq!(msg, "'return' outside function");
}

#[test]
fn test_else_without_if() {
    let (_, code, msg) = first_error("else:\n    pass\n");
    assert_eq!(code, ErrorCode::MISPLACED_STATEMENT);
    assert_eq!(msg, "'else' without a matching block before it");
}

#[test]
fn test_except_with_exception_type_rejected() {
    let (_, _, msg) = first_error("try:\n    pass\nexcept ValueError:\n    pass\n");
    assert_eq!(msg, "only a bare 'except:' is supported");
}

#[test]
fn test_try_without_handler_or_finally() {
    let (_, _, msg) = first_error("try:\n    pass\nx = 1\n");
    assert_eq!(msg, "expected 'except' or 'finally' block");
}

// ─────────────────────────────────────────────────────────────────────
// Limits
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_expression_nesting_limit() {
    let source = format!("x = {}1{}", "(".repeat(100), ")".repeat(100));
    let (_, code, _) = first_error(&source);
    assert_eq!(code, ErrorCode::NESTING_LIMIT_EXCEEDED);
}

#[test]
fn test_moderate_nesting_is_fine() {
    let source = format!("x = {}1{}", "(".repeat(30), ")".repeat(30));
    assert!(parse(&source).module.is_some());
}

#[test]
fn test_block_nesting_limit() {
    let mut source = String::new();
    for depth in 0..25 {
        source.push_str(&"    ".repeat(depth));
        source.push_str("if True:\n");
    }
    source.push_str(&"    ".repeat(25));
    source.push_str("pass\n");
    let (_, code, msg) = first_error(&source);
    assert_eq!(code, ErrorCode::NESTING_LIMIT_EXCEEDED);
    assert_eq!(msg, "too many statically nested blocks");
}

// ─────────────────────────────────────────────────────────────────────
// Error recovery
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_recovery_reports_multiple_errors() {
    let result = parse("x = = 1\ny = 2\nz = * 2\n");
    assert!(result.errors.total_errors >= 2);
    assert_eq!(result.errors.first().map(|e| e.line()), Some(1));
}

#[test]
fn test_recovery_skips_body_of_broken_header() {
    let result = parse("if x x:\n    y = 1\n    z = 2\nw = 3\n");
    assert_eq!(result.errors.total_errors, 1);
}

#[test]
fn test_error_cap_respected() {
    let source = "x = = 1\n".repeat(40);
    let result = parse(&source);
    assert!(result.errors.errors.len() <= neo_types::MAX_ERRORS);
}

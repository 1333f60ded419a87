//! NEO parser: converts a token stream into a [`Module`] AST.

mod parse_expr;
mod parse_stmt;
mod parser;

use neo_lexer::Lexer;
use neo_types::ast::Module;
use neo_types::{SourceFile, SyntaxErrors};

pub use parser::{ParseResult, Parser};

/// Lex and parse a whole source file.
///
/// Lexer errors take priority: a token stream with errors is not parsed.
pub fn parse_source(source: &SourceFile) -> Result<Module, SyntaxErrors> {
    let lexed = Lexer::new(source).lex();
    if lexed.errors.has_errors() {
        return Err(lexed.errors);
    }
    let parsed = Parser::new(lexed.tokens, source).parse();
    match parsed.module {
        Some(module) => Ok(module),
        None => Err(parsed.errors),
    }
}

//! NEO lexer: converts student source text into an indentation-aware token stream.

pub mod lexer;
pub mod token;

pub use lexer::{LexResult, Lexer};
pub use token::{Token, TokenKind, ALL_KEYWORDS, UNSUPPORTED_KEYWORDS};

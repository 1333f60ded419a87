//! Token types for the NEO lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the student language and
//! [`Token`], which pairs a kind with a source [`Span`].

use neo_types::Span;
use std::fmt;

/// Reserved words recognised by the student language.
pub const ALL_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "break", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "not", "or", "pass", "return", "try", "while",
];

/// Python keywords that are reserved but outside the beginner subset.
///
/// Using one is a syntax error that names the keyword.
pub const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "async", "await", "class", "nonlocal", "raise", "with", "yield",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the NEO lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Source location.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Every token kind in the student language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────

    /// Integer literal: `42`, `0xff`, `1_000`
    Int(i64),
    /// Float literal: `3.14`, `.5`, `1e3`
    Float(f64),
    /// Complete string literal (quotes and escapes resolved)
    Str(String),

    // ── f-strings ────────────────────────────────────────────

    /// Start of an f-string: text before the first `{`.
    FStringStart(String),
    /// Text between a `}` and the next `{` inside an f-string.
    FStringMiddle(String),
    /// End of an f-string: text after the last `}` up to the closing quote.
    FStringEnd(String),
    /// The `{` that opens a replacement field.
    InterpolationStart,
    /// The `:spec` of a replacement field, without the colon.
    FormatSpec(String),
    /// The `}` that closes a replacement field.
    InterpolationEnd,

    // ── Identifiers ──────────────────────────────────────────

    /// User-visible name: `arm`, `angle`, `my_list`
    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────

    False,
    None,
    True,
    And,
    As,
    Assert,
    Break,
    Continue,
    Def,
    Del,
    Elif,
    Else,
    Except,
    Finally,
    For,
    From,
    Global,
    If,
    Import,
    In,
    Is,
    Lambda,
    Not,
    Or,
    Pass,
    Return,
    Try,
    While,
    /// A Python keyword the beginner subset does not support.
    Unsupported(String),

    // ── Operators ────────────────────────────────────────────

    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `**`
    StarStar,
    /// `/`
    Slash,
    /// `//`
    SlashSlash,
    /// `%`
    Percent,
    /// `==`
    EqEq,
    /// `!=`
    BangEq,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEq,
    /// `>=`
    GreaterEq,
    /// `=`
    Eq,
    /// `+=`
    PlusEq,
    /// `-=`
    MinusEq,
    /// `*=`
    StarEq,
    /// `/=`
    SlashEq,
    /// `//=`
    SlashSlashEq,
    /// `%=`
    PercentEq,
    /// `**=`
    StarStarEq,

    // ── Punctuation ──────────────────────────────────────────

    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `.`
    Dot,

    // ── Layout ───────────────────────────────────────────────

    /// End of a logical line
    Newline,
    /// Indentation increased
    Indent,
    /// Indentation decreased by one level
    Dedent,
    /// End of file
    Eof,
}

impl TokenKind {
    /// Look up a reserved word. Returns `None` for user identifiers.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            "True" => TokenKind::True,
            "and" => TokenKind::And,
            "as" => TokenKind::As,
            "assert" => TokenKind::Assert,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "def" => TokenKind::Def,
            "del" => TokenKind::Del,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "except" => TokenKind::Except,
            "finally" => TokenKind::Finally,
            "for" => TokenKind::For,
            "from" => TokenKind::From,
            "global" => TokenKind::Global,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "in" => TokenKind::In,
            "is" => TokenKind::Is,
            "lambda" => TokenKind::Lambda,
            "not" => TokenKind::Not,
            "or" => TokenKind::Or,
            "pass" => TokenKind::Pass,
            "return" => TokenKind::Return,
            "try" => TokenKind::Try,
            "while" => TokenKind::While,
            _ if UNSUPPORTED_KEYWORDS.contains(&s) => TokenKind::Unsupported(s.to_string()),
            _ => return None,
        })
    }

    /// Returns `true` for reserved words (supported or not).
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::False
                | TokenKind::None
                | TokenKind::True
                | TokenKind::And
                | TokenKind::As
                | TokenKind::Assert
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Def
                | TokenKind::Del
                | TokenKind::Elif
                | TokenKind::Else
                | TokenKind::Except
                | TokenKind::Finally
                | TokenKind::For
                | TokenKind::From
                | TokenKind::Global
                | TokenKind::If
                | TokenKind::Import
                | TokenKind::In
                | TokenKind::Is
                | TokenKind::Lambda
                | TokenKind::Not
                | TokenKind::Or
                | TokenKind::Pass
                | TokenKind::Return
                | TokenKind::Try
                | TokenKind::While
                | TokenKind::Unsupported(_)
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "{n}"),
            TokenKind::Float(n) => write!(f, "{n}"),
            TokenKind::Str(s) => write!(f, "'{s}'"),
            TokenKind::FStringStart(_) => f.write_str("f-string"),
            TokenKind::FStringMiddle(_) => f.write_str("f-string text"),
            TokenKind::FStringEnd(_) => f.write_str("end of f-string"),
            TokenKind::InterpolationStart => f.write_str("{"),
            TokenKind::FormatSpec(s) => write!(f, ":{s}"),
            TokenKind::InterpolationEnd => f.write_str("}"),
            TokenKind::Identifier(s) => f.write_str(s),
            TokenKind::False => f.write_str("False"),
            TokenKind::None => f.write_str("None"),
            TokenKind::True => f.write_str("True"),
            TokenKind::And => f.write_str("and"),
            TokenKind::As => f.write_str("as"),
            TokenKind::Assert => f.write_str("assert"),
            TokenKind::Break => f.write_str("break"),
            TokenKind::Continue => f.write_str("continue"),
            TokenKind::Def => f.write_str("def"),
            TokenKind::Del => f.write_str("del"),
            TokenKind::Elif => f.write_str("elif"),
            TokenKind::Else => f.write_str("else"),
            TokenKind::Except => f.write_str("except"),
            TokenKind::Finally => f.write_str("finally"),
            TokenKind::For => f.write_str("for"),
            TokenKind::From => f.write_str("from"),
            TokenKind::Global => f.write_str("global"),
            TokenKind::If => f.write_str("if"),
            TokenKind::Import => f.write_str("import"),
            TokenKind::In => f.write_str("in"),
            TokenKind::Is => f.write_str("is"),
            TokenKind::Lambda => f.write_str("lambda"),
            TokenKind::Not => f.write_str("not"),
            TokenKind::Or => f.write_str("or"),
            TokenKind::Pass => f.write_str("pass"),
            TokenKind::Return => f.write_str("return"),
            TokenKind::Try => f.write_str("try"),
            TokenKind::While => f.write_str("while"),
            TokenKind::Unsupported(s) => f.write_str(s),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::StarStar => f.write_str("**"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::SlashSlash => f.write_str("//"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::EqEq => f.write_str("=="),
            TokenKind::BangEq => f.write_str("!="),
            TokenKind::Less => f.write_str("<"),
            TokenKind::Greater => f.write_str(">"),
            TokenKind::LessEq => f.write_str("<="),
            TokenKind::GreaterEq => f.write_str(">="),
            TokenKind::Eq => f.write_str("="),
            TokenKind::PlusEq => f.write_str("+="),
            TokenKind::MinusEq => f.write_str("-="),
            TokenKind::StarEq => f.write_str("*="),
            TokenKind::SlashEq => f.write_str("/="),
            TokenKind::SlashSlashEq => f.write_str("//="),
            TokenKind::PercentEq => f.write_str("%="),
            TokenKind::StarStarEq => f.write_str("**="),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBracket => f.write_str("["),
            TokenKind::RBracket => f.write_str("]"),
            TokenKind::LBrace => f.write_str("{"),
            TokenKind::RBrace => f.write_str("}"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Colon => f.write_str(":"),
            TokenKind::Semicolon => f.write_str(";"),
            TokenKind::Dot => f.write_str("."),
            TokenKind::Newline => f.write_str("end of line"),
            TokenKind::Indent => f.write_str("indent"),
            TokenKind::Dedent => f.write_str("dedent"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

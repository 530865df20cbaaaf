//! Token definitions for somelang

use crate::utils::Span;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn eof(span: Span) -> Self {
        Self { kind: TokenKind::Eof, span }
    }
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ============ Keywords ============
    /// fun
    Fun,
    /// let
    Let,
    /// return
    Return,
    /// data
    Data,

    // ============ Identifiers and Literals ============
    /// Identifier (variable name, function name, type name)
    Ident(String),
    /// Integer literal; range-checked by the parser
    IntLit(i64),
    /// String literal with escapes already processed
    StringLit(String),
    /// String literal missing its closing quote
    UnterminatedString,

    // ============ Operators ============
    /// +
    Plus,
    /// =
    Eq,
    /// |
    Pipe,
    /// ->
    Arrow,

    // ============ Delimiters ============
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// ,
    Comma,
    /// :
    Colon,
    /// ;
    Semicolon,
    /// .
    Dot,

    // ============ Special ============
    /// End of file
    Eof,
    /// Character the lexer does not recognize
    Unknown(char),
}

impl TokenKind {
    /// Check if a string is a keyword
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s {
            "fun" => Some(TokenKind::Fun),
            "let" => Some(TokenKind::Let),
            "return" => Some(TokenKind::Return),
            "data" => Some(TokenKind::Data),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Fun => write!(f, "fun"),
            TokenKind::Let => write!(f, "let"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::Data => write!(f, "data"),
            TokenKind::Ident(s) => write!(f, "{}", s),
            TokenKind::IntLit(n) => write!(f, "{}", n),
            TokenKind::StringLit(s) => write!(f, "{:?}", s),
            TokenKind::UnterminatedString => write!(f, "unterminated string"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Eq => write!(f, "="),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::Arrow => write!(f, "->"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Eof => write!(f, "end of file"),
            TokenKind::Unknown(c) => write!(f, "{:?}", c),
        }
    }
}

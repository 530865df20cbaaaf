//! Lexer for somelang

use crate::frontend::token::{Token, TokenKind};
use crate::utils::Span;

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    /// Offset where the token being scanned began
    start: usize,
    file_id: usize,
}

impl Lexer {
    pub fn new(source: &str, file_id: usize) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            file_id,
        }
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.start, self.pos, self.file_id))
    }

    /// Consume characters while `pred` holds
    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().map_or(false, &pred) {
            self.pos += 1;
        }
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.pos].iter().collect()
    }

    /// Whitespace and `//` comments
    fn skip_trivia(&mut self) {
        loop {
            self.eat_while(char::is_whitespace);
            if self.peek() == Some('/') && self.peek_next() == Some('/') {
                self.eat_while(|c| c != '\n');
            } else {
                break;
            }
        }
    }

    fn identifier_or_keyword(&mut self) -> Token {
        self.eat_while(|c| c.is_alphanumeric() || c == '_');
        let text = self.lexeme();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident(text));
        self.make_token(kind)
    }

    /// Decimal digits, `_` separators allowed
    fn number(&mut self) -> Token {
        self.eat_while(|c| c.is_ascii_digit() || c == '_');
        let digits: String = self.lexeme().chars().filter(|&c| c != '_').collect();
        // Saturate so the parser reports the literal as out of range.
        let value = digits.parse().unwrap_or(i64::MAX);
        self.make_token(TokenKind::IntLit(value))
    }

    /// Double-quoted, with `\n \r \t \0` escapes
    fn string(&mut self) -> Token {
        self.advance();
        let mut value = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    return self.make_token(TokenKind::StringLit(value));
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('r') => value.push('\r'),
                        Some('t') => value.push('\t'),
                        Some('0') => value.push('\0'),
                        Some(c) => value.push(c),
                        None => break,
                    }
                }
                Some('\n') | None => break,
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        self.make_token(TokenKind::UnterminatedString)
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();
        self.start = self.pos;

        if self.is_at_end() {
            return Token::eof(Span::new(self.pos, self.pos, self.file_id));
        }
        let c = self.source[self.pos];

        match c {
            c if c.is_alphabetic() || c == '_' => return self.identifier_or_keyword(),
            c if c.is_ascii_digit() => return self.number(),
            '"' => return self.string(),
            _ => {}
        }

        self.advance();
        let kind = match c {
            '+' => TokenKind::Plus,
            '=' => TokenKind::Eq,
            '|' => TokenKind::Pipe,
            '-' if self.peek() == Some('>') => {
                self.advance();
                TokenKind::Arrow
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            _ => TokenKind::Unknown(c),
        };

        self.make_token(kind)
    }

    /// All tokens up to and including `Eof`
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }
}

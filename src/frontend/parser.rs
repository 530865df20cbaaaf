//! Parser for somelang
//!
//! Recursive descent over the token stream. The grammar is deliberately
//! small:
//!
//! ```text
//! file      := item*
//! item      := "fun" IDENT "(" params? ")" (":" type)? block
//!            | "data" IDENT "=" ctor ("|" ctor)*
//! ctor      := IDENT ("(" types? ")")?
//! block     := "{" (stmt ";"?)* "}"
//! stmt      := "let" IDENT (":" type)? "=" expr | "return" expr | block | expr
//! expr      := postfix ("+" postfix)*
//! postfix   := primary ("." IDENT)*
//! primary   := INT | STRING | "(" expr ")" | IDENT ("(" args? ")")?
//! type      := IDENT ("(" types ")")? | "(" types? ")" "->" type
//! ```

use std::path::Path;

use crate::common::phase::Parsing;
use crate::frontend::ast::*;
use crate::frontend::attrs::SourceAttrsMut;
use crate::frontend::dsl;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, Span};

type P = Parsing;

/// Parse one source file and tag it with its path
pub fn parse_file(source: &str, path: &Path, file_id: usize) -> Result<FileNode<P>> {
    let mut parser = Parser::new(Lexer::new(source, file_id));
    Ok(parser.parse_file()?.with_file_path(path))
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        Self {
            tokens: lexer.tokenize(),
            pos: 0,
        }
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        // tokenize() always ends with Eof, and advance() never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    /// Error for the current token, reporting lexer failures precisely
    fn unexpected(&self, expected: &str) -> Error {
        let token = self.current();
        match &token.kind {
            TokenKind::Unknown(c) => Error::UnexpectedChar(*c, token.span),
            TokenKind::UnterminatedString => Error::UnterminatedString { span: token.span },
            other => Error::UnexpectedToken {
                expected: expected.to_string(),
                got: other.to_string(),
                span: token.span,
            },
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_ident(&mut self) -> Result<(String, Span)> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, token.span))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Comma-separated list up to (and including) `close`
    fn parse_list<T>(&mut self, close: TokenKind, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while !self.check(&close) {
            items.push(item(self)?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    // ==================== Declarations ====================

    /// Parse a complete file
    pub fn parse_file(&mut self) -> Result<FileNode<P>> {
        let mut nodes = Vec::new();
        while !self.is_at_end() {
            nodes.push(self.parse_item()?);
        }
        Ok(dsl::file(nodes))
    }

    fn parse_item(&mut self) -> Result<Node<P>> {
        match self.current_kind() {
            TokenKind::Fun => self.parse_function(),
            TokenKind::Data => self.parse_data(),
            _ => Err(self.unexpected("item (fun, data)")),
        }
    }

    fn parse_function(&mut self) -> Result<Node<P>> {
        self.expect(TokenKind::Fun)?;
        let (name, _) = self.parse_ident()?;

        self.expect(TokenKind::LParen)?;
        let params = self.parse_list(TokenKind::RParen, |p| {
            let (name, _) = p.parse_ident()?;
            let ty = p.parse_annotation()?;
            Ok(dsl::param(&name, ty))
        })?;

        let return_type = self.parse_annotation()?;

        let body = self.parse_block()?;
        Ok(dsl::fun(&name, params, return_type, body))
    }

    fn parse_data(&mut self) -> Result<Node<P>> {
        self.expect(TokenKind::Data)?;
        let (type_name, _) = self.parse_ident()?;
        self.expect(TokenKind::Eq)?;

        let mut constructors = Vec::new();
        loop {
            let (name, _) = self.parse_ident()?;
            let params = if self.consume(&TokenKind::LParen) {
                self.parse_list(TokenKind::RParen, |p| p.parse_type())?
            } else {
                Vec::new()
            };
            constructors.push(dsl::value_constructor(&name, params));
            if !self.consume(&TokenKind::Pipe) {
                break;
            }
        }

        Ok(Node::DataDeclaration(DataDeclarationNode {
            type_constructor: TypeConstructorDeclarationNode {
                name: dsl::id(&type_name),
                type_parameters: Vec::new(),
                meta: Meta::new(),
            },
            value_constructors: constructors,
            meta: Meta::new(),
        }))
    }

    /// `: type`, if present
    fn parse_annotation(&mut self) -> Result<Option<TypeExpressionNode<P>>> {
        if self.consume(&TokenKind::Colon) {
            self.parse_type().map(Some)
        } else {
            Ok(None)
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpressionNode<P>> {
        if self.consume(&TokenKind::LParen) {
            let argument_types = self.parse_list(TokenKind::RParen, |p| p.parse_type())?;
            self.expect(TokenKind::Arrow)?;
            let return_type = self.parse_type()?;
            return Ok(dsl::function_type(argument_types, return_type));
        }

        let (name, _) = self.parse_ident()?;
        if self.consume(&TokenKind::LParen) {
            let arguments = self.parse_list(TokenKind::RParen, |p| p.parse_type())?;
            return Ok(TypeExpressionNode::ConstructorInvocation(TypeConstructorInvocationNode {
                target: dsl::id(&name),
                arguments,
                meta: Meta::new(),
            }));
        }
        Ok(dsl::type_name(&name))
    }

    // ==================== Statements ====================

    fn parse_block(&mut self) -> Result<Node<P>> {
        self.expect(TokenKind::LBrace)?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
            self.consume(&TokenKind::Semicolon);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(dsl::block(statements))
    }

    fn parse_statement(&mut self) -> Result<Node<P>> {
        match self.current_kind() {
            TokenKind::Let => {
                self.advance();
                let (name, _) = self.parse_ident()?;
                let ty = self.parse_annotation()?;
                self.expect(TokenKind::Eq)?;
                let rhs = self.parse_expr()?;
                Ok(dsl::let_(&name, ty, rhs))
            }
            TokenKind::Return => {
                self.advance();
                Ok(dsl::ret(self.parse_expr()?))
            }
            TokenKind::LBrace => self.parse_block(),
            _ => self.parse_expr(),
        }
    }

    // ==================== Expressions ====================

    fn parse_expr(&mut self) -> Result<Node<P>> {
        let mut lhs = self.parse_postfix()?;
        while self.consume(&TokenKind::Plus) {
            let rhs = self.parse_postfix()?;
            lhs = dsl::add(lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> Result<Node<P>> {
        let mut expr = self.parse_primary()?;
        while self.consume(&TokenKind::Dot) {
            let (field, _) = self.parse_ident()?;
            expr = Node::ReadFieldValue(ReadFieldValueNode {
                receiver: Box::new(expr),
                field: dsl::id(&field),
                meta: Meta::new(),
            });
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Node<P>> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::IntLit(value) => {
                self.advance();
                let value = i32::try_from(value).map_err(|_| Error::IntegerOverflow {
                    text: value.to_string(),
                    span: token.span,
                })?;
                Ok(dsl::int(value))
            }
            TokenKind::StringLit(value) => {
                self.advance();
                Ok(dsl::string(&value))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Ident(name) => {
                let is_call = self.peek_kind() == Some(&TokenKind::LParen);
                self.advance();
                let is_constructor = name.starts_with(|c: char| c.is_uppercase());

                if is_constructor {
                    // Constructor fields are not supported, so only `Bar` or `Bar()`.
                    if is_call {
                        self.advance();
                        self.expect(TokenKind::RParen)?;
                    }
                    return Ok(dsl::construct(&name));
                }

                if is_call {
                    self.advance();
                    let args = self.parse_list(TokenKind::RParen, |p| p.parse_expr())?;
                    return Ok(dsl::invoke(&name, args));
                }
                Ok(dsl::read(&name))
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Attributable;
    use crate::frontend::attrs::SourceAttrs;

    fn parse(source: &str) -> Result<FileNode<P>> {
        Parser::new(Lexer::new(source, 0)).parse_file()
    }

    #[test]
    fn test_function_with_params() {
        let file = parse("fun add(a: Int, b): Int { return a + b }").unwrap();
        let decl = file.functions().next().unwrap();
        assert_eq!(decl.simple_name(), "add");
        assert_eq!(decl.parameters.len(), 2);
        assert!(decl.parameters[0].ty.is_some());
        assert!(decl.parameters[1].ty.is_none());
        assert!(decl.return_type.is_some());

        let Node::Block(body) = decl.body.as_ref() else { panic!("expected block") };
        let Node::Return(ret) = &body.statements[0] else { panic!("expected return") };
        assert!(matches!(ret.value.as_ref(), Node::BinaryOperation(_)));
    }

    #[test]
    fn test_statements() {
        let file = parse(
            "fun somelangMain() {
                let a: Int = 123;
                { let b = a }
                echo(\"abc\")
                return Bar
            }",
        )
        .unwrap();
        let decl = file.functions().next().unwrap();
        let Node::Block(body) = decl.body.as_ref() else { panic!("expected block") };
        assert_eq!(body.statements.len(), 4);
        assert!(matches!(body.statements[0], Node::LocalVarDeclaration(_)));
        assert!(matches!(body.statements[1], Node::Block(_)));
        assert!(matches!(&body.statements[2], Node::Invoke(call) if call.arguments.len() == 1));
        let Node::Return(ret) = &body.statements[3] else { panic!("expected return") };
        assert!(matches!(ret.value.as_ref(), Node::ValueConstructorInvocation(_)));
    }

    #[test]
    fn test_addition_is_left_associative() {
        let file = parse("fun f() { return 1 + (2 + 3) + 4 }").unwrap();
        let decl = file.functions().next().unwrap();
        let Node::Block(body) = decl.body.as_ref() else { panic!("expected block") };
        let Node::Return(ret) = &body.statements[0] else { panic!("expected return") };
        let Node::BinaryOperation(outer) = ret.value.as_ref() else { panic!("expected add") };
        assert!(matches!(outer.rhs.as_ref(), Node::IntLiteral(lit) if lit.value == 4));
        assert!(matches!(outer.lhs.as_ref(), Node::BinaryOperation(_)));
    }

    #[test]
    fn test_data_declaration() {
        let file = parse("data Foo = Bar | Baz(Int, String)").unwrap();
        let data = file.data_declarations().next().unwrap();
        assert_eq!(data.type_constructor.name.name.text(), "Foo");
        assert_eq!(data.value_constructors.len(), 2);
        assert!(data.value_constructors[0].parameters.is_empty());
        assert_eq!(data.value_constructors[1].parameters.len(), 2);
    }

    #[test]
    fn test_function_type_annotation() {
        let file = parse("fun f(g: (Int) -> Int) { return 1 }").unwrap();
        let decl = file.functions().next().unwrap();
        assert!(matches!(decl.parameters[0].ty, Some(TypeExpressionNode::Function(_))));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse("let x = 1"), Err(Error::UnexpectedToken { .. })));
        assert!(matches!(parse("fun f() { return \"abc }"), Err(Error::UnterminatedString { .. })));
        assert!(matches!(parse("fun f() { return # }"), Err(Error::UnexpectedChar('#', _))));
        assert!(matches!(
            parse("fun f() { return 99999999999 }"),
            Err(Error::IntegerOverflow { .. })
        ));
        assert!(matches!(parse("fun f() { return 1"), Err(Error::UnexpectedToken { .. })));
    }

    #[test]
    fn test_parse_file_sets_path() {
        let file = parse_file("fun f() { return 1 }", Path::new("dir/Main.som"), 0).unwrap();
        assert_eq!(file.file_path().unwrap(), Path::new("dir/Main.som"));
        assert_eq!(file.attributes().len(), 1);
    }
}

//! Frontend module - Lexer, Parser, AST

pub mod token;
pub mod lexer;
pub mod ast;
pub mod attrs;
pub mod dsl;
pub mod parser;

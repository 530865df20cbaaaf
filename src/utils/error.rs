//! Error handling for somelang

use crate::utils::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of a compiler error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Syntax,
    Lookup,
    Unsupported,
    Policy,
    Resource,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Syntax => "syntax",
            Self::Lookup => "lookup",
            Self::Unsupported => "unsupported",
            Self::Policy => "policy",
            Self::Resource => "resource",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Compiler error
#[derive(Error, Debug)]
pub enum Error {
    // ==================== Parser Errors ====================

    #[error("Unexpected token: expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("Unterminated string literal")]
    UnterminatedString { span: Span },

    #[error("Integer literal out of range: {text}")]
    IntegerOverflow { text: String, span: Span },

    #[error("Unexpected character: {0:?}")]
    UnexpectedChar(char, Span),

    // ==================== Lookup Errors ====================

    #[error("Attribute '{attribute}' was never written on {node}")]
    MissingAttribute { attribute: &'static str, node: String },

    #[error("Unresolved name: {name}")]
    UnresolvedName { name: String },

    #[error("Ambiguous name {name}: defined in {candidates:?}")]
    AmbiguousName { name: String, candidates: Vec<String> },

    #[error("No type recorded for {fqn}")]
    MissingType { fqn: String },

    #[error("{fqn} has type {ty}, which is not a function type")]
    NotAFunction { fqn: String, ty: String },

    #[error("Unknown value constructor: {fqn}")]
    UnknownValueConstructor { fqn: String },

    #[error("No local variable named {name} is in scope")]
    UnboundLocal { name: String },

    #[error("No variable bound for identifier {name}")]
    UnboundIdentifier { name: String },

    #[error("Cannot infer the return type of {name}; annotate it")]
    CannotInferType { name: String },

    // ==================== Unsupported Constructs ====================

    #[error("{backend} backend does not support {node}")]
    UnsupportedNode { backend: &'static str, node: String },

    #[error("Type {ty} cannot be represented here")]
    UnsupportedType { ty: String },

    #[error("Top-level {node} is not a declaration")]
    UnsupportedTopLevel { node: String },

    // ==================== Policy Errors ====================

    #[error("Ambiguous entry point: {symbol} is defined by {candidates:?}")]
    AmbiguousEntryPoint { symbol: String, candidates: Vec<String> },

    #[error("Function name {name} is reserved")]
    ReservedName { name: String },

    #[error("Class {name} would be generated twice; a file and a data type share a name")]
    DuplicateClass { name: String },

    // ==================== Code Generation Errors ====================

    #[error("No defined value for empty blocks")]
    EmptyBlock,

    #[error("Statement after return in {function}")]
    StatementAfterReturn { function: String },

    #[error("Function {function} does not end in a return")]
    MissingReturn { function: String },

    #[error("Can only convert expressions, got {node}")]
    NotAnExpression { node: String },

    #[error("Symbol table popped more frames than were pushed")]
    SymbolTableUnderflow,

    #[error("Symbol table has {depth} open frame(s) at the end of generation")]
    UnbalancedSymbolTable { depth: usize },

    #[error("Code generation error: {0}")]
    CodeGen(String),

    // ==================== Resources ====================

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnexpectedToken { span, .. } => Some(*span),
            Self::UnterminatedString { span } => Some(*span),
            Self::IntegerOverflow { span, .. } => Some(*span),
            Self::UnexpectedChar(_, span) => Some(*span),
            _ => None,
        }
    }

    /// Which taxonomy bucket this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnexpectedToken { .. }
            | Self::UnterminatedString { .. }
            | Self::IntegerOverflow { .. }
            | Self::UnexpectedChar(..) => ErrorCategory::Syntax,

            Self::MissingAttribute { .. }
            | Self::UnresolvedName { .. }
            | Self::AmbiguousName { .. }
            | Self::MissingType { .. }
            | Self::NotAFunction { .. }
            | Self::UnknownValueConstructor { .. }
            | Self::UnboundLocal { .. }
            | Self::UnboundIdentifier { .. }
            | Self::CannotInferType { .. } => ErrorCategory::Lookup,

            Self::UnsupportedNode { .. }
            | Self::UnsupportedType { .. }
            | Self::UnsupportedTopLevel { .. }
            | Self::EmptyBlock
            | Self::StatementAfterReturn { .. }
            | Self::MissingReturn { .. } => ErrorCategory::Unsupported,

            Self::AmbiguousEntryPoint { .. } | Self::ReservedName { .. } | Self::DuplicateClass { .. } => {
                ErrorCategory::Policy
            }

            Self::Io(_) | Self::Archive(_) => ErrorCategory::Resource,

            Self::NotAnExpression { .. }
            | Self::SymbolTableUnderflow
            | Self::UnbalancedSymbolTable { .. }
            | Self::CodeGen(_)
            | Self::Config(_) => ErrorCategory::Internal,
        }
    }
}

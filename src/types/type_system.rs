//! Type System for somelang

use std::collections::HashMap;
use std::fmt;

use crate::common::FullyQualifiedName;
use crate::utils::{Error, Result};

/// A type as seen by the compiler
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SomelangType {
    Int,
    Void,
    /// Built-in string, an object type backed by `java.lang.String`
    String,
    /// User-declared object type, identified by name
    Object(FullyQualifiedName),
    Function {
        argument_types: Vec<ArgumentType>,
        return_type: Box<SomelangType>,
    },
}

/// One (optionally named) argument of a function type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArgumentType {
    pub name: Option<String>,
    pub ty: SomelangType,
}

impl ArgumentType {
    pub fn named(name: impl Into<String>, ty: SomelangType) -> Self {
        Self { name: Some(name.into()), ty }
    }

    pub fn positional(ty: SomelangType) -> Self {
        Self { name: None, ty }
    }
}

impl SomelangType {
    pub fn function(argument_types: Vec<ArgumentType>, return_type: SomelangType) -> Self {
        Self::Function {
            argument_types,
            return_type: Box::new(return_type),
        }
    }

    pub fn object(fqn: impl Into<String>) -> Self {
        Self::Object(FullyQualifiedName::new(fqn))
    }

    /// Map a source type name to a built-in type
    pub fn builtin(name: &str) -> Option<SomelangType> {
        match name {
            "Int" => Some(Self::Int),
            "Void" => Some(Self::Void),
            "String" => Some(Self::String),
            _ => None,
        }
    }
}

impl fmt::Display for SomelangType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "Int"),
            Self::Void => write!(f, "Void"),
            Self::String => write!(f, "String"),
            Self::Object(fqn) => write!(f, "{}", fqn),
            Self::Function { argument_types, return_type } => {
                write!(f, "(")?;
                for (i, arg) in argument_types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if let Some(name) = &arg.name {
                        write!(f, "{}: ", name)?;
                    }
                    write!(f, "{}", arg.ty)?;
                }
                write!(f, ") -> {}", return_type)
            }
        }
    }
}

/// Types of every declaration in the program, keyed by fully-qualified name
#[derive(Debug, Clone, Default)]
pub struct TypeContext {
    types: HashMap<FullyQualifiedName, SomelangType>,
}

impl TypeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fqn: FullyQualifiedName, ty: SomelangType) -> Option<SomelangType> {
        self.types.insert(fqn, ty)
    }

    pub fn lookup(&self, fqn: &FullyQualifiedName) -> Option<&SomelangType> {
        self.types.get(fqn)
    }

    /// Type of a declaration that analysis must have recorded
    pub fn require(&self, fqn: &FullyQualifiedName) -> Result<&SomelangType> {
        self.lookup(fqn).ok_or_else(|| Error::MissingType { fqn: fqn.to_string() })
    }

    /// Argument and return types of a function declaration
    pub fn function_type(&self, fqn: &FullyQualifiedName) -> Result<(&[ArgumentType], &SomelangType)> {
        match self.require(fqn)? {
            SomelangType::Function { argument_types, return_type } => {
                Ok((argument_types.as_slice(), return_type.as_ref()))
            }
            other => Err(Error::NotAFunction {
                fqn: fqn.to_string(),
                ty: other.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

//! JVM names and type descriptors

use std::fmt;

use crate::common::FullyQualifiedName;
use crate::types::SomelangType;
use crate::utils::{Error, Result};

pub const OBJECT_CLASS: &str = "java/lang/Object";
pub const STRING_CLASS: &str = "java/lang/String";

fn starts_uppercase(segment: &str) -> bool {
    segment.chars().next().map_or(false, char::is_uppercase)
}

/// Internal (slash-separated) class name for a fully-qualified name
///
/// A name whose final segment and owner's final segment both start with an
/// uppercase letter is a nested class: `a.Foo.Bar` becomes `a/Foo$Bar`.
pub fn internal_name(fqn: &FullyQualifiedName) -> String {
    let owner = fqn.qualifying_segment();
    if !owner.as_str().is_empty()
        && starts_uppercase(owner.final_segment())
        && starts_uppercase(fqn.final_segment())
    {
        format!("{}${}", internal_name(&owner), fqn.final_segment())
    } else {
        fqn.as_str().replace('.', "/")
    }
}

/// Outer class of a nested internal name
pub fn outer_class(internal: &str) -> Option<&str> {
    internal.rfind('$').map(|idx| &internal[..idx])
}

/// A JVM value type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JvmType {
    Int,
    Void,
    /// Reference to the class with this internal name
    Reference(String),
    /// Array of the element type
    Array(Box<JvmType>),
}

impl JvmType {
    pub fn string() -> Self {
        Self::Reference(STRING_CLASS.to_string())
    }

    pub fn object() -> Self {
        Self::Reference(OBJECT_CLASS.to_string())
    }

    pub fn reference(internal: impl Into<String>) -> Self {
        Self::Reference(internal.into())
    }

    pub fn from_somelang(ty: &SomelangType) -> Result<Self> {
        match ty {
            SomelangType::Int => Ok(Self::Int),
            SomelangType::Void => Ok(Self::Void),
            SomelangType::String => Ok(Self::string()),
            SomelangType::Object(fqn) => Ok(Self::Reference(internal_name(fqn))),
            SomelangType::Function { .. } => Err(Error::UnsupportedType { ty: ty.to_string() }),
        }
    }

    /// Operand stack slots taken by a value of this type
    pub fn size(&self) -> u16 {
        match self {
            Self::Void => 0,
            _ => 1,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_) | Self::Array(_))
    }

    pub fn descriptor(&self) -> String {
        match self {
            Self::Int => "I".to_string(),
            Self::Void => "V".to_string(),
            Self::Reference(name) => format!("L{};", name),
            Self::Array(element) => format!("[{}", element.descriptor()),
        }
    }
}

impl fmt::Display for JvmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor())
    }
}

/// Parameter and return types of a method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSig {
    pub params: Vec<JvmType>,
    pub ret: JvmType,
}

impl MethodSig {
    pub fn new(params: Vec<JvmType>, ret: JvmType) -> Self {
        Self { params, ret }
    }

    /// `()V`
    pub fn void() -> Self {
        Self::new(Vec::new(), JvmType::Void)
    }

    /// Signature of a somelang function type
    pub fn from_somelang(ty: &SomelangType) -> Result<Self> {
        match ty {
            SomelangType::Function { argument_types, return_type } => {
                let params = argument_types
                    .iter()
                    .map(|arg| JvmType::from_somelang(&arg.ty))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::new(params, JvmType::from_somelang(return_type)?))
            }
            other => Err(Error::UnsupportedType { ty: other.to_string() }),
        }
    }

    pub fn descriptor(&self) -> String {
        let params: String = self.params.iter().map(JvmType::descriptor).collect();
        format!("({}){}", params, self.ret.descriptor())
    }

    /// Local slots taken by the parameters
    pub fn param_slots(&self) -> u16 {
        self.params.iter().map(JvmType::size).sum()
    }
}

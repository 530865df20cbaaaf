//! Attributes written by name resolution and type analysis

use crate::common::{AttrDef, Attributable, FullyQualifiedName, NameResolved, Typechecked};
use crate::frontend::ast::AstNode;
use crate::types::SomelangType;
use crate::utils::Result;

/// Absolute name of whatever a declaration node declares
pub static DECLARATION_FQN: AttrDef<FullyQualifiedName> = AttrDef::new("declaration-fqn");

/// Absolute name of whatever a reference (call, constructor use, type name) points at
pub static REFERENT_FQN: AttrDef<FullyQualifiedName> = AttrDef::new("referent-fqn");

/// Static type of an expression
pub static EXPRESSION_TYPE: AttrDef<SomelangType> = AttrDef::new("expression-type");

/// Readers available once names are resolved
pub trait ResolvedAttrs {
    fn declaration_fqn(&self) -> Result<&FullyQualifiedName>;
    fn referent_fqn(&self) -> Result<&FullyQualifiedName>;
}

impl<N> ResolvedAttrs for N
where
    N: AstNode,
    N::Phase: NameResolved,
{
    fn declaration_fqn(&self) -> Result<&FullyQualifiedName> {
        self.require_attribute(&DECLARATION_FQN)
    }

    fn referent_fqn(&self) -> Result<&FullyQualifiedName> {
        self.require_attribute(&REFERENT_FQN)
    }
}

/// Readers available once types are known
pub trait TypedAttrs {
    fn expression_type(&self) -> Result<&SomelangType>;
}

impl<N> TypedAttrs for N
where
    N: AstNode,
    N::Phase: Typechecked,
{
    fn expression_type(&self) -> Result<&SomelangType> {
        self.require_attribute(&EXPRESSION_TYPE)
    }
}

/// Writers, usable at any phase
pub trait MiddleAttrsMut: Attributable + Sized {
    fn set_declaration_fqn(&mut self, fqn: FullyQualifiedName) {
        self.put_attribute(&DECLARATION_FQN, fqn);
    }

    fn with_declaration_fqn(self, fqn: FullyQualifiedName) -> Self {
        self.with_attribute(&DECLARATION_FQN, fqn)
    }

    fn set_referent_fqn(&mut self, fqn: FullyQualifiedName) {
        self.put_attribute(&REFERENT_FQN, fqn);
    }

    fn with_referent_fqn(self, fqn: FullyQualifiedName) -> Self {
        self.with_attribute(&REFERENT_FQN, fqn)
    }

    fn set_expression_type(&mut self, ty: SomelangType) {
        self.put_attribute(&EXPRESSION_TYPE, ty);
    }

    fn with_expression_type(self, ty: SomelangType) -> Self {
        self.with_attribute(&EXPRESSION_TYPE, ty)
    }
}

impl<N: Attributable> MiddleAttrsMut for N {}

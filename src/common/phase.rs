//! Compilation phase markers
//!
//! A tree tagged with phase `P` has been through every pass up to and
//! including `P`. The capability traits form a chain, so a node at
//! `Typechecking` is usable wherever a `NameResolved` node is expected:
//!
//! `Primordial ⊆ Lexing ⊆ Parsing ⊆ NameResolving ⊆ Typechecking`
//!
//! Accessors for attributes written by a pass are only implemented for
//! trees whose phase carries the matching capability.

use std::fmt::Debug;

/// Any phase marker
pub trait Phase: Debug + 'static {
    const NAME: &'static str;
}

/// The lexer has run: file-level metadata is present
pub trait Lexed: Phase {}

/// The parser has run: the tree shape is final
pub trait Parsed: Lexed {}

/// Declarations and references carry fully-qualified names
pub trait NameResolved: Parsed {}

/// Expressions carry types and the type context is complete
pub trait Typechecked: NameResolved {}

// Phase markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primordial;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexing;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parsing;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameResolving;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Typechecking;

impl Phase for Primordial {
    const NAME: &'static str = "primordial";
}

impl Phase for Lexing {
    const NAME: &'static str = "lexing";
}
impl Lexed for Lexing {}

impl Phase for Parsing {
    const NAME: &'static str = "parsing";
}
impl Lexed for Parsing {}
impl Parsed for Parsing {}

impl Phase for NameResolving {
    const NAME: &'static str = "name-resolving";
}
impl Lexed for NameResolving {}
impl Parsed for NameResolving {}
impl NameResolved for NameResolving {}

impl Phase for Typechecking {
    const NAME: &'static str = "typechecking";
}
impl Lexed for Typechecking {}
impl Parsed for Typechecking {}
impl NameResolved for Typechecking {}
impl Typechecked for Typechecking {}

/// The phase code generation requires
pub type CodegenPrereq = Typechecking;

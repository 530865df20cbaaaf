//! Shared compiler infrastructure: names, attributes, phases, scopes

pub mod attr;
pub mod name;
pub mod phase;
pub mod symbol_table;

pub use attr::{AttrDef, Attributable, Attributes};
pub use name::{FullyQualifiedName, Name, UnresolvedName};
pub use phase::{Lexed, NameResolved, Parsed, Phase, Typechecked};
pub use symbol_table::{ScopedFrames, SymbolTable};

//! Type representation shared by analysis and code generation

pub mod type_system;

pub use type_system::{ArgumentType, SomelangType, TypeContext};

//! Backend module - Code generation

pub mod codegen;

// Class files packaged as a jar
pub mod jvm;

// Textual LLVM IR
pub mod llvm;

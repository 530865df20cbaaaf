//! LLVM Backend
//!
//! Textual IR only; nothing links against LLVM itself.

mod llvm_codegen;

pub use llvm_codegen::LlvmCodeGen;

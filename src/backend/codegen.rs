//! Code generation trait - Backend abstraction
//!
//! Both backends consume the same type-checked program and produce one
//! in-memory artifact; nothing touches the file system until generation
//! has succeeded.

use log::debug;

use crate::common::phase::CodegenPrereq;
use crate::frontend::ast::{FileNode, FunctionDeclarationNode};
use crate::middle::attrs::ResolvedAttrs;
use crate::types::TypeContext;
use crate::utils::{Config, Error, Result};

/// Everything a backend needs from the earlier phases
pub struct CodegenInput<'a> {
    pub files: &'a [FileNode<CodegenPrereq>],
    pub types: &'a TypeContext,
    pub config: &'a Config,
}

/// A generated output file, still in memory
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Auxiliary files written next to the artifact
    pub extras: Vec<(String, Vec<u8>)>,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            extras: Vec::new(),
        }
    }
}

/// Code generation backend trait
pub trait CodeGen {
    /// Generate the artifact for a whole program
    fn generate(&mut self, input: &CodegenInput<'_>) -> Result<Artifact>;

    /// Get the backend name
    fn name(&self) -> &str;
}

/// The entry function and the file declaring it
pub struct EntryPoint<'a> {
    pub file: &'a FileNode<CodegenPrereq>,
    pub function: &'a FunctionDeclarationNode<CodegenPrereq>,
}

/// Find the single function named `symbol` across all files
///
/// No candidate is not an error; more than one is.
pub fn find_entry_point<'a>(files: &'a [FileNode<CodegenPrereq>], symbol: &str) -> Result<Option<EntryPoint<'a>>> {
    let mut candidates: Vec<EntryPoint<'a>> = files
        .iter()
        .flat_map(|file| {
            file.functions()
                .filter(|f| f.simple_name() == symbol)
                .map(move |function| EntryPoint { file, function })
        })
        .collect();

    match candidates.len() {
        0 => {
            debug!("no entry point named {}", symbol);
            Ok(None)
        }
        1 => Ok(candidates.pop()),
        _ => Err(Error::AmbiguousEntryPoint {
            symbol: symbol.to_string(),
            candidates: candidates
                .iter()
                .map(|c| match c.function.declaration_fqn() {
                    Ok(fqn) => fqn.to_string(),
                    Err(_) => c.function.simple_name().to_string(),
                })
                .collect(),
        }),
    }
}

//! Compiler configuration
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields a working configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::Result;

/// Which artifact the compiler produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Class files packaged into a runnable jar
    #[default]
    Jvm,
    /// Textual LLVM IR listing
    Llvm,
}

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub backend: Backend,
    /// Name of the designated entry function
    pub entry_symbol: String,
    /// Extension (without the dot) of the files to compile
    pub source_extension: String,
    /// Package prefix of every file and declaration name
    pub root_package: String,
    pub archive_name: String,
    pub listing_name: String,
    /// Class file major version
    pub class_version: u16,
    /// Also write the three-address code as JSON
    pub emit_tac: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Jvm,
            entry_symbol: "somelangMain".to_string(),
            source_extension: "som".to_string(),
            root_package: "somelang".to_string(),
            archive_name: "out.jar".to_string(),
            listing_name: "out.ll".to_string(),
            class_version: 52,
            emit_tac: false,
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// File name of the artifact for the selected backend
    pub fn artifact_name(&self) -> &str {
        match self.backend {
            Backend::Jvm => &self.archive_name,
            Backend::Llvm => &self.listing_name,
        }
    }
}

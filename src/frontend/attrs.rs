//! Attributes written by the frontend

use std::path::{Path, PathBuf};

use crate::common::{AttrDef, Attributable, Lexed};
use crate::frontend::ast::AstNode;
use crate::utils::Result;

/// Path of the source file a tree was read from
pub static FILE_PATH: AttrDef<PathBuf> = AttrDef::new("file-path");

/// Readers available once lexing has run
pub trait SourceAttrs {
    fn file_path(&self) -> Result<&Path>;
}

impl<N> SourceAttrs for N
where
    N: AstNode,
    N::Phase: Lexed,
{
    fn file_path(&self) -> Result<&Path> {
        self.require_attribute(&FILE_PATH).map(PathBuf::as_path)
    }
}

/// Writers, usable at any phase
pub trait SourceAttrsMut: Attributable + Sized {
    fn with_file_path(self, path: impl Into<PathBuf>) -> Self {
        self.with_attribute(&FILE_PATH, path.into())
    }
}

impl<N: Attributable> SourceAttrsMut for N {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::phase::Lexing;
    use crate::frontend::ast::FileNode;
    use crate::frontend::dsl;

    #[test]
    fn test_file_path_roundtrip() {
        let file: FileNode<Lexing> = dsl::file(vec![]).with_file_path("src/Main.som");
        assert_eq!(file.file_path().unwrap(), Path::new("src/Main.som"));
    }

    #[test]
    fn test_missing_file_path() {
        let file: FileNode<Lexing> = dsl::file(vec![]);
        assert!(file.file_path().is_err());
    }
}

//! The compilation pipeline
//!
//! Reads every source file of a directory, runs the frontend and middle
//! passes over them as one program, and hands the result to the configured
//! backend. The artifact is written only once generation has succeeded.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::backend::codegen::{CodeGen, CodegenInput};
use crate::backend::jvm::JvmCodeGen;
use crate::backend::llvm::LlvmCodeGen;
use crate::common::phase::Typechecking;
use crate::common::FullyQualifiedName;
use crate::frontend::ast::FileNode;
use crate::frontend::parser::parse_file;
use crate::middle::resolve::resolve_names;
use crate::middle::type_analysis::analyze_types;
use crate::types::TypeContext;
use crate::utils::{Backend, Config, Result};

/// A type-checked program
pub struct Program {
    pub files: Vec<FileNode<Typechecking>>,
    pub types: TypeContext,
}

pub struct Compiler {
    config: Config,
}

impl Compiler {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Source files directly inside `dir`, in sorted order
    pub fn collect_sources(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut sources = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let matches = path
                .extension()
                .map_or(false, |ext| ext == self.config.source_extension.as_str());
            if path.is_file() && matches {
                sources.push(path);
            }
        }
        sources.sort();
        Ok(sources)
    }

    /// Parse, resolve and type a set of (path, text) sources
    pub fn analyze(&self, sources: &[(PathBuf, String)]) -> Result<Program> {
        let parsed = sources
            .iter()
            .enumerate()
            .map(|(file_id, (path, text))| {
                debug!("parsing {}", path.display());
                parse_file(text, path, file_id).map_err(|err| {
                    if let Some(span) = err.span() {
                        let (line, col) = span.line_col(text);
                        error!("{}:{}:{}: {}", path.display(), line, col, err);
                    }
                    err
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let root = FullyQualifiedName::new(self.config.root_package.as_str());
        let resolved = resolve_names(parsed, &root)?;
        let (files, types) = analyze_types(resolved)?;
        debug!("{} declarations typed", types.len());
        Ok(Program { files, types })
    }

    pub fn backend(&self) -> Box<dyn CodeGen> {
        let artifact = self.config.artifact_name();
        match self.config.backend {
            Backend::Jvm => Box::new(JvmCodeGen::new(self.config.class_version, artifact)),
            Backend::Llvm => Box::new(LlvmCodeGen::new(artifact, self.config.emit_tac)),
        }
    }

    /// Compile every source in `input_dir`; returns the artifact's path
    pub fn compile_dir(&self, input_dir: &Path, output_dir: &Path) -> Result<PathBuf> {
        let paths = self.collect_sources(input_dir)?;
        info!("compiling {} source file(s) from {}", paths.len(), input_dir.display());

        let sources = paths
            .into_iter()
            .map(|path| {
                let text = fs::read_to_string(&path)?;
                Ok((path, text))
            })
            .collect::<Result<Vec<_>>>()?;
        let program = self.analyze(&sources)?;

        let mut backend = self.backend();
        let input = CodegenInput {
            files: &program.files,
            types: &program.types,
            config: &self.config,
        };
        let artifact = backend.generate(&input)?;

        fs::create_dir_all(output_dir)?;
        let out_path = output_dir.join(&artifact.file_name);
        fs::write(&out_path, &artifact.bytes)?;
        for (name, bytes) in &artifact.extras {
            fs::write(output_dir.join(name), bytes)?;
        }
        info!("{} backend wrote {}", backend.name(), out_path.display());
        Ok(out_path)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::process::Command;

    /// Type-check in-memory sources with the default configuration
    pub(crate) fn analyze(sources: &[(&str, &str)]) -> Result<Program> {
        let sources: Vec<_> = sources
            .iter()
            .map(|(path, text)| (PathBuf::from(path), text.to_string()))
            .collect();
        Compiler::new(Config::default()).analyze(&sources)
    }

    fn write_sources(dir: &Path, sources: &[(&str, &str)]) {
        for (name, text) in sources {
            fs::write(dir.join(name), text).unwrap();
        }
    }

    fn java_available() -> bool {
        Command::new("java").arg("-version").output().is_ok()
    }

    /// Compile with the JVM backend and run the jar; `None` without a JVM
    fn run_jar(sources: &[(&str, &str)]) -> Option<String> {
        if !java_available() {
            eprintln!("java not found; skipping");
            return None;
        }
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_sources(input.path(), sources);

        let jar = Compiler::new(Config::default())
            .compile_dir(input.path(), output.path())
            .unwrap();
        let run = Command::new("java").arg("-jar").arg(&jar).output().unwrap();
        assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));
        Some(String::from_utf8(run.stdout).unwrap())
    }

    #[test]
    fn test_collect_sources_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path(), &[("b.som", ""), ("a.som", ""), ("notes.txt", "")]);
        let sources = Compiler::new(Config::default()).collect_sources(dir.path()).unwrap();
        let names: Vec<_> = sources
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.som", "b.som"]);
    }

    #[test]
    fn test_compile_dir_writes_jar() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_sources(input.path(), &[("Main.som", "fun somelangMain(): Int { return 123 }")]);

        let jar = Compiler::new(Config::default())
            .compile_dir(input.path(), output.path())
            .unwrap();
        assert_eq!(jar, output.path().join("out.jar"));
        assert!(jar.exists());
    }

    #[test]
    fn test_ambiguous_entry_point_writes_nothing() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_sources(
            input.path(),
            &[
                ("A.som", "fun somelangMain() { return 1 }"),
                ("B.som", "fun somelangMain() { return 2 }"),
            ],
        );

        let err = Compiler::new(Config::default())
            .compile_dir(input.path(), output.path())
            .unwrap_err();
        assert!(matches!(err, crate::utils::Error::AmbiguousEntryPoint { .. }));
        assert!(!output.path().join("out.jar").exists());
    }

    #[test]
    fn test_class_name_clash_writes_nothing() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_sources(input.path(), &[("Foo.som", "data Foo = Bar\nfun somelangMain(): Foo { return Bar }")]);

        let err = Compiler::new(Config::default())
            .compile_dir(input.path(), output.path())
            .unwrap_err();
        assert!(matches!(err, crate::utils::Error::DuplicateClass { ref name } if name == "somelang/Foo"));
        assert!(!output.path().join("out.jar").exists());
    }

    #[test]
    fn test_llvm_backend_writes_listing_and_tac() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_sources(input.path(), &[("Main.som", "fun somelangMain() { let a = 1; return a + 2 }")]);

        let config = Config {
            backend: Backend::Llvm,
            emit_tac: true,
            ..Config::default()
        };
        let listing = Compiler::new(config).compile_dir(input.path(), output.path()).unwrap();
        let text = fs::read_to_string(&listing).unwrap();
        assert!(text.contains("define i32 @somelangMain()"));
        assert!(output.path().join("out.ll.tac.json").exists());
    }

    #[test]
    fn test_run_returns_int() {
        if let Some(out) = run_jar(&[("Main.som", "fun somelangMain(): Int { return 123 }")]) {
            assert_eq!(out.trim_end(), "123");
        }
    }

    #[test]
    fn test_run_arithmetic() {
        let source = "fun somelangMain(): Int {\n  let a = 123\n  let b = 456\n  let c = 789\n  return a + (b + c)\n}";
        if let Some(out) = run_jar(&[("Main.som", source)]) {
            assert_eq!(out.trim_end(), "1368");
        }
    }

    #[test]
    fn test_run_cross_file_call() {
        let sources = [
            ("Main.som", "fun somelangMain(): String { return echo(\"abc\") }"),
            ("Util.som", "fun echo(s: String): String { return s }"),
        ];
        if let Some(out) = run_jar(&sources) {
            assert_eq!(out.trim_end(), "abc");
        }
    }

    #[test]
    fn test_run_prints_constructor_name() {
        let sources = [
            ("Types.som", "data Foo = Bar | Baz(Int)"),
            ("Main.som", "fun somelangMain(): Foo { return Bar }"),
        ];
        if let Some(out) = run_jar(&sources) {
            assert_eq!(out.trim_end(), "Bar");
        }
    }

    #[test]
    fn test_run_void_entry_prints_nothing() {
        if let Some(out) = run_jar(&[("Main.som", "fun somelangMain() { let a = 1 }")]) {
            assert_eq!(out, "");
        }
    }
}

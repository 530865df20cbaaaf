//! somelang Compiler
//!
//! Compiles a directory of somelang sources into a runnable jar or an LLVM
//! IR listing.

mod backend;
mod common;
mod compiler;
mod frontend;
mod middle;
mod types;
mod utils;

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use log::info;

use compiler::Compiler;
use utils::{Backend, Config, Error, ErrorCategory};

/// somelang Compiler
#[derive(Parser, Debug)]
#[command(name = "somelangc")]
#[command(version)]
#[command(about = "Compile a directory of somelang sources")]
struct Cli {
    /// Directory holding the source files
    #[arg(value_name = "INPUT_DIR")]
    input: PathBuf,

    /// Directory receiving the artifact
    #[arg(value_name = "OUTPUT_DIR")]
    output: PathBuf,

    /// Backend to use (overrides the configuration file)
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Name of the entry function
    #[arg(long, value_name = "SYMBOL")]
    entry: Option<String>,

    /// Also write the three-address code as JSON (LLVM backend)
    #[arg(long)]
    emit_tac: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if let Err(err) = run(&cli) {
        let category = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<Error>())
            .map_or(ErrorCategory::Internal, Error::category);
        eprintln!("error[{}]: {:#}", category, err);
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("reading configuration {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(entry) = &cli.entry {
        config.entry_symbol = entry.clone();
    }
    if cli.emit_tac {
        config.emit_tac = true;
    }
    Ok(config)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let compiler = Compiler::new(config);
    info!(
        "backend {:?}, entry symbol {}",
        compiler.config().backend,
        compiler.config().entry_symbol
    );

    let artifact = compiler
        .compile_dir(&cli.input, &cli.output)
        .with_context(|| format!("compiling {}", cli.input.display()))?;
    println!("{}", artifact.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_cli_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "backend": "jvm", "entry-symbol": "start", "listing-name": "a.ll" }}"#).unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let cli = Cli::parse_from(["somelangc", "in", "out", "--config", path.as_str(), "--backend", "llvm", "--emit-tac"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.backend, Backend::Llvm);
        assert_eq!(config.entry_symbol, "start");
        assert_eq!(config.listing_name, "a.ll");
        assert!(config.emit_tac);
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = Cli::parse_from(["somelangc", "in", "out"]);
        assert_eq!(load_config(&cli).unwrap(), Config::default());
        assert_eq!(cli.input, PathBuf::from("in"));
    }

    #[test]
    fn test_error_category_survives_context() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("A.som"), "fun somelangMain(): Int { return 1 }").unwrap();
        std::fs::write(dir.path().join("B.som"), "fun somelangMain(): Int { return 2 }").unwrap();
        let out = tempfile::tempdir().unwrap();

        let cli = Cli::parse_from([
            "somelangc",
            dir.path().to_str().unwrap(),
            out.path().to_str().unwrap(),
        ]);
        let err = run(&cli).unwrap_err();
        let inner = err.downcast_ref::<Error>().unwrap();
        assert_eq!(inner.category(), ErrorCategory::Policy);
    }
}

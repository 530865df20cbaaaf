//! LLVM Code Generator
//!
//! Renders three-address code as textual LLVM IR. Every value is an `i32`;
//! each function is one basic block, and every returned value is printed
//! with `printf` before the `ret`.

use std::collections::HashSet;
use std::fmt::Write;

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::backend::codegen::{find_entry_point, Artifact, CodeGen, CodegenInput};
use crate::middle::tac::*;
use crate::middle::tac_gen::lower_function;
use crate::middle::tac_printer::TacPrinter;
use crate::utils::{Error, Result};

const BACKEND: &str = "llvm";
const RESULT_FORMAT: &str = "Result: %d\n";
const RESULT_FORMAT_GLOBAL: &str = "@.result_fmt";
const RESERVED_MAIN: &str = "main";

/// Indented labels with nothing else on the line
static BARE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+[a-z]+:$").expect("label regex should compile"));

/// Textual LLVM IR generator
pub struct LlvmCodeGen {
    listing_name: String,
    emit_tac: bool,
    output: String,
    indent: usize,
    /// Counter for `%llvmN` load results, per function
    load_counter: usize,
}

impl LlvmCodeGen {
    pub fn new(listing_name: &str, emit_tac: bool) -> Self {
        Self {
            listing_name: listing_name.to_string(),
            emit_tac,
            output: String::new(),
            indent: 0,
            load_counter: 0,
        }
    }

    fn fresh_load(&mut self) -> String {
        let name = format!("%llvm{}", self.load_counter);
        self.load_counter += 1;
        name
    }

    /// Write indented line
    fn writeln(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn declare_builtins(&mut self) {
        self.writeln("declare i32 @printf(ptr, ...)");
        self.writeln("");
        let (len, text) = string_constant(RESULT_FORMAT);
        self.writeln(&format!(
            "{} = private unnamed_addr constant [{} x i8] c\"{}\"",
            RESULT_FORMAT_GLOBAL, len, text
        ));
    }

    /// The operand text for `value`; named locals are loaded first
    fn operand(&mut self, value: &ValueReference) -> String {
        match value {
            ValueReference::Immediate(n) => n.to_string(),
            ValueReference::TempVar(var) => format!("%{}", var),
            ValueReference::LocalVar(var) => {
                let loaded = self.fresh_load();
                self.writeln(&format!("{} = load i32, ptr %{}", loaded, var));
                loaded
            }
        }
    }

    fn generate_function(&mut self, function: &TacFunction) -> Result<()> {
        if !matches!(function.block.instructions.last(), Some(TacInstruction::Return { .. })) {
            return Err(Error::MissingReturn {
                function: function.name.clone(),
            });
        }

        self.load_counter = 0;
        self.writeln("");
        self.writeln(&format!("define i32 @{}() {{", function.name));
        self.indent += 1;
        self.writeln("entry:");
        for instruction in &function.block.instructions {
            self.generate_instruction(instruction);
        }
        self.indent -= 1;
        self.writeln("}");
        Ok(())
    }

    fn generate_instruction(&mut self, instruction: &TacInstruction) {
        match instruction {
            TacInstruction::Define { defines, rhs } => {
                let value = self.operand(rhs);
                self.writeln(&format!("%{} = alloca i32", defines));
                self.writeln(&format!("store i32 {}, ptr %{}", value, defines));
            }
            TacInstruction::BinOp { defines, lhs, op, rhs } => {
                let lhs = self.operand(lhs);
                let rhs = self.operand(rhs);
                let opcode = match op {
                    Op::IntAdd => "add",
                };
                self.writeln(&format!("%{} = {} i32 {}, {}", defines, opcode, lhs, rhs));
            }
            TacInstruction::Return { value } => {
                let value = self.operand(value);
                self.writeln(&format!(
                    "call i32 (ptr, ...) @printf(ptr {}, i32 {})",
                    RESULT_FORMAT_GLOBAL, value
                ));
                self.writeln(&format!("ret i32 {}", value));
            }
        }
    }

    /// `define i32 @main()` calling the entry function and exiting with 0
    fn generate_entry_wrapper(&mut self, entry: &str) {
        self.writeln("");
        self.writeln("define i32 @main() {");
        self.indent += 1;
        self.writeln("entry:");
        self.writeln(&format!("call i32 @{}()", entry));
        self.writeln("ret i32 0");
        self.indent -= 1;
        self.writeln("}");
    }

    /// Render a whole module; `entry` names the function `main` should call
    pub fn generate_source(&mut self, functions: &[TacFunction], entry: Option<&str>) -> Result<String> {
        self.output.clear();
        self.indent = 0;
        self.declare_builtins();
        for function in functions {
            self.generate_function(function)?;
        }
        if let Some(entry) = entry {
            self.generate_entry_wrapper(entry);
        }
        Ok(strip_bare_labels(&self.output))
    }
}

/// Drop label-only lines; every function is a single block
fn strip_bare_labels(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines().filter(|line| !BARE_LABEL.is_match(line)) {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Byte length (with the terminating NUL) and escaped body of a C string
fn string_constant(text: &str) -> (usize, String) {
    let mut escaped = String::new();
    for byte in text.bytes() {
        if matches!(byte, b' '..=b'~') && byte != b'"' && byte != b'\\' {
            escaped.push(byte as char);
        } else {
            let _ = write!(escaped, "\\{:02X}", byte);
        }
    }
    escaped.push_str("\\00");
    (text.len() + 1, escaped)
}

impl CodeGen for LlvmCodeGen {
    fn generate(&mut self, input: &CodegenInput<'_>) -> Result<Artifact> {
        let entry = find_entry_point(input.files, &input.config.entry_symbol)?;

        let mut seen = HashSet::new();
        let mut functions = Vec::new();
        for decl in input.files.iter().flat_map(|file| file.functions()) {
            let name = decl.simple_name();
            if name == RESERVED_MAIN {
                return Err(Error::ReservedName { name: name.to_string() });
            }
            if !decl.parameters.is_empty() {
                return Err(Error::UnsupportedNode {
                    backend: BACKEND,
                    node: format!("function {} with parameters", name),
                });
            }
            if !seen.insert(name.to_string()) {
                return Err(Error::CodeGen(format!("function {} is defined more than once", name)));
            }
            functions.push(lower_function(decl)?);
        }
        debug!("three-address code:\n{}", TacPrinter::new().print_functions(&functions));

        let entry_name = entry.map(|e| e.function.simple_name().to_string());
        if let Some(name) = &entry_name {
            info!("entry point: {}", name);
        }
        let source = self.generate_source(&functions, entry_name.as_deref())?;

        let mut artifact = Artifact::new(self.listing_name.as_str(), source.into_bytes());
        if self.emit_tac {
            let dump = serde_json::to_vec_pretty(&functions)?;
            artifact.extras.push((format!("{}.tac.json", self.listing_name), dump));
        }
        Ok(artifact)
    }

    fn name(&self) -> &str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::tests::analyze;
    use crate::utils::Config;
    use pretty_assertions::assert_eq;

    fn var(name: &str) -> Variable {
        Variable(name.to_string())
    }

    fn compile_to_ir(source: &str) -> Result<String> {
        let program = analyze(&[("Main.som", source)])?;
        let config = Config::default();
        let input = CodegenInput {
            files: &program.files,
            types: &program.types,
            config: &config,
        };
        let artifact = LlvmCodeGen::new("out.ll", false).generate(&input)?;
        Ok(String::from_utf8(artifact.bytes).unwrap())
    }

    #[test]
    fn test_string_constant() {
        assert_eq!(string_constant(RESULT_FORMAT), (12, "Result: %d\\0A\\00".to_string()));
        assert_eq!(string_constant("a\"b"), (4, "a\\22b\\00".to_string()));
    }

    #[test]
    fn test_strip_bare_labels() {
        let text = "define i32 @f() {\n  entry:\n  ret i32 0\n}\nx:\n";
        assert_eq!(strip_bare_labels(text), "define i32 @f() {\n  ret i32 0\n}\nx:\n");
    }

    #[test]
    fn test_return_constant() {
        let functions = vec![TacFunction {
            name: "answer".to_string(),
            block: TacBlock {
                instructions: vec![TacInstruction::Return {
                    value: ValueReference::Immediate(42),
                }],
            },
        }];
        let source = LlvmCodeGen::new("out.ll", false)
            .generate_source(&functions, None)
            .unwrap();
        assert_eq!(
            source,
            "declare i32 @printf(ptr, ...)\n\
             \n\
             @.result_fmt = private unnamed_addr constant [12 x i8] c\"Result: %d\\0A\\00\"\n\
             \n\
             define i32 @answer() {\n\
             \x20 call i32 (ptr, ...) @printf(ptr @.result_fmt, i32 42)\n\
             \x20 ret i32 42\n\
             }\n"
        );
    }

    #[test]
    fn test_locals_are_loaded_on_read() {
        let functions = vec![TacFunction {
            name: "f".to_string(),
            block: TacBlock {
                instructions: vec![
                    TacInstruction::Define {
                        defines: var("a_tac0"),
                        rhs: ValueReference::Immediate(1),
                    },
                    TacInstruction::BinOp {
                        defines: var("tac1"),
                        lhs: ValueReference::LocalVar(var("a_tac0")),
                        op: Op::IntAdd,
                        rhs: ValueReference::LocalVar(var("a_tac0")),
                    },
                    TacInstruction::Return {
                        value: ValueReference::TempVar(var("tac1")),
                    },
                ],
            },
        }];
        let source = LlvmCodeGen::new("out.ll", false)
            .generate_source(&functions, Some("f"))
            .unwrap();
        let body: Vec<_> = source.lines().skip(4).collect();
        assert_eq!(
            body,
            vec![
                "define i32 @f() {",
                "  %a_tac0 = alloca i32",
                "  store i32 1, ptr %a_tac0",
                "  %llvm0 = load i32, ptr %a_tac0",
                "  %llvm1 = load i32, ptr %a_tac0",
                "  %tac1 = add i32 %llvm0, %llvm1",
                "  call i32 (ptr, ...) @printf(ptr @.result_fmt, i32 %tac1)",
                "  ret i32 %tac1",
                "}",
                "",
                "define i32 @main() {",
                "  call i32 @f()",
                "  ret i32 0",
                "}",
            ]
        );
    }

    #[test]
    fn test_binary_expression() {
        let source = compile_to_ir("fun somelangMain(): Int { let a = 123\n let b = 456\n return a + b }").unwrap();
        assert!(source.contains("define i32 @somelangMain() {"));
        assert!(source.contains("  %tac2 = add i32 %llvm0, %llvm1\n"));
        assert!(source.contains("define i32 @main() {\n  call i32 @somelangMain()\n  ret i32 0\n}"));
        assert!(!source.contains("entry:"));
    }

    #[test]
    fn test_no_entry_point_means_no_main() {
        let source = compile_to_ir("fun helper(): Int { return 1 }").unwrap();
        assert!(source.contains("define i32 @helper()"));
        assert!(!source.contains("@main"));
    }

    #[test]
    fn test_main_is_reserved() {
        let err = compile_to_ir("fun main(): Int { return 1 }").unwrap_err();
        assert!(matches!(err, Error::ReservedName { ref name } if name == "main"));
    }

    #[test]
    fn test_parameters_are_unsupported() {
        let err = compile_to_ir("fun id(x: Int): Int { return x }").unwrap_err();
        assert!(matches!(err, Error::UnsupportedNode { backend: "llvm", .. }));
    }

    #[test]
    fn test_missing_return() {
        let err = compile_to_ir("fun somelangMain() { let a = 1 }").unwrap_err();
        assert!(matches!(err, Error::MissingReturn { .. }));
    }

    #[test]
    fn test_tac_dump_is_an_extra() {
        let program = analyze(&[("Main.som", "fun somelangMain(): Int { return 7 }")]).unwrap();
        let config = Config::default();
        let input = CodegenInput {
            files: &program.files,
            types: &program.types,
            config: &config,
        };
        let mut codegen = LlvmCodeGen::new("prog.ll", true);
        let artifact = codegen.generate(&input).unwrap();
        assert_eq!(codegen.name(), "llvm");
        assert_eq!(artifact.file_name, "prog.ll");
        assert_eq!(artifact.extras.len(), 1);
        assert_eq!(artifact.extras[0].0, "prog.ll.tac.json");

        let dump: serde_json::Value = serde_json::from_slice(&artifact.extras[0].1).unwrap();
        assert_eq!(dump[0]["name"], "somelangMain");
        assert_eq!(dump[0]["block"]["instructions"][0]["Return"]["value"]["Immediate"], 7);
    }
}

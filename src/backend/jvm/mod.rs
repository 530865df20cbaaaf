//! JVM backend
//!
//! Compiles a type-checked program to class files and packs them into one
//! runnable jar.

mod classfile;
mod context;
mod data_decl;
mod descriptor;
mod function_decl;
mod jar;
mod method;
mod node_gen;
mod opcodes;

use std::collections::HashSet;

use log::info;

use crate::backend::codegen::{find_entry_point, Artifact, CodeGen, CodegenInput};
use crate::common::FullyQualifiedName;
use crate::frontend::ast::Node;
use crate::middle::attrs::ResolvedAttrs;
use crate::types::TypeContext;
use crate::utils::{Error, Result};

pub use classfile::ClassFile;
use context::CompilationContext;
use jar::build_jar;

/// JVM class file generator
pub struct JvmCodeGen {
    class_version: u16,
    archive_name: String,
}

impl JvmCodeGen {
    pub fn new(class_version: u16, archive_name: impl Into<String>) -> Self {
        Self {
            class_version,
            archive_name: archive_name.into(),
        }
    }

    /// Generate every class of the program, without packaging
    pub fn generate_units(
        &self,
        input: &CodegenInput<'_>,
        entry: Option<&FullyQualifiedName>,
    ) -> Result<Vec<ClassFile>> {
        let mut ctx = CompilationContext::new(input.types);
        plan_constructors(&mut ctx, input)?;

        for file in input.files {
            for node in &file.nodes {
                if let Node::DataDeclaration(data) = node {
                    data_decl::generate_data_declaration(&mut ctx, data)?;
                }
            }
            function_decl::generate_file(&mut ctx, file, entry)?;
        }

        if !ctx.symbols.is_empty() {
            return Err(Error::UnbalancedSymbolTable { depth: ctx.symbols.depth() });
        }
        check_unique_names(&ctx.units)?;
        Ok(ctx.units)
    }
}

/// Two units with one internal name would overwrite each other in the jar
fn check_unique_names(units: &[ClassFile]) -> Result<()> {
    let mut seen = HashSet::new();
    for unit in units {
        if !seen.insert(unit.name.as_str()) {
            return Err(Error::DuplicateClass { name: unit.name.clone() });
        }
    }
    Ok(())
}

/// Record the arity of every value constructor before any code is generated
fn plan_constructors(ctx: &mut CompilationContext<'_>, input: &CodegenInput<'_>) -> Result<()> {
    let types: &TypeContext = input.types;
    for file in input.files {
        for data in file.data_declarations() {
            for ctor in &data.value_constructors {
                let fqn = ctor.declaration_fqn()?;
                let (arguments, _) = types.function_type(fqn)?;
                ctx.constructor_arity.insert(fqn.clone(), arguments.len());
            }
        }
    }
    Ok(())
}

impl CodeGen for JvmCodeGen {
    fn generate(&mut self, input: &CodegenInput<'_>) -> Result<Artifact> {
        let entry = find_entry_point(input.files, &input.config.entry_symbol)?;
        let entry_fqn = entry
            .as_ref()
            .map(|e| e.function.declaration_fqn().cloned())
            .transpose()?;
        let main_class = entry
            .as_ref()
            .map(|e| e.file.declaration_fqn().map(ToString::to_string))
            .transpose()?;

        let units = self.generate_units(input, entry_fqn.as_ref())?;
        info!("generated {} classes", units.len());

        let bytes = build_jar(&units, main_class.as_deref(), self.class_version)?;
        Ok(Artifact::new(self.archive_name.as_str(), bytes))
    }

    fn name(&self) -> &str {
        "jvm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::jvm::classfile::{FieldRef, MethodRef};
    use crate::backend::jvm::descriptor::{JvmType, MethodSig};
    use crate::backend::jvm::method::Instruction;
    use crate::compiler::tests::analyze;
    use crate::common::phase::CodegenPrereq;
    use crate::common::Name;
    use crate::compiler::Program;
    use crate::frontend::ast::FileNode;
    use crate::utils::{Config, ErrorCategory};
    use pretty_assertions::assert_eq;

    fn units_for(sources: &[(&str, &str)]) -> Result<Vec<ClassFile>> {
        let Program { files, types } = analyze(sources)?;
        generate(&files, &types)
    }

    fn generate(files: &[FileNode<CodegenPrereq>], types: &TypeContext) -> Result<Vec<ClassFile>> {
        let config = Config::default();
        let input = CodegenInput {
            files,
            types,
            config: &config,
        };
        let entry = find_entry_point(files, &config.entry_symbol)?;
        let entry_fqn = entry.map(|e| e.function.declaration_fqn().cloned()).transpose()?;
        JvmCodeGen::new(52, "out.jar").generate_units(&input, entry_fqn.as_ref())
    }

    fn method_code(units: &[ClassFile], class: &str, method: &str) -> Vec<Instruction> {
        let unit = units.iter().find(|u| u.name == class).unwrap();
        unit.method(method).unwrap().code.instructions.clone()
    }

    #[test]
    fn test_constructor_invocations() {
        let units = units_for(&[(
            "Main.som",
            "data Foo = Bar | Baz(Int)\nfun shared(): Foo { return Bar }\nfun fresh(): Foo { return Baz() }",
        )])
        .unwrap();

        let bar = "somelang/Foo$Bar";
        assert_eq!(
            method_code(&units, "somelang/Main", "shared"),
            vec![
                Instruction::GetStatic(FieldRef::new(bar, "INSTANCE", JvmType::reference(bar))),
                Instruction::AReturn,
            ]
        );

        let baz = "somelang/Foo$Baz";
        assert_eq!(
            method_code(&units, "somelang/Main", "fresh"),
            vec![
                Instruction::New(baz.to_string()),
                Instruction::Dup,
                Instruction::InvokeSpecial(MethodRef::new(baz, "<init>", MethodSig::void())),
                Instruction::AReturn,
            ]
        );
    }

    #[test]
    fn test_locals_and_addition() {
        let units = units_for(&[("Main.som", "fun f(x: Int): Int { let a = 1; return x + a }")]).unwrap();
        assert_eq!(
            method_code(&units, "somelang/Main", "f"),
            vec![
                Instruction::PushInt(1),
                Instruction::IStore(1),
                Instruction::ILoad(0),
                Instruction::ILoad(1),
                Instruction::IAdd,
                Instruction::IReturn,
            ]
        );
    }

    #[test]
    fn test_call_passes_arguments_in_order() {
        let units = units_for(&[(
            "Main.som",
            "fun pick(a: Int, s: String): String { return s }\nfun g(): String { return pick(1, \"x\") }",
        )])
        .unwrap();
        let code = method_code(&units, "somelang/Main", "g");
        assert_eq!(code[0], Instruction::PushInt(1));
        assert_eq!(code[1], Instruction::PushString("x".to_string()));
        assert!(matches!(&code[2], Instruction::InvokeStatic(m)
            if m.owner == "somelang/Main" && m.name == "pick" && m.sig.descriptor() == "(ILjava/lang/String;)Ljava/lang/String;"));
    }

    #[test]
    fn test_entry_wrapper() {
        let units = units_for(&[("Main.som", "fun somelangMain(): Int { return 123 }")]).unwrap();
        let main = method_code(&units, "somelang/Main", "main");
        assert!(matches!(&main[0], Instruction::InvokeStatic(m) if m.name == "somelangMain"));
        assert_eq!(main[1], Instruction::IStore(1));
        assert!(matches!(&main[2], Instruction::GetStatic(f) if f.owner == "java/lang/System" && f.name == "out"));
        assert_eq!(main[3], Instruction::ILoad(1));
        assert!(matches!(&main[4], Instruction::InvokeStatic(m) if m.owner == "java/lang/Integer"));
        assert!(matches!(&main[5], Instruction::InvokeVirtual(m) if m.name == "println"));
        assert_eq!(main[6], Instruction::Return);
    }

    #[test]
    fn test_no_entry_no_main() {
        let units = units_for(&[("Main.som", "fun helper(): Int { return 1 }")]).unwrap();
        assert!(units[0].method("main").is_none());
    }

    #[test]
    fn test_block_scoping() {
        // Visible in a nested block.
        units_for(&[("Main.som", "fun f(): Int { let a = 1; { { return a } } }")]).unwrap();

        // Invisible after the block closes.
        let err = units_for(&[("Main.som", "fun f(): Int { { let b = 1 } return b }")]).unwrap_err();
        assert!(matches!(err, Error::UnboundLocal { ref name } if name == "b"));
    }

    #[test]
    fn test_statement_after_return() {
        let err = units_for(&[("Main.som", "fun f(): Int { return 1; let a = 2 }")]).unwrap_err();
        assert!(matches!(err, Error::StatementAfterReturn { ref function } if function == "somelang.Main.f"));
    }

    #[test]
    fn test_expression_statement_value_is_dropped() {
        let units = units_for(&[("Main.som", "fun one(): Int { return 1 }\nfun f() { one() }")]).unwrap();
        let code = method_code(&units, "somelang/Main", "f");
        assert_eq!(code[1], Instruction::Pop);
        assert_eq!(code[2], Instruction::Return);
    }

    #[test]
    fn test_qualified_local_reference_uses_source_name() {
        let Program { mut files, types } =
            analyze(&[("Main.som", "fun f(x: Int): Int { let a = 1; return a }")]).unwrap();
        let Node::FunctionDeclaration(decl) = &mut files[0].nodes[0] else { panic!("expected function") };
        let Node::Block(body) = decl.body.as_mut() else { panic!("expected block") };
        let Node::Return(ret) = &mut body.statements[1] else { panic!("expected return") };
        let qualified = Name::Qualified(FullyQualifiedName::new("somelang.Main.f.a"));
        match ret.value.as_mut() {
            Node::ReadLocalVar(read) => read.target.name = qualified,
            Node::Identifier(ident) => ident.name = qualified,
            _ => panic!("expected a local reference"),
        }

        let units = generate(&files, &types).unwrap();
        assert_eq!(
            method_code(&units, "somelang/Main", "f"),
            vec![
                Instruction::PushInt(1),
                Instruction::IStore(1),
                Instruction::ILoad(1),
                Instruction::IReturn,
            ]
        );
    }

    #[test]
    fn test_file_and_type_sharing_a_name() {
        let err = units_for(&[("Foo.som", "data Foo = Bar\nfun somelangMain(): Foo { return Bar }")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateClass { ref name } if name == "somelang/Foo"));
        assert_eq!(err.category(), ErrorCategory::Policy);

        // Distinct names are fine.
        units_for(&[("Main.som", "data Foo = Bar\nfun somelangMain(): Foo { return Bar }")]).unwrap();
    }

    #[test]
    fn test_file_class_records_source_file() {
        let units = units_for(&[("src/Main.som", "fun f(): Int { return 1 }")]).unwrap();
        assert_eq!(units[0].source_file.as_deref(), Some("Main.som"));
    }
}

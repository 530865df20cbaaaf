//! Classes for source files and their functions
//!
//! Every function of a file becomes a `public static` method on the file's
//! class. The file holding the entry function also gets a
//! `public static void main(String[])` that calls it and prints the result.

use log::{debug, info};

use crate::backend::jvm::classfile::{ClassFile, FieldRef, MethodInfo, MethodRef};
use crate::backend::jvm::context::{CompilationContext, LocalSlot};
use crate::backend::jvm::descriptor::{internal_name, JvmType, MethodSig, OBJECT_CLASS};
use crate::backend::jvm::method::MethodBuilder;
use crate::backend::jvm::node_gen::generate_node;
use crate::backend::jvm::opcodes::access::*;
use crate::common::phase::CodegenPrereq;
use crate::common::{Attributable, FullyQualifiedName, ScopedFrames};
use crate::frontend::ast::{FileNode, FunctionDeclarationNode, Node};
use crate::frontend::attrs::SourceAttrs;
use crate::middle::attrs::ResolvedAttrs;
use crate::utils::{Error, Result};

const PRINT_STREAM: &str = "java/io/PrintStream";
const SYSTEM: &str = "java/lang/System";
const INTEGER: &str = "java/lang/Integer";

/// Emit the class for one file; `entry` names the function `main` should call
pub fn generate_file(
    ctx: &mut CompilationContext<'_>,
    file: &FileNode<CodegenPrereq>,
    entry: Option<&FullyQualifiedName>,
) -> Result<()> {
    let file_fqn = file.declaration_fqn()?.clone();
    let name = internal_name(&file_fqn);
    debug!("file {} -> {}", file_fqn, name);

    let mut unit = ClassFile::new(ACC_PUBLIC | ACC_FINAL | ACC_SUPER, name, OBJECT_CLASS);
    unit.source_file = file
        .file_path()
        .ok()
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned());

    ctx.scoped(|c| &mut c.current_file, Some(file_fqn), |ctx| {
        ctx.scoped(|c| &mut c.current_unit, Some(unit), |ctx| {
            for node in &file.nodes {
                match node {
                    Node::FunctionDeclaration(decl) => {
                        let method = generate_function(ctx, decl)?;
                        ctx.unit_mut()?.methods.push(method);
                        if entry == Some(decl.declaration_fqn()?) {
                            let wrapper = generate_entry_wrapper(ctx, decl)?;
                            ctx.unit_mut()?.methods.push(wrapper);
                        }
                    }
                    // Planned separately; see `generate_data_declaration`.
                    Node::DataDeclaration(_) => {}
                    other => return Err(Error::UnsupportedTopLevel { node: other.describe() }),
                }
            }
            let unit = ctx
                .current_unit
                .take()
                .ok_or_else(|| Error::CodeGen("file class went missing".to_string()))?;
            ctx.units.push(unit);
            Ok(())
        })
    })
}

/// One `public static` method; parameters occupy slots `0..N`
pub fn generate_function(
    ctx: &mut CompilationContext<'_>,
    decl: &FunctionDeclarationNode<CodegenPrereq>,
) -> Result<MethodInfo> {
    let fqn = decl.declaration_fqn()?.clone();
    let sig = ctx.method_sig(&fqn)?;
    debug!("method {}{}", fqn, sig.descriptor());

    ctx.scoped(|c| &mut c.current_function, Some(fqn.clone()), |ctx| {
        let mut mb = MethodBuilder::new(ACC_PUBLIC | ACC_STATIC, fqn.final_segment(), sig.clone());
        let first_arg = mb.first_arg();

        ctx.with_opaque_frame(|ctx| {
            bind_parameters(ctx, decl, &sig, first_arg)?;
            generate_node(ctx, &mut mb, &decl.body)
        })?;

        mb.finish()
    })
}

fn bind_parameters(
    ctx: &mut CompilationContext<'_>,
    decl: &FunctionDeclarationNode<CodegenPrereq>,
    sig: &MethodSig,
    first_arg: u16,
) -> Result<()> {
    for (index, (param, ty)) in decl.parameters.iter().zip(&sig.params).enumerate() {
        let local = LocalSlot {
            slot: first_arg + index as u16,
            ty: ty.clone(),
        };
        ctx.symbols.put(param.name.name.as_unresolved(), local)?;
    }
    Ok(())
}

/// `public static void main(String[])` calling the entry function
fn generate_entry_wrapper(
    ctx: &mut CompilationContext<'_>,
    entry: &FunctionDeclarationNode<CodegenPrereq>,
) -> Result<MethodInfo> {
    let fqn = entry.declaration_fqn()?;
    let sig = ctx.method_sig(fqn)?;
    if !sig.params.is_empty() {
        return Err(Error::CodeGen(format!("entry point {} must not take parameters", fqn)));
    }
    info!("entry point: {}", fqn);

    let args = JvmType::Array(Box::new(JvmType::string()));
    let mut mb = MethodBuilder::new(ACC_PUBLIC | ACC_STATIC, "main", MethodSig::new(vec![args], JvmType::Void));
    let result_type = sig.ret.clone();
    mb.invoke_static(MethodRef::new(ctx.owner_of(fqn), fqn.final_segment(), sig));

    if result_type != JvmType::Void {
        let result = mb.new_local(&result_type);
        mb.store_local(result, &result_type);
        mb.get_static(FieldRef::new(SYSTEM, "out", JvmType::reference(PRINT_STREAM)));
        mb.load_local(result, &result_type);
        if result_type == JvmType::Int {
            mb.invoke_static(MethodRef::new(
                INTEGER,
                "toString",
                MethodSig::new(vec![JvmType::Int], JvmType::string()),
            ));
        }
        mb.invoke_virtual(MethodRef::new(
            PRINT_STREAM,
            "println",
            MethodSig::new(vec![JvmType::object()], JvmType::Void),
        ));
    }
    mb.return_value();
    mb.finish()
}

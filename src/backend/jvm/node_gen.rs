//! Bytecode for statements and expressions

use log::trace;

use crate::backend::jvm::classfile::{FieldRef, MethodRef};
use crate::backend::jvm::context::{CompilationContext, LocalSlot};
use crate::backend::jvm::descriptor::{internal_name, JvmType, MethodSig};
use crate::backend::jvm::method::MethodBuilder;
use crate::common::phase::CodegenPrereq;
use crate::common::{Attributable, Name, ScopedFrames};
use crate::frontend::ast::*;
use crate::middle::attrs::{ResolvedAttrs, TypedAttrs};
use crate::utils::{Error, Result};

/// Name of the shared instance field on nullary value constructors
pub const SINGLETON_FIELD: &str = "INSTANCE";

/// Generate code for one node, leaving its value (if any) on the stack
pub fn generate_node(
    ctx: &mut CompilationContext<'_>,
    mb: &mut MethodBuilder,
    node: &Node<CodegenPrereq>,
) -> Result<()> {
    trace!("generating {}", node.describe());

    match node {
        Node::NoOp(_) => mb.nop(),
        Node::IntLiteral(lit) => mb.push_int(lit.value),
        Node::StringLiteral(lit) => mb.push_string(lit.value.as_str()),
        Node::ReadLocalVar(read) => load_variable(ctx, mb, &read.target.name)?,
        Node::Identifier(ident) => load_variable(ctx, mb, &ident.name)?,
        Node::Return(ret) => {
            generate_node(ctx, mb, &ret.value)?;
            mb.return_value();
        }
        Node::Block(block) => {
            ctx.with_transparent_frame(|ctx| generate_statements(ctx, mb, &block.statements))?;
        }
        Node::BinaryOperation(op) => {
            generate_node(ctx, mb, &op.lhs)?;
            generate_node(ctx, mb, &op.rhs)?;
            match op.operator {
                // Operand types are not consulted; addition is integer addition.
                BinaryOperator::Add => mb.iadd(),
            }
        }
        Node::LocalVarDeclaration(decl) => {
            let ty = JvmType::from_somelang(decl.expression_type()?)?;
            generate_node(ctx, mb, &decl.rhs)?;
            let slot = mb.new_local(&ty);
            mb.store_local(slot, &ty);
            ctx.symbols.put(decl.name.name.as_unresolved(), LocalSlot { slot, ty })?;
        }
        Node::Invoke(call) => {
            let fqn = call.referent_fqn()?;
            let sig = ctx.method_sig(fqn)?;
            for argument in &call.arguments {
                generate_node(ctx, mb, argument.value())?;
            }
            let owner = ctx.owner_of(fqn);
            mb.invoke_static(MethodRef::new(owner, fqn.final_segment(), sig));
        }
        Node::ValueConstructorInvocation(ctor) => {
            let fqn = ctor.referent_fqn()?;
            let class = internal_name(fqn);
            if ctx.arity_of(fqn)? == 0 {
                mb.get_static(FieldRef::new(
                    class.as_str(),
                    SINGLETON_FIELD,
                    JvmType::reference(class.as_str()),
                ));
            } else {
                mb.new_instance(class.as_str());
                mb.dup();
                mb.invoke_special(MethodRef::new(class, "<init>", MethodSig::void()));
            }
        }
        Node::File(_)
        | Node::FunctionDeclaration(_)
        | Node::DataDeclaration(_)
        | Node::GetStaticValue(_)
        | Node::ReadFieldValue(_) => {
            return Err(Error::UnsupportedNode {
                backend: "jvm",
                node: node.describe(),
            });
        }
    }
    Ok(())
}

/// Generate a statement list; nothing may follow a return
pub fn generate_statements(
    ctx: &mut CompilationContext<'_>,
    mb: &mut MethodBuilder,
    statements: &[Node<CodegenPrereq>],
) -> Result<()> {
    for statement in statements {
        if mb.is_terminated() {
            return Err(Error::StatementAfterReturn {
                function: ctx.function_name(),
            });
        }
        generate_node(ctx, mb, statement)?;
        if leaves_value(statement)? {
            mb.pop();
        }
    }
    Ok(())
}

/// True for expression statements whose value nobody consumes
fn leaves_value(statement: &Node<CodegenPrereq>) -> Result<bool> {
    match statement {
        Node::Return(_) | Node::Block(_) | Node::LocalVarDeclaration(_) | Node::NoOp(_) => Ok(false),
        expression => Ok(JvmType::from_somelang(expression.expression_type()?)?.size() > 0),
    }
}

/// Locals are keyed by source name, so a qualified reference finds the
/// local named by its final segment
fn load_variable(ctx: &CompilationContext<'_>, mb: &mut MethodBuilder, name: &Name) -> Result<()> {
    let key = name.as_unresolved();
    let local = ctx
        .symbols
        .lookup(&key)
        .cloned()
        .ok_or_else(|| Error::UnboundLocal { name: key.to_string() })?;

    if local.slot < mb.first_arg() {
        mb.load_this();
    } else if local.slot < mb.first_local() {
        mb.load_arg(local.slot - mb.first_arg())?;
    } else {
        mb.load_local(local.slot, &local.ty);
    }
    Ok(())
}

//! Type analysis
//!
//! Builds the program's [`TypeContext`] and records the type of every
//! expression. This is not a type checker: annotations are trusted,
//! unannotated parameters are `Int`, and a missing return annotation is
//! taken from the function's first `return`.

use std::collections::HashMap;

use log::{debug, trace};

use crate::common::phase::{NameResolving, Typechecking};
use crate::common::{Attributable, FullyQualifiedName, NameResolved, ScopedFrames, SymbolTable};
use crate::frontend::ast::*;
use crate::middle::attrs::{MiddleAttrsMut, ResolvedAttrs};
use crate::types::{ArgumentType, SomelangType, TypeContext};
use crate::utils::{Error, Result};

/// Convert a resolved type expression into a type
pub fn to_somelang_type<P: NameResolved>(ty: &TypeExpressionNode<P>) -> Result<SomelangType> {
    match ty {
        TypeExpressionNode::Name(name) => match SomelangType::builtin(name.name.name.text()) {
            Some(builtin) => Ok(builtin),
            None => Ok(SomelangType::Object(name.referent_fqn()?.clone())),
        },
        TypeExpressionNode::ConstructorInvocation(inv) => Err(Error::UnsupportedType {
            ty: format!("{}(..)", inv.target.name),
        }),
        TypeExpressionNode::Function(f) => {
            let argument_types = f
                .argument_types
                .iter()
                .map(|arg| to_somelang_type(arg).map(ArgumentType::positional))
                .collect::<Result<Vec<_>>>()?;
            Ok(SomelangType::function(argument_types, to_somelang_type(&f.return_type)?))
        }
    }
}

/// Fill the type context and expression types for a whole program
pub fn analyze_types(
    mut files: Vec<FileNode<NameResolving>>,
) -> Result<(Vec<FileNode<Typechecking>>, TypeContext)> {
    let mut analyzer = TypeAnalyzer::default();

    for file in files.iter() {
        analyzer.declare_file(file)?;
    }

    // Unannotated returns may depend on each other; iterate to a fixpoint.
    loop {
        let mut progress = false;
        let mut pending = None;
        for file in files.iter_mut() {
            for node in file.nodes.iter_mut() {
                let Node::FunctionDeclaration(decl) = node else { continue };
                let fqn = decl.declaration_fqn()?.clone();
                if matches!(analyzer.returns.get(&fqn), Some(Some(_))) {
                    continue;
                }
                match analyzer.analyze_function(decl)? {
                    Some(ty) => {
                        debug!("inferred return type of {}: {}", fqn, ty);
                        analyzer.returns.insert(fqn, Some(ty));
                        progress = true;
                    }
                    None => pending = Some(decl.simple_name().to_string()),
                }
            }
        }
        match pending {
            None => break,
            Some(name) if !progress => return Err(Error::CannotInferType { name }),
            Some(_) => {}
        }
    }

    // Every return type is known now, so this pass types every expression.
    for file in files.iter_mut() {
        for node in file.nodes.iter_mut() {
            if let Node::FunctionDeclaration(decl) = node {
                analyzer.analyze_function(decl)?;
                analyzer.record_signature(decl)?;
            }
        }
    }

    Ok((files.rephase::<Typechecking>(), analyzer.context))
}

#[derive(Default)]
struct TypeAnalyzer {
    context: TypeContext,
    /// Parameter types per function
    parameters: HashMap<FullyQualifiedName, Vec<ArgumentType>>,
    /// Return type per function; `None` until inferred
    returns: HashMap<FullyQualifiedName, Option<SomelangType>>,
    /// Local name -> type; `None` while it depends on an unknown return type
    locals: SymbolTable<String, Option<SomelangType>>,
    /// Types of the `return` statements seen in the current function
    seen_returns: Vec<Option<SomelangType>>,
}

impl TypeAnalyzer {
    fn declare_file(&mut self, file: &FileNode<NameResolving>) -> Result<()> {
        for data in file.data_declarations() {
            let type_fqn = data.type_constructor.declaration_fqn()?.clone();
            let object = SomelangType::Object(type_fqn.clone());
            self.context.insert(type_fqn, object.clone());

            for ctor in &data.value_constructors {
                let argument_types = ctor
                    .parameters
                    .iter()
                    .map(|ty| to_somelang_type(ty).map(ArgumentType::positional))
                    .collect::<Result<Vec<_>>>()?;
                self.context.insert(
                    ctor.declaration_fqn()?.clone(),
                    SomelangType::function(argument_types, object.clone()),
                );
            }
        }

        for decl in file.functions() {
            let fqn = decl.declaration_fqn()?.clone();
            let params = decl
                .parameters
                .iter()
                .map(|param| {
                    let ty = match &param.ty {
                        Some(ty) => to_somelang_type(ty)?,
                        None => SomelangType::Int,
                    };
                    Ok(ArgumentType::named(param.name.name.text(), ty))
                })
                .collect::<Result<Vec<_>>>()?;
            let ret = decl.return_type.as_ref().map(to_somelang_type).transpose()?;
            self.parameters.insert(fqn.clone(), params);
            self.returns.insert(fqn, ret);
        }
        Ok(())
    }

    fn record_signature(&mut self, decl: &FunctionDeclarationNode<NameResolving>) -> Result<()> {
        let fqn = decl.declaration_fqn()?;
        let params = self.parameters.get(fqn).cloned().unwrap_or_default();
        let ret = self
            .returns
            .get(fqn)
            .cloned()
            .flatten()
            .ok_or_else(|| Error::CannotInferType { name: decl.simple_name().to_string() })?;
        let ty = SomelangType::function(params, ret);
        trace!("{}: {}", fqn, ty);
        self.context.insert(fqn.clone(), ty);
        Ok(())
    }

    /// Type the body; returns the function's return type if it is known
    fn analyze_function(&mut self, decl: &mut FunctionDeclarationNode<NameResolving>) -> Result<Option<SomelangType>> {
        let fqn = decl.declaration_fqn()?.clone();
        let params = self.parameters.get(&fqn).cloned().unwrap_or_default();

        self.seen_returns.clear();
        self.with_opaque_frame(|this| {
            for param in params {
                this.locals.put(param.name.unwrap_or_default(), Some(param.ty))?;
            }
            this.type_node(&mut decl.body)
        })?;

        if let Some(Some(annotated)) = self.returns.get(&fqn) {
            return Ok(Some(annotated.clone()));
        }
        match self.seen_returns.first() {
            None => Ok(Some(SomelangType::Void)),
            Some(ty) => Ok(ty.clone()),
        }
    }

    fn type_node(&mut self, node: &mut Node<NameResolving>) -> Result<Option<SomelangType>> {
        let ty = match node {
            Node::IntLiteral(_) => Some(SomelangType::Int),
            Node::StringLiteral(_) => Some(SomelangType::String),
            Node::NoOp(_) => Some(SomelangType::Void),
            Node::ReadLocalVar(read) => self.lookup_local(read.target.name.text())?,
            Node::Identifier(ident) => self.lookup_local(ident.name.text())?,
            Node::BinaryOperation(op) => {
                self.type_node(&mut op.lhs)?;
                self.type_node(&mut op.rhs)?;
                Some(SomelangType::Int)
            }
            Node::Block(block) => {
                self.with_transparent_frame(|this| this.type_block(&mut block.statements))?
            }
            Node::LocalVarDeclaration(decl) => {
                let rhs = self.type_node(&mut decl.rhs)?;
                let ty = match &decl.ty {
                    Some(ty) => Some(to_somelang_type(ty)?),
                    None => rhs,
                };
                self.locals.put(decl.name.name.text().to_string(), ty.clone())?;
                ty
            }
            Node::Return(ret) => {
                let ty = self.type_node(&mut ret.value)?;
                self.seen_returns.push(ty.clone());
                ty
            }
            Node::Invoke(call) => {
                for arg in call.arguments.iter_mut() {
                    match arg {
                        ArgumentNode::Positional(arg) => {
                            self.type_node(&mut arg.value)?;
                        }
                    }
                }
                let fqn = call.referent_fqn()?;
                self.returns
                    .get(fqn)
                    .cloned()
                    .ok_or_else(|| Error::MissingType { fqn: fqn.to_string() })?
            }
            Node::ValueConstructorInvocation(ctor) => {
                let (_, ret) = self.context.function_type(ctor.referent_fqn()?)?;
                Some(ret.clone())
            }
            Node::GetStaticValue(_)
            | Node::ReadFieldValue(_)
            | Node::File(_)
            | Node::FunctionDeclaration(_)
            | Node::DataDeclaration(_) => {
                return Err(Error::UnsupportedNode {
                    backend: "type analysis",
                    node: node.describe(),
                });
            }
        };

        if let Some(ty) = &ty {
            node.set_expression_type(ty.clone());
        }
        Ok(ty)
    }

    fn type_block(&mut self, statements: &mut [Node<NameResolving>]) -> Result<Option<SomelangType>> {
        let mut last = Some(SomelangType::Void);
        for statement in statements.iter_mut() {
            last = self.type_node(statement)?;
        }
        Ok(last)
    }

    fn lookup_local(&self, name: &str) -> Result<Option<SomelangType>> {
        self.locals
            .lookup(name)
            .cloned()
            .ok_or_else(|| Error::UnboundLocal { name: name.to_string() })
    }
}

impl ScopedFrames<String, Option<SomelangType>> for TypeAnalyzer {
    fn symbol_table(&mut self) -> &mut SymbolTable<String, Option<SomelangType>> {
        &mut self.locals
    }
}

//! Name resolution
//!
//! Assigns fully-qualified names to declarations and points every call,
//! constructor use and type name at its declaration. Resolution is
//! program-wide: a file can call functions declared in any other file.
//!
//! Naming scheme, for root package `somelang` and file `Main.som`:
//! - the file itself: `somelang.Main`
//! - a function `f` in it: `somelang.Main.f`
//! - a data type `Foo`: `somelang.Foo`, its constructor `Bar`: `somelang.Foo.Bar`

use std::collections::HashMap;

use log::debug;

use crate::common::phase::{NameResolving, Parsing};
use crate::common::{Attributable, FullyQualifiedName, Name};
use crate::frontend::ast::*;
use crate::frontend::attrs::SourceAttrs;
use crate::middle::attrs::{MiddleAttrsMut, DECLARATION_FQN};
use crate::types::SomelangType;
use crate::utils::{Error, Result};

/// Resolve names across a whole program
pub fn resolve_names(
    mut files: Vec<FileNode<Parsing>>,
    root_package: &FullyQualifiedName,
) -> Result<Vec<FileNode<NameResolving>>> {
    let mut resolver = NameResolver::default();

    for file in files.iter_mut() {
        resolver.declare_file(file, root_package)?;
    }
    for file in files.iter_mut() {
        resolver.resolve_file(file)?;
    }

    Ok(files.rephase::<NameResolving>())
}

/// Program-wide declaration tables, keyed by source name
#[derive(Default)]
struct NameResolver {
    functions: HashMap<String, Vec<FullyQualifiedName>>,
    constructors: HashMap<String, Vec<FullyQualifiedName>>,
    types: HashMap<String, Vec<FullyQualifiedName>>,
    /// Fully-qualified name of the file currently being resolved
    current_file: Option<FullyQualifiedName>,
}

fn declare(
    table: &mut HashMap<String, Vec<FullyQualifiedName>>,
    name: &str,
    fqn: FullyQualifiedName,
) -> Result<FullyQualifiedName> {
    let entries = table.entry(name.to_string()).or_default();
    if entries.contains(&fqn) {
        return Err(Error::AmbiguousName {
            name: name.to_string(),
            candidates: vec![fqn.to_string(), fqn.to_string()],
        });
    }
    entries.push(fqn.clone());
    Ok(fqn)
}

fn unique(table: &HashMap<String, Vec<FullyQualifiedName>>, name: &str) -> Result<FullyQualifiedName> {
    match table.get(name).map(Vec::as_slice) {
        None | Some([]) => Err(Error::UnresolvedName { name: name.to_string() }),
        Some([fqn]) => Ok(fqn.clone()),
        Some(candidates) => Err(Error::AmbiguousName {
            name: name.to_string(),
            candidates: candidates.iter().map(ToString::to_string).collect(),
        }),
    }
}

impl NameResolver {
    // ==================== Declarations ====================

    fn declare_file(&mut self, file: &mut FileNode<Parsing>, root: &FullyQualifiedName) -> Result<()> {
        let stem = file
            .file_path()?
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_fqn = root.join(&stem);
        debug!("declaring file {}", file_fqn);

        for node in file.nodes.iter_mut() {
            match node {
                Node::FunctionDeclaration(decl) => {
                    let name = decl.name.name.text().to_string();
                    let fqn = declare(&mut self.functions, &name, file_fqn.join(&name))?;
                    decl.set_declaration_fqn(fqn);
                }
                Node::DataDeclaration(data) => {
                    let type_name = data.type_constructor.name.name.text().to_string();
                    let type_fqn = declare(&mut self.types, &type_name, root.join(&type_name))?;
                    for ctor in data.value_constructors.iter_mut() {
                        let name = ctor.name.name.text().to_string();
                        let fqn = declare(&mut self.constructors, &name, type_fqn.join(&name))?;
                        ctor.set_declaration_fqn(fqn);
                    }
                    data.type_constructor.set_declaration_fqn(type_fqn.clone());
                    data.set_declaration_fqn(type_fqn);
                }
                _ => {}
            }
        }

        file.set_declaration_fqn(file_fqn);
        Ok(())
    }

    // ==================== References ====================

    fn resolve_file(&mut self, file: &mut FileNode<Parsing>) -> Result<()> {
        let file_fqn = file.require_attribute(&DECLARATION_FQN)?.clone();
        self.current_file = Some(file_fqn);

        for node in file.nodes.iter_mut() {
            match node {
                Node::FunctionDeclaration(decl) => {
                    for param in decl.parameters.iter_mut() {
                        if let Some(ty) = param.ty.as_mut() {
                            self.resolve_type(ty)?;
                        }
                    }
                    if let Some(ty) = decl.return_type.as_mut() {
                        self.resolve_type(ty)?;
                    }
                    self.resolve_node(&mut decl.body)?;
                }
                Node::DataDeclaration(data) => {
                    for ctor in data.value_constructors.iter_mut() {
                        for ty in ctor.parameters.iter_mut() {
                            self.resolve_type(ty)?;
                        }
                    }
                }
                other => {
                    return Err(Error::UnsupportedTopLevel { node: other.describe() });
                }
            }
        }

        self.current_file = None;
        Ok(())
    }

    /// Same-file functions win; otherwise the name must be unique program-wide
    fn resolve_function(&self, name: &str) -> Result<FullyQualifiedName> {
        if let Some(file) = &self.current_file {
            let local = file.join(name);
            if self.functions.get(name).map_or(false, |fqns| fqns.contains(&local)) {
                return Ok(local);
            }
        }
        unique(&self.functions, name)
    }

    fn resolve_node(&mut self, node: &mut Node<Parsing>) -> Result<()> {
        match node {
            Node::Block(block) => {
                for statement in block.statements.iter_mut() {
                    self.resolve_node(statement)?;
                }
            }
            Node::Return(ret) => self.resolve_node(&mut ret.value)?,
            Node::LocalVarDeclaration(decl) => {
                if let Some(ty) = decl.ty.as_mut() {
                    self.resolve_type(ty)?;
                }
                self.resolve_node(&mut decl.rhs)?;
            }
            Node::BinaryOperation(op) => {
                self.resolve_node(&mut op.lhs)?;
                self.resolve_node(&mut op.rhs)?;
            }
            Node::Invoke(call) => {
                let fqn = self.resolve_function(call.target.name.text())?;
                call.target.name = Name::Qualified(fqn.clone());
                call.set_referent_fqn(fqn);
                for arg in call.arguments.iter_mut() {
                    match arg {
                        ArgumentNode::Positional(arg) => self.resolve_node(&mut arg.value)?,
                    }
                }
            }
            Node::ValueConstructorInvocation(ctor) => {
                let fqn = unique(&self.constructors, ctor.target.name.text())?;
                ctor.target.name = Name::Qualified(fqn.clone());
                ctor.set_referent_fqn(fqn);
            }
            Node::ReadFieldValue(read) => self.resolve_node(&mut read.receiver)?,
            // Locals are resolved by scope during code generation.
            Node::ReadLocalVar(_)
            | Node::Identifier(_)
            | Node::IntLiteral(_)
            | Node::StringLiteral(_)
            | Node::GetStaticValue(_)
            | Node::NoOp(_) => {}
            Node::File(_) | Node::FunctionDeclaration(_) | Node::DataDeclaration(_) => {
                return Err(Error::UnsupportedNode {
                    backend: "name resolution",
                    node: node.describe(),
                });
            }
        }
        Ok(())
    }

    fn resolve_type(&self, ty: &mut TypeExpressionNode<Parsing>) -> Result<()> {
        match ty {
            TypeExpressionNode::Name(name) => {
                let text = name.name.name.text();
                if SomelangType::builtin(text).is_none() {
                    let fqn = unique(&self.types, text)?;
                    name.set_referent_fqn(fqn);
                }
            }
            TypeExpressionNode::ConstructorInvocation(inv) => {
                let fqn = unique(&self.types, inv.target.name.text())?;
                inv.set_referent_fqn(fqn);
                for arg in inv.arguments.iter_mut() {
                    self.resolve_type(arg)?;
                }
            }
            TypeExpressionNode::Function(f) => {
                for arg in f.argument_types.iter_mut() {
                    self.resolve_type(arg)?;
                }
                self.resolve_type(&mut f.return_type)?;
            }
        }
        Ok(())
    }
}

//! Lowering from the tree to three-address code
//!
//! Bindings from source names to variables live for the whole function;
//! nested blocks do not introduce scopes here, and a later `let` of the same
//! name simply rebinds it.

use std::collections::HashMap;

use log::trace;

use crate::common::{Attributable, Parsed, Typechecked};
use crate::frontend::ast::*;
use crate::middle::tac::*;
use crate::utils::{Error, Result};

/// Lower the body of one function
pub fn lower_function<P: Typechecked>(decl: &FunctionDeclarationNode<P>) -> Result<TacFunction> {
    let mut generator = TacGenerator::new();
    generator.lower(&decl.body)?;
    let function = TacFunction {
        name: decl.simple_name().to_string(),
        block: generator.finish(),
    };
    trace!("lowered {} to {} instructions", function.name, function.block.instructions.len());
    Ok(function)
}

/// TAC generator state
pub struct TacGenerator {
    instructions: Vec<TacInstruction>,
    next_var: usize,
    bindings: HashMap<String, Variable>,
}

impl TacGenerator {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            next_var: 0,
            bindings: HashMap::new(),
        }
    }

    fn next_var(&mut self) -> Variable {
        let var = Variable(format!("tac{}", self.next_var));
        self.next_var += 1;
        var
    }

    /// The instructions emitted so far
    pub fn finish(self) -> TacBlock {
        TacBlock { instructions: self.instructions }
    }

    /// Lower `node`, returning the operand holding its value
    pub fn lower<P: Parsed>(&mut self, node: &Node<P>) -> Result<ValueReference> {
        match node {
            Node::Block(block) => {
                let mut last = None;
                for statement in &block.statements {
                    last = Some(self.lower(statement)?);
                }
                last.ok_or(Error::EmptyBlock)
            }
            Node::LocalVarDeclaration(decl) => {
                let rhs = self.lower(&decl.rhs)?;
                let name = decl.name.name.text();
                let var = Variable(format!("{}_{}", name, self.next_var().name()));
                self.instructions.push(TacInstruction::Define {
                    defines: var.clone(),
                    rhs,
                });
                self.bindings.insert(name.to_string(), var.clone());
                Ok(ValueReference::LocalVar(var))
            }
            Node::BinaryOperation(op) => {
                let lhs = self.lower(&op.lhs)?;
                let rhs = self.lower(&op.rhs)?;
                let result = self.next_var();
                self.instructions.push(TacInstruction::BinOp {
                    defines: result.clone(),
                    lhs,
                    op: match op.operator {
                        BinaryOperator::Add => Op::IntAdd,
                    },
                    rhs,
                });
                Ok(ValueReference::TempVar(result))
            }
            Node::Return(ret) => {
                let value = self.lower(&ret.value)?;
                self.instructions.push(TacInstruction::Return { value: value.clone() });
                Ok(value)
            }
            Node::IntLiteral(lit) => Ok(ValueReference::Immediate(lit.value)),
            Node::ReadLocalVar(read) => self.lookup(read.target.name.text()),
            Node::Identifier(ident) => self.lookup(ident.name.text()),
            Node::File(_) | Node::FunctionDeclaration(_) | Node::DataDeclaration(_) => {
                Err(Error::NotAnExpression { node: node.describe() })
            }
            Node::StringLiteral(_)
            | Node::Invoke(_)
            | Node::GetStaticValue(_)
            | Node::ReadFieldValue(_)
            | Node::ValueConstructorInvocation(_)
            | Node::NoOp(_) => Err(Error::UnsupportedNode {
                backend: "three-address code",
                node: node.describe(),
            }),
        }
    }

    fn lookup(&self, name: &str) -> Result<ValueReference> {
        self.bindings
            .get(name)
            .cloned()
            .map(ValueReference::LocalVar)
            .ok_or_else(|| Error::UnboundIdentifier { name: name.to_string() })
    }
}

impl Default for TacGenerator {
    fn default() -> Self {
        Self::new()
    }
}

//! Three-address code
//!
//! A linear, single-block instruction list over named variables. Named
//! locals are suffixed with a fresh counter (`a_tac0`); temporaries are
//! bare counters (`tac1`).

use serde::Serialize;

/// A named storage location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Variable(pub String);

impl Variable {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// An instruction operand
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ValueReference {
    Immediate(i32),
    /// A variable introduced by a `let`
    LocalVar(Variable),
    /// A compiler-introduced temporary
    TempVar(Variable),
}

/// Backend-agnostic operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Op {
    IntAdd,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TacInstruction {
    Define {
        defines: Variable,
        rhs: ValueReference,
    },
    BinOp {
        defines: Variable,
        lhs: ValueReference,
        op: Op,
        rhs: ValueReference,
    },
    Return {
        value: ValueReference,
    },
}

/// Instructions in execution order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TacBlock {
    pub instructions: Vec<TacInstruction>,
}

/// A lowered function
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TacFunction {
    pub name: String,
    pub block: TacBlock,
}

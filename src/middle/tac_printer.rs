//! TAC printer
//!
//! Human-readable listings of three-address code for debugging.

use std::fmt::{self, Write};

use crate::middle::tac::*;

/// Pretty printer for three-address code
pub struct TacPrinter {
    output: String,
    indent: usize,
}

impl TacPrinter {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent: 2,
        }
    }

    /// Print a list of functions
    pub fn print_functions(&mut self, functions: &[TacFunction]) -> String {
        self.output.clear();
        for function in functions {
            // Writing into a String cannot fail.
            let _ = self.write_function(function);
        }
        std::mem::take(&mut self.output)
    }

    fn write_function(&mut self, function: &TacFunction) -> fmt::Result {
        writeln!(self.output, "{}:", function.name)?;
        for instruction in &function.block.instructions {
            write!(self.output, "{:width$}", "", width = self.indent)?;
            writeln!(self.output, "{}", instruction)?;
        }
        Ok(())
    }
}

impl Default for TacPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ValueReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueReference::Immediate(n) => write!(f, "{}", n),
            ValueReference::LocalVar(v) | ValueReference::TempVar(v) => write!(f, "{}", v),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::IntAdd => write!(f, "+"),
        }
    }
}

impl fmt::Display for TacInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TacInstruction::Define { defines, rhs } => write!(f, "{} = {}", defines, rhs),
            TacInstruction::BinOp { defines, lhs, op, rhs } => {
                write!(f, "{} = {} {} {}", defines, lhs, op, rhs)
            }
            TacInstruction::Return { value } => write!(f, "return {}", value),
        }
    }
}

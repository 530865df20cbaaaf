//! Method bodies
//!
//! [`MethodBuilder`] records symbolic instructions and tracks operand stack
//! depth and local slots as it goes, so `max_stack` and `max_locals` are
//! known when the method is finished. Constants are interned only when the
//! owning class is serialized.

use crate::backend::jvm::classfile::{Code, ConstantPool, FieldRef, MethodInfo, MethodRef};
use crate::backend::jvm::descriptor::{JvmType, MethodSig};
use crate::backend::jvm::opcodes::{self, access::ACC_STATIC};
use crate::utils::{Error, Result};

/// A single bytecode instruction with symbolic operands
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Nop,
    PushInt(i32),
    PushString(String),
    ILoad(u16),
    ALoad(u16),
    IStore(u16),
    AStore(u16),
    IAdd,
    Pop,
    Dup,
    New(String),
    GetStatic(FieldRef),
    PutStatic(FieldRef),
    InvokeStatic(MethodRef),
    InvokeVirtual(MethodRef),
    InvokeSpecial(MethodRef),
    Return,
    IReturn,
    AReturn,
}

fn local_op(out: &mut Vec<u8>, short_base: u8, long_op: u8, slot: u16) {
    match slot {
        0..=3 => out.push(short_base + slot as u8),
        4..=255 => {
            out.push(long_op);
            out.push(slot as u8);
        }
        _ => {
            out.push(opcodes::WIDE);
            out.push(long_op);
            out.extend_from_slice(&slot.to_be_bytes());
        }
    }
}

fn ldc(out: &mut Vec<u8>, index: u16) {
    if index <= u8::MAX as u16 {
        out.push(opcodes::LDC);
        out.push(index as u8);
    } else {
        out.push(opcodes::LDC_W);
        out.extend_from_slice(&index.to_be_bytes());
    }
}

fn with_index(out: &mut Vec<u8>, opcode: u8, index: u16) {
    out.push(opcode);
    out.extend_from_slice(&index.to_be_bytes());
}

impl Instruction {
    /// Encode into `out`, interning constants into `pool`
    pub fn assemble(&self, pool: &mut ConstantPool, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Instruction::Nop => out.push(opcodes::NOP),
            Instruction::PushInt(value) => match *value {
                -1 => out.push(opcodes::ICONST_M1),
                0..=5 => out.push(opcodes::ICONST_0 + *value as u8),
                v if i8::try_from(v).is_ok() => {
                    out.push(opcodes::BIPUSH);
                    out.push(v as i8 as u8);
                }
                v if i16::try_from(v).is_ok() => {
                    out.push(opcodes::SIPUSH);
                    out.extend_from_slice(&(v as i16).to_be_bytes());
                }
                v => ldc(out, pool.integer(v)?),
            },
            Instruction::PushString(value) => ldc(out, pool.string(value)?),
            Instruction::ILoad(slot) => local_op(out, opcodes::ILOAD_0, opcodes::ILOAD, *slot),
            Instruction::ALoad(slot) => local_op(out, opcodes::ALOAD_0, opcodes::ALOAD, *slot),
            Instruction::IStore(slot) => local_op(out, opcodes::ISTORE_0, opcodes::ISTORE, *slot),
            Instruction::AStore(slot) => local_op(out, opcodes::ASTORE_0, opcodes::ASTORE, *slot),
            Instruction::IAdd => out.push(opcodes::IADD),
            Instruction::Pop => out.push(opcodes::POP),
            Instruction::Dup => out.push(opcodes::DUP),
            Instruction::New(class) => with_index(out, opcodes::NEW, pool.class(class)?),
            Instruction::GetStatic(field) => with_index(out, opcodes::GETSTATIC, pool.field_ref(field)?),
            Instruction::PutStatic(field) => with_index(out, opcodes::PUTSTATIC, pool.field_ref(field)?),
            Instruction::InvokeStatic(method) => with_index(out, opcodes::INVOKESTATIC, pool.method_ref(method)?),
            Instruction::InvokeVirtual(method) => {
                with_index(out, opcodes::INVOKEVIRTUAL, pool.method_ref(method)?)
            }
            Instruction::InvokeSpecial(method) => {
                with_index(out, opcodes::INVOKESPECIAL, pool.method_ref(method)?)
            }
            Instruction::Return => out.push(opcodes::RETURN),
            Instruction::IReturn => out.push(opcodes::IRETURN),
            Instruction::AReturn => out.push(opcodes::ARETURN),
        }
        Ok(())
    }
}

/// Builds the body of one method
#[derive(Debug)]
pub struct MethodBuilder {
    access: u16,
    name: String,
    sig: MethodSig,
    instructions: Vec<Instruction>,
    stack: u16,
    max_stack: u16,
    next_local: u16,
    terminated: bool,
}

impl MethodBuilder {
    pub fn new(access: u16, name: impl Into<String>, sig: MethodSig) -> Self {
        let is_static = access & ACC_STATIC != 0;
        let next_local = u16::from(!is_static) + sig.param_slots();
        Self {
            access,
            name: name.into(),
            sig,
            instructions: Vec::new(),
            stack: 0,
            max_stack: 0,
            next_local,
            terminated: false,
        }
    }

    /// Slot of the first argument; 1 when slot 0 holds `this`
    pub fn first_arg(&self) -> u16 {
        u16::from(self.access & ACC_STATIC == 0)
    }

    /// Slot of the first true local
    pub fn first_local(&self) -> u16 {
        self.first_arg() + self.sig.param_slots()
    }

    /// True once a return has been emitted
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn emit(&mut self, instruction: Instruction, pops: u16, pushes: u16) {
        self.stack = self.stack.saturating_sub(pops) + pushes;
        self.max_stack = self.max_stack.max(self.stack);
        self.instructions.push(instruction);
    }

    // ==================== Locals ====================

    /// Reserve a slot for a new local of type `ty`
    pub fn new_local(&mut self, ty: &JvmType) -> u16 {
        let slot = self.next_local;
        self.next_local += ty.size().max(1);
        slot
    }

    pub fn load_this(&mut self) {
        self.emit(Instruction::ALoad(0), 0, 1);
    }

    /// Load argument `index`, counted from the first argument
    pub fn load_arg(&mut self, index: u16) -> Result<()> {
        let ty = self
            .sig
            .params
            .get(index as usize)
            .cloned()
            .ok_or_else(|| Error::CodeGen(format!("{} has no argument {}", self.name, index)))?;
        let slot = self.first_arg() + index;
        self.load_local(slot, &ty);
        Ok(())
    }

    pub fn load_local(&mut self, slot: u16, ty: &JvmType) {
        let instruction = if ty.is_reference() {
            Instruction::ALoad(slot)
        } else {
            Instruction::ILoad(slot)
        };
        self.emit(instruction, 0, 1);
    }

    pub fn store_local(&mut self, slot: u16, ty: &JvmType) {
        let instruction = if ty.is_reference() {
            Instruction::AStore(slot)
        } else {
            Instruction::IStore(slot)
        };
        self.emit(instruction, 1, 0);
    }

    // ==================== Constants and arithmetic ====================

    pub fn push_int(&mut self, value: i32) {
        self.emit(Instruction::PushInt(value), 0, 1);
    }

    pub fn push_string(&mut self, value: impl Into<String>) {
        self.emit(Instruction::PushString(value.into()), 0, 1);
    }

    pub fn iadd(&mut self) {
        self.emit(Instruction::IAdd, 2, 1);
    }

    pub fn pop(&mut self) {
        self.emit(Instruction::Pop, 1, 0);
    }

    pub fn dup(&mut self) {
        self.emit(Instruction::Dup, 1, 2);
    }

    pub fn nop(&mut self) {
        self.emit(Instruction::Nop, 0, 0);
    }

    // ==================== Objects and calls ====================

    pub fn new_instance(&mut self, class: impl Into<String>) {
        self.emit(Instruction::New(class.into()), 0, 1);
    }

    pub fn get_static(&mut self, field: FieldRef) {
        self.emit(Instruction::GetStatic(field), 0, 1);
    }

    pub fn put_static(&mut self, field: FieldRef) {
        self.emit(Instruction::PutStatic(field), 1, 0);
    }

    pub fn invoke_static(&mut self, method: MethodRef) {
        let pops = method.sig.param_slots();
        let pushes = method.sig.ret.size();
        self.emit(Instruction::InvokeStatic(method), pops, pushes);
    }

    pub fn invoke_virtual(&mut self, method: MethodRef) {
        let pops = method.sig.param_slots() + 1;
        let pushes = method.sig.ret.size();
        self.emit(Instruction::InvokeVirtual(method), pops, pushes);
    }

    pub fn invoke_special(&mut self, method: MethodRef) {
        let pops = method.sig.param_slots() + 1;
        let pushes = method.sig.ret.size();
        self.emit(Instruction::InvokeSpecial(method), pops, pushes);
    }

    // ==================== Returns ====================

    /// Return whatever the method's return type calls for
    pub fn return_value(&mut self) {
        match &self.sig.ret {
            JvmType::Void => self.emit(Instruction::Return, 0, 0),
            JvmType::Int => self.emit(Instruction::IReturn, 1, 0),
            _ => self.emit(Instruction::AReturn, 1, 0),
        }
        self.terminated = true;
    }

    /// Finish the body; a void method that falls off its end gets a `return`
    pub fn finish(mut self) -> Result<MethodInfo> {
        if !self.terminated {
            if self.sig.ret != JvmType::Void {
                return Err(Error::MissingReturn { function: self.name });
            }
            self.return_value();
        }
        Ok(MethodInfo {
            access: self.access,
            name: self.name,
            sig: self.sig,
            code: Code {
                max_stack: self.max_stack,
                max_locals: self.next_local,
                instructions: self.instructions,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::jvm::opcodes::access::ACC_PUBLIC;
    use pretty_assertions::assert_eq;

    fn assemble(instruction: Instruction) -> Vec<u8> {
        let mut pool = ConstantPool::new();
        let mut out = Vec::new();
        instruction.assemble(&mut pool, &mut out).unwrap();
        out
    }

    #[test]
    fn test_int_constant_encodings() {
        assert_eq!(assemble(Instruction::PushInt(-1)), vec![opcodes::ICONST_M1]);
        assert_eq!(assemble(Instruction::PushInt(5)), vec![0x08]);
        assert_eq!(assemble(Instruction::PushInt(100)), vec![opcodes::BIPUSH, 100]);
        assert_eq!(assemble(Instruction::PushInt(-128)), vec![opcodes::BIPUSH, 0x80]);
        assert_eq!(assemble(Instruction::PushInt(456)), vec![opcodes::SIPUSH, 0x01, 0xc8]);
        // Integer constant lands after nothing else in a fresh pool.
        assert_eq!(assemble(Instruction::PushInt(100_000)), vec![opcodes::LDC, 1]);
    }

    #[test]
    fn test_local_encodings() {
        assert_eq!(assemble(Instruction::ILoad(2)), vec![0x1c]);
        assert_eq!(assemble(Instruction::AStore(0)), vec![0x4b]);
        assert_eq!(assemble(Instruction::ALoad(7)), vec![opcodes::ALOAD, 7]);
        assert_eq!(assemble(Instruction::IStore(300)), vec![opcodes::WIDE, opcodes::ISTORE, 0x01, 0x2c]);
    }

    #[test]
    fn test_ldc_switches_to_wide_index() {
        let mut pool = ConstantPool::new();
        for i in 0..300 {
            pool.utf8(&format!("filler{}", i)).unwrap();
        }
        let mut out = Vec::new();
        Instruction::PushString("late".to_string()).assemble(&mut pool, &mut out).unwrap();
        assert_eq!(out[0], opcodes::LDC_W);
    }

    #[test]
    fn test_stack_and_locals_tracking() {
        let sig = MethodSig::new(vec![JvmType::Int], JvmType::Int);
        let mut builder = MethodBuilder::new(ACC_PUBLIC | ACC_STATIC, "f", sig);
        assert_eq!(builder.first_arg(), 0);
        assert_eq!(builder.first_local(), 1);

        let slot = builder.new_local(&JvmType::Int);
        assert_eq!(slot, 1);
        builder.push_int(1);
        builder.load_arg(0).unwrap();
        builder.iadd();
        builder.store_local(slot, &JvmType::Int);
        builder.load_local(slot, &JvmType::Int);
        builder.return_value();
        assert!(builder.is_terminated());

        let method = builder.finish().unwrap();
        assert_eq!(method.code.max_stack, 2);
        assert_eq!(method.code.max_locals, 2);
        assert_eq!(
            method.code.instructions,
            vec![
                Instruction::PushInt(1),
                Instruction::ILoad(0),
                Instruction::IAdd,
                Instruction::IStore(1),
                Instruction::ILoad(1),
                Instruction::IReturn,
            ]
        );
    }

    #[test]
    fn test_instance_methods_reserve_this() {
        let mut builder = MethodBuilder::new(ACC_PUBLIC, "toString", MethodSig::new(vec![], JvmType::string()));
        assert_eq!(builder.first_arg(), 1);
        builder.push_string("Bar");
        builder.return_value();
        let method = builder.finish().unwrap();
        assert_eq!(method.code.max_locals, 1);
        assert_eq!(method.code.instructions.last(), Some(&Instruction::AReturn));
    }

    #[test]
    fn test_finish_adds_implicit_void_return() {
        let builder = MethodBuilder::new(ACC_STATIC, "v", MethodSig::void());
        let method = builder.finish().unwrap();
        assert_eq!(method.code.instructions, vec![Instruction::Return]);

        let builder = MethodBuilder::new(ACC_STATIC, "i", MethodSig::new(vec![], JvmType::Int));
        assert!(matches!(builder.finish(), Err(Error::MissingReturn { ref function }) if function == "i"));
    }
}

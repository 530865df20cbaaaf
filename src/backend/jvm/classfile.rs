//! Class file structures and serialization
//!
//! Only what straight-line code needs: no `StackMapTable`, no exception
//! tables, no line numbers. The constant pool is built while the class is
//! written, so structures refer to constants by value, not by index.

use std::collections::HashMap;

use crate::backend::jvm::descriptor::{JvmType, MethodSig};
use crate::backend::jvm::method::Instruction;
use crate::utils::{Error, Result};

pub const MAGIC: u32 = 0xCAFE_BABE;

mod tags {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELDREF: u8 = 9;
    pub const METHODREF: u8 = 10;
    pub const NAME_AND_TYPE: u8 = 12;
}

/// A constant pool entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    NameAndType(u16, u16),
}

/// Encode a string in the class file's modified UTF-8
fn modified_utf8(value: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007f => bytes.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                bytes.push(0xc0 | (unit >> 6) as u8);
                bytes.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                bytes.push(0xe0 | (unit >> 12) as u8);
                bytes.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                bytes.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    bytes
}

impl Constant {
    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Constant::Utf8(value) => {
                let encoded = modified_utf8(value);
                let len = u16::try_from(encoded.len())
                    .map_err(|_| Error::CodeGen(format!("constant string too long ({} bytes)", encoded.len())))?;
                out.push(tags::UTF8);
                out.extend_from_slice(&len.to_be_bytes());
                out.extend_from_slice(&encoded);
            }
            Constant::Integer(value) => {
                out.push(tags::INTEGER);
                out.extend_from_slice(&value.to_be_bytes());
            }
            Constant::Class(name) => {
                out.push(tags::CLASS);
                out.extend_from_slice(&name.to_be_bytes());
            }
            Constant::String(utf8) => {
                out.push(tags::STRING);
                out.extend_from_slice(&utf8.to_be_bytes());
            }
            Constant::FieldRef(class, name_and_type) => {
                out.push(tags::FIELDREF);
                out.extend_from_slice(&class.to_be_bytes());
                out.extend_from_slice(&name_and_type.to_be_bytes());
            }
            Constant::MethodRef(class, name_and_type) => {
                out.push(tags::METHODREF);
                out.extend_from_slice(&class.to_be_bytes());
                out.extend_from_slice(&name_and_type.to_be_bytes());
            }
            Constant::NameAndType(name, descriptor) => {
                out.push(tags::NAME_AND_TYPE);
                out.extend_from_slice(&name.to_be_bytes());
                out.extend_from_slice(&descriptor.to_be_bytes());
            }
        }
        Ok(())
    }
}

/// Deduplicating constant pool; indices start at 1
#[derive(Debug, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    indices: HashMap<Constant, u16>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, constant: Constant) -> Result<u16> {
        if let Some(&index) = self.indices.get(&constant) {
            return Ok(index);
        }
        let index = u16::try_from(self.len() + 1)
            .ok()
            .filter(|&index| index < u16::MAX)
            .ok_or_else(|| Error::CodeGen("constant pool overflow".to_string()))?;
        self.constants.push(constant.clone());
        self.indices.insert(constant, index);
        Ok(index)
    }

    pub fn utf8(&mut self, value: &str) -> Result<u16> {
        self.add(Constant::Utf8(value.to_string()))
    }

    pub fn integer(&mut self, value: i32) -> Result<u16> {
        self.add(Constant::Integer(value))
    }

    pub fn class(&mut self, internal_name: &str) -> Result<u16> {
        let name = self.utf8(internal_name)?;
        self.add(Constant::Class(name))
    }

    pub fn string(&mut self, value: &str) -> Result<u16> {
        let utf8 = self.utf8(value)?;
        self.add(Constant::String(utf8))
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name = self.utf8(name)?;
        let descriptor = self.utf8(descriptor)?;
        self.add(Constant::NameAndType(name, descriptor))
    }

    pub fn field_ref(&mut self, field: &FieldRef) -> Result<u16> {
        let class = self.class(&field.owner)?;
        let name_and_type = self.name_and_type(&field.name, &field.ty.descriptor())?;
        self.add(Constant::FieldRef(class, name_and_type))
    }

    pub fn method_ref(&mut self, method: &MethodRef) -> Result<u16> {
        let class = self.class(&method.owner)?;
        let name_and_type = self.name_and_type(&method.name, &method.sig.descriptor())?;
        self.add(Constant::MethodRef(class, name_and_type))
    }

    /// Entries so far; the count written to the class file is one more
    fn len(&self) -> usize {
        self.constants.len()
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&((self.len() + 1) as u16).to_be_bytes());
        for constant in &self.constants {
            constant.write(out)?;
        }
        Ok(())
    }
}

/// Symbolic reference to a field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: String,
    pub name: String,
    pub ty: JvmType,
}

impl FieldRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, ty: JvmType) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            ty,
        }
    }
}

/// Symbolic reference to a method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: String,
    pub name: String,
    pub sig: MethodSig,
}

impl MethodRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, sig: MethodSig) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            sig,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub access: u16,
    pub name: String,
    pub ty: JvmType,
}

/// Body of a method, ready to assemble
#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub access: u16,
    pub name: String,
    pub sig: MethodSig,
    pub code: Code,
}

/// One row of an `InnerClasses` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassEntry {
    pub inner: String,
    pub outer: String,
    pub simple_name: String,
    pub access: u16,
}

/// A class under construction
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub access: u16,
    /// Internal name, e.g. `somelang/Foo$Bar`
    pub name: String,
    pub super_name: String,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub inner_classes: Vec<InnerClassEntry>,
    pub source_file: Option<String>,
}

impl ClassFile {
    pub fn new(access: u16, name: impl Into<String>, super_name: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            super_name: super_name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
            inner_classes: Vec::new(),
            source_file: None,
        }
    }

    /// Path of this class inside an archive
    pub fn entry_name(&self) -> String {
        format!("{}.class", self.name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Serialize with the given major version
    pub fn to_bytes(&self, major_version: u16) -> Result<Vec<u8>> {
        let mut pool = ConstantPool::new();
        let mut body = Vec::new();

        body.extend_from_slice(&self.access.to_be_bytes());
        body.extend_from_slice(&pool.class(&self.name)?.to_be_bytes());
        body.extend_from_slice(&pool.class(&self.super_name)?.to_be_bytes());
        // interfaces
        body.extend_from_slice(&0u16.to_be_bytes());

        body.extend_from_slice(&count(self.fields.len(), "fields")?.to_be_bytes());
        for field in &self.fields {
            body.extend_from_slice(&field.access.to_be_bytes());
            body.extend_from_slice(&pool.utf8(&field.name)?.to_be_bytes());
            body.extend_from_slice(&pool.utf8(&field.ty.descriptor())?.to_be_bytes());
            body.extend_from_slice(&0u16.to_be_bytes());
        }

        body.extend_from_slice(&count(self.methods.len(), "methods")?.to_be_bytes());
        for method in &self.methods {
            write_method(method, &mut pool, &mut body)?;
        }

        let mut attributes = Vec::new();
        if let Some(source) = &self.source_file {
            let source = pool.utf8(source)?.to_be_bytes();
            write_attribute(&mut pool, &mut attributes, "SourceFile", &source)?;
        }
        if !self.inner_classes.is_empty() {
            let mut payload = Vec::new();
            payload.extend_from_slice(&count(self.inner_classes.len(), "inner classes")?.to_be_bytes());
            for entry in &self.inner_classes {
                payload.extend_from_slice(&pool.class(&entry.inner)?.to_be_bytes());
                payload.extend_from_slice(&pool.class(&entry.outer)?.to_be_bytes());
                payload.extend_from_slice(&pool.utf8(&entry.simple_name)?.to_be_bytes());
                payload.extend_from_slice(&entry.access.to_be_bytes());
            }
            write_attribute(&mut pool, &mut attributes, "InnerClasses", &payload)?;
        }
        let attribute_count = self.source_file.is_some() as u16 + !self.inner_classes.is_empty() as u16;
        body.extend_from_slice(&attribute_count.to_be_bytes());
        body.extend_from_slice(&attributes);

        let mut out = Vec::with_capacity(body.len() + 256);
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&major_version.to_be_bytes());
        pool.write(&mut out)?;
        out.extend_from_slice(&body);
        Ok(out)
    }
}

fn count(len: usize, what: &str) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::CodeGen(format!("too many {} ({})", what, len)))
}

fn write_attribute(pool: &mut ConstantPool, out: &mut Vec<u8>, name: &str, payload: &[u8]) -> Result<()> {
    out.extend_from_slice(&pool.utf8(name)?.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

fn write_method(method: &MethodInfo, pool: &mut ConstantPool, out: &mut Vec<u8>) -> Result<()> {
    out.extend_from_slice(&method.access.to_be_bytes());
    out.extend_from_slice(&pool.utf8(&method.name)?.to_be_bytes());
    out.extend_from_slice(&pool.utf8(&method.sig.descriptor())?.to_be_bytes());
    // One attribute: Code
    out.extend_from_slice(&1u16.to_be_bytes());

    let mut bytecode = Vec::new();
    for instruction in &method.code.instructions {
        instruction.assemble(pool, &mut bytecode)?;
    }
    if bytecode.len() > u16::MAX as usize {
        return Err(Error::CodeGen(format!("method {} is too large", method.name)));
    }

    let mut payload = Vec::with_capacity(bytecode.len() + 12);
    payload.extend_from_slice(&method.code.max_stack.to_be_bytes());
    payload.extend_from_slice(&method.code.max_locals.to_be_bytes());
    payload.extend_from_slice(&(bytecode.len() as u32).to_be_bytes());
    payload.extend_from_slice(&bytecode);
    // exception table, attributes
    payload.extend_from_slice(&0u16.to_be_bytes());
    payload.extend_from_slice(&0u16.to_be_bytes());

    write_attribute(pool, out, "Code", &payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::jvm::opcodes::access::*;

    #[test]
    fn test_pool_is_one_based_and_deduplicated() {
        let mut pool = ConstantPool::new();
        let a = pool.utf8("a").unwrap();
        let b = pool.utf8("b").unwrap();
        assert_eq!((a, b), (1, 2));
        assert_eq!(pool.utf8("a").unwrap(), 1);

        let class = pool.class("a").unwrap();
        assert_eq!(class, 3);
        assert_eq!(pool.class("a").unwrap(), 3);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_member_refs_share_entries() {
        let mut pool = ConstantPool::new();
        let field = FieldRef::new("somelang/Foo$Bar", "INSTANCE", JvmType::reference("somelang/Foo$Bar"));
        let first = pool.field_ref(&field).unwrap();
        let again = pool.field_ref(&field).unwrap();
        assert_eq!(first, again);
        assert!(pool.constants.contains(&Constant::Utf8("INSTANCE".to_string())));
        assert!(pool.constants.contains(&Constant::Utf8("Lsomelang/Foo$Bar;".to_string())));
    }

    #[test]
    fn test_modified_utf8() {
        assert_eq!(modified_utf8("abc"), b"abc".to_vec());
        assert_eq!(modified_utf8("\0"), vec![0xc0, 0x80]);
        assert_eq!(modified_utf8("é"), "é".as_bytes().to_vec());
        // Supplementary characters become two three-byte surrogates.
        assert_eq!(modified_utf8("😀").len(), 6);
    }

    #[test]
    fn test_class_header() {
        let mut class = ClassFile::new(ACC_PUBLIC | ACC_SUPER, "somelang/Main", "java/lang/Object");
        class.methods.push(MethodInfo {
            access: ACC_PUBLIC | ACC_STATIC,
            name: "f".to_string(),
            sig: MethodSig::void(),
            code: Code {
                max_stack: 0,
                max_locals: 0,
                instructions: vec![Instruction::Return],
            },
        });
        let bytes = class.to_bytes(52).unwrap();
        assert_eq!(&bytes[0..4], &[0xca, 0xfe, 0xba, 0xbe]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 52]);
        assert_eq!(class.entry_name(), "somelang/Main.class");
        // The method body ends with `return` followed by empty tables.
        assert_eq!(&bytes[bytes.len() - 7..], &[0xb1, 0, 0, 0, 0, 0, 0]);
    }
}

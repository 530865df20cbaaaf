//! Mutable state threaded through JVM code generation
//!
//! Every "current X" field is set with [`CompilationContext::scoped`], which
//! restores the previous value when the closure returns, on success or
//! failure alike.

use std::collections::HashMap;

use crate::backend::jvm::classfile::ClassFile;
use crate::backend::jvm::descriptor::{internal_name, JvmType, MethodSig};
use crate::common::{FullyQualifiedName, ScopedFrames, SymbolTable, UnresolvedName};
use crate::types::TypeContext;
use crate::utils::{Error, Result};

/// A local variable bound in the symbol table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSlot {
    pub slot: u16,
    pub ty: JvmType,
}

pub struct CompilationContext<'a> {
    pub types: &'a TypeContext,
    pub current_file: Option<FullyQualifiedName>,
    pub current_data: Option<FullyQualifiedName>,
    pub current_function: Option<FullyQualifiedName>,
    /// Class receiving the methods being generated
    pub current_unit: Option<ClassFile>,
    /// Locals by their source name
    pub symbols: SymbolTable<UnresolvedName, LocalSlot>,
    /// Number of arguments per value constructor
    pub constructor_arity: HashMap<FullyQualifiedName, usize>,
    /// Finished classes, in generation order
    pub units: Vec<ClassFile>,
    method_sigs: HashMap<FullyQualifiedName, MethodSig>,
    type_handles: HashMap<FullyQualifiedName, JvmType>,
}

impl<'a> CompilationContext<'a> {
    pub fn new(types: &'a TypeContext) -> Self {
        Self {
            types,
            current_file: None,
            current_data: None,
            current_function: None,
            current_unit: None,
            symbols: SymbolTable::new(),
            constructor_arity: HashMap::new(),
            units: Vec::new(),
            method_sigs: HashMap::new(),
            type_handles: HashMap::new(),
        }
    }

    /// Run `f` with `field(self)` set to `value`, then put the old value back
    pub fn scoped<T, R>(
        &mut self,
        field: fn(&mut Self) -> &mut T,
        value: T,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let saved = std::mem::replace(field(self), value);
        let result = f(self);
        *field(self) = saved;
        result
    }

    /// JVM signature of a function, memoized per name
    pub fn method_sig(&mut self, fqn: &FullyQualifiedName) -> Result<MethodSig> {
        if let Some(sig) = self.method_sigs.get(fqn) {
            return Ok(sig.clone());
        }
        let sig = MethodSig::from_somelang(self.types.require(fqn)?)?;
        self.method_sigs.insert(fqn.clone(), sig.clone());
        Ok(sig)
    }

    /// JVM type of a named object type, memoized per name
    pub fn type_handle(&mut self, fqn: &FullyQualifiedName) -> Result<JvmType> {
        if let Some(ty) = self.type_handles.get(fqn) {
            return Ok(ty.clone());
        }
        let ty = JvmType::from_somelang(self.types.require(fqn)?)?;
        self.type_handles.insert(fqn.clone(), ty.clone());
        Ok(ty)
    }

    /// Internal name of the class declaring `fqn`
    pub fn owner_of(&self, fqn: &FullyQualifiedName) -> String {
        internal_name(&fqn.qualifying_segment())
    }

    pub fn arity_of(&self, ctor: &FullyQualifiedName) -> Result<usize> {
        self.constructor_arity
            .get(ctor)
            .copied()
            .ok_or_else(|| Error::UnknownValueConstructor { fqn: ctor.to_string() })
    }

    /// The class currently receiving methods
    pub fn unit_mut(&mut self) -> Result<&mut ClassFile> {
        self.current_unit
            .as_mut()
            .ok_or_else(|| Error::CodeGen("no class is being generated".to_string()))
    }

    /// Name of the function being generated, for error messages
    pub fn function_name(&self) -> String {
        self.current_function
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

impl ScopedFrames<UnresolvedName, LocalSlot> for CompilationContext<'_> {
    fn symbol_table(&mut self) -> &mut SymbolTable<UnresolvedName, LocalSlot> {
        &mut self.symbols
    }
}

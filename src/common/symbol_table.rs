//! Scoped symbol table
//!
//! A stack of binding frames. Lookups walk outward from the innermost
//! frame; an *opaque* frame is searched but nothing beyond it is, which is
//! how a function body hides the locals of whatever encloses it. A
//! *transparent* frame (a nested block) lets lookups fall through.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::utils::{Error, Result};

#[derive(Debug)]
struct Frame<K, V> {
    opaque: bool,
    bindings: HashMap<K, V>,
}

/// Stack of opaque/transparent binding frames
#[derive(Debug)]
pub struct SymbolTable<K, V> {
    frames: Vec<Frame<K, V>>,
}

impl<K: Eq + Hash, V> SymbolTable<K, V> {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn push_opaque(&mut self) {
        self.push(true);
    }

    pub fn push_transparent(&mut self) {
        self.push(false);
    }

    fn push(&mut self, opaque: bool) {
        self.frames.push(Frame {
            opaque,
            bindings: HashMap::new(),
        });
    }

    /// Drop the innermost frame and its bindings
    pub fn pop(&mut self) -> Result<()> {
        self.frames.pop().map(|_| ()).ok_or(Error::SymbolTableUnderflow)
    }

    /// Number of open frames
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Bind `key` in the innermost frame, returning any binding it shadows
    /// in that same frame
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| Error::CodeGen("symbol table has no open frame".to_string()))?;
        Ok(frame.bindings.insert(key, value))
    }

    /// Index of the frame that binds `key`, honoring opacity
    fn find_frame<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        for (idx, frame) in self.frames.iter().enumerate().rev() {
            if frame.bindings.contains_key(key) {
                return Some(idx);
            }
            if frame.opaque {
                break;
            }
        }
        None
    }

    pub fn lookup<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let idx = self.find_frame(key)?;
        self.frames[idx].bindings.get(key)
    }

    /// Look `key` up, binding `compute()` in the innermost frame if it is
    /// not visible
    pub fn lookup_or_insert(&mut self, key: K, compute: impl FnOnce() -> V) -> Result<&V> {
        let idx = match self.find_frame(&key) {
            Some(idx) => idx,
            None if self.frames.is_empty() => {
                return Err(Error::CodeGen("symbol table has no open frame".to_string()));
            }
            None => self.frames.len() - 1,
        };
        Ok(self.frames[idx].bindings.entry(key).or_insert_with(compute))
    }
}

impl<K: Eq + Hash, V> Default for SymbolTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything that owns a symbol table and opens frames around nested work
///
/// The frame is popped on every exit path, so a failing closure never
/// leaves the table unbalanced.
pub trait ScopedFrames<K: Eq + Hash, V> {
    fn symbol_table(&mut self) -> &mut SymbolTable<K, V>;

    fn with_frame<R>(&mut self, opaque: bool, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R>
    where
        Self: Sized,
    {
        self.symbol_table().push(opaque);
        let result = f(self);
        self.symbol_table().pop()?;
        result
    }

    fn with_opaque_frame<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R>
    where
        Self: Sized,
    {
        self.with_frame(true, f)
    }

    fn with_transparent_frame<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R>
    where
        Self: Sized,
    {
        self.with_frame(false, f)
    }
}

impl<K: Eq + Hash, V> ScopedFrames<K, V> for SymbolTable<K, V> {
    fn symbol_table(&mut self) -> &mut SymbolTable<K, V> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable<String, u16> {
        SymbolTable::new()
    }

    #[test]
    fn test_put_and_lookup() {
        let mut t = table();
        t.push_opaque();
        t.put("a".to_string(), 0).unwrap();
        assert_eq!(t.lookup("a"), Some(&0));
        assert_eq!(t.lookup("b"), None);
    }

    #[test]
    fn test_block_local_invisible_after_pop() {
        let mut t = table();
        t.push_opaque();
        t.push_transparent();
        t.put("inner".to_string(), 1).unwrap();
        assert_eq!(t.lookup("inner"), Some(&1));
        t.pop().unwrap();
        assert_eq!(t.lookup("inner"), None);
    }

    #[test]
    fn test_transparent_frames_see_enclosing_function() {
        let mut t = table();
        t.push_opaque();
        t.put("param".to_string(), 0).unwrap();
        t.push_transparent();
        t.push_transparent();
        assert_eq!(t.lookup("param"), Some(&0));
    }

    #[test]
    fn test_opaque_frame_hides_outer_bindings() {
        let mut t = table();
        t.push_opaque();
        t.put("outer".to_string(), 3).unwrap();
        t.push_opaque();
        assert_eq!(t.lookup("outer"), None);
        t.put("outer".to_string(), 9).unwrap();
        assert_eq!(t.lookup("outer"), Some(&9));
        t.pop().unwrap();
        assert_eq!(t.lookup("outer"), Some(&3));
    }

    #[test]
    fn test_shadowing_in_nested_frame() {
        let mut t = table();
        t.push_opaque();
        t.put("x".to_string(), 1).unwrap();
        t.push_transparent();
        t.put("x".to_string(), 2).unwrap();
        assert_eq!(t.lookup("x"), Some(&2));
        t.pop().unwrap();
        assert_eq!(t.lookup("x"), Some(&1));
    }

    #[test]
    fn test_lookup_or_insert() {
        let mut t = table();
        t.push_opaque();
        t.put("a".to_string(), 4).unwrap();
        t.push_transparent();
        assert_eq!(*t.lookup_or_insert("a".to_string(), || 99).unwrap(), 4);
        assert_eq!(*t.lookup_or_insert("b".to_string(), || 5).unwrap(), 5);
        t.pop().unwrap();
        assert_eq!(t.lookup("b"), None);
    }

    #[test]
    fn test_pop_underflow_is_an_error() {
        let mut t = table();
        assert!(matches!(t.pop(), Err(Error::SymbolTableUnderflow)));
        assert!(t.put("a".to_string(), 0).is_err());
    }

    #[test]
    fn test_scoped_frame_pops_on_error() {
        let mut t = table();
        let result: Result<()> = t.with_opaque_frame(|t| {
            t.put("a".to_string(), 0)?;
            Err(Error::EmptyBlock)
        });
        assert!(result.is_err());
        assert!(t.is_empty());

        let depth = t
            .with_transparent_frame(|t| {
                t.with_transparent_frame(|t| Ok(t.depth()))
            })
            .unwrap();
        assert_eq!(depth, 2);
        assert_eq!(t.depth(), 0);
    }
}

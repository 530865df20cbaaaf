//! Attribute framework
//!
//! Analysis passes hang typed metadata off tree nodes. Each kind of
//! metadata is named by an [`AttrDef`]; the definition itself is the key,
//! so two definitions that happen to share a name never collide.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use crate::utils::{Error, Result};

static NEXT_ATTR_KEY: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AttrKey(usize);

/// Definition of an attribute carrying values of type `A`
///
/// Definitions are usually `static` items. The key is allocated on first
/// use, so the definition must not be cloned (it isn't `Clone`).
pub struct AttrDef<A: 'static> {
    name: &'static str,
    key: OnceLock<usize>,
    _value: PhantomData<fn() -> A>,
}

impl<A: 'static> AttrDef<A> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            key: OnceLock::new(),
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn key(&self) -> AttrKey {
        AttrKey(*self.key.get_or_init(|| NEXT_ATTR_KEY.fetch_add(1, Ordering::Relaxed)))
    }
}

impl<A: 'static> fmt::Debug for AttrDef<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttrDef({})", self.name)
    }
}

/// A stored attribute value together with the name of its definition
pub struct AttrVal<A> {
    pub name: &'static str,
    pub value: A,
}

/// Type-erased view of an [`AttrVal`] that still knows its name
trait StoredAttr {
    fn name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

impl<A: 'static> StoredAttr for AttrVal<A> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Per-node attribute store: one value per definition, last write wins
#[derive(Default)]
pub struct Attributes {
    values: HashMap<AttrKey, Box<dyn StoredAttr>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<A: 'static>(&self, def: &AttrDef<A>) -> Option<&A> {
        self.values
            .get(&def.key())
            .and_then(|stored| stored.as_any().downcast_ref::<AttrVal<A>>())
            .map(|val| &val.value)
    }

    pub fn put<A: 'static>(&mut self, def: &AttrDef<A>, value: A) {
        let val = AttrVal { name: def.name(), value };
        self.values.insert(def.key(), Box::new(val));
    }

    pub fn contains<A: 'static>(&self, def: &AttrDef<A>) -> bool {
        self.values.contains_key(&def.key())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.values.values().map(|stored| stored.name()).collect();
        names.sort_unstable();
        f.debug_set().entries(names).finish()
    }
}

/// Anything that owns an attribute store
pub trait Attributable {
    fn attributes(&self) -> &Attributes;

    fn attributes_mut(&mut self) -> &mut Attributes;

    /// Short description used in error messages
    fn describe(&self) -> String;

    fn get_attribute<A: 'static>(&self, def: &AttrDef<A>) -> Option<&A> {
        self.attributes().get(def)
    }

    fn put_attribute<A: 'static>(&mut self, def: &AttrDef<A>, value: A) {
        self.attributes_mut().put(def, value);
    }

    /// Builder-style write
    fn with_attribute<A: 'static>(mut self, def: &AttrDef<A>, value: A) -> Self
    where
        Self: Sized,
    {
        self.put_attribute(def, value);
        self
    }

    /// Read an attribute that an earlier pass must have written
    fn require_attribute<A: 'static>(&self, def: &AttrDef<A>) -> Result<&A> {
        self.get_attribute(def).ok_or_else(|| Error::MissingAttribute {
            attribute: def.name(),
            node: self.describe(),
        })
    }
}

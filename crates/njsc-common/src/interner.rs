//! String interning.
//!
//! Property names, variable names, and operator symbols are interned once and
//! referenced everywhere else by a small copyable `Atom`. Interning makes name
//! comparison an integer comparison and keeps the type and term arenas free of
//! owned strings.

use dashmap::DashMap;
use std::sync::{Arc, RwLock};

/// An interned string, represented by its index in the owning [`Interner`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(pub u32);

/// Deduplicating string store.
///
/// The handle is cheaply cloneable and shares the underlying storage, so the
/// term store, the type store, and diagnostics can all resolve atoms without
/// threading lifetimes through every structure.
#[derive(Clone, Default)]
pub struct Interner {
    map: Arc<DashMap<Arc<str>, Atom>>,
    strings: Arc<RwLock<Vec<Arc<str>>>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its `Atom`. Idempotent: interning the same
    /// string twice returns the same atom.
    pub fn intern(&self, s: &str) -> Atom {
        if let Some(existing) = self.map.get(s) {
            return *existing;
        }
        let mut strings = self.strings.write().expect("interner lock poisoned");
        // re-check under the write lock; another clone of this handle may
        // have raced us to the insert
        if let Some(existing) = self.map.get(s) {
            return *existing;
        }
        let atom = Atom(u32::try_from(strings.len()).expect("interner overflow"));
        let arc: Arc<str> = Arc::from(s);
        strings.push(arc.clone());
        self.map.insert(arc, atom);
        atom
    }

    /// Resolve an atom back to its string.
    ///
    /// # Panics
    ///
    /// Panics if the atom was produced by a different interner.
    pub fn resolve(&self, atom: Atom) -> Arc<str> {
        let strings = self.strings.read().expect("interner lock poisoned");
        strings[atom.0 as usize].clone()
    }

    /// Number of distinct interned strings.
    pub fn len(&self) -> usize {
        self.strings.read().expect("interner lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_deduplicates() {
        let interner = Interner::new();
        let a = interner.intern("length");
        let b = interner.intern("length");
        let c = interner.intern("push");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(&*interner.resolve(a), "length");
        assert_eq!(&*interner.resolve(c), "push");
    }

    #[test]
    fn clones_share_storage() {
        let interner = Interner::new();
        let a = interner.intern("x");
        let clone = interner.clone();
        assert_eq!(clone.intern("x"), a);
        assert_eq!(&*clone.resolve(a), "x");
    }
}

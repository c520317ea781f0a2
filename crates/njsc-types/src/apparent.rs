//! Apparent members of built-in shapes.
//!
//! Strings and arrays expose a fixed catalog of properties (`length`,
//! `push`, `charAt`, ...). The original singletons with mutable property
//! caches are replaced by a catalog computed against the store on demand;
//! method types are interned like any other type, so repeated lookups are
//! deduplicated by the store itself.

use crate::store::TypeStore;
use crate::types::{TypeData, TypeId};
use njsc_common::Atom;

/// A property lookup failed on a shape that carries a fixed catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyNotFound {
    pub name: String,
}

impl std::fmt::Display for PropertyNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "property {} not found", self.name)
    }
}

impl std::error::Error for PropertyNotFound {}

const STRING_MEMBER_NAMES: &[&str] = &[
    "length",
    "substring",
    "charCodeAt",
    "charAt",
    "indexOf",
    "localeCompare",
    "concat",
];

const ARRAY_MEMBER_NAMES: &[&str] =
    &["length", "concat", "push", "shift", "pop", "reverse", "join"];

/// The names of the apparent members of `ty`. Objects and unknown indexables
/// report their own property lists; other shapes report their catalogs.
pub fn apparent_member_names(store: &TypeStore, ty: TypeId) -> Vec<Atom> {
    let interner = store.interner().clone();
    match store.lookup(ty) {
        TypeData::String => STRING_MEMBER_NAMES.iter().map(|n| interner.intern(n)).collect(),
        TypeData::Array(_) => ARRAY_MEMBER_NAMES.iter().map(|n| interner.intern(n)).collect(),
        TypeData::Object(shape) => shape.properties.iter().map(|p| p.name).collect(),
        TypeData::UnknownIndexable { properties, .. } => {
            properties.iter().map(|p| p.name).collect()
        }
        _ => Vec::new(),
    }
}

/// Look up the type of an apparent member, interning method types as needed.
///
/// Supports strings (fixed catalog), arrays (catalog parameterized by the
/// element type), objects, and unknown indexables (their accumulated
/// property lists).
pub fn apparent_member(
    store: &mut TypeStore,
    ty: TypeId,
    name: Atom,
) -> Result<TypeId, PropertyNotFound> {
    let not_found = |store: &TypeStore| PropertyNotFound {
        name: store.interner().resolve(name).to_string(),
    };
    match store.lookup(ty).clone() {
        TypeData::String => {
            let resolved = store.interner().resolve(name);
            match &*resolved {
                "length" => Ok(TypeId::INT),
                "substring" => {
                    Ok(store.attached_method(vec![TypeId::INT, TypeId::INT], TypeId::STRING))
                }
                "charCodeAt" => Ok(store.attached_method(vec![TypeId::INT], TypeId::INT)),
                "charAt" => Ok(store.attached_method(vec![TypeId::INT], TypeId::STRING)),
                "indexOf" => Ok(store.attached_method(vec![TypeId::STRING], TypeId::INT)),
                "localeCompare" => Ok(store.attached_method(vec![TypeId::STRING], TypeId::INT)),
                "concat" => Ok(store.attached_method(vec![TypeId::STRING], TypeId::STRING)),
                _ => Err(not_found(store)),
            }
        }
        TypeData::Array(elem) => {
            let resolved = store.interner().resolve(name);
            match &*resolved {
                "length" => Ok(TypeId::INT),
                "concat" => {
                    let arr = store.array(elem);
                    Ok(store.attached_method(Vec::new(), arr))
                }
                "push" => Ok(store.attached_method(vec![elem], TypeId::INT)),
                "shift" | "pop" => Ok(store.attached_method(Vec::new(), elem)),
                "reverse" => {
                    let arr = store.array(elem);
                    Ok(store.attached_method(Vec::new(), arr))
                }
                "join" => Ok(store.attached_method(vec![TypeId::STRING], TypeId::STRING)),
                _ => Err(not_found(store)),
            }
        }
        TypeData::Object(shape) => shape
            .property(name)
            .map(|p| p.ty)
            .ok_or_else(|| not_found(store)),
        TypeData::UnknownIndexable { properties, .. } => properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.ty)
            .ok_or_else(|| not_found(store)),
        _ => Err(not_found(store)),
    }
}

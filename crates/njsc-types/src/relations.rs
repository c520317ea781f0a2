//! The subtype relation and the coarse lattice bounds derived from it.
//!
//! These relations are used in three places: the operator-overload table
//! (case filtering and bound folding), the load-time validation of that
//! table, and the final solution checks. The solver's own propagation goes
//! through the lattice operators instead, which also thread causes and
//! equate nested type variables.

use crate::apparent::apparent_member_names;
use crate::store::TypeStore;
use crate::types::{TypeData, TypeId};

/// Reference types: objects, code, all indexables (strings included), and
/// the two reference lattice extremes.
pub fn is_ref_type(store: &TypeStore, id: TypeId) -> bool {
    matches!(
        store.lookup(id),
        TypeData::Object(_)
            | TypeData::ObjectUnion(_)
            | TypeData::Array(_)
            | TypeData::Map(_)
            | TypeData::String
            | TypeData::UnknownIndexable { .. }
            | TypeData::Function(_)
            | TypeData::Constructor { .. }
            | TypeData::AttachedMethod(_)
            | TypeData::UnattachedMethod { .. }
            | TypeData::TopRef
            | TypeData::BottomRef
    )
}

/// `sub <: sup` on fully-interned types.
///
/// Object subtyping requires every supertype property to be present on the
/// subtype with an equal type and an equally strong or stronger permission.
/// MRO/MRW reasoning is deliberately absent here; it lives in the solver.
pub fn is_subtype(store: &TypeStore, sub: TypeId, sup: TypeId) -> bool {
    if sub == sup {
        return true;
    }
    match (store.lookup(sub), store.lookup(sup)) {
        (TypeData::Int, TypeData::Float) => true,
        (_, TypeData::TopRef) if is_ref_type(store, sub) => true,
        (TypeData::BottomRef, _) if is_ref_type(store, sup) => true,
        (TypeData::Object(sub_shape), TypeData::Object(sup_shape)) => {
            sup_shape.properties.iter().all(|sup_prop| {
                match sub_shape.property(sup_prop.name) {
                    Some(sub_prop) => {
                        sub_prop.ty == sup_prop.ty && !(sup_prop.is_rw() && sub_prop.is_ro())
                    }
                    None => false,
                }
            })
        }
        _ => false,
    }
}

/// Slightly widened subtype check for overload-table filtering: a primitive
/// passes an object bound when all the object's properties resolve on the
/// primitive, and a string passes an unknown-indexable bound.
pub fn is_subtypeish(store: &TypeStore, sub: TypeId, sup: TypeId) -> bool {
    if is_subtype(store, sub, sup) {
        return true;
    }
    match (store.lookup(sub), store.lookup(sup)) {
        (data, TypeData::Object(shape)) if data.is_primitive() => {
            let members = apparent_member_names(store, sub);
            shape.properties.iter().all(|p| members.contains(&p.name))
        }
        (TypeData::String, TypeData::UnknownIndexable { .. }) => true,
        _ => false,
    }
}

/// Approximate least upper bound; tight for primitive types.
pub fn coarse_upper_bound(store: &TypeStore, t1: TypeId, t2: TypeId) -> TypeId {
    if is_subtype(store, t1, t2) {
        t2
    } else if is_subtype(store, t2, t1) {
        t1
    } else {
        TypeId::TOP
    }
}

/// Approximate greatest lower bound; tight for primitive types.
pub fn coarse_lower_bound(store: &TypeStore, t1: TypeId, t2: TypeId) -> TypeId {
    if is_subtype(store, t1, t2) {
        t1
    } else if is_subtype(store, t2, t1) {
        t2
    } else {
        TypeId::BOTTOM
    }
}

/// The lowest non-bottom subtype of `t`.
///
/// Used as the tie-break when a term has no lower-bound evidence: assigning
/// the upper bound directly can force sibling terms that copy into this one
/// to adopt a supertype they don't need. For reference types the honest
/// answer would be `BottomRef`, but the backend cannot represent it, so the
/// caller substitutes a fresh empty object for `TopRef` results.
pub fn lowest_subtype(store: &TypeStore, t: TypeId) -> TypeId {
    match store.lookup(t) {
        TypeData::Float => TypeId::INT,
        _ => t,
    }
}

/// Recognize the builtin `Array` constructor value: an intersection of three
/// function cases each returning an array.
pub fn is_array_builtin(store: &TypeStore, t: TypeId) -> bool {
    let TypeData::Intersection(cases) = store.lookup(t) else {
        return false;
    };
    cases.len() == 3
        && cases.iter().all(|case| match store.lookup(*case) {
            TypeData::Function(sig) => matches!(store.lookup(sig.ret), TypeData::Array(_)),
            _ => false,
        })
}

/// Recognize the builtin `String` constructor value: a three-case
/// intersection whose first case is an object exposing `fromCharCode`.
pub fn is_string_builtin(store: &TypeStore, t: TypeId) -> bool {
    let TypeData::Intersection(cases) = store.lookup(t) else {
        return false;
    };
    if cases.len() != 3 {
        return false;
    }
    match store.lookup(cases[0]) {
        TypeData::Object(shape) => {
            let from_char_code = store.interner().intern("fromCharCode");
            shape.has_property(from_char_code)
        }
        _ => false,
    }
}

/// Whether a type may be invoked with `new`. `Array` and `String` are
/// builtin intersections rather than constructor types, so they are
/// special-cased.
pub fn usable_as_constructor(store: &TypeStore, t: TypeId) -> bool {
    matches!(store.lookup(t), TypeData::Constructor { .. })
        || is_array_builtin(store, t)
        || is_string_builtin(store, t)
}

//! Type algebra for the njsc type-inference core.
//!
//! Types are interned: every distinct type structure is stored once in a
//! [`TypeStore`] and referenced by a copyable [`TypeId`]. This gives:
//!
//! - O(1) structural equality via `TypeId` comparison
//! - Safe use of types as cache and map keys (no mutable hash keys)
//! - Cheap sharing of nested types across object shapes and signatures
//!
//! "Mutating" a type (e.g. resolving an array literal's element type once it
//! is discovered) means interning a new type and rebinding the owning slot;
//! the type data itself is immutable forever.

pub mod apparent;
pub mod format;
pub mod relations;
pub mod store;
pub mod types;

pub use apparent::{PropertyNotFound, apparent_member, apparent_member_names};
pub use format::display_type;
pub use relations::{
    coarse_lower_bound, coarse_upper_bound, is_array_builtin, is_ref_type, is_string_builtin,
    is_subtype, is_subtypeish, lowest_subtype, usable_as_constructor,
};
pub use store::TypeStore;
pub use types::{
    ObjectShape, Property, RepresentationSort, Signature, TypeData, TypeId, TypeVarId,
};

#[cfg(test)]
#[path = "../tests/types_tests.rs"]
mod tests;

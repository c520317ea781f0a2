//! The closed set of type shapes.
//!
//! `TypeData` is the full, closed type algebra of the inference core. Every
//! shape reports a [`RepresentationSort`] consumed by the backend for value
//! encoding; that classification must be preserved exactly.

use njsc_common::{Atom, SourceLocation};

/// An interned type, identified by its index in the owning
/// [`TypeStore`](crate::TypeStore).
///
/// Two `TypeId`s are equal exactly when the types are structurally equal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    // Intrinsics are interned first, in a fixed order, by `TypeStore::new`.
    pub const BOTTOM: Self = Self(0);
    pub const TOP: Self = Self(1);
    pub const INT: Self = Self(2);
    pub const FLOAT: Self = Self(3);
    pub const BOOL: Self = Self(4);
    pub const STRING: Self = Self(5);
    pub const VOID: Self = Self(6);
    pub const ANY: Self = Self(7);
    pub const TOP_REF: Self = Self(8);
    pub const BOTTOM_REF: Self = Self(9);
}

/// A solver type variable. Variables are placeholders introduced during
/// constraint normalization and resolved by substitution after the fixed
/// point converges.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(pub u32);

/// The runtime value-encoding category a type maps to, consumed by the
/// backend when choosing representations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RepresentationSort {
    Int,
    Bool,
    String,
    Float,
    /// Objects, arrays, maps, object unions.
    Object,
    /// Functions, constructors, and both method variants.
    Code,
    TopRef,
    /// Physically manifest but never treated as a general value
    /// (environment-provided iterator-like values).
    NeverBoxed,
    /// Types that never describe runtime values (void, top, variables).
    Unrepresentable,
}

/// One property of an object shape: a name, a type, a permission, and
/// optionally the source location of the read or write that introduced it.
///
/// `read_only` distinguishes inherited (RO) properties from own (RW) ones.
/// Equality and hashing are structural, including the location.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Property {
    pub name: Atom,
    pub ty: TypeId,
    pub read_only: bool,
    pub loc: Option<SourceLocation>,
}

impl Property {
    pub fn new(name: Atom, ty: TypeId, read_only: bool) -> Self {
        Self { name, ty, read_only, loc: None }
    }

    pub fn with_loc(name: Atom, ty: TypeId, read_only: bool, loc: Option<SourceLocation>) -> Self {
        Self { name, ty, read_only, loc }
    }

    pub fn is_ro(&self) -> bool {
        self.read_only
    }

    pub fn is_rw(&self) -> bool {
        !self.read_only
    }
}

/// Parameter and return types of any code shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

impl Signature {
    pub fn new(params: Vec<TypeId>, ret: TypeId) -> Self {
        Self { params, ret }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// An object shape: an optional prototype parent (always a type variable
/// while solving) and an ordered property list.
///
/// Own vs. inherited properties share one list, distinguished by the
/// `read_only` flag: own properties are RW, inherited ones RO. A name is
/// never present twice; when an own and an inherited property collide during
/// construction, the own (RW) property wins.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectShape {
    pub prototype_parent: Option<TypeId>,
    pub properties: Vec<Property>,
}

impl ObjectShape {
    pub fn property(&self, name: Atom) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn has_property(&self, name: Atom) -> bool {
        self.property(name).is_some()
    }

    pub fn has_own_property(&self, name: Atom) -> bool {
        self.property(name).is_some_and(Property::is_rw)
    }

    pub fn has_inherited_property(&self, name: Atom) -> bool {
        self.property(name).is_some_and(Property::is_ro)
    }

    pub fn own_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(|p| p.is_rw())
    }

    pub fn inherited_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(|p| p.is_ro())
    }
}

/// The closed, recursive type algebra.
///
/// Nested types are referenced by `TypeId`, so the data is acyclic by
/// construction; recursion through the type structure is expressed with
/// `Var` placeholders resolved after solving.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Int,
    Float,
    Bool,
    String,
    Void,
    Any,
    Top,
    Bottom,
    /// Supertype of every reference type.
    TopRef,
    /// Subtype of every reference type; the lower bound of null-like terms.
    BottomRef,
    Var(TypeVarId),
    Object(ObjectShape),
    Array(TypeId),
    Map(TypeId),
    Function(Signature),
    Constructor {
        sig: Signature,
        prototype: Option<TypeId>,
    },
    AttachedMethod(Signature),
    UnattachedMethod {
        sig: Signature,
        receiver: TypeId,
    },
    /// Overloaded builtins: a value usable at several code/object shapes.
    Intersection(Vec<TypeId>),
    /// Deferred object join; must be merged away before a solution is
    /// emitted.
    ObjectUnion(Vec<TypeId>),
    /// An indexable value (array, map, or string) whose concrete shape is
    /// not yet known. A placeholder only; never part of a final solution.
    UnknownIndexable {
        key: TypeId,
        elem: TypeId,
        properties: Vec<Property>,
    },
}

impl TypeData {
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Bool | Self::String)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Functions, constructors, and both method variants.
    pub fn is_code(&self) -> bool {
        matches!(
            self,
            Self::Function(_)
                | Self::Constructor { .. }
                | Self::AttachedMethod(_)
                | Self::UnattachedMethod { .. }
        )
    }

    pub fn is_method(&self) -> bool {
        matches!(self, Self::AttachedMethod(_) | Self::UnattachedMethod { .. })
    }

    /// Arrays, maps, strings, and the unknown-indexable placeholder.
    pub fn is_indexable(&self) -> bool {
        matches!(
            self,
            Self::Array(_) | Self::Map(_) | Self::String | Self::UnknownIndexable { .. }
        )
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Self::Var(_))
    }

    /// The signature of any code shape.
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Self::Function(sig)
            | Self::Constructor { sig, .. }
            | Self::AttachedMethod(sig)
            | Self::UnattachedMethod { sig, .. } => Some(sig),
            _ => None,
        }
    }

    /// The representation sort consumed by the backend.
    pub fn rep(&self) -> RepresentationSort {
        match self {
            Self::Int => RepresentationSort::Int,
            Self::Float => RepresentationSort::Float,
            Self::Bool => RepresentationSort::Bool,
            Self::String => RepresentationSort::String,
            Self::Object(_)
            | Self::Array(_)
            | Self::Map(_)
            | Self::ObjectUnion(_)
            | Self::UnknownIndexable { .. } => RepresentationSort::Object,
            Self::Function(_)
            | Self::Constructor { .. }
            | Self::AttachedMethod(_)
            | Self::UnattachedMethod { .. } => RepresentationSort::Code,
            Self::TopRef => RepresentationSort::TopRef,
            Self::Void | Self::Any | Self::Top | Self::Bottom | Self::BottomRef | Self::Var(_) => {
                RepresentationSort::Unrepresentable
            }
            // Intersections are representable only when every case shares a
            // sort; the cases in use are intersections of code shapes.
            Self::Intersection(_) => RepresentationSort::Unrepresentable,
        }
    }
}

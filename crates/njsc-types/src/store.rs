//! Type interning and storage.
//!
//! The `TypeStore` deduplicates structurally equal types: interning the same
//! shape twice returns the same `TypeId`. All type construction goes through
//! the store so the invariants of each shape (property ordering, RW-wins
//! collisions) are established exactly once.

use crate::types::{
    ObjectShape, Property, RepresentationSort, Signature, TypeData, TypeId, TypeVarId,
};
use njsc_common::Interner;
use rustc_hash::FxHashMap;
use tracing::trace;

pub struct TypeStore {
    data: Vec<TypeData>,
    dedup: FxHashMap<TypeData, TypeId>,
    interner: Interner,
}

impl TypeStore {
    /// Create a store with the intrinsic types pre-registered at the fixed
    /// `TypeId` constants.
    pub fn new(interner: Interner) -> Self {
        let mut store = Self {
            data: Vec::new(),
            dedup: FxHashMap::default(),
            interner,
        };
        // order must match the TypeId constants
        for intrinsic in [
            TypeData::Bottom,
            TypeData::Top,
            TypeData::Int,
            TypeData::Float,
            TypeData::Bool,
            TypeData::String,
            TypeData::Void,
            TypeData::Any,
            TypeData::TopRef,
            TypeData::BottomRef,
        ] {
            store.intern(intrinsic);
        }
        debug_assert_eq!(store.lookup(TypeId::BOTTOM_REF), &TypeData::BottomRef);
        store
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Intern a type, returning the id of the existing copy when the same
    /// structure was interned before.
    pub fn intern(&mut self, data: TypeData) -> TypeId {
        if let Some(existing) = self.dedup.get(&data) {
            return *existing;
        }
        let id = TypeId(u32::try_from(self.data.len()).expect("type store overflow"));
        trace!(id = id.0, ?data, "interning type");
        self.data.push(data.clone());
        self.dedup.insert(data, id);
        id
    }

    pub fn lookup(&self, id: TypeId) -> &TypeData {
        &self.data[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // -------------------------------------------------------------------------
    // Constructors
    // -------------------------------------------------------------------------

    pub fn var(&mut self, v: TypeVarId) -> TypeId {
        self.intern(TypeData::Var(v))
    }

    /// An object from a single mixed property list. Properties are sorted by
    /// name; duplicate names are an invariant violation.
    pub fn object(&mut self, mut properties: Vec<Property>) -> TypeId {
        properties.sort_by_key(|p| p.name);
        debug_assert!(
            properties.windows(2).all(|w| w[0].name != w[1].name),
            "duplicate property name in object shape"
        );
        self.intern(TypeData::Object(ObjectShape { prototype_parent: None, properties }))
    }

    /// An object from separate own (RW) and inherited (RO) lists. An own
    /// property takes precedence over an inherited one of the same name.
    pub fn object_parts(
        &mut self,
        prototype_parent: Option<TypeId>,
        own: Vec<Property>,
        inherited: Vec<Property>,
    ) -> TypeId {
        debug_assert!(own.iter().all(Property::is_rw), "own properties must be RW");
        debug_assert!(inherited.iter().all(Property::is_ro), "inherited properties must be RO");
        let mut properties = own;
        for p in inherited {
            if !properties.iter().any(|q| q.name == p.name) {
                properties.push(p);
            }
        }
        properties.sort_by_key(|p| p.name);
        self.intern(TypeData::Object(ObjectShape { prototype_parent, properties }))
    }

    pub fn empty_object(&mut self) -> TypeId {
        self.object(Vec::new())
    }

    pub fn array(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeData::Array(elem))
    }

    pub fn map(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeData::Map(elem))
    }

    pub fn function(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        self.intern(TypeData::Function(Signature::new(params, ret)))
    }

    pub fn constructor(
        &mut self,
        params: Vec<TypeId>,
        ret: TypeId,
        prototype: Option<TypeId>,
    ) -> TypeId {
        self.intern(TypeData::Constructor { sig: Signature::new(params, ret), prototype })
    }

    pub fn attached_method(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        self.intern(TypeData::AttachedMethod(Signature::new(params, ret)))
    }

    pub fn unattached_method(
        &mut self,
        params: Vec<TypeId>,
        ret: TypeId,
        receiver: TypeId,
    ) -> TypeId {
        self.intern(TypeData::UnattachedMethod { sig: Signature::new(params, ret), receiver })
    }

    pub fn intersection(&mut self, cases: Vec<TypeId>) -> TypeId {
        self.intern(TypeData::Intersection(cases))
    }

    pub fn object_union(&mut self, cases: Vec<TypeId>) -> TypeId {
        debug_assert!(
            cases.iter().all(|c| self.lookup(*c).is_object()),
            "object union cases must be object types"
        );
        self.intern(TypeData::ObjectUnion(cases))
    }

    pub fn unknown_indexable(
        &mut self,
        key: TypeId,
        elem: TypeId,
        mut properties: Vec<Property>,
    ) -> TypeId {
        properties.sort_by_key(|p| p.name);
        self.intern(TypeData::UnknownIndexable { key, elem, properties })
    }

    // -------------------------------------------------------------------------
    // Shape accessors and rebuilders
    // -------------------------------------------------------------------------

    pub fn object_shape(&self, id: TypeId) -> Option<&ObjectShape> {
        match self.lookup(id) {
            TypeData::Object(shape) => Some(shape),
            _ => None,
        }
    }

    /// Rebuild an object with one property slot replaced (or added, as RW).
    pub fn object_with_property(
        &mut self,
        obj: TypeId,
        name: njsc_common::Atom,
        ty: TypeId,
        read_only: bool,
    ) -> TypeId {
        let shape = self.object_shape(obj).expect("not an object type").clone();
        let mut properties = shape.properties;
        match properties.iter_mut().find(|p| p.name == name) {
            Some(p) => {
                p.ty = ty;
                p.read_only = read_only;
            }
            None => properties.push(Property::new(name, ty, read_only)),
        }
        properties.sort_by_key(|p| p.name);
        self.intern(TypeData::Object(ObjectShape {
            prototype_parent: shape.prototype_parent,
            properties,
        }))
    }

    /// The representation sort of an interned type, refining intersections
    /// to their shared sort when every case agrees.
    pub fn rep_of(&self, id: TypeId) -> RepresentationSort {
        match self.lookup(id) {
            TypeData::Intersection(cases) => {
                let mut sorts = cases.iter().map(|c| self.rep_of(*c));
                match sorts.next() {
                    Some(first) if sorts.all(|s| s == first) => first,
                    _ => RepresentationSort::Unrepresentable,
                }
            }
            other => other.rep(),
        }
    }
}

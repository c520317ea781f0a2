//! The term model.
//!
//! A term is one node of the constraint graph: a program variable, a
//! property access, a function parameter, an operator application, a
//! literal, and so on. Terms are interned by structural identity in the
//! `TermStore` (the "term factory" handed over by the constraint
//! generator), so re-requesting the same access yields the same `TermId`.
//!
//! The solver never mutates term structure. The only mutable state a term
//! carries is its declared/solved type slot, which constraint normalization
//! rebinds when it replaces `Any` holes with fresh type variables and which
//! solution extraction fills in at the end.

use bitflags::bitflags;
use njsc_common::{Atom, Interner};
use njsc_types::{TypeData, TypeId, TypeStore, TypeVarId, display_type};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// An interned term, identified by its index in the owning [`TermStore`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(pub u32);

bitflags! {
    /// Generator-provided facts about a term that are not derivable from
    /// its structure.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct TermFlags: u8 {
        /// The term is a `null`/`undefined` literal or a void-typed
        /// operation. Such terms get a `BottomRef` lower bound, and
        /// subtype constraints with them on the left are treated as
        /// equalities.
        const NULL_LIKE = 1 << 0;
        /// The term is a number or string literal expression, which can
        /// never hold a method.
        const PRIMITIVE_LITERAL = 1 << 1;
    }
}

/// Structural identity of a term.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TermData {
    /// A named program variable.
    Var(Atom),
    /// `base.name`
    PropertyAccess { base: TermId, name: Atom },
    /// Parameter `index` of `func` at call/definition arity `arity`.
    FunctionParam { func: TermId, index: u32, arity: u32 },
    /// Return of `func` at arity `arity`.
    FunctionReturn { func: TermId, arity: u32 },
    /// `base[i]` element view.
    Indexed(TermId),
    /// The key type of an indexed access on `base`.
    Key(TermId),
    /// A call expression; `is_new` for constructor invocations.
    FunctionCall { target: TermId, is_new: bool },
    /// An infix operator application.
    Operator { op: Atom, left: TermId, right: TermId },
    /// A unary operator application.
    UnaryOperator { op: Atom, operand: TermId, prefix: bool },
    /// A term standing for a fixed type (literal types, synthesized
    /// single-property objects, builtin signatures).
    TypeConstant(TypeId),
    /// Object/array/map literals and function definitions; distinct
    /// occurrences are distinct terms, numbered by the store.
    ObjectLiteral(u32),
    ArrayLiteral(u32),
    MapLiteral(u32),
    FunctionLiteral(u32),
    /// A declaration imported from the environment, with a fixed type.
    EnvironmentDecl(Atom),
    /// `this` inside function number `id`.
    This { id: u32, in_constructor: bool },
    /// `term.prototype` where `term` is (expected to be) a constructor.
    Proto(TermId),
    /// The prototype parent of an object under construction.
    ProtoParent(TermId),
    /// The receiver of an unattached method value.
    MethodReceiver { func: TermId },
    /// The term standing for a solver type variable.
    TypeVar(TypeVarId),
    /// A type parameter of a builtin generic signature.
    TypeParam(Atom),
}

/// Interning store for terms, plus their per-term mutable slots.
pub struct TermStore {
    interner: Interner,
    data: Vec<TermData>,
    dedup: FxHashMap<TermData, TermId>,
    types: Vec<Option<TypeId>>,
    lines: Vec<Option<u32>>,
    flags: Vec<TermFlags>,
    next_type_var: u32,
    next_literal: u32,
}

impl TermStore {
    pub fn new(interner: Interner) -> Self {
        Self {
            interner,
            data: Vec::new(),
            dedup: FxHashMap::default(),
            types: Vec::new(),
            lines: Vec::new(),
            flags: Vec::new(),
            next_type_var: 0,
            next_literal: 0,
        }
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Intern a term. Idempotent for structurally identical terms.
    pub fn intern(&mut self, data: TermData) -> TermId {
        if let Some(existing) = self.dedup.get(&data) {
            return *existing;
        }
        let id = TermId(u32::try_from(self.data.len()).expect("term store overflow"));
        self.data.push(data.clone());
        self.dedup.insert(data, id);
        self.types.push(None);
        self.lines.push(None);
        self.flags.push(TermFlags::default());
        id
    }

    pub fn data(&self, id: TermId) -> &TermData {
        &self.data[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocate a fresh solver type variable.
    pub fn fresh_type_var(&mut self) -> TypeVarId {
        let v = TypeVarId(self.next_type_var);
        self.next_type_var += 1;
        v
    }

    // -------------------------------------------------------------------------
    // Factory methods
    // -------------------------------------------------------------------------

    pub fn var(&mut self, name: &str) -> TermId {
        let name = self.interner.intern(name);
        self.intern(TermData::Var(name))
    }

    pub fn property_access(&mut self, base: TermId, name: Atom) -> TermId {
        self.intern(TermData::PropertyAccess { base, name })
    }

    pub fn function_param(&mut self, func: TermId, index: u32, arity: u32) -> TermId {
        self.intern(TermData::FunctionParam { func, index, arity })
    }

    pub fn function_return(&mut self, func: TermId, arity: u32) -> TermId {
        self.intern(TermData::FunctionReturn { func, arity })
    }

    pub fn indexed(&mut self, base: TermId) -> TermId {
        self.intern(TermData::Indexed(base))
    }

    pub fn key(&mut self, base: TermId) -> TermId {
        self.intern(TermData::Key(base))
    }

    pub fn function_call(&mut self, target: TermId, is_new: bool) -> TermId {
        self.intern(TermData::FunctionCall { target, is_new })
    }

    pub fn operator(&mut self, op: &str, left: TermId, right: TermId) -> TermId {
        let op = self.interner.intern(op);
        self.intern(TermData::Operator { op, left, right })
    }

    pub fn unary_operator(&mut self, op: &str, operand: TermId, prefix: bool) -> TermId {
        let op = self.interner.intern(op);
        self.intern(TermData::UnaryOperator { op, operand, prefix })
    }

    /// The term standing for a fixed type. Its declared type slot is the
    /// type itself.
    pub fn type_constant(&mut self, ty: TypeId) -> TermId {
        let id = self.intern(TermData::TypeConstant(ty));
        self.types[id.0 as usize] = Some(ty);
        id
    }

    /// The term standing for a solver type variable.
    pub fn type_var_term(&mut self, v: TypeVarId, var_ty: TypeId) -> TermId {
        let id = self.intern(TermData::TypeVar(v));
        if self.types[id.0 as usize].is_none() {
            self.types[id.0 as usize] = Some(var_ty);
        }
        id
    }

    pub fn object_literal(&mut self, declared: TypeId) -> TermId {
        let n = self.next_literal;
        self.next_literal += 1;
        let id = self.intern(TermData::ObjectLiteral(n));
        self.types[id.0 as usize] = Some(declared);
        id
    }

    pub fn array_literal(&mut self, declared: TypeId) -> TermId {
        let n = self.next_literal;
        self.next_literal += 1;
        let id = self.intern(TermData::ArrayLiteral(n));
        self.types[id.0 as usize] = Some(declared);
        id
    }

    pub fn map_literal(&mut self, declared: TypeId) -> TermId {
        let n = self.next_literal;
        self.next_literal += 1;
        let id = self.intern(TermData::MapLiteral(n));
        self.types[id.0 as usize] = Some(declared);
        id
    }

    pub fn function_literal(&mut self, declared: TypeId) -> TermId {
        let n = self.next_literal;
        self.next_literal += 1;
        let id = self.intern(TermData::FunctionLiteral(n));
        self.types[id.0 as usize] = Some(declared);
        id
    }

    pub fn environment_decl(&mut self, name: &str, declared: TypeId) -> TermId {
        let name = self.interner.intern(name);
        let id = self.intern(TermData::EnvironmentDecl(name));
        self.types[id.0 as usize] = Some(declared);
        id
    }

    pub fn this(&mut self, id: u32, in_constructor: bool) -> TermId {
        self.intern(TermData::This { id, in_constructor })
    }

    pub fn proto(&mut self, base: TermId) -> TermId {
        self.intern(TermData::Proto(base))
    }

    pub fn proto_parent(&mut self, base: TermId) -> TermId {
        self.intern(TermData::ProtoParent(base))
    }

    pub fn method_receiver(&mut self, func: TermId) -> TermId {
        self.intern(TermData::MethodReceiver { func })
    }

    pub fn type_param(&mut self, name: &str) -> TermId {
        let name = self.interner.intern(name);
        self.intern(TermData::TypeParam(name))
    }

    // -------------------------------------------------------------------------
    // Per-term slots
    // -------------------------------------------------------------------------

    pub fn type_of(&self, id: TermId) -> Option<TypeId> {
        self.types[id.0 as usize]
    }

    /// Rebind the declared/solved type slot of a term.
    pub fn set_type(&mut self, id: TermId, ty: TypeId) {
        self.types[id.0 as usize] = Some(ty);
    }

    pub fn line(&self, id: TermId) -> Option<u32> {
        self.lines[id.0 as usize]
    }

    pub fn set_line(&mut self, id: TermId, line: u32) {
        self.lines[id.0 as usize] = Some(line);
    }

    pub fn flags(&self, id: TermId) -> TermFlags {
        self.flags[id.0 as usize]
    }

    pub fn add_flags(&mut self, id: TermId, flags: TermFlags) {
        self.flags[id.0 as usize] |= flags;
    }

    /// Null/undefined literals and void-typed operations.
    pub fn is_null_like(&self, id: TermId) -> bool {
        self.flags(id).contains(TermFlags::NULL_LIKE)
    }

    /// Terms whose type is fully known by construction. Their bounds are
    /// fixed at the declared type and never updated by solving.
    pub fn is_type_source(&self, id: TermId) -> bool {
        matches!(
            self.data(id),
            TermData::TypeConstant(_)
                | TermData::ObjectLiteral(_)
                | TermData::ArrayLiteral(_)
                | TermData::MapLiteral(_)
                | TermData::FunctionLiteral(_)
                | TermData::EnvironmentDecl(_)
        )
    }

    /// Conservative check that returns `false` only for terms that
    /// obviously cannot hold a method value.
    pub fn possibly_a_method(&self, id: TermId) -> bool {
        if self.is_null_like(id) || self.flags(id).contains(TermFlags::PRIMITIVE_LITERAL) {
            return false;
        }
        !matches!(
            self.data(id),
            TermData::TypeConstant(_)
                | TermData::ObjectLiteral(_)
                | TermData::ArrayLiteral(_)
                | TermData::MapLiteral(_)
        )
    }

    /// The syntactic subterms whose provenance contributes to this term's.
    pub fn subterms(&self, id: TermId) -> SmallVec<[TermId; 1]> {
        match self.data(id) {
            TermData::FunctionReturn { func, .. } => SmallVec::from_slice(&[*func]),
            TermData::Proto(base) => SmallVec::from_slice(&[*base]),
            TermData::PropertyAccess { base, .. } => SmallVec::from_slice(&[*base]),
            TermData::FunctionCall { target, .. } => SmallVec::from_slice(&[*target]),
            _ => SmallVec::new(),
        }
    }

    /// Render a term for diagnostics.
    pub fn display(&self, id: TermId, types: &TypeStore) -> String {
        match self.data(id) {
            TermData::Var(name) => format!("|{}|", self.interner.resolve(*name)),
            TermData::PropertyAccess { base, name } => {
                format!("prop({}, {})", self.display(*base, types), self.interner.resolve(*name))
            }
            TermData::FunctionParam { func, index, .. } => {
                format!("param({}, {})", self.display(*func, types), index)
            }
            TermData::FunctionReturn { func, arity } => {
                format!("ret({}, {})", self.display(*func, types), arity)
            }
            TermData::Indexed(base) => format!("elem({})", self.display(*base, types)),
            TermData::Key(base) => format!("key({})", self.display(*base, types)),
            TermData::FunctionCall { target, is_new } => {
                format!("{}({})", if *is_new { "new" } else { "call" }, self.display(*target, types))
            }
            TermData::Operator { op, left, right } => format!(
                "({} {} {})",
                self.display(*left, types),
                self.interner.resolve(*op),
                self.display(*right, types)
            ),
            TermData::UnaryOperator { op, operand, prefix } => {
                let op = self.interner.resolve(*op);
                if *prefix {
                    format!("({}{})", op, self.display(*operand, types))
                } else {
                    format!("({}{})", self.display(*operand, types), op)
                }
            }
            TermData::TypeConstant(ty) => format!("|{}|", display_type(types, *ty)),
            TermData::ObjectLiteral(n) => format!("objlit#{n}"),
            TermData::ArrayLiteral(n) => format!("arrlit#{n}"),
            TermData::MapLiteral(n) => format!("maplit#{n}"),
            TermData::FunctionLiteral(n) => format!("function#{n}"),
            TermData::EnvironmentDecl(name) => format!("env({})", self.interner.resolve(*name)),
            TermData::This { id, .. } => format!("this#{id}"),
            TermData::Proto(base) => format!("proto({})", self.display(*base, types)),
            TermData::ProtoParent(base) => {
                format!("protoParent({})", self.display(*base, types))
            }
            TermData::MethodReceiver { func } => {
                format!("recv({})", self.display(*func, types))
            }
            TermData::TypeVar(v) => format!("T{}", v.0),
            TermData::TypeParam(name) => format!("TP({})", self.interner.resolve(*name)),
        }
    }
}

/// The term standing for a type: the type-variable term for `Var` types,
/// the interning type-constant term otherwise.
pub fn term_for_type(terms: &mut TermStore, types: &mut TypeStore, ty: TypeId) -> TermId {
    match types.lookup(ty) {
        TypeData::Var(v) => {
            let v = *v;
            terms.type_var_term(v, ty)
        }
        _ => terms.type_constant(ty),
    }
}

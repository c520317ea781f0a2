//! Solver variables.
//!
//! Each term owns up to three variables: a lower bound (starts at `Bottom`,
//! or `BottomRef` for null-like terms, and only moves upward via join), an
//! upper bound (starts at `Top` and only moves downward via meet), and a
//! lazily created MRO/MRW variable holding the property sets discovered
//! through the prototype chain.

use crate::cause::CauseId;
use crate::term::TermId;
use njsc_types::{Property, TypeId};

/// Index of a variable in the solver's variable arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BoundKind {
    Lower,
    Upper,
}

#[derive(Clone, Debug)]
pub enum VarData {
    /// A lower or upper type bound.
    Bound {
        term: TermId,
        kind: BoundKind,
        ty: TypeId,
        /// A term that "explains" the current value: a type source for a
        /// lower bound, a use site for an upper bound.
        justifying: Option<TermId>,
    },
    /// Monotone MRO (inherited/read-only) and MRW (own/read-write)
    /// property-candidate sets.
    Props { term: TermId, mro: Vec<Property>, mrw: Vec<Property> },
}

#[derive(Clone, Debug)]
pub struct Var {
    pub data: VarData,
    /// Why the variable has its current value.
    pub reason: CauseId,
}

impl Var {
    pub fn bound(term: TermId, kind: BoundKind, ty: TypeId) -> Self {
        Self { data: VarData::Bound { term, kind, ty, justifying: None }, reason: CauseId::NO_REASON }
    }

    pub fn props(term: TermId) -> Self {
        Self {
            data: VarData::Props { term, mro: Vec::new(), mrw: Vec::new() },
            reason: CauseId::NO_REASON,
        }
    }

    pub fn term(&self) -> TermId {
        match &self.data {
            VarData::Bound { term, .. } | VarData::Props { term, .. } => *term,
        }
    }

    /// The current type of a bound variable.
    ///
    /// # Panics
    ///
    /// Panics on an MRO/MRW variable; statements are wired so that bound
    /// operators only ever see bound variables.
    pub fn ty(&self) -> TypeId {
        match &self.data {
            VarData::Bound { ty, .. } => *ty,
            VarData::Props { .. } => unreachable!("props variable used as a type bound"),
        }
    }

    pub fn justifying(&self) -> Option<TermId> {
        match &self.data {
            VarData::Bound { justifying, .. } => *justifying,
            VarData::Props { .. } => None,
        }
    }

    pub fn mro(&self) -> &[Property] {
        match &self.data {
            VarData::Props { mro, .. } => mro,
            VarData::Bound { .. } => unreachable!("bound variable used as a props variable"),
        }
    }

    pub fn mrw(&self) -> &[Property] {
        match &self.data {
            VarData::Props { mrw, .. } => mrw,
            VarData::Bound { .. } => unreachable!("bound variable used as a props variable"),
        }
    }

    pub fn props_nonempty(&self) -> bool {
        match &self.data {
            VarData::Props { mro, mrw, .. } => !mro.is_empty() || !mrw.is_empty(),
            VarData::Bound { .. } => false,
        }
    }
}

//! The raw constraint set consumed by the solver.
//!
//! Constraints are produced by the (external) constraint generator from the
//! AST. The solver's normalization pass expands them with fresh type
//! variables before the fixed point runs.

use crate::cause::CauseId;
use crate::term::{TermId, TermStore};
use njsc_types::TypeStore;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Index of a constraint in its [`ConstraintSet`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// `left` is a subtype of `right`.
    SubType { left: TermId, right: TermId },
    /// `left` and `right` solve to the same type.
    Equality { left: TermId, right: TermId },
    /// A `Proto` term whose base has no declared constructor type; the
    /// prototype is recovered during solving once the base's arity is
    /// known.
    Proto { term: TermId },
    /// A `ProtoParent` term: the base term inherits the parent's
    /// properties.
    InheritProps { term: TermId },
    /// The term must resolve to a complete, concrete type.
    Concrete { term: TermId },
    /// The call behind this `FunctionReturn` term must match the arity of
    /// the resolved callee type.
    CheckArity { term: TermId },
}

impl Constraint {
    /// The terms this constraint mentions directly.
    pub fn terms(&self) -> SmallVec<[TermId; 2]> {
        match self {
            Self::SubType { left, right } | Self::Equality { left, right } => {
                SmallVec::from_slice(&[*left, *right])
            }
            Self::Proto { term }
            | Self::InheritProps { term }
            | Self::Concrete { term }
            | Self::CheckArity { term } => SmallVec::from_slice(&[*term]),
        }
    }
}

/// An MRO/MRW side constraint produced by normalization: when
/// `possible_method`'s lower bound resolves to an unattached method, the
/// receiver's upper bound flows into the MRO/MRW sets of
/// `containing_object`.
#[derive(Clone, Debug)]
pub struct UpperBoundConstraint {
    pub possible_method: TermId,
    pub containing_object: TermId,
    pub reason: CauseId,
}

/// Deduplicating, insertion-ordered constraint set with a per-constraint
/// source-line mapping.
#[derive(Default)]
pub struct ConstraintSet {
    items: Vec<Constraint>,
    dedup: FxHashMap<Constraint, ConstraintId>,
    lines: Vec<Option<u32>>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint; returns its id and whether it was new. The first
    /// recorded line for a constraint wins.
    pub fn add(&mut self, constraint: Constraint, line: Option<u32>) -> (ConstraintId, bool) {
        if let Some(existing) = self.dedup.get(&constraint) {
            let id = *existing;
            if self.lines[id.0 as usize].is_none() {
                self.lines[id.0 as usize] = line;
            }
            return (id, false);
        }
        let id = ConstraintId(u32::try_from(self.items.len()).expect("constraint set overflow"));
        self.items.push(constraint.clone());
        self.dedup.insert(constraint, id);
        self.lines.push(line);
        (id, true)
    }

    pub fn get(&self, id: ConstraintId) -> &Constraint {
        &self.items[id.0 as usize]
    }

    pub fn line(&self, id: ConstraintId) -> Option<u32> {
        self.lines[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ConstraintId> + use<> {
        (0..self.items.len() as u32).map(ConstraintId)
    }

    pub fn display(&self, id: ConstraintId, terms: &TermStore, types: &TypeStore) -> String {
        let rendered = match self.get(id) {
            Constraint::SubType { left, right } => {
                format!("{} <: {}", terms.display(*left, types), terms.display(*right, types))
            }
            Constraint::Equality { left, right } => {
                format!("{} = {}", terms.display(*left, types), terms.display(*right, types))
            }
            Constraint::Proto { term } => format!("proto({})", terms.display(*term, types)),
            Constraint::InheritProps { term } => {
                format!("inheritProps({})", terms.display(*term, types))
            }
            Constraint::Concrete { term } => format!("concrete({})", terms.display(*term, types)),
            Constraint::CheckArity { term } => {
                format!("checkArity({})", terms.display(*term, types))
            }
        };
        match self.line(id) {
            Some(line) => format!("{rendered} [line {line}]"),
            None => rendered,
        }
    }
}

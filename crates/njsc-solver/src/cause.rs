//! Provenance tracking.
//!
//! A cause is a node in a derivation DAG answering "why is this fact
//! true": trivially (`NoReason`), directly from a source constraint
//! (`Src`), or by derivation from other facts (`Derived`). Every bound
//! update threads a cause, and causes accumulate via `Derived` as updates
//! chain, so the DAG reuses nodes heavily.
//!
//! Causes live in an arena addressed by `CauseId`. The transitive
//! source-constraint set (`core`) is computed with a seen-set walk keyed by
//! node id; the seen set is required for correctness, not just speed — a
//! diamond-shaped DAG revisited naively is exponential.

use crate::constraint::ConstraintId;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Index of a cause node in its [`CauseStore`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CauseId(pub u32);

impl CauseId {
    /// The trivial cause; node 0 of every store.
    pub const NO_REASON: Self = Self(0);
}

#[derive(Clone, Debug)]
pub enum CauseNode {
    NoReason,
    Src(ConstraintId),
    Derived(SmallVec<[CauseId; 4]>),
}

pub struct CauseStore {
    nodes: Vec<CauseNode>,
    src_dedup: FxHashMap<ConstraintId, CauseId>,
}

impl Default for CauseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CauseStore {
    pub fn new() -> Self {
        Self { nodes: vec![CauseNode::NoReason], src_dedup: FxHashMap::default() }
    }

    pub fn node(&self, id: CauseId) -> &CauseNode {
        &self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: CauseNode) -> CauseId {
        let id = CauseId(u32::try_from(self.nodes.len()).expect("cause store overflow"));
        self.nodes.push(node);
        id
    }

    /// "Follows immediately from this constraint."
    pub fn src(&mut self, constraint: ConstraintId) -> CauseId {
        if let Some(existing) = self.src_dedup.get(&constraint) {
            return *existing;
        }
        let id = self.push(CauseNode::Src(constraint));
        self.src_dedup.insert(constraint, id);
        id
    }

    /// "Follows from these other facts." Trivial predecessors are dropped,
    /// and a single surviving predecessor is returned as-is, so cause
    /// chains only grow when they record something.
    pub fn derived(&mut self, causes: &[CauseId]) -> CauseId {
        let filtered: SmallVec<[CauseId; 4]> =
            causes.iter().copied().filter(|c| *c != CauseId::NO_REASON).collect();
        match filtered.len() {
            0 => CauseId::NO_REASON,
            1 => filtered[0],
            _ => self.push(CauseNode::Derived(filtered)),
        }
    }

    /// If this cause is directly a single constraint, that constraint.
    pub fn as_singleton(&self, id: CauseId) -> Option<ConstraintId> {
        match self.node(id) {
            CauseNode::Src(c) => Some(*c),
            _ => None,
        }
    }

    /// The set of source constraints contributing to this cause.
    pub fn core(&self, id: CauseId) -> FxHashSet<ConstraintId> {
        self.core_with_visits(id).0
    }

    /// `core`, also reporting how many nodes the walk visited. Exposed so
    /// tests can verify that diamond-shaped sharing does not blow up.
    pub fn core_with_visits(&self, id: CauseId) -> (FxHashSet<ConstraintId>, usize) {
        let mut target = FxHashSet::default();
        let mut seen: FxHashSet<CauseId> = FxHashSet::default();
        let mut stack = vec![id];
        let mut visits = 0usize;
        while let Some(cur) = stack.pop() {
            if !seen.insert(cur) {
                continue;
            }
            visits += 1;
            match self.node(cur) {
                CauseNode::NoReason => {}
                CauseNode::Src(c) => {
                    target.insert(*c);
                }
                CauseNode::Derived(preds) => stack.extend(preds.iter().copied()),
            }
        }
        (target, visits)
    }
}

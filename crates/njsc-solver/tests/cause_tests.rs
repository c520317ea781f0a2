use crate::cause::{CauseId, CauseStore};
use crate::constraint::ConstraintId;

#[test]
fn no_reason_has_empty_core() {
    let store = CauseStore::new();
    assert!(store.core(CauseId::NO_REASON).is_empty());
}

#[test]
fn src_cause_is_a_singleton() {
    let mut store = CauseStore::new();
    let c = ConstraintId(7);
    let cause = store.src(c);
    assert_eq!(store.as_singleton(cause), Some(c));
    let core = store.core(cause);
    assert_eq!(core.len(), 1);
    assert!(core.contains(&c));
    // interning: the same constraint maps to the same node
    assert_eq!(store.src(c), cause);
}

#[test]
fn derived_drops_trivial_predecessors() {
    let mut store = CauseStore::new();
    let c = store.src(ConstraintId(0));
    assert_eq!(store.derived(&[CauseId::NO_REASON]), CauseId::NO_REASON);
    assert_eq!(store.derived(&[c, CauseId::NO_REASON]), c);
    let d = store.derived(&[c, c]);
    assert_ne!(d, c);
    assert_eq!(store.as_singleton(d), None);
}

#[test]
fn derived_core_unions_predecessors() {
    let mut store = CauseStore::new();
    let a = store.src(ConstraintId(1));
    let b = store.src(ConstraintId(2));
    let d = store.derived(&[a, b]);
    let core = store.core(d);
    assert_eq!(core.len(), 2);
    assert!(core.contains(&ConstraintId(1)));
    assert!(core.contains(&ConstraintId(2)));
}

/// A deep chain of diamonds: without the seen set the walk would visit
/// 2^1000 nodes; with it the visit count stays linear in the node count.
#[test]
fn diamond_chain_traversal_is_linear() {
    let mut store = CauseStore::new();
    let mut cur = store.src(ConstraintId(0));
    for _ in 0..1000 {
        cur = store.derived(&[cur, cur]);
    }
    let (core, visits) = store.core_with_visits(cur);
    assert_eq!(core.len(), 1);
    assert!(visits <= 1002, "visited {visits} nodes");
}

/// A derivation with thousands of shared predecessors is traversed once
/// per node.
#[test]
fn wide_sharing_traversal_is_linear() {
    let mut store = CauseStore::new();
    let preds: Vec<CauseId> = (0u32..2000).map(|i| store.src(ConstraintId(i))).collect();
    let d1 = store.derived(&preds);
    let d2 = store.derived(&preds);
    let top = store.derived(&[d1, d2]);
    let (core, visits) = store.core_with_visits(top);
    assert_eq!(core.len(), 2000);
    assert!(visits <= 2003, "visited {visits} nodes");
}

//! Regression tests for final solution extraction.

use crate::assignment::TypeAssignment;
use crate::constraint::{Constraint, ConstraintSet};
use crate::error::SolveError;
use crate::operator_table::default_table;
use crate::solver::Solver;
use crate::term::TermStore;
use njsc_common::Interner;
use njsc_types::{Property, TypeData, TypeId, TypeStore};

struct Setup {
    interner: Interner,
    types: TypeStore,
    terms: TermStore,
    constraints: ConstraintSet,
}

fn setup() -> Setup {
    let interner = Interner::new();
    Setup {
        types: TypeStore::new(interner.clone()),
        terms: TermStore::new(interner.clone()),
        constraints: ConstraintSet::new(),
        interner,
    }
}

fn solve(s: Setup) -> Result<TypeAssignment, SolveError> {
    Solver::new(s.interner, s.types, s.terms, s.constraints, default_table()).solve()
}

/// The load-bearing tie-break: a term with no lower-bound evidence gets
/// the *lowest subtype* of its upper bound, not the upper bound itself.
/// Assigning float here would wrongly force sibling terms that copy into
/// this one to also become float.
#[test]
fn unresolved_lower_bound_takes_lowest_subtype_of_upper() {
    let mut s = setup();
    let x = s.terms.var("x");
    let f = s.terms.type_constant(TypeId::FLOAT);
    s.constraints.add(Constraint::SubType { left: x, right: f }, Some(1));
    let mut a = solve(s).unwrap();
    assert_eq!(a.type_of_term(x), Some(TypeId::INT));
}

#[test]
fn top_ref_upper_bound_resolves_to_an_empty_object() {
    let mut s = setup();
    let x = s.terms.var("x");
    let top_ref = s.terms.type_constant(TypeId::TOP_REF);
    s.constraints.add(Constraint::SubType { left: x, right: top_ref }, Some(1));
    let mut a = solve(s).unwrap();
    let ty = a.type_of_term(x).unwrap();
    let shape = a.solver().types().object_shape(ty).expect("object solution");
    assert!(shape.properties.is_empty());
}

/// Non-float upper bounds pass through the tie-break unchanged.
#[test]
fn lowest_subtype_is_identity_for_non_float_bounds() {
    let mut s = setup();
    let x = s.terms.var("x");
    let b = s.terms.type_constant(TypeId::BOOL);
    s.constraints.add(Constraint::SubType { left: x, right: b }, Some(1));
    let mut a = solve(s).unwrap();
    assert_eq!(a.type_of_term(x), Some(TypeId::BOOL));
}

// -----------------------------------------------------------------------------
// Unknown-indexable resolution
// -----------------------------------------------------------------------------

fn indexable_setup(key_ty: TypeId) -> (Setup, crate::term::TermId) {
    let mut s = setup();
    let b = s.terms.var("b");
    let elem = s.terms.indexed(b);
    let val = s.terms.var("val");
    s.constraints.add(Constraint::Equality { left: val, right: elem }, Some(1));
    let key = s.terms.key(b);
    let key_const = s.terms.type_constant(key_ty);
    s.constraints.add(Constraint::SubType { left: key_const, right: key }, Some(1));
    let int_const = s.terms.type_constant(TypeId::INT);
    s.constraints.add(Constraint::SubType { left: int_const, right: elem }, Some(2));
    (s, b)
}

/// A string key forces a map.
#[test]
fn string_keyed_indexable_resolves_to_a_map() {
    let (s, b) = indexable_setup(TypeId::STRING);
    let mut a = solve(s).unwrap();
    let ty = a.type_of_term(b).unwrap();
    assert_eq!(a.solver().types().lookup(ty), &TypeData::Map(TypeId::INT));
}

/// Any other key shape falls back to an array.
#[test]
fn int_keyed_indexable_resolves_to_an_array() {
    let (s, b) = indexable_setup(TypeId::INT);
    let mut a = solve(s).unwrap();
    let ty = a.type_of_term(b).unwrap();
    assert_eq!(a.solver().types().lookup(ty), &TypeData::Array(TypeId::INT));
}

// -----------------------------------------------------------------------------
// Union merging
// -----------------------------------------------------------------------------

/// Properties shared by every union case survive the merge; the read-only
/// variant wins when permissions differ; everything else is dropped.
#[test]
fn union_merge_intersects_properties_and_prefers_read_only() {
    let mut s = setup();
    let a_name = s.interner.intern("a");
    let b_name = s.interner.intern("b");
    let obj1 = s.types.object(vec![
        Property::new(a_name, TypeId::INT, false),
        Property::new(b_name, TypeId::INT, false),
    ]);
    let obj2 = s.types.object(vec![Property::new(a_name, TypeId::INT, true)]);
    let lit1 = s.terms.object_literal(obj1);
    let lit2 = s.terms.object_literal(obj2);
    let x = s.terms.var("x");
    s.constraints.add(Constraint::SubType { left: lit1, right: x }, Some(1));
    s.constraints.add(Constraint::SubType { left: lit2, right: x }, Some(2));
    let mut assignment = solve(s).unwrap();
    let ty = assignment.type_of_term(x).unwrap();
    let types = assignment.solver().types();
    let shape = types.object_shape(ty).expect("merged object");
    assert_eq!(shape.properties.len(), 1);
    let merged_a = shape.property(a_name).unwrap();
    assert!(merged_a.is_ro());
    assert_eq!(merged_a.ty, TypeId::INT);
    assert!(!shape.has_property(b_name));
}

// -----------------------------------------------------------------------------
// Dumps
// -----------------------------------------------------------------------------

#[test]
fn solution_dump_is_deterministic() {
    let build = || {
        let mut s = setup();
        let x = s.terms.var("x");
        let y = s.terms.var("y");
        let i = s.terms.type_constant(TypeId::INT);
        let f = s.terms.type_constant(TypeId::FLOAT);
        s.constraints.add(Constraint::SubType { left: i, right: x }, Some(1));
        s.constraints.add(Constraint::SubType { left: f, right: y }, Some(2));
        solve(s).unwrap()
    };
    let first = build().debug_string();
    let second = build().debug_string();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn mro_mrw_dump_lists_inherited_members() {
    let mut s = setup();
    let m = s.interner.intern("m");
    let method_ty = s.types.unattached_method(vec![], TypeId::INT, TypeId::ANY);
    let method_def = s.terms.function_literal(method_ty);
    let empty = s.types.empty_object();
    let base_lit = s.terms.object_literal(empty);
    let base_m = s.terms.property_access(base_lit, m);
    s.constraints.add(Constraint::SubType { left: method_def, right: base_m }, Some(1));
    let holder = s.terms.var("holder");
    let receiver = s.terms.method_receiver(method_def);
    s.constraints.add(Constraint::Equality { left: holder, right: receiver }, Some(1));
    let prop = s.terms.property_access(holder, m);
    let m_val = s.terms.var("m_val");
    s.constraints.add(Constraint::SubType { left: prop, right: m_val }, Some(2));
    let assignment = solve(s).unwrap();
    let dump = assignment.mro_mrw_string();
    assert!(dump.contains("MRO"), "{dump}");
    assert!(dump.contains('m'), "{dump}");
}

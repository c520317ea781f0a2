//! End-to-end solves over small hand-built constraint systems.

use crate::assignment::TypeAssignment;
use crate::constraint::{Constraint, ConstraintSet};
use crate::error::{OperatorKind, SolveError};
use crate::operator_table::default_table;
use crate::solver::Solver;
use crate::term::{TermFlags, TermStore};
use njsc_common::Interner;
use njsc_types::{Property, TypeData, TypeId, TypeStore};

struct Setup {
    interner: Interner,
    types: TypeStore,
    terms: TermStore,
    constraints: ConstraintSet,
}

fn setup() -> Setup {
    // RUST_LOG=njsc_solver=trace shows the statement-by-statement run
    let _ = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::from_default_env(),
    ).try_init();
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

// -----------------------------------------------------------------------------
// Scenario A: simple assignment
// -----------------------------------------------------------------------------

#[test]
fn upper_bounded_variable_solves_to_the_bound() {
    let mut s = setup();
    let x = s.terms.var("x");
    let int_term = s.terms.type_constant(TypeId::INT);
    s.constraints.add(Constraint::SubType { left: x, right: int_term }, Some(1));
    let mut a = solve(s).unwrap();
    assert_eq!(a.type_of_term(x), Some(TypeId::INT));
}

#[test]
fn lower_bounded_variable_solves_to_the_bound() {
    let mut s = setup();
    let x = s.terms.var("x");
    let five = s.terms.type_constant(TypeId::INT);
    s.constraints.add(Constraint::SubType { left: five, right: x }, Some(1));
    let mut a = solve(s).unwrap();
    assert_eq!(a.type_of_term(x), Some(TypeId::INT));
}

// -----------------------------------------------------------------------------
// Lattice laws
// -----------------------------------------------------------------------------

#[test]
fn join_of_int_and_float_is_float() {
    let mut s = setup();
    let x = s.terms.var("x");
    let i = s.terms.type_constant(TypeId::INT);
    let f = s.terms.type_constant(TypeId::FLOAT);
    s.constraints.add(Constraint::SubType { left: i, right: x }, Some(1));
    s.constraints.add(Constraint::SubType { left: f, right: x }, Some(2));
    let mut a = solve(s).unwrap();
    assert_eq!(a.type_of_term(x), Some(TypeId::FLOAT));
}

#[test]
fn join_is_idempotent() {
    let mut s = setup();
    let x = s.terms.var("x");
    let i = s.terms.type_constant(TypeId::INT);
    s.constraints.add(Constraint::SubType { left: i, right: x }, Some(1));
    s.constraints.add(Constraint::SubType { left: i, right: x }, Some(2));
    let mut a = solve(s).unwrap();
    assert_eq!(a.type_of_term(x), Some(TypeId::INT));
}

#[test]
fn meet_prefers_read_write_over_read_only() {
    let mut s = setup();
    let a_name = s.interner.intern("a");
    let x = s.terms.var("x");
    let obj_ro = s.types.object(vec![Property::new(a_name, TypeId::INT, true)]);
    let obj_rw = s.types.object(vec![Property::new(a_name, TypeId::INT, false)]);
    let ro_term = s.terms.type_constant(obj_ro);
    let rw_term = s.terms.type_constant(obj_rw);
    s.constraints.add(Constraint::SubType { left: x, right: ro_term }, Some(1));
    s.constraints.add(Constraint::SubType { left: x, right: rw_term }, Some(2));
    let mut a = solve(s).unwrap();
    let ty = a.type_of_term(x).unwrap();
    let shape = a.solver().types().object_shape(ty).expect("object solution");
    let prop = shape.property(a_name).expect("property a");
    assert!(prop.is_rw(), "the writable use site must win the meet");
    assert_eq!(prop.ty, TypeId::INT);
}

// -----------------------------------------------------------------------------
// Inside: the subsumption gate
// -----------------------------------------------------------------------------

#[test]
fn compatible_bounds_converge() {
    let mut s = setup();
    let x = s.terms.var("x");
    let i = s.terms.type_constant(TypeId::INT);
    let f = s.terms.type_constant(TypeId::FLOAT);
    // int flows in, float is required: int fits inside float
    s.constraints.add(Constraint::SubType { left: i, right: x }, Some(1));
    s.constraints.add(Constraint::SubType { left: x, right: f }, Some(2));
    let a = solve(s).unwrap();
    let solver = a.solver();
    assert_eq!(solver.lower_bound_type(x), Some(TypeId::INT));
    assert_eq!(solver.upper_bound_type(x), Some(TypeId::FLOAT));
    assert!(njsc_types::is_subtype(solver.types(), TypeId::INT, TypeId::FLOAT));
}

#[test]
fn incompatible_bounds_fail_at_the_inside_gate() {
    let mut s = setup();
    let x = s.terms.var("x");
    let f = s.terms.type_constant(TypeId::FLOAT);
    let i = s.terms.type_constant(TypeId::INT);
    // float flows in, int is required: no implicit narrowing
    let (c1, _) = s.constraints.add(Constraint::SubType { left: f, right: x }, Some(3));
    let (c2, _) = s.constraints.add(Constraint::SubType { left: x, right: i }, Some(4));
    let err = solve(s).unwrap_err();
    match &err {
        SolveError::TypeOperator { kind, core, .. } => {
            assert_eq!(*kind, OperatorKind::Inside);
            assert!(core.contains(&c1), "core must name the type source");
            assert!(core.contains(&c2), "core must name the use site");
        }
        other => panic!("expected an inside failure, got {other:?}"),
    }
}

// -----------------------------------------------------------------------------
// Scenario B: prototype inheritance
// -----------------------------------------------------------------------------

#[test]
fn prototype_chain_supplies_a_method() {
    let mut s = setup();
    let m = s.interner.intern("m");

    // the method value stored on the base object
    let method_ty = s.types.unattached_method(vec![TypeId::INT], TypeId::INT, TypeId::ANY);
    let method_def = s.terms.function_literal(method_ty);
    let empty = s.types.empty_object();
    let base_lit = s.terms.object_literal(empty);
    let base_m = s.terms.property_access(base_lit, m);
    s.constraints.add(Constraint::SubType { left: method_def, right: base_m }, Some(2));

    // the object under construction inherits from the base literal
    let child = s.terms.var("child");
    let receiver = s.terms.method_receiver(method_def);
    s.constraints.add(Constraint::Equality { left: child, right: receiver }, Some(2));
    let child_init = s.terms.object_literal(empty);
    s.constraints.add(Constraint::SubType { left: child_init, right: child }, Some(4));
    let parent = s.terms.proto_parent(child);
    s.constraints.add(Constraint::Equality { left: parent, right: base_lit }, Some(4));

    // res = child.m(5)
    let prop = s.terms.property_access(child, m);
    let m_val = s.terms.var("m_val");
    s.constraints.add(Constraint::SubType { left: prop, right: m_val }, Some(6));
    let five = s.terms.type_constant(TypeId::INT);
    let param0 = s.terms.function_param(prop, 0, 1);
    s.constraints.add(Constraint::SubType { left: five, right: param0 }, Some(6));
    let ret = s.terms.function_return(prop, 1);
    let res = s.terms.var("res");
    s.constraints.add(Constraint::Equality { left: res, right: ret }, Some(6));

    let mut a = solve(s).unwrap();
    assert_eq!(a.type_of_term(res), Some(TypeId::INT));

    // the child's MRO must expose m as read-only
    let interner = a.solver().types().interner().clone();
    let mro = a.mro_of(child);
    let m_entry = mro.iter().find(|p| p.name == m).expect("m reachable through the chain");
    assert!(m_entry.is_ro());
    assert!(!a.mrw_of(child).iter().any(|p| p.name == m));

    // partition: no name is stably in both sets, for any term
    for t in a.solver().registered_terms().collect::<Vec<_>>() {
        for p in a.solver().mro_of(t) {
            assert!(
                !a.solver().mrw_of(t).iter().any(|q| q.name == p.name),
                "property {} of term {t:?} in both MRO and MRW",
                interner.resolve(p.name)
            );
        }
    }
}

// -----------------------------------------------------------------------------
// Scenario C: join defers to a union
// -----------------------------------------------------------------------------

#[test]
fn join_of_unrelated_objects_defers_to_a_union() {
    let mut s = setup();
    let a_name = s.interner.intern("a");
    let b_name = s.interner.intern("b");
    let obj_a = s.types.object(vec![Property::new(a_name, TypeId::INT, false)]);
    let obj_b = s.types.object(vec![Property::new(b_name, TypeId::INT, false)]);
    let lit1 = s.terms.object_literal(obj_a);
    let lit2 = s.terms.object_literal(obj_b);
    let x = s.terms.var("x");
    s.constraints.add(Constraint::SubType { left: lit1, right: x }, Some(1));
    s.constraints.add(Constraint::SubType { left: lit2, right: x }, Some(2));
    let mut a = solve(s).unwrap();
    // the lower bound went through a union...
    let lower = a.solver().lower_bound_type(x).unwrap();
    assert!(matches!(a.solver().types().lookup(lower), TypeData::ObjectUnion(_)));
    // ...and the emitted solution merged it into a single object by
    // property intersection (no shared properties here)
    let ty = a.type_of_term(x).unwrap();
    let shape = a.solver().types().object_shape(ty).expect("merged object");
    assert!(shape.properties.is_empty());
}

#[test]
fn union_member_missing_a_required_property_fails() {
    let mut s = setup();
    let a_name = s.interner.intern("a");
    let b_name = s.interner.intern("b");
    let obj_a = s.types.object(vec![Property::new(a_name, TypeId::INT, false)]);
    let obj_b = s.types.object(vec![Property::new(b_name, TypeId::INT, false)]);
    let lit1 = s.terms.object_literal(obj_a);
    let lit2 = s.terms.object_literal(obj_b);
    let x = s.terms.var("x");
    s.constraints.add(Constraint::SubType { left: lit1, right: x }, Some(1));
    s.constraints.add(Constraint::SubType { left: lit2, right: x }, Some(2));
    // a use site requires property a, present on only one variant
    let req = s.types.object(vec![Property::new(a_name, TypeId::INT, true)]);
    let req_term = s.terms.type_constant(req);
    s.constraints.add(Constraint::SubType { left: x, right: req_term }, Some(3));
    let err = solve(s).unwrap_err();
    assert!(matches!(err, SolveError::Core { .. }));
    assert!(err.explanation().contains("could not find property a"), "{}", err.explanation());
}

// -----------------------------------------------------------------------------
// Scenario D: operator overloading
// -----------------------------------------------------------------------------

#[test]
fn string_plus_int_resolves_to_string() {
    let mut s = setup();
    let a = s.terms.type_constant(TypeId::STRING);
    let one = s.terms.type_constant(TypeId::INT);
    let plus = s.terms.operator("+", a, one);
    let res = s.terms.var("res");
    s.constraints.add(Constraint::Equality { left: res, right: plus }, Some(1));
    let mut assignment = solve(s).unwrap();
    assert_eq!(assignment.type_of_term(res), Some(TypeId::STRING));
}

#[test]
fn object_plus_object_is_an_overload_failure() {
    let mut s = setup();
    let empty = s.types.empty_object();
    let o1 = s.terms.object_literal(empty);
    let o2 = s.terms.object_literal(empty);
    let plus = s.terms.operator("+", o1, o2);
    let res = s.terms.var("res");
    s.constraints.add(Constraint::Equality { left: res, right: plus }, Some(9));
    let err = solve(s).unwrap_err();
    let explanation = err.explanation();
    assert!(explanation.contains("no possible overloading"), "{explanation}");
    assert!(explanation.contains('+'), "{explanation}");
    assert!(explanation.contains("(line 9)"), "{explanation}");
}

#[test]
fn unary_negation_of_bool_fails_and_of_int_is_int() {
    let mut s = setup();
    let i = s.terms.type_constant(TypeId::INT);
    let neg = s.terms.unary_operator("-", i, true);
    let res = s.terms.var("res");
    s.constraints.add(Constraint::Equality { left: res, right: neg }, Some(1));
    let mut a = solve(s).unwrap();
    assert_eq!(a.type_of_term(res), Some(TypeId::INT));

    let mut s = setup();
    let b = s.terms.type_constant(TypeId::BOOL);
    let neg = s.terms.unary_operator("-", b, true);
    let res = s.terms.var("res");
    s.constraints.add(Constraint::Equality { left: res, right: neg }, Some(2));
    let err = solve(s).unwrap_err();
    assert!(err.explanation().contains("unsupported operand type"), "{}", err.explanation());
}

#[test]
fn logical_not_resolves_to_bool() {
    let mut s = setup();
    let b = s.terms.type_constant(TypeId::BOOL);
    let not = s.terms.unary_operator("!", b, true);
    let res = s.terms.var("res");
    s.constraints.add(Constraint::Equality { left: res, right: not }, Some(1));
    let mut a = solve(s).unwrap();
    assert_eq!(a.type_of_term(res), Some(TypeId::BOOL));
}

// -----------------------------------------------------------------------------
// Scenario E: arity mismatch, found only after the solve
// -----------------------------------------------------------------------------

#[test]
fn calling_a_two_parameter_function_with_three_arguments_fails() {
    let mut s = setup();
    let fn_ty = s.types.function(vec![TypeId::INT, TypeId::INT], TypeId::INT);
    let fn_def = s.terms.function_literal(fn_ty);
    let f = s.terms.var("f");
    s.terms.set_line(f, 7);
    s.constraints.add(Constraint::SubType { left: fn_def, right: f }, Some(7));
    let call = s.terms.function_call(f, false);
    let ret3 = s.terms.function_return(f, 3);
    s.constraints.add(Constraint::Equality { left: call, right: ret3 }, Some(7));
    s.constraints.add(Constraint::CheckArity { term: ret3 }, Some(7));
    let i = s.terms.type_constant(TypeId::INT);
    for idx in 0..3 {
        let param = s.terms.function_param(f, idx, 3);
        s.constraints.add(Constraint::SubType { left: i, right: param }, Some(7));
    }
    let err = solve(s).unwrap_err();
    let explanation = err.explanation();
    assert!(explanation.contains("3 argument"), "{explanation}");
    assert!(explanation.contains("expecting 2"), "{explanation}");
    assert!(explanation.contains("line 7"), "{explanation}");
}

#[test]
fn matching_arity_call_solves() {
    let mut s = setup();
    let fn_ty = s.types.function(vec![TypeId::INT], TypeId::STRING);
    let fn_def = s.terms.function_literal(fn_ty);
    let f = s.terms.var("f");
    s.constraints.add(Constraint::SubType { left: fn_def, right: f }, Some(1));
    let call = s.terms.function_call(f, false);
    let ret1 = s.terms.function_return(f, 1);
    s.constraints.add(Constraint::Equality { left: call, right: ret1 }, Some(1));
    s.constraints.add(Constraint::CheckArity { term: ret1 }, Some(1));
    let i = s.terms.type_constant(TypeId::INT);
    let param = s.terms.function_param(f, 0, 1);
    s.constraints.add(Constraint::SubType { left: i, right: param }, Some(1));
    let mut a = solve(s).unwrap();
    assert_eq!(a.type_of_term(call), Some(TypeId::STRING));
}

#[test]
fn new_on_a_non_constructor_fails() {
    let mut s = setup();
    let fn_ty = s.types.function(vec![], TypeId::INT);
    let fn_def = s.terms.function_literal(fn_ty);
    let f = s.terms.var("f");
    s.constraints.add(Constraint::SubType { left: fn_def, right: f }, Some(3));
    let call = s.terms.function_call(f, true);
    s.terms.set_line(call, 3);
    let ret0 = s.terms.function_return(f, 0);
    s.constraints.add(Constraint::Equality { left: call, right: ret0 }, Some(3));
    let err = solve(s).unwrap_err();
    assert!(err.explanation().contains("non-constructor"), "{}", err.explanation());
}

// -----------------------------------------------------------------------------
// Cancellation
// -----------------------------------------------------------------------------

#[test]
fn a_cancelled_solve_returns_no_assignment() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    let mut s = setup();
    let x = s.terms.var("x");
    let i = s.terms.type_constant(TypeId::INT);
    s.constraints.add(Constraint::SubType { left: i, right: x }, Some(1));
    let mut solver = Solver::new(s.interner, s.types, s.terms, s.constraints, default_table());
    let flag = Arc::new(AtomicBool::new(false));
    solver.set_cancel_flag(flag.clone());
    flag.store(true, Ordering::Relaxed);
    assert!(matches!(solver.solve(), Err(SolveError::Cancelled)));
}

// -----------------------------------------------------------------------------
// Null handling
// -----------------------------------------------------------------------------

#[test]
fn null_unifies_with_reference_types_and_resolves_to_an_object() {
    let mut s = setup();
    let n = s.terms.var("n");
    s.terms.add_flags(n, TermFlags::NULL_LIKE);
    let y = s.terms.var("y");
    s.constraints.add(Constraint::SubType { left: n, right: y }, Some(1));
    let mut a = solve(s).unwrap();
    // BottomRef is not representable; both resolve to a fresh empty object
    for t in [n, y] {
        let ty = a.type_of_term(t).expect("resolved");
        let shape = a.solver().types().object_shape(ty).expect("object solution");
        assert!(shape.properties.is_empty());
    }
}

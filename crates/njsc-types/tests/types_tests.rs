use super::*;
use crate::relations::{
    coarse_lower_bound, coarse_upper_bound, is_subtype, is_subtypeish, lowest_subtype,
};
use njsc_common::Interner;

fn store() -> TypeStore {
    TypeStore::new(Interner::new())
}

#[test]
fn intrinsics_are_preregistered() {
    let store = store();
    assert_eq!(store.lookup(TypeId::INT), &TypeData::Int);
    assert_eq!(store.lookup(TypeId::TOP), &TypeData::Top);
    assert_eq!(store.lookup(TypeId::BOTTOM_REF), &TypeData::BottomRef);
}

#[test]
fn interning_deduplicates_structures() {
    let mut store = store();
    let a1 = store.array(TypeId::INT);
    let a2 = store.array(TypeId::INT);
    let a3 = store.array(TypeId::FLOAT);
    assert_eq!(a1, a2);
    assert_ne!(a1, a3);

    let name = store.interner().intern("x");
    let o1 = store.object(vec![Property::new(name, TypeId::INT, true)]);
    let o2 = store.object(vec![Property::new(name, TypeId::INT, true)]);
    assert_eq!(o1, o2);
}

#[test]
fn object_construction_orders_properties() {
    let mut store = store();
    let a = store.interner().intern("a");
    let b = store.interner().intern("b");
    let o1 = store.object(vec![
        Property::new(b, TypeId::INT, false),
        Property::new(a, TypeId::STRING, true),
    ]);
    let o2 = store.object(vec![
        Property::new(a, TypeId::STRING, true),
        Property::new(b, TypeId::INT, false),
    ]);
    assert_eq!(o1, o2);
}

#[test]
fn own_property_wins_over_inherited() {
    let mut store = store();
    let m = store.interner().intern("m");
    let obj = store.object_parts(
        None,
        vec![Property::new(m, TypeId::INT, false)],
        vec![Property::new(m, TypeId::STRING, true)],
    );
    let shape = store.object_shape(obj).unwrap();
    assert_eq!(shape.properties.len(), 1);
    assert!(shape.has_own_property(m));
}

#[test]
fn int_is_subtype_of_float() {
    let store = store();
    assert!(is_subtype(&store, TypeId::INT, TypeId::FLOAT));
    assert!(!is_subtype(&store, TypeId::FLOAT, TypeId::INT));
}

#[test]
fn object_width_and_permission_subtyping() {
    let mut store = store();
    let a = store.interner().intern("a");
    let b = store.interner().intern("b");
    let wide = store.object(vec![
        Property::new(a, TypeId::INT, false),
        Property::new(b, TypeId::STRING, false),
    ]);
    let narrow_rw = store.object(vec![Property::new(a, TypeId::INT, false)]);
    let narrow_ro = store.object(vec![Property::new(a, TypeId::INT, true)]);

    assert!(is_subtype(&store, wide, narrow_rw));
    assert!(is_subtype(&store, wide, narrow_ro));
    // permissions may not be weakened: an RO property cannot satisfy an RW
    // requirement
    assert!(!is_subtype(&store, narrow_ro, narrow_rw));
    assert!(!is_subtype(&store, narrow_rw, wide));
}

#[test]
fn reference_extremes() {
    let mut store = store();
    let obj = store.empty_object();
    assert!(is_subtype(&store, obj, TypeId::TOP_REF));
    assert!(is_subtype(&store, TypeId::BOTTOM_REF, obj));
    assert!(!is_subtype(&store, TypeId::INT, TypeId::TOP_REF));
}

#[test]
fn coarse_bounds_are_tight_for_primitives() {
    let store = store();
    assert_eq!(coarse_upper_bound(&store, TypeId::INT, TypeId::FLOAT), TypeId::FLOAT);
    assert_eq!(coarse_lower_bound(&store, TypeId::INT, TypeId::FLOAT), TypeId::INT);
    assert_eq!(coarse_upper_bound(&store, TypeId::INT, TypeId::STRING), TypeId::TOP);
    assert_eq!(coarse_lower_bound(&store, TypeId::INT, TypeId::STRING), TypeId::BOTTOM);
}

#[test]
fn lowest_subtype_tie_break() {
    let mut store = store();
    assert_eq!(lowest_subtype(&store, TypeId::FLOAT), TypeId::INT);
    assert_eq!(lowest_subtype(&store, TypeId::INT), TypeId::INT);
    let obj = store.empty_object();
    assert_eq!(lowest_subtype(&store, obj), obj);
}

#[test]
fn string_supports_length_lookup() {
    let mut store = store();
    let length = store.interner().intern("length");
    assert_eq!(apparent_member(&mut store, TypeId::STRING, length), Ok(TypeId::INT));

    let missing = store.interner().intern("nonsense");
    assert!(apparent_member(&mut store, TypeId::STRING, missing).is_err());
}

#[test]
fn array_members_are_parameterized_by_element() {
    let mut store = store();
    let arr = store.array(TypeId::STRING);
    let pop = store.interner().intern("pop");
    let popped = apparent_member(&mut store, arr, pop).unwrap();
    match store.lookup(popped) {
        TypeData::AttachedMethod(sig) => assert_eq!(sig.ret, TypeId::STRING),
        other => panic!("expected method type, got {other:?}"),
    }

    let push = store.interner().intern("push");
    let pushed = apparent_member(&mut store, arr, push).unwrap();
    match store.lookup(pushed) {
        TypeData::AttachedMethod(sig) => {
            assert_eq!(sig.params, vec![TypeId::STRING]);
            assert_eq!(sig.ret, TypeId::INT);
        }
        other => panic!("expected method type, got {other:?}"),
    }
}

#[test]
fn subtypeish_admits_primitive_into_object_bound() {
    let mut store = store();
    let length = store.interner().intern("length");
    let obj = store.object(vec![Property::new(length, TypeId::INT, true)]);
    assert!(is_subtypeish(&store, TypeId::STRING, obj));
    assert!(!is_subtypeish(&store, TypeId::INT, obj));
}

#[test]
fn representation_sorts() {
    let mut store = store();
    assert_eq!(store.rep_of(TypeId::INT), RepresentationSort::Int);
    assert_eq!(store.rep_of(TypeId::STRING), RepresentationSort::String);
    let obj = store.empty_object();
    assert_eq!(store.rep_of(obj), RepresentationSort::Object);
    let arr = store.array(TypeId::INT);
    assert_eq!(store.rep_of(arr), RepresentationSort::Object);
    let f = store.function(vec![TypeId::INT], TypeId::VOID);
    assert_eq!(store.rep_of(f), RepresentationSort::Code);
    assert_eq!(store.rep_of(TypeId::VOID), RepresentationSort::Unrepresentable);

    // an intersection of code cases shares the CODE sort
    let g = store.function(vec![], TypeId::INT);
    let isect = store.intersection(vec![f, g]);
    assert_eq!(store.rep_of(isect), RepresentationSort::Code);
}

#[test]
fn display_smoke() {
    let mut store = store();
    let x = store.interner().intern("x");
    let obj = store.object(vec![Property::new(x, TypeId::INT, true)]);
    assert_eq!(display_type(&store, obj), "{ x: int |  }");
    let arr = store.array(TypeId::FLOAT);
    assert_eq!(display_type(&store, arr), "Array<float>");
}

use crate::error::SolveError;
use crate::operator_table::{OperatorTable, default_table};

#[test]
fn embedded_table_loads() {
    let table = default_table();
    assert!(!table.infix_cases("+").unwrap().is_empty());
    assert!(!table.infix_cases("==").unwrap().is_empty());
    assert!(!table.unary_cases("!").unwrap().is_empty());
    assert!(!table.unary_cases("++").unwrap().is_empty());
}

#[test]
fn unsupported_operator_is_an_error() {
    let table = default_table();
    assert!(matches!(table.infix_cases("@"), Err(SolveError::Solver { .. })));
    assert!(matches!(table.unary_cases("@"), Err(SolveError::Solver { .. })));
}

#[test]
fn malformed_json_is_rejected() {
    assert!(matches!(
        OperatorTable::from_json_str("not json"),
        Err(SolveError::OperatorTable { .. })
    ));
}

#[test]
fn unrecognized_type_name_is_rejected() {
    let json = r#"[ { "+": [ { "left": "quux", "right": "int", "result": "int" } ] } ]"#;
    assert!(matches!(
        OperatorTable::from_json_str(json),
        Err(SolveError::OperatorTable { .. })
    ));
}

/// The most-specific-case lookup requires each operator's unary cases to
/// form a total order; incomparable cases must be rejected at load time,
/// not discovered mid-solve.
#[test]
fn incomparable_unary_cases_are_rejected_at_load() {
    let json = r#"[ { "?": [
        { "operand": "string", "result": "string", "isprefix": "true" },
        { "operand": "int", "result": "int", "isprefix": "true" }
    ] } ]"#;
    let err = OperatorTable::from_json_str(json).unwrap_err();
    assert!(matches!(err, SolveError::OperatorTable { .. }));
    assert!(err.explanation().contains("incomparable"));
}

#[test]
fn comparable_unary_cases_pass_validation() {
    let json = r#"[ { "?": [
        { "operand": "int", "result": "int", "isprefix": "true" },
        { "operand": "float", "result": "float", "isprefix": "true" }
    ] } ]"#;
    assert!(OperatorTable::from_json_str(json).is_ok());
}

/// Arrays are ordered before objects by fiat, so mixing them is legal.
#[test]
fn array_and_object_cases_are_comparable() {
    let json = r#"[ { "?": [
        { "operand": "array", "result": "int", "isprefix": "true" },
        { "operand": "object", "result": "int", "isprefix": "true" }
    ] } ]"#;
    assert!(OperatorTable::from_json_str(json).is_ok());
}

/// Cases in different prefix positions are looked up separately and need
/// not be mutually comparable.
#[test]
fn prefix_positions_validate_independently() {
    let json = r#"[ { "?": [
        { "operand": "string", "result": "string", "isprefix": "true" },
        { "operand": "int", "result": "int", "isprefix": "false" }
    ] } ]"#;
    assert!(OperatorTable::from_json_str(json).is_ok());
}

//! The operator-overload table.
//!
//! Models the types of expressions involving built-in unary and infix
//! operators ("+", "~", ...). The model is loaded from a JSON resource: an
//! array of single-operator objects, each listing type cases — infix cases
//! `{left, right, result}` and unary cases `{operand, result, isprefix}`.
//!
//! The unary lookup selects the most specific matching case, which is only
//! well-defined when each operator's cases form a total order under the
//! operand subtype relation. Rather than discovering a violation mid-solve,
//! the order is validated when the table is loaded.

use crate::error::SolveError;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::cmp::Ordering;

/// The closed set of type names an operator case may mention.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpType {
    Int,
    Float,
    Bool,
    String,
    /// Any reference type.
    Reference,
    Object,
    Array,
    Function,
    Map,
}

impl OpType {
    fn parse(name: &str) -> Result<Self, SolveError> {
        match name {
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "boolean" => Ok(Self::Bool),
            "string" => Ok(Self::String),
            "reference" => Ok(Self::Reference),
            "object" => Ok(Self::Object),
            "array" => Ok(Self::Array),
            "function" => Ok(Self::Function),
            "map" => Ok(Self::Map),
            other => Err(SolveError::OperatorTable {
                message: format!("operator table: type not supported: {other}"),
            }),
        }
    }
}

/// Symbolic subtype order among case types: `int <: float`, and every
/// reference shape (including strings) is below `reference`.
pub fn optype_le(a: OpType, b: OpType) -> bool {
    a == b
        || (a == OpType::Int && b == OpType::Float)
        || (b == OpType::Reference
            && matches!(
                a,
                OpType::Object | OpType::Array | OpType::Function | OpType::Map | OpType::String
            ))
}

/// Specificity order used by the unary lookup: a more specific case is
/// *less than* a less specific one. Arrays are ordered before objects even
/// though the types are incomparable.
pub fn more_specific(a: OpType, b: OpType) -> Option<Ordering> {
    if a == b {
        Some(Ordering::Equal)
    } else if optype_le(a, b) {
        Some(Ordering::Less)
    } else if optype_le(b, a) {
        Some(Ordering::Greater)
    } else if a == OpType::Array && b == OpType::Object {
        Some(Ordering::Less)
    } else if a == OpType::Object && b == OpType::Array {
        Some(Ordering::Greater)
    } else {
        None
    }
}

/// One case of an infix operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InfixCase {
    pub left: OpType,
    pub right: OpType,
    pub result: OpType,
}

/// One case of a unary operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UnaryCase {
    pub operand: OpType,
    pub result: OpType,
    pub prefix: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCase {
    Unary { operand: String, result: String, isprefix: String },
    Infix { left: String, right: String, result: String },
}

type RawTable = Vec<FxHashMap<String, Vec<RawCase>>>;

#[derive(Default, Debug)]
pub struct OperatorTable {
    infix: FxHashMap<String, Vec<InfixCase>>,
    unary: FxHashMap<String, Vec<UnaryCase>>,
}

static DEFAULT_OPERATORS_JSON: &str = include_str!("../resources/operators.json");

static DEFAULT_TABLE: Lazy<OperatorTable> = Lazy::new(|| {
    OperatorTable::from_json_str(DEFAULT_OPERATORS_JSON)
        .expect("embedded operator table is valid")
});

/// The table parsed from the embedded resource.
pub fn default_table() -> &'static OperatorTable {
    &DEFAULT_TABLE
}

impl OperatorTable {
    /// Parse and validate a table from its JSON source.
    pub fn from_json_str(json: &str) -> Result<Self, SolveError> {
        let raw: RawTable = serde_json::from_str(json).map_err(|e| SolveError::OperatorTable {
            message: format!("operator table: malformed JSON: {e}"),
        })?;
        let mut table = Self::default();
        for entry in raw {
            for (operator, cases) in entry {
                for case in cases {
                    match case {
                        RawCase::Unary { operand, result, isprefix } => {
                            let prefix = match isprefix.as_str() {
                                "true" => true,
                                "false" => false,
                                other => {
                                    return Err(SolveError::OperatorTable {
                                        message: format!(
                                            "operator table: unrecognized prefix flag: {other}"
                                        ),
                                    });
                                }
                            };
                            table.unary.entry(operator.clone()).or_default().push(UnaryCase {
                                operand: OpType::parse(&operand)?,
                                result: OpType::parse(&result)?,
                                prefix,
                            });
                        }
                        RawCase::Infix { left, right, result } => {
                            table.infix.entry(operator.clone()).or_default().push(InfixCase {
                                left: OpType::parse(&left)?,
                                right: OpType::parse(&right)?,
                                result: OpType::parse(&result)?,
                            });
                        }
                    }
                }
            }
        }
        table.validate()?;
        Ok(table)
    }

    /// Check that every operator's unary cases form a total order under the
    /// specificity comparison, per prefix position. The most-specific-case
    /// lookup is meaningless otherwise.
    fn validate(&self) -> Result<(), SolveError> {
        for (operator, cases) in &self.unary {
            for (i, a) in cases.iter().enumerate() {
                for b in &cases[i + 1..] {
                    if a.prefix != b.prefix {
                        continue;
                    }
                    if more_specific(a.operand, b.operand).is_none() {
                        return Err(SolveError::OperatorTable {
                            message: format!(
                                "operator table: incomparable cases {:?} and {:?} for unary operator {operator}",
                                a.operand, b.operand
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn infix_cases(&self, operator: &str) -> Result<&[InfixCase], SolveError> {
        self.infix
            .get(operator)
            .map(Vec::as_slice)
            .ok_or_else(|| SolveError::solver(format!("unsupported operator {operator}")))
    }

    pub fn unary_cases(&self, operator: &str) -> Result<&[UnaryCase], SolveError> {
        self.unary
            .get(operator)
            .map(Vec::as_slice)
            .ok_or_else(|| SolveError::solver(format!("unsupported unary operator: {operator}")))
    }
}

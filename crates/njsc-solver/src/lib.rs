//! Constraint solver for the njsc type-inference core.
//!
//! Given a program's raw constraint set (subtyping/equality relations over
//! a term graph, produced by the constraint generator), the solver computes
//! a consistent type assignment for every term, or proves that none exists
//! and explains why. The pipeline:
//!
//! 1. **Normalization** — structural constraints (property accesses, calls,
//!    indexing, prototypes) are expanded into primitive subtype/equality
//!    constraints over fresh type variables.
//! 2. **Bound initialization** — each term gets a lower bound (starting at
//!    `Bottom`) and an upper bound (starting at `Top`); type-source terms
//!    get both fixed at their declared type.
//! 3. **The fixed point** — a monotone worklist over join/meet/inside
//!    statements, plus operator-overload and prototype-inheritance
//!    statements, runs to convergence.
//! 4. **Extraction** — a terminal type is assigned per term, type variables
//!    are substituted away, and the deferred checks (property presence,
//!    concreteness, arity) run.
//!
//! Every bound update threads a [`CauseId`]; failures carry an
//! unsatisfiable core of source constraints for diagnostics.

pub mod assignment;
pub mod cause;
pub mod constraint;
mod engine;
pub mod error;
mod inherit;
mod lattice_inside;
mod lattice_join;
mod lattice_meet;
mod normalize;
mod operator_apply;
pub mod operator_table;
mod solution;
pub mod solver;
pub mod term;
pub mod vars;

pub use assignment::TypeAssignment;
pub use cause::{CauseId, CauseNode, CauseStore};
pub use constraint::{Constraint, ConstraintId, ConstraintSet, UpperBoundConstraint};
pub use error::{OperatorKind, SolveError};
pub use operator_table::{InfixCase, OpType, OperatorTable, UnaryCase, default_table};
pub use solver::Solver;
pub use term::{TermData, TermFlags, TermId, TermStore, term_for_type};
pub use vars::{BoundKind, VarId};

#[cfg(test)]
#[path = "../tests/cause_tests.rs"]
mod cause_tests;
#[cfg(test)]
#[path = "../tests/operator_table_tests.rs"]
mod operator_table_tests;
#[cfg(test)]
#[path = "../tests/scenario_tests.rs"]
mod scenario_tests;
#[cfg(test)]
#[path = "../tests/solution_tests.rs"]
mod solution_tests;

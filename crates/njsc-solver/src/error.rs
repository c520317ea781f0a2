//! Failure taxonomy.
//!
//! Expected failures — overload mismatches, structural failures, arity
//! mismatches — are returned as `SolveError`; the whole solve aborts and no
//! partial assignment is produced. Genuine invariant violations (a broken
//! MRO/MRW partition, a malformed statement) panic instead.
//!
//! Messages and explanations are rendered at construction time, while the
//! solver's stores are still at hand; the structured fields (operator kind,
//! unsatisfiable core) survive for programmatic consumers such as the
//! external soft-constraint relaxation mode.

use crate::constraint::ConstraintId;
use std::fmt;

/// Which lattice operator failed to reconcile two shapes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperatorKind {
    Join,
    Meet,
    Inside,
}

impl OperatorKind {
    /// The diagnostic role of the first justifying term.
    pub fn first_source_label(self) -> &'static str {
        match self {
            Self::Join | Self::Inside => "type source",
            Self::Meet => "use",
        }
    }

    /// The diagnostic role of the second justifying term.
    pub fn second_source_label(self) -> &'static str {
        match self {
            Self::Join => "type source",
            Self::Meet | Self::Inside => "use",
        }
    }
}

#[derive(Clone, Debug)]
pub enum SolveError {
    /// Simple failures with a message only: arity mismatches and invalid
    /// constructor calls, found after an otherwise complete solution.
    Solver { message: String },
    /// A failure carrying an unsatisfiable core: a (hopefully small) set
    /// of source constraints which are, by themselves, unsatisfiable.
    Core { message: String, core: Vec<ConstraintId> },
    /// A lattice operator could not reconcile two shapes. Carries the two
    /// conflicting justifying sources and the discharge site, pre-rendered.
    TypeOperator {
        message: String,
        explanation: String,
        kind: OperatorKind,
        core: Vec<ConstraintId>,
    },
    /// The operator-overload table failed load-time validation.
    OperatorTable { message: String },
    /// The external cancellation signal fired; fatal for this compilation
    /// unit, no assignment is produced.
    Cancelled,
}

impl SolveError {
    pub fn solver(message: impl Into<String>) -> Self {
        Self::Solver { message: message.into() }
    }

    /// The human-readable explanation of the failure.
    pub fn explanation(&self) -> String {
        match self {
            Self::Solver { message }
            | Self::Core { message, .. }
            | Self::OperatorTable { message } => message.clone(),
            Self::TypeOperator { explanation, .. } => explanation.clone(),
            Self::Cancelled => "solve cancelled".to_string(),
        }
    }

    /// The unsatisfiable core, when the failure carries one.
    pub fn core(&self) -> &[ConstraintId] {
        match self {
            Self::Core { core, .. } | Self::TypeOperator { core, .. } => core,
            _ => &[],
        }
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solver { message }
            | Self::Core { message, .. }
            | Self::TypeOperator { message, .. }
            | Self::OperatorTable { message } => f.write_str(message),
            Self::Cancelled => f.write_str("solve cancelled"),
        }
    }
}

impl std::error::Error for SolveError {}

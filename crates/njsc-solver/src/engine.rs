//! The fixed-point worklist engine.
//!
//! A statement is `(lhs variable, operator, rhs variables)`. Statements are
//! deduplicated by operator identity and variable list, register a
//! dependency on each rhs variable, and re-enqueue their dependents when
//! evaluation changes the lhs. The operators are monotone — joins only
//! raise lower bounds, meets only lower upper bounds, MRO/MRW sets only
//! grow — so the iteration converges; each accumulation step adds a finite
//! property or statement drawn from a finite program.

use crate::cause::CauseId;
use crate::error::SolveError;
use crate::solver::Solver;
use crate::term::TermId;
use crate::vars::VarId;
use njsc_common::Atom;
use smallvec::SmallVec;
use tracing::trace;

/// Index of a statement in the solver's statement list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StatementId(pub u32);

/// The operator of a statement. Identity (together with the variable list)
/// deduplicates statements; the cause recorded at registration is not part
/// of identity — the first registration wins.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StatementOp {
    /// Raise the lhs lower bound with the rhs lower bound.
    Join { target: TermId },
    /// Lower the lhs upper bound with the rhs upper bound.
    Meet { target: TermId },
    /// Discharge "lower bound fits upper bound" for a term;
    /// rhs = [lower, upper, mro/mrw].
    Inside { term: TermId },
    /// Infix operator application; rhs = [left lower, right lower,
    /// result upper].
    Infix { op: Atom, line: Option<u32> },
    /// Unary operator application; rhs = [operand lower, operand upper].
    Unary { op: Atom, prefix: bool, line: Option<u32> },
    /// Recover a constructor's prototype once the base term's lower bound
    /// resolves.
    Proto { proto_term: TermId },
    /// Propagate properties from prototype parent to child;
    /// rhs = [child lower, parent lower].
    InheritProps,
    /// Propagate MRO/MRW sets along an equality edge.
    CopyMroMrw,
    /// Watch a possibly-method term; when it resolves to an unattached
    /// method, connect the receiver's upper bound to the containing
    /// object's MRO/MRW sets.
    CheckForMethod { containing: TermId },
    /// Copy a receiver upper bound's properties into MRO/MRW sets.
    CopyFromUpperBound { containing: TermId },
    /// Check an object literal's properties against its MRO/MRW sets.
    MroMrwToObjectLiteral { term: TermId },
}

#[derive(Clone, Debug)]
pub struct Statement {
    pub op: StatementOp,
    pub lhs: VarId,
    pub rhs: SmallVec<[VarId; 3]>,
    pub reason: CauseId,
}

impl Solver {
    /// Register a statement unless an identical one exists. Returns whether
    /// the statement was new. `to_worklist` enqueues a new statement
    /// immediately (used for statements generated during solving, whose
    /// inputs may already have values).
    pub(crate) fn new_statement(
        &mut self,
        op: StatementOp,
        lhs: VarId,
        rhs: SmallVec<[VarId; 3]>,
        reason: CauseId,
        to_worklist: bool,
    ) -> bool {
        let key = (op.clone(), lhs, rhs.clone());
        if self.stmt_dedup.contains_key(&key) {
            return false;
        }
        let id = StatementId(u32::try_from(self.stmts.len()).expect("statement list overflow"));
        trace!(stmt = id.0, ?op, "new statement");
        for v in &rhs {
            self.deps.entry(*v).or_default().push(id);
        }
        self.stmts.push(Statement { op, lhs, rhs, reason });
        self.stmt_dedup.insert(key, id);
        self.queued.grow((id.0 + 1) as usize);
        if to_worklist {
            self.enqueue(id);
        }
        true
    }

    pub(crate) fn enqueue(&mut self, id: StatementId) {
        self.queued.grow((id.0 + 1) as usize);
        if !self.queued.contains(id.0 as usize) {
            self.queued.insert(id.0 as usize);
            self.worklist.push_back(id);
        }
    }

    /// Run statements to convergence. Statement order does not affect the
    /// fixed point (join and meet are commutative and associative on the
    /// lattice), only which diagnostic surfaces first when several
    /// independent failures exist.
    pub(crate) fn run_to_fixpoint(&mut self) -> Result<(), SolveError> {
        while let Some(id) = self.worklist.pop_front() {
            self.queued.set(id.0 as usize, false);
            if self.cancelled() {
                return Err(SolveError::Cancelled);
            }
            let changed = self.evaluate(id)?;
            if changed {
                let lhs = self.stmts[id.0 as usize].lhs;
                if let Some(deps) = self.deps.get(&lhs) {
                    for dep in deps.clone() {
                        self.enqueue(dep);
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluate(&mut self, id: StatementId) -> Result<bool, SolveError> {
        let stmt = self.stmts[id.0 as usize].clone();
        trace!(stmt = id.0, op = ?stmt.op, "evaluating");
        match stmt.op {
            StatementOp::Join { target } => {
                self.eval_join(target, stmt.lhs, stmt.rhs[0], stmt.reason)
            }
            StatementOp::Meet { target } => {
                self.eval_meet(target, stmt.lhs, stmt.rhs[0], stmt.reason)
            }
            StatementOp::Inside { term } => {
                self.eval_inside(term, stmt.rhs[0], stmt.rhs[1], stmt.rhs[2], stmt.reason)?;
                Ok(false)
            }
            StatementOp::Infix { op, line } => self.eval_infix(id, op, line, &stmt),
            StatementOp::Unary { op, prefix, line } => {
                self.eval_unary(op, prefix, line, &stmt)
            }
            StatementOp::Proto { proto_term } => {
                self.eval_proto(proto_term, stmt.rhs[0], stmt.reason)?;
                Ok(false)
            }
            StatementOp::InheritProps => {
                self.eval_inherit_props(stmt.lhs, stmt.rhs[0], stmt.rhs[1], stmt.reason)
            }
            StatementOp::CopyMroMrw => {
                Ok(self.eval_copy_mro_mrw(stmt.lhs, stmt.rhs[0], stmt.reason))
            }
            StatementOp::CheckForMethod { containing } => {
                self.eval_check_for_method(containing, stmt.rhs[0], stmt.reason);
                Ok(false)
            }
            StatementOp::CopyFromUpperBound { containing } => {
                let _ = containing;
                Ok(self.eval_copy_from_upper_bound(stmt.lhs, stmt.rhs[0], stmt.reason))
            }
            StatementOp::MroMrwToObjectLiteral { term } => {
                self.eval_mromrw_to_objlit(term, stmt.lhs, stmt.rhs[0], stmt.reason);
                Ok(false)
            }
        }
    }
}

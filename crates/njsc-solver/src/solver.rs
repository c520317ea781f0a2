//! The directional constraint solver.
//!
//! `Solver` owns every piece of per-compilation state: the term and type
//! stores, the constraint set, the cause arena, the bound and MRO/MRW
//! variables, and the statement worklist. One call to [`Solver::solve`]
//! takes a constraint set to completion: normalization, bound
//! initialization, statement registration, the fixed point, and final
//! solution extraction.
//!
//! Subtyping is solved directionally: a constraint `l <: r` becomes a meet
//! statement lowering `l`'s upper bound and a join statement raising `r`'s
//! lower bound, and a per-term inside statement discharges "lower bound
//! fits upper bound" as both move.

use crate::assignment::TypeAssignment;
use crate::cause::{CauseId, CauseStore};
use crate::constraint::{Constraint, ConstraintId, ConstraintSet, UpperBoundConstraint};
use crate::engine::{Statement, StatementId, StatementOp};
use crate::error::{OperatorKind, SolveError};
use crate::operator_table::OperatorTable;
use crate::term::{TermData, TermId, TermStore, term_for_type};
use crate::vars::{BoundKind, Var, VarData, VarId};
use fixedbitset::FixedBitSet;
use indexmap::IndexMap;
use njsc_common::Interner;
use njsc_types::{Property, TypeData, TypeId, TypeStore, TypeVarId, display_type};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub struct Solver {
    pub(crate) interner: Interner,
    pub(crate) types: TypeStore,
    pub(crate) terms: TermStore,
    pub(crate) constraints: ConstraintSet,
    pub(crate) causes: CauseStore,
    /// Cause recorded for each constraint added during normalization.
    pub(crate) constraint_causes: FxHashMap<ConstraintId, CauseId>,
    /// MRO/MRW upper-bound side constraints from normalization.
    pub(crate) mro_mrw_constraints: Vec<UpperBoundConstraint>,
    /// Registration order and cause of every term with bounds.
    pub(crate) term_existence: IndexMap<TermId, CauseId>,
    pub(crate) lower: FxHashMap<TermId, VarId>,
    pub(crate) upper: FxHashMap<TermId, VarId>,
    pub(crate) prop_vars: FxHashMap<TermId, VarId>,
    pub(crate) vars: Vec<Var>,
    pub(crate) stmts: Vec<Statement>,
    pub(crate) stmt_dedup: FxHashMap<(StatementOp, VarId, SmallVec<[VarId; 3]>), StatementId>,
    pub(crate) deps: FxHashMap<VarId, Vec<StatementId>>,
    pub(crate) worklist: VecDeque<StatementId>,
    pub(crate) queued: FixedBitSet,
    /// Terms constrained to be concrete, with the constraint's cause.
    pub(crate) concrete_terms: Vec<(TermId, CauseId)>,
    /// `FunctionReturn` terms whose call arity must match the solved type.
    pub(crate) arities_to_check: FxHashMap<TermId, ConstraintId>,
    pub(crate) operator_table: &'static OperatorTable,
    /// Per-statement fresh element variable for map-typed operand bounds.
    pub(crate) map_elem_vars: FxHashMap<StatementId, TypeVarId>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Solver {
    pub fn new(
        interner: Interner,
        types: TypeStore,
        terms: TermStore,
        constraints: ConstraintSet,
        operator_table: &'static OperatorTable,
    ) -> Self {
        Self {
            interner,
            types,
            terms,
            constraints,
            causes: CauseStore::new(),
            constraint_causes: FxHashMap::default(),
            mro_mrw_constraints: Vec::new(),
            term_existence: IndexMap::new(),
            lower: FxHashMap::default(),
            upper: FxHashMap::default(),
            prop_vars: FxHashMap::default(),
            vars: Vec::new(),
            stmts: Vec::new(),
            stmt_dedup: FxHashMap::default(),
            deps: FxHashMap::default(),
            worklist: VecDeque::new(),
            queued: FixedBitSet::new(),
            concrete_terms: Vec::new(),
            arities_to_check: FxHashMap::default(),
            operator_table,
            map_elem_vars: FxHashMap::default(),
            cancel: None,
        }
    }

    /// Install an external cancellation flag. When it is set mid-solve, the
    /// loop aborts and no `TypeAssignment` is produced.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed))
    }

    /// Solve the constraint set to completion.
    pub fn solve(mut self) -> Result<TypeAssignment, SolveError> {
        debug!("normalizing constraints");
        self.normalize_constraints();
        debug!("initializing bound variables");
        self.initialize_variables();
        debug!("registering statements");
        self.initialize_worklist();
        debug!(statements = self.stmts.len(), "solving constraints");
        self.run_to_fixpoint()?;
        debug!("extracting final solutions");
        self.find_final_solutions()
    }

    // -------------------------------------------------------------------------
    // Causes
    // -------------------------------------------------------------------------

    /// The cause a constraint carries: the one recorded during
    /// normalization, or `Src` of the constraint itself.
    pub(crate) fn cause_of(&mut self, c: ConstraintId) -> CauseId {
        if let Some(cause) = self.constraint_causes.get(&c) {
            *cause
        } else {
            self.causes.src(c)
        }
    }

    /// "Why does this term have the type it has": the term's own bound
    /// causes plus, recursively, its syntactic subterms'.
    pub(crate) fn contrib(&mut self, term: TermId) -> CauseId {
        let lo = self.lower.get(&term).map_or(CauseId::NO_REASON, |v| self.vars[v.0 as usize].reason);
        let hi = self.upper.get(&term).map_or(CauseId::NO_REASON, |v| self.vars[v.0 as usize].reason);
        let existence = self.term_existence.get(&term).copied().unwrap_or(CauseId::NO_REASON);
        let mut cause = self.causes.derived(&[lo, hi, existence]);
        for sub in self.terms.subterms(term) {
            let sub_cause = self.contrib(sub);
            cause = self.causes.derived(&[cause, sub_cause]);
        }
        cause
    }

    /// The cause that was active when a constraint was added; exposed for
    /// the external soft-constraint relaxation mode.
    pub fn constraint_cause_table(&self) -> &FxHashMap<ConstraintId, CauseId> {
        &self.constraint_causes
    }

    /// The cause under which a term was first registered.
    pub fn term_cause(&self, term: TermId) -> Option<CauseId> {
        self.term_existence.get(&term).copied()
    }

    // -------------------------------------------------------------------------
    // Variables
    // -------------------------------------------------------------------------

    fn alloc_var(&mut self, var: Var) -> VarId {
        let id = VarId(u32::try_from(self.vars.len()).expect("variable arena overflow"));
        self.vars.push(var);
        id
    }

    pub(crate) fn var_ty(&self, v: VarId) -> TypeId {
        self.vars[v.0 as usize].ty()
    }

    pub(crate) fn var_reason(&self, v: VarId) -> CauseId {
        self.vars[v.0 as usize].reason
    }

    pub(crate) fn var_term(&self, v: VarId) -> TermId {
        self.vars[v.0 as usize].term()
    }

    pub(crate) fn var_justifying(&self, v: VarId) -> Option<TermId> {
        self.vars[v.0 as usize].justifying()
    }

    /// Update a bound's type, clearing its justifying term.
    pub(crate) fn set_bound(&mut self, v: VarId, ty: TypeId, cause: CauseId) {
        self.set_bound_with_term(v, ty, None, cause);
    }

    pub(crate) fn set_bound_with_term(
        &mut self,
        v: VarId,
        ty: TypeId,
        term: Option<TermId>,
        cause: CauseId,
    ) {
        let old_reason = self.vars[v.0 as usize].reason;
        let reason = self.causes.derived(&[old_reason, cause]);
        match &mut self.vars[v.0 as usize].data {
            VarData::Bound { ty: slot, justifying, .. } => {
                *slot = ty;
                *justifying = term;
            }
            VarData::Props { .. } => unreachable!("props variable used as a type bound"),
        }
        self.vars[v.0 as usize].reason = reason;
    }

    pub(crate) fn lower_var(&self, term: TermId) -> VarId {
        self.lower[&term]
    }

    pub(crate) fn upper_var(&self, term: TermId) -> VarId {
        self.upper[&term]
    }

    /// The MRO/MRW variable of a term, created lazily on first reference.
    pub(crate) fn prop_var(&mut self, term: TermId) -> VarId {
        if let Some(existing) = self.prop_vars.get(&term) {
            return *existing;
        }
        let id = self.alloc_var(Var::props(term));
        self.prop_vars.insert(term, id);
        id
    }

    // -------------------------------------------------------------------------
    // Bound initialization
    // -------------------------------------------------------------------------

    /// Register a term's bounds. Idempotent: the second and later calls are
    /// no-ops. Must run before any statement referencing the term's bounds.
    pub(crate) fn init_bounds(&mut self, t: TermId, reason: CauseId) {
        if self.term_existence.contains_key(&t) {
            return;
        }
        self.term_existence.insert(t, reason);
        let fixed = |kind, ty| Var {
            data: VarData::Bound { term: t, kind, ty, justifying: Some(t) },
            reason,
        };
        let (lo, hi) = if self.terms.is_type_source(t) {
            let ty = self.terms.type_of(t).expect("type source carries a declared type");
            (fixed(BoundKind::Lower, ty), fixed(BoundKind::Upper, ty))
        } else if self.terms.is_null_like(t) {
            // BottomRef lets null unify with any reference type without
            // forcing premature generalization
            (
                fixed(BoundKind::Lower, TypeId::BOTTOM_REF),
                Var::bound(t, BoundKind::Upper, TypeId::TOP),
            )
        } else {
            (
                Var::bound(t, BoundKind::Lower, TypeId::BOTTOM),
                Var::bound(t, BoundKind::Upper, TypeId::TOP),
            )
        };
        let lo = self.alloc_var(lo);
        let hi = self.alloc_var(hi);
        self.lower.insert(t, lo);
        self.upper.insert(t, hi);
    }

    pub(crate) fn initialize_variables(&mut self) {
        // normalization may have rebound declared-type slots after a term's
        // bounds were registered; re-sync type-source bounds to the final
        // declared types before solving starts
        for t in self.term_existence.keys().copied().collect::<Vec<_>>() {
            if self.terms.is_type_source(t) {
                let ty = self.terms.type_of(t).expect("type source carries a declared type");
                for v in [self.lower_var(t), self.upper_var(t)] {
                    if let VarData::Bound { ty: slot, .. } = &mut self.vars[v.0 as usize].data {
                        *slot = ty;
                    }
                }
            }
        }
        for c in self.constraints.ids().collect::<Vec<_>>() {
            let cause = self.cause_of(c);
            for t in self.constraints.get(c).terms() {
                self.init_bounds(t, cause);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Statement registration
    // -------------------------------------------------------------------------

    pub(crate) fn initialize_worklist(&mut self) {
        self.generate_solver_type_constraints();
        self.connect_upper_and_lower_bounds();
        self.generate_operator_statements();
        self.generate_mro_mrw_statements();
        self.add_sources_to_worklist();
    }

    fn generate_solver_type_constraints(&mut self) {
        for c in self.constraints.ids().collect::<Vec<_>>() {
            let cause = self.cause_of(c);
            match self.constraints.get(c).clone() {
                Constraint::SubType { left, right } => {
                    self.add_subtype_statements(left, right, false, cause);
                }
                Constraint::Equality { left, right } => {
                    // simulate equating by two directional constraints
                    self.equate_terms(left, right, false, cause);
                }
                Constraint::Proto { term } => {
                    let TermData::Proto(base) = *self.terms.data(term) else {
                        unreachable!("proto constraint on a non-proto term");
                    };
                    self.init_bounds(base, cause);
                    let lo = self.lower_var(base);
                    self.new_statement(
                        StatementOp::Proto { proto_term: term },
                        lo,
                        SmallVec::from_slice(&[lo]),
                        cause,
                        false,
                    );
                }
                Constraint::InheritProps { term } => {
                    let TermData::ProtoParent(base) = *self.terms.data(term) else {
                        unreachable!("inherit-props constraint on a non-proto-parent term");
                    };
                    self.init_bounds(term, cause);
                    self.init_bounds(base, cause);
                    let base_lo = self.lower_var(base);
                    let parent_lo = self.lower_var(term);
                    self.new_statement(
                        StatementOp::InheritProps,
                        base_lo,
                        SmallVec::from_slice(&[base_lo, parent_lo]),
                        cause,
                        false,
                    );
                    // the child also inherits the parent's MRO/MRW view
                    let base_props = self.prop_var(base);
                    let parent_props = self.prop_var(term);
                    self.new_statement(
                        StatementOp::CopyMroMrw,
                        base_props,
                        SmallVec::from_slice(&[parent_props]),
                        cause,
                        false,
                    );
                }
                Constraint::Concrete { term } => {
                    self.concrete_terms.push((term, cause));
                }
                Constraint::CheckArity { term } => {
                    self.arities_to_check.insert(term, c);
                }
            }
        }
    }

    /// Connect each term's lower and upper bound through an inside
    /// statement, the actual subsumption check site. Object literal terms
    /// instead get a statement checking their properties against the
    /// MRO/MRW sets.
    fn connect_upper_and_lower_bounds(&mut self) {
        let terms: Vec<TermId> = self.term_existence.keys().copied().collect();
        for t in terms {
            if !self.terms.is_type_source(t) {
                let reason = self.contrib(t);
                let lo = self.lower_var(t);
                let hi = self.upper_var(t);
                let props = self.prop_var(t);
                self.new_statement(
                    StatementOp::Inside { term: t },
                    lo,
                    SmallVec::from_slice(&[lo, hi, props]),
                    reason,
                    false,
                );
            } else if matches!(self.terms.data(t), TermData::ObjectLiteral(_)) {
                let reason = self.contrib(t);
                let lo = self.lower_var(t);
                let props = self.prop_var(t);
                self.new_statement(
                    StatementOp::MroMrwToObjectLiteral { term: t },
                    lo,
                    SmallVec::from_slice(&[props]),
                    reason,
                    false,
                );
            }
        }
    }

    fn generate_operator_statements(&mut self) {
        for c in self.constraints.ids().collect::<Vec<_>>() {
            let constraint = self.constraints.get(c).clone();
            let right = match constraint {
                Constraint::SubType { right, .. } | Constraint::Equality { right, .. } => right,
                _ => continue,
            };
            match *self.terms.data(right) {
                TermData::Operator { op, left: op_left, right: op_right } => {
                    let cause = self.cause_of(c);
                    self.init_bounds(op_left, cause);
                    self.init_bounds(op_right, cause);
                    if &*self.interner.resolve(op) == "||" {
                        // either operand may flow through unchanged
                        self.add_subtype_statements(op_left, right, false, cause);
                        self.add_subtype_statements(op_right, right, false, cause);
                    } else {
                        let line = self.constraints.line(c);
                        let lhs = self.lower_var(right);
                        let rhs = SmallVec::from_slice(&[
                            self.lower_var(op_left),
                            self.lower_var(op_right),
                            self.upper_var(right),
                        ]);
                        self.new_statement(StatementOp::Infix { op, line }, lhs, rhs, cause, true);
                    }
                }
                TermData::UnaryOperator { op, operand, prefix } => {
                    let cause = self.cause_of(c);
                    self.init_bounds(operand, cause);
                    let line = self.constraints.line(c);
                    let lhs = self.lower_var(right);
                    let rhs =
                        SmallVec::from_slice(&[self.lower_var(operand), self.upper_var(operand)]);
                    self.new_statement(
                        StatementOp::Unary { op, prefix, line },
                        lhs,
                        rhs,
                        cause,
                        false,
                    );
                }
                _ => {}
            }
        }
    }

    fn generate_mro_mrw_statements(&mut self) {
        for ubc in std::mem::take(&mut self.mro_mrw_constraints) {
            // the lhs var doesn't matter here; the statement only generates
            // new constraints
            let lo = self.lower_var(ubc.possible_method);
            self.new_statement(
                StatementOp::CheckForMethod { containing: ubc.containing_object },
                lo,
                SmallVec::from_slice(&[lo]),
                ubc.reason,
                false,
            );
        }
    }

    /// Seed the worklist: only type sources (and null-like terms) have
    /// known values initially; every other bound starts at a lattice
    /// extreme and contributes nothing until forced.
    fn add_sources_to_worklist(&mut self) {
        for id in 0..self.stmts.len() {
            let stmt = StatementId(id as u32);
            let rhs = self.stmts[id].rhs.clone();
            for v in rhs {
                if matches!(self.vars[v.0 as usize].data, VarData::Bound { .. }) {
                    let term = self.var_term(v);
                    if self.terms.is_type_source(term) || self.terms.is_null_like(term) {
                        self.enqueue(stmt);
                    }
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Equating
    // -------------------------------------------------------------------------

    /// Add the join/meet statements for `left <: right`.
    ///
    /// A null, undefined, or void expression on the left is equated
    /// instead, to keep the expression from being generalized to an overly
    /// broad reference type.
    pub(crate) fn add_subtype_statements(
        &mut self,
        left: TermId,
        right: TermId,
        to_worklist: bool,
        reason: CauseId,
    ) {
        if self.terms.is_null_like(left) && !self.terms.is_type_source(right) {
            self.equate_terms(left, right, to_worklist, reason);
            return;
        }
        self.init_bounds(left, reason);
        self.init_bounds(right, reason);
        if !self.terms.is_type_source(left) {
            let lhs = self.upper_var(left);
            let rhs = SmallVec::from_slice(&[self.upper_var(right)]);
            self.new_statement(StatementOp::Meet { target: left }, lhs, rhs, reason, to_worklist);
        }
        if !self.terms.is_type_source(right) {
            let lhs = self.lower_var(right);
            let rhs = SmallVec::from_slice(&[self.lower_var(left)]);
            self.new_statement(StatementOp::Join { target: right }, lhs, rhs, reason, to_worklist);
        }
    }

    /// Generate statements that force the solutions of two terms to be
    /// equal, including their MRO/MRW views.
    pub(crate) fn equate_terms(
        &mut self,
        left: TermId,
        right: TermId,
        to_worklist: bool,
        reason: CauseId,
    ) {
        self.init_bounds(left, reason);
        self.init_bounds(right, reason);
        if !self.terms.is_type_source(left) {
            let lo = self.lower_var(left);
            let rhs = SmallVec::from_slice(&[self.lower_var(right)]);
            self.new_statement(StatementOp::Join { target: left }, lo, rhs, reason, to_worklist);
            let hi = self.upper_var(left);
            let rhs = SmallVec::from_slice(&[self.upper_var(right)]);
            self.new_statement(StatementOp::Meet { target: left }, hi, rhs, reason, to_worklist);
        }
        if !self.terms.is_type_source(right) {
            let lo = self.lower_var(right);
            let rhs = SmallVec::from_slice(&[self.lower_var(left)]);
            self.new_statement(StatementOp::Join { target: right }, lo, rhs, reason, to_worklist);
            let hi = self.upper_var(right);
            let rhs = SmallVec::from_slice(&[self.upper_var(left)]);
            self.new_statement(StatementOp::Meet { target: right }, hi, rhs, reason, to_worklist);
        }
        // equated terms must converge to the same inherited view
        let left_props = self.prop_var(left);
        let right_props = self.prop_var(right);
        self.new_statement(
            StatementOp::CopyMroMrw,
            left_props,
            SmallVec::from_slice(&[right_props]),
            reason,
            to_worklist,
        );
        self.new_statement(
            StatementOp::CopyMroMrw,
            right_props,
            SmallVec::from_slice(&[left_props]),
            reason,
            to_worklist,
        );
    }

    pub(crate) fn term_for_type_id(&mut self, ty: TypeId) -> TermId {
        term_for_type(&mut self.terms, &mut self.types, ty)
    }

    /// Equate two types through their representing terms.
    pub(crate) fn equate_type_ids(&mut self, lty: TypeId, rty: TypeId, reason: CauseId) {
        let lterm = self.term_for_type_id(lty);
        let rterm = self.term_for_type_id(rty);
        self.equate_terms(lterm, rterm, true, reason);
    }

    /// Equate two code types component-wise. Returns `false` when the
    /// arities don't match (the caller decides whether that is a failure
    /// or grows an intersection).
    pub(crate) fn equate_code_types(&mut self, lty: TypeId, rty: TypeId, reason: CauseId) -> bool {
        let lsig = self.types.lookup(lty).signature().expect("code type").clone();
        let rsig = self.types.lookup(rty).signature().expect("code type").clone();
        if lsig.arity() != rsig.arity() {
            return false;
        }
        for i in 0..lsig.arity() {
            self.equate_type_ids(rsig.params[i], lsig.params[i], reason);
        }
        self.equate_type_ids(lsig.ret, rsig.ret, reason);
        let lproto = match self.types.lookup(lty) {
            TypeData::Constructor { prototype, .. } => Some(*prototype),
            _ => None,
        };
        let rproto = match self.types.lookup(rty) {
            TypeData::Constructor { prototype, .. } => Some(*prototype),
            _ => None,
        };
        if let (Some(lp), Some(rp)) = (lproto, rproto) {
            let lp = match lp {
                Some(p) => p,
                None => self.types.empty_object(),
            };
            let rp = match rp {
                Some(p) => p,
                None => self.types.empty_object(),
            };
            self.equate_type_ids(lp, rp, reason);
        }
        true
    }

    /// Equate each property of an object shape against the corresponding
    /// apparent member of `target` (an array, string, primitive, or
    /// indexable type). A missing member is a structural failure.
    pub(crate) fn equate_props_against_catalog(
        &mut self,
        props: &[Property],
        target: TypeId,
        reason: CauseId,
    ) -> Result<(), SolveError> {
        for p in props {
            let member = match njsc_types::apparent_member(&mut self.types, target, p.name) {
                Ok(member) => member,
                Err(e) => return Err(self.core_error(e.to_string(), reason)),
            };
            self.equate_type_ids(member, p.ty, reason);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Errors and rendering
    // -------------------------------------------------------------------------

    pub(crate) fn core_error(&mut self, message: impl Into<String>, cause: CauseId) -> SolveError {
        let mut core: Vec<ConstraintId> = self.causes.core(cause).into_iter().collect();
        core.sort();
        SolveError::Core { message: message.into(), core }
    }

    /// Build the failure report for a lattice-operator mismatch: the two
    /// conflicting justifying terms, the discharge site, and the operator.
    pub(crate) fn operator_error(
        &mut self,
        message: String,
        first_source: Option<TermId>,
        second_source: Option<TermId>,
        target: TermId,
        kind: OperatorKind,
        cause: CauseId,
    ) -> SolveError {
        let mut explanation = message.clone();
        explanation.push('\n');
        explanation.push_str(&self.term_with_role(first_source, kind.first_source_label()));
        explanation.push('\n');
        explanation.push_str(&self.term_with_role(second_source, kind.second_source_label()));
        explanation.push('\n');
        explanation.push_str(&self.term_with_role(Some(target), "target term"));
        let mut core: Vec<ConstraintId> = self.causes.core(cause).into_iter().collect();
        core.sort();
        SolveError::TypeOperator { message, explanation, kind, core }
    }

    fn term_with_role(&self, term: Option<TermId>, label: &str) -> String {
        match term {
            Some(t) => {
                let mut s = format!("{label}: {}", self.terms.display(t, &self.types));
                if let Some(line) = self.terms.line(t) {
                    s.push_str(&format!(" at line {line}"));
                }
                s
            }
            None => format!("{label}: unknown"),
        }
    }

    pub(crate) fn display_term(&self, t: TermId) -> String {
        self.terms.display(t, &self.types)
    }

    pub(crate) fn display_ty(&self, ty: TypeId) -> String {
        display_type(&self.types, ty)
    }

    // -------------------------------------------------------------------------
    // Inspection (used by the assignment and by tests)
    // -------------------------------------------------------------------------

    pub fn lower_bound_type(&self, term: TermId) -> Option<TypeId> {
        self.lower.get(&term).map(|v| self.var_ty(*v))
    }

    pub fn upper_bound_type(&self, term: TermId) -> Option<TypeId> {
        self.upper.get(&term).map(|v| self.var_ty(*v))
    }

    pub fn mro_of(&self, term: TermId) -> &[Property] {
        self.prop_vars.get(&term).map_or(&[], |v| self.vars[v.0 as usize].mro())
    }

    pub fn mrw_of(&self, term: TermId) -> &[Property] {
        self.prop_vars.get(&term).map_or(&[], |v| self.vars[v.0 as usize].mrw())
    }

    pub fn registered_terms(&self) -> impl Iterator<Item = TermId> + '_ {
        self.term_existence.keys().copied()
    }

    pub fn types(&self) -> &TypeStore {
        &self.types
    }

    pub fn terms(&self) -> &TermStore {
        &self.terms
    }
}

//! Evaluation of operator-application statements against the overload
//! table.
//!
//! For an infix application, the statement filters the operator's cases by
//! the operand lower bounds and the result upper bound, folds the
//! surviving cases into coarse operand/result bounds, pushes subtype
//! obligations onto the operands, and raises the result's lower bound. An
//! empty case list is an overload-resolution failure naming the operator,
//! the line, and the operand types.
//!
//! For simplicity, upper bounds of the operands are not consulted; truly
//! bottom-up inference would need them, and with them tricky cases like an
//! expression whose only bound is `{ length: T }` (object, array, or
//! string).

use crate::cause::CauseId;
use crate::engine::{Statement, StatementId};
use crate::error::SolveError;
use crate::operator_table::{InfixCase, OpType, UnaryCase, more_specific};
use crate::solver::Solver;
use njsc_common::Atom;
use njsc_types::{TypeData, TypeId, is_subtypeish};
use std::cmp::Ordering;
use tracing::debug;

impl Solver {
    /// Reduce a type to the representative shape the operator table speaks
    /// about: any object to the object representative, any array to the
    /// array representative, and so on.
    fn normalize_operand(&mut self, ty: TypeId) -> TypeId {
        match self.types.lookup(ty) {
            TypeData::Object(_) => self.types.empty_object(),
            TypeData::Array(_) => self.types.array(TypeId::ANY),
            TypeData::Function(_) => self.types.function(Vec::new(), TypeId::ANY),
            TypeData::Map(_) => self.types.map(TypeId::ANY),
            _ => ty,
        }
    }

    /// The representative type of an operator-table case type.
    fn optype_rep(&mut self, op_ty: OpType) -> TypeId {
        match op_ty {
            OpType::Int => TypeId::INT,
            OpType::Float => TypeId::FLOAT,
            OpType::Bool => TypeId::BOOL,
            OpType::String => TypeId::STRING,
            OpType::Reference => TypeId::TOP_REF,
            OpType::Object => self.types.empty_object(),
            OpType::Array => self.types.array(TypeId::ANY),
            OpType::Function => self.types.function(Vec::new(), TypeId::ANY),
            OpType::Map => self.types.map(TypeId::ANY),
        }
    }

    fn operand_matches(&mut self, ty: TypeId, case_ty: OpType) -> bool {
        let norm = self.normalize_operand(ty);
        let rep = self.optype_rep(case_ty);
        is_subtypeish(&self.types, norm, rep)
    }

    fn result_matches(&mut self, case_ty: OpType, result_ty: TypeId) -> bool {
        let rep = self.optype_rep(case_ty);
        let norm = self.normalize_operand(result_ty);
        is_subtypeish(&self.types, rep, norm)
    }

    pub(crate) fn eval_infix(
        &mut self,
        stmt_id: StatementId,
        op: Atom,
        line: Option<u32>,
        stmt: &Statement,
    ) -> Result<bool, SolveError> {
        let left_lo = stmt.rhs[0];
        let right_lo = stmt.rhs[1];
        let result_hi = stmt.rhs[2];
        let orig = self.var_ty(stmt.lhs);

        let left = match self.var_ty(left_lo) {
            ty if matches!(self.types.lookup(ty), TypeData::Bottom) => None,
            ty => Some(ty),
        };
        let right = match self.var_ty(right_lo) {
            ty if matches!(self.types.lookup(ty), TypeData::Bottom) => None,
            ty => Some(ty),
        };
        let result = match self.var_ty(result_hi) {
            ty if matches!(self.types.lookup(ty), TypeData::Top) => None,
            ty => Some(ty),
        };

        let derived = self.causes.derived(&[
            self.var_reason(left_lo),
            self.var_reason(right_lo),
            self.var_reason(result_hi),
            stmt.reason,
        ]);

        let op_name = self.interner.resolve(op).to_string();
        let cases: Vec<InfixCase> = self.operator_table.infix_cases(&op_name)?.to_vec();
        let cases: Vec<InfixCase> = cases
            .into_iter()
            .filter(|c| {
                left.is_none_or(|t| self.operand_matches(t, c.left))
                    && right.is_none_or(|t| self.operand_matches(t, c.right))
                    && result.is_none_or(|t| self.result_matches(c.result, t))
            })
            .collect();
        debug!(op = %op_name, ?cases, "filtered overload cases");

        if cases.is_empty() {
            let render = |side: Option<TypeId>| {
                side.map_or_else(|| "_".to_string(), |t| self.display_ty(t))
            };
            let message = format!(
                "no possible overloading for {} {} {} -> {}{}",
                render(left),
                op_name,
                render(right),
                render(result),
                line.map(|l| format!(" (line {l})")).unwrap_or_default()
            );
            return Err(self.core_error(message, derived));
        }

        let left_bound = cases.iter().map(|c| c.left).fold(None, fold_upper);
        let mut right_bound = cases.iter().map(|c| c.right).fold(None, fold_upper);
        let result_bound = cases.iter().map(|c| c.result).fold(None, fold_lower);

        // the type of a map's values is unconstrained here; share one fresh
        // element variable per statement
        let mut map_bound_ty = None;
        if right_bound == Some(Bound::Ty(OpType::Map)) {
            let v = match self.map_elem_vars.get(&stmt_id) {
                Some(v) => *v,
                None => {
                    let v = self.terms.fresh_type_var();
                    self.map_elem_vars.insert(stmt_id, v);
                    v
                }
            };
            let elem = self.types.var(v);
            map_bound_ty = Some(self.types.map(elem));
            right_bound = Some(Bound::Materialized);
        }

        let left_term = self.var_term(left_lo);
        let right_term = self.var_term(right_lo);
        self.add_operand_bound(left_term, left_bound, None, stmt.reason);
        self.add_operand_bound(right_term, right_bound, map_bound_ty, stmt.reason);

        match result_bound {
            None | Some(Bound::Bottom) => Ok(false),
            Some(Bound::Ty(result_op_ty)) => {
                let result_ty = self.optype_rep(result_op_ty);
                if orig != result_ty {
                    debug!(ty = %self.display_ty(result_ty), "setting operator result type");
                    self.set_bound(stmt.lhs, result_ty, derived);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Some(Bound::Top | Bound::Materialized) => Ok(false),
        }
    }

    fn add_operand_bound(
        &mut self,
        term: crate::term::TermId,
        bound: Option<Bound>,
        materialized: Option<TypeId>,
        reason: CauseId,
    ) {
        let ty = match (bound, materialized) {
            (_, Some(ty)) => ty,
            (Some(Bound::Ty(op_ty)), None) => {
                match op_ty {
                    // never emitted by the operator table; constraining to a
                    // fabricated array or function type would be wrong
                    OpType::Array | OpType::Function => {
                        unreachable!("array/function operand bound in operator table")
                    }
                    _ => self.optype_rep(op_ty),
                }
            }
            _ => return,
        };
        debug!(bound = %self.display_ty(ty), "adding operand subtype obligation");
        let bound_term = self.term_for_type_id(ty);
        self.add_subtype_statements(term, bound_term, true, reason);
    }

    pub(crate) fn eval_unary(
        &mut self,
        op: Atom,
        prefix: bool,
        line: Option<u32>,
        stmt: &Statement,
    ) -> Result<bool, SolveError> {
        let operand_lo = stmt.rhs[0];
        let orig = self.var_ty(stmt.lhs);
        let operand_ty = self.var_ty(operand_lo);
        if matches!(self.types.lookup(operand_ty), TypeData::Bottom) {
            return Ok(false);
        }
        let derived = self.causes.derived(&[
            self.var_reason(stmt.lhs),
            self.var_reason(operand_lo),
            stmt.reason,
        ]);
        let op_name = self.interner.resolve(op).to_string();
        let cases: Vec<UnaryCase> = self.operator_table.unary_cases(&op_name)?.to_vec();
        let matching = cases
            .into_iter()
            .filter(|c| c.prefix == prefix && self.operand_matches(operand_ty, c.operand))
            .min_by(|a, b| {
                // total order validated at table load
                more_specific(a.operand, b.operand).unwrap_or(Ordering::Equal)
            });
        let Some(case) = matching else {
            let position = if prefix { "prefix" } else { "postfix" };
            let message = format!(
                "unsupported operand type {} for {position} {op_name}{}",
                self.display_ty(operand_ty),
                line.map(|l| format!(" (line {l})")).unwrap_or_default()
            );
            return Err(self.core_error(message, derived));
        };
        self.add_unary_operand_bound(self.var_term(operand_lo), case.operand, derived);
        let result_ty = self.optype_rep(case.result);
        if orig != result_ty {
            debug!(ty = %self.display_ty(result_ty), "setting unary result type");
            self.set_bound(stmt.lhs, result_ty, derived);
            return Ok(true);
        }
        Ok(false)
    }

    fn add_unary_operand_bound(
        &mut self,
        term: crate::term::TermId,
        operand: OpType,
        reason: CauseId,
    ) {
        match operand {
            OpType::Function | OpType::Array => {}
            // an int operand tolerates float values (++ works on both)
            OpType::Int => {
                let bound_term = self.term_for_type_id(TypeId::FLOAT);
                self.add_subtype_statements(term, bound_term, true, reason);
            }
            other => {
                let ty = self.optype_rep(other);
                let bound_term = self.term_for_type_id(ty);
                self.add_subtype_statements(term, bound_term, true, reason);
            }
        }
    }
}

/// A folded operand/result bound: `Top`/`Bottom` sentinels or a case type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Bound {
    Top,
    Bottom,
    Ty(OpType),
    /// Replaced by a materialized type (map bounds with a shared element
    /// variable).
    Materialized,
}

/// Fold toward the least upper bound of the case types.
fn fold_upper(acc: Option<Bound>, next: OpType) -> Option<Bound> {
    match acc {
        None => Some(Bound::Ty(next)),
        Some(Bound::Top) => Some(Bound::Top),
        Some(Bound::Ty(prev)) => {
            if crate::operator_table::optype_le(prev, next) {
                Some(Bound::Ty(next))
            } else if crate::operator_table::optype_le(next, prev) {
                Some(Bound::Ty(prev))
            } else {
                Some(Bound::Top)
            }
        }
        other => other,
    }
}

/// Fold toward the greatest lower bound of the case types.
fn fold_lower(acc: Option<Bound>, next: OpType) -> Option<Bound> {
    match acc {
        None => Some(Bound::Ty(next)),
        Some(Bound::Bottom) => Some(Bound::Bottom),
        Some(Bound::Ty(prev)) => {
            if crate::operator_table::optype_le(prev, next) {
                Some(Bound::Ty(prev))
            } else if crate::operator_table::optype_le(next, prev) {
                Some(Bound::Ty(next))
            } else {
                Some(Bound::Bottom)
            }
        }
        other => other,
    }
}

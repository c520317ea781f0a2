//! The join operator: raises a lower bound as new evidence flows in.
//!
//! `Bottom ⊔ x = x` initializes the bound. Two object types with the same
//! prototype parent keep the larger inherited set; objects with different
//! (or absent) parents defer to an `ObjectUnion` rather than failing
//! eagerly — the prototype chain may later reveal shared structure.
//! Arrays, maps, and code types of matching shape join by equating their
//! nested type variables, never by recomputing a new type.

use crate::cause::CauseId;
use crate::error::{OperatorKind, SolveError};
use crate::solver::Solver;
use crate::term::{TermData, TermId};
use crate::vars::VarId;
use njsc_types::{ObjectShape, TypeData, TypeId, is_ref_type};
use rustc_hash::FxHashSet;
use tracing::trace;

impl Solver {
    pub(crate) fn eval_join(
        &mut self,
        target: TermId,
        lhs: VarId,
        rhs: VarId,
        reason: CauseId,
    ) -> Result<bool, SolveError> {
        let old = self.var_ty(lhs);
        let rhs_ty = self.var_ty(rhs);
        trace!(target = %self.display_term(target), "join");
        if old == rhs_ty {
            return Ok(false);
        }
        if matches!(self.types.lookup(old), TypeData::Bottom) {
            return self.join_initialize(target, lhs, rhs, rhs_ty, reason).map(|()| true);
        }
        if matches!(self.types.lookup(rhs_ty), TypeData::Bottom) {
            return Ok(false);
        }
        self.join_types(target, lhs, rhs, reason)
    }

    /// First evidence for this bound: adopt the rhs type, tracking the term
    /// that justifies it for later diagnosis.
    fn join_initialize(
        &mut self,
        target: TermId,
        lhs: VarId,
        rhs: VarId,
        rhs_ty: TypeId,
        reason: CauseId,
    ) -> Result<(), SolveError> {
        let mut justifying = self.var_justifying(rhs);
        if let Some(t) = justifying {
            if matches!(self.terms.data(t), TermData::TypeConstant(_)) {
                // a type constant is not useful for diagnosis; use the
                // expression term holding this bound instead
                justifying = Some(self.var_term(lhs));
            }
        }
        let mut new_ty = rhs_ty;
        if let TypeData::UnattachedMethod { sig, .. } = self.types.lookup(rhs_ty).clone() {
            if let TermData::PropertyAccess { base, .. } = *self.terms.data(target) {
                if self.is_valid_method_update_target(base) {
                    // the write attaches the method to its new owner
                    new_ty = self.types.attached_method(sig.params.clone(), sig.ret);
                } else {
                    let cause = self.causes.derived(&[
                        self.var_reason(lhs),
                        self.var_reason(rhs),
                        reason,
                    ]);
                    let message = match self.terms.line(target) {
                        Some(line) => format!(
                            "cannot update {} with a method (line {line})",
                            self.display_term(target)
                        ),
                        None => format!("cannot update {} with a method", self.display_term(target)),
                    };
                    return Err(self.core_error(message, cause));
                }
            }
        }
        let cause =
            self.causes.derived(&[self.var_reason(lhs), self.var_reason(rhs), reason]);
        self.set_bound_with_term(lhs, new_ty, justifying, cause);
        Ok(())
    }

    /// Method values may only be written into an object literal property, a
    /// `this` property inside a constructor, or a constructor's
    /// `prototype` property.
    fn is_valid_method_update_target(&self, base: TermId) -> bool {
        match self.terms.data(base) {
            TermData::ObjectLiteral(_) => true,
            TermData::This { in_constructor, .. } => *in_constructor,
            TermData::PropertyAccess { name, .. } => {
                &*self.interner.resolve(*name) == "prototype"
            }
            _ => false,
        }
    }

    fn fail_join(
        &mut self,
        message: &str,
        lhs: VarId,
        rhs: VarId,
        target: TermId,
        reason: CauseId,
    ) -> SolveError {
        let full = format!(
            "{message}: {} and {}",
            self.display_ty(self.var_ty(lhs)),
            self.display_ty(self.var_ty(rhs))
        );
        let cause = self.causes.derived(&[self.var_reason(lhs), self.var_reason(rhs), reason]);
        self.operator_error(
            full,
            self.var_justifying(lhs),
            self.var_justifying(rhs),
            target,
            OperatorKind::Join,
            cause,
        )
    }

    fn join_types(
        &mut self,
        target: TermId,
        lhs: VarId,
        rhs: VarId,
        reason: CauseId,
    ) -> Result<bool, SolveError> {
        let derived = self.causes.derived(&[self.var_reason(lhs), self.var_reason(rhs), reason]);
        let l = self.var_ty(lhs);
        let r = self.var_ty(rhs);
        let ldata = self.types.lookup(l).clone();
        let rdata = self.types.lookup(r).clone();
        match (&ldata, &rdata) {
            (TypeData::Object(lsh), TypeData::Object(rsh)) => {
                if let (Some(lp), Some(rp)) = (lsh.prototype_parent, rsh.prototype_parent) {
                    if lp == rp {
                        debug_assert!(
                            same_own_properties(lsh, rsh),
                            "objects with the same prototype parent must share own properties"
                        );
                        let l_inh: FxHashSet<_> =
                            lsh.inherited_properties().map(|p| p.name).collect();
                        let r_inh: FxHashSet<_> =
                            rsh.inherited_properties().map(|p| p.name).collect();
                        assert!(
                            r_inh.is_superset(&l_inh) || l_inh.is_superset(&r_inh),
                            "incomparable inherited property sets on a shared prototype chain"
                        );
                        if l_inh != r_inh && r_inh.len() > l_inh.len() {
                            self.set_bound(lhs, r, derived);
                            return Ok(true);
                        }
                        return Ok(false);
                    }
                }
                // defer: even with no prototype inheritance, the
                // properties may turn out to have the same type later
                let union = self.types.object_union(vec![l, r]);
                self.set_bound(lhs, union, derived);
                Ok(true)
            }
            (TypeData::Object(_), TypeData::ObjectUnion(cases)) => {
                let new_cases = self.join_object_into_union(cases.clone(), l);
                let union = self.types.object_union(new_cases);
                self.set_bound(lhs, union, derived);
                Ok(true)
            }
            (TypeData::ObjectUnion(cases), TypeData::Object(_)) => {
                let new_cases = self.join_object_into_union(cases.clone(), r);
                let union = self.types.object_union(new_cases);
                if union != l {
                    self.set_bound(lhs, union, derived);
                    return Ok(true);
                }
                Ok(false)
            }
            (TypeData::ObjectUnion(lcases), TypeData::ObjectUnion(rcases)) => {
                let mut cases = lcases.clone();
                for o in rcases {
                    cases = self.join_object_into_union(cases, *o);
                }
                let union = self.types.object_union(cases);
                if union != l {
                    self.set_bound(lhs, union, derived);
                    return Ok(true);
                }
                Ok(false)
            }
            (TypeData::Array(le), TypeData::Array(re)) => {
                self.equate_type_ids(*le, *re, derived);
                Ok(false)
            }
            (TypeData::Map(le), TypeData::Map(re)) => {
                self.equate_type_ids(*le, *re, derived);
                Ok(false)
            }
            (
                TypeData::UnknownIndexable { key: lk, elem: le, .. },
                TypeData::UnknownIndexable { key: rk, elem: re, .. },
            ) => {
                self.equate_type_ids(*lk, *rk, derived);
                self.equate_type_ids(*le, *re, derived);
                Ok(false)
            }
            (ld, rd) if ld.is_code() && rd.is_code() => {
                let success = self.equate_code_types(r, l, derived);
                if !success {
                    return Err(self.fail_join(
                        "could not join function types",
                        lhs,
                        rhs,
                        target,
                        reason,
                    ));
                }
                let l_ctor = matches!(ld, TypeData::Constructor { .. });
                let r_ctor = matches!(rd, TypeData::Constructor { .. });
                if l_ctor != r_ctor {
                    return Err(self.fail_join(
                        "could not join constructor with non-constructor",
                        lhs,
                        rhs,
                        target,
                        reason,
                    ));
                }
                // a function joined with a method becomes a method
                if matches!(ld, TypeData::Function(_)) && rd.is_method() {
                    self.set_bound(lhs, r, derived);
                    return Ok(true);
                }
                Ok(false)
            }
            (TypeData::Float, TypeData::Int) => Ok(false),
            (TypeData::Int, TypeData::Float) => {
                self.set_bound(lhs, TypeId::FLOAT, derived);
                Ok(true)
            }
            (TypeData::BottomRef, _) if is_ref_type(&self.types, r) => {
                self.set_bound(lhs, r, derived);
                Ok(true)
            }
            (_, TypeData::BottomRef) if is_ref_type(&self.types, l) => Ok(false),
            _ => Err(self.fail_join("join not defined on types", lhs, rhs, target, reason)),
        }
    }

    /// Join one object into a union: an exact or same-prototype case is
    /// refreshed with any newly inherited properties; otherwise the object
    /// becomes a new case.
    fn join_object_into_union(&mut self, cases: Vec<TypeId>, obj: TypeId) -> Vec<TypeId> {
        let obj_shape = self.types.object_shape(obj).expect("object union case").clone();
        let mut matching: Option<usize> = None;
        for (i, case) in cases.iter().enumerate() {
            let case_shape = self.types.object_shape(*case).expect("object union case");
            let same_parent = match (obj_shape.prototype_parent, case_shape.prototype_parent) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            };
            if *case == obj || same_parent {
                debug_assert!(matching.is_none(), "ambiguous matching case in object union");
                matching = Some(i);
            }
        }
        match matching {
            Some(i) if cases[i] == obj => cases,
            Some(i) => {
                let case_shape = self.types.object_shape(cases[i]).expect("object union case");
                let obj_inh: FxHashSet<_> = obj_shape.inherited_properties().map(|p| p.name).collect();
                let case_inh: FxHashSet<_> =
                    case_shape.inherited_properties().map(|p| p.name).collect();
                assert!(
                    obj_inh.is_superset(&case_inh) || case_inh.is_superset(&obj_inh),
                    "incomparable inherited property sets in object union"
                );
                if !case_inh.is_superset(&obj_inh) {
                    let mut new_cases = cases;
                    new_cases[i] = obj;
                    new_cases
                } else {
                    cases
                }
            }
            None => {
                let mut new_cases = cases;
                new_cases.push(obj);
                new_cases
            }
        }
    }
}

fn same_own_properties(a: &ObjectShape, b: &ObjectShape) -> bool {
    let a_own: FxHashSet<_> = a.own_properties().map(|p| p.name).collect();
    let b_own: FxHashSet<_> = b.own_properties().map(|p| p.name).collect();
    a_own == b_own
}

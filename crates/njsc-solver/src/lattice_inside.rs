//! The inside operator: the actual subsumption check.
//!
//! Every non-type-source term gets one inside statement discharging "does
//! the current lower bound fit where the current upper bound requires?".
//! The operator never changes the bounds it reads; it equates nested type
//! variables, checks property types against the term's MRO/MRW sets, and
//! fails when the two shapes cannot be reconciled. Property *presence* is
//! deliberately not checked here — the prototype chain may still supply a
//! missing property, so presence is deferred to final validation.

use crate::cause::CauseId;
use crate::error::{OperatorKind, SolveError};
use crate::solver::Solver;
use crate::term::TermId;
use crate::vars::VarId;
use njsc_types::{ObjectShape, TypeData, TypeId, is_ref_type};
use tracing::trace;

impl Solver {
    pub(crate) fn eval_inside(
        &mut self,
        term: TermId,
        lo: VarId,
        hi: VarId,
        props_var: VarId,
        reason: CauseId,
    ) -> Result<(), SolveError> {
        let lower = self.var_ty(lo);
        let upper = self.var_ty(hi);
        trace!(term = %self.display_term(term), "inside");
        let derived = self.causes.derived(&[
            self.var_reason(lo),
            self.var_reason(hi),
            self.var_reason(props_var),
            reason,
        ]);
        let ldata = self.types.lookup(lower).clone();
        let udata = self.types.lookup(upper).clone();

        if lower == upper
            || matches!(ldata, TypeData::Bottom)
            || matches!(udata, TypeData::Top)
        {
            return Ok(());
        }
        if matches!(udata, TypeData::TopRef) && is_ref_type(&self.types, lower) {
            return Ok(());
        }
        if matches!(ldata, TypeData::BottomRef) && is_ref_type(&self.types, upper) {
            return Ok(());
        }
        match (&ldata, &udata) {
            // implicit numeric widening
            (TypeData::Int, TypeData::Float) => Ok(()),
            (TypeData::Object(lsh), TypeData::Object(ush)) => {
                self.inside_object_shapes(&lsh.clone(), &ush.clone(), props_var, derived);
                Ok(())
            }
            (TypeData::ObjectUnion(cases), TypeData::Object(ush)) => {
                let ush = ush.clone();
                for case in cases.clone() {
                    let case_shape =
                        self.types.object_shape(case).expect("object union case").clone();
                    self.inside_object_shapes(&case_shape, &ush, props_var, derived);
                }
                Ok(())
            }
            (_, TypeData::UnknownIndexable { key, elem, properties }) => {
                let (key, elem) = (*key, *elem);
                let upper_props = properties.clone();
                match &ldata {
                    TypeData::Array(arr_elem) => {
                        self.equate_type_ids(*arr_elem, elem, derived);
                        self.equate_type_ids(key, TypeId::INT, derived);
                        self.equate_props_against_catalog(&upper_props, lower, derived)
                    }
                    TypeData::Map(map_elem) => {
                        self.equate_type_ids(*map_elem, elem, derived);
                        self.equate_type_ids(key, TypeId::STRING, derived);
                        Ok(())
                    }
                    TypeData::String => {
                        self.equate_type_ids(key, TypeId::INT, derived);
                        self.equate_type_ids(elem, TypeId::STRING, derived);
                        self.equate_props_against_catalog(&upper_props, lower, derived)
                    }
                    _ => Err(self.fail_inside(term, lo, hi, reason)),
                }
            }
            (ld, TypeData::Object(ush)) if ld.is_primitive() => {
                let upper_props = ush.properties.clone();
                match self.equate_props_against_catalog(&upper_props, lower, derived) {
                    Ok(()) => Ok(()),
                    Err(_) => Err(self.fail_inside(term, lo, hi, reason)),
                }
            }
            (TypeData::Constructor { prototype, .. }, TypeData::Object(ush)) => {
                // `C.prototype` access: the upper object may only require
                // the prototype property, which is equated with the
                // constructor's prototype type
                let props = ush.properties.clone();
                let prototype_atom = self.interner.intern("prototype");
                if props.len() != 1 || props[0].name != prototype_atom {
                    let message = format!(
                        "cannot inside object type {} with constructor type {}",
                        self.display_ty(upper),
                        self.display_ty(lower)
                    );
                    return Err(self.core_error(message, derived));
                }
                let proto = match prototype {
                    Some(p) => *p,
                    None => self.types.empty_object(),
                };
                self.equate_type_ids(props[0].ty, proto, derived);
                Ok(())
            }
            (ld, ud) if ld.is_code() && ud.is_code() => {
                // function subtyping is not modeled; the signatures are
                // equated
                self.equate_code_types(lower, upper, derived);
                Ok(())
            }
            (TypeData::Array(arr_elem), _) => match &udata {
                TypeData::Object(ush) => {
                    self.equate_props_against_catalog(&ush.properties.clone(), lower, derived)
                }
                TypeData::Array(upper_elem) => {
                    self.equate_type_ids(*arr_elem, *upper_elem, derived);
                    Ok(())
                }
                _ => Err(self.fail_inside(term, lo, hi, reason)),
            },
            (ld, TypeData::Intersection(ucases)) => {
                if ld.is_code() {
                    self.equate_code_with_intersection(lower, &ucases.clone(), derived);
                    Ok(())
                } else if let TypeData::Intersection(lcases) = ld {
                    for case in lcases.clone() {
                        self.inside_case_with_intersection(
                            case,
                            &ucases.clone(),
                            props_var,
                            derived,
                        );
                    }
                    Ok(())
                } else {
                    Err(self.fail_inside(term, lo, hi, reason))
                }
            }
            (TypeData::Intersection(_), ud) if ud.is_code() => {
                self.equate_code_with_intersection_target(upper, lower, derived);
                Ok(())
            }
            (_, TypeData::Map(upper_elem)) => match &ldata {
                TypeData::Map(lower_elem) => {
                    self.equate_type_ids(*lower_elem, *upper_elem, derived);
                    Ok(())
                }
                _ => Err(self.fail_inside(term, lo, hi, reason)),
            },
            _ => Err(self.fail_inside(term, lo, hi, reason)),
        }
    }

    fn fail_inside(
        &mut self,
        term: TermId,
        lo: VarId,
        hi: VarId,
        reason: CauseId,
    ) -> SolveError {
        let message = format!(
            "type {} flows into {}, which is used as type {}",
            self.display_ty(self.var_ty(lo)),
            self.display_term(term),
            self.display_ty(self.var_ty(hi))
        );
        let cause = self.causes.derived(&[self.var_reason(lo), self.var_reason(hi), reason]);
        self.operator_error(
            message,
            self.var_justifying(lo),
            self.var_justifying(hi),
            term,
            OperatorKind::Inside,
            cause,
        )
    }

    /// For any property required by the upper shape and present on the
    /// lower shape, equate the property types; every property of either
    /// shape is also checked against the term's MRO/MRW sets, so later
    /// prototype-chain discoveries meet the same obligation.
    fn inside_object_shapes(
        &mut self,
        lower: &ObjectShape,
        upper: &ObjectShape,
        props_var: VarId,
        reason: CauseId,
    ) {
        for p in &upper.properties {
            if let Some(lp) = lower.property(p.name) {
                self.equate_type_ids(lp.ty, p.ty, reason);
            }
            self.equate_property_with_prop_sets(props_var, p, reason);
        }
        for p in &lower.properties {
            if !upper.has_property(p.name) {
                self.equate_property_with_prop_sets(props_var, p, reason);
            }
        }
    }

    /// Equate a code type with the matching-arity function case of an
    /// intersection, when one exists.
    fn equate_code_with_intersection(
        &mut self,
        code: TypeId,
        cases: &[TypeId],
        reason: CauseId,
    ) {
        let sig = self.types.lookup(code).signature().expect("code operand").clone();
        let matching = cases.iter().copied().find(|c| {
            matches!(self.types.lookup(*c), TypeData::Function(s) if s.arity() == sig.arity())
        });
        if let Some(case) = matching {
            let case_sig = self.types.lookup(case).signature().expect("function case").clone();
            for i in 0..sig.arity() {
                self.equate_type_ids(sig.params[i], case_sig.params[i], reason);
            }
            self.equate_type_ids(sig.ret, case_sig.ret, reason);
        }
    }

    fn equate_code_with_intersection_target(
        &mut self,
        code: TypeId,
        isect: TypeId,
        reason: CauseId,
    ) {
        let TypeData::Intersection(cases) = self.types.lookup(isect).clone() else {
            unreachable!("not an intersection type");
        };
        self.equate_code_with_intersection(code, &cases, reason);
    }

    fn inside_case_with_intersection(
        &mut self,
        case: TypeId,
        upper_cases: &[TypeId],
        props_var: VarId,
        reason: CauseId,
    ) {
        let data = self.types.lookup(case).clone();
        if data.is_code() {
            self.equate_code_with_intersection(case, upper_cases, reason);
        } else if let TypeData::Object(lsh) = data {
            let upper_obj = upper_cases
                .iter()
                .copied()
                .find(|c| self.types.lookup(*c).is_object());
            if let Some(upper_obj) = upper_obj {
                let ush = self.types.object_shape(upper_obj).expect("object case").clone();
                let cause = self.causes.derived(&[self.var_reason(props_var), reason]);
                self.inside_object_shapes(&lsh, &ush, props_var, cause);
            }
        }
    }
}

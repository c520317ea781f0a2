//! The meet operator: lowers an upper bound as usage sites constrain it.
//!
//! `Top ⊓ x = x` initializes the bound. The meet of two object types unions
//! their properties, equating the types of properties present in both;
//! when a name is read-only in one operand and read-write in the other,
//! read-write wins — the meet represents whatever the use sites can
//! validly assume the value supports. Code meets with differing arities
//! grow an intersection in place instead of failing.

use crate::cause::CauseId;
use crate::error::{OperatorKind, SolveError};
use crate::solver::Solver;
use crate::term::{TermData, TermId};
use crate::vars::VarId;
use njsc_types::{Property, TypeData, TypeId, is_ref_type};
use tracing::trace;

impl Solver {
    pub(crate) fn eval_meet(
        &mut self,
        target: TermId,
        lhs: VarId,
        rhs: VarId,
        reason: CauseId,
    ) -> Result<bool, SolveError> {
        let old = self.var_ty(lhs);
        let rhs_ty = self.var_ty(rhs);
        trace!(target = %self.display_term(target), "meet");
        if old == rhs_ty {
            return Ok(false);
        }
        if matches!(self.types.lookup(old), TypeData::Top) {
            let mut justifying = self.var_justifying(rhs);
            if let Some(t) = justifying {
                if matches!(self.terms.data(t), TermData::TypeConstant(_))
                    && self.terms.line(self.var_term(lhs)).is_some()
                {
                    justifying = Some(self.var_term(lhs));
                }
            }
            let cause =
                self.causes.derived(&[self.var_reason(lhs), self.var_reason(rhs), reason]);
            self.set_bound_with_term(lhs, rhs_ty, justifying, cause);
            return Ok(true);
        }
        if matches!(self.types.lookup(rhs_ty), TypeData::Top) {
            return Ok(false);
        }
        self.meet_types(target, lhs, rhs, reason)
    }

    fn fail_meet(
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
            OperatorKind::Meet,
            cause,
        )
    }

    fn meet_types(
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
                let (met, changed) =
                    self.meet_object_properties(&lsh.properties, &rsh.properties, derived);
                if changed {
                    let met = self.types.object(met);
                    self.set_bound(lhs, met, derived);
                }
                Ok(changed)
            }
            (ld, rd) if ld.is_indexable() && rd.is_indexable() => {
                let l_unknown = matches!(ld, TypeData::UnknownIndexable { .. });
                let r_unknown = matches!(rd, TypeData::UnknownIndexable { .. });
                let same_shape = std::mem::discriminant(ld) == std::mem::discriminant(rd);
                if !(same_shape || l_unknown || r_unknown) {
                    return Err(self.fail_meet(
                        "MEET not defined on indexable types",
                        lhs,
                        rhs,
                        target,
                        reason,
                    ));
                }
                let (lk, le) = self.indexable_key_elem(l);
                let (rk, re) = self.indexable_key_elem(r);
                self.equate_type_ids(lk, rk, derived);
                self.equate_type_ids(le, re, derived);
                if l_unknown && !r_unknown {
                    self.set_bound(lhs, r, derived);
                    return Ok(true);
                }
                Ok(false)
            }
            (TypeData::UnknownIndexable { .. }, TypeData::Object(rsh)) => {
                let folded = self.fold_object_into_indexable(l, &rsh.properties.clone(), derived);
                let changed = folded != l;
                if changed {
                    self.set_bound(lhs, folded, derived);
                }
                Ok(changed)
            }
            (TypeData::Object(lsh), TypeData::UnknownIndexable { .. }) => {
                let folded = self.fold_object_into_indexable(r, &lsh.properties.clone(), derived);
                self.set_bound(lhs, folded, derived);
                Ok(true)
            }
            (TypeData::Intersection(cases), TypeData::Object(_)) => {
                match self.meet_intersection_and_object(cases.clone(), r, derived) {
                    Some(new_cases) => {
                        let new_isect = self.types.intersection(new_cases);
                        self.set_bound(lhs, new_isect, derived);
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            (TypeData::Object(_), TypeData::Intersection(cases)) => {
                let new_isect = match self.meet_intersection_and_object(cases.clone(), l, derived) {
                    Some(new_cases) => self.types.intersection(new_cases),
                    None => r,
                };
                self.set_bound(lhs, new_isect, derived);
                Ok(true)
            }
            (TypeData::Object(lsh), TypeData::Array(_)) => {
                self.equate_props_against_catalog(&lsh.properties.clone(), r, derived)?;
                self.set_bound(lhs, r, derived);
                Ok(true)
            }
            (TypeData::Array(_), TypeData::Object(rsh)) => {
                self.equate_props_against_catalog(&rsh.properties.clone(), l, derived)?;
                Ok(false)
            }
            (ld, TypeData::Object(rsh)) if ld.is_primitive() => {
                match self.equate_props_against_catalog(&rsh.properties.clone(), l, derived) {
                    Ok(()) => Ok(false),
                    Err(_) => Err(self.fail_meet("MEET not defined on types", lhs, rhs, target, reason)),
                }
            }
            (TypeData::Object(lsh), rd) if rd.is_primitive() => {
                match self.equate_props_against_catalog(&lsh.properties.clone(), r, derived) {
                    Ok(()) => {
                        self.set_bound(lhs, r, derived);
                        Ok(true)
                    }
                    Err(_) => Err(self.fail_meet("MEET not defined on types", lhs, rhs, target, reason)),
                }
            }
            (ld, rd) if ld.is_code() && rd.is_code() => {
                let same_arity = self.equate_code_types(l, r, derived);
                if !same_arity {
                    let isect = self.types.intersection(vec![l, r]);
                    self.set_bound(lhs, isect, derived);
                    return Ok(true);
                }
                Ok(false)
            }
            (ld, TypeData::Intersection(rcases)) if ld.is_code() => {
                let folded = self.meet_code_into_intersection(rcases.clone(), l, derived);
                let new_isect = self.types.intersection(folded.0);
                self.set_bound(lhs, new_isect, derived);
                Ok(true)
            }
            (TypeData::Intersection(lcases), rd) if rd.is_code() => {
                let (folded, changed) =
                    self.meet_code_into_intersection(lcases.clone(), r, derived);
                if changed {
                    let new_isect = self.types.intersection(folded);
                    self.set_bound(lhs, new_isect, derived);
                }
                Ok(changed)
            }
            (TypeData::Intersection(lcases), TypeData::Intersection(rcases)) => {
                let mut cases = lcases.clone();
                let mut changed = false;
                for case in rcases.clone() {
                    let folded = self.meet_type_into_intersection(cases, case, derived)?;
                    changed = changed || folded.1;
                    cases = folded.0;
                }
                if changed {
                    let new_isect = self.types.intersection(cases);
                    self.set_bound(lhs, new_isect, derived);
                }
                Ok(changed)
            }
            (ld, TypeData::Object(_)) if ld.is_code() => {
                let met = self.meet_code_and_object(l, r, derived)?;
                if met != l {
                    self.set_bound(lhs, met, derived);
                    return Ok(true);
                }
                Ok(false)
            }
            (TypeData::Object(_), rd) if rd.is_code() => {
                let met = self.meet_code_and_object(r, l, derived)?;
                if met != l {
                    self.set_bound(lhs, met, derived);
                    return Ok(true);
                }
                Ok(false)
            }
            (TypeData::Float, TypeData::Int) => {
                // meet of integer and float is integer
                self.set_bound(lhs, TypeId::INT, derived);
                Ok(true)
            }
            (TypeData::Int, TypeData::Float) => Ok(false),
            (TypeData::TopRef, _) if is_ref_type(&self.types, r) => {
                self.set_bound(lhs, r, derived);
                Ok(true)
            }
            (_, TypeData::TopRef) if is_ref_type(&self.types, l) => Ok(false),
            _ => Err(self.fail_meet("MEET not defined on types", lhs, rhs, target, reason)),
        }
    }

    /// Meet two property lists: union the names, equate the types of shared
    /// names, RW wins over RO. Returns the met list and whether it differs
    /// from the left operand.
    fn meet_object_properties(
        &mut self,
        lprops: &[Property],
        rprops: &[Property],
        reason: CauseId,
    ) -> (Vec<Property>, bool) {
        let mut changed = false;
        let mut props: Vec<Property> = Vec::new();
        for rp in rprops {
            match lprops.iter().find(|lp| lp.name == rp.name) {
                Some(lp) => {
                    self.equate_type_ids(lp.ty, rp.ty, reason);
                    if lp.is_ro() && rp.is_rw() {
                        props.push(Property::with_loc(lp.name, lp.ty, false, rp.loc));
                        changed = true;
                    } else {
                        props.push(lp.clone());
                    }
                }
                None => {
                    props.push(rp.clone());
                    changed = true;
                }
            }
        }
        if changed {
            for lp in lprops {
                if !rprops.iter().any(|rp| rp.name == lp.name) {
                    props.push(lp.clone());
                }
            }
        }
        (props, changed)
    }

    /// The key and element types of an indexable shape.
    pub(crate) fn indexable_key_elem(&self, ty: TypeId) -> (TypeId, TypeId) {
        match self.types.lookup(ty) {
            TypeData::Array(elem) => (TypeId::INT, *elem),
            TypeData::Map(elem) => (TypeId::STRING, *elem),
            TypeData::String => (TypeId::INT, TypeId::STRING),
            TypeData::UnknownIndexable { key, elem, .. } => (*key, *elem),
            other => unreachable!("not an indexable type: {other:?}"),
        }
    }

    /// Fold object properties into an unknown-indexable placeholder. The
    /// properties prove the value is an array or a string, so the key type
    /// is pinned to int.
    fn fold_object_into_indexable(
        &mut self,
        indexable: TypeId,
        obj_props: &[Property],
        reason: CauseId,
    ) -> TypeId {
        let TypeData::UnknownIndexable { key, elem, properties } =
            self.types.lookup(indexable).clone()
        else {
            unreachable!("not an unknown-indexable type");
        };
        self.equate_type_ids(key, TypeId::INT, reason);
        let mut props = properties;
        let mut changed = false;
        for p in obj_props {
            match props.iter().find(|q| q.name == p.name) {
                Some(existing) => {
                    self.equate_type_ids(p.ty, existing.ty, reason);
                }
                None => {
                    props.push(p.clone());
                    changed = true;
                }
            }
        }
        if changed { self.types.unknown_indexable(key, elem, props) } else { indexable }
    }

    /// Meet an object into an intersection: exactly one case of the
    /// intersection may be an object type; meet on it, or add the object
    /// as a new case. Returns the new intersection case list when it
    /// changed.
    fn meet_intersection_and_object(
        &mut self,
        cases: Vec<TypeId>,
        obj: TypeId,
        reason: CauseId,
    ) -> Option<Vec<TypeId>> {
        let obj_props = self.types.object_shape(obj).expect("object operand").properties.clone();
        let existing = cases
            .iter()
            .position(|c| self.types.lookup(*c).is_object());
        match existing {
            Some(i) => {
                let case_props =
                    self.types.object_shape(cases[i]).expect("object case").properties.clone();
                let (met, changed) = self.meet_object_properties(&case_props, &obj_props, reason);
                if changed {
                    let met = self.types.object(met);
                    let mut new_cases = cases;
                    new_cases[i] = met;
                    Some(new_cases)
                } else {
                    None
                }
            }
            None => {
                let mut new_cases = cases;
                new_cases.push(obj);
                Some(new_cases)
            }
        }
    }

    /// Meet a code type into an intersection's case list: a case of
    /// matching arity unifies component-wise; otherwise the code type
    /// becomes a new case.
    fn meet_code_into_intersection(
        &mut self,
        cases: Vec<TypeId>,
        code: TypeId,
        reason: CauseId,
    ) -> (Vec<TypeId>, bool) {
        let sig = self.types.lookup(code).signature().expect("code operand").clone();
        let arity = sig.arity();
        let existing = cases.iter().copied().find(|c| {
            let data = self.types.lookup(*c);
            data.is_code() && data.signature().is_some_and(|s| s.arity() == arity)
        });
        match existing {
            Some(case) => {
                let case_sig = self.types.lookup(case).signature().expect("code case").clone();
                for i in 0..arity {
                    self.equate_type_ids(case_sig.params[i], sig.params[i], reason);
                }
                self.equate_type_ids(case_sig.ret, sig.ret, reason);
                (cases, false)
            }
            None => {
                let mut new_cases = cases;
                new_cases.push(code);
                (new_cases, true)
            }
        }
    }

    fn meet_type_into_intersection(
        &mut self,
        cases: Vec<TypeId>,
        ty: TypeId,
        reason: CauseId,
    ) -> Result<(Vec<TypeId>, bool), SolveError> {
        let data = self.types.lookup(ty).clone();
        if data.is_code() {
            Ok(self.meet_code_into_intersection(cases, ty, reason))
        } else if data.is_object() {
            match self.meet_intersection_and_object(cases.clone(), ty, reason) {
                Some(new_cases) => Ok((new_cases, true)),
                None => Ok((cases, false)),
            }
        } else {
            let message = format!("unexpected type {} in intersection", self.display_ty(ty));
            Err(self.core_error(message, reason))
        }
    }

    /// Meet a code type with an object. A constructor only tolerates a
    /// single `prototype` property, whose type is equated with the
    /// constructor's prototype; any other code/object pairing becomes an
    /// intersection.
    pub(crate) fn meet_code_and_object(
        &mut self,
        code: TypeId,
        obj: TypeId,
        reason: CauseId,
    ) -> Result<TypeId, SolveError> {
        if let TypeData::Constructor { prototype, .. } = self.types.lookup(code).clone() {
            let props = self.types.object_shape(obj).expect("object operand").properties.clone();
            let prototype_atom = self.interner.intern("prototype");
            if props.len() != 1 || props[0].name != prototype_atom {
                let message = format!(
                    "cannot meet object type {} with constructor type {}",
                    self.display_ty(obj),
                    self.display_ty(code)
                );
                return Err(self.core_error(message, reason));
            }
            let proto = match prototype {
                Some(p) => p,
                None => self.types.empty_object(),
            };
            self.equate_type_ids(props[0].ty, proto, reason);
            Ok(code)
        } else {
            Ok(self.types.intersection(vec![code, obj]))
        }
    }
}

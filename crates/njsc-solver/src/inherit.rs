//! Structural inheritance: prototype-chain property propagation.
//!
//! Each term accumulates two monotone candidate sets: MRO (properties
//! reachable read-only through the prototype chain) and MRW (own,
//! read-write properties). A name is never stably in both; an add that
//! would violate the partition instead equates the conflicting property
//! types and moves the entry to MRW — write access dominates. This is how
//! method and field overriding across the chain is checked for
//! consistency rather than merely permitted.

use crate::cause::CauseId;
use crate::error::SolveError;
use crate::solver::Solver;
use crate::term::{TermData, TermId};
use crate::vars::{VarData, VarId};
use njsc_types::{Property, TypeData};
use smallvec::SmallVec;
use tracing::debug;

impl Solver {
    // -------------------------------------------------------------------------
    // MRO/MRW set mutation
    // -------------------------------------------------------------------------

    fn bump_props_reason(&mut self, v: VarId, cause: CauseId) {
        let old = self.vars[v.0 as usize].reason;
        self.vars[v.0 as usize].reason = self.causes.derived(&[old, cause]);
    }

    fn add_mro(&mut self, v: VarId, p: Property, cause: CauseId) {
        debug_assert!(p.is_ro());
        match &mut self.vars[v.0 as usize].data {
            VarData::Props { mro, .. } => mro.push(p),
            VarData::Bound { .. } => unreachable!("bound variable used as a props variable"),
        }
        self.bump_props_reason(v, cause);
    }

    fn add_mrw(&mut self, v: VarId, p: Property, cause: CauseId) {
        debug_assert!(p.is_rw());
        match &mut self.vars[v.0 as usize].data {
            VarData::Props { mrw, .. } => mrw.push(p),
            VarData::Bound { .. } => unreachable!("bound variable used as a props variable"),
        }
        self.bump_props_reason(v, cause);
    }

    fn remove_mro(&mut self, v: VarId, name: njsc_common::Atom, cause: CauseId) -> Property {
        let removed = match &mut self.vars[v.0 as usize].data {
            VarData::Props { mro, .. } => {
                let idx = mro
                    .iter()
                    .position(|p| p.name == name)
                    .expect("tried to remove a property missing from the MRO set");
                mro.remove(idx)
            }
            VarData::Bound { .. } => unreachable!("bound variable used as a props variable"),
        };
        self.bump_props_reason(v, cause);
        removed
    }

    /// Copy a property into the MRO set, unless a property of that name is
    /// already tracked — then the types are equated instead.
    pub(crate) fn copy_into_mro(&mut self, p: &Property, v: VarId, cause: CauseId) -> bool {
        let mrw_match = self.vars[v.0 as usize].mrw().iter().find(|q| q.name == p.name).cloned();
        if let Some(mrw_p) = mrw_match {
            self.equate_type_ids(mrw_p.ty, p.ty, cause);
            return false;
        }
        let mro_match = self.vars[v.0 as usize].mro().iter().find(|q| q.name == p.name).cloned();
        if let Some(mro_p) = mro_match {
            self.equate_type_ids(mro_p.ty, p.ty, cause);
            return false;
        }
        debug!(prop = ?p.name, "adding into MRO");
        self.add_mro(v, p.clone(), cause);
        true
    }

    /// Copy a property into the MRW set. A same-named MRO entry is equated
    /// and *moved* to MRW: write access dominates.
    pub(crate) fn copy_into_mrw(&mut self, p: &Property, v: VarId, cause: CauseId) -> bool {
        let mro_match = self.vars[v.0 as usize].mro().iter().find(|q| q.name == p.name).cloned();
        if let Some(mro_p) = mro_match {
            self.equate_type_ids(mro_p.ty, p.ty, cause);
            debug_assert!(
                !self.vars[v.0 as usize].mrw().iter().any(|q| q.name == p.name),
                "property in both MRO and MRW sets"
            );
            debug!(prop = ?p.name, "moving to MRW");
            let moved = self.remove_mro(v, p.name, cause);
            self.add_mrw(v, Property::with_loc(moved.name, moved.ty, false, moved.loc), cause);
            return true;
        }
        let mrw_match = self.vars[v.0 as usize].mrw().iter().find(|q| q.name == p.name).cloned();
        if let Some(mrw_p) = mrw_match {
            self.equate_type_ids(mrw_p.ty, p.ty, cause);
            return false;
        }
        debug!(prop = ?p.name, "adding to MRW");
        self.add_mrw(v, p.clone(), cause);
        true
    }

    /// Where the MRO/MRW sets already track a property of this name, the
    /// tracked type and the property's type are equated.
    pub(crate) fn equate_property_with_prop_sets(
        &mut self,
        v: VarId,
        p: &Property,
        cause: CauseId,
    ) {
        let mro_match = self.vars[v.0 as usize].mro().iter().find(|q| q.name == p.name).cloned();
        if let Some(q) = mro_match {
            self.equate_type_ids(q.ty, p.ty, cause);
        }
        let mrw_match = self.vars[v.0 as usize].mrw().iter().find(|q| q.name == p.name).cloned();
        if let Some(q) = mrw_match {
            self.equate_type_ids(q.ty, p.ty, cause);
        }
    }

    // -------------------------------------------------------------------------
    // Statement evaluation
    // -------------------------------------------------------------------------

    /// A deferred `proto` access: once the base term's lower bound resolves
    /// to a constructor, its prototype type is equated with the proto term.
    pub(crate) fn eval_proto(
        &mut self,
        proto_term: TermId,
        rhs: VarId,
        reason: CauseId,
    ) -> Result<(), SolveError> {
        let ty = self.var_ty(rhs);
        let cause = self.causes.derived(&[reason, self.var_reason(rhs)]);
        match self.types.lookup(ty).clone() {
            TypeData::Bottom => Ok(()),
            TypeData::Constructor { prototype, .. } => {
                if let Some(proto) = prototype {
                    debug!(proto = %self.display_ty(proto), "equating recovered prototype");
                    let proto_ty_term = self.term_for_type_id(proto);
                    self.equate_terms(proto_ty_term, proto_term, true, cause);
                }
                Ok(())
            }
            _ => Err(self.core_error("non-constructor flowing unexpectedly", cause)),
        }
    }

    /// Propagate properties from a prototype parent to the child object's
    /// lower bound. Parent properties become inherited (RO) candidates on
    /// the child; a name the child already owns is equated instead of
    /// duplicated.
    pub(crate) fn eval_inherit_props(
        &mut self,
        lhs: VarId,
        child_lo: VarId,
        parent_lo: VarId,
        reason: CauseId,
    ) -> Result<bool, SolveError> {
        let child_ty = self.var_ty(child_lo);
        let parent_ty = self.var_ty(parent_lo);
        let cause = self.causes.derived(&[
            self.var_reason(child_lo),
            self.var_reason(parent_lo),
            reason,
        ]);
        let parent_data = self.types.lookup(parent_ty).clone();
        match parent_data {
            TypeData::Bottom => Ok(false),
            TypeData::Object(parent_shape) => {
                let child_data = self.types.lookup(child_ty).clone();
                match child_data {
                    TypeData::Bottom => Ok(false),
                    TypeData::Object(child_shape) => {
                        let mut to_add: Vec<Property> = Vec::new();
                        for p in &parent_shape.properties {
                            if child_shape.has_inherited_property(p.name) {
                                continue;
                            }
                            if let Some(child_p) = child_shape.property(p.name) {
                                self.equate_type_ids(p.ty, child_p.ty, reason);
                            } else {
                                to_add.push(if p.is_ro() {
                                    p.clone()
                                } else {
                                    Property::new(p.name, p.ty, true)
                                });
                            }
                        }
                        if to_add.is_empty() {
                            return Ok(false);
                        }
                        let own: Vec<Property> =
                            child_shape.own_properties().cloned().collect();
                        let mut inherited: Vec<Property> =
                            child_shape.inherited_properties().cloned().collect();
                        inherited.extend(to_add);
                        let new_ty = self.types.object_parts(
                            child_shape.prototype_parent,
                            own,
                            inherited,
                        );
                        debug!(ty = %self.display_ty(new_ty), "inherited properties added");
                        self.set_bound(lhs, new_ty, cause);
                        Ok(true)
                    }
                    _ => Err(self.core_error("unexpected type to have a prototype", cause)),
                }
            }
            _ => {
                let message = format!(
                    "unexpected type {} flows to term {}, used as a prototype",
                    self.display_ty(parent_ty),
                    self.display_term(self.var_term(parent_lo))
                );
                Err(self.core_error(message, cause))
            }
        }
    }

    /// Propagate MRO/MRW sets along an equality edge so two equated terms
    /// converge to the same inherited view.
    pub(crate) fn eval_copy_mro_mrw(&mut self, lhs: VarId, rhs: VarId, reason: CauseId) -> bool {
        let cause = self.causes.derived(&[
            reason,
            self.vars[lhs.0 as usize].reason,
            self.vars[rhs.0 as usize].reason,
        ]);
        let mro: Vec<Property> = self.vars[rhs.0 as usize].mro().to_vec();
        let mrw: Vec<Property> = self.vars[rhs.0 as usize].mrw().to_vec();
        let mut changed = false;
        for p in &mro {
            changed |= self.copy_into_mro(p, lhs, cause);
        }
        for p in &mrw {
            changed |= self.copy_into_mrw(p, lhs, cause);
        }
        changed
    }

    /// When a term written into an object resolves to an unattached
    /// method, connect the method receiver's upper bound to the containing
    /// object's MRO/MRW sets.
    pub(crate) fn eval_check_for_method(
        &mut self,
        containing: TermId,
        rhs: VarId,
        reason: CauseId,
    ) {
        let ty = self.var_ty(rhs);
        if let TypeData::UnattachedMethod { receiver, .. } = self.types.lookup(ty).clone() {
            debug!(ty = %self.display_ty(ty), "found method type");
            debug_assert!(
                !matches!(self.types.lookup(receiver), TypeData::Any),
                "method receiver must have been replaced with a type variable"
            );
            let cause = self.causes.derived(&[reason, self.var_reason(rhs)]);
            let receiver_term = self.term_for_type_id(receiver);
            self.init_bounds(receiver_term, cause);
            let receiver_hi = self.upper_var(receiver_term);
            let props = self.prop_var(containing);
            self.new_statement(
                crate::engine::StatementOp::CopyFromUpperBound { containing },
                props,
                SmallVec::from_slice(&[receiver_hi]),
                cause,
                true,
            );
        }
    }

    /// Copy a receiver upper bound's object properties into the containing
    /// object's MRO/MRW sets.
    pub(crate) fn eval_copy_from_upper_bound(
        &mut self,
        lhs: VarId,
        rhs: VarId,
        reason: CauseId,
    ) -> bool {
        let ty = self.var_ty(rhs);
        let shape = match self.types.lookup(ty) {
            // no upper bound yet
            TypeData::Top => return false,
            TypeData::Object(shape) => shape.clone(),
            _ => return false,
        };
        let mut changed = false;
        for p in shape.inherited_properties().cloned().collect::<Vec<_>>() {
            changed |= self.copy_into_mro(&p, lhs, reason);
        }
        for p in shape.own_properties().cloned().collect::<Vec<_>>() {
            changed |= self.copy_into_mrw(&p, lhs, reason);
        }
        changed
    }

    /// Check an object literal's declared properties against its MRO/MRW
    /// sets.
    pub(crate) fn eval_mromrw_to_objlit(
        &mut self,
        term: TermId,
        lhs: VarId,
        props_var: VarId,
        reason: CauseId,
    ) {
        debug_assert!(matches!(self.terms.data(term), TermData::ObjectLiteral(_)));
        let ty = self.var_ty(lhs);
        let TypeData::Object(shape) = self.types.lookup(ty).clone() else {
            return;
        };
        let cause = self.causes.derived(&[
            reason,
            self.var_reason(lhs),
            self.vars[props_var.0 as usize].reason,
        ]);
        for p in &shape.properties {
            self.equate_property_with_prop_sets(props_var, p, cause);
        }
    }
}

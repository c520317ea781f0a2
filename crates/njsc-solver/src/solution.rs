//! Final solution extraction and validation.
//!
//! Runs strictly after the fixed point converges: assign a terminal type
//! per term, substitute type variables throughout, then run the deferred
//! checks — arity, constructor calls, property presence, permission
//! downgrades, concreteness. The checks are deferred to this point because
//! the lattice may discover a missing property from a later-resolving
//! prototype chain right up until convergence.

use crate::assignment::TypeAssignment;
use crate::cause::CauseId;
use crate::error::SolveError;
use crate::solver::Solver;
use crate::term::{TermData, TermId};
use indexmap::IndexMap;
use njsc_common::limits::{STACK_GROWTH, STACK_RED_ZONE};
use njsc_types::{
    ObjectShape, Property, Signature, TypeData, TypeId, TypeVarId, lowest_subtype,
    usable_as_constructor,
};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Position of an `Any` during replacement; each position has its own
/// backend-friendly substitute.
#[derive(Copy, Clone, PartialEq, Eq)]
enum AnyContext {
    ConstructorProto,
    Receiver,
    Other,
}

impl Solver {
    pub(crate) fn find_final_solutions(mut self) -> Result<TypeAssignment, SolveError> {
        let complete = self.set_term_types()?;
        if !complete {
            debug!("cannot find types for all variables");
        }
        for t in self.registered_terms().collect::<Vec<_>>() {
            match *self.terms.data(t) {
                TermData::FunctionReturn { func, arity } if self.arities_to_check.contains_key(&t) => {
                    if let Err(e) = self.check_function_ret(func, arity) {
                        return Err(self.wrap_arity_failure(t, e));
                    }
                }
                TermData::FunctionCall { target, is_new } => {
                    if let Err(e) = self.check_function_call(t, target, is_new) {
                        return Err(self.wrap_arity_failure(t, e));
                    }
                }
                _ => {}
            }
        }
        self.substitute_all_term_types();
        self.check_object_upper_lower()?;
        self.check_concrete()?;
        let mut term_types: IndexMap<TermId, TypeId> = IndexMap::new();
        for t in self.registered_terms().collect::<Vec<_>>() {
            if matches!(self.terms.data(t), TermData::EnvironmentDecl(_)) {
                continue;
            }
            if let Some(ty) = self.terms.type_of(t) {
                term_types.insert(t, ty);
            }
        }
        Ok(TypeAssignment::new(self, term_types))
    }

    /// Re-raise a post-convergence check failure with the term's
    /// contributing causes (and, for arity checks, the source constraint).
    fn wrap_arity_failure(&mut self, t: TermId, e: SolveError) -> SolveError {
        let mut cause = self.contrib(t);
        if let Some(c) = self.arities_to_check.get(&t).copied() {
            let src = self.causes.src(c);
            cause = self.causes.derived(&[cause, src]);
        }
        self.core_error(e.explanation(), cause)
    }

    // -------------------------------------------------------------------------
    // Terminal type assignment
    // -------------------------------------------------------------------------

    fn should_set_type(&self, t: TermId) -> bool {
        !self.terms.is_type_source(t)
            && !matches!(
                self.terms.data(t),
                TermData::PropertyAccess { .. }
                    | TermData::Key(_)
                    | TermData::Indexed(_)
                    | TermData::FunctionReturn { .. }
                    | TermData::FunctionParam { .. }
            )
    }

    fn set_term_types(&mut self) -> Result<bool, SolveError> {
        let mut complete = true;
        let terms: Vec<TermId> = self.registered_terms().collect();
        for &t in &terms {
            if self.should_set_type(t) && !matches!(self.terms.data(t), TermData::Proto(_)) {
                complete &= self.set_type_for_term(t);
            }
        }
        // proto terms need the underlying term's type set first
        for &t in &terms {
            if let TermData::Proto(base) = *self.terms.data(t) {
                let base_ty = self.terms.type_of(base).unwrap_or(TypeId::ANY);
                if usable_as_constructor(&self.types, base_ty) {
                    complete &= self.set_type_for_term(t);
                } else {
                    let message = format!(
                        "reference to prototype of non-constructor {}",
                        self.display_term(base)
                    );
                    let cause = self.contrib(t);
                    return Err(self.core_error(message, cause));
                }
            }
        }
        // with type variables solved, give unresolved unknown-indexable
        // upper bounds a reasonable final shape
        for &t in &terms {
            let unresolved = self
                .terms
                .type_of(t)
                .is_none_or(|ty| matches!(self.types.lookup(ty), TypeData::Any));
            if self.should_set_type(t) && unresolved {
                let lower = self.var_ty(self.lower_var(t));
                let upper = self.var_ty(self.upper_var(t));
                if matches!(self.types.lookup(lower), TypeData::Bottom)
                    && !matches!(self.types.lookup(upper), TypeData::Top)
                {
                    if let TypeData::UnknownIndexable { key, elem, .. } =
                        self.types.lookup(upper).clone()
                    {
                        let mut elem_ty = self.resolve_type_var(elem);
                        if matches!(self.types.lookup(elem_ty), TypeData::Any) {
                            elem_ty = TypeId::INT;
                        }
                        let key_ty = self.resolve_type_var(key);
                        let ty = if key_ty == TypeId::STRING {
                            // string keys make it a map
                            self.types.map(elem_ty)
                        } else {
                            self.types.array(elem_ty)
                        };
                        self.terms.set_type(t, ty);
                    }
                }
            }
        }
        Ok(complete)
    }

    fn set_type_for_term(&mut self, t: TermId) -> bool {
        let lower = self.var_ty(self.lower_var(t));
        let upper = self.var_ty(self.upper_var(t));
        debug!(term = %self.display_term(t), low = %self.display_ty(lower), up = %self.display_ty(upper), "finding type");
        let lower_data = self.types.lookup(lower).clone();
        let upper_data = self.types.lookup(upper).clone();
        let lower_is_extreme =
            matches!(lower_data, TypeData::Bottom | TypeData::BottomRef);
        if lower_is_extreme && !matches!(upper_data, TypeData::Top) {
            if matches!(upper_data, TypeData::UnknownIndexable { .. }) {
                // not a valid shape for a final solution; resolved later or
                // reported as incomplete
                return false;
            }
            if matches!(upper_data, TypeData::TopRef) {
                let obj = self.types.empty_object();
                self.terms.set_type(t, obj);
                return true;
            }
            // assigning the upper bound directly could force sibling terms
            // that copy into this one to adopt a supertype they don't need;
            // use the lowest subtype of the upper bound instead
            let mut lowest = lowest_subtype(&self.types, upper);
            if matches!(self.types.lookup(lowest), TypeData::TopRef) {
                lowest = self.types.empty_object();
            }
            self.terms.set_type(t, lowest);
            return true;
        }
        if !matches!(lower_data, TypeData::Bottom) {
            if matches!(lower_data, TypeData::BottomRef) {
                // the backend cannot represent BottomRef
                let obj = self.types.empty_object();
                self.terms.set_type(t, obj);
            } else {
                self.terms.set_type(t, lower);
            }
            return true;
        }
        debug!(term = %self.display_term(t), "no type for term");
        false
    }

    // -------------------------------------------------------------------------
    // Substitution
    // -------------------------------------------------------------------------

    /// The solved type of a type variable, or the variable itself when
    /// nothing was inferred.
    fn resolve_type_var(&mut self, var_ty: TypeId) -> TypeId {
        let TypeData::Var(v) = *self.types.lookup(var_ty) else {
            return var_ty;
        };
        let term = self.terms.type_var_term(v, var_ty);
        self.terms.type_of(term).unwrap_or(var_ty)
    }

    fn substitute_all_term_types(&mut self) {
        for t in self.registered_terms().collect::<Vec<_>>() {
            if matches!(self.terms.data(t), TermData::PropertyAccess { .. }) {
                continue;
            }
            let ty = self.terms.type_of(t);
            let is_any = ty.is_none_or(|ty| matches!(self.types.lookup(ty), TypeData::Any));
            if is_any {
                if !matches!(
                    self.terms.data(t),
                    TermData::Proto(_)
                        | TermData::ProtoParent(_)
                        | TermData::TypeVar(_)
                        | TermData::Key(_)
                        | TermData::Indexed(_)
                ) {
                    self.terms.set_type(t, TypeId::INT);
                }
            } else if let Some(ty) = ty {
                let mut in_progress = FxHashSet::default();
                let substituted = self.substitute_type_vars(ty, &mut in_progress);
                let replaced = self.replace_nested_any(substituted, AnyContext::Other);
                self.terms.set_type(t, replaced);
            }
        }
    }

    /// Substitute solved types for type variables, rebuilding nested
    /// structure. A variable under substitution resolves to itself, which
    /// ties recursive types back through the variable.
    pub(crate) fn substitute_type_vars(
        &mut self,
        ty: TypeId,
        in_progress: &mut FxHashSet<TypeVarId>,
    ) -> TypeId {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            self.substitute_inner(ty, in_progress)
        })
    }

    fn substitute_inner(
        &mut self,
        ty: TypeId,
        in_progress: &mut FxHashSet<TypeVarId>,
    ) -> TypeId {
        match self.types.lookup(ty).clone() {
            TypeData::Var(v) => {
                if in_progress.contains(&v) {
                    return ty;
                }
                let term = self.terms.type_var_term(v, ty);
                let solved = self.terms.type_of(term).unwrap_or(ty);
                if solved == ty {
                    return ty;
                }
                in_progress.insert(v);
                let result = self.substitute_type_vars(solved, in_progress);
                in_progress.remove(&v);
                result
            }
            TypeData::Object(shape) => {
                let properties = shape
                    .properties
                    .iter()
                    .map(|p| {
                        let sub = self.substitute_type_vars(p.ty, in_progress);
                        Property::with_loc(p.name, sub, p.read_only, p.loc)
                    })
                    .collect();
                self.types.intern(TypeData::Object(ObjectShape {
                    prototype_parent: shape.prototype_parent,
                    properties,
                }))
            }
            TypeData::Array(elem) => {
                let elem = self.substitute_type_vars(elem, in_progress);
                self.types.array(elem)
            }
            TypeData::Map(elem) => {
                let elem = self.substitute_type_vars(elem, in_progress);
                self.types.map(elem)
            }
            TypeData::Function(sig) => {
                let sig = self.substitute_signature(&sig, in_progress);
                self.types.intern(TypeData::Function(sig))
            }
            TypeData::Constructor { sig, prototype } => {
                let sig = self.substitute_signature(&sig, in_progress);
                let prototype = prototype.map(|p| self.substitute_type_vars(p, in_progress));
                self.types.intern(TypeData::Constructor { sig, prototype })
            }
            TypeData::AttachedMethod(sig) => {
                let sig = self.substitute_signature(&sig, in_progress);
                self.types.intern(TypeData::AttachedMethod(sig))
            }
            TypeData::UnattachedMethod { sig, receiver } => {
                let sig = self.substitute_signature(&sig, in_progress);
                let receiver = self.substitute_type_vars(receiver, in_progress);
                self.types.intern(TypeData::UnattachedMethod { sig, receiver })
            }
            TypeData::Intersection(cases) => {
                let cases =
                    cases.iter().map(|c| self.substitute_type_vars(*c, in_progress)).collect();
                self.types.intern(TypeData::Intersection(cases))
            }
            TypeData::ObjectUnion(cases) => {
                let cases: Vec<TypeId> =
                    cases.iter().map(|c| self.substitute_type_vars(*c, in_progress)).collect();
                self.types.intern(TypeData::ObjectUnion(cases))
            }
            TypeData::UnknownIndexable { key, elem, properties } => {
                let key = self.substitute_type_vars(key, in_progress);
                let elem = self.substitute_type_vars(elem, in_progress);
                let properties = properties
                    .iter()
                    .map(|p| {
                        let sub = self.substitute_type_vars(p.ty, in_progress);
                        Property::with_loc(p.name, sub, p.read_only, p.loc)
                    })
                    .collect();
                self.types.unknown_indexable(key, elem, properties)
            }
            _ => ty,
        }
    }

    fn substitute_signature(
        &mut self,
        sig: &Signature,
        in_progress: &mut FxHashSet<TypeVarId>,
    ) -> Signature {
        let params = sig
            .params
            .iter()
            .map(|p| self.substitute_type_vars(*p, in_progress))
            .collect();
        let ret = self.substitute_type_vars(sig.ret, in_progress);
        Signature::new(params, ret)
    }

    /// Replace residual `Any` types with backend-representable shapes: the
    /// int fallback in ordinary positions, an empty object in receiver
    /// position, and nothing at all in constructor-prototype position.
    fn replace_nested_any(&mut self, ty: TypeId, context: AnyContext) -> TypeId {
        match self.types.lookup(ty).clone() {
            TypeData::Any => match context {
                AnyContext::Other => TypeId::INT,
                AnyContext::Receiver => self.types.empty_object(),
                // callers drop the prototype slot instead
                AnyContext::ConstructorProto => TypeId::ANY,
            },
            TypeData::Object(shape) => {
                let properties = shape
                    .properties
                    .iter()
                    .map(|p| {
                        let replaced = self.replace_nested_any(p.ty, AnyContext::Other);
                        Property::with_loc(p.name, replaced, p.read_only, p.loc)
                    })
                    .collect();
                self.types.intern(TypeData::Object(ObjectShape {
                    prototype_parent: shape.prototype_parent,
                    properties,
                }))
            }
            TypeData::Array(elem) => {
                let elem = self.replace_nested_any(elem, AnyContext::Other);
                self.types.array(elem)
            }
            TypeData::Map(elem) => {
                let elem = self.replace_nested_any(elem, AnyContext::Other);
                self.types.map(elem)
            }
            TypeData::Function(sig) => {
                let sig = self.replace_any_in_signature(&sig);
                self.types.intern(TypeData::Function(sig))
            }
            TypeData::Constructor { sig, prototype } => {
                let sig = self.replace_any_in_signature(&sig);
                let prototype = prototype.and_then(|p| {
                    if matches!(self.types.lookup(p), TypeData::Any) {
                        None
                    } else {
                        Some(self.replace_nested_any(p, AnyContext::ConstructorProto))
                    }
                });
                self.types.intern(TypeData::Constructor { sig, prototype })
            }
            TypeData::AttachedMethod(sig) => {
                let sig = self.replace_any_in_signature(&sig);
                self.types.intern(TypeData::AttachedMethod(sig))
            }
            TypeData::UnattachedMethod { sig, receiver } => {
                let sig = self.replace_any_in_signature(&sig);
                let receiver = self.replace_nested_any(receiver, AnyContext::Receiver);
                self.types.intern(TypeData::UnattachedMethod { sig, receiver })
            }
            TypeData::Intersection(cases) => {
                let cases = cases
                    .iter()
                    .map(|c| self.replace_nested_any(*c, AnyContext::Other))
                    .collect();
                self.types.intern(TypeData::Intersection(cases))
            }
            TypeData::ObjectUnion(cases) => {
                let cases: Vec<TypeId> = cases
                    .iter()
                    .map(|c| self.replace_nested_any(*c, AnyContext::Other))
                    .collect();
                self.types.intern(TypeData::ObjectUnion(cases))
            }
            _ => ty,
        }
    }

    fn replace_any_in_signature(&mut self, sig: &Signature) -> Signature {
        let params = sig
            .params
            .iter()
            .map(|p| self.replace_nested_any(*p, AnyContext::Other))
            .collect();
        let ret = self.replace_nested_any(sig.ret, AnyContext::Other);
        Signature::new(params, ret)
    }

    // -------------------------------------------------------------------------
    // Deferred checks
    // -------------------------------------------------------------------------

    /// Ensure every property required by a term's upper bound is present
    /// on its lower bound, and merge away surviving object unions.
    fn check_object_upper_lower(&mut self) -> Result<(), SolveError> {
        for t in self.registered_terms().collect::<Vec<_>>() {
            let lower = self.var_ty(self.lower_var(t));
            let upper = self.var_ty(self.upper_var(t));
            let reason = self.contrib(t);
            if let TypeData::Object(upper_shape) = self.types.lookup(upper).clone() {
                match self.types.lookup(lower).clone() {
                    TypeData::Object(lower_shape) => {
                        self.check_property_presence(&lower_shape, &upper_shape, t, reason)?;
                    }
                    TypeData::ObjectUnion(_) => {
                        let ty = self.terms.type_of(t);
                        match ty.map(|ty| self.types.lookup(ty).clone()) {
                            Some(TypeData::ObjectUnion(cases)) => {
                                let merged = self.compute_merged_union(&cases);
                                let merged_shape = self
                                    .types
                                    .object_shape(merged)
                                    .expect("merged union is an object")
                                    .clone();
                                self.check_property_presence(
                                    &merged_shape,
                                    &upper_shape,
                                    t,
                                    reason,
                                )?;
                                self.terms.set_type(t, merged);
                            }
                            Some(TypeData::Object(merged_shape)) => {
                                // the merge already happened on this term
                                self.check_property_presence(
                                    &merged_shape,
                                    &upper_shape,
                                    t,
                                    reason,
                                )?;
                            }
                            _ => {}
                        }
                    }
                    _ => {}
                }
            } else if let Some(ty) = self.terms.type_of(t) {
                if let TypeData::ObjectUnion(cases) = self.types.lookup(ty).clone() {
                    let merged = self.compute_merged_union(&cases);
                    self.terms.set_type(t, merged);
                }
            }
            // no object union may survive anywhere in the solution
            if let Some(ty) = self.terms.type_of(t) {
                let merged = self.merge_nested_unions(ty);
                self.terms.set_type(t, merged);
            }
        }
        Ok(())
    }

    fn check_property_presence(
        &mut self,
        lower: &ObjectShape,
        upper: &ObjectShape,
        t: TermId,
        reason: CauseId,
    ) -> Result<(), SolveError> {
        for upper_prop in &upper.properties {
            let Some(lower_prop) = lower.property(upper_prop.name) else {
                let mut message = format!(
                    "could not find property {} in type {} for term {}",
                    self.interner.resolve(upper_prop.name),
                    self.display_shape(lower),
                    self.display_term(t)
                );
                if let Some(loc) = upper_prop.loc {
                    message.push_str(&format!("\nproperty accessed on {loc}"));
                }
                return Err(self.core_error(message, reason));
            };
            // writing a read-only property is an error
            if upper_prop.is_rw() && lower_prop.is_ro() {
                let mut message = format!(
                    "writing read-only property {}",
                    self.interner.resolve(upper_prop.name)
                );
                if let Some(loc) = upper_prop.loc {
                    message.push_str(&format!(" on {loc}"));
                }
                return Err(self.core_error(message, reason));
            }
        }
        Ok(())
    }

    fn display_shape(&mut self, shape: &ObjectShape) -> String {
        let ty = self.types.intern(TypeData::Object(shape.clone()));
        self.display_ty(ty)
    }

    /// Merge an object union into one object by intersecting the cases'
    /// properties: only names present in every case with equal types
    /// survive, and the read-only variant wins on a permission mismatch.
    fn compute_merged_union(&mut self, cases: &[TypeId]) -> TypeId {
        let mut result: Option<Vec<Property>> = None;
        for case in cases {
            let case_shape = self.types.object_shape(*case).expect("object union case").clone();
            match result {
                None => result = Some(case_shape.properties),
                Some(props) => {
                    let mut merged = Vec::new();
                    for p in props {
                        if let Some(q) = case_shape.property(p.name) {
                            if q.ty == p.ty {
                                if p.is_rw() && q.is_ro() {
                                    merged.push(q.clone());
                                } else {
                                    merged.push(p);
                                }
                            }
                        }
                    }
                    result = Some(merged);
                }
            }
        }
        self.types.object(result.unwrap_or_default())
    }

    /// Rebuild a type with every nested object union merged away.
    fn merge_nested_unions(&mut self, ty: TypeId) -> TypeId {
        match self.types.lookup(ty).clone() {
            TypeData::ObjectUnion(cases) => self.compute_merged_union(&cases),
            TypeData::Object(shape) => {
                let properties = shape
                    .properties
                    .iter()
                    .map(|p| {
                        let merged = self.merge_nested_unions(p.ty);
                        Property::with_loc(p.name, merged, p.read_only, p.loc)
                    })
                    .collect();
                self.types.intern(TypeData::Object(ObjectShape {
                    prototype_parent: shape.prototype_parent,
                    properties,
                }))
            }
            TypeData::Array(elem) => {
                let elem = self.merge_nested_unions(elem);
                self.types.array(elem)
            }
            TypeData::Map(elem) => {
                let elem = self.merge_nested_unions(elem);
                self.types.map(elem)
            }
            TypeData::Function(sig) => {
                let sig = self.merge_unions_in_signature(&sig);
                self.types.intern(TypeData::Function(sig))
            }
            TypeData::Constructor { sig, prototype } => {
                let sig = self.merge_unions_in_signature(&sig);
                let prototype = prototype.map(|p| self.merge_nested_unions(p));
                self.types.intern(TypeData::Constructor { sig, prototype })
            }
            TypeData::AttachedMethod(sig) => {
                let sig = self.merge_unions_in_signature(&sig);
                self.types.intern(TypeData::AttachedMethod(sig))
            }
            TypeData::UnattachedMethod { sig, receiver } => {
                let sig = self.merge_unions_in_signature(&sig);
                let receiver = self.merge_nested_unions(receiver);
                self.types.intern(TypeData::UnattachedMethod { sig, receiver })
            }
            TypeData::Intersection(cases) => {
                let cases = cases.iter().map(|c| self.merge_nested_unions(*c)).collect();
                self.types.intern(TypeData::Intersection(cases))
            }
            _ => ty,
        }
    }

    fn merge_unions_in_signature(&mut self, sig: &Signature) -> Signature {
        let params = sig.params.iter().map(|p| self.merge_nested_unions(*p)).collect();
        let ret = self.merge_nested_unions(sig.ret);
        Signature::new(params, ret)
    }

    /// Check that every term constrained to be concrete has an appropriate
    /// concrete type: every MRO/MRW candidate must be realized on the
    /// final object type, with matching permission, and methods may not be
    /// detached from their objects.
    fn check_concrete(&mut self) -> Result<(), SolveError> {
        for (t, cause) in self.concrete_terms.clone() {
            let Some(ty) = self.terms.type_of(t) else { continue };
            match self.types.lookup(ty).clone() {
                TypeData::Object(shape) => {
                    let missing_mro: Vec<Property> = self
                        .mro_of(t)
                        .iter()
                        .filter(|p| !shape.has_property(p.name))
                        .cloned()
                        .collect();
                    let missing_mrw: Vec<Property> = self
                        .mrw_of(t)
                        .iter()
                        .filter(|p| !shape.has_own_property(p.name))
                        .cloned()
                        .collect();
                    if !missing_mro.is_empty() || !missing_mrw.is_empty() {
                        let props_reason = self
                            .prop_vars
                            .get(&t)
                            .map_or(CauseId::NO_REASON, |v| self.vars[v.0 as usize].reason);
                        let contrib = self.contrib(t);
                        let full_cause =
                            self.causes.derived(&[contrib, props_reason, cause]);
                        let mut message = format!(
                            "{} is missing some MRO/MRW property, and hence cannot appear here",
                            self.display_term(t)
                        );
                        if let Some(line) = self.terms.line(t) {
                            message.push_str(&format!("\nline {line}"));
                        }
                        message.push_str(&format!("\ntype {}", self.display_ty(ty)));
                        if !missing_mro.is_empty() {
                            message.push_str(&format!(
                                "\nmissing MRO: [{}]",
                                self.prop_names(&missing_mro)
                            ));
                        }
                        if !missing_mrw.is_empty() {
                            message.push_str(&format!(
                                "\nmissing MRW: [{}]",
                                self.prop_names(&missing_mrw)
                            ));
                        }
                        return Err(self.core_error(message, full_cause));
                    }
                }
                TypeData::AttachedMethod(_) if !self.terms.is_null_like(t) => {
                    // null/undefined/void only get an attached method type
                    // through the equality constraints generated for them
                    let contrib = self.contrib(t);
                    let full_cause = self.causes.derived(&[contrib, cause]);
                    let mut message = "cannot detach method from object".to_string();
                    if let Some(line) = self.terms.line(t) {
                        message.push_str(&format!("\nline {line}"));
                    }
                    message.push_str(&format!("\nexpression {}", self.display_term(t)));
                    return Err(self.core_error(message, full_cause));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn prop_names(&self, props: &[Property]) -> String {
        let mut names: Vec<String> =
            props.iter().map(|p| self.interner.resolve(p.name).to_string()).collect();
        names.sort();
        names.join(",")
    }

    /// Check a call's argument count against the arity of the resolved
    /// callee type.
    fn check_function_ret(&mut self, func: TermId, nr_args: u32) -> Result<(), SolveError> {
        let Some(func_ty) = self.terms.type_of(func) else {
            return Ok(());
        };
        match self.types.lookup(func_ty).clone() {
            TypeData::Function(sig)
            | TypeData::Constructor { sig, .. }
            | TypeData::AttachedMethod(sig)
            | TypeData::UnattachedMethod { sig, .. } => {
                if sig.arity() != nr_args as usize {
                    return Err(self.arity_failure(func, nr_args, sig.arity()));
                }
                Ok(())
            }
            TypeData::Intersection(cases) => {
                let found = cases.iter().any(|c| match self.types.lookup(*c) {
                    TypeData::Function(sig) | TypeData::AttachedMethod(sig) => {
                        sig.arity() == nr_args as usize
                    }
                    _ => false,
                });
                if !found {
                    let message = format!(
                        "inconsistent number of arguments and parameters: no case of {} accepts {} argument(s){}",
                        self.display_term(func),
                        nr_args,
                        self.line_suffix(func)
                    );
                    return Err(SolveError::solver(message));
                }
                Ok(())
            }
            _ => {
                let message = format!(
                    "cannot check call arity against non-code type {}",
                    self.display_ty(func_ty)
                );
                Err(SolveError::solver(message))
            }
        }
    }

    fn arity_failure(&self, func: TermId, nr_args: u32, nr_params: usize) -> SolveError {
        let message = format!(
            "inconsistent number of arguments and parameters: call passes {nr_args} argument(s) to a function expecting {nr_params}{}",
            self.line_suffix(func)
        );
        SolveError::solver(message)
    }

    fn line_suffix(&self, t: TermId) -> String {
        self.terms
            .line(t)
            .map(|line| format!(" at call site on line {line}"))
            .unwrap_or_default()
    }

    /// `new` may only be applied to constructor-usable values.
    fn check_function_call(
        &mut self,
        call: TermId,
        target: TermId,
        is_new: bool,
    ) -> Result<(), SolveError> {
        if !is_new {
            return Ok(());
        }
        let Some(target_ty) = self.terms.type_of(target) else {
            return Ok(());
        };
        if !usable_as_constructor(&self.types, target_ty) {
            let message = format!(
                "invoking non-constructor function (type={}) with new{}",
                self.display_ty(target_ty),
                self.terms
                    .line(call)
                    .map(|line| format!(" (line {line})"))
                    .unwrap_or_default()
            );
            return Err(SolveError::solver(message));
        }
        Ok(())
    }
}

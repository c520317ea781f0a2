//! Constraint normalization.
//!
//! Expands the raw constraint set before solving: every structural access
//! (property read/write, call, indexing, prototype, method receiver) is
//! rewritten into primitive subtype/equality constraints over fresh type
//! variables. A property read of `b.p` becomes `b <: { p: RO X }` plus
//! `X <: |b.p|`; a write uses an RW property and an equality. Function and
//! constructor terms are decomposed once per `(term, arity)` — the same
//! callee may be invoked at several arities through intersection cases.

use crate::cause::CauseId;
use crate::constraint::{Constraint, ConstraintId, UpperBoundConstraint};
use crate::solver::Solver;
use crate::term::{TermData, TermId};
use njsc_common::SourceLocation;
use njsc_types::{Property, Signature, TypeData, TypeId};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

#[derive(Default)]
struct NormalizeState {
    /// Bases whose index accesses have been constrained.
    constrained_index_terms: FxHashSet<TermId>,
    /// Property-access terms already given a type variable.
    prop_term_vars: FxHashMap<TermId, TermId>,
    /// `(function term, arity)` pairs already decomposed.
    constrained_fn_terms: FxHashSet<(TermId, u32)>,
    handled_protos: FxHashSet<TermId>,
    handled_proto_parents: FxHashSet<TermId>,
}

impl Solver {
    pub(crate) fn normalize_constraints(&mut self) {
        let snapshot: Vec<ConstraintId> = self.constraints.ids().collect();
        let mut st = NormalizeState::default();

        // handle proto terms first: a prototype variable is only created
        // for constructors that actually have their prototype accessed,
        // since library constructors are not prototypable
        for &c in &snapshot {
            let cause = self.causes.src(c);
            for t in self.constraints.get(c).terms() {
                if matches!(self.terms.data(t), TermData::Proto(_)) {
                    self.handle_proto_term(t, c, cause, &mut st);
                }
            }
        }

        for &c in &snapshot {
            let cause = self.causes.src(c);
            debug!(constraint = %self.constraints.display(c, &self.terms, &self.types), "normalizing");
            for t in self.constraints.get(c).terms() {
                if matches!(self.terms.data(t), TermData::ProtoParent(_))
                    && st.handled_proto_parents.insert(t)
                {
                    let line = self.constraints.line(c);
                    self.push_constraint(Constraint::InheritProps { term: t }, line, cause);
                }
            }
            let sides = self.constraint_sides(c);
            if let Some((left, right)) = sides {
                if matches!(self.terms.data(left), TermData::Indexed(_))
                    || matches!(self.terms.data(right), TermData::Indexed(_))
                {
                    self.handle_indexed_term(left, right, c, cause, &mut st);
                }
                if matches!(self.terms.data(left), TermData::MapLiteral(_)) {
                    self.handle_map_literal(left, c, cause);
                }
                for t in [left, right] {
                    if let TermData::FunctionParam { func, arity, .. } = *self.terms.data(t) {
                        self.decompose_function_term(func, arity, false, c, cause, &mut st);
                    }
                }
                for t in [left, right] {
                    if let TermData::FunctionReturn { func, arity } = *self.terms.data(t) {
                        let other = if t == left { right } else { left };
                        let is_ctor_call = matches!(
                            self.terms.data(other),
                            TermData::FunctionCall { is_new: true, .. }
                        );
                        self.decompose_function_term(func, arity, is_ctor_call, c, cause, &mut st);
                    }
                }
                if let TermData::MethodReceiver { func } = *self.terms.data(right) {
                    debug_assert!(
                        matches!(self.constraints.get(c), Constraint::Equality { .. }),
                        "receiver terms only appear in equality constraints"
                    );
                    self.handle_receiver_term(right, func, c, cause);
                }
                for t in [left, right] {
                    self.freshen_intersection_decl(t);
                }
                let is_subtype = matches!(self.constraints.get(c), Constraint::SubType { .. });
                // an equality generated for assigning null/undefined into a
                // location augments like a subtype constraint
                let null_equality = matches!(self.constraints.get(c), Constraint::Equality { .. })
                    && self.terms.is_null_like(left);
                if is_subtype || null_equality {
                    self.handle_subtype_constraint(left, right, c, cause, &mut st);
                }
            }
        }

        for &c in &snapshot {
            if matches!(self.constraints.get(c), Constraint::Equality { .. }) {
                let cause = self.causes.src(c);
                self.handle_equality_prop_access(c, cause, &mut st);
            }
        }
    }

    fn constraint_sides(&self, c: ConstraintId) -> Option<(TermId, TermId)> {
        match *self.constraints.get(c) {
            Constraint::SubType { left, right } | Constraint::Equality { left, right } => {
                Some((left, right))
            }
            _ => None,
        }
    }

    fn push_constraint(&mut self, constraint: Constraint, line: Option<u32>, cause: CauseId) {
        let (id, new) = self.constraints.add(constraint, line);
        if new {
            debug!(constraint = %self.constraints.display(id, &self.terms, &self.types), "adding");
        }
        self.constraint_causes.entry(id).or_insert(cause);
    }

    fn fresh_var_ty(&mut self) -> TypeId {
        let v = self.terms.fresh_type_var();
        self.types.var(v)
    }

    // -------------------------------------------------------------------------
    // Property accesses
    // -------------------------------------------------------------------------

    /// `e <: prop(b, p)` introduces a variable X for the type of the
    /// property: the base gets a single-property object upper bound (RO
    /// for reads, RW for writes) and X is tied to the access term.
    fn handle_subtype_constraint(
        &mut self,
        left: TermId,
        right: TermId,
        c: ConstraintId,
        cause: CauseId,
        st: &mut NormalizeState,
    ) {
        let line = self.constraints.line(c);
        let loc = line.map(SourceLocation::new);
        if let TermData::PropertyAccess { base, name } = *self.terms.data(left) {
            if !st.prop_term_vars.contains_key(&left) {
                debug_assert!(
                    !matches!(self.terms.data(base), TermData::ObjectLiteral(_)),
                    "reads from object literals resolve through the literal type"
                );
                let var_ty = self.fresh_var_ty();
                let tv_term = self.term_for_type_id(var_ty);
                // the property is being read, so the requirement is RO
                let ot = self.types.object_parts(
                    None,
                    Vec::new(),
                    vec![Property::with_loc(name, var_ty, true, loc)],
                );
                let ot_term = self.terms.type_constant(ot);
                self.push_constraint(Constraint::SubType { left: base, right: ot_term }, line, cause);
                self.push_constraint(Constraint::SubType { left: tv_term, right: left }, line, cause);
                st.prop_term_vars.insert(left, tv_term);
            }
        }
        if let TermData::PropertyAccess { base, name } = *self.terms.data(right) {
            if !st.prop_term_vars.contains_key(&right) {
                let var_ty = self.fresh_var_ty();
                let tv_term = self.term_for_type_id(var_ty);
                if matches!(self.terms.data(base), TermData::ObjectLiteral(_)) {
                    // rebind the literal's own property slot to the variable
                    let declared =
                        self.terms.type_of(base).expect("object literal carries a declared type");
                    let rebound = self.types.object_with_property(declared, name, var_ty, false);
                    self.terms.set_type(base, rebound);
                } else {
                    // a write: the requirement is RW
                    let ot = self.types.object_parts(
                        None,
                        vec![Property::with_loc(name, var_ty, false, loc)],
                        Vec::new(),
                    );
                    let ot_term = self.terms.type_constant(ot);
                    self.push_constraint(
                        Constraint::SubType { left: base, right: ot_term },
                        line,
                        cause,
                    );
                }
                self.push_constraint(Constraint::Equality { left: tv_term, right }, line, cause);
                st.prop_term_vars.insert(right, tv_term);
            }
            // the written value may be a method; track the detachment
            // obligation against the containing object
            if self.terms.possibly_a_method(left) {
                self.mro_mrw_constraints.push(UpperBoundConstraint {
                    possible_method: left,
                    containing_object: base,
                    reason: cause,
                });
            }
        }
    }

    /// `|a.p| = e` where the access never appeared in a subtype
    /// constraint (e.g. reads of `length` from arrays): expand as a read.
    fn handle_equality_prop_access(
        &mut self,
        c: ConstraintId,
        cause: CauseId,
        st: &mut NormalizeState,
    ) {
        let Some((left, right)) = self.constraint_sides(c) else { return };
        let (dot_term, prop_term) =
            if matches!(self.terms.data(left), TermData::PropertyAccess { .. }) {
                (right, left)
            } else if matches!(self.terms.data(right), TermData::PropertyAccess { .. }) {
                (left, right)
            } else {
                return;
            };
        if st.prop_term_vars.contains_key(&prop_term) {
            return;
        }
        let TermData::PropertyAccess { base, name } = *self.terms.data(prop_term) else {
            unreachable!();
        };
        let line = self.constraints.line(c);
        let loc = line.map(SourceLocation::new);
        let var_ty = self.fresh_var_ty();
        let tv_term = self.term_for_type_id(var_ty);
        let ot = self.types.object_parts(
            None,
            Vec::new(),
            vec![Property::with_loc(name, var_ty, true, loc)],
        );
        let ot_term = self.terms.type_constant(ot);
        self.push_constraint(Constraint::SubType { left: base, right: ot_term }, line, cause);
        self.push_constraint(Constraint::Equality { left: dot_term, right: tv_term }, line, cause);
        st.prop_term_vars.insert(prop_term, tv_term);
        if matches!(self.terms.data(base), TermData::ObjectLiteral(_)) {
            // get rid of lingering any types on the literal
            self.freshen_any_properties(base);
        }
    }

    /// Replace `Any`-typed properties of a term's declared object type
    /// with fresh type variables.
    fn freshen_any_properties(&mut self, term: TermId) {
        let Some(declared) = self.terms.type_of(term) else { return };
        let Some(shape) = self.types.object_shape(declared).cloned() else { return };
        let mut rebound = declared;
        for p in &shape.properties {
            if matches!(self.types.lookup(p.ty), TypeData::Any) {
                let var_ty = self.fresh_var_ty();
                rebound = self.types.object_with_property(rebound, p.name, var_ty, p.read_only);
            }
        }
        self.terms.set_type(term, rebound);
    }

    // -------------------------------------------------------------------------
    // Functions and constructors
    // -------------------------------------------------------------------------

    /// Decompose a function term at one arity: tie its parameter and
    /// return terms to (possibly fresh) type variables, and give terms
    /// without a declared code type a function or constructor upper bound.
    fn decompose_function_term(
        &mut self,
        func: TermId,
        arity: u32,
        is_constructor: bool,
        c: ConstraintId,
        cause: CauseId,
        st: &mut NormalizeState,
    ) {
        if !st.constrained_fn_terms.insert((func, arity)) {
            return;
        }
        let line = self.constraints.line(c);
        // ensure the function term itself appears in the final mapping
        self.init_bounds(func, cause);
        let declared = self.terms.type_of(func);
        let declared_code =
            declared.filter(|ty| self.types.lookup(*ty).is_code());
        let (param_tys, ret_ty) = if let Some(code_ty) = declared_code {
            let mut sig = self.types.lookup(code_ty).signature().expect("code type").clone();
            for i in 0..(arity as usize).min(sig.params.len()) {
                if matches!(self.types.lookup(sig.params[i]), TypeData::Any) {
                    sig.params[i] = self.fresh_var_ty();
                }
            }
            let ret = self.type_vars_for_return_type(&mut sig, None, line, cause);
            sig.ret = ret;
            let rebuilt = self.rebuild_code_type(code_ty, sig.clone());
            self.terms.set_type(func, rebuilt);
            debug!(func = %self.display_term(func), ty = %self.display_ty(rebuilt), "updated function type");
            (sig.params, ret)
        } else {
            let params: Vec<TypeId> = (0..arity).map(|_| self.fresh_var_ty()).collect();
            let ret = self.fresh_var_ty();
            if is_constructor {
                let proto_ty = self.fresh_var_ty();
                let ctor = self.types.constructor(params.clone(), ret, Some(proto_ty));
                let ctor_term = self.terms.type_constant(ctor);
                self.push_constraint(Constraint::SubType { left: func, right: ctor_term }, line, cause);
                let proto_term = self.terms.proto(func);
                let proto_var_term = self.term_for_type_id(proto_ty);
                self.push_constraint(
                    Constraint::Equality { left: proto_term, right: proto_var_term },
                    line,
                    cause,
                );
            } else {
                let fn_ty = self.types.function(params.clone(), ret);
                let fn_term = self.terms.type_constant(fn_ty);
                self.push_constraint(Constraint::SubType { left: func, right: fn_term }, line, cause);
            }
            (params, ret)
        };
        for (i, param_ty) in param_tys.iter().enumerate().take(arity as usize) {
            let param_term = self.terms.function_param(func, i as u32, arity);
            let ty_term = self.term_for_type_id(*param_ty);
            self.push_constraint(
                Constraint::Equality { left: param_term, right: ty_term },
                line,
                cause,
            );
        }
        let ret_term = self.terms.function_return(func, arity);
        let ret_ty_term = self.term_for_type_id(ret_ty);
        self.push_constraint(
            Constraint::Equality { left: ret_term, right: ret_ty_term },
            line,
            cause,
        );
    }

    /// Introduce a type variable for a declared return type when it is
    /// `Any` or an object literal shape (whose `Any` properties are also
    /// freshened). With a prototype variable at hand the object shape is
    /// re-rooted under it.
    fn type_vars_for_return_type(
        &mut self,
        sig: &mut Signature,
        prototype_var: Option<TypeId>,
        line: Option<u32>,
        cause: CauseId,
    ) -> TypeId {
        let ret = sig.ret;
        let ret_data = self.types.lookup(ret).clone();
        if !matches!(ret_data, TypeData::Any | TypeData::Object(_)) {
            return ret;
        }
        let ret_var = self.fresh_var_ty();
        if let TypeData::Object(shape) = ret_data {
            let mut rebound = ret;
            for p in &shape.properties {
                if matches!(self.types.lookup(p.ty), TypeData::Any) {
                    let var_ty = self.fresh_var_ty();
                    rebound =
                        self.types.object_with_property(rebound, p.name, var_ty, p.read_only);
                }
            }
            if let Some(proto) = prototype_var {
                let own: Vec<Property> = self
                    .types
                    .object_shape(rebound)
                    .expect("object return type")
                    .own_properties()
                    .cloned()
                    .collect();
                rebound = self.types.object_parts(Some(proto), own, Vec::new());
            }
            let ret_var_term = self.term_for_type_id(ret_var);
            let obj_term = self.terms.type_constant(rebound);
            self.push_constraint(
                Constraint::Equality { left: ret_var_term, right: obj_term },
                line,
                cause,
            );
        }
        ret_var
    }

    fn rebuild_code_type(&mut self, code_ty: TypeId, sig: Signature) -> TypeId {
        match self.types.lookup(code_ty).clone() {
            TypeData::Function(_) => self.types.intern(TypeData::Function(sig)),
            TypeData::Constructor { prototype, .. } => {
                self.types.intern(TypeData::Constructor { sig, prototype })
            }
            TypeData::AttachedMethod(_) => self.types.intern(TypeData::AttachedMethod(sig)),
            TypeData::UnattachedMethod { receiver, .. } => {
                self.types.intern(TypeData::UnattachedMethod { sig, receiver })
            }
            _ => unreachable!("not a code type"),
        }
    }

    // -------------------------------------------------------------------------
    // Prototypes
    // -------------------------------------------------------------------------

    fn handle_proto_term(
        &mut self,
        proto_term: TermId,
        c: ConstraintId,
        cause: CauseId,
        st: &mut NormalizeState,
    ) {
        if !st.handled_protos.insert(proto_term) {
            return;
        }
        debug!(term = %self.display_term(proto_term), "handling proto term");
        let TermData::Proto(base) = *self.terms.data(proto_term) else { unreachable!() };
        let line = self.constraints.line(c);
        let declared = self.terms.type_of(base);
        let declared_ctor = declared.filter(|ty| {
            matches!(self.types.lookup(*ty), TypeData::Constructor { .. })
        });
        let Some(ctor_ty) = declared_ctor else {
            // the base's upper bound should be a constructor type, but its
            // arity is unknown here; recover the prototype during solving
            self.push_constraint(Constraint::Proto { term: proto_term }, line, cause);
            return;
        };
        let TypeData::Constructor { mut sig, prototype } = self.types.lookup(ctor_ty).clone()
        else {
            unreachable!();
        };
        let proto_var_ty = self.fresh_var_ty();
        let proto_var_term = self.term_for_type_id(proto_var_ty);
        if let Some(declared_proto) = prototype {
            // individual prototype properties were initialized up front
            self.freshen_any_properties_of_type(declared_proto, proto_var_term, line, cause);
        }
        // re-root the constructor on the prototype variable
        let ret = self.type_vars_for_return_type(&mut sig, Some(proto_var_ty), line, cause);
        sig.ret = ret;
        let arity = sig.arity() as u32;
        let rebuilt =
            self.types.intern(TypeData::Constructor { sig, prototype: Some(proto_var_ty) });
        self.terms.set_type(base, rebuilt);
        let cons_proto = self.terms.proto(base);
        self.push_constraint(
            Constraint::Equality { left: cons_proto, right: proto_var_term },
            line,
            cause,
        );
        let ret_term = self.terms.function_return(base, arity);
        let ret_ty_term = self.term_for_type_id(ret);
        self.push_constraint(
            Constraint::Equality { left: ret_term, right: ret_ty_term },
            line,
            cause,
        );
    }

    /// Freshen `Any` properties of a declared prototype object and equate
    /// the result with the prototype variable's term.
    fn freshen_any_properties_of_type(
        &mut self,
        proto_ty: TypeId,
        proto_var_term: TermId,
        line: Option<u32>,
        cause: CauseId,
    ) {
        let Some(shape) = self.types.object_shape(proto_ty).cloned() else { return };
        let mut rebound = proto_ty;
        for p in &shape.properties {
            if matches!(self.types.lookup(p.ty), TypeData::Any) {
                let var_ty = self.fresh_var_ty();
                rebound = self.types.object_with_property(rebound, p.name, var_ty, p.read_only);
            }
        }
        let obj_term = self.terms.type_constant(rebound);
        self.push_constraint(
            Constraint::Equality { left: proto_var_term, right: obj_term },
            line,
            cause,
        );
    }

    // -------------------------------------------------------------------------
    // Indexed accesses and literals
    // -------------------------------------------------------------------------

    /// Constrain an indexed access. Array and map literals have their
    /// element slot rebound to a fresh variable; a companion type-parameter
    /// term proves array usage; anything else gets an unknown-indexable
    /// placeholder resolved by later solving steps.
    fn handle_indexed_term(
        &mut self,
        left: TermId,
        right: TermId,
        c: ConstraintId,
        cause: CauseId,
        st: &mut NormalizeState,
    ) {
        let (indexed, other) = if matches!(self.terms.data(left), TermData::Indexed(_)) {
            (left, right)
        } else {
            (right, left)
        };
        let TermData::Indexed(base) = *self.terms.data(indexed) else { unreachable!() };
        if !st.constrained_index_terms.insert(base) {
            return;
        }
        let line = self.constraints.line(c);
        let elem_ty = self.fresh_var_ty();
        let elem_term = self.term_for_type_id(elem_ty);
        match *self.terms.data(base) {
            TermData::ArrayLiteral(_) => {
                let rebound = self.types.array(elem_ty);
                self.terms.set_type(base, rebound);
            }
            TermData::MapLiteral(_) => {
                let rebound = self.types.map(elem_ty);
                self.terms.set_type(base, rebound);
            }
            _ if matches!(self.terms.data(other), TermData::TypeParam(_)) => {
                // a type-parameter companion proves this is an array, so no
                // key variable is needed
                let arr_ty = self.types.array(elem_ty);
                let arr_term = self.terms.type_constant(arr_ty);
                self.push_constraint(Constraint::SubType { left: base, right: arr_term }, line, cause);
                // the return type of "push" is an int
                let push_name = self.interner.intern("push");
                let push_term = self.terms.property_access(base, push_name);
                let push_ret = self.terms.function_return(push_term, 1);
                let int_term = self.terms.type_constant(TypeId::INT);
                self.push_constraint(
                    Constraint::Equality { left: push_ret, right: int_term },
                    line,
                    cause,
                );
            }
            _ => {
                let key_ty = self.fresh_var_ty();
                let uit = self.types.unknown_indexable(key_ty, elem_ty, Vec::new());
                let uit_term = self.terms.type_constant(uit);
                self.push_constraint(Constraint::SubType { left: base, right: uit_term }, line, cause);
                let key_var_term = self.term_for_type_id(key_ty);
                let key_term = self.terms.key(base);
                self.push_constraint(
                    Constraint::Equality { left: key_var_term, right: key_term },
                    line,
                    cause,
                );
            }
        }
        self.push_constraint(Constraint::Equality { left: elem_term, right: indexed }, line, cause);
    }

    fn handle_map_literal(&mut self, mlt: TermId, c: ConstraintId, cause: CauseId) {
        let Some(declared) = self.terms.type_of(mlt) else { return };
        let TypeData::Map(elem) = *self.types.lookup(declared) else { return };
        if !matches!(self.types.lookup(elem), TypeData::Any) {
            return;
        }
        let line = self.constraints.line(c);
        let elem_ty = self.fresh_var_ty();
        let rebound = self.types.map(elem_ty);
        self.terms.set_type(mlt, rebound);
        let elem_term = self.term_for_type_id(elem_ty);
        let indexed = self.terms.indexed(mlt);
        self.push_constraint(Constraint::Equality { left: elem_term, right: indexed }, line, cause);
    }

    // -------------------------------------------------------------------------
    // Receivers and builtin intersections
    // -------------------------------------------------------------------------

    fn handle_receiver_term(
        &mut self,
        receiver_term: TermId,
        func: TermId,
        c: ConstraintId,
        cause: CauseId,
    ) {
        let declared = self.terms.type_of(func).expect("method term carries a declared type");
        let TypeData::UnattachedMethod { sig, .. } = self.types.lookup(declared).clone() else {
            unreachable!("receiver term for a non-method type");
        };
        let recv_ty = self.fresh_var_ty();
        let rebuilt = self.types.intern(TypeData::UnattachedMethod { sig, receiver: recv_ty });
        self.terms.set_type(func, rebuilt);
        let line = self.constraints.line(c);
        let recv_var_term = self.term_for_type_id(recv_ty);
        self.push_constraint(
            Constraint::Equality { left: receiver_term, right: recv_var_term },
            line,
            cause,
        );
    }

    /// Builtins declared as intersections may carry `Any` holes in their
    /// function cases; replace them with fresh variables so indexing
    /// constraints can bite.
    fn freshen_intersection_decl(&mut self, term: TermId) {
        let Some(declared) = self.terms.type_of(term) else { return };
        let TypeData::Intersection(cases) = self.types.lookup(declared).clone() else {
            return;
        };
        let mut new_cases = Vec::with_capacity(cases.len());
        let mut changed = false;
        for case in cases {
            if let TypeData::Function(mut sig) = self.types.lookup(case).clone() {
                let mut case_changed = false;
                for i in 0..sig.params.len() {
                    if matches!(self.types.lookup(sig.params[i]), TypeData::Any) {
                        sig.params[i] = self.fresh_var_ty();
                        case_changed = true;
                    }
                }
                if let TypeData::Array(elem) = *self.types.lookup(sig.ret) {
                    if matches!(self.types.lookup(elem), TypeData::Any) {
                        let elem_ty = self.fresh_var_ty();
                        sig.ret = self.types.array(elem_ty);
                        case_changed = true;
                    }
                }
                if case_changed {
                    new_cases.push(self.types.intern(TypeData::Function(sig)));
                    changed = true;
                    continue;
                }
            }
            new_cases.push(case);
        }
        if changed {
            let rebuilt = self.types.intersection(new_cases);
            self.terms.set_type(term, rebuilt);
        }
    }
}

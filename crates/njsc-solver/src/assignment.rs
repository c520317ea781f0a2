//! The solution obtained from a successful type-inference run.

use crate::solver::Solver;
use crate::term::{TermData, TermId};
use indexmap::IndexMap;
use njsc_types::{Property, RepresentationSort, TypeId};
use rustc_hash::FxHashSet;

/// An immutable term → type map plus accessors for the inferred MRO/MRW
/// sets. Querying a term that was not assigned during extraction triggers
/// lazy type-variable substitution, so nested structure is always fully
/// resolved by the time a caller sees it.
pub struct TypeAssignment {
    solver: Solver,
    term_types: IndexMap<TermId, TypeId>,
}

impl std::fmt::Debug for TypeAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeAssignment")
            .field("term_count", &self.term_types.len())
            .finish_non_exhaustive()
    }
}

impl TypeAssignment {
    pub(crate) fn new(solver: Solver, term_types: IndexMap<TermId, TypeId>) -> Self {
        Self { solver, term_types }
    }

    /// The final type of a term.
    pub fn type_of_term(&mut self, term: TermId) -> Option<TypeId> {
        if matches!(self.solver.terms.data(term), TermData::EnvironmentDecl(_)) {
            return self.solver.terms.type_of(term);
        }
        if let Some(ty) = self.term_types.get(&term) {
            return Some(*ty);
        }
        let ty = self.solver.terms.type_of(term)?;
        let mut in_progress = FxHashSet::default();
        let substituted = self.solver.substitute_type_vars(ty, &mut in_progress);
        self.term_types.insert(term, substituted);
        Some(substituted)
    }

    /// The representation sort the backend should use for a term's value.
    pub fn rep_of_term(&mut self, term: TermId) -> Option<RepresentationSort> {
        let ty = self.type_of_term(term)?;
        Some(self.solver.types.rep_of(ty))
    }

    pub fn mro_of(&self, term: TermId) -> &[Property] {
        self.solver.mro_of(term)
    }

    pub fn mrw_of(&self, term: TermId) -> &[Property] {
        self.solver.mrw_of(term)
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// One line per interesting term, sorted, for debugging.
    pub fn debug_string(&self) -> String {
        let mut lines: Vec<String> = self
            .term_types
            .iter()
            .filter(|(t, _)| {
                !matches!(
                    self.solver.terms.data(**t),
                    TermData::TypeParam(_)
                        | TermData::TypeConstant(_)
                        | TermData::EnvironmentDecl(_)
                        | TermData::Indexed(_)
                        | TermData::Key(_)
                        | TermData::FunctionParam { .. }
                        | TermData::FunctionReturn { .. }
                        | TermData::PropertyAccess { .. }
                        | TermData::TypeVar(_)
                )
            })
            .map(|(t, ty)| {
                format!("{} --> {}", self.solver.display_term(*t), self.solver.display_ty(*ty))
            })
            .collect();
        lines.sort();
        lines.join("\n")
    }

    /// A human-readable dump of the inferred structural-inheritance sets.
    pub fn mro_mrw_string(&self) -> String {
        let mut lines: Vec<String> = self
            .solver
            .registered_terms()
            .filter(|t| {
                !matches!(self.solver.terms.data(*t), TermData::TypeConstant(_))
                    && (!self.solver.mro_of(*t).is_empty() || !self.solver.mrw_of(*t).is_empty())
            })
            .map(|t| {
                let line = self
                    .solver
                    .terms
                    .line(t)
                    .map(|l| format!(" (line {l})"))
                    .unwrap_or_default();
                format!(
                    "{}{} --> [MRO=[{}], MRW=[{}]]",
                    self.solver.display_term(t),
                    line,
                    self.sorted_prop_names(self.solver.mro_of(t)),
                    self.sorted_prop_names(self.solver.mrw_of(t)),
                )
            })
            .collect();
        lines.sort();
        lines.join("\n")
    }

    fn sorted_prop_names(&self, props: &[Property]) -> String {
        let interner = self.solver.types.interner();
        let mut names: Vec<String> =
            props.iter().map(|p| interner.resolve(p.name).to_string()).collect();
        names.sort();
        names.join(", ")
    }
}

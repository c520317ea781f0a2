//! Human-readable type rendering for diagnostics and solution dumps.

use crate::store::TypeStore;
use crate::types::{TypeData, TypeId};
use njsc_common::limits::TYPE_DISPLAY_DEPTH_LIMIT;
use rustc_hash::FxHashSet;

/// Render a type. Objects print inherited (RO) properties before own (RW)
/// ones, separated by `|`, matching the solution dump format.
pub fn display_type(store: &TypeStore, id: TypeId) -> String {
    let mut in_progress = FxHashSet::default();
    render(store, id, &mut in_progress, 0)
}

fn render(
    store: &TypeStore,
    id: TypeId,
    in_progress: &mut FxHashSet<TypeId>,
    depth: usize,
) -> String {
    if depth > TYPE_DISPLAY_DEPTH_LIMIT {
        return "...".to_string();
    }
    if !in_progress.insert(id) {
        return "<<recursive>>".to_string();
    }
    let interner = store.interner().clone();
    let result = match store.lookup(id) {
        TypeData::Int => "int".to_string(),
        TypeData::Float => "float".to_string(),
        TypeData::Bool => "boolean".to_string(),
        TypeData::String => "string".to_string(),
        TypeData::Void => "void".to_string(),
        TypeData::Any => "any".to_string(),
        TypeData::Top => "Top".to_string(),
        TypeData::Bottom => "Bottom".to_string(),
        TypeData::TopRef => "TopRef".to_string(),
        TypeData::BottomRef => "BottomRef".to_string(),
        TypeData::Var(v) => format!("T{}", v.0),
        TypeData::Object(shape) => {
            let ro: Vec<String> = shape
                .inherited_properties()
                .map(|p| {
                    format!(
                        "{}: {}",
                        interner.resolve(p.name),
                        render(store, p.ty, in_progress, depth + 1)
                    )
                })
                .collect();
            let rw: Vec<String> = shape
                .own_properties()
                .map(|p| {
                    format!(
                        "{}: {}",
                        interner.resolve(p.name),
                        render(store, p.ty, in_progress, depth + 1)
                    )
                })
                .collect();
            format!("{{ {} | {} }}", ro.join(", "), rw.join(", "))
        }
        TypeData::Array(elem) => {
            format!("Array<{}>", render(store, *elem, in_progress, depth + 1))
        }
        TypeData::Map(elem) => format!("Map<{}>", render(store, *elem, in_progress, depth + 1)),
        TypeData::Function(sig) => {
            format!("({})", render_sig(store, &sig.params, sig.ret, in_progress, depth))
        }
        TypeData::Constructor { sig, prototype } => {
            let proto = prototype
                .map(|p| format!(" [proto {}]", render(store, p, in_progress, depth + 1)))
                .unwrap_or_default();
            format!("ctor({}){}", render_sig(store, &sig.params, sig.ret, in_progress, depth), proto)
        }
        TypeData::AttachedMethod(sig) => {
            format!("method({})", render_sig(store, &sig.params, sig.ret, in_progress, depth))
        }
        TypeData::UnattachedMethod { sig, receiver } => {
            format!(
                "method[{}]({})",
                render(store, *receiver, in_progress, depth + 1),
                render_sig(store, &sig.params, sig.ret, in_progress, depth)
            )
        }
        TypeData::Intersection(cases) => cases
            .iter()
            .map(|c| render(store, *c, in_progress, depth + 1))
            .collect::<Vec<_>>()
            .join(" INTERSECT "),
        TypeData::ObjectUnion(cases) => cases
            .iter()
            .map(|c| render(store, *c, in_progress, depth + 1))
            .collect::<Vec<_>>()
            .join(" UNION "),
        TypeData::UnknownIndexable { key, elem, .. } => format!(
            "Indexable<{},{}>",
            render(store, *key, in_progress, depth + 1),
            render(store, *elem, in_progress, depth + 1)
        ),
    };
    in_progress.remove(&id);
    result
}

fn render_sig(
    store: &TypeStore,
    params: &[TypeId],
    ret: TypeId,
    in_progress: &mut FxHashSet<TypeId>,
    depth: usize,
) -> String {
    let params: Vec<String> = params
        .iter()
        .map(|p| render(store, *p, in_progress, depth + 1))
        .collect();
    format!("{} -> {}", params.join(", "), render(store, ret, in_progress, depth + 1))
}

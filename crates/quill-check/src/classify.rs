//! Static/live classification of object type definitions.
//!
//! An object type is *live* when its values are managed by the replication
//! system, and *static* when they are plain copied values. Two things make
//! a definition live:
//!
//! 1. its own fields use a Live construct (`LiveList`, `LiveMap`, or a
//!    `LiveObject<…>` reference), which forces the classification, or
//! 2. every reference to it is written as `LiveObject<Name>`.
//!
//! Conversely, a definition referenced everywhere as plain `Name` is
//! static. Mixing the two reference styles is an error, reported as each
//! conflicting site is encountered; the first-seen reference is cited as
//! the original. Traversal order is document definition order, then field
//! declaration order, so conflict messages are deterministic.

use std::collections::BTreeMap;

use quill_ast::{Document, FieldDef, Range, Type, TypeKind, TypeRef};
use quill_diag::Suggestion;

use crate::{quote, CheckResult, Context};

/// Per-name reference bookkeeping for one classification run.
///
/// `live` maps to `None` when the name was forced live by its own fields
/// rather than seen at a `LiveObject<…>` reference site.
#[derive(Default)]
struct RefTables {
    stat: BTreeMap<String, Range>,
    live: BTreeMap<String, Option<Range>>,
}

pub(crate) fn decide_static_or_live(doc: &Document, ctx: &mut Context<'_>) -> CheckResult {
    let mut tables = RefTables::default();

    // Scan 1: a definition using a Live construct in its own fields (not
    // through other named types) can only ever be a live object.
    for (index, def) in doc.definitions.iter().enumerate() {
        if ctx.registered.get(&def.name().name) != Some(&index) {
            continue;
        }
        let Some(obj) = def.as_object_type() else { continue };
        if fields_use_live_construct(&obj.fields) {
            tables.live.insert(obj.name.name.clone(), None);
        }
    }

    // Scan 2: walk every reference site in the whole document, recording
    // reference styles and pruning the unreferenced set.
    for def in &doc.definitions {
        let Some(obj) = def.as_object_type() else { continue };
        for field in &obj.fields {
            classify_type(&field.ty, doc, ctx, &mut tables)?;
        }
    }

    // Finalize flags. A name seen both ways was already reported; live
    // wins so the structural recheck blames the static-style sites.
    for name in tables.stat.keys() {
        ctx.statics.insert(name.clone(), true);
    }
    for name in tables.live.keys() {
        ctx.statics.insert(name.clone(), false);
    }

    Ok(())
}

fn classify_type(
    ty: &Type,
    doc: &Document,
    ctx: &mut Context<'_>,
    tables: &mut RefTables,
) -> CheckResult {
    match &ty.kind {
        TypeKind::Ref(r) => classify_ref(r, ty.range, doc, ctx, tables),
        TypeKind::Array(of) | TypeKind::LiveList(of) => classify_type(of, doc, ctx, tables),
        TypeKind::LiveMap { key, value } => {
            classify_type(key, doc, ctx, tables)?;
            classify_type(value, doc, ctx, tables)
        }
        TypeKind::ObjectLiteral(fields) => {
            for field in fields {
                classify_type(&field.ty, doc, ctx, tables)?;
            }
            Ok(())
        }
        TypeKind::Union(members) => {
            for member in members {
                classify_type(member, doc, ctx, tables)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn classify_ref(
    r: &TypeRef,
    range: Range,
    doc: &Document,
    ctx: &mut Context<'_>,
    tables: &mut RefTables,
) -> CheckResult {
    let name = r.name.name.as_str();
    if ctx.lookup(doc, name).is_none() {
        // Unresolved references are the structural pass's problem.
        return Ok(());
    }
    ctx.mark_referenced(name);

    let Some(def) = ctx.lookup(doc, name) else { return Ok(()) };
    if def.as_object_type().is_none() {
        return Ok(());
    }

    let live_spelling = format!("LiveObject<{name}>");
    if r.as_live_object {
        match tables.stat.get(name) {
            None => {
                tables.live.insert(name.to_string(), Some(range));
            }
            Some(&conflict) => {
                // Blame the earlier static-style site; cite this one.
                let message = format!(
                    "Type {} already referenced as {} on line {}. You cannot mix these references.",
                    quote(name),
                    quote(&live_spelling),
                    ctx.lineno(range),
                );
                ctx.report(message, conflict, vec![Suggestion::Replace { name: live_spelling }])?;
            }
        }
    } else {
        match tables.live.get(name) {
            None => {
                tables.stat.insert(name.to_string(), range);
            }
            Some(None) => {
                let message = format!(
                    "Type {} uses Live constructs, so it must be referenced as {}",
                    quote(name),
                    quote(&live_spelling),
                );
                ctx.report(message, range, vec![Suggestion::Replace { name: live_spelling }])?;
            }
            Some(&Some(conflict)) => {
                let message = format!(
                    "Type {} already referenced as {} on line {}. You cannot mix these references.",
                    quote(name),
                    quote(&live_spelling),
                    ctx.lineno(conflict),
                );
                ctx.report(message, range, vec![Suggestion::Replace { name: live_spelling }])?;
            }
        }
    }

    Ok(())
}

fn fields_use_live_construct(fields: &[FieldDef]) -> bool {
    fields.iter().any(|field| uses_live_construct(&field.ty))
}

/// Whether a Live construct appears anywhere in this expression, without
/// following references into other definitions.
fn uses_live_construct(ty: &Type) -> bool {
    if ty.is_live_structure() {
        return true;
    }
    match &ty.kind {
        TypeKind::Array(of) => uses_live_construct(of),
        TypeKind::ObjectLiteral(fields) => fields_use_live_construct(fields),
        TypeKind::Union(members) => members.iter().any(uses_live_construct),
        _ => false,
    }
}

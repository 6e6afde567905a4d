//! Structural validation: a depth-first walk over every node in the
//! document, dispatched by node kind.
//!
//! Runs after classification so the static/live flags are final. The walk
//! is pre-order: a node's own checks run before its children's, matching
//! the order diagnostics are expected in.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use quill_ast::{
    Definition, Document, FieldDef, Identifier, LiteralValue, ObjectTypeDefinition, Range, Type,
    TypeKind, TypeName, TypeRef,
};
use quill_diag::Suggestion;

use crate::tag::{type_tag, Tag};
use crate::{didyoumeanify, loc, quote, replace_suggestions, CheckResult, Context, BUILTINS};

/// Field names reserved for the runtime's own bookkeeping.
const RESERVED_IDENTIFIERS: [&str; 1] = ["quillType"];

/// Typename stems reserved for future language additions.
const RESERVED_TYPENAME_WORDS: [&str; 8] = [
    "presence", "array", "string", "int", "float", "number", "boolean", "null",
];

pub(crate) fn check_document(doc: &Document, ctx: &mut Context<'_>) -> CheckResult {
    for def in &doc.definitions {
        check_definition(def, doc, ctx)?;
    }
    Ok(())
}

fn check_definition(def: &Definition, doc: &Document, ctx: &mut Context<'_>) -> CheckResult {
    let Definition::ObjectType(obj) = def;
    check_no_duplicate_fields(&obj.fields, ctx)?;
    check_no_circular_refs(obj, doc, ctx)?;
    check_type_name(&obj.name, ctx)?;
    for field in &obj.fields {
        check_field(field, doc, ctx)?;
    }
    Ok(())
}

fn check_field(field: &FieldDef, doc: &Document, ctx: &mut Context<'_>) -> CheckResult {
    check_identifier(&field.name, ctx)?;
    check_type(&field.ty, doc, ctx)
}

fn check_type(ty: &Type, doc: &Document, ctx: &mut Context<'_>) -> CheckResult {
    match &ty.kind {
        TypeKind::String | TypeKind::Number | TypeKind::Boolean | TypeKind::Null => Ok(()),
        TypeKind::Literal(value) => check_literal(value, ty.range, ctx),
        TypeKind::Array(of) => {
            ensure_no_live_structure(of, "inside an array", ctx)?;
            check_type(of, doc, ctx)
        }
        TypeKind::ObjectLiteral(fields) => {
            check_no_duplicate_fields(fields, ctx)?;
            for field in fields {
                ensure_no_live_structure(&field.ty, "inside an object literal", ctx)?;
            }
            for field in fields {
                check_field(field, doc, ctx)?;
            }
            Ok(())
        }
        TypeKind::LiveList(of) => check_type(of, doc, ctx),
        TypeKind::LiveMap { key, value } => {
            if !matches!(key.kind, TypeKind::String) {
                ctx.report(
                    "Only 'string' keys are currently supported in LiveMaps".to_string(),
                    key.range,
                    vec![Suggestion::Replace {
                        name: "string".to_string(),
                    }],
                )?;
            }
            check_type(key, doc, ctx)?;
            check_type(value, doc, ctx)
        }
        TypeKind::Ref(r) => {
            check_type_ref(r, ty.range, doc, ctx)?;
            check_type_name(&r.name, ctx)
        }
        TypeKind::Union(members) => {
            check_union(members, ty.range, ctx)?;
            for member in members {
                check_type(member, doc, ctx)?;
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

fn check_identifier(node: &Identifier, ctx: &mut Context<'_>) -> CheckResult {
    if RESERVED_IDENTIFIERS.contains(&node.name.as_str()) {
        ctx.report(
            format!("Identifier {} is reserved", quote(&node.name)),
            node.range,
            vec![],
        )?;
    }
    Ok(())
}

fn is_reserved_type_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("live") || RESERVED_TYPENAME_WORDS.contains(&lower.as_str())
}

fn check_type_name(node: &TypeName, ctx: &mut Context<'_>) -> CheckResult {
    if BUILTINS.contains(&node.name.as_str()) {
        ctx.report(
            format!(
                "Name {} is a built-in and cannot be redefined",
                quote(&node.name)
            ),
            node.range,
            vec![],
        )?;
    }

    if !node
        .name
        .starts_with(|c: char| c.is_ascii_uppercase() || c == '_')
    {
        ctx.report(
            "Type names should start with an uppercase character".to_string(),
            node.range,
            vec![],
        )?;
    }

    // Once the document has any error, skip the reserved-name check to
    // keep the noise down.
    if !ctx.reporter.has_errors() && is_reserved_type_name(&node.name) {
        ctx.report(
            format!("Name {} is reserved for future use", quote(&node.name)),
            node.range,
            vec![],
        )?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Fields and simple node kinds
// ---------------------------------------------------------------------------

/// Pair up items whose key was already seen: `(first_occurrence, duplicate)`.
fn dupes<'a, T, K: Ord>(
    items: impl IntoIterator<Item = &'a T>,
    key: impl Fn(&T) -> K,
) -> Vec<(&'a T, &'a T)> {
    let mut seen: BTreeMap<K, &T> = BTreeMap::new();
    let mut out = Vec::new();
    for item in items {
        match seen.entry(key(item)) {
            Entry::Occupied(entry) => out.push((*entry.get(), item)),
            Entry::Vacant(entry) => {
                entry.insert(item);
            }
        }
    }
    out
}

fn check_no_duplicate_fields(fields: &[FieldDef], ctx: &mut Context<'_>) -> CheckResult {
    for (first, second) in dupes(fields, |f| f.name.name.clone()) {
        let message = format!(
            "A field named {} is defined multiple times (on line {} and {})",
            quote(&first.name.name),
            ctx.lineno(first.name.range),
            ctx.lineno(second.name.range),
        );
        ctx.report(message, second.name.range, vec![])?;
    }
    Ok(())
}

fn ensure_no_live_structure(expr: &Type, where_: &str, ctx: &mut Context<'_>) -> CheckResult {
    if expr.is_live_structure() {
        ctx.report(
            format!("Cannot use Live construct {where_}"),
            expr.range,
            vec![],
        )?;
    }
    Ok(())
}

fn check_literal(value: &LiteralValue, range: Range, ctx: &mut Context<'_>) -> CheckResult {
    if let LiteralValue::Number(n) = value {
        if n.fract() != 0.0 {
            ctx.report(
                "Number literals can only be whole integers".to_string(),
                range,
                vec![],
            )?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Type references
// ---------------------------------------------------------------------------

fn check_type_ref(r: &TypeRef, range: Range, doc: &Document, ctx: &mut Context<'_>) -> CheckResult {
    let name = r.name.name.as_str();

    if r.as_live_object {
        match ctx.lookup(doc, name) {
            None => {
                let suggestions = ctx.suggest_object_type_names(doc, name);
                let message =
                    didyoumeanify(format!("Unknown object type {}", quote(name)), &suggestions);
                ctx.report(message, r.name.range, replace_suggestions(suggestions))?;
                return Ok(());
            }
            Some(def) if def.as_object_type().is_none() => {
                // The payload of a LiveObject must be an object type.
                let suggestions = ctx.suggest_object_type_names(doc, name);
                let message = didyoumeanify(
                    format!("Type {} is not an object type", quote(name)),
                    &suggestions,
                );
                ctx.report(message, r.name.range, replace_suggestions(suggestions))?;
                return Ok(());
            }
            Some(_) => {}
        }
    } else if ctx.lookup(doc, name).is_none() {
        let suggestions = ctx.suggest_type_name_or_builtin(name);
        let message = didyoumeanify(format!("Unknown type {}", quote(name)), &suggestions);
        ctx.report(message, r.name.range, replace_suggestions(suggestions))?;
        return Ok(());
    }

    check_live_consistency(r, range, doc, ctx)
}

/// Re-assert the reference style against the finalized static/live flag.
///
/// The classification pass reports conflicts between sites as it finds
/// them; this check catches sites that disagree with the final verdict.
fn check_live_consistency(
    r: &TypeRef,
    range: Range,
    doc: &Document,
    ctx: &mut Context<'_>,
) -> CheckResult {
    let Some(def) = ctx.lookup(doc, &r.name.name) else {
        // Lookup failed but the reporter let us continue: skip this
        // sub-check and keep walking.
        return Ok(());
    };
    let Some(obj) = def.as_object_type() else {
        return Ok(());
    };
    let name = obj.name.name.clone();
    let is_static = ctx.is_static(&name);

    // Static objects may not be referenced with LiveObject<> wrappers.
    if is_static && r.as_live_object {
        ctx.report(
            format!(
                "Type {} cannot be used with LiveObject<{}>",
                quote(&name),
                quote(&name)
            ),
            range,
            vec![Suggestion::Replace { name }],
        )?;
    } else if !is_static && !r.as_live_object {
        // Live objects must be referenced with LiveObject<> wrappers.
        let live_spelling = format!("LiveObject<{name}>");
        ctx.report(
            format!(
                "Type {} must be referred to as {}",
                quote(&name),
                quote(&live_spelling)
            ),
            range,
            vec![Suggestion::Replace {
                name: live_spelling,
            }],
        )?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unions
// ---------------------------------------------------------------------------

fn check_union(members: &[Type], range: Range, ctx: &mut Context<'_>) -> CheckResult {
    if members.len() <= 1 {
        ctx.report("Unions must have at least 2 members".to_string(), range, vec![])?;
    }

    // First pass: exact tag duplicates.
    for (member1, member2) in dupes(members, type_tag) {
        match type_tag(member1) {
            Tag::Obj => {
                ctx.report(
                    format!(
                        "Unions with more than one object type are not yet supported: type {} cannot appear in a union with {}",
                        quote(&member2.to_string()),
                        quote(&member1.to_string()),
                    ),
                    member2.range,
                    vec![],
                )?;
            }
            Tag::LiveObj => {
                ctx.report(
                    format!(
                        "Unions with more than one LiveObject are not yet supported: type {} cannot appear in a union with {}",
                        quote(&member2.to_string()),
                        quote(&member1.to_string()),
                    ),
                    member2.range,
                    vec![],
                )?;
            }
            _ => report_incompatible_members(member1, member2, ctx)?,
        }
    }

    // Second pass: a plain scalar and a literal of the same base type
    // overlap even though their tags differ (`string` vs `lit:"hi"`).
    let mut last_string: Option<&Type> = None;
    let mut last_string_lit: Option<&Type> = None;
    let mut last_number: Option<&Type> = None;
    let mut last_number_lit: Option<&Type> = None;
    let mut last_boolean: Option<&Type> = None;
    let mut last_boolean_lit: Option<&Type> = None;

    for member in members {
        match &member.kind {
            TypeKind::String => {
                last_string = Some(member);
                if let Some(lit) = last_string_lit {
                    report_incompatible_members(lit, member, ctx)?;
                }
            }
            TypeKind::Number => {
                last_number = Some(member);
                if let Some(lit) = last_number_lit {
                    report_incompatible_members(lit, member, ctx)?;
                }
            }
            TypeKind::Boolean => {
                last_boolean = Some(member);
                if let Some(lit) = last_boolean_lit {
                    report_incompatible_members(lit, member, ctx)?;
                }
            }
            TypeKind::Literal(value) => match value {
                LiteralValue::String(_) => {
                    last_string_lit = Some(member);
                    if let Some(scalar) = last_string {
                        report_incompatible_members(scalar, member, ctx)?;
                    }
                }
                LiteralValue::Number(_) => {
                    last_number_lit = Some(member);
                    if let Some(scalar) = last_number {
                        report_incompatible_members(scalar, member, ctx)?;
                    }
                }
                LiteralValue::Boolean(_) => {
                    last_boolean_lit = Some(member);
                    if let Some(scalar) = last_boolean {
                        report_incompatible_members(scalar, member, ctx)?;
                    }
                }
            },
            _ => {}
        }
    }

    Ok(())
}

fn report_incompatible_members(
    member1: &Type,
    member2: &Type,
    ctx: &mut Context<'_>,
) -> CheckResult {
    let range_to_remove = grow_to_include_pipe(member2.range, ctx.reporter.source());
    let suggestions = match range_to_remove {
        Some(r) => vec![Suggestion::Remove { range: loc(r) }],
        None => vec![],
    };
    ctx.report(
        format!(
            "Type {} cannot appear in a union with {}",
            quote(&member2.to_string()),
            quote(&member1.to_string()),
        ),
        member2.range,
        suggestions,
    )
}

// ---------------------------------------------------------------------------
// Remove-range growing for union auto-fixes
// ---------------------------------------------------------------------------

fn eat_whitespace_left(src: &[u8], mut pos: i64) -> i64 {
    while pos >= 0 && matches!(src.get(pos as usize), Some(b' ' | b'\t')) {
        pos -= 1;
    }
    pos
}

fn eat_whitespace_right(src: &[u8], mut pos: i64) -> i64 {
    while matches!(src.get(pos as usize), Some(b' ' | b'\t')) {
        pos += 1;
    }
    pos
}

fn grow_left(range: Range, src: &[u8]) -> Option<Range> {
    let mut start = eat_whitespace_left(src, range.start as i64 - 1);
    if start >= 0 && src.get(start as usize) == Some(&b'|') {
        start = eat_whitespace_left(src, start - 1) + 1;
        Some(Range::new(start as u32, range.end))
    } else {
        None
    }
}

fn grow_right(range: Range, src: &[u8]) -> Option<Range> {
    let mut end = eat_whitespace_right(src, range.end as i64);
    if src.get(end as usize) == Some(&b'|') {
        end = eat_whitespace_right(src, end + 1);
        Some(Range::new(range.start, end as u32))
    } else {
        None
    }
}

/// Extend a member's removal span to swallow an adjacent `|` separated
/// only by horizontal whitespace, so the suggested fix leaves a valid
/// union behind. Tries the left side first, then the right.
fn grow_to_include_pipe(range: Range, src: &str) -> Option<Range> {
    let src = src.as_bytes();
    grow_left(range, src).or_else(|| grow_right(range, src))
}

// ---------------------------------------------------------------------------
// Circular references
// ---------------------------------------------------------------------------

/// Reject reference cycles reachable from a definition's own fields,
/// directly or through intermediate definitions.
///
/// The forbidden chain starts with the definition's own name and grows as
/// the walk follows references. No visited-set memoization beyond the
/// chain: shared acyclic definitions can be revisited, which is fine for
/// the shallow schemas this language describes.
///
/// Optional self-references (`field?: Self` or `Self | null`) are rejected
/// like any other cycle for now.
fn check_no_circular_refs(
    def: &ObjectTypeDefinition,
    doc: &Document,
    ctx: &mut Context<'_>,
) -> CheckResult {
    let mut forbidden = vec![def.name.name.clone()];
    check_fields_forbidden_refs(&def.fields, doc, ctx, &mut forbidden)
}

fn check_fields_forbidden_refs(
    fields: &[FieldDef],
    doc: &Document,
    ctx: &mut Context<'_>,
    forbidden: &mut Vec<String>,
) -> CheckResult {
    for field in fields {
        check_type_forbidden_refs(&field.ty, doc, ctx, forbidden)?;
    }
    Ok(())
}

fn check_type_forbidden_refs(
    ty: &Type,
    doc: &Document,
    ctx: &mut Context<'_>,
    forbidden: &mut Vec<String>,
) -> CheckResult {
    match &ty.kind {
        TypeKind::String
        | TypeKind::Number
        | TypeKind::Boolean
        | TypeKind::Null
        | TypeKind::Literal(_) => Ok(()),
        TypeKind::ObjectLiteral(fields) => {
            check_fields_forbidden_refs(fields, doc, ctx, forbidden)
        }
        TypeKind::Array(of) | TypeKind::LiveList(of) => {
            check_type_forbidden_refs(of, doc, ctx, forbidden)
        }
        TypeKind::LiveMap { key, value } => {
            check_type_forbidden_refs(key, doc, ctx, forbidden)?;
            check_type_forbidden_refs(value, doc, ctx, forbidden)
        }
        TypeKind::Union(members) => {
            for member in members {
                check_type_forbidden_refs(member, doc, ctx, forbidden)?;
            }
            Ok(())
        }
        TypeKind::Ref(r) => {
            let name = &r.name.name;
            if forbidden.iter().any(|n| n == name) {
                ctx.report(
                    format!("Circular reference {} not yet supported", quote(name)),
                    ty.range,
                    vec![],
                )?;
                // Do not follow the cycle we just reported.
                return Ok(());
            }
            if let Some(target) = ctx.lookup(doc, name) {
                if let Some(obj) = target.as_object_type() {
                    // Shared borrow of `doc` outlives `target`; re-walk
                    // through the fields directly.
                    let fields = &obj.fields;
                    forbidden.push(name.clone());
                    check_fields_forbidden_refs(fields, doc, ctx, forbidden)?;
                    forbidden.pop();
                }
            }
            Ok(())
        }
    }
}

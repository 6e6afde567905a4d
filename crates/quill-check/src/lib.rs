//! Semantic checker for Quill schema documents.
//!
//! This crate implements:
//! - a registration pass that indexes all top-level definitions
//! - a two-scan classification pass deciding which object types are static
//!   values and which are live (replicated) objects
//! - a structural validation pass over every node in the document
//!
//! The checker takes a parsed [`Document`] and an [`ErrorReporter`] and
//! either returns a [`CheckedDocument`] with all references resolved or
//! fails with [`CheckFailed`] after reporting precise diagnostics. The
//! reporter decides whether diagnostics accumulate or abort the check on
//! first report; every traversal function propagates aborts with `?`.

use std::collections::{BTreeMap, BTreeSet};

use quill_ast::{Definition, Document, ObjectTypeDefinition, Range, TypeRef};

pub mod didyoumean;
pub mod tag;

mod classify;
mod structural;

pub use quill_diag::{
    Aborted, CollectingReporter, Diagnostic, ErrorReporter, FailFastReporter, Position,
    SourceRange, Suggestion,
};

/// Name of the mandatory root definition.
pub const ROOT_NAME: &str = "Storage";

/// The built-in scalar type names. These cannot be redefined and take part
/// in "did you mean" suggestions for unknown type references.
pub const BUILTINS: [&str; 4] = ["string", "number", "boolean", "null"];

/// The whole-document failure gate: at least one semantic error was
/// reported. The diagnostics themselves live on the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("schema did not pass semantic checks")]
pub struct CheckFailed;

impl From<Aborted> for CheckFailed {
    fn from(_: Aborted) -> Self {
        CheckFailed
    }
}

pub(crate) type CheckResult<T = ()> = Result<T, CheckFailed>;

/// Quote a name for embedding in a message, escaping embedded quotes.
pub(crate) fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "\\'"))
}

/// Convert an AST range to the diag crate's offset pair.
pub(crate) fn loc(range: Range) -> SourceRange {
    SourceRange::new(range.start, range.end)
}

/// Append a "Did you mean …?" tail when there are alternatives to offer.
pub(crate) fn didyoumeanify(message: String, alternatives: &[String]) -> String {
    if alternatives.is_empty() {
        return message;
    }
    let message = message.strip_suffix('.').unwrap_or(&message).to_string();
    let listed = alternatives
        .iter()
        .map(|alt| quote(alt))
        .collect::<Vec<_>>()
        .join(" or ");
    format!("{message}. Did you mean {listed}?")
}

pub(crate) fn replace_suggestions(names: Vec<String>) -> Vec<Suggestion> {
    names
        .into_iter()
        .map(|name| Suggestion::Replace { name })
        .collect()
}

// ---------------------------------------------------------------------------
// Checking context
// ---------------------------------------------------------------------------

/// Mutable analysis state threaded through every pass of one check
/// invocation. Created fresh per [`check`] call and discarded afterwards.
pub(crate) struct Context<'a> {
    pub(crate) reporter: &'a mut dyn ErrorReporter,

    /// Registered definitions by name; values index into the document's
    /// definition list. First occurrence wins under duplicate names.
    pub(crate) registered: BTreeMap<String, usize>,

    /// Names not yet referenced by any type expression. Whatever is left
    /// here at the end of the check (other than the root) is dead.
    pub(crate) unreferenced: BTreeSet<String>,

    /// Resolved static/live classification per object type name, filled in
    /// by the classification pass. Absent means never referenced and never
    /// forced, which only the root may legitimately be.
    pub(crate) statics: BTreeMap<String, bool>,
}

impl<'a> Context<'a> {
    fn new(reporter: &'a mut dyn ErrorReporter) -> Self {
        Self {
            reporter,
            registered: BTreeMap::new(),
            unreferenced: BTreeSet::new(),
            statics: BTreeMap::new(),
        }
    }

    pub(crate) fn report(
        &mut self,
        message: String,
        range: Range,
        suggestions: Vec<Suggestion>,
    ) -> CheckResult {
        self.reporter.report(message, loc(range), suggestions)?;
        Ok(())
    }

    /// Format the line number(s) a range spans, for embedding in messages.
    pub(crate) fn lineno(&self, range: Range) -> String {
        let start = self.reporter.to_position(range.start).line;
        let end = self.reporter.to_position(range.end).line;
        if start == end {
            format!("{start}")
        } else {
            format!("{start}-{end}")
        }
    }

    pub(crate) fn lookup<'d>(&self, doc: &'d Document, name: &str) -> Option<&'d Definition> {
        self.registered.get(name).map(|&index| &doc.definitions[index])
    }

    pub(crate) fn mark_referenced(&mut self, name: &str) {
        self.unreferenced.remove(name);
    }

    /// The finalized classification for a name. Mirrors the reference rule:
    /// an unclassified object type may only be referenced live.
    pub(crate) fn is_static(&self, name: &str) -> bool {
        self.statics.get(name).copied().unwrap_or(false)
    }

    /// Close-match candidates among object type names, for unknown
    /// `LiveObject<…>` targets. Never suggests the root.
    pub(crate) fn suggest_object_type_names(&self, doc: &Document, near: &str) -> Vec<String> {
        let candidates: Vec<String> = self
            .registered
            .iter()
            .filter(|&(name, &index)| {
                name.as_str() != ROOT_NAME && doc.definitions[index].as_object_type().is_some()
            })
            .map(|(name, _)| name.clone())
            .collect();
        didyoumean::suggest(near, candidates)
    }

    /// Close-match candidates among all registered names plus the built-in
    /// scalars, for unknown plain references. Never suggests the root.
    pub(crate) fn suggest_type_name_or_builtin(&self, near: &str) -> Vec<String> {
        let candidates = self
            .registered
            .keys()
            .filter(|name| name.as_str() != ROOT_NAME)
            .cloned()
            .chain(BUILTINS.iter().map(|b| b.to_string()));
        didyoumean::suggest(near, candidates)
    }
}

// ---------------------------------------------------------------------------
// Registration pass
// ---------------------------------------------------------------------------

/// Walk the top-level definitions once and populate the registry. Duplicate
/// names are reported citing both locations; the first entry stays
/// authoritative for lookups.
fn register_definitions(doc: &Document, ctx: &mut Context<'_>) -> CheckResult {
    for (index, def) in doc.definitions.iter().enumerate() {
        let name = &def.name().name;
        if let Some(&existing) = ctx.registered.get(name) {
            let existing_range = doc.definitions[existing].name().range;
            let message = format!(
                "A type named {} is defined multiple times (on line {} and {})",
                quote(name),
                ctx.lineno(existing_range),
                ctx.lineno(def.name().range),
            );
            ctx.report(message, def.name().range, vec![])?;
        } else {
            ctx.registered.insert(name.clone(), index);
            ctx.unreferenced.insert(name.clone());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Checked result
// ---------------------------------------------------------------------------

/// A document that passed all semantic checks. All references are
/// guaranteed to resolve.
#[derive(Debug)]
pub struct CheckedDocument {
    ast: Document,
    registered: BTreeMap<String, usize>,
    statics: BTreeMap<String, bool>,
    ordered: Vec<usize>,
    root: usize,
}

impl CheckedDocument {
    /// Direct access to the raw AST.
    pub fn ast(&self) -> &Document {
        &self.ast
    }

    /// The root `Storage` definition.
    pub fn root(&self) -> &ObjectTypeDefinition {
        match &self.ast.definitions[self.root] {
            Definition::ObjectType(def) => def,
        }
    }

    /// All registered definitions, in document order.
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.ordered.iter().map(|&index| &self.ast.definitions[index])
    }

    /// Whether an object type was classified as a plain static value type.
    /// Live types, including the root itself, answer false.
    pub fn is_static(&self, def: &ObjectTypeDefinition) -> bool {
        self.statics.get(&def.name.name).copied().unwrap_or(false)
    }

    /// Resolve a type reference to its definition.
    ///
    /// Total for any reference reachable from this document's tree.
    /// Panics when handed a reference from a different document; that is a
    /// programmer error, not a checkable condition.
    pub fn get_definition(&self, type_ref: &TypeRef) -> &Definition {
        match self.registered.get(&type_ref.name.name) {
            Some(&index) => &self.ast.definitions[index],
            None => panic!(
                "unknown type name {:?}: reference does not belong to this document",
                type_ref.name.name
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Run the full semantic check over one document.
///
/// Pass order: registration, static/live classification, structural
/// validation, then the closing root and dead-definition checks. All passes
/// share one context and report through the given reporter.
pub fn check(
    doc: Document,
    reporter: &mut dyn ErrorReporter,
) -> Result<CheckedDocument, CheckFailed> {
    let mut ctx = Context::new(reporter);

    register_definitions(&doc, &mut ctx)?;
    classify::decide_static_or_live(&doc, &mut ctx)?;
    structural::check_document(&doc, &mut ctx)?;

    if !ctx.registered.contains_key(ROOT_NAME) {
        ctx.report(
            format!("Missing root object type definition named {}", quote(ROOT_NAME)),
            doc.range,
            vec![Suggestion::AddObjectTypeDef {
                name: ROOT_NAME.to_string(),
            }],
        )?;
    }

    for (index, def) in doc.definitions.iter().enumerate() {
        let name = &def.name().name;
        if name == ROOT_NAME {
            continue;
        }
        // Only the registry-winning occurrence of a name is eligible; a
        // duplicate was already reported as such.
        if ctx.registered.get(name) != Some(&index) || !ctx.unreferenced.contains(name) {
            continue;
        }
        ctx.report(
            format!("Type {} is defined but never used", quote(name)),
            def.name().range,
            vec![Suggestion::Remove {
                range: loc(def.range()),
            }],
        )?;
    }

    if ctx.reporter.has_errors() {
        return Err(CheckFailed);
    }

    let Context {
        registered, statics, ..
    } = ctx;
    let mut ordered: Vec<usize> = registered.values().copied().collect();
    ordered.sort_unstable();
    let root = registered[ROOT_NAME];

    Ok(CheckedDocument {
        ast: doc,
        registered,
        statics,
        ordered,
        root,
    })
}

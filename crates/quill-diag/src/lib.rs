//! Diagnostics and error reporting for the Quill schema language.
//!
//! The checker reports semantic errors through the [`ErrorReporter`] trait
//! and never decides policy itself: a reporter may keep collecting
//! diagnostics ([`CollectingReporter`]) or abort the whole check on the
//! first one ([`FailFastReporter`]). Both policies ship here; the checker
//! must behave correctly under either.
//!
//! Offsets are byte offsets into the source text. This crate keeps its own
//! [`SourceRange`] independent of `quill-ast`'s ranges; callers convert at
//! report sites.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A half-open byte offset range within the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: u32,
    pub end: u32,
}

impl SourceRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// A 1-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// A machine-applicable fix attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Suggestion {
    /// Replace the diagnostic's range with `name`.
    Replace { name: String },
    /// Remove the given range from the source.
    Remove { range: SourceRange },
    /// Insert a new object type definition named `name`.
    AddObjectTypeDef { name: String },
}

/// A single semantic error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub range: SourceRange,
    pub suggestions: Vec<Suggestion>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {}", self.message)
    }
}

/// Returned by a reporter that chooses to stop the check at the current
/// diagnostic. The checker propagates this out of every traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("check aborted on first reported error")]
pub struct Aborted;

/// Map a byte offset to a 1-based line/column position.
///
/// Offsets past the end of the text clamp to the final position. Columns
/// count bytes, which is what the rest of the toolchain expects.
pub fn position_at(source: &str, offset: u32) -> Position {
    let offset = (offset as usize).min(source.len());
    let before = &source.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() as u32 + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    Position {
        line,
        column: (offset - line_start) as u32 + 1,
    }
}

// ---------------------------------------------------------------------------
// Reporter trait and the two shipped policies
// ---------------------------------------------------------------------------

/// The checker's seam to the outside world.
pub trait ErrorReporter {
    /// Record one diagnostic. `Err(Aborted)` tells the checker to stop
    /// the remaining traversal.
    fn report(
        &mut self,
        message: String,
        range: SourceRange,
        suggestions: Vec<Suggestion>,
    ) -> Result<(), Aborted>;

    /// Whether any diagnostic has been reported so far.
    fn has_errors(&self) -> bool;

    /// Map a byte offset to a line/column position for message formatting.
    fn to_position(&self, offset: u32) -> Position;

    /// The full source text (used by textual auto-fix heuristics).
    fn source(&self) -> &str;
}

/// Accumulates every diagnostic and lets the check run to completion.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    source: String,
    diagnostics: Vec<Diagnostic>,
}

impl CollectingReporter {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            diagnostics: Vec::new(),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(
        &mut self,
        message: String,
        range: SourceRange,
        suggestions: Vec<Suggestion>,
    ) -> Result<(), Aborted> {
        self.diagnostics.push(Diagnostic {
            message,
            range,
            suggestions,
        });
        Ok(())
    }

    fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    fn to_position(&self, offset: u32) -> Position {
        position_at(&self.source, offset)
    }

    fn source(&self) -> &str {
        &self.source
    }
}

/// Keeps only the first diagnostic and aborts the check immediately.
#[derive(Debug, Default)]
pub struct FailFastReporter {
    source: String,
    first: Option<Diagnostic>,
}

impl FailFastReporter {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            first: None,
        }
    }

    pub fn first(&self) -> Option<&Diagnostic> {
        self.first.as_ref()
    }
}

impl ErrorReporter for FailFastReporter {
    fn report(
        &mut self,
        message: String,
        range: SourceRange,
        suggestions: Vec<Suggestion>,
    ) -> Result<(), Aborted> {
        if self.first.is_none() {
            self.first = Some(Diagnostic {
                message,
                range,
                suggestions,
            });
        }
        Err(Aborted)
    }

    fn has_errors(&self) -> bool {
        self.first.is_some()
    }

    fn to_position(&self, offset: u32) -> Position {
        position_at(&self.source, offset)
    }

    fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_mapping() {
        let src = "type Storage {\n  a: number\n}\n";
        assert_eq!(position_at(src, 0), Position { line: 1, column: 1 });
        assert_eq!(position_at(src, 5), Position { line: 1, column: 6 });
        // First char after the first newline.
        assert_eq!(position_at(src, 15), Position { line: 2, column: 1 });
        // Past-the-end offsets clamp.
        assert_eq!(position_at(src, 9999), Position { line: 4, column: 1 });
    }

    #[test]
    fn position_on_empty_source() {
        assert_eq!(position_at("", 10), Position { line: 1, column: 1 });
    }

    #[test]
    fn collecting_reporter_accumulates() {
        let mut reporter = CollectingReporter::new("x");
        assert!(!reporter.has_errors());
        reporter
            .report("first".into(), SourceRange::new(0, 1), vec![])
            .unwrap();
        reporter
            .report("second".into(), SourceRange::new(0, 1), vec![])
            .unwrap();
        assert!(reporter.has_errors());
        assert_eq!(reporter.diagnostics().len(), 2);
    }

    #[test]
    fn fail_fast_reporter_aborts_and_keeps_first() {
        let mut reporter = FailFastReporter::new("x");
        let err = reporter.report("first".into(), SourceRange::new(0, 1), vec![]);
        assert_eq!(err, Err(Aborted));
        let err = reporter.report("second".into(), SourceRange::new(2, 3), vec![]);
        assert_eq!(err, Err(Aborted));
        assert_eq!(reporter.first().unwrap().message, "first");
    }

    #[test]
    fn suggestion_json_shape() {
        let replace = Suggestion::Replace {
            name: "LiveObject<Foo>".into(),
        };
        assert_eq!(
            serde_json::to_value(&replace).unwrap(),
            serde_json::json!({ "type": "replace", "name": "LiveObject<Foo>" })
        );

        let add = Suggestion::AddObjectTypeDef {
            name: "Storage".into(),
        };
        assert_eq!(
            serde_json::to_value(&add).unwrap(),
            serde_json::json!({ "type": "add-object-type-def", "name": "Storage" })
        );
    }
}

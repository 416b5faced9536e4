//! Warnings collected while analyzing a document.
//!
//! Problems that make the structure unusable are returned as
//! [`crate::HumdrumError`]. Everything else (an unmatched strophe marker, a
//! duplicate parameter key, a spine that never terminates) is recorded here
//! and analysis continues.

use serde::Serialize;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One reported problem at a document location.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line number
    pub line: usize,
    /// 0-based field index, when the problem belongs to one token
    pub field: Option<usize>,
    pub severity: Severity,
    /// Kind identifier (e.g., "unterminated_strophe", "duplicate_parameter")
    pub kind: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        line: usize,
        severity: Severity,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            line,
            field: None,
            severity,
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn warning(line: usize, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(line, Severity::Warning, kind, message)
    }

    pub fn with_field(mut self, field: usize) -> Self {
        self.field = Some(field);
        self
    }
}

/// Collection of diagnostics for one document.
#[derive(Serialize, Clone, Debug, Default)]
pub struct Diagnostics {
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Record a diagnostic and forward it to the `log` facade.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => log::error!("line {}: {}", diagnostic.line, diagnostic.message),
            Severity::Warning => log::warn!("line {}: {}", diagnostic.line, diagnostic.message),
            Severity::Info => log::info!("line {}: {}", diagnostic.line, diagnostic.message),
        }
        self.items.push(diagnostic);
    }

    pub fn warn(&mut self, line: usize, kind: &str, message: impl Into<String>) {
        self.add(Diagnostic::warning(line, kind, message));
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// Diagnostics of one kind.
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.items.iter().filter(move |d| d.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Drop diagnostics of the given kinds (used when a pass is re-run).
    pub(crate) fn retain_except(&mut self, kinds: &[&str]) {
        self.items.retain(|d| !kinds.contains(&d.kind.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_creation() {
        let d = Diagnostic::warning(4, "duplicate_parameter", "LO:N:vis already set").with_field(1);
        assert_eq!(d.line, 4);
        assert_eq!(d.field, Some(1));
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.kind, "duplicate_parameter");
    }

    #[test]
    fn test_collection_queries() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        diagnostics.warn(2, "unterminated_strophe", "no closing *Xstrophe");
        diagnostics.add(Diagnostic::new(5, Severity::Info, "note", "fyi"));
        assert_eq!(diagnostics.len(), 2);
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.warnings().count(), 1);
        assert_eq!(diagnostics.of_kind("note").count(), 1);

        diagnostics.retain_except(&["note"]);
        assert_eq!(diagnostics.len(), 1);
    }
}

//! Collected diagnostics from one compilation.

use crate::{Diagnostic, Severity};

/// Every diagnostic found while compiling one template, errors and warnings
/// alike, in the order they were reported.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Problems {
    diagnostics: Vec<Diagnostic>,
}

impl Problems {
    pub fn new() -> Self {
        Problems::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    /// Sort by primary span start; diagnostics without a span go last.
    pub fn sort_by_position(&mut self) {
        self.diagnostics
            .sort_by_key(|d| d.primary_span().map_or(u32::MAX, |span| span.start));
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl IntoIterator for Problems {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

impl<'a> IntoIterator for &'a Problems {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

impl From<Diagnostic> for Problems {
    fn from(diagnostic: Diagnostic) -> Self {
        Problems {
            diagnostics: vec![diagnostic],
        }
    }
}

#[cfg(test)]
mod tests {
    use quill_ir::Span;

    use super::*;
    use crate::ErrorCode;

    #[test]
    fn counts_by_severity() {
        let mut problems = Problems::new();
        problems.push(Diagnostic::error(ErrorCode::E2001).with_label(Span::new(20, 21), ""));
        problems.push(Diagnostic::warning(ErrorCode::W2001).with_label(Span::new(5, 6), ""));
        problems.push(Diagnostic::error(ErrorCode::E2003).with_label(Span::new(1, 2), ""));

        assert!(problems.has_errors());
        assert_eq!(problems.error_count(), 2);
        assert_eq!(problems.warning_count(), 1);
        assert_eq!(problems.len(), 3);
    }

    #[test]
    fn warnings_alone_are_not_errors() {
        let problems = Problems::from(Diagnostic::warning(ErrorCode::W2001));
        assert!(!problems.has_errors());
        assert!(!problems.is_empty());
    }

    #[test]
    fn sorts_by_primary_span() {
        let mut problems = Problems::new();
        problems.push(Diagnostic::error(ErrorCode::E9001));
        problems.push(Diagnostic::error(ErrorCode::E2001).with_label(Span::new(30, 31), ""));
        problems.push(Diagnostic::error(ErrorCode::E2003).with_label(Span::new(3, 4), ""));
        problems.sort_by_position();

        let codes: Vec<ErrorCode> = problems.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![ErrorCode::E2003, ErrorCode::E2001, ErrorCode::E9001]);
    }
}

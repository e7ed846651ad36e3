//! Errors reported to the host.
//!
//! Cache failures and evaluation failures both become a [`RenderError`]
//! carrying the template name and a 1-based line and column when the
//! failure points into source text.

use std::fmt;
use std::sync::Arc;

use quill_cache::{CacheError, CacheErrorKind};
use quill_diagnostic::emitter::{ColorMode, SourceFile, TerminalEmitter};
use quill_diagnostic::span_utils::LineOffsetTable;
use quill_diagnostic::{Diagnostic, ErrorCode};
use quill_ir::Span;
use quill_value::{EvalBacktrace, EvalError, EvalErrorKind, HostError};

#[derive(Clone, Debug, PartialEq)]
pub enum RenderErrorKind {
    /// The template does not exist.
    NotFound,
    /// The loader could not read it.
    Load,
    /// Malformed source.
    Syntax,
    /// Well-formed source that failed validation.
    Invalid,
    /// Rendering stopped with this error.
    Evaluation(EvalErrorKind),
    /// The data model could not be turned into template values.
    DataModel,
}

#[derive(Clone, Debug)]
pub struct RenderError {
    pub kind: RenderErrorKind,
    pub message: String,
    /// Template the location points into.
    pub template: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Every problem behind a syntax or validation failure.
    pub diagnostics: Vec<Diagnostic>,
    /// Macro calls active when an evaluation error was raised.
    pub backtrace: Option<EvalBacktrace>,
    source: Option<Arc<str>>,
}

impl RenderError {
    #[cold]
    fn new(kind: RenderErrorKind, message: String) -> Self {
        RenderError {
            kind,
            message,
            template: None,
            line: None,
            column: None,
            diagnostics: Vec::new(),
            backtrace: None,
            source: None,
        }
    }

    fn located(mut self, template: &str, source: Option<Arc<str>>, span: Option<Span>) -> Self {
        self.template = Some(template.to_owned());
        if let (Some(source), Some(span)) = (&source, span) {
            let at = LineOffsetTable::build(source).locate(source, span);
            self.line = Some(at.line);
            self.column = Some(at.column);
        }
        self.source = source;
        self
    }

    /// Code of the underlying evaluation error or first diagnostic.
    pub fn code(&self) -> Option<ErrorCode> {
        match &self.kind {
            RenderErrorKind::Evaluation(kind) => Some(kind.code()),
            _ => self.diagnostics.first().map(|diagnostic| diagnostic.code),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == RenderErrorKind::NotFound
    }

    /// The error formatted for a terminal: each diagnostic with its source
    /// snippet, or the located message followed by the macro backtrace.
    pub fn report(&self, colors: ColorMode) -> String {
        if let (Some(name), Some(text)) = (&self.template, &self.source) {
            if !self.diagnostics.is_empty() {
                let mut emitter = TerminalEmitter::with_color_mode(Vec::new(), colors, false);
                if emitter
                    .emit_all(SourceFile { name, text }, &self.diagnostics)
                    .is_ok()
                {
                    return String::from_utf8_lossy(&emitter.into_inner()).into_owned();
                }
            }
        }
        let mut report = format!("{self}\n");
        if let Some(backtrace) = &self.backtrace {
            report.push_str(&backtrace.to_string());
        }
        report
    }
}

impl From<CacheError> for RenderError {
    fn from(err: CacheError) -> Self {
        let kind = match err.kind() {
            CacheErrorKind::NotFound => RenderErrorKind::NotFound,
            CacheErrorKind::Load(_) => RenderErrorKind::Load,
            CacheErrorKind::Parse(_) => RenderErrorKind::Syntax,
            CacheErrorKind::Invalid(_) => RenderErrorKind::Invalid,
        };
        let diagnostics = err.diagnostics().to_vec();
        let span = diagnostics.first().and_then(Diagnostic::primary_span);
        let mut error = RenderError::new(kind, err.to_string()).located(
            err.name(),
            err.source_text().map(Arc::from),
            span,
        );
        error.diagnostics = diagnostics;
        error
    }
}

impl From<EvalError> for RenderError {
    fn from(err: EvalError) -> Self {
        let EvalError {
            kind,
            message,
            span,
            origin,
            backtrace,
        } = err;
        let mut error = RenderError::new(RenderErrorKind::Evaluation(kind), message);
        if let Some(origin) = origin {
            error = error.located(&origin.name, Some(origin.source), span);
        }
        error.backtrace = backtrace;
        error
    }
}

impl From<HostError> for RenderError {
    fn from(err: HostError) -> Self {
        RenderError::new(RenderErrorKind::DataModel, err.message().to_owned())
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.template, self.line, self.column) {
            (Some(template), Some(line), Some(column)) => {
                write!(f, "{template}:{line}:{column}: {}", self.message)
            }
            (Some(template), ..) => write!(f, "{template}: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RenderError {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use quill_diagnostic::emitter::ColorMode;
    use quill_value::{division_by_zero, Origin};

    use super::{RenderError, RenderErrorKind};

    #[test]
    fn evaluation_errors_point_at_their_template() {
        let origin = Origin::new(Arc::from("page.ftl"), Arc::from("a\nb ${1/0}"));
        let err = division_by_zero()
            .with_span(quill_ir::Span::new(4, 9))
            .with_origin(&origin);
        let err = RenderError::from(err);
        assert_eq!(err.line, Some(2));
        assert_eq!(err.column, Some(3));
        assert!(err.to_string().starts_with("page.ftl:2:3: "));
        assert!(matches!(err.kind, RenderErrorKind::Evaluation(_)));
    }

    #[test]
    fn reports_without_diagnostics_show_the_located_message() {
        let origin = Origin::new(Arc::from("page.ftl"), Arc::from("${1/0}"));
        let err = RenderError::from(
            division_by_zero()
                .with_span(quill_ir::Span::new(2, 5))
                .with_origin(&origin),
        );
        assert_eq!(err.report(ColorMode::Never), "page.ftl:1:3: division by zero\n");
    }

    #[test]
    fn errors_without_origin_have_no_location() {
        let err = RenderError::from(division_by_zero());
        assert_eq!(err.template, None);
        assert_eq!(err.to_string(), err.message);
    }
}

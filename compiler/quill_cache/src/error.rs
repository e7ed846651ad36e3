//! Cache failures.
//!
//! A [`CacheError`] is stored in the cache and handed out again until the
//! entry is revalidated, so it is shared: clones point at the same error and
//! [`CacheError::same`] tells replays apart from fresh failures.

use std::fmt;
use std::sync::Arc;

use quill_diagnostic::Diagnostic;

use crate::loader::LoadError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheErrorKind {
    /// No localized variant of the name exists.
    NotFound,
    /// The loader failed.
    Load(LoadError),
    /// The source is not a well-formed template.
    Parse(Diagnostic),
    /// The template parsed but failed validation; every error found.
    Invalid(Vec<Diagnostic>),
}

#[derive(Debug)]
struct Inner {
    name: String,
    kind: CacheErrorKind,
    /// Text the diagnostics point into.
    source: Option<Arc<str>>,
}

#[derive(Clone, Debug)]
pub struct CacheError(Arc<Inner>);

impl CacheError {
    #[cold]
    pub fn new(name: &str, kind: CacheErrorKind) -> Self {
        CacheError(Arc::new(Inner {
            name: name.to_owned(),
            kind,
            source: None,
        }))
    }

    /// A parse or validation failure of `source`.
    #[cold]
    pub fn in_source(name: &str, kind: CacheErrorKind, source: Arc<str>) -> Self {
        CacheError(Arc::new(Inner {
            name: name.to_owned(),
            kind,
            source: Some(source),
        }))
    }

    /// Requested template name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> &CacheErrorKind {
        &self.0.kind
    }

    pub fn source_text(&self) -> Option<&str> {
        self.0.source.as_deref()
    }

    /// Diagnostics behind a parse or validation failure.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match &self.0.kind {
            CacheErrorKind::Parse(diagnostic) => std::slice::from_ref(diagnostic),
            CacheErrorKind::Invalid(diagnostics) => diagnostics,
            CacheErrorKind::NotFound | CacheErrorKind::Load(_) => &[],
        }
    }

    /// What went wrong, without the template name.
    pub fn reason(&self) -> String {
        match &self.0.kind {
            CacheErrorKind::NotFound => "not found".to_owned(),
            CacheErrorKind::Load(err) => format!("cannot be loaded: {err}"),
            CacheErrorKind::Parse(diagnostic) => format!("has a syntax error: {}", diagnostic.message),
            CacheErrorKind::Invalid(diagnostics) => {
                let mut reason = "is invalid".to_owned();
                if let Some(first) = diagnostics.first() {
                    reason.push_str(": ");
                    reason.push_str(&first.message);
                }
                if diagnostics.len() > 1 {
                    reason.push_str(&format!(" (and {} more)", diagnostics.len() - 1));
                }
                reason
            }
        }
    }

    /// True if both are the same cached failure.
    pub fn same(&self, other: &CacheError) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template `{}` {}", self.0.name, self.reason())
    }
}

impl std::error::Error for CacheError {}

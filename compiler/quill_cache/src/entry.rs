use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use quill_check::ValidatedTemplate;
use quill_ir::Locale;

use crate::error::CacheError;
use crate::loader::{Revision, SourceHandle};

/// Requested name and locale. Without localized lookup the locale is
/// always [`Locale::ROOT`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub name: Arc<str>,
    pub locale: Locale,
}

impl CacheKey {
    pub fn new(name: &str, locale: Locale) -> Self {
        CacheKey {
            name: Arc::from(name),
            locale,
        }
    }
}

/// Outcome of one load, successful or not.
pub type CacheResult = Result<Arc<ValidatedTemplate>, CacheError>;

/// A cached load result and when its source was last checked.
///
/// Entries are replaced, never mutated, apart from the last-use stamp,
/// which readers bump without locking.
#[derive(Debug)]
pub struct CacheEntry {
    pub(crate) result: CacheResult,
    /// Source the result came from and its revision at the time;
    /// `None` when nothing was found.
    pub(crate) source: Option<(SourceHandle, Revision)>,
    pub(crate) checked_at: Instant,
    /// Nanoseconds from `checked_at` to the latest use.
    last_used: AtomicU64,
}

impl CacheEntry {
    pub(crate) fn new(
        result: CacheResult,
        source: Option<(SourceHandle, Revision)>,
        now: Instant,
    ) -> Self {
        CacheEntry {
            result,
            source,
            checked_at: now,
            last_used: AtomicU64::new(0),
        }
    }

    /// Same result and source, checked again at `now`.
    pub(crate) fn rechecked(&self, now: Instant) -> Self {
        CacheEntry::new(self.result.clone(), self.source.clone(), now)
    }

    pub fn result(&self) -> &CacheResult {
        &self.result
    }

    pub fn source(&self) -> Option<&SourceHandle> {
        self.source.as_ref().map(|(handle, _)| handle)
    }

    pub fn checked_at(&self) -> Instant {
        self.checked_at
    }

    pub fn last_used(&self) -> Instant {
        self.checked_at + Duration::from_nanos(self.last_used.load(Ordering::Relaxed))
    }

    pub(crate) fn touch(&self, now: Instant) {
        let since = now.saturating_duration_since(self.checked_at).as_nanos();
        let since = u64::try_from(since).unwrap_or(u64::MAX);
        self.last_used.fetch_max(since, Ordering::Relaxed);
    }
}

//! Read-through template cache with delayed revalidation.
//!
//! A lookup returns the stored result, success or failure, while it is
//! younger than the update delay. Once the delay has passed, the loader is
//! asked which source the name resolves to and at which revision; a source
//! that has not changed keeps its result, anything else is read, parsed and
//! validated again. Failures are stored like successes, so a missing or
//! broken template costs one load per delay window, not one per lookup.
//!
//! Fresh hits take no lock beyond the storage's own. Revalidation of one
//! key holds that key's lock, and the storage only ever sees complete
//! entries. A key's lock lives only while some thread is revalidating it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use quill_check::{validate, CheckOptions};
use quill_ir::{localized_names, Locale, SharedInterner};
use quill_parse::parse_template;
use rustc_hash::FxBuildHasher;

use crate::clock::{Clock, SystemClock};
use crate::entry::{CacheEntry, CacheKey, CacheResult};
use crate::error::{CacheError, CacheErrorKind};
use crate::loader::{LoadError, SourceHandle, TemplateLoader};
use crate::storage::{CacheStorage, StrongStorage};

/// How long a cached result is served before its source is checked again.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpdateDelay {
    /// Check once this much time has passed; zero checks on every lookup.
    After(Duration),
    /// Never check again once loaded.
    Never,
}

impl UpdateDelay {
    pub const DEFAULT: UpdateDelay = UpdateDelay::After(Duration::from_secs(5));

    fn is_fresh(self, checked_at: Instant, now: Instant) -> bool {
        match self {
            UpdateDelay::After(delay) => now.saturating_duration_since(checked_at) < delay,
            UpdateDelay::Never => true,
        }
    }
}

impl Default for UpdateDelay {
    fn default() -> Self {
        Self::DEFAULT
    }
}

pub struct TemplateCache {
    loader: Arc<dyn TemplateLoader>,
    storage: Arc<dyn CacheStorage>,
    clock: Arc<dyn Clock>,
    interner: SharedInterner,
    check_options: CheckOptions,
    delay: UpdateDelay,
    localized_lookup: bool,
    /// Locks of keys being revalidated right now.
    revalidating: DashMap<CacheKey, Arc<Mutex<()>>, FxBuildHasher>,
}

impl TemplateCache {
    pub fn builder(loader: impl TemplateLoader + 'static) -> TemplateCacheBuilder {
        TemplateCacheBuilder::new(Arc::new(loader))
    }

    /// The validated template `name` for `locale`, or the failure cached
    /// for it.
    pub fn get(&self, name: &str, locale: &Locale) -> CacheResult {
        let key = self.key(name, locale);
        if let Some(result) = self.fresh(&key, self.clock.now()) {
            return result;
        }

        let lock = self.lock_for(&key);
        let result = {
            let _guard = lock.lock();
            self.revalidate_locked(&key)
        };
        drop(lock);
        self.release_lock(&key);
        result
    }

    fn revalidate_locked(&self, key: &CacheKey) -> CacheResult {
        // Another thread may have revalidated while this one waited.
        let now = self.clock.now();
        if let Some(result) = self.fresh(key, now) {
            return result;
        }
        let current = self.storage.get(key);
        let entry = Arc::new(self.revalidate(key, current.as_deref(), now));
        let result = entry.result.clone();
        self.storage.put(key.clone(), entry);
        result
    }

    /// Forget `name` under `locale`; the next lookup loads it again.
    pub fn remove(&self, name: &str, locale: &Locale) {
        let key = self.key(name, locale);
        self.storage.remove(&key);
    }

    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Drop entries nobody looked up for `max_idle`; returns how many went.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let Some(cutoff) = self.clock.now().checked_sub(max_idle) else {
            return 0;
        };
        let evicted = self.storage.evict_unused_since(cutoff);
        if evicted > 0 {
            tracing::debug!(evicted, "evicted idle templates");
        }
        evicted
    }

    /// Number of cached results, failures included.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn delay(&self) -> UpdateDelay {
        self.delay
    }

    pub fn localized_lookup(&self) -> bool {
        self.localized_lookup
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn check_options(&self) -> &CheckOptions {
        &self.check_options
    }

    fn key(&self, name: &str, locale: &Locale) -> CacheKey {
        let locale = if self.localized_lookup {
            locale.clone()
        } else {
            Locale::ROOT
        };
        CacheKey::new(name, locale)
    }

    fn fresh(&self, key: &CacheKey, now: Instant) -> Option<CacheResult> {
        let entry = self.storage.get(key)?;
        if !self.delay.is_fresh(entry.checked_at, now) {
            return None;
        }
        entry.touch(now);
        match &entry.result {
            Ok(_) => tracing::trace!(template = %key.name, "cache hit"),
            Err(err) => tracing::debug!(template = %key.name, error = %err, "replaying cached failure"),
        }
        Some(entry.result.clone())
    }

    fn lock_for(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        Arc::clone(self.revalidating.entry(key.clone()).or_default().value())
    }

    /// Drop the key's lock once no other thread holds or waits on it.
    fn release_lock(&self, key: &CacheKey) {
        self.revalidating
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[tracing::instrument(level = "debug", skip_all, fields(template = %key.name, locale = %key.locale))]
    fn revalidate(&self, key: &CacheKey, current: Option<&CacheEntry>, now: Instant) -> CacheEntry {
        let failed = |kind| CacheEntry::new(Err(CacheError::new(&key.name, kind)), None, now);

        let source = match self.find(key) {
            Ok(Some(source)) => source,
            Ok(None) => {
                tracing::debug!("template not found");
                return failed(CacheErrorKind::NotFound);
            }
            Err(err) => return failed(CacheErrorKind::Load(err)),
        };
        let revision = match self.loader.last_modified(&source) {
            Ok(revision) => revision,
            Err(err) => return failed(CacheErrorKind::Load(err)),
        };
        if let Some(current) = current {
            if current
                .source
                .as_ref()
                .is_some_and(|(handle, seen)| *handle == source && *seen == revision)
            {
                tracing::trace!("source unchanged");
                return current.rechecked(now);
            }
        }

        let text = match self.loader.read_source(&source) {
            Ok(text) => text,
            Err(err) => return failed(CacheErrorKind::Load(err)),
        };
        tracing::debug!(source = %source, revision = revision.raw(), "compiling template");
        let result = self.compile(&key.name, &text);
        CacheEntry::new(result, Some((source, revision)), now)
    }

    /// First localized variant of the key's name the loader has.
    fn find(&self, key: &CacheKey) -> Result<Option<SourceHandle>, LoadError> {
        for candidate in localized_names(&key.name, &key.locale) {
            if let Some(source) = self.loader.find_source(&candidate)? {
                return Ok(Some(source));
            }
        }
        Ok(None)
    }

    fn compile(&self, name: &str, text: &str) -> CacheResult {
        let template = parse_template(text, name, &self.interner).map_err(|diagnostic| {
            CacheError::in_source(name, CacheErrorKind::Parse(diagnostic), Arc::from(text))
        })?;
        let source = Arc::clone(&template.source);
        let validated = validate(template, &self.check_options, &self.interner).map_err(|problems| {
            let errors = problems.errors().cloned().collect();
            CacheError::in_source(name, CacheErrorKind::Invalid(errors), source)
        })?;
        Ok(Arc::new(validated))
    }
}

impl std::fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCache")
            .field("entries", &self.storage.len())
            .field("delay", &self.delay)
            .field("localized_lookup", &self.localized_lookup)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TemplateCache`].
pub struct TemplateCacheBuilder {
    loader: Arc<dyn TemplateLoader>,
    storage: Option<Arc<dyn CacheStorage>>,
    clock: Option<Arc<dyn Clock>>,
    interner: Option<SharedInterner>,
    check_options: CheckOptions,
    delay: UpdateDelay,
    localized_lookup: bool,
}

impl TemplateCacheBuilder {
    pub fn new(loader: Arc<dyn TemplateLoader>) -> Self {
        TemplateCacheBuilder {
            loader,
            storage: None,
            clock: None,
            interner: None,
            check_options: CheckOptions::default(),
            delay: UpdateDelay::DEFAULT,
            localized_lookup: true,
        }
    }

    /// Storage policy; [`StrongStorage`] if not set.
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Interner shared with the renders that use the cached templates.
    #[must_use]
    pub fn interner(mut self, interner: SharedInterner) -> Self {
        self.interner = Some(interner);
        self
    }

    #[must_use]
    pub fn check_options(mut self, options: CheckOptions) -> Self {
        self.check_options = options;
        self
    }

    #[must_use]
    pub fn delay(mut self, delay: UpdateDelay) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn localized_lookup(mut self, enabled: bool) -> Self {
        self.localized_lookup = enabled;
        self
    }

    pub fn build(self) -> TemplateCache {
        TemplateCache {
            loader: self.loader,
            storage: self
                .storage
                .unwrap_or_else(|| Arc::new(StrongStorage::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            interner: self.interner.unwrap_or_default(),
            check_options: self.check_options,
            delay: self.delay,
            localized_lookup: self.localized_lookup,
            revalidating: DashMap::default(),
        }
    }
}

//! Template sources.
//!
//! The cache never reads templates itself. A [`TemplateLoader`] finds a
//! source by name, reports a [`Revision`] the cache compares to decide
//! whether a cached compilation is stale, and reads the text.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Failure reported by a loader.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LoadError {
    message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        LoadError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::new(err.to_string())
    }
}

/// A source a loader found, identified by the name it was found under.
///
/// With localized lookup this is the localized name (`page_de.ftl`), not
/// the requested one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceHandle {
    name: Arc<str>,
}

impl SourceHandle {
    pub fn new(name: &str) -> Self {
        SourceHandle {
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Change marker of a source. Equal revisions mean unchanged content.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision(u64);

impl Revision {
    pub const fn new(raw: u64) -> Self {
        Revision(raw)
    }

    /// Revision from a modification time, in nanoseconds since the epoch.
    pub fn from_system_time(time: SystemTime) -> Self {
        let nanos = time
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_nanos());
        Revision(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Where template text comes from.
///
/// Called only by the cache, possibly from several threads at once.
pub trait TemplateLoader: Send + Sync {
    /// Look `name` up; `Ok(None)` when there is no such source.
    fn find_source(&self, name: &str) -> Result<Option<SourceHandle>, LoadError>;

    fn last_modified(&self, source: &SourceHandle) -> Result<Revision, LoadError>;

    fn read_source(&self, source: &SourceHandle) -> Result<String, LoadError>;
}

impl<L: TemplateLoader + ?Sized> TemplateLoader for Arc<L> {
    fn find_source(&self, name: &str) -> Result<Option<SourceHandle>, LoadError> {
        (**self).find_source(name)
    }

    fn last_modified(&self, source: &SourceHandle) -> Result<Revision, LoadError> {
        (**self).last_modified(source)
    }

    fn read_source(&self, source: &SourceHandle) -> Result<String, LoadError> {
        (**self).read_source(source)
    }
}

struct MemorySource {
    text: Arc<str>,
    revision: Revision,
}

/// Templates held in memory. Every [`put`](MemoryLoader::put) bumps the
/// revision of that template.
#[derive(Default)]
pub struct MemoryLoader {
    sources: RwLock<FxHashMap<String, MemorySource>>,
    counter: AtomicU64,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`put`](MemoryLoader::put).
    #[must_use]
    pub fn with(self, name: &str, text: &str) -> Self {
        self.put(name, text);
        self
    }

    pub fn put(&self, name: &str, text: &str) {
        let revision = Revision(self.counter.fetch_add(1, Ordering::Relaxed) + 1);
        self.sources.write().insert(
            name.to_owned(),
            MemorySource {
                text: Arc::from(text),
                revision,
            },
        );
    }

    pub fn remove(&self, name: &str) -> bool {
        self.sources.write().remove(name).is_some()
    }

    fn missing(source: &SourceHandle) -> LoadError {
        LoadError::new(format!("`{source}` was removed"))
    }
}

impl TemplateLoader for MemoryLoader {
    fn find_source(&self, name: &str) -> Result<Option<SourceHandle>, LoadError> {
        Ok(self
            .sources
            .read()
            .contains_key(name)
            .then(|| SourceHandle::new(name)))
    }

    fn last_modified(&self, source: &SourceHandle) -> Result<Revision, LoadError> {
        self.sources
            .read()
            .get(source.name())
            .map(|s| s.revision)
            .ok_or_else(|| Self::missing(source))
    }

    fn read_source(&self, source: &SourceHandle) -> Result<String, LoadError> {
        self.sources
            .read()
            .get(source.name())
            .map(|s| s.text.to_string())
            .ok_or_else(|| Self::missing(source))
    }
}

/// Templates under a directory, read as UTF-8.
///
/// Names are `/`-separated and relative to the root; names that would leave
/// the root are never found.
#[derive(Clone, Debug)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileLoader { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
            .then(|| self.root.join(relative))
    }

    fn existing_path(&self, source: &SourceHandle) -> Result<PathBuf, LoadError> {
        self.path(source.name())
            .ok_or_else(|| LoadError::new(format!("`{source}` is outside the template root")))
    }
}

impl TemplateLoader for FileLoader {
    fn find_source(&self, name: &str) -> Result<Option<SourceHandle>, LoadError> {
        let Some(path) = self.path(name) else {
            return Ok(None);
        };
        match std::fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => Ok(Some(SourceHandle::new(name))),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn last_modified(&self, source: &SourceHandle) -> Result<Revision, LoadError> {
        let path = self.existing_path(source)?;
        let modified = std::fs::metadata(path)?.modified()?;
        Ok(Revision::from_system_time(modified))
    }

    fn read_source(&self, source: &SourceHandle) -> Result<String, LoadError> {
        let path = self.existing_path(source)?;
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests;

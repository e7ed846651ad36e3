//! Template cache for Quill.
//!
//! Mediates between a [`TemplateLoader`] and the renders that need
//! validated templates:
//!
//! ```text
//! get(name, locale)
//!   -> fresh entry?            return it (success or cached failure)
//!   -> find localized source   page_de_AT.ftl, page_de.ftl, page.ftl
//!   -> same source + revision? keep result, restart the delay
//!   -> read, parse, validate   store the template or the failure
//! ```
//!
//! Storage is pluggable ([`StrongStorage`], [`MruStorage`]) and so is the
//! clock, so revalidation can be driven deterministically in tests.

mod cache;
mod clock;
mod entry;
mod error;
mod loader;
mod storage;

pub use cache::{TemplateCache, TemplateCacheBuilder, UpdateDelay};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, CacheKey, CacheResult};
pub use error::{CacheError, CacheErrorKind};
pub use loader::{FileLoader, LoadError, MemoryLoader, Revision, SourceHandle, TemplateLoader};
pub use storage::{CacheStorage, MruStorage, StrongStorage};

//! Quill, a template engine with square-bracket directive syntax.
//!
//! ```text
//! [#macro greet name]Hello, ${name}![/#macro]
//! [#list users as user][@greet name=user.name/][/#list]
//! ```
//!
//! An [`Engine`] owns a [`Configuration`] and a template cache. Templates
//! come from a [`TemplateLoader`], are parsed and validated once, and are
//! shared by every render until their source changes.
//!
//! ```ignore
//! let engine = Engine::new(
//!     Configuration::builder()
//!         .loader(FileLoader::new("templates"))
//!         .build(),
//! );
//! let page = engine.render_to_string("index.ftl", &data)?;
//! ```
//!
//! # Tracing
//!
//! Call [`init_tracing`] and set `RUST_LOG=quill=debug` (or
//! `quill_cache=trace`, `quill_eval=debug`) to see cache activity and
//! render spans.

mod config;
mod engine;
mod error;

use std::sync::Once;

pub use config::{ConfigError, Configuration, ConfigurationBuilder, Settings};
pub use engine::{Engine, RenderOptions};
pub use error::{RenderError, RenderErrorKind};

pub use quill_cache::{
    CacheStorage, Clock, FileLoader, LoadError, ManualClock, MemoryLoader, MruStorage, Revision,
    SourceHandle, StrongStorage, SystemClock, TemplateCache, TemplateLoader, UpdateDelay,
};
pub use quill_check::{CheckOptions, ValidatedTemplate};
pub use quill_diagnostic::emitter::ColorMode;
pub use quill_diagnostic::{Diagnostic, ErrorCode};
pub use quill_eval::{OutputSink, WriterSink};
pub use quill_ir::Locale;
pub use quill_value::{
    Capabilities, DefaultObjectWrapper, EvalError, EvalErrorKind, HashValue, HostError,
    HostFunction, HostValue, NodeTree, NodeTreeBuilder, ObjectAdapter, ObjectWrapper, Value,
};

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber for debug output.
///
/// Does nothing unless `RUST_LOG` is set. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            // A host may already have installed its own subscriber.
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}

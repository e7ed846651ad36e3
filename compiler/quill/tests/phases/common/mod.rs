//! Shared test utilities for phase tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use quill::{
    Configuration, ConfigurationBuilder, Engine, HashValue, MemoryLoader, RenderError,
    RenderOptions,
};

/// Engine over in-memory templates with default settings.
pub fn engine(templates: &[(&str, &str)]) -> Engine {
    engine_with(Configuration::builder(), templates)
}

/// Engine over in-memory templates, starting from `builder`.
pub fn engine_with(builder: ConfigurationBuilder, templates: &[(&str, &str)]) -> Engine {
    Engine::new(builder.loader(memory(templates)).build())
}

pub fn memory(templates: &[(&str, &str)]) -> Arc<MemoryLoader> {
    let loader = MemoryLoader::new();
    for (name, source) in templates {
        loader.put(name, source);
    }
    Arc::new(loader)
}

/// 2024-03-01 12:30:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
}

/// Render `name` with an empty data model, expecting failure; returns what
/// reached the sink and the error.
pub fn render_err(engine: &Engine, name: &str) -> (String, RenderError) {
    let mut out = String::new();
    match engine.render_with(name, &HashValue::new(), &mut out, &RenderOptions::default()) {
        Ok(()) => panic!("render of {name} succeeded with {out:?}"),
        Err(err) => (out, err),
    }
}

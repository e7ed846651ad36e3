//! Loading and revalidation as seen through the engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use quill::{
    Configuration, Engine, FileLoader, LoadError, Locale, ManualClock, MruStorage,
    RenderErrorKind, Revision, SourceHandle, TemplateLoader, UpdateDelay,
};
use serde_json::json;

use crate::common::{engine_with, memory, render_err};

const DELAY: Duration = Duration::from_secs(5);

/// A loader whose every call fails, counting lookups.
#[derive(Default)]
struct Unreachable {
    lookups: AtomicUsize,
}

impl TemplateLoader for Unreachable {
    fn find_source(&self, _name: &str) -> Result<Option<SourceHandle>, LoadError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Err(LoadError::new("storage offline"))
    }

    fn last_modified(&self, _source: &SourceHandle) -> Result<Revision, LoadError> {
        Err(LoadError::new("storage offline"))
    }

    fn read_source(&self, _source: &SourceHandle) -> Result<String, LoadError> {
        Err(LoadError::new("storage offline"))
    }
}

fn clocked(clock: &Arc<ManualClock>) -> quill::ConfigurationBuilder {
    Configuration::builder()
        .clock(clock.clone())
        .update_delay(UpdateDelay::After(DELAY))
}

#[test]
fn failing_loader_is_asked_once_per_delay() {
    let loader = Arc::new(Unreachable::default());
    let clock = Arc::new(ManualClock::new());
    let engine = Engine::new(clocked(&clock).loader(loader.clone()).build());

    for _ in 0..5 {
        let (_, err) = render_err(&engine, "t.ftl");
        assert_eq!(err.kind, RenderErrorKind::Load);
        assert_eq!(err.message, "template `t.ftl` cannot be loaded: storage offline");
        clock.advance(Duration::from_millis(500));
    }
    assert_eq!(loader.lookups.load(Ordering::SeqCst), 1);

    clock.advance(DELAY);
    render_err(&engine, "t.ftl");
    assert_eq!(loader.lookups.load(Ordering::SeqCst), 2);
}

#[test]
fn changed_template_is_picked_up_after_the_delay() {
    let loader = memory(&[("t.ftl", "v1")]);
    let clock = Arc::new(ManualClock::new());
    let engine = Engine::new(clocked(&clock).loader(loader.clone()).build());

    let first = engine.template("t.ftl", &Locale::ROOT).unwrap();
    loader.put("t.ftl", "v2");
    clock.advance(DELAY / 2);
    let same = engine.template("t.ftl", &Locale::ROOT).unwrap();
    assert!(Arc::ptr_eq(&first, &same));
    assert_eq!(engine.render_to_string("t.ftl", &json!({})).unwrap(), "v1");

    clock.advance(DELAY);
    let fresh = engine.template("t.ftl", &Locale::ROOT).unwrap();
    assert!(!Arc::ptr_eq(&first, &fresh));
    assert_eq!(engine.render_to_string("t.ftl", &json!({})).unwrap(), "v2");
}

#[test]
fn fixed_template_replaces_a_cached_syntax_error() {
    let loader = memory(&[("t.ftl", "[#if x]")]);
    let clock = Arc::new(ManualClock::new());
    let engine = Engine::new(clocked(&clock).loader(loader.clone()).build());

    let (_, err) = render_err(&engine, "t.ftl");
    assert_eq!(err.kind, RenderErrorKind::Syntax);

    loader.put("t.ftl", "[#if true]fixed[/#if]");
    let (_, replayed) = render_err(&engine, "t.ftl");
    assert_eq!(replayed.message, err.message);

    clock.advance(DELAY);
    assert_eq!(engine.render_to_string("t.ftl", &json!({})).unwrap(), "fixed");
}

#[test]
fn includes_go_through_the_cache() {
    let engine = engine_with(
        Configuration::builder(),
        &[
            ("main.ftl", "[#include \"part.ftl\"]|[#include \"part.ftl\"]"),
            ("part.ftl", "p"),
        ],
    );

    assert_eq!(engine.render_to_string("main.ftl", &json!({})).unwrap(), "p|p");
    assert_eq!(engine.cache().len(), 2);
}

#[test]
fn localized_variants_follow_the_render_locale() {
    let engine = engine_with(
        Configuration::builder().locale(Locale::new("de", "AT", "")),
        &[
            ("page.ftl", "default"),
            ("page_de.ftl", "deutsch ${.lang}"),
        ],
    );
    assert_eq!(engine.render_to_string("page.ftl", &json!({})).unwrap(), "deutsch de");

    let options = quill::RenderOptions {
        locale: Some(Locale::new("fr", "", "")),
        ..quill::RenderOptions::default()
    };
    let mut out = String::new();
    engine
        .render_with("page.ftl", &quill::HashValue::new(), &mut out, &options)
        .unwrap();
    assert_eq!(out, "default");
}

#[test]
fn localized_lookup_can_be_disabled() {
    let engine = engine_with(
        Configuration::builder()
            .locale(Locale::new("de", "", ""))
            .localized_lookup(false),
        &[("page.ftl", "default"), ("page_de.ftl", "deutsch")],
    );
    assert_eq!(engine.render_to_string("page.ftl", &json!({})).unwrap(), "default");
}

#[test]
fn bounded_cache_keeps_recent_templates() {
    let engine = engine_with(
        Configuration::builder().storage(Arc::new(MruStorage::new(2))),
        &[("a.ftl", "a"), ("b.ftl", "b"), ("c.ftl", "c")],
    );
    for name in ["a.ftl", "b.ftl", "c.ftl"] {
        engine.template(name, &Locale::ROOT).unwrap();
    }
    assert_eq!(engine.cache().len(), 2);
}

#[test]
fn idle_templates_can_be_evicted() {
    let clock = Arc::new(ManualClock::new());
    let engine = engine_with(clocked(&clock), &[("a.ftl", "a"), ("b.ftl", "b")]);

    engine.template("a.ftl", &Locale::ROOT).unwrap();
    clock.advance(Duration::from_secs(120));
    engine.template("b.ftl", &Locale::ROOT).unwrap();

    assert_eq!(engine.cache().evict_idle(Duration::from_secs(60)), 1);
    assert_eq!(engine.cache().len(), 1);
}

#[test]
fn templates_load_from_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("parts")).unwrap();
    std::fs::write(
        dir.path().join("index.ftl"),
        "[#include \"parts/header.ftl\"]body of ${title}",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("parts/header.ftl"),
        "<h1>${title}</h1>[#include \"../secret.ftl\"]",
    )
    .unwrap();
    std::fs::write(dir.path().join("secret.ftl"), "|").unwrap();

    let engine = Engine::new(
        Configuration::builder()
            .loader(FileLoader::new(dir.path()))
            .build(),
    );
    let out = engine.render_to_string("index.ftl", &json!({ "title": "Quill" })).unwrap();
    assert_eq!(out, "<h1>Quill</h1>|body of Quill");

    let (_, err) = render_err(&engine, "../index.ftl");
    assert!(err.is_not_found());
}

#[test]
fn concurrent_renders_share_the_cache() {
    let loader = memory(&[("t.ftl", "${n}")]);
    let engine = Engine::new(Configuration::builder().loader(loader).build());

    let outputs: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let engine = &engine;
                scope.spawn(move || engine.render_to_string("t.ftl", &json!({ "n": n })).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let expected: Vec<String> = (0..8).map(|n| n.to_string()).collect();
    assert_eq!(outputs, expected);
    assert_eq!(engine.cache().len(), 1);
}

//! Builder defaults and settings files.

use std::time::Duration;

use chrono_tz::Tz;
use pretty_assertions::assert_eq;
use quill::{
    Capabilities, ConfigError, Configuration, EvalErrorKind, Locale, RenderErrorKind, Settings,
    UpdateDelay,
};

use crate::common::{engine_with, render_err};

#[test]
fn builder_defaults() {
    let config = Configuration::default();
    assert_eq!(config.update_delay(), UpdateDelay::After(Duration::from_secs(5)));
    assert!(config.localized_lookup());
    assert!(config.check_options().strip_whitespace);
    assert!(!config.check_options().literal_type_check_fatal);
    assert_eq!(config.locale(), &Locale::ROOT);
    assert_eq!(config.time_zone(), Tz::UTC);
    assert_eq!(config.capabilities(), Capabilities::all());
    assert_eq!(config.max_call_depth(), 512);
    assert!(config.shared_variables().is_empty());
}

#[test]
fn settings_apply_on_top_of_the_builder() {
    let settings = Settings::from_json(
        r#"{
            "update_delay_ms": 250,
            "localized_lookup": false,
            "strip_whitespace": false,
            "literal_type_check_fatal": true,
            "locale": "de_AT",
            "time_zone": "Europe/Vienna",
            "capabilities": ["include", "node_visit"],
            "max_call_depth": 64
        }"#,
    )
    .unwrap();
    let config = settings.apply(Configuration::builder()).unwrap().build();

    assert_eq!(config.update_delay(), UpdateDelay::After(Duration::from_millis(250)));
    assert!(!config.localized_lookup());
    assert!(!config.check_options().strip_whitespace);
    assert!(config.check_options().literal_type_check_fatal);
    assert_eq!(config.locale(), &Locale::new("de", "AT", ""));
    assert_eq!(config.time_zone(), Tz::Europe__Vienna);
    assert_eq!(
        config.capabilities(),
        Capabilities::INCLUDE | Capabilities::NODE_VISIT
    );
    assert_eq!(config.max_call_depth(), 64);
}

#[test]
fn unset_settings_keep_builder_values() {
    let settings = Settings::from_json("{}").unwrap();
    assert_eq!(settings, Settings::default());
    let config = settings
        .apply(Configuration::builder().max_call_depth(7))
        .unwrap()
        .build();
    assert_eq!(config.max_call_depth(), 7);
    assert_eq!(config.update_delay(), UpdateDelay::DEFAULT);
}

#[test]
fn negative_delay_caches_forever() {
    let settings = Settings::from_json(r#"{ "update_delay_ms": -1 }"#).unwrap();
    let config = settings.apply(Configuration::builder()).unwrap().build();
    assert_eq!(config.update_delay(), UpdateDelay::Never);
}

#[test]
fn invalid_settings_are_rejected() {
    let unknown_field = Settings::from_json(r#"{ "colour": "blue" }"#).unwrap_err();
    assert!(matches!(unknown_field, ConfigError::Syntax(_)));

    let capability = Settings::from_json(r#"{ "capabilities": ["teleport"] }"#)
        .unwrap()
        .apply(Configuration::builder())
        .unwrap_err();
    assert_eq!(capability.to_string(), "unknown capability `teleport`");

    let zone = Settings::from_json(r#"{ "time_zone": "Mars/Olympus" }"#)
        .unwrap()
        .apply(Configuration::builder())
        .unwrap_err();
    assert_eq!(zone.to_string(), "unknown time zone `Mars/Olympus`");
}

#[test]
fn capabilities_from_settings_restrict_renders() {
    let builder = Settings::from_json(r#"{ "capabilities": ["include"] }"#)
        .unwrap()
        .apply(Configuration::builder())
        .unwrap();
    let engine = engine_with(builder, &[("t.ftl", "[#assign f = \"x\"?interpret][@f/]")]);

    let (_, err) = render_err(&engine, "t.ftl");
    assert_eq!(
        err.kind,
        RenderErrorKind::Evaluation(EvalErrorKind::MissingCapability {
            capability: "interpret"
        })
    );
}

#[test]
fn cache_capacity_bounds_the_cache() {
    let builder = Settings::from_json(r#"{ "cache_capacity": 1 }"#)
        .unwrap()
        .apply(Configuration::builder())
        .unwrap();
    let engine = engine_with(builder, &[("a.ftl", "a"), ("b.ftl", "b")]);
    engine.template("a.ftl", &Locale::ROOT).unwrap();
    engine.template("b.ftl", &Locale::ROOT).unwrap();
    assert_eq!(engine.cache().len(), 1);
}

//! Rendering through the engine: output, error locations and host data.

use std::any::Any;
use std::sync::Arc;

use chrono_tz::Tz;
use pretty_assertions::assert_eq;
use quill::{
    Capabilities, Configuration, DefaultObjectWrapper, EvalErrorKind, HashValue, HostError,
    HostValue, ObjectAdapter, ObjectWrapper, RenderErrorKind, RenderOptions, Value, WriterSink,
};
use serde_json::json;

use crate::common::{engine, engine_with, fixed_now, render_err};

#[test]
fn greet_macro() {
    let engine = engine(&[(
        "greet.ftl",
        "[#macro greet name]Hello, ${name}![/#macro][@greet name=\"World\"/]",
    )]);
    assert_eq!(engine.render_to_string("greet.ftl", &json!({})).unwrap(), "Hello, World!");
}

#[test]
fn serializable_data_models() {
    #[derive(serde::Serialize)]
    struct Page {
        title: String,
        tags: Vec<&'static str>,
    }

    let engine = engine(&[(
        "page.ftl",
        "${title}:[#list tags as tag] ${tag_index}=${tag}[/#list]",
    )]);
    let page = Page {
        title: "Quill".to_owned(),
        tags: vec!["a", "b"],
    };
    assert_eq!(engine.render_to_string("page.ftl", &page).unwrap(), "Quill: 0=a 1=b");
}

#[test]
fn data_models_must_be_maps() {
    let engine = engine(&[("t.ftl", "x")]);
    let err = engine.render_to_string("t.ftl", &[1, 2]).unwrap_err();
    assert_eq!(err.kind, RenderErrorKind::DataModel);
    assert_eq!(err.message, "data model must be a map, got sequence");
}

#[test]
fn undeclared_variable_in_a_macro_is_an_error() {
    let engine = engine(&[("t.ftl", "[#macro m]${x}[/#macro][@m/]")]);
    let (_, err) = render_err(&engine, "t.ftl");
    assert_eq!(
        err.kind,
        RenderErrorKind::Evaluation(EvalErrorKind::UndeclaredVariable {
            name: "x".to_owned()
        })
    );
}

#[test]
fn nested_body_resolves_names_at_the_call_site() {
    let engine = engine(&[(
        "t.ftl",
        "[#macro shadow][#local who = \"callee\"][#nested][/#macro]\
         [#assign who = \"caller\"][@shadow]${who}[/@shadow]",
    )]);
    assert_eq!(engine.render_to_string("t.ftl", &json!({})).unwrap(), "caller");
}

#[test]
fn noescape_inside_identical_escapes() {
    let engine = engine(&[(
        "t.ftl",
        "[#escape x as x?html][#escape x as x?html]${a}[#noescape]${a}[/#noescape][/#escape][/#escape]",
    )]);
    let out = engine.render_to_string("t.ftl", &json!({ "a": "<i>" })).unwrap();
    assert_eq!(out, "&lt;i&gt;<i>");
}

#[test]
fn failures_keep_partial_output_and_report_a_location() {
    let engine = engine(&[("page.ftl", "head\n  ${missing} tail")]);
    let (out, err) = render_err(&engine, "page.ftl");

    assert_eq!(out, "head\n  ");
    assert_eq!(err.template.as_deref(), Some("page.ftl"));
    assert_eq!((err.line, err.column), (Some(2), Some(5)));
    assert_eq!(
        err.to_string(),
        "page.ftl:2:5: `missing` is not declared in any enclosing scope"
    );
}

#[test]
fn errors_in_included_templates_point_into_them() {
    let engine = engine(&[
        ("main.ftl", "[#include \"part.ftl\"]"),
        ("part.ftl", "one\ntwo ${1 / 0}"),
    ]);
    let (out, err) = render_err(&engine, "main.ftl");

    assert_eq!(out, "one\ntwo ");
    assert_eq!(err.kind, RenderErrorKind::Evaluation(EvalErrorKind::DivisionByZero));
    assert_eq!(err.template.as_deref(), Some("part.ftl"));
    assert_eq!(err.line, Some(2));
}

#[test]
fn broken_includes_can_be_recovered() {
    let engine = engine(&[
        (
            "main.ftl",
            "[#attempt][#include \"broken.ftl\"][#recover]${.error}[/#attempt]",
        ),
        ("broken.ftl", "[#if x]"),
    ]);
    let out = engine.render_to_string("main.ftl", &json!({})).unwrap();
    assert_eq!(
        out,
        "cannot use template `broken.ftl`: has a syntax error: `if` is never closed"
    );
}

#[test]
fn missing_top_level_template() {
    let engine = engine(&[]);
    let (_, err) = render_err(&engine, "nope.ftl");
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "nope.ftl: template `nope.ftl` not found");
}

#[test]
fn shared_variables_sit_beneath_the_data_model() {
    let engine = engine_with(
        Configuration::builder()
            .shared_variable("site", "Quill")
            .shared_variable("user", "nobody"),
        &[("t.ftl", "${site}/${user}")],
    );
    let out = engine.render_to_string("t.ftl", &json!({ "user": "ada" })).unwrap();
    assert_eq!(out, "Quill/ada");
}

#[test]
fn render_options_override_locale_time_zone_and_now() {
    let engine = engine(&[("t.ftl", "${.locale} ${.now?time}")]);
    let options = RenderOptions {
        locale: Some(quill::Locale::new("de", "AT", "")),
        time_zone: Some(Tz::Europe__Vienna),
        now: Some(fixed_now()),
    };
    let mut out = String::new();
    engine
        .render_with("t.ftl", &HashValue::new(), &mut out, &options)
        .unwrap();
    assert_eq!(out, "de_AT 13:30:00");
}

#[test]
fn configured_time_zone_applies_by_default() {
    let engine = engine_with(
        Configuration::builder().time_zone(Tz::Asia__Tokyo),
        &[("t.ftl", "${.now?time}")],
    );
    let options = RenderOptions {
        now: Some(fixed_now()),
        ..RenderOptions::default()
    };
    let mut out = String::new();
    engine
        .render_with("t.ftl", &HashValue::new(), &mut out, &options)
        .unwrap();
    assert_eq!(out, "21:30:00");
}

#[test]
fn denied_capabilities_stop_the_render() {
    let engine = engine_with(
        Configuration::builder().capabilities(Capabilities::all() - Capabilities::INCLUDE),
        &[
            (
                "main.ftl",
                "a[#attempt][#include \"part.ftl\"][#recover]b[/#attempt]",
            ),
            ("part.ftl", "part"),
        ],
    );
    let (out, err) = render_err(&engine, "main.ftl");
    assert_eq!(out, "a");
    assert_eq!(
        err.kind,
        RenderErrorKind::Evaluation(EvalErrorKind::MissingCapability {
            capability: "include"
        })
    );
}

#[test]
fn runaway_recursion_respects_the_configured_depth() {
    let engine = engine_with(
        Configuration::builder().max_call_depth(8),
        &[("t.ftl", "[#macro down][@down/][/#macro][@down/]")],
    );
    let (_, err) = render_err(&engine, "t.ftl");
    assert_eq!(
        err.kind,
        RenderErrorKind::Evaluation(EvalErrorKind::StackOverflow { depth: 8 })
    );
    assert_eq!(err.backtrace.map(|b| b.len()), Some(8));
}

#[test]
fn writer_sinks_receive_the_output() {
    let engine = engine(&[("t.ftl", "${n * 2}")]);
    let mut sink = WriterSink::new(Vec::new());
    engine.render("t.ftl", &json!({ "n": 21 }), &mut sink).unwrap();
    assert_eq!(sink.into_inner(), b"42");
}

struct Book {
    title: &'static str,
}

struct BookAdapter;

impl ObjectAdapter for BookAdapter {
    fn type_name(&self) -> &'static str {
        "book"
    }

    fn get(&self, object: &(dyn Any + Send + Sync), key: &str) -> Result<Option<Value>, HostError> {
        let book = object
            .downcast_ref::<Book>()
            .ok_or_else(|| HostError::new("not a book"))?;
        Ok((key == "title").then_some(Value::string(book.title)))
    }
}

/// Adapts [`Book`]s and defers everything else to the default wrapper.
struct LibraryWrapper;

impl ObjectWrapper for LibraryWrapper {
    fn wrap(&self, object: Arc<dyn Any + Send + Sync>) -> Result<Value, HostError> {
        if object.is::<Book>() {
            return Ok(Value::Host(HostValue::new(object, Arc::new(BookAdapter))));
        }
        DefaultObjectWrapper.wrap(object)
    }
}

#[test]
fn host_objects_enter_through_the_object_wrapper() {
    let engine = engine_with(
        Configuration::builder().object_wrapper(Arc::new(LibraryWrapper)),
        &[("t.ftl", "${book.title} (${book?type_name}) x${count}")],
    );
    let mut data = HashValue::new();
    data.insert("book", engine.wrap(Arc::new(Book { title: "Dune" })).unwrap());
    data.insert("count", engine.wrap(Arc::new(3_i64)).unwrap());

    let mut out = String::new();
    engine
        .render_with("t.ftl", &data, &mut out, &RenderOptions::default())
        .unwrap();
    assert_eq!(out, "Dune (book) x3");
}

#[test]
fn unknown_host_objects_are_rejected() {
    let engine = engine(&[]);
    let err = engine.wrap(Arc::new(vec![1_u8])).unwrap_err();
    assert_eq!(err.kind, RenderErrorKind::DataModel);
}

//! Parsing and validation failures as reported by the engine.

use pretty_assertions::assert_eq;
use quill::{ColorMode, Configuration, ErrorCode, Locale, RenderErrorKind};

use crate::common::{engine, engine_with, render_err};

#[test]
fn function_missing_a_return_is_one_problem() {
    let engine = engine(&[(
        "f.ftl",
        "[#function pick x][#if x][#return 1][/#if][/#function]${pick(true)}",
    )]);
    let (out, err) = render_err(&engine, "f.ftl");

    assert_eq!(out, "");
    assert_eq!(err.kind, RenderErrorKind::Invalid);
    assert_eq!(err.diagnostics.len(), 1);
    assert_eq!(err.diagnostics[0].message, "function must return a value");
    assert_eq!(err.code(), Some(ErrorCode::E2004));
}

#[test]
fn every_structural_violation_is_reported() {
    let engine = engine(&[("t.ftl", "[#return]x[#return]\n[#break]")]);
    let (_, err) = render_err(&engine, "t.ftl");

    let codes: Vec<ErrorCode> = err.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::E2001, ErrorCode::E2001, ErrorCode::E2003]);
    assert!(err.message.ends_with("(and 2 more)"), "{}", err.message);
}

#[test]
fn validation_errors_point_at_the_first_problem() {
    let engine = engine(&[("t.ftl", "ok\n  [#break]")]);
    let (_, err) = render_err(&engine, "t.ftl");

    assert_eq!(err.template.as_deref(), Some("t.ftl"));
    assert_eq!((err.line, err.column), (Some(2), Some(3)));
    assert!(err.to_string().starts_with("t.ftl:2:3: template `t.ftl` is invalid"));
}

#[test]
fn reports_show_every_problem_with_its_source_line() {
    let engine = engine(&[("t.ftl", "ok\n  [#break]\n[#return]")]);
    let (_, err) = render_err(&engine, "t.ftl");

    let report = err.report(ColorMode::Never);
    assert!(report.contains("error[E2003]"), "{report}");
    assert!(report.contains("--> t.ftl:2:3"), "{report}");
    assert!(report.contains(" 2 |   [#break]"), "{report}");
    assert!(report.contains("--> t.ftl:3:1"), "{report}");
    assert!(report.contains("error: template has 2 errors"), "{report}");
}

#[test]
fn syntax_errors_are_located() {
    let engine = engine(&[("bad.ftl", "text\n[#if x]never closed")]);
    let (_, err) = render_err(&engine, "bad.ftl");

    assert_eq!(err.kind, RenderErrorKind::Syntax);
    assert_eq!(err.code(), Some(ErrorCode::E1003));
    assert_eq!((err.line, err.column), (Some(2), Some(1)));
    assert_eq!(
        err.message,
        "template `bad.ftl` has a syntax error: `if` is never closed"
    );
}

#[test]
fn literal_checks_warn_unless_configured_fatal() {
    let source = "[#if \"yes\"]y[/#if]";

    let lenient = engine(&[("t.ftl", source)]);
    let template = lenient.template("t.ftl", &Locale::ROOT).unwrap();
    assert_eq!(template.warnings().len(), 1);

    let strict = engine_with(
        Configuration::builder().literal_type_check_fatal(true),
        &[("t.ftl", source)],
    );
    let (_, err) = render_err(&strict, "t.ftl");
    assert_eq!(err.code(), Some(ErrorCode::E2009));
}

#[test]
fn whitespace_stripping_follows_the_configuration() {
    let source = "[#assign a = 1]\n[#assign b = 2]\n${a}\n${b}";
    let data = serde_json::json!({});

    let stripped = engine(&[("t.ftl", source)]);
    assert_eq!(stripped.render_to_string("t.ftl", &data).unwrap(), "\n1\n2");

    let kept = engine_with(
        Configuration::builder().strip_whitespace(false),
        &[("t.ftl", source)],
    );
    assert_eq!(kept.render_to_string("t.ftl", &data).unwrap(), "\n\n1\n2");
}

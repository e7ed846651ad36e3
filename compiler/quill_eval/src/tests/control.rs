use pretty_assertions::assert_eq;
use quill_value::EvalErrorKind;
use serde_json::json;

use super::{render, render_err, render_with, Harness};

// Lists

#[test]
fn list_companions() {
    let out = render("[#list 1..3 as n]${n_index}:${n}[#if n_has_next],[/#if][/#list]");
    assert_eq!(out, "0:1,1:2,2:3");
}

#[test]
fn list_else_runs_for_empty_sequences() {
    assert_eq!(render("[#list [] as x]${x}[#else]empty[/#list]"), "empty");
    assert_eq!(render("[#list [1] as x]${x}[#else]empty[/#list]"), "1");
}

#[test]
fn ranges_count_in_either_direction() {
    assert_eq!(render("[#list 3..1 as n]${n}[/#list]"), "321");
    assert_eq!(render("[#list 0..<3 as n]${n}[/#list]"), "012");
    assert_eq!(render("[#list 3..<0 as n]${n}[/#list]"), "321");
}

#[test]
fn open_range_runs_until_break() {
    let out = render("[#list 5.. as n]${n}[#if n gte 7][#break][/#if][/#list]done");
    assert_eq!(out, "567done");
}

#[test]
fn listing_a_hash_iterates_its_keys_in_order() {
    let out = render("[#list {\"b\": 1, \"a\": 2} as key]${key};[/#list]");
    assert_eq!(out, "b;a;");
    let out = render_with(
        "[#list user as key]${key}=${user[key]};[/#list]",
        json!({ "user": { "age": 41, "name": "Ann" } }),
    );
    assert_eq!(out, "age=41;name=Ann;");
}

#[test]
fn nested_lists_keep_their_own_companions() {
    let out = render("[#list [\"a\", \"b\"] as x][#list [1, 2] as y]${x}${y_index}[/#list]${x_index}[/#list]");
    assert_eq!(out, "a0a10b0b11");
}

#[test]
fn listing_a_scalar_is_a_type_error() {
    let err = render_err("[#list 3 as x][/#list]");
    assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }));
}

// Conditionals

#[test]
fn if_elseif_else() {
    let template = "[#if n lt 0]neg[#elseif n == 0]zero[#else]pos[/#if]";
    assert_eq!(render_with(template, json!({ "n": -2 })), "neg");
    assert_eq!(render_with(template, json!({ "n": 0 })), "zero");
    assert_eq!(render_with(template, json!({ "n": 5 })), "pos");
}

#[test]
fn if_condition_must_be_boolean() {
    let err = render_with_err("[#if name]x[/#if]", json!({ "name": "Ann" }));
    assert_eq!(
        err.kind,
        EvalErrorKind::TypeMismatch {
            expected: "boolean".to_owned(),
            got: "string"
        }
    );
}

#[test]
fn switch_falls_through_until_break() {
    let template =
        "[#switch n][#case 1]one[#case 2]two[#case 3]three[#break][#default]other[/#switch]";
    assert_eq!(render_with(template, json!({ "n": 2 })), "twothree");
    assert_eq!(render_with(template, json!({ "n": 1 })), "onetwothree");
    assert_eq!(render_with(template, json!({ "n": 9 })), "other");
}

#[test]
fn single_case_switch_still_matches_all_values() {
    let template = "[#switch n][#case 1, 2]small[#break][/#switch]";
    assert_eq!(render_with(template, json!({ "n": 2 })), "small");
    assert_eq!(render_with(template, json!({ "n": 3 })), "");
}

#[test]
fn break_inside_switch_inside_list_leaves_only_the_switch() {
    let out = render("[#list 1..3 as n][#switch n][#case 2]two[#break][#default]${n}[/#switch][/#list]");
    assert_eq!(out, "1two3");
}

// Missing values

#[test]
fn default_and_exists_operators() {
    let out = render_with(
        "${missing!\"fallback\"}|${missing!}|${user.nick!user.name}|${missing??}|${user??}",
        json!({ "user": { "name": "Ann" } }),
    );
    assert_eq!(out, "fallback||Ann|false|true");
}

#[test]
fn default_does_not_hide_type_errors() {
    let err = render_err("${(1 + \"a\" * 2)!\"x\"}");
    assert!(matches!(err.kind, EvalErrorKind::InvalidOperands { .. }));
}

#[test]
fn missing_member_is_an_error_without_default() {
    let err = render_with_err("${user.nick}", json!({ "user": { "name": "Ann" } }));
    assert_eq!(
        err.kind,
        EvalErrorKind::MissingMember {
            key: "nick".to_owned(),
            container: "hash"
        }
    );
}

#[test]
fn tolerant_builtins_accept_missing_operands() {
    let out = render("${missing?has_content}|${\"\"?has_content}|${[1]?has_content}");
    assert_eq!(out, "false|false|true");
}

// Attempt / recover

#[test]
fn attempt_commits_output_on_success() {
    assert_eq!(render("a[#attempt]b[#recover]r[/#attempt]c"), "abc");
}

#[test]
fn attempt_discards_partial_output_and_exposes_the_error() {
    let out = render("a[#attempt]b${missing}c[#recover]R:${.error}[/#attempt]d");
    assert_eq!(out, "aR:`missing` is not declared in any enclosing scoped");
}

#[test]
fn attempt_recovers_from_errors_deep_in_macro_calls() {
    let out = render(
        "[#macro boom]x${nope}[/#macro][#macro wrap][@boom/][/#macro]\
         [#attempt][@wrap/][#recover]caught[/#attempt][@ok/][#macro ok]!${.template_name}[/#macro]",
    );
    assert_eq!(out, "caught!main.ftl");
}

#[test]
fn failing_recover_block_propagates() {
    let err = render_err("[#attempt]${a}[#recover]${b}[/#attempt]");
    assert_eq!(
        err.kind,
        EvalErrorKind::UndeclaredVariable {
            name: "b".to_owned()
        }
    );
}

#[test]
fn nested_attempts_restore_the_outer_error() {
    let out = render(
        "[#attempt]${first}[#recover][#attempt]${second}[#recover]${.error?length gt 0}[/#attempt]|${.error}[/#attempt]",
    );
    assert_eq!(out, "true|`first` is not declared in any enclosing scope");
}

#[test]
fn stop_is_never_recovered() {
    let err = render_err("[#attempt][#stop \"halt\"][#recover]no[/#attempt]");
    assert_eq!(
        err.kind,
        EvalErrorKind::Stopped {
            reason: Some("halt".to_owned())
        }
    );
}

#[test]
fn stop_keeps_output_already_written() {
    let harness = Harness::new().template("main.ftl", "before[#stop]after");
    let (out, result) = harness.run("main.ftl");
    assert_eq!(out, "before");
    assert_eq!(
        result.map_err(|e| e.kind),
        Err(EvalErrorKind::Stopped { reason: None })
    );
}

// Output shaping

#[test]
fn compress_collapses_whitespace() {
    let out = render("[#compress]  a   b  \n\n\n  c  [/#compress]|");
    assert_eq!(out, "a b\nc|");
}

#[test]
fn identical_nested_escapes_apply_once_and_noescape_suspends_them() {
    let out = render_with(
        "[#escape x as x?html][#escape y as y?html]${a}[#noescape]${a}[/#noescape][/#escape]${a}[/#escape]${a}",
        json!({ "a": "<b>" }),
    );
    assert_eq!(out, "&lt;b&gt;<b>&lt;b&gt;<b>");
}

#[test]
fn different_escapes_compose_inner_first() {
    let out = render_with(
        "[#escape x as x?html][#escape x as x?url]${a}[/#escape][/#escape]",
        json!({ "a": "<" }),
    );
    assert_eq!(out, "%3C");
}

#[test]
fn escapes_apply_inside_macros_defined_in_their_scope() {
    let out = render_with(
        "[#escape x as x?html][#macro m]${a}[/#macro][/#escape][@m/]",
        json!({ "a": "&" }),
    );
    assert_eq!(out, "&amp;");
}

#[test]
fn time_zone_setting_changes_date_rendering() {
    let out = render("[#setting time_zone=\"Europe/Berlin\"]${.now?time}");
    assert_eq!(out, "13:30:00");
}

#[test]
fn unknown_time_zone_is_an_error() {
    let err = render_err("[#setting time_zone=\"Mars/Olympus\"]");
    assert!(matches!(
        err.kind,
        EvalErrorKind::InvalidBuiltinValue {
            builtin: "setting",
            ..
        }
    ));
}

fn render_with_err(source: &str, data: serde_json::Value) -> quill_value::EvalError {
    Harness::new()
        .template("main.ftl", source)
        .data(data)
        .render_err("main.ftl")
}

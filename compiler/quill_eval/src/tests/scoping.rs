use pretty_assertions::assert_eq;
use quill_value::{EvalErrorKind, Value};
use serde_json::json;

use super::{render, render_err, render_with, Harness};

#[test]
fn undeclared_variable_inside_macro_is_an_error() {
    let err = render_err("[#macro m]${x}[/#macro][@m/]");
    assert_eq!(
        err.kind,
        EvalErrorKind::UndeclaredVariable {
            name: "x".to_owned()
        }
    );
}

#[test]
fn data_model_sits_beneath_globals_and_namespace() {
    let out = render_with(
        "${x}|[#global x = \"global\"]${x}|[#assign x = \"namespace\"]${x}",
        json!({ "x": "data" }),
    );
    assert_eq!(out, "data|global|namespace");
}

#[test]
fn declared_but_unassigned_namespace_variable_is_unbound() {
    let err = render_err("${y}[#assign y = 1]");
    assert_eq!(
        err.kind,
        EvalErrorKind::UnboundVariable {
            name: "y".to_owned()
        }
    );
}

#[test]
fn loop_variables_do_not_leak() {
    let out = render("[#list [1, 2] as i]${i}[/#list]${i!\"gone\"}");
    assert_eq!(out, "12gone");
}

#[test]
fn macro_locals_shadow_from_frame_entry() {
    let out = render(
        "[#assign x = \"outer\"]\
         [#macro m]${x!\"unbound\"}/[#local x = \"inner\"]${x}[/#macro]\
         [@m/]/${x}",
    );
    assert_eq!(out, "unbound/inner/outer");
}

#[test]
fn plain_assign_inside_macro_targets_defining_namespace() {
    let out = render("[#macro m][#assign y = \"set\"][/#macro][@m/]${y}");
    assert_eq!(out, "set");
}

#[test]
fn plain_assign_to_local_updates_the_macro_frame() {
    let out = render(
        "[#assign n = 0][#macro m][#local n = 1][#assign n = n + 1]${n}[/#macro][@m/]${n}",
    );
    assert_eq!(out, "20");
}

#[test]
fn special_scope_variables() {
    let out = render(
        "[#global g = 1][#assign n = 2]${.globals.g}${.namespace.n}${.main.n}${.template_name}",
    );
    assert_eq!(out, "122main.ftl");
}

#[test]
fn data_model_special_variable() {
    let out = render_with(
        "[#assign x = \"shadow\"]${x}/${.data_model.x}",
        json!({ "x": "model" }),
    );
    assert_eq!(out, "shadow/model");
}

#[test]
fn caller_scope_reads_the_call_site() {
    let out = Harness::new()
        .template(
            "main.ftl",
            "[#macro show][#local v = \"callee\"]${.caller_scope.v}[/#macro]\
             [#list [\"site\"] as v][@show/][/#list]",
        )
        .render("main.ftl");
    assert_eq!(out, "site");
}

#[test]
fn fixed_now_and_locale_specials() {
    let out = render("${.now}|${.now?iso}|${.lang}|${.locale}");
    assert_eq!(out, "2024-03-01 12:30:00|2024-03-01T12:30:00+00:00|en|en_US");
}

#[test]
fn setting_changes_locale_for_the_rest_of_the_render() {
    let out = render("[#setting locale=\"de_DE\"]${.locale} ${.lang}");
    assert_eq!(out, "de_DE de");
}

mod proptest_shadowing {
    use proptest::prelude::*;

    use super::super::render;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// A macro frame that declares `x` hides every outer `x` whatever
        /// order local and global writes happen in.
        #[test]
        fn declared_local_always_shadows(local_writes in proptest::collection::vec(any::<bool>(), 1..10)) {
            let declares_local = local_writes.iter().any(|is_local| *is_local);
            let mut source = String::from("[#macro m]");
            let mut expected = String::new();
            let mut local: Option<String> = None;
            let mut global: Option<String> = None;
            for (i, is_local) in local_writes.iter().enumerate() {
                if *is_local {
                    source.push_str(&format!("[#local x = \"l{i}\"]"));
                    local = Some(format!("l{i}"));
                } else {
                    source.push_str(&format!("[#global x = \"g{i}\"]"));
                    global = Some(format!("g{i}"));
                }
                source.push_str("${x!\"-\"},");
                let visible = if declares_local { &local } else { &global };
                expected.push_str(visible.as_deref().unwrap_or("-"));
                expected.push(',');
            }
            source.push_str("[/#macro][@m/]|${x!\"-\"}");
            expected.push('|');
            expected.push_str(global.as_deref().unwrap_or("-"));
            prop_assert_eq!(render(&source), expected);
        }
    }
}

#[test]
fn data_model_keys_stay_out_of_the_interner() {
    let mut harness = Harness::new().template(
        "main.ftl",
        "${.data_model?keys?size}:${.data_model[\"user_3\"]!\"-\"}",
    );
    assert_eq!(harness.render("main.ftl"), "0:-");
    let before = harness.interner.len();
    for i in 0..200 {
        harness = harness.set(&format!("user_{i}"), Value::Int(i));
        let out = harness.render("main.ftl");
        assert!(out.starts_with(&format!("{}:", i + 1)), "{out}");
    }
    assert_eq!(harness.interner.len(), before);
    assert_eq!(harness.render("main.ftl"), "200:3");
}

#[test]
fn data_model_keys_first_named_by_an_included_template() {
    let out = Harness::new()
        .template("main.ftl", "[#include \"part.ftl\"]")
        .template("part.ftl", "[#assign find = .data_model?lookup]${late_key}|${find(\"late_key\")}")
        .data(json!({ "late_key": "found" }))
        .render("main.ftl");
    assert_eq!(out, "found|found");
}

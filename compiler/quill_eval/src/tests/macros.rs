use pretty_assertions::assert_eq;
use quill_value::EvalErrorKind;

use super::{render, render_err};

#[test]
fn greet_with_named_argument() {
    let out = render("[#macro greet name]Hello, ${name}![/#macro][@greet name=\"World\"/]");
    assert_eq!(out, "Hello, World!");
}

#[test]
fn positional_arguments_bind_in_order() {
    assert_eq!(render("[#macro pair a b]${a}-${b}[/#macro][@pair 1, 2/]"), "1-2");
}

#[test]
fn defaults_see_earlier_parameters() {
    let out = render("[#macro m a b=a + 1]${a}${b};[/#macro][@m a=1/][@m a=1 b=5/][@m 7/]");
    assert_eq!(out, "12;15;78;");
}

#[test]
fn arity_errors() {
    let missing = render_err("[#macro m a][/#macro][@m/]");
    assert_eq!(
        missing.kind,
        EvalErrorKind::MissingArgument {
            callee: "m".to_owned(),
            param: "a".to_owned()
        }
    );

    let extra = render_err("[#macro m a][/#macro][@m 1, 2/]");
    assert_eq!(
        extra.kind,
        EvalErrorKind::TooManyArguments {
            callee: "m".to_owned(),
            expected: 1,
            got: 2
        }
    );

    let unknown = render_err("[#macro m a][/#macro][@m b=1/]");
    assert_eq!(
        unknown.kind,
        EvalErrorKind::UnknownParameter {
            callee: "m".to_owned(),
            param: "b".to_owned()
        }
    );
}

#[test]
fn catch_all_collects_extra_positional_arguments() {
    let out = render("[#macro m a rest...]${a}:[#list rest as r]${r}[/#list][/#macro][@m 1, 2, 3/]");
    assert_eq!(out, "1:23");
}

#[test]
fn catch_all_collects_unknown_named_arguments_in_order() {
    let out = render(
        "[#macro m a attrs...]${a}[#list attrs as k] ${k}=${attrs[k]}[/#list][/#macro]\
         [@m y=3 a=1 x=2/]",
    );
    assert_eq!(out, "1 y=3 x=2");
}

#[test]
fn catch_all_is_empty_when_nothing_is_left_over() {
    let out = render("[#macro m rest...]${rest?size}[/#macro][@m/]");
    assert_eq!(out, "0");
}

#[test]
fn nested_body_receives_loop_parameters() {
    let out = render(
        "[#macro rows][#list [\"a\", \"b\"] as x][#nested x, x_index][/#list][/#macro]\
         [@rows; v, i]${i}${v} [/@rows]",
    );
    assert_eq!(out, "0a 1b ");
}

#[test]
fn nested_body_resolves_names_at_the_call_site() {
    let out = render(
        "[#assign who = \"caller\"]\
         [#macro m][#local who = \"callee\"][#nested][/#macro]\
         [@m]${who}[/@m]",
    );
    assert_eq!(out, "caller");
}

#[test]
fn nested_body_inside_a_macro_sees_that_macros_locals() {
    let out = render(
        "[#macro m][#local who = \"m\"][#nested][/#macro]\
         [#macro outer][#local who = \"outer\"][@m]${who}[/@m][/#macro]\
         [@outer/]",
    );
    assert_eq!(out, "outer");
}

#[test]
fn nested_reenters_through_several_levels() {
    let out = render(
        "[#macro b][#nested][/#macro]\
         [#macro a][@b]<[#nested]>[/@b][/#macro]\
         [@a]x[/@a]",
    );
    assert_eq!(out, "<x>");
}

#[test]
fn nested_without_body_is_a_no_op() {
    assert_eq!(render("[#macro m]a[#nested]b[#fallback]c[/#macro][@m/]"), "abc");
}

#[test]
fn nested_runs_once_per_invocation() {
    let out = render("[#macro twice][#nested][#nested][/#macro][@twice]*[/@twice]");
    assert_eq!(out, "**");
}

#[test]
fn return_in_nested_body_ends_only_the_body() {
    let out = render(
        "[#macro m]1[#nested]3[/#macro]\
         [#macro w][@m]2[#return]X[/@m]4[/#macro]\
         [@w/]",
    );
    assert_eq!(out, "1234");
}

#[test]
fn return_ends_the_macro() {
    assert_eq!(render("[#macro m]a[#return]b[/#macro][@m/]c"), "ac");
}

#[test]
fn functions_return_values_and_discard_output() {
    let out = render(
        "[#function add a b]noise[#return a + b][/#function]${add(1, 2)}",
    );
    assert_eq!(out, "3");
}

#[test]
fn recursive_function() {
    let out = render(
        "[#function fact n][#if n lte 1][#return 1][/#if][#return n * fact(n - 1)][/#function]\
         ${fact(10)}",
    );
    assert_eq!(out, "3628800");
}

#[test]
fn function_cannot_be_called_as_a_macro() {
    let err = render_err("[#function f][#return 1][/#function][@f/]");
    assert!(matches!(err.kind, EvalErrorKind::TypeMismatch { .. }));
}

#[test]
fn macro_cannot_be_called_as_a_function() {
    let err = render_err("[#macro m][/#macro]${m()}");
    assert_eq!(err.kind, EvalErrorKind::NotCallable { type_name: "macro" });
}

#[test]
fn macros_are_visible_before_their_definition() {
    assert_eq!(render("[@late/][#macro late]ok[/#macro]"), "ok");
}

#[test]
fn macro_defined_in_a_block_binds_when_reached() {
    let out = render("${m??}[#if true][#macro m][/#macro][/#if]${m??}");
    assert_eq!(out, "falsetrue");
}

#[test]
fn macro_body_reads_its_defining_namespace() {
    let out = render(
        "[#assign greeting = \"hi\"][#macro m]${greeting}[/#macro]\
         [#list [1] as greeting][@m/][/#list]",
    );
    assert_eq!(out, "hi");
}

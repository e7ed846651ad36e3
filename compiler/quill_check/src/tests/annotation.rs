use pretty_assertions::assert_eq;
use quill_diagnostic::{ErrorCode, Severity};
use quill_ir::{
    BuiltinKind, CallArgs, DeclaredSet, Expr, ExprKind, Node, NodeKind, StringInterner,
};

use super::{check, check_with};
use crate::CheckOptions;

fn names(interner: &StringInterner, set: &DeclaredSet) -> Vec<&'static str> {
    let mut names: Vec<_> = set.iter().map(|n| interner.lookup(n)).collect();
    names.sort_unstable();
    names
}

fn kinds(nodes: &[Node]) -> Vec<&'static str> {
    nodes.iter().map(Node::describe).collect()
}

/// Builtin names applied to an interpolation, outermost first.
fn escape_chain(interner: &StringInterner, node: &Node) -> Vec<&'static str> {
    let NodeKind::Interpolation(expr) = &node.kind else {
        panic!("expected an interpolation, found {}", node.describe());
    };
    let mut chain = Vec::new();
    let mut current: &Expr = expr;
    while let ExprKind::Builtin { target, name, .. } = &current.kind {
        chain.push(interner.lookup(*name));
        current = target;
    }
    chain
}

#[test]
fn macro_frames_declare_params_and_locals() {
    let (validated, interner) =
        check("[#macro m a b=1 rest...][#local x = a][#assign y = b][/#macro]");
    let def = &validated.macros[0];
    assert_eq!(names(&interner, &def.body.declared), vec!["a", "b", "rest", "x"]);
    assert_eq!(names(&interner, &validated.root.declared), vec!["m", "y"]);
}

#[test]
fn loop_bodies_declare_companions() {
    let (validated, interner) = check("[#list items as item]${item_index}[/#list]");
    let NodeKind::List(list) = &validated.root.nodes[0].kind else {
        panic!("expected list");
    };
    assert_eq!(
        names(&interner, &list.body.declared),
        vec!["item", "item_has_next", "item_index"]
    );
}

#[test]
fn call_bodies_declare_their_parameters() {
    let (validated, interner) = check("[@row; cell, n]${cell}[/@row]");
    let NodeKind::Call(call) = &validated.root.nodes[0].kind else {
        panic!("expected call");
    };
    assert!(matches!(call.args, CallArgs::Positional(ref args) if args.is_empty()));
    let body = call.body.as_ref().unwrap();
    assert_eq!(names(&interner, &body.block.declared), vec!["cell", "n"]);
}

#[test]
fn builtins_are_bound() {
    let (validated, _) = check("${name?upper_case}");
    let NodeKind::Interpolation(expr) = &validated.root.nodes[0].kind else {
        panic!("expected interpolation");
    };
    assert!(matches!(
        expr.kind,
        ExprKind::Builtin {
            builtin: Some(BuiltinKind::UpperCase),
            ..
        }
    ));
}

#[test]
fn escapes_rewrite_interpolations_and_vanish() {
    let (validated, interner) = check(
        "[#escape x as x?html]${a}[#noescape]${b}[/#noescape][/#escape]${c}",
    );
    let nodes = &validated.root.nodes;
    assert_eq!(kinds(nodes), vec!["${...}", "${...}", "${...}"]);
    assert_eq!(escape_chain(&interner, &nodes[0]), vec!["html"]);
    assert!(escape_chain(&interner, &nodes[1]).is_empty());
    assert!(escape_chain(&interner, &nodes[2]).is_empty());
}

#[test]
fn identical_nested_escapes_apply_once() {
    let (validated, interner) = check(
        "[#escape x as x?html][#escape y as y?html]${a}[#noescape]${b}[/#noescape][/#escape]${c}[/#escape]",
    );
    let nodes = &validated.root.nodes;
    assert_eq!(escape_chain(&interner, &nodes[0]), vec!["html"]);
    assert!(escape_chain(&interner, &nodes[1]).is_empty());
    assert_eq!(escape_chain(&interner, &nodes[2]), vec!["html"]);
}

#[test]
fn different_nested_escapes_compose() {
    let (validated, interner) = check(
        "[#escape x as x?html][#escape x as x?url]${a}[/#escape][/#escape]",
    );
    assert_eq!(
        escape_chain(&interner, &validated.root.nodes[0]),
        vec!["html", "url"]
    );
}

#[test]
fn escapes_reach_into_nested_macros() {
    let (validated, interner) =
        check("[#escape x as x?html][#if true][#macro m]${a}[/#macro][/#if][/#escape]");
    let NodeKind::If { branches, .. } = &validated.root.nodes[0].kind else {
        panic!("expected if");
    };
    let NodeKind::Macro(def) = &branches[0].body[0].kind else {
        panic!("expected macro");
    };
    assert_eq!(escape_chain(&interner, &def.body.nodes[0]), vec!["html"]);
}

#[test]
fn single_case_switch_becomes_conditional() {
    let (validated, _) = check("[#switch x][#case 1, 2]small[#break][/#switch]");
    let NodeKind::If { branches, otherwise } = &validated.root.nodes[0].kind else {
        panic!("expected if");
    };
    assert!(otherwise.is_none());
    assert!(matches!(
        branches[0].condition.kind,
        ExprKind::Binary {
            op: quill_ir::BinaryOp::Or,
            ..
        }
    ));
    assert_eq!(kinds(&branches[0].body), vec!["text"]);
}

#[test]
fn switch_with_inner_break_is_kept() {
    let (validated, _) = check("[#switch x][#case 1][#if y][#break][/#if]a[/#switch]");
    assert_eq!(kinds(&validated.root.nodes), vec!["#switch"]);
}

#[test]
fn blank_directive_lines_are_stripped() {
    let source = "[#assign a = 1]\n[#assign b = 2]\n${a}\n${b}";
    let (validated, _) = check(source);
    assert_eq!(
        kinds(&validated.root.nodes),
        vec!["#assign", "#assign", "text", "${...}", "text", "${...}"]
    );

    let options = CheckOptions {
        strip_whitespace: false,
        ..CheckOptions::default()
    };
    let (result, _) = check_with(source, &options);
    assert_eq!(result.unwrap().root.nodes.len(), 7);
}

#[test]
fn adjacent_text_is_merged_after_comments() {
    let (validated, _) = check("a[#-- c --]b");
    let NodeKind::Text(text) = &validated.root.nodes[0].kind else {
        panic!("expected text");
    };
    assert_eq!(&**text, "ab");
    assert_eq!(validated.root.nodes.len(), 1);
}

#[test]
fn literal_mismatches_warn_by_default() {
    let (validated, _) = check("[#if \"yes\"]y[/#if]${\"abc\"?size}${[1, 2]}${-\"x\"}");
    let warnings = validated.warnings();
    assert_eq!(warnings.len(), 4);
    assert!(warnings
        .iter()
        .all(|w| w.code == ErrorCode::W2001 && w.severity == Severity::Warning));
    assert_eq!(warnings[0].message, "expected boolean, found a string literal");
}

#[test]
fn literal_mismatches_can_be_fatal() {
    let options = CheckOptions {
        literal_type_check_fatal: true,
        ..CheckOptions::default()
    };
    let (result, _) = check_with("[#if 1]y[/#if]${x}", &options);
    let problems = result.unwrap_err();
    let codes: Vec<_> = problems.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::E2009]);
}

#[test]
fn non_literals_are_not_checked() {
    let (validated, _) = check("[#if flag]y[/#if]${count?size}${a - b}");
    assert!(validated.warnings().is_empty());
}

use pretty_assertions::assert_eq;
use quill_diagnostic::ErrorCode;
use quill_ir::{BinaryOp, Expr, ExprKind, StringInterner, UnaryOp};

use crate::parse_expression;

fn parse(source: &str) -> (Expr, StringInterner) {
    let interner = StringInterner::new();
    let expr = match parse_expression(source, &interner) {
        Ok(expr) => expr,
        Err(diag) => panic!("failed to parse `{source}`: {diag}"),
    };
    (expr, interner)
}

fn parse_err(source: &str) -> ErrorCode {
    let interner = StringInterner::new();
    match parse_expression(source, &interner) {
        Ok(expr) => panic!("`{source}` parsed unexpectedly: {expr:?}"),
        Err(diag) => diag.code,
    }
}

#[test]
fn literals() {
    assert_eq!(parse("42").0.kind, ExprKind::Int(42));
    assert_eq!(parse("2.5").0.kind, ExprKind::Float(2.5));
    assert_eq!(parse("true").0.kind, ExprKind::Bool(true));
    assert_eq!(parse(r#""a\tb""#).0.kind, ExprKind::Str("a\tb".into()));
    assert_eq!(parse(r"r'\n'").0.kind, ExprKind::Str(r"\n".into()));
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let (expr, _) = parse("1 + 2 * 3");
    let ExprKind::Binary { op, right, .. } = expr.kind else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Add);
    assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn logical_operators_bind_loosest() {
    let (expr, _) = parse("a > 1 && b lte 2 || !c");
    let ExprKind::Binary { op, left, right } = expr.kind else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Or);
    assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::And, .. }));
    assert!(matches!(right.kind, ExprKind::Unary { op: UnaryOp::Not, .. }));
}

#[test]
fn ranges() {
    let (expr, _) = parse("1..n + 1");
    let ExprKind::Range { end, inclusive, .. } = expr.kind else {
        panic!("expected range");
    };
    assert!(inclusive);
    assert!(matches!(end.map(|e| e.kind), Some(ExprKind::Binary { op: BinaryOp::Add, .. })));

    let (exclusive, _) = parse("0..<3");
    assert!(matches!(exclusive.kind, ExprKind::Range { inclusive: false, .. }));

    let (open, _) = parse("2..");
    assert!(matches!(open.kind, ExprKind::Range { end: None, .. }));
}

#[test]
fn postfix_chain() {
    let (expr, interner) = parse(r#"user.tags[0]?upper_case!"none""#);
    let ExprKind::Default { value, fallback } = expr.kind else {
        panic!("expected default");
    };
    assert_eq!(fallback.map(|f| f.kind), Some(ExprKind::Str("none".into())));
    let ExprKind::Builtin { target, name, args, builtin } = value.kind else {
        panic!("expected builtin");
    };
    assert_eq!(interner.lookup(name), "upper_case");
    assert!(args.is_none());
    assert!(builtin.is_none());
    assert!(matches!(target.kind, ExprKind::Index { .. }));
}

#[test]
fn default_without_fallback_and_exists() {
    let (expr, _) = parse("x!");
    assert!(matches!(expr.kind, ExprKind::Default { fallback: None, .. }));
    let (expr, _) = parse("x.y??");
    assert!(matches!(expr.kind, ExprKind::Exists(_)));
}

#[test]
fn builtin_with_arguments() {
    let (expr, interner) = parse(r#"flag?then("yes", "no")"#);
    let ExprKind::Builtin { name, args, .. } = expr.kind else {
        panic!("expected builtin");
    };
    assert_eq!(interner.lookup(name), "then");
    assert_eq!(args.map(|a| a.len()), Some(2));
}

#[test]
fn special_variables() {
    let (expr, interner) = parse(".now");
    let ExprKind::Special(name) = expr.kind else {
        panic!("expected special variable");
    };
    assert_eq!(interner.lookup(name), "now");
}

#[test]
fn collection_literals() {
    let (seq, _) = parse("[1, 2, 3,]");
    assert!(matches!(&seq.kind, ExprKind::Sequence(items) if items.len() == 3));
    let (hash, _) = parse(r#"{"a": 1, "b": [2]}"#);
    assert!(matches!(&hash.kind, ExprKind::Hash(entries) if entries.len() == 2));
}

#[test]
fn spans_cover_the_expression() {
    let (expr, _) = parse("  a + bc ");
    assert_eq!(expr.span.start, 2);
    assert_eq!(expr.span.end, 8);
}

#[test]
fn errors_carry_lexical_codes() {
    assert_eq!(parse_err(r#""open"#), ErrorCode::E0001);
    assert_eq!(parse_err("a # b"), ErrorCode::E0002);
    assert_eq!(parse_err("a b"), ErrorCode::E1001);
    assert_eq!(parse_err("99999999999999999999"), ErrorCode::E0003);
    assert_eq!(parse_err(r#""\q""#), ErrorCode::E0006);
    assert_eq!(parse_err("1 +"), ErrorCode::E0005);
    assert_eq!(parse_err("(1"), ErrorCode::E0005);
    assert_eq!(parse_err(")"), ErrorCode::E1002);
}

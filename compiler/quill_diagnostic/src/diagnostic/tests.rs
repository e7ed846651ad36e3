use super::*;
use pretty_assertions::assert_eq;

#[test]
fn builder_collects_labels_and_notes() {
    let diag = Diagnostic::error(ErrorCode::E2001)
        .with_message("`return` outside a macro or function")
        .with_label(Span::new(10, 18), "not inside a macro")
        .with_secondary_label(Span::new(0, 4), "template starts here")
        .with_note("move the directive into a macro body");

    assert!(diag.is_error());
    assert_eq!(diag.labels.len(), 2);
    assert_eq!(diag.primary_span(), Some(Span::new(10, 18)));
    assert_eq!(diag.notes, vec!["move the directive into a macro body".to_string()]);
}

#[test]
fn warnings_promote_to_errors() {
    let diag = Diagnostic::warning(ErrorCode::W2001).with_message("expected a boolean");
    assert!(!diag.is_error());

    let promoted = diag.into_error();
    assert!(promoted.is_error());
    assert_eq!(promoted.code, ErrorCode::W2001);
}

#[test]
fn display_includes_severity_and_code() {
    let diag = Diagnostic::error(ErrorCode::E2004).with_message("function must return a value");
    assert_eq!(diag.to_string(), "error[E2004]: function must return a value");
}

#[test]
fn no_primary_label_means_no_span() {
    let diag = Diagnostic::error(ErrorCode::E9001)
        .with_secondary_label(Span::new(1, 2), "context only");
    assert_eq!(diag.primary_span(), None);
}

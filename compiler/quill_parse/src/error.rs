//! Parse error constructors.
//!
//! Parse errors are fatal to the template being compiled; the parser returns
//! the first one it hits as a [`Diagnostic`].

use quill_diagnostic::{Diagnostic, ErrorCode};
use quill_ir::Span;

use crate::lexer::{Lexed, Token};

pub type ParseResult<T> = Result<T, Diagnostic>;

#[cold]
pub(crate) fn unexpected(found: Lexed, expected: &str) -> Diagnostic {
    match found.token {
        Token::Invalid => Diagnostic::error(ErrorCode::E0002)
            .with_message("invalid character in expression")
            .with_label(found.span, format!("expected {expected}")),
        Token::Eof => Diagnostic::error(ErrorCode::E0005)
            .with_message(format!("expected {expected}, found end of template"))
            .with_label(found.span, "template ends here"),
        _ => Diagnostic::error(ErrorCode::E1001)
            .with_message(format!(
                "expected {expected}, found {}",
                found.token.describe()
            ))
            .with_label(found.span, format!("expected {expected}")),
    }
}

#[cold]
pub(crate) fn expected_expression(found: Lexed) -> Diagnostic {
    if matches!(found.token, Token::Invalid | Token::Eof) {
        return unexpected(found, "an expression");
    }
    Diagnostic::error(ErrorCode::E1002)
        .with_message(format!(
            "expected an expression, found {}",
            found.token.describe()
        ))
        .with_label(found.span, "expected an expression")
}

#[cold]
pub(crate) fn unterminated_string(span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E0001)
        .with_message("unterminated string literal")
        .with_label(span, "string starts here")
}

#[cold]
pub(crate) fn invalid_escape(span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E0006)
        .with_message("invalid escape sequence in string literal")
        .with_label(span, "unknown escape")
}

#[cold]
pub(crate) fn invalid_number(span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E0003)
        .with_message("number literal out of range")
        .with_label(span, "does not fit in a 64-bit integer")
}

#[cold]
pub(crate) fn unterminated_comment(span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E0004)
        .with_message("unterminated comment")
        .with_label(span, "comment starts here")
        .with_note("comments end with `--]`")
}

#[cold]
pub(crate) fn unclosed_directive(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1003)
        .with_message(format!("`{name}` is never closed"))
        .with_label(span, "opened here")
}

#[cold]
pub(crate) fn mismatched_end(expected: &str, found: &str, span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1004)
        .with_message(format!("expected the end tag of `{expected}`, found `{found}`"))
        .with_label(span, "mismatched end tag")
}

#[cold]
pub(crate) fn unknown_directive(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1005)
        .with_message(format!("unknown directive `#{name}`"))
        .with_label(span, "not a directive")
}

#[cold]
pub(crate) fn misplaced(what: &str, context: &str, span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1006)
        .with_message(format!("`{what}` can only appear {context}"))
        .with_label(span, "in an invalid position")
}

#[cold]
pub(crate) fn malformed(directive: &str, detail: &str, span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1007)
        .with_message(format!("malformed `{directive}`: {detail}"))
        .with_label(span, detail.to_owned())
}

#[cold]
pub(crate) fn mixed_arguments(span: Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1008)
        .with_message("positional and named arguments mixed in one call")
        .with_label(span, "use either `name=value` pairs or plain values")
}

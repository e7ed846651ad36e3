//! Literal-context checks.
//!
//! Only operands whose variant is fixed by the source text are inspected:
//! scalar literals, sequence and hash literals, ranges. Anything computed at
//! render time is skipped.

use quill_ir::{Expr, ExprKind, OperandCategory};

/// Variant of a statically literal expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum LiteralKind {
    String,
    Number,
    Boolean,
    Sequence,
    Hash,
}

impl LiteralKind {
    pub(crate) fn of(expr: &Expr) -> Option<Self> {
        match expr.kind {
            ExprKind::Str(_) => Some(LiteralKind::String),
            ExprKind::Int(_) | ExprKind::Float(_) => Some(LiteralKind::Number),
            ExprKind::Bool(_) => Some(LiteralKind::Boolean),
            ExprKind::Sequence(_) | ExprKind::Range { .. } => Some(LiteralKind::Sequence),
            ExprKind::Hash(_) => Some(LiteralKind::Hash),
            _ => None,
        }
    }

    pub(crate) fn describe(self) -> &'static str {
        match self {
            LiteralKind::String => "string",
            LiteralKind::Number => "number",
            LiteralKind::Boolean => "boolean",
            LiteralKind::Sequence => "sequence",
            LiteralKind::Hash => "hash",
        }
    }

    fn fits(self, expected: OperandCategory) -> bool {
        match expected {
            OperandCategory::Any => true,
            OperandCategory::String => self == LiteralKind::String,
            OperandCategory::Number => self == LiteralKind::Number,
            OperandCategory::Boolean => self == LiteralKind::Boolean,
            OperandCategory::Scalar => matches!(
                self,
                LiteralKind::String | LiteralKind::Number | LiteralKind::Boolean
            ),
            OperandCategory::Sequence => self == LiteralKind::Sequence,
            OperandCategory::Hash => self == LiteralKind::Hash,
            OperandCategory::SequenceOrHash => {
                matches!(self, LiteralKind::Sequence | LiteralKind::Hash)
            }
            OperandCategory::Date
            | OperandCategory::Node
            | OperandCategory::Macro
            | OperandCategory::Scope
            | OperandCategory::RegexMatch => false,
        }
    }
}

/// The literal's kind when `expr` is a literal that cannot satisfy `expected`.
pub(crate) fn mismatch(expr: &Expr, expected: OperandCategory) -> Option<LiteralKind> {
    LiteralKind::of(expr).filter(|kind| !kind.fits(expected))
}

#[cfg(test)]
mod tests {
    use quill_ir::{Expr, ExprKind, OperandCategory, Span};

    use super::{mismatch, LiteralKind};

    fn lit(kind: ExprKind) -> Expr {
        Expr::new(kind, Span::DUMMY)
    }

    #[test]
    fn scalars_fit_scalar_contexts() {
        let s = lit(ExprKind::Str("a".into()));
        assert_eq!(mismatch(&s, OperandCategory::Scalar), None);
        assert_eq!(mismatch(&s, OperandCategory::String), None);
        assert_eq!(
            mismatch(&s, OperandCategory::Boolean),
            Some(LiteralKind::String)
        );
        assert_eq!(
            mismatch(&s, OperandCategory::SequenceOrHash),
            Some(LiteralKind::String)
        );
    }

    #[test]
    fn collections_do_not_fit_scalar_contexts() {
        let seq = lit(ExprKind::Sequence(Vec::new()));
        assert_eq!(
            mismatch(&seq, OperandCategory::Scalar),
            Some(LiteralKind::Sequence)
        );
        assert_eq!(mismatch(&seq, OperandCategory::SequenceOrHash), None);
    }

    #[test]
    fn non_literals_are_never_reported() {
        let ident = lit(ExprKind::Ident(quill_ir::Name::EMPTY));
        assert_eq!(mismatch(&ident, OperandCategory::Date), None);
    }
}

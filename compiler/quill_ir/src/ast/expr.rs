//! Expression nodes.

use std::fmt;
use std::sync::Arc;

use crate::{BuiltinKind, Name, Span, Spanned};

/// Binary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Binding power for the expression parser (higher binds tighter).
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::NotEq => 3,
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => 4,
            BinaryOp::Add | BinaryOp::Sub => 6,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 7,
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

/// Unary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

impl UnaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
        }
    }
}

/// An expression with its source span.
///
/// Equality compares structure only; spans are ignored so two occurrences of
/// the same expression text compare equal.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Spanned for Expr {
    fn span(&self) -> Span {
        self.span
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Str(Arc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Unqualified variable reference.
    Ident(Name),
    /// Special variable: `.now`, `.locale`, `.namespace`, ...
    Special(Name),
    /// `[a, b, c]`
    Sequence(Vec<Expr>),
    /// `{"k": v, ...}`
    Hash(Vec<(Expr, Expr)>),
    /// `a..b` (inclusive), `a..<b` (exclusive), `a..` (open).
    Range {
        start: Box<Expr>,
        end: Option<Box<Expr>>,
        inclusive: bool,
    },
    /// `target.name`
    Member { target: Box<Expr>, name: Name },
    /// `target[key]`
    Index { target: Box<Expr>, key: Box<Expr> },
    /// `callee(args)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `target?name` / `target?name(args)`; `builtin` is filled by the annotator.
    Builtin {
        target: Box<Expr>,
        name: Name,
        builtin: Option<BuiltinKind>,
        args: Option<Vec<Expr>>,
    },
    /// `target??`
    Exists(Box<Expr>),
    /// `value!fallback` / `value!`
    Default {
        value: Box<Expr>,
        fallback: Option<Box<Expr>>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Placeholder in an escape transform, substituted by the annotator.
    EscapeHole,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }

    /// True for string, number and boolean literals.
    pub fn is_scalar_literal(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Str(_) | ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::Bool(_)
        )
    }

    /// Replace every `EscapeHole` with `replacement`.
    #[must_use]
    pub fn fill_hole(&self, replacement: &Expr) -> Expr {
        let mut expr = self.clone();
        expr.fill_hole_in_place(replacement);
        expr
    }

    fn fill_hole_in_place(&mut self, replacement: &Expr) {
        if matches!(self.kind, ExprKind::EscapeHole) {
            *self = replacement.clone();
            return;
        }
        match &mut self.kind {
            ExprKind::EscapeHole
            | ExprKind::Str(_)
            | ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Bool(_)
            | ExprKind::Ident(_)
            | ExprKind::Special(_) => {}
            ExprKind::Sequence(items) => {
                for item in items {
                    item.fill_hole_in_place(replacement);
                }
            }
            ExprKind::Hash(entries) => {
                for (k, v) in entries {
                    k.fill_hole_in_place(replacement);
                    v.fill_hole_in_place(replacement);
                }
            }
            ExprKind::Range { start, end, .. } => {
                start.fill_hole_in_place(replacement);
                if let Some(end) = end {
                    end.fill_hole_in_place(replacement);
                }
            }
            ExprKind::Member { target, .. } | ExprKind::Exists(target) => {
                target.fill_hole_in_place(replacement);
            }
            ExprKind::Index { target, key } => {
                target.fill_hole_in_place(replacement);
                key.fill_hole_in_place(replacement);
            }
            ExprKind::Call { callee, args } => {
                callee.fill_hole_in_place(replacement);
                for arg in args {
                    arg.fill_hole_in_place(replacement);
                }
            }
            ExprKind::Builtin { target, args, .. } => {
                target.fill_hole_in_place(replacement);
                for arg in args.iter_mut().flatten() {
                    arg.fill_hole_in_place(replacement);
                }
            }
            ExprKind::Default { value, fallback } => {
                value.fill_hole_in_place(replacement);
                if let Some(fallback) = fallback {
                    fallback.fill_hole_in_place(replacement);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                left.fill_hole_in_place(replacement);
                right.fill_hole_in_place(replacement);
            }
            ExprKind::Unary { operand, .. } => operand.fill_hole_in_place(replacement),
        }
    }

    /// Replace free references to `placeholder` with `EscapeHole`.
    #[must_use]
    pub fn punch_hole(&self, placeholder: Name) -> Expr {
        let mut expr = self.clone();
        expr.replace_ident(placeholder);
        expr
    }

    fn replace_ident(&mut self, placeholder: Name) {
        if let ExprKind::Ident(name) = self.kind {
            if name == placeholder {
                *self = Expr::new(ExprKind::EscapeHole, self.span);
            }
            return;
        }
        match &mut self.kind {
            ExprKind::Sequence(items) => {
                for item in items {
                    item.replace_ident(placeholder);
                }
            }
            ExprKind::Hash(entries) => {
                for (k, v) in entries {
                    k.replace_ident(placeholder);
                    v.replace_ident(placeholder);
                }
            }
            ExprKind::Range { start, end, .. } => {
                start.replace_ident(placeholder);
                if let Some(end) = end {
                    end.replace_ident(placeholder);
                }
            }
            ExprKind::Member { target, .. } | ExprKind::Exists(target) => {
                target.replace_ident(placeholder);
            }
            ExprKind::Index { target, key } => {
                target.replace_ident(placeholder);
                key.replace_ident(placeholder);
            }
            ExprKind::Call { callee, args } => {
                callee.replace_ident(placeholder);
                for arg in args {
                    arg.replace_ident(placeholder);
                }
            }
            ExprKind::Builtin { target, args, .. } => {
                target.replace_ident(placeholder);
                for arg in args.iter_mut().flatten() {
                    arg.replace_ident(placeholder);
                }
            }
            ExprKind::Default { value, fallback } => {
                value.replace_ident(placeholder);
                if let Some(fallback) = fallback {
                    fallback.replace_ident(placeholder);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                left.replace_ident(placeholder);
                right.replace_ident(placeholder);
            }
            ExprKind::Unary { operand, .. } => operand.replace_ident(placeholder),
            ExprKind::Str(_)
            | ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Bool(_)
            | ExprKind::Ident(_)
            | ExprKind::Special(_)
            | ExprKind::EscapeHole => {}
        }
    }
}

//! Quill IR: core data structures shared by every phase of the template
//! engine.
//!
//! - Spans for source locations
//! - Names for interned identifiers
//! - Locales for localized template lookup
//! - Builtin identifiers
//! - Template AST nodes
//!
//! # Design Philosophy
//!
//! - **Intern identifiers**: variable, parameter and macro names are `Name(u32)`
//! - **Freeze after annotation**: the AST is mutable only until the annotator
//!   finishes, then shared read-only (`Arc`) across concurrent renders

pub mod ast;
mod builtin;
mod interner;
mod locale;
mod name;
mod span;

pub use ast::{
    AssignScope, Assignment, BinaryOp, Block, CallArgs, CallBody, CallNode, DeclaredSet, Expr,
    ExprKind, IfBranch, ListNode, MacroDef, MacroKind, NamedArg, Node, NodeKind, Param,
    SwitchCase, Template, UnaryOp,
};
pub use builtin::{BuiltinKind, OperandCategory};
pub use interner::{InternError, SharedInterner, StringInterner};
pub use locale::{localized_names, Locale};
pub use name::Name;
pub use span::{Span, Spanned};

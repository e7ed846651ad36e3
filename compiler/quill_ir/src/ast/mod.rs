//! Template AST.
//!
//! The parser produces a raw [`Template`]; the annotator rewrites it in place
//! (escapes, builtin binding, declared sets, simplifications) and freezes it.
//! After that the tree is shared read-only between concurrent renders.

mod declared;
mod expr;

use std::sync::Arc;

pub use declared::DeclaredSet;
pub use expr::{BinaryOp, Expr, ExprKind, UnaryOp};

use crate::{Name, Span, Spanned};

/// A parsed template.
#[derive(Clone, Debug)]
pub struct Template {
    /// Name the template was loaded under (used in error locations).
    pub name: Arc<str>,
    /// Full source text, kept for line/column mapping.
    pub source: Arc<str>,
    /// Top-level content. Its declared set holds the names assigned at top
    /// level.
    pub root: Block,
    /// Macros and functions defined at the top level, bound into the
    /// template's namespace before its content runs.
    pub macros: Vec<Arc<MacroDef>>,
}

/// A sequence of nodes that owns a variable frame at runtime.
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub nodes: Vec<Node>,
    /// Names this block may bind without reaching an outer frame.
    pub declared: DeclaredSet,
}

impl Block {
    pub fn new(nodes: Vec<Node>) -> Self {
        Block {
            nodes,
            declared: DeclaredSet::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Node { kind, span }
    }

    /// Directive name used in diagnostics (`#list`, `@call`, `${...}`).
    pub fn describe(&self) -> &'static str {
        self.kind.describe()
    }
}

impl Spanned for Node {
    fn span(&self) -> Span {
        self.span
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Text(Arc<str>),
    /// `${expr}`
    Interpolation(Expr),
    /// `[#if]...[#elseif]...[#else]...[/#if]`
    If {
        branches: Vec<IfBranch>,
        otherwise: Option<Vec<Node>>,
    },
    /// `[#switch]` with `[#case]`/`[#default]`.
    Switch { value: Expr, cases: Vec<SwitchCase> },
    /// `[#list seq as var]body[#else]otherwise[/#list]`
    List(Box<ListNode>),
    Break,
    /// `[#assign]`, `[#global]`, `[#local]`
    Assign {
        scope: AssignScope,
        assignments: Vec<Assignment>,
    },
    /// `[#macro]` / `[#function]` nested below the top level.
    Macro(Arc<MacroDef>),
    Return(Option<Expr>),
    /// `[#nested args]`
    Nested(Vec<Expr>),
    Fallback,
    /// `[@callee args; params]body[/@]`
    Call(Box<CallNode>),
    Attempt {
        body: Vec<Node>,
        recover: Vec<Node>,
    },
    /// `[#escape placeholder as transform]`
    Escape {
        placeholder: Name,
        transform: Expr,
        body: Vec<Node>,
    },
    NoEscape(Vec<Node>),
    Compress(Vec<Node>),
    Include {
        template: Expr,
    },
    Import {
        template: Expr,
        alias: Name,
    },
    Visit {
        node: Expr,
        using: Vec<Expr>,
    },
    Recurse {
        node: Option<Expr>,
        using: Vec<Expr>,
    },
    Stop(Option<Expr>),
    Setting {
        name: Name,
        value: Expr,
    },
}

impl NodeKind {
    pub fn describe(&self) -> &'static str {
        match self {
            NodeKind::Text(_) => "text",
            NodeKind::Interpolation(_) => "${...}",
            NodeKind::If { .. } => "#if",
            NodeKind::Switch { .. } => "#switch",
            NodeKind::List(_) => "#list",
            NodeKind::Break => "#break",
            NodeKind::Assign { scope, .. } => scope.directive(),
            NodeKind::Macro(def) => def.kind.directive(),
            NodeKind::Return(_) => "#return",
            NodeKind::Nested(_) => "#nested",
            NodeKind::Fallback => "#fallback",
            NodeKind::Call(_) => "@call",
            NodeKind::Attempt { .. } => "#attempt",
            NodeKind::Escape { .. } => "#escape",
            NodeKind::NoEscape(_) => "#noescape",
            NodeKind::Compress(_) => "#compress",
            NodeKind::Include { .. } => "#include",
            NodeKind::Import { .. } => "#import",
            NodeKind::Visit { .. } => "#visit",
            NodeKind::Recurse { .. } => "#recurse",
            NodeKind::Stop(_) => "#stop",
            NodeKind::Setting { .. } => "#setting",
        }
    }
}

#[derive(Clone, Debug)]
pub struct IfBranch {
    pub condition: Expr,
    pub body: Vec<Node>,
    pub span: Span,
}

/// A `[#case a, b]` (values) or `[#default]` (no values) arm.
#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub values: Option<Vec<Expr>>,
    pub body: Vec<Node>,
    pub span: Span,
}

impl SwitchCase {
    pub fn is_default(&self) -> bool {
        self.values.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct ListNode {
    pub sequence: Expr,
    /// Loop variable; the body also declares `<var>_index` and `<var>_has_next`.
    pub var: Name,
    pub body: Block,
    pub otherwise: Option<Vec<Node>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssignScope {
    /// `[#assign]`: nearest frame declaring the name, else the namespace.
    Plain,
    /// `[#global]`: the global frame.
    Global,
    /// `[#local]`: the nearest macro frame.
    Local,
}

impl AssignScope {
    pub fn directive(self) -> &'static str {
        match self {
            AssignScope::Plain => "#assign",
            AssignScope::Global => "#global",
            AssignScope::Local => "#local",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Assignment {
    pub name: Name,
    pub value: Expr,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MacroKind {
    /// Produces output; `return` carries no value.
    Macro,
    /// Produces a value; every fall-through path must `return <value>`.
    Function,
    /// Template fragment compiled at render time by `?interpret`.
    Fragment,
}

impl MacroKind {
    pub fn directive(self) -> &'static str {
        match self {
            MacroKind::Macro => "#macro",
            MacroKind::Function => "#function",
            MacroKind::Fragment => "?interpret",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: Name,
    pub default: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct MacroDef {
    pub name: Name,
    pub kind: MacroKind,
    pub params: Vec<Param>,
    /// `rest...` parameter collecting extra arguments.
    pub catch_all: Option<Name>,
    /// Body; its declared set holds the parameters and `local` names.
    pub body: Block,
    pub span: Span,
}

impl MacroDef {
    pub fn is_function(&self) -> bool {
        self.kind == MacroKind::Function
    }
}

#[derive(Clone, Debug)]
pub enum CallArgs {
    Positional(Vec<Expr>),
    Named(Vec<NamedArg>),
}

impl CallArgs {
    pub fn is_empty(&self) -> bool {
        match self {
            CallArgs::Positional(args) => args.is_empty(),
            CallArgs::Named(args) => args.is_empty(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct NamedArg {
    pub name: Name,
    pub value: Expr,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct CallNode {
    pub callee: Expr,
    pub args: CallArgs,
    /// Content between `[@x]` and `[/@x]`, re-entered by `[#nested]`.
    pub body: Option<Arc<CallBody>>,
}

/// Caller-supplied body content and the parameters `[#nested]` binds for it.
#[derive(Clone, Debug)]
pub struct CallBody {
    pub params: Vec<Name>,
    pub block: Block,
}

//! The annotating traversal.

use std::sync::Arc;

use quill_diagnostic::{Diagnostic, ErrorCode, Problems};
use quill_ir::{
    AssignScope, BinaryOp, BuiltinKind, CallArgs, DeclaredSet, Expr, ExprKind, MacroDef,
    MacroKind, Name, Node, NodeKind, OperandCategory, Span, StringInterner, Template, UnaryOp,
};
use quill_stack::ensure_sufficient_stack;
use rustc_hash::FxHashSet;

use crate::escape::EscapeStack;
use crate::literal;
use crate::returns::always_returns;
use crate::simplify;
use crate::CheckOptions;

/// Settings the `[#setting]` directive accepts.
const SETTINGS: &[&str] = &["locale", "time_zone"];

/// Enclosing construct, for structural checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Context {
    Macro(MacroKind),
    List,
    Switch,
    /// Caller-supplied body of `[@call]...[/@call]`.
    CallBody,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FrameKind {
    Root,
    Macro,
    List,
    CallBody,
}

/// Names collected for one frame-owning block.
struct Frame {
    kind: FrameKind,
    names: FxHashSet<Name>,
}

pub(crate) struct Annotator<'a> {
    interner: &'a StringInterner,
    options: &'a CheckOptions,
    problems: Problems,
    contexts: Vec<Context>,
    frames: Vec<Frame>,
    escapes: EscapeStack,
}

impl<'a> Annotator<'a> {
    pub(crate) fn new(interner: &'a StringInterner, options: &'a CheckOptions) -> Self {
        Annotator {
            interner,
            options,
            problems: Problems::new(),
            contexts: Vec::new(),
            frames: Vec::new(),
            escapes: EscapeStack::default(),
        }
    }

    pub(crate) fn finish(self) -> Problems {
        self.problems
    }

    pub(crate) fn template(&mut self, template: &mut Template) {
        self.frames.push(Frame {
            kind: FrameKind::Root,
            names: FxHashSet::default(),
        });
        for def in &mut template.macros {
            self.declare_in_root(def.name);
            self.macro_def(Arc::make_mut(def));
        }
        self.nodes(&mut template.root.nodes);
        if let Some(root) = self.frames.pop() {
            template.root.declared = DeclaredSet::from_names(root.names);
        }
    }

    fn name(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    fn nodes(&mut self, nodes: &mut Vec<Node>) {
        let input = std::mem::take(nodes);
        let mut out = Vec::with_capacity(input.len());
        for node in input {
            ensure_sufficient_stack(|| self.node(node, &mut out));
        }
        simplify::merge_text(&mut out);
        if self.options.strip_whitespace {
            simplify::strip_blank_lines(&mut out);
        }
        *nodes = out;
    }

    fn node(&mut self, mut node: Node, out: &mut Vec<Node>) {
        let span = node.span;
        match &mut node.kind {
            NodeKind::Text(_) => {}
            NodeKind::Interpolation(expr) => {
                self.expr(expr, OperandCategory::Scalar);
                let taken = std::mem::replace(expr, Expr::new(ExprKind::Bool(false), span));
                *expr = self.escapes.apply(taken);
            }
            NodeKind::If {
                branches,
                otherwise,
            } => {
                for branch in branches.iter_mut() {
                    self.expr(&mut branch.condition, OperandCategory::Boolean);
                    self.nodes(&mut branch.body);
                }
                if let Some(otherwise) = otherwise {
                    self.nodes(otherwise);
                }
            }
            NodeKind::Switch { value, cases } => {
                self.expr(value, OperandCategory::Scalar);
                let mut seen_default: Option<Span> = None;
                self.contexts.push(Context::Switch);
                for case in cases.iter_mut() {
                    match (&mut case.values, seen_default) {
                        (None, Some(first)) => self.problems.push(
                            Diagnostic::error(ErrorCode::E2006)
                                .with_message("a switch can have only one `#default`")
                                .with_label(case.span, "second default")
                                .with_secondary_label(first, "first default here"),
                        ),
                        (None, None) => seen_default = Some(case.span),
                        (Some(values), _) => {
                            for value in values {
                                self.expr(value, OperandCategory::Scalar);
                            }
                        }
                    }
                    self.nodes(&mut case.body);
                }
                self.contexts.pop();
                let NodeKind::Switch { value, cases } =
                    std::mem::replace(&mut node.kind, NodeKind::Break)
                else {
                    return;
                };
                node.kind = simplify::single_case_switch(value, cases, span);
            }
            NodeKind::List(list) => {
                self.expr(&mut list.sequence, OperandCategory::SequenceOrHash);
                let var = self.name(list.var);
                let companions = [
                    list.var,
                    self.interner.intern(&format!("{var}_index")),
                    self.interner.intern(&format!("{var}_has_next")),
                ];
                self.contexts.push(Context::List);
                list.body.declared = self.frame(FrameKind::List, companions, |this| {
                    this.nodes(&mut list.body.nodes);
                });
                self.contexts.pop();
                if let Some(otherwise) = &mut list.otherwise {
                    self.nodes(otherwise);
                }
            }
            NodeKind::Break => {
                let allowed = self
                    .contexts
                    .last()
                    .is_some_and(|c| matches!(c, Context::List | Context::Switch));
                if !allowed {
                    self.problems.push(
                        Diagnostic::error(ErrorCode::E2003)
                            .with_message("`#break` can only appear inside `#list` or `#switch`")
                            .with_label(span, "not inside a loop or switch"),
                    );
                }
            }
            NodeKind::Assign { scope, assignments } => {
                let scope = *scope;
                for assignment in assignments.iter_mut() {
                    self.expr(&mut assignment.value, OperandCategory::Any);
                    match scope {
                        AssignScope::Plain | AssignScope::Global => {
                            self.declare_in_root(assignment.name);
                        }
                        AssignScope::Local => self.declare_local(assignment.name, assignment.span),
                    }
                }
            }
            NodeKind::Macro(def) => {
                self.declare_in_root(def.name);
                self.macro_def(Arc::make_mut(def));
            }
            NodeKind::Return(value) => {
                match self.enclosing_macro() {
                    None => self.problems.push(
                        Diagnostic::error(ErrorCode::E2001)
                            .with_message("`#return` can only appear inside a macro or function")
                            .with_label(span, "not inside a macro or function"),
                    ),
                    Some(MacroKind::Function) if value.is_none() => self.problems.push(
                        Diagnostic::error(ErrorCode::E2013)
                            .with_message("`#return` in a function must carry a value")
                            .with_label(span, "missing return value"),
                    ),
                    Some(MacroKind::Macro) if value.is_some() => self.problems.push(
                        Diagnostic::error(ErrorCode::E2005)
                            .with_message("a macro cannot return a value")
                            .with_label(span, "value returned here")
                            .with_note("use `#function` to compute a value"),
                    ),
                    Some(_) => {}
                }
                if let Some(value) = value {
                    self.expr(value, OperandCategory::Any);
                }
            }
            NodeKind::Nested(args) => {
                self.require_macro("#nested", span);
                for arg in args {
                    self.expr(arg, OperandCategory::Any);
                }
            }
            NodeKind::Fallback => self.require_macro("#fallback", span),
            NodeKind::Call(call) => {
                self.expr(&mut call.callee, OperandCategory::Macro);
                match &mut call.args {
                    CallArgs::Positional(args) => {
                        for arg in args {
                            self.expr(arg, OperandCategory::Any);
                        }
                    }
                    CallArgs::Named(args) => {
                        let mut seen = FxHashSet::default();
                        for arg in args {
                            if !seen.insert(arg.name) {
                                let name = self.name(arg.name);
                                self.problems.push(
                                    Diagnostic::error(ErrorCode::E2010)
                                        .with_message(format!("argument `{name}` is passed twice"))
                                        .with_label(arg.span, "duplicate argument"),
                                );
                            }
                            self.expr(&mut arg.value, OperandCategory::Any);
                        }
                    }
                }
                if let Some(body) = &mut call.body {
                    let body = Arc::make_mut(body);
                    let params = body.params.clone();
                    self.contexts.push(Context::CallBody);
                    body.block.declared = self.frame(FrameKind::CallBody, params, |this| {
                        this.nodes(&mut body.block.nodes);
                    });
                    self.contexts.pop();
                }
            }
            NodeKind::Attempt { body, recover } => {
                self.nodes(body);
                self.nodes(recover);
            }
            NodeKind::Escape {
                placeholder,
                transform,
                body,
            } => {
                self.expr(transform, OperandCategory::Any);
                self.escapes.push(transform.punch_hole(*placeholder));
                self.nodes(body);
                self.escapes.pop();
                out.append(body);
                return;
            }
            NodeKind::NoEscape(body) => {
                let suspended = self.escapes.suspend();
                self.nodes(body);
                self.escapes.resume(suspended);
                out.append(body);
                return;
            }
            NodeKind::Compress(body) => self.nodes(body),
            NodeKind::Include { template } => self.expr(template, OperandCategory::String),
            NodeKind::Import { template, alias } => {
                self.expr(template, OperandCategory::String);
                self.declare_in_root(*alias);
            }
            NodeKind::Visit { node: target, using } => {
                self.expr(target, OperandCategory::Node);
                for ns in using {
                    self.expr(ns, OperandCategory::Any);
                }
            }
            NodeKind::Recurse { node: target, using } => {
                if let Some(target) = target {
                    self.expr(target, OperandCategory::Node);
                }
                for ns in using {
                    self.expr(ns, OperandCategory::Any);
                }
            }
            NodeKind::Stop(value) => {
                if let Some(value) = value {
                    self.expr(value, OperandCategory::String);
                }
            }
            NodeKind::Setting { name, value } => {
                let setting = self.name(*name);
                if !SETTINGS.contains(&setting) {
                    self.problems.push(
                        Diagnostic::error(ErrorCode::E2012)
                            .with_message(format!("unknown setting `{setting}`"))
                            .with_label(span, "not a setting")
                            .with_note("supported settings are `locale` and `time_zone`"),
                    );
                }
                self.expr(value, OperandCategory::String);
            }
        }
        out.push(node);
    }

    fn macro_def(&mut self, def: &mut MacroDef) {
        let mut names = FxHashSet::default();
        let mut first_default: Option<Span> = None;
        for param in &def.params {
            if !names.insert(param.name) {
                self.duplicate_param(param.name, param.span);
            }
            match (&param.default, first_default) {
                (Some(_), None) => first_default = Some(param.span),
                (None, Some(optional)) => {
                    let name = self.name(param.name);
                    self.problems.push(
                        Diagnostic::error(ErrorCode::E2011)
                            .with_message(format!(
                                "required parameter `{name}` follows a parameter with a default"
                            ))
                            .with_label(param.span, "required parameter")
                            .with_secondary_label(optional, "first parameter with a default"),
                    );
                }
                _ => {}
            }
        }
        if let Some(rest) = def.catch_all {
            if !names.insert(rest) {
                self.duplicate_param(rest, def.span);
            }
        }

        self.contexts.push(Context::Macro(def.kind));
        let params: Vec<Name> = names.into_iter().collect();
        // Defaults run inside the new frame, so they see earlier parameters.
        def.body.declared = self.frame(FrameKind::Macro, params, |this| {
            for param in &mut def.params {
                if let Some(default) = &mut param.default {
                    this.expr(default, OperandCategory::Any);
                }
            }
            this.nodes(&mut def.body.nodes);
        });
        self.contexts.pop();

        if def.is_function() && !always_returns(&def.body.nodes) {
            let name = self.name(def.name);
            self.problems.push(
                Diagnostic::error(ErrorCode::E2004)
                    .with_message("function must return a value")
                    .with_label(
                        def.span,
                        format!("function `{name}` can finish without `#return`"),
                    )
                    .with_note("every path through a function must end in `[#return value]`"),
            );
        }
    }

    /// Run `f` with a new frame collecting declared names, then freeze them.
    fn frame(
        &mut self,
        kind: FrameKind,
        initial: impl IntoIterator<Item = Name>,
        f: impl FnOnce(&mut Self),
    ) -> DeclaredSet {
        self.frames.push(Frame {
            kind,
            names: initial.into_iter().collect(),
        });
        f(self);
        self.frames
            .pop()
            .map(|frame| DeclaredSet::from_names(frame.names))
            .unwrap_or_default()
    }

    fn declare_in_root(&mut self, name: Name) {
        if let Some(root) = self.frames.first_mut() {
            root.names.insert(name);
        }
    }

    fn declare_local(&mut self, name: Name, span: Span) {
        match self
            .frames
            .iter_mut()
            .rev()
            .find(|frame| frame.kind == FrameKind::Macro)
        {
            Some(frame) => {
                frame.names.insert(name);
            }
            None => self.problems.push(
                Diagnostic::error(ErrorCode::E2007)
                    .with_message("`#local` can only appear inside a macro or function")
                    .with_label(span, "no enclosing macro frame")
                    .with_note("use `#assign` or `#global` outside macros"),
            ),
        }
    }

    /// Kind of the innermost macro, looking through loops, switches and call
    /// bodies.
    fn enclosing_macro(&self) -> Option<MacroKind> {
        self.contexts.iter().rev().find_map(|c| match c {
            Context::Macro(kind) => Some(*kind),
            _ => None,
        })
    }

    fn require_macro(&mut self, directive: &str, span: Span) {
        if self.enclosing_macro().is_none() {
            self.problems.push(
                Diagnostic::error(ErrorCode::E2002)
                    .with_message(format!("`{directive}` can only appear inside a macro"))
                    .with_label(span, "not inside a macro"),
            );
        }
    }

    fn duplicate_param(&mut self, name: Name, span: Span) {
        let name = self.name(name);
        self.problems.push(
            Diagnostic::error(ErrorCode::E2010)
                .with_message(format!("parameter `{name}` is declared twice"))
                .with_label(span, "duplicate parameter"),
        );
    }

    /// Resolve builtins and check literal operands in `expr`, which is used
    /// where a value of category `expected` is needed.
    fn expr(&mut self, expr: &mut Expr, expected: OperandCategory) {
        self.check_literal(expr, expected);
        ensure_sufficient_stack(|| self.expr_children(expr));
    }

    fn expr_children(&mut self, expr: &mut Expr) {
        let span = expr.span;
        match &mut expr.kind {
            ExprKind::Str(_)
            | ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Bool(_)
            | ExprKind::Ident(_)
            | ExprKind::Special(_)
            | ExprKind::EscapeHole => {}
            ExprKind::Sequence(items) => {
                for item in items {
                    self.expr(item, OperandCategory::Any);
                }
            }
            ExprKind::Hash(entries) => {
                for (key, value) in entries {
                    self.expr(key, OperandCategory::String);
                    self.expr(value, OperandCategory::Any);
                }
            }
            ExprKind::Range { start, end, .. } => {
                self.expr(start, OperandCategory::Number);
                if let Some(end) = end {
                    self.expr(end, OperandCategory::Number);
                }
            }
            ExprKind::Member { target, .. } => self.expr(target, OperandCategory::Hash),
            ExprKind::Index { target, key } => {
                self.expr(target, OperandCategory::SequenceOrHash);
                self.expr(key, OperandCategory::Scalar);
            }
            ExprKind::Call { callee, args } => {
                self.expr(callee, OperandCategory::Macro);
                for arg in args {
                    self.expr(arg, OperandCategory::Any);
                }
            }
            ExprKind::Builtin {
                target,
                name,
                builtin,
                args,
            } => {
                let resolved = BuiltinKind::from_name(self.name(*name));
                *builtin = resolved;
                let expected = match resolved {
                    Some(kind) => kind.operand(),
                    None => {
                        let name = self.name(*name);
                        self.problems.push(
                            Diagnostic::error(ErrorCode::E2008)
                                .with_message(format!("unknown builtin `?{name}`"))
                                .with_label(span, "no such builtin"),
                        );
                        OperandCategory::Any
                    }
                };
                self.expr(target, expected);
                for arg in args.iter_mut().flatten() {
                    self.expr(arg, OperandCategory::Any);
                }
            }
            ExprKind::Exists(target) => self.expr(target, OperandCategory::Any),
            ExprKind::Default { value, fallback } => {
                self.expr(value, OperandCategory::Any);
                if let Some(fallback) = fallback {
                    self.expr(fallback, OperandCategory::Any);
                }
            }
            ExprKind::Binary { op, left, right } => {
                let expected = if op.is_logical() {
                    OperandCategory::Boolean
                } else if op.is_arithmetic() {
                    OperandCategory::Number
                } else {
                    match op {
                        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                            OperandCategory::Scalar
                        }
                        _ => OperandCategory::Any,
                    }
                };
                self.expr(left, expected);
                self.expr(right, expected);
            }
            ExprKind::Unary { op, operand } => {
                let expected = match op {
                    UnaryOp::Not => OperandCategory::Boolean,
                    UnaryOp::Neg | UnaryOp::Plus => OperandCategory::Number,
                };
                self.expr(operand, expected);
            }
        }
    }

    fn check_literal(&mut self, expr: &Expr, expected: OperandCategory) {
        let Some(found) = literal::mismatch(expr, expected) else {
            return;
        };
        let found = found.describe();
        let diagnostic = Diagnostic::warning(ErrorCode::W2001)
            .with_message(format!("expected {expected}, found a {found} literal"))
            .with_label(expr.span, format!("{found} literal"));
        let diagnostic = if self.options.literal_type_check_fatal {
            Diagnostic {
                code: ErrorCode::E2009,
                ..diagnostic.into_error()
            }
        } else {
            diagnostic
        };
        self.problems.push(diagnostic);
    }
}

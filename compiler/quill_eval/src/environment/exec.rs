//! Directive execution.

use std::sync::Arc;

use quill_ir::{
    AssignScope, Assignment, Block, ExprKind, IfBranch, ListNode, Name, Node, NodeKind, SwitchCase,
};
use quill_stack::ensure_sufficient_stack;
use quill_value::{
    invalid_builtin_value, invalid_scope_target, stopped, type_mismatch, Capabilities, EvalError,
    MacroValue, ScopeId, Value,
};

use super::{Evaluator, Flow};
use crate::operators::values_equal;
use crate::output::compress;
use crate::provider::resolve_template_name;
use crate::scope::FrameKind;

impl Evaluator<'_, '_> {
    pub(crate) fn exec_nodes(&mut self, nodes: &[Node]) -> Result<Flow, EvalError> {
        for node in nodes {
            let flow = self.exec_node(node)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_node(&mut self, node: &Node) -> Result<Flow, EvalError> {
        ensure_sufficient_stack(|| self.exec_node_inner(node))
            .map_err(|e| e.with_span(node.span).with_origin(&self.origin))
    }

    fn exec_node_inner(&mut self, node: &Node) -> Result<Flow, EvalError> {
        match &node.kind {
            NodeKind::Text(text) => {
                self.out.write(text)?;
                Ok(Flow::Normal)
            }
            NodeKind::Interpolation(expr) => {
                let value = self.eval(expr)?;
                let text = self.interpolate(&value)?;
                self.out.write(&text)?;
                Ok(Flow::Normal)
            }
            NodeKind::If {
                branches,
                otherwise,
            } => self.exec_if(branches, otherwise.as_deref()),
            NodeKind::Switch { value, cases } => self.exec_switch(value, cases),
            NodeKind::List(list) => self.exec_list(list),
            NodeKind::Break => Ok(Flow::Break),
            NodeKind::Assign { scope, assignments } => {
                self.exec_assign(*scope, assignments)?;
                Ok(Flow::Normal)
            }
            NodeKind::Macro(def) => {
                let value = MacroValue::new(Arc::clone(def), self.namespace, self.origin.clone());
                self.scopes
                    .set(self.namespace, def.name, Value::Macro(value))?;
                Ok(Flow::Normal)
            }
            NodeKind::Return(value) => {
                let value = value.as_ref().map(|e| self.eval(e)).transpose()?;
                Ok(Flow::Return(value))
            }
            NodeKind::Nested(args) => {
                self.exec_nested(args)?;
                Ok(Flow::Normal)
            }
            NodeKind::Fallback => {
                self.exec_fallback()?;
                Ok(Flow::Normal)
            }
            NodeKind::Call(call) => {
                self.exec_call(call, node.span)?;
                Ok(Flow::Normal)
            }
            NodeKind::Attempt { body, recover } => self.exec_attempt(body, recover),
            NodeKind::Escape { body, .. } | NodeKind::NoEscape(body) => self.exec_nodes(body),
            NodeKind::Compress(body) => {
                self.out.begin_capture();
                let flow = self.exec_nodes(body);
                let captured = self.out.end_capture();
                let flow = flow?;
                self.out.write(&compress(&captured))?;
                Ok(flow)
            }
            NodeKind::Include { template } => {
                self.exec_include(template)?;
                Ok(Flow::Normal)
            }
            NodeKind::Import { template, alias } => {
                self.exec_import(template, *alias)?;
                Ok(Flow::Normal)
            }
            NodeKind::Visit { node: target, using } => {
                let target = self.eval(target)?;
                self.exec_visit(&target, using)?;
                Ok(Flow::Normal)
            }
            NodeKind::Recurse { node: target, using } => {
                self.exec_recurse(target.as_ref(), using)?;
                Ok(Flow::Normal)
            }
            NodeKind::Stop(reason) => {
                let reason = match reason {
                    Some(expr) => match self.eval(expr)? {
                        Value::Str(s) => Some(s.to_string()),
                        other => return Err(type_mismatch("string", &other)),
                    },
                    None => None,
                };
                Err(stopped(reason))
            }
            NodeKind::Setting { name, value } => {
                self.exec_setting(*name, value)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Condition of `[#if]`: a boolean, or a regular-expression match that
    /// covers the whole string.
    pub(crate) fn truthy(&self, value: &Value) -> Result<bool, EvalError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Match(m) => Ok(m.entire),
            other => Err(type_mismatch("boolean", other)),
        }
    }

    fn exec_if(
        &mut self,
        branches: &[IfBranch],
        otherwise: Option<&[Node]>,
    ) -> Result<Flow, EvalError> {
        for branch in branches {
            let condition = self.eval(&branch.condition)?;
            if self.truthy(&condition)? {
                return self.exec_nodes(&branch.body);
            }
        }
        match otherwise {
            Some(nodes) => self.exec_nodes(nodes),
            None => Ok(Flow::Normal),
        }
    }

    /// Cases are tested in order; execution falls through into following
    /// cases until a `[#break]`.
    fn exec_switch(
        &mut self,
        value: &quill_ir::Expr,
        cases: &[SwitchCase],
    ) -> Result<Flow, EvalError> {
        let subject = self.eval(value)?;
        let mut start = None;
        for (i, case) in cases.iter().enumerate() {
            let Some(values) = &case.values else {
                continue;
            };
            for candidate in values {
                let candidate = self.eval(candidate)?;
                if values_equal(&subject, &candidate, quill_ir::BinaryOp::Eq)? {
                    start = Some(i);
                    break;
                }
            }
            if start.is_some() {
                break;
            }
        }
        let start = start.or_else(|| cases.iter().position(SwitchCase::is_default));
        let Some(start) = start else {
            return Ok(Flow::Normal);
        };
        for case in &cases[start..] {
            match self.exec_nodes(&case.body)? {
                Flow::Normal => {}
                Flow::Break => return Ok(Flow::Normal),
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_list(&mut self, list: &ListNode) -> Result<Flow, EvalError> {
        let items = self.list_items(&list.sequence)?;
        if items.is_empty() {
            return match &list.otherwise {
                Some(nodes) => self.exec_nodes(nodes),
                None => Ok(Flow::Normal),
            };
        }
        let interner = self.env.interner;
        let var = list.var;
        let var_name = interner.lookup(var);
        let index_name = interner.intern(&format!("{var_name}_index"));
        let has_next_name = interner.intern(&format!("{var_name}_has_next"));

        let frame = self
            .scopes
            .push(FrameKind::LoopBody, list.body.declared.clone(), Some(self.scope));
        let saved_scope = self.scope;
        self.scope = frame;
        let result = self.run_loop(&list.body, items, [var, index_name, has_next_name]);
        self.scope = saved_scope;
        self.scopes.release(frame);
        result
    }

    fn run_loop(
        &mut self,
        body: &Block,
        items: ListItems,
        [var, index_name, has_next_name]: [Name; 3],
    ) -> Result<Flow, EvalError> {
        let frame = self.scope;
        let mut items = items.into_iter().peekable();
        let mut index: i64 = 0;
        while let Some(item) = items.next() {
            let item = item?;
            self.scopes.set(frame, var, item)?;
            self.scopes.set(frame, index_name, Value::Int(index))?;
            self.scopes
                .set(frame, has_next_name, Value::Bool(items.peek().is_some()))?;
            match self.exec_nodes(&body.nodes)? {
                Flow::Normal => {}
                Flow::Break => break,
                flow @ Flow::Return(_) => return Ok(flow),
            }
            index = index.saturating_add(1);
        }
        Ok(Flow::Normal)
    }

    fn exec_assign(
        &mut self,
        scope: AssignScope,
        assignments: &[Assignment],
    ) -> Result<(), EvalError> {
        for assignment in assignments {
            let value = self
                .eval(&assignment.value)
                .map_err(|e| e.with_span(assignment.span))?;
            let target = match scope {
                AssignScope::Plain => self.scopes.assignment_target(self.scope, assignment.name)?,
                AssignScope::Global => self.global,
                AssignScope::Local => self
                    .scopes
                    .nearest(self.scope, FrameKind::Macro)?
                    .ok_or_else(|| invalid_scope_target(self.name_str(assignment.name)))?,
            };
            self.scopes.set(target, assignment.name, value)?;
        }
        Ok(())
    }

    /// `[#attempt]`: the body's output is held back and committed only if
    /// the body succeeds; otherwise it is discarded, the error is made
    /// available as `.error` and the recover block runs.
    fn exec_attempt(&mut self, body: &[Node], recover: &[Node]) -> Result<Flow, EvalError> {
        let depth = self.out.capture_depth();
        let saved = self.position();
        let contexts = self.contexts.len();
        let call_depth = self.calls.depth();
        self.out.begin_capture();
        match self.exec_nodes(body) {
            Ok(flow) => {
                let held = self.out.end_capture();
                self.out.write(&held)?;
                Ok(flow)
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                tracing::debug!(error = %err, "attempt recovered");
                self.out.truncate_captures(depth);
                self.restore(saved);
                self.contexts.truncate(contexts);
                while self.calls.depth() > call_depth {
                    self.calls.pop();
                }
                self.errors.push(Value::string(err.message));
                let result = self.exec_nodes(recover);
                self.errors.pop();
                result
            }
        }
    }

    fn template_name(&mut self, expr: &quill_ir::Expr) -> Result<String, EvalError> {
        match self.eval(expr)? {
            Value::Str(name) => Ok(resolve_template_name(&self.origin.name, &name)),
            other => Err(type_mismatch("string", &other)),
        }
    }

    fn load(&mut self, name: &str) -> Result<Arc<quill_check::ValidatedTemplate>, EvalError> {
        let provider = self.env.provider.ok_or_else(|| {
            quill_value::template_load(name, "no template provider is configured")
        })?;
        provider.get_template(name, &self.locale)
    }

    /// `[#include]`: run another template in the current scope.
    fn exec_include(&mut self, template: &quill_ir::Expr) -> Result<(), EvalError> {
        self.require(Capabilities::INCLUDE)?;
        let name = self.template_name(template)?;
        let included = self.load(&name)?;
        tracing::trace!(template = %name, "include");
        let saved = self.position();
        self.origin = super::origin_of(&included);
        let included_nodes = Arc::clone(&included);
        let result = self
            .bind_included_macros(&included_nodes)
            .and_then(|()| self.exec_nodes(&included_nodes.root.nodes));
        self.restore(saved);
        result.map(|_| ())
    }

    fn bind_included_macros(
        &mut self,
        template: &quill_check::ValidatedTemplate,
    ) -> Result<(), EvalError> {
        for def in &template.macros {
            let value = MacroValue::new(Arc::clone(def), self.namespace, self.origin.clone());
            self.scopes
                .set(self.namespace, def.name, Value::Macro(value))?;
        }
        Ok(())
    }

    /// `[#import]`: run a template once per render in its own namespace and
    /// bind that namespace to `alias`.
    fn exec_import(&mut self, template: &quill_ir::Expr, alias: Name) -> Result<(), EvalError> {
        self.require(Capabilities::INCLUDE)?;
        let name = self.template_name(template)?;
        let namespace = match self.imports.get(&name) {
            Some(&namespace) => namespace,
            None => self.import_namespace(&name)?,
        };
        let target = self.scopes.assignment_target(self.scope, alias)?;
        self.scopes.set(target, alias, Value::Scope(namespace))
    }

    fn import_namespace(&mut self, name: &str) -> Result<ScopeId, EvalError> {
        let imported = self.load(name)?;
        tracing::trace!(template = %name, "import");
        let namespace = self.scopes.push(
            FrameKind::Namespace,
            imported.root.declared.clone(),
            Some(self.global),
        );
        self.imports.insert(name.to_owned(), namespace);
        let context = self.context.take();
        self.out.begin_capture();
        let result = self.run_template(&imported, namespace);
        self.out.end_capture();
        self.context = context;
        if let Err(err) = result {
            // A recovered failure must not leave a half-run namespace behind.
            self.imports.remove(name);
            self.scopes.release(namespace);
            return Err(err);
        }
        Ok(namespace)
    }

    fn exec_setting(&mut self, name: Name, value: &quill_ir::Expr) -> Result<(), EvalError> {
        let value = match self.eval(value)? {
            Value::Str(s) => s,
            other => return Err(type_mismatch("string", &other)),
        };
        let names = self.names();
        if name == names.locale {
            self.locale = quill_ir::Locale::parse(&value);
        } else if name == names.time_zone {
            self.time_zone = value.parse().map_err(|_| {
                invalid_builtin_value("setting", format!("unknown time zone `{value}`"))
            })?;
        } else {
            return Err(invalid_builtin_value(
                "setting",
                format!("unknown setting `{}`", self.name_str(name)),
            ));
        }
        Ok(())
    }

    /// Items of a `[#list]` subject. Ranges stay lazy so open ranges can be
    /// iterated until a `[#break]`.
    fn list_items(&mut self, sequence: &quill_ir::Expr) -> Result<ListItems, EvalError> {
        if let ExprKind::Range {
            start,
            end,
            inclusive,
        } = &sequence.kind
        {
            let start = self.eval_int(start)?;
            let end = end.as_ref().map(|e| self.eval_int(e)).transpose()?;
            return Ok(ListItems::Range(range_iter(start, end, *inclusive)));
        }
        let value = self.eval(sequence)?;
        let value = self.resolve_host(value)?;
        Ok(ListItems::Values(match value {
            Value::Seq(items) => items.iter().cloned().collect(),
            Value::Hash(hash) => hash.keys().map(|k| Value::Str(Arc::clone(k))).collect(),
            Value::Match(m) => m.matched(),
            Value::Node(node) => node.children().into_iter().map(Value::node).collect(),
            Value::Scope(id) => self
                .scope_snapshot(id)?
                .keys()
                .map(|k| Value::Str(Arc::clone(k)))
                .collect(),
            other => return Err(type_mismatch("sequence or hash", &other)),
        }))
    }
}

/// Items of one `[#list]` run.
pub(crate) enum ListItems {
    Values(Vec<Value>),
    Range(Box<dyn Iterator<Item = i64>>),
}

impl ListItems {
    fn is_empty(&self) -> bool {
        match self {
            ListItems::Values(items) => items.is_empty(),
            ListItems::Range(_) => false,
        }
    }
}

impl IntoIterator for ListItems {
    type Item = Result<Value, EvalError>;
    type IntoIter = Box<dyn Iterator<Item = Result<Value, EvalError>>>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            ListItems::Values(items) => Box::new(items.into_iter().map(Ok)),
            ListItems::Range(range) => Box::new(range.map(|n| Ok(Value::Int(n)))),
        }
    }
}

/// Numbers of a range; ascending or descending depending on the bounds.
pub(crate) fn range_iter(
    start: i64,
    end: Option<i64>,
    inclusive: bool,
) -> Box<dyn Iterator<Item = i64>> {
    match end {
        None => Box::new(start..),
        Some(end) if end >= start => {
            if inclusive {
                Box::new(start..=end)
            } else {
                Box::new(start..end)
            }
        }
        Some(end) => {
            if inclusive {
                Box::new((end..=start).rev())
            } else {
                Box::new((end.saturating_add(1)..=start).rev())
            }
        }
    }
}

//! The macro protocol.
//!
//! A macro call evaluates its arguments in the caller's scope, then runs
//! the body in a fresh frame whose parent is the macro's *defining*
//! namespace. The call site's scope, namespace and template are recorded in
//! a [`MacroContext`] so that `[#nested]` can re-enter the caller-supplied
//! body where it was written, even from deep inside further calls.
//!
//! Functions are macros whose output is discarded and whose `[#return]`
//! value is the call's result. Fragments (`?interpret`) run in the scope of
//! their invocation without a frame of their own.

use std::sync::Arc;

use quill_ir::{Block, CallArgs, CallBody, CallNode, MacroDef, MacroKind, Name, Node, NodeKind, Span};
use quill_value::{
    invalid_builtin_value, missing_argument, too_many_arguments, type_mismatch,
    unknown_parameter, Capabilities, EvalError, EvalResult, HashValue, MacroValue, Origin, Value,
};

use super::{Evaluator, Flow, MacroContext, VisitState};
use crate::diagnostics::CallFrame;
use crate::scope::FrameKind;

/// Evaluated arguments of one call.
pub(crate) enum CallArguments {
    Positional(Vec<Value>),
    Named(Vec<(Name, Value)>),
}

impl CallArguments {
    fn len(&self) -> usize {
        match self {
            CallArguments::Positional(values) => values.len(),
            CallArguments::Named(pairs) => pairs.len(),
        }
    }
}

impl Evaluator<'_, '_> {
    /// `[@callee args; params]body[/@callee]`.
    pub(crate) fn exec_call(&mut self, call: &CallNode, span: Span) -> Result<(), EvalError> {
        let callee = match self.eval(&call.callee)? {
            Value::Macro(value) if !value.def.is_function() => value,
            other => return Err(type_mismatch("macro", &other).with_span(call.callee.span)),
        };
        let args = match &call.args {
            CallArgs::Positional(exprs) => CallArguments::Positional(
                exprs
                    .iter()
                    .map(|expr| self.eval(expr))
                    .collect::<Result<_, _>>()?,
            ),
            CallArgs::Named(named) => CallArguments::Named(
                named
                    .iter()
                    .map(|arg| Ok((arg.name, self.eval(&arg.value)?)))
                    .collect::<Result<_, EvalError>>()?,
            ),
        };
        self.invoke(&callee, args, call.body.clone(), None, Some(span))
            .map(|_| ())
    }

    /// `f(args)` where `f` is a `[#function]`.
    pub(crate) fn call_function(
        &mut self,
        callee: &MacroValue,
        args: Vec<Value>,
        span: Span,
    ) -> EvalResult {
        self.invoke(callee, CallArguments::Positional(args), None, None, Some(span))
            .map(|value| value.unwrap_or(Value::Nothing))
    }

    /// Run a macro, function or fragment. Returns a function's result.
    #[tracing::instrument(level = "trace", skip_all, fields(callee = self.name_str(callee.def.name)))]
    pub(crate) fn invoke(
        &mut self,
        callee: &MacroValue,
        args: CallArguments,
        body: Option<Arc<CallBody>>,
        visit: Option<VisitState>,
        call_span: Option<Span>,
    ) -> Result<Option<Value>, EvalError> {
        let def = Arc::clone(&callee.def);
        self.calls.push(CallFrame {
            name: def.name,
            call_span,
        })?;
        let result = if def.kind == MacroKind::Fragment {
            self.run_fragment(callee, &def, &args)
        } else {
            self.run_macro(callee, &def, args, body, visit)
        };
        let result = result.map_err(|e| self.calls.attach_backtrace(e, self.env.interner));
        self.calls.pop();
        result
    }

    fn run_macro(
        &mut self,
        callee: &MacroValue,
        def: &MacroDef,
        args: CallArguments,
        body: Option<Arc<CallBody>>,
        visit: Option<VisitState>,
    ) -> Result<Option<Value>, EvalError> {
        let frame = self.scopes.push(
            FrameKind::Macro,
            def.body.declared.clone(),
            Some(callee.namespace),
        );
        let saved = self.position();
        let contexts = self.contexts.len();
        self.contexts.push(MacroContext {
            body,
            invoking_scope: saved.scope,
            invoking_namespace: saved.namespace,
            invoking_origin: saved.origin.clone(),
            invoking_context: saved.context,
            visit,
        });
        self.context = Some(contexts);
        self.scope = frame;
        self.namespace = callee.namespace;
        self.origin = callee.origin.clone();

        let result = self
            .bind_arguments(def, args, &callee.origin)
            .and_then(|()| self.run_body(def));

        self.restore(saved);
        self.contexts.truncate(contexts);
        self.scopes.release(frame);
        result
    }

    fn run_body(&mut self, def: &MacroDef) -> Result<Option<Value>, EvalError> {
        if !def.is_function() {
            self.exec_nodes(&def.body.nodes)?;
            return Ok(None);
        }
        let depth = self.out.capture_depth();
        self.out.begin_capture();
        let flow = self.exec_nodes(&def.body.nodes);
        self.out.truncate_captures(depth);
        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break => Ok(None),
        }
    }

    /// Bind arguments into the current (fresh) frame. Defaults are
    /// evaluated afterwards in that frame, so they can refer to earlier
    /// parameters.
    fn bind_arguments(
        &mut self,
        def: &MacroDef,
        args: CallArguments,
        origin: &Origin,
    ) -> Result<(), EvalError> {
        let frame = self.scope;
        let callee = self.name_str(def.name);
        match args {
            CallArguments::Positional(values) => {
                let given = values.len();
                let mut values = values.into_iter();
                for (param, value) in def.params.iter().zip(values.by_ref()) {
                    self.scopes.set(frame, param.name, value)?;
                }
                let extra: Vec<Value> = values.collect();
                match def.catch_all {
                    Some(rest) => self.scopes.set(frame, rest, Value::seq(extra))?,
                    None if !extra.is_empty() => {
                        return Err(too_many_arguments(callee, def.params.len(), given));
                    }
                    None => {}
                }
            }
            CallArguments::Named(pairs) => {
                let mut rest = HashValue::new();
                for (name, value) in pairs {
                    if def.params.iter().any(|param| param.name == name) {
                        self.scopes.set(frame, name, value)?;
                    } else if def.catch_all.is_some() {
                        rest.insert(self.name_str(name), value);
                    } else {
                        return Err(unknown_parameter(callee, self.name_str(name)));
                    }
                }
                if let Some(catch_all) = def.catch_all {
                    self.scopes.set(frame, catch_all, Value::hash(rest))?;
                }
            }
        }
        for param in &def.params {
            if self.scopes.get(frame)?.get(param.name).is_some() {
                continue;
            }
            let Some(default) = &param.default else {
                return Err(missing_argument(callee, self.name_str(param.name)));
            };
            let value = self.eval(default).map_err(|e| e.with_origin(origin))?;
            self.scopes.set(frame, param.name, value)?;
        }
        Ok(())
    }

    /// Fragments run where they are invoked; their assignments land in the
    /// invoking scope.
    fn run_fragment(
        &mut self,
        callee: &MacroValue,
        def: &MacroDef,
        args: &CallArguments,
    ) -> Result<Option<Value>, EvalError> {
        if args.len() > 0 {
            return Err(too_many_arguments(self.name_str(def.name), 0, args.len()));
        }
        let saved = self.position();
        self.namespace = callee.namespace;
        self.origin = callee.origin.clone();
        let result = self.exec_nodes(&def.body.nodes);
        self.restore(saved);
        result.map(|_| None)
    }

    /// `[#nested args]`: run the caller-supplied body of the innermost
    /// macro call in the scope it was written in.
    pub(crate) fn exec_nested(&mut self, args: &[quill_ir::Expr]) -> Result<(), EvalError> {
        let Some(context) = self.current_context().cloned() else {
            return Ok(());
        };
        let Some(body) = context.body else {
            return Ok(());
        };
        let values = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let frame = self.scopes.push(
            FrameKind::NestedBody,
            body.block.declared.clone(),
            Some(context.invoking_scope),
        );
        for (param, value) in body.params.iter().zip(values) {
            self.scopes.set(frame, *param, value)?;
        }
        let saved = self.position();
        self.scope = frame;
        self.namespace = context.invoking_namespace;
        self.origin = context.invoking_origin;
        self.context = context.invoking_context;
        let result = self.exec_nodes(&body.block.nodes);
        self.restore(saved);
        self.scopes.release(frame);
        // A `[#return]` in the body ends only the body.
        result.map(|_| ())
    }

    /// `[#fallback]`: continue a visit handler search, or outside a visit
    /// handler behave like a bare `[#nested]`.
    pub(crate) fn exec_fallback(&mut self) -> Result<(), EvalError> {
        let visit = self
            .current_context()
            .and_then(|context| context.visit.clone());
        match visit {
            Some(state) => self.visit_fallback(state),
            None => self.exec_nested(&[]),
        }
    }

    /// `source?interpret`: compile template text into a fragment bound to
    /// the current namespace.
    pub(crate) fn interpret(&mut self, source: &str) -> EvalResult {
        self.require(Capabilities::INTERPRET)?;
        let interner = self.env.interner;
        let name = format!("{}->interpret", self.origin.name);
        let template = quill_parse::parse_template(source, &name, interner)
            .map_err(|diagnostic| invalid_builtin_value("interpret", diagnostic.message))?;
        let validated = quill_check::validate(template, &self.env.check_options, interner)
            .map_err(|problems| {
                let message = problems
                    .errors()
                    .next()
                    .map_or_else(|| "invalid template".to_owned(), |d| d.message.clone());
                invalid_builtin_value("interpret", message)
            })?;
        tracing::trace!(fragment = %name, "interpreted template text");
        let template = validated.template();
        let mut nodes: Vec<Node> = template
            .macros
            .iter()
            .map(|def| Node::new(NodeKind::Macro(Arc::clone(def)), def.span))
            .collect();
        nodes.extend(template.root.nodes.iter().cloned());
        let def = MacroDef {
            name: interner.intern(&name),
            kind: MacroKind::Fragment,
            params: Vec::new(),
            catch_all: None,
            body: Block {
                nodes,
                declared: template.root.declared.clone(),
            },
            span: Span::DUMMY,
        };
        let origin = Origin::new(Arc::clone(&template.name), Arc::clone(&template.source));
        Ok(Value::Macro(MacroValue::new(
            Arc::new(def),
            self.namespace,
            origin,
        )))
    }
}

//! Template evaluation.
//!
//! [`Environment`] holds the render configuration and is reusable across
//! renders; every [`Environment::render`] call builds a fresh [`Evaluator`]
//! with its own scope arena, call stack and output buffers, so concurrent
//! renders of the same template share nothing mutable.
//!
//! # Layout
//!
//! - `exec` - directives (`[#if]`, `[#list]`, `[#assign]`, ...)
//! - `expr` - expressions, member access, missing-value handling
//! - `call` - the macro protocol: invocation, `[#nested]`, `?interpret`
//! - `special` - `.name` special variables
//! - `visit` - `[#visit]`, `[#recurse]` and handler fallback
//!
//! # Borrowing AST nodes
//!
//! Node slices are always borrowed from an `Arc` held on the Rust stack of
//! the caller (the template, a `MacroDef`, a `CallBody`), never from the
//! evaluator itself, so recursive `&mut self` calls stay legal.

mod call;
mod exec;
mod expr;
mod special;
mod visit;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rustc_hash::FxHashMap;

use quill_check::{CheckOptions, ValidatedTemplate};
use quill_ir::{CallBody, DeclaredSet, Locale, Name, StringInterner};
use quill_value::{
    missing_capability, Capabilities, EvalError, HashValue, MacroValue, NodeRef, Origin, ScopeId,
    Value,
};

use crate::builtins::BuiltinContext;
use crate::diagnostics::CallStack;
use crate::output::{Output, OutputSink};
use crate::provider::TemplateProvider;
use crate::scope::{FrameKind, ScopeArena};

/// Default limit on nested macro and function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;

/// Builder for [`Environment`].
pub struct EnvironmentBuilder<'a> {
    interner: &'a StringInterner,
    provider: Option<&'a dyn TemplateProvider>,
    capabilities: Capabilities,
    check_options: CheckOptions,
    max_call_depth: usize,
    locale: Locale,
    time_zone: Tz,
    shared_variables: HashValue,
    now: Option<DateTime<Utc>>,
}

impl<'a> EnvironmentBuilder<'a> {
    pub fn new(interner: &'a StringInterner) -> Self {
        Self {
            interner,
            provider: None,
            capabilities: Capabilities::default(),
            check_options: CheckOptions::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            locale: Locale::default(),
            time_zone: Tz::UTC,
            shared_variables: HashValue::new(),
            now: None,
        }
    }

    /// Source of templates for `[#include]` and `[#import]`.
    #[must_use]
    pub fn provider(mut self, provider: &'a dyn TemplateProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Options used to validate fragments compiled by `?interpret`.
    #[must_use]
    pub fn check_options(mut self, options: CheckOptions) -> Self {
        self.check_options = options;
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    #[must_use]
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    #[must_use]
    pub fn time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Variables visible to every render, beneath the data model.
    #[must_use]
    pub fn shared_variables(mut self, variables: HashValue) -> Self {
        self.shared_variables = variables;
        self
    }

    /// Fix the value of `.now` (otherwise the clock at render start).
    #[must_use]
    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn build(self) -> Environment<'a> {
        Environment {
            interner: self.interner,
            provider: self.provider,
            capabilities: self.capabilities,
            check_options: self.check_options,
            max_call_depth: self.max_call_depth,
            locale: self.locale,
            time_zone: self.time_zone,
            shared_variables: self.shared_variables,
            now: self.now,
            names: SpecialNames::new(self.interner),
        }
    }
}

/// Render configuration.
pub struct Environment<'a> {
    interner: &'a StringInterner,
    provider: Option<&'a dyn TemplateProvider>,
    capabilities: Capabilities,
    check_options: CheckOptions,
    max_call_depth: usize,
    locale: Locale,
    time_zone: Tz,
    shared_variables: HashValue,
    now: Option<DateTime<Utc>>,
    names: SpecialNames,
}

impl<'a> Environment<'a> {
    pub fn builder(interner: &'a StringInterner) -> EnvironmentBuilder<'a> {
        EnvironmentBuilder::new(interner)
    }

    pub fn interner(&self) -> &'a StringInterner {
        self.interner
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Render `template` against `data_model`, writing to `sink`.
    ///
    /// Output produced before an error has already reached the sink.
    #[tracing::instrument(level = "debug", skip_all, fields(template = %template.name))]
    pub fn render(
        &self,
        template: &Arc<ValidatedTemplate>,
        data_model: &HashValue,
        sink: &mut dyn OutputSink,
    ) -> Result<(), EvalError> {
        let mut evaluator = Evaluator::new(self, sink, template);
        let result = evaluator.render_main(template, data_model);
        match &result {
            Ok(()) => tracing::debug!(frames = evaluator.scopes.live(), "render finished"),
            Err(err) => tracing::debug!(error = %err, fatal = err.is_fatal(), "render failed"),
        }
        result?;
        evaluator.out.close()
    }
}

/// Names compared against on hot paths, interned once per environment.
#[derive(Clone, Copy)]
pub(crate) struct SpecialNames {
    pub(crate) now: Name,
    pub(crate) locale: Name,
    pub(crate) lang: Name,
    pub(crate) template_name: Name,
    pub(crate) namespace: Name,
    pub(crate) main: Name,
    pub(crate) globals: Name,
    pub(crate) data_model: Name,
    pub(crate) caller_scope: Name,
    pub(crate) error: Name,
    pub(crate) node: Name,
    pub(crate) time_zone: Name,
}

impl SpecialNames {
    fn new(interner: &StringInterner) -> Self {
        Self {
            now: interner.intern("now"),
            locale: interner.intern("locale"),
            lang: interner.intern("lang"),
            template_name: interner.intern("template_name"),
            namespace: interner.intern("namespace"),
            main: interner.intern("main"),
            globals: interner.intern("globals"),
            data_model: interner.intern("data_model"),
            caller_scope: interner.intern("caller_scope"),
            error: interner.intern("error"),
            node: interner.intern("node"),
            time_zone: interner.intern("time_zone"),
        }
    }
}

/// Result of executing a node sequence.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Flow {
    Normal,
    /// `[#break]`: leave the innermost list or switch.
    Break,
    /// `[#return]`: leave the innermost macro, function or nested body.
    Return(Option<Value>),
}

/// Handler search state of a `[#visit]` / `[#recurse]` dispatch.
#[derive(Clone, Debug)]
pub(crate) struct VisitState {
    pub(crate) node: NodeRef,
    /// Namespaces the handler search runs over, in order.
    pub(crate) namespaces: Vec<ScopeId>,
    /// Index of the first namespace `[#fallback]` searches.
    pub(crate) next: usize,
}

/// One active macro invocation.
#[derive(Clone, Debug)]
pub(crate) struct MacroContext {
    /// Caller-supplied body for `[#nested]`.
    pub(crate) body: Option<Arc<CallBody>>,
    pub(crate) invoking_scope: ScopeId,
    pub(crate) invoking_namespace: ScopeId,
    pub(crate) invoking_origin: Origin,
    /// Context the call site itself ran in.
    pub(crate) invoking_context: Option<usize>,
    pub(crate) visit: Option<VisitState>,
}

/// Where execution currently is; saved around every transfer of control.
#[derive(Clone, Debug)]
pub(crate) struct Position {
    scope: ScopeId,
    namespace: ScopeId,
    origin: Origin,
    context: Option<usize>,
}

/// Per-render state.
pub(crate) struct Evaluator<'e, 's> {
    pub(crate) env: &'e Environment<'e>,
    pub(crate) out: Output<'s>,
    pub(crate) scopes: ScopeArena,
    pub(crate) calls: CallStack,
    pub(crate) global: ScopeId,
    pub(crate) data_model: ScopeId,
    pub(crate) main: ScopeId,
    /// Current frame.
    pub(crate) scope: ScopeId,
    /// Namespace of the template whose code is running.
    pub(crate) namespace: ScopeId,
    pub(crate) origin: Origin,
    pub(crate) contexts: Vec<MacroContext>,
    pub(crate) context: Option<usize>,
    /// Messages of the errors being recovered from, innermost last.
    pub(crate) errors: Vec<Value>,
    /// Namespaces created by `[#import]`, by resolved template name.
    pub(crate) imports: FxHashMap<String, ScopeId>,
    pub(crate) locale: Locale,
    pub(crate) time_zone: Tz,
    pub(crate) now: DateTime<Utc>,
    pub(crate) visit_node: Option<NodeRef>,
}

impl<'e, 's> Evaluator<'e, 's> {
    fn new(
        env: &'e Environment<'e>,
        sink: &'s mut dyn OutputSink,
        template: &ValidatedTemplate,
    ) -> Self {
        let mut scopes = ScopeArena::new();
        let data_model = scopes.push(FrameKind::DataModel, DeclaredSet::default(), None);
        let global = scopes.push(FrameKind::Global, DeclaredSet::default(), Some(data_model));
        let main = scopes.push(
            FrameKind::Namespace,
            template.root.declared.clone(),
            Some(global),
        );
        Self {
            env,
            out: Output::new(sink),
            scopes,
            calls: CallStack::new(env.max_call_depth),
            global,
            data_model,
            main,
            scope: main,
            namespace: main,
            origin: origin_of(template),
            contexts: Vec::new(),
            context: None,
            errors: Vec::new(),
            imports: FxHashMap::default(),
            locale: env.locale.clone(),
            time_zone: env.time_zone,
            now: env.now.unwrap_or_else(Utc::now),
            visit_node: None,
        }
    }

    fn render_main(
        &mut self,
        template: &Arc<ValidatedTemplate>,
        data_model: &HashValue,
    ) -> Result<(), EvalError> {
        for (key, value) in self.env.shared_variables.iter().chain(data_model.iter()) {
            self.scopes
                .set_text(self.data_model, Arc::clone(key), value.clone())?;
        }
        self.run_template(template, self.main)
    }

    /// Bind a template's macros into `namespace` and run its content there.
    pub(crate) fn run_template(
        &mut self,
        template: &Arc<ValidatedTemplate>,
        namespace: ScopeId,
    ) -> Result<(), EvalError> {
        let template = Arc::clone(template);
        let saved = self.position();
        self.origin = origin_of(&template);
        self.namespace = namespace;
        self.scope = namespace;
        let result = self
            .bind_macros(&template.macros, namespace)
            .and_then(|()| self.exec_nodes(&template.root.nodes));
        self.restore(saved);
        result.map(|_| ())
    }

    fn bind_macros(
        &mut self,
        macros: &[Arc<quill_ir::MacroDef>],
        namespace: ScopeId,
    ) -> Result<(), EvalError> {
        for def in macros {
            let value = MacroValue::new(Arc::clone(def), namespace, self.origin.clone());
            self.scopes.set(namespace, def.name, Value::Macro(value))?;
        }
        Ok(())
    }

    pub(crate) fn position(&self) -> Position {
        Position {
            scope: self.scope,
            namespace: self.namespace,
            origin: self.origin.clone(),
            context: self.context,
        }
    }

    pub(crate) fn restore(&mut self, position: Position) {
        self.scope = position.scope;
        self.namespace = position.namespace;
        self.origin = position.origin;
        self.context = position.context;
    }

    pub(crate) fn require(&self, capability: Capabilities) -> Result<(), EvalError> {
        if self.env.capabilities.contains(capability) {
            Ok(())
        } else {
            Err(missing_capability(capability))
        }
    }

    pub(crate) fn builtin_context(&self) -> BuiltinContext {
        BuiltinContext {
            time_zone: self.time_zone,
        }
    }

    pub(crate) fn names(&self) -> SpecialNames {
        self.env.names
    }

    pub(crate) fn name_str(&self, name: Name) -> &'e str {
        self.env.interner.lookup(name)
    }

    pub(crate) fn current_context(&self) -> Option<&MacroContext> {
        self.context.and_then(|i| self.contexts.get(i))
    }
}

pub(crate) fn origin_of(template: &ValidatedTemplate) -> Origin {
    Origin::new(Arc::clone(&template.name), Arc::clone(&template.source))
}


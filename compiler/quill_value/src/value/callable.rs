//! Callable values.

use std::fmt;
use std::sync::Arc;

use quill_ir::MacroDef;

use super::{HostError, Value};
use crate::{Origin, ScopeId};

/// A macro, function or `?interpret` fragment bound to its namespace.
///
/// `namespace` is the frame the definition was evaluated in; a call's frame
/// chains to it, so free names in the body resolve in the defining template
/// rather than at the call site.
#[derive(Clone)]
pub struct MacroValue {
    pub def: Arc<MacroDef>,
    pub namespace: ScopeId,
    /// Template the body's spans point into.
    pub origin: Origin,
}

impl MacroValue {
    pub fn new(def: Arc<MacroDef>, namespace: ScopeId, origin: Origin) -> Self {
        MacroValue {
            def,
            namespace,
            origin,
        }
    }
}

impl PartialEq for MacroValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.def, &other.def) && self.namespace == other.namespace
    }
}

impl fmt::Debug for MacroValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Macro({:?} {:?} in {})",
            self.def.kind, self.def.name, self.origin.name
        )
    }
}

type HostFn = dyn Fn(&[Value]) -> Result<Value, HostError> + Send + Sync;

/// Function supplied by the host application.
#[derive(Clone)]
pub struct HostFunction {
    name: Arc<str>,
    func: Arc<HostFn>,
}

impl HostFunction {
    pub fn new(
        name: impl Into<Arc<str>>,
        func: impl Fn(&[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        HostFunction {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, HostError> {
        (self.func)(args)
    }
}

impl PartialEq for HostFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostFunction({})", self.name)
    }
}

/// Function values other than template macros.
#[derive(Clone, Debug, PartialEq)]
pub enum FunctionValue {
    Host(HostFunction),
    /// `scope?lookup`: resolves its single string argument through the
    /// scope's chain.
    Lookup(ScopeId),
}

impl From<HostFunction> for Value {
    fn from(func: HostFunction) -> Self {
        Value::Function(FunctionValue::Host(func))
    }
}

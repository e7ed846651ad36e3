//! Runtime value model for the Quill template engine.
//!
//! - [`Value`]: everything a template can observe
//! - [`EvalError`]: typed render-time failures
//! - [`Capabilities`]: what a render is allowed to do
//! - [`ObjectWrapper`] / [`ObjectAdapter`]: the seams host objects enter by
//!
//! Values are cheap to clone (`Arc` inside) and `Send + Sync`, so a data model
//! can be shared between concurrent renders.

mod capability;
mod errors;
mod scope_id;
mod value;

pub use capability::{Capabilities, UnknownCapability};
pub use errors::{
    division_by_zero, host_adapter, index_out_of_bounds, integer_overflow, invalid_builtin_value,
    invalid_operands, invalid_regex, invalid_scope_target, missing_argument, missing_capability,
    missing_member, not_callable, output_sink, stack_overflow, stale_scope, stopped,
    template_load, too_many_arguments, type_mismatch, unbound_variable, undeclared_variable,
    unknown_parameter, BacktraceFrame, EvalBacktrace, EvalError, EvalErrorKind, EvalResult,
    Origin,
};
pub use scope_id::ScopeId;
pub use value::{
    DateKind, DateValue, DefaultObjectWrapper, FunctionValue, HashValue, HostError, HostFunction,
    HostValue, MacroValue, MatchValue, NodeRef, NodeTree, NodeTreeBuilder, NodeType,
    ObjectAdapter, ObjectWrapper, Value,
};

//! Quill Eval - the template evaluation engine.
//!
//! Renders validated templates against a data model:
//! - [`Environment`]: render configuration, reusable and shareable
//! - [`ScopeArena`]: the frame chain variables resolve through
//! - [`CallStack`]: macro call depth limit and backtraces
//! - [`OutputSink`]: where rendered text goes
//! - [`TemplateProvider`]: how `[#include]` and `[#import]` reach other
//!   templates
//!
//! Values and errors live in `quill_value`.

mod builtins;
mod diagnostics;
mod environment;
mod operators;
mod output;
mod provider;
mod scope;

pub use diagnostics::{CallFrame, CallStack};
pub use environment::{Environment, EnvironmentBuilder, DEFAULT_MAX_CALL_DEPTH};
pub use output::{OutputSink, WriterSink};
pub use provider::{resolve_template_name, TemplateProvider};
pub use scope::{Frame, FrameKind, Lookup, ScopeArena};

#[cfg(test)]
mod tests;

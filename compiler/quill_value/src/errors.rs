//! Render-time errors.
//!
//! # Structured Error Categories
//!
//! [`EvalErrorKind`] is the typed category; its `Display` impl produces the
//! message. Factory functions (`undeclared_variable()`, `type_mismatch()`,
//! ...) are the public way to build errors and are `#[cold]`.
//!
//! An error gets its span where it is raised and its [`Origin`] (the template
//! the span points into) when it first crosses a node boundary, so errors
//! raised inside an included template or a macro from another namespace keep
//! pointing at the right source.

use std::fmt;
use std::sync::Arc;

use quill_diagnostic::ErrorCode;
use quill_ir::Span;

use crate::Value;

/// Result of evaluating an expression.
pub type EvalResult = Result<Value, EvalError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    // Arithmetic
    DivisionByZero,
    IntegerOverflow {
        operation: &'static str,
    },

    // Type/Operator
    TypeMismatch {
        expected: String,
        got: &'static str,
    },
    InvalidOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    // Scope
    UndeclaredVariable {
        name: String,
    },
    UnboundVariable {
        name: String,
    },
    InvalidScopeTarget {
        name: String,
    },
    StaleScope,

    // Access
    MissingMember {
        key: String,
        container: &'static str,
    },
    IndexOutOfBounds {
        index: i64,
        len: usize,
    },

    // Calls
    MissingArgument {
        callee: String,
        param: String,
    },
    TooManyArguments {
        callee: String,
        expected: usize,
        got: usize,
    },
    UnknownParameter {
        callee: String,
        param: String,
    },
    NotCallable {
        type_name: &'static str,
    },
    StackOverflow {
        depth: usize,
    },

    // Host boundary
    MissingCapability {
        capability: &'static str,
    },
    HostAdapter {
        message: String,
    },

    // Builtins
    InvalidRegex {
        pattern: String,
        message: String,
    },
    InvalidBuiltinValue {
        builtin: &'static str,
        message: String,
    },

    // Render control
    OutputSink {
        message: String,
    },
    Stopped {
        reason: Option<String>,
    },
    TemplateLoad {
        template: String,
        message: String,
    },
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::IntegerOverflow { operation } => write!(f, "integer overflow in {operation}"),

            Self::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            Self::InvalidOperands { op, left, right } => {
                write!(f, "operator `{op}` cannot be applied to {left} and {right}")
            }

            Self::UndeclaredVariable { name } => {
                write!(f, "`{name}` is not declared in any enclosing scope")
            }
            Self::UnboundVariable { name } => {
                write!(f, "`{name}` is declared but has no value")
            }
            Self::InvalidScopeTarget { name } => {
                write!(f, "`{name}` cannot be assigned here: no enclosing macro frame")
            }
            Self::StaleScope => write!(f, "scope is no longer live"),

            Self::MissingMember { key, container } => {
                write!(f, "{container} has no member `{key}`")
            }
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for sequence of length {len}")
            }

            Self::MissingArgument { callee, param } => {
                write!(f, "`{callee}` is missing required argument `{param}`")
            }
            Self::TooManyArguments {
                callee,
                expected,
                got,
            } => {
                let arg_word = if *expected == 1 {
                    "argument"
                } else {
                    "arguments"
                };
                write!(f, "`{callee}` accepts {expected} {arg_word}, got {got}")
            }
            Self::UnknownParameter { callee, param } => {
                write!(f, "`{callee}` has no parameter `{param}`")
            }
            Self::NotCallable { type_name } => write!(f, "{type_name} is not callable"),
            Self::StackOverflow { depth } => {
                write!(f, "maximum macro call depth exceeded (limit: {depth})")
            }

            Self::MissingCapability { capability } => {
                write!(f, "missing capability: {capability}")
            }
            Self::HostAdapter { message } => write!(f, "host adapter failed: {message}"),

            Self::InvalidRegex { pattern, message } => {
                write!(f, "invalid regular expression `{pattern}`: {message}")
            }
            Self::InvalidBuiltinValue { builtin, message } => write!(f, "?{builtin}: {message}"),

            Self::OutputSink { message } => write!(f, "writing output failed: {message}"),
            Self::Stopped { reason: Some(reason) } => write!(f, "template stopped: {reason}"),
            Self::Stopped { reason: None } => write!(f, "template stopped"),
            Self::TemplateLoad { template, message } => {
                write!(f, "cannot use template `{template}`: {message}")
            }
        }
    }
}

impl EvalErrorKind {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DivisionByZero => ErrorCode::E6001,
            Self::IntegerOverflow { .. } => ErrorCode::E6002,
            Self::TypeMismatch { .. } => ErrorCode::E6010,
            Self::InvalidOperands { .. } => ErrorCode::E6011,
            Self::UndeclaredVariable { .. } => ErrorCode::E6020,
            Self::UnboundVariable { .. } => ErrorCode::E6021,
            Self::MissingMember { .. } => ErrorCode::E6022,
            Self::IndexOutOfBounds { .. } => ErrorCode::E6023,
            Self::MissingArgument { .. } => ErrorCode::E6030,
            Self::TooManyArguments { .. } => ErrorCode::E6031,
            Self::UnknownParameter { .. } => ErrorCode::E6032,
            Self::NotCallable { .. } => ErrorCode::E6033,
            Self::InvalidScopeTarget { .. } => ErrorCode::E6040,
            Self::StaleScope => ErrorCode::E6041,
            Self::StackOverflow { .. } => ErrorCode::E6050,
            Self::MissingCapability { .. } => ErrorCode::E6060,
            Self::HostAdapter { .. } => ErrorCode::E6070,
            Self::InvalidRegex { .. } => ErrorCode::E6080,
            Self::InvalidBuiltinValue { .. } => ErrorCode::E6081,
            Self::OutputSink { .. } => ErrorCode::E6090,
            Self::Stopped { .. } => ErrorCode::E6091,
            Self::TemplateLoad { .. } => ErrorCode::E6099,
        }
    }

    /// Errors `[#attempt]` never recovers from: resource exhaustion, a broken
    /// host contract, a denied capability, a dead sink or an explicit stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StackOverflow { .. }
                | Self::HostAdapter { .. }
                | Self::MissingCapability { .. }
                | Self::OutputSink { .. }
                | Self::Stopped { .. }
        )
    }
}

/// Template a span points into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origin {
    pub name: Arc<str>,
    pub source: Arc<str>,
}

impl Origin {
    pub fn new(name: Arc<str>, source: Arc<str>) -> Self {
        Origin { name, source }
    }
}

/// A single macro call in an evaluation backtrace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacktraceFrame {
    /// Macro or function name.
    pub name: String,
    /// Call site.
    pub span: Option<Span>,
}

/// Snapshot of the macro call stack at an error site.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalBacktrace {
    frames: Vec<BacktraceFrame>,
}

impl EvalBacktrace {
    pub fn new(frames: Vec<BacktraceFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return Ok(());
        }
        writeln!(f, "macro backtrace:")?;
        for (i, frame) in self.frames.iter().enumerate() {
            write!(f, "  {i}: {}", frame.name)?;
            if let Some(span) = frame.span {
                write!(f, " at {span}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Render-time error.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Human-readable message; equals `kind.to_string()`.
    pub message: String,
    /// Offending construct.
    pub span: Option<Span>,
    /// Template `span` points into.
    pub origin: Option<Origin>,
    /// Macro calls leading to the error.
    pub backtrace: Option<EvalBacktrace>,
}

impl EvalError {
    fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            span: None,
            origin: None,
            backtrace: None,
        }
    }

    /// Attach a span unless one is already set.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span.get_or_insert(span);
        self
    }

    /// Attach an origin unless one is already set.
    #[must_use]
    pub fn with_origin(mut self, origin: &Origin) -> Self {
        if self.origin.is_none() {
            self.origin = Some(origin.clone());
        }
        self
    }

    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        if self.backtrace.is_none() && !backtrace.is_empty() {
            self.backtrace = Some(backtrace);
        }
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}", self.code(), self.message)
    }
}

impl std::error::Error for EvalError {}

// Arithmetic

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::from_kind(EvalErrorKind::DivisionByZero)
}

#[cold]
pub fn integer_overflow(operation: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IntegerOverflow { operation })
}

// Type/Operator

/// Operand of the wrong variant; `expected` names the accepted category.
#[cold]
pub fn type_mismatch(expected: impl fmt::Display, got: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TypeMismatch {
        expected: expected.to_string(),
        got: got.type_name(),
    })
}

#[cold]
pub fn invalid_operands(op: &'static str, left: &Value, right: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidOperands {
        op,
        left: left.type_name(),
        right: right.type_name(),
    })
}

// Scope

#[cold]
pub fn undeclared_variable(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndeclaredVariable {
        name: name.to_owned(),
    })
}

#[cold]
pub fn unbound_variable(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnboundVariable {
        name: name.to_owned(),
    })
}

#[cold]
pub fn invalid_scope_target(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidScopeTarget {
        name: name.to_owned(),
    })
}

#[cold]
pub fn stale_scope() -> EvalError {
    EvalError::from_kind(EvalErrorKind::StaleScope)
}

// Access

#[cold]
pub fn missing_member(key: &str, container: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MissingMember {
        key: key.to_owned(),
        container: container.type_name(),
    })
}

#[cold]
pub fn index_out_of_bounds(index: i64, len: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IndexOutOfBounds { index, len })
}

// Calls

#[cold]
pub fn missing_argument(callee: &str, param: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MissingArgument {
        callee: callee.to_owned(),
        param: param.to_owned(),
    })
}

#[cold]
pub fn too_many_arguments(callee: &str, expected: usize, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TooManyArguments {
        callee: callee.to_owned(),
        expected,
        got,
    })
}

#[cold]
pub fn unknown_parameter(callee: &str, param: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownParameter {
        callee: callee.to_owned(),
        param: param.to_owned(),
    })
}

#[cold]
pub fn not_callable(value: &Value) -> EvalError {
    EvalError::from_kind(EvalErrorKind::NotCallable {
        type_name: value.type_name(),
    })
}

#[cold]
pub fn stack_overflow(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackOverflow { depth })
}

// Host boundary

#[cold]
pub fn missing_capability(capability: crate::Capabilities) -> EvalError {
    EvalError::from_kind(EvalErrorKind::MissingCapability {
        capability: capability.name(),
    })
}

#[cold]
pub fn host_adapter(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::HostAdapter {
        message: message.into(),
    })
}

// Builtins

#[cold]
pub fn invalid_regex(pattern: &str, message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidRegex {
        pattern: pattern.to_owned(),
        message: message.into(),
    })
}

#[cold]
pub fn invalid_builtin_value(builtin: &'static str, message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::InvalidBuiltinValue {
        builtin,
        message: message.into(),
    })
}

// Render control

#[cold]
pub fn output_sink(message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::OutputSink {
        message: message.into(),
    })
}

#[cold]
pub fn stopped(reason: Option<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::Stopped { reason })
}

#[cold]
pub fn template_load(template: &str, message: impl Into<String>) -> EvalError {
    EvalError::from_kind(EvalErrorKind::TemplateLoad {
        template: template.to_owned(),
        message: message.into(),
    })
}

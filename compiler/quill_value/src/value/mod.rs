//! Runtime values.
//!
//! # Closed Universe, One Escape Hatch
//!
//! [`Value`] is a closed sum over everything a template can observe. Host
//! objects that do not map onto a closed case enter as [`Value::Host`]: an
//! opaque object plus the [`ObjectAdapter`] that knows how to read it, so new
//! host types never require touching the enum.
//!
//! # Thread Safety
//!
//! Every heap payload sits behind an `Arc`; a `Value` is `Send + Sync` and
//! clones in O(1). Data models are shared between concurrent renders without
//! copying.

mod callable;
mod composite;
mod convert;
mod date;
mod host;
mod node;

use std::fmt;
use std::sync::Arc;

pub use callable::{FunctionValue, HostFunction, MacroValue};
pub use composite::{HashValue, MatchValue};
pub use convert::{DefaultObjectWrapper, ObjectWrapper};
pub use date::{DateKind, DateValue};
pub use host::{HostError, HostValue, ObjectAdapter};
pub use node::{NodeRef, NodeTree, NodeTreeBuilder, NodeType};

use crate::ScopeId;

/// Everything a template can observe.
#[derive(Clone)]
pub enum Value {
    // Scalars
    Str(Arc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(DateValue),

    // Containers
    /// Ordered sequence.
    Seq(Arc<Vec<Value>>),
    /// String-keyed mapping.
    Hash(Arc<HashValue>),
    /// Element of a markup tree.
    Node(NodeRef),

    // Callables
    /// `[#macro]`, `[#function]` or an `?interpret` fragment.
    Macro(MacroValue),
    /// Host function or curried builtin.
    Function(FunctionValue),

    /// Handle to a live binding frame (`.namespace`, `.globals`, imports).
    Scope(ScopeId),
    /// Result of `?matches`.
    Match(Arc<MatchValue>),
    /// Opaque host object read through its adapter.
    Host(HostValue),

    /// Explicit "no value", distinct from a missing variable.
    Nothing,
}

// Factory Methods

impl Value {
    #[inline]
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    #[inline]
    pub fn seq(items: Vec<Value>) -> Self {
        Value::Seq(Arc::new(items))
    }

    #[inline]
    pub fn hash(hash: HashValue) -> Self {
        Value::Hash(Arc::new(hash))
    }

    /// Hash from `(key, value)` pairs, keeping their order.
    pub fn hash_from<K: Into<Arc<str>>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::hash(entries.into_iter().collect())
    }

    pub fn node(node: NodeRef) -> Self {
        Value::Node(node)
    }
}

// Inspection

impl Value {
    /// Variant name used in type-mismatch messages and `?type_name`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) | Value::Float(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Date(_) => "date",
            Value::Seq(_) => "sequence",
            Value::Hash(_) => "hash",
            Value::Node(_) => "node",
            Value::Macro(m) if m.def.is_function() => "function",
            Value::Macro(_) => "macro",
            Value::Function(_) => "function",
            Value::Scope(_) => "scope",
            Value::Match(_) => "regular-expression match",
            Value::Host(host) => host.type_name(),
            Value::Nothing => "nothing",
        }
    }

    /// Present and non-empty: empty strings, sequences and hashes and the
    /// `Nothing` marker have no content.
    pub fn has_content(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Seq(items) => !items.is_empty(),
            Value::Hash(hash) => !hash.is_empty(),
            Value::Nothing => false,
            _ => true,
        }
    }

    #[inline]
    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Numeric value as a float, for mixed arithmetic and comparisons.
    #[expect(
        clippy::cast_precision_loss,
        reason = "mixed int/float arithmetic is float arithmetic"
    )]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }
}

/// Canonical text of a float: integral values print without a fraction.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_owned()
    } else if f.is_infinite() && f.is_sign_positive() {
        "INF".to_owned()
    } else if f.is_infinite() {
        "-INF".to_owned()
    } else {
        f.to_string()
    }
}

impl Value {
    /// Canonical text of a number, used by interpolation and `?c`.
    pub fn format_number(&self) -> Option<String> {
        match self {
            Value::Int(n) => Some(n.to_string()),
            Value::Float(f) => Some(format_float(*f)),
            _ => None,
        }
    }
}

// Traits

impl PartialEq for Value {
    /// Structural equality for data; identity for callables, scopes and host
    /// objects.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::Macro(a), Value::Macro(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Scope(a), Value::Scope(b)) => a == b,
            (Value::Match(a), Value::Match(b)) => a == b,
            (Value::Host(a), Value::Host(b)) => a == b,
            (Value::Nothing, Value::Nothing) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Date(d) => write!(f, "Date({d:?})"),
            Value::Seq(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Hash(hash) => hash.fmt(f),
            Value::Node(node) => node.fmt(f),
            Value::Macro(m) => m.fmt(f),
            Value::Function(func) => func.fmt(f),
            Value::Scope(id) => write!(f, "Scope({id:?})"),
            Value::Match(m) => m.fmt(f),
            Value::Host(host) => host.fmt(f),
            Value::Nothing => f.write_str("Nothing"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::seq(items)
    }
}

//! Opaque host objects and the adapters that read them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::Value;

/// Failure raised by host code: adapters, wrappers and host functions.
///
/// Surfaces in a render as a fatal host-adapter error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HostError {
    message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        HostError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Reads one kind of host object.
///
/// The evaluator handles the closed [`Value`] cases itself and only calls an
/// adapter for [`Value::Host`]: member access goes to [`get`], every other
/// operation first asks [`resolve`] for a closed-case view.
///
/// [`get`]: ObjectAdapter::get
/// [`resolve`]: ObjectAdapter::resolve
pub trait ObjectAdapter: Send + Sync {
    /// Name reported by `?type_name` and in type-mismatch messages.
    fn type_name(&self) -> &'static str {
        "host object"
    }

    /// `object.key`; `Ok(None)` when the object has no such member.
    fn get(&self, object: &(dyn Any + Send + Sync), key: &str) -> Result<Option<Value>, HostError>;

    /// The object as a closed-case value, if it has one.
    fn resolve(&self, _object: &(dyn Any + Send + Sync)) -> Result<Option<Value>, HostError> {
        Ok(None)
    }
}

/// An opaque host object paired with its adapter.
#[derive(Clone)]
pub struct HostValue {
    object: Arc<dyn Any + Send + Sync>,
    adapter: Arc<dyn ObjectAdapter>,
}

impl HostValue {
    pub fn new(object: Arc<dyn Any + Send + Sync>, adapter: Arc<dyn ObjectAdapter>) -> Self {
        HostValue { object, adapter }
    }

    pub fn object(&self) -> &(dyn Any + Send + Sync) {
        &*self.object
    }

    pub fn type_name(&self) -> &'static str {
        self.adapter.type_name()
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>, HostError> {
        self.adapter.get(&*self.object, key)
    }

    pub fn resolve(&self) -> Result<Option<Value>, HostError> {
        self.adapter.resolve(&*self.object)
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Host({})", self.type_name())
    }
}

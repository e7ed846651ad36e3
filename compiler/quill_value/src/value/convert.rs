//! Conversions between host data and [`Value`].
//!
//! `serde` is the main road in: anything `Serialize` becomes a value through
//! [`Value::from_serialize`]. Other host objects go through an
//! [`ObjectWrapper`], which the engine configuration can replace.

use std::any::Any;
use std::sync::Arc;

use serde::Serialize;

use super::{format_float, DateKind, DateValue, HashValue, HostError, Value};

impl Value {
    /// Convert any serializable host value.
    ///
    /// Maps become hashes, arrays sequences and `null` the `Nothing` marker.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Value, HostError> {
        serde_json::to_value(value)
            .map(Value::from_json)
            .map_err(|e| HostError::new(format!("cannot convert host value: {e}")))
    }

    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Nothing,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::string(s),
            serde_json::Value::Array(items) => {
                Value::seq(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::hash(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// JSON view of a value, handed to host functions.
    ///
    /// Dates become ISO strings in UTC, nodes their text; callables, scopes
    /// and host objects have no JSON form and become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Str(s) => serde_json::Value::String(s.to_string()),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or_else(|| serde_json::Value::String(format_float(*f)), serde_json::Value::Number),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Date(d) => serde_json::Value::String(d.iso(chrono_tz::UTC)),
            Value::Seq(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Hash(hash) => serde_json::Value::Object(
                hash.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            Value::Node(node) => serde_json::Value::String(node.text()),
            Value::Match(m) => serde_json::Value::Bool(m.entire),
            Value::Macro(_)
            | Value::Function(_)
            | Value::Scope(_)
            | Value::Host(_)
            | Value::Nothing => serde_json::Value::Null,
        }
    }
}

/// Turns host objects into template values.
pub trait ObjectWrapper: Send + Sync {
    fn wrap(&self, object: Arc<dyn Any + Send + Sync>) -> Result<Value, HostError>;
}

/// Wraps the common Rust types; anything else is a host-adapter error.
///
/// Accepted: [`Value`], `serde_json::Value`, `String`, `&'static str`,
/// `i64`, `i32`, `u32`, `f64`, `bool`, `chrono::DateTime<Utc>` and
/// `Vec<String>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultObjectWrapper;

impl ObjectWrapper for DefaultObjectWrapper {
    fn wrap(&self, object: Arc<dyn Any + Send + Sync>) -> Result<Value, HostError> {
        let any: &(dyn Any + Send + Sync) = &*object;
        if let Some(value) = any.downcast_ref::<Value>() {
            return Ok(value.clone());
        }
        if let Some(json) = any.downcast_ref::<serde_json::Value>() {
            return Ok(Value::from_json(json.clone()));
        }
        if let Some(s) = any.downcast_ref::<String>() {
            return Ok(Value::string(s.as_str()));
        }
        if let Some(s) = any.downcast_ref::<&'static str>() {
            return Ok(Value::string(*s));
        }
        if let Some(n) = any.downcast_ref::<i64>() {
            return Ok(Value::Int(*n));
        }
        if let Some(n) = any.downcast_ref::<i32>() {
            return Ok(Value::Int(i64::from(*n)));
        }
        if let Some(n) = any.downcast_ref::<u32>() {
            return Ok(Value::Int(i64::from(*n)));
        }
        if let Some(f) = any.downcast_ref::<f64>() {
            return Ok(Value::Float(*f));
        }
        if let Some(b) = any.downcast_ref::<bool>() {
            return Ok(Value::Bool(*b));
        }
        if let Some(instant) = any.downcast_ref::<chrono::DateTime<chrono::Utc>>() {
            return Ok(Value::Date(DateValue::new(*instant, DateKind::DateTime)));
        }
        if let Some(items) = any.downcast_ref::<Vec<String>>() {
            return Ok(Value::seq(
                items.iter().map(|s| Value::string(s.as_str())).collect(),
            ));
        }
        Err(HostError::new(
            "object wrapper cannot adapt this host type; register an adapter",
        ))
    }
}

impl HashValue {
    /// Hash from serializable host data; fails unless `value` serializes to
    /// a JSON object.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<HashValue, HostError> {
        match Value::from_serialize(value)? {
            Value::Hash(hash) => Ok(Arc::unwrap_or_clone(hash)),
            other => Err(HostError::new(format!(
                "data model must be a map, got {}",
                other.type_name()
            ))),
        }
    }
}

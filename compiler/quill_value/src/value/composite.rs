//! Hash and regular-expression match payloads.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::Value;

/// String-keyed mapping.
///
/// Iteration follows insertion order. Hash literals insert in source order;
/// adapted host maps insert in whatever order the host yields them.
#[derive(Clone, Default, PartialEq)]
pub struct HashValue {
    entries: IndexMap<Arc<str>, Value>,
}

impl HashValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        HashValue {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert or replace; a replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<Arc<str>>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Arc<str>> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.entries.iter()
    }
}

impl<K: Into<Arc<str>>> FromIterator<(K, Value)> for HashValue {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        HashValue {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl fmt::Debug for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// Result of `string?matches(pattern)`.
///
/// In a boolean context it is true when the pattern matched the whole
/// string; listed, it yields every matched substring; `?groups` returns the
/// capture groups of the first match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchValue {
    /// The pattern matched the entire input.
    pub entire: bool,
    /// Capture groups per match; group 0 is the whole match. Groups that did
    /// not participate are `None`.
    pub matches: Vec<Vec<Option<Arc<str>>>>,
}

impl MatchValue {
    /// Matched substrings, one per match.
    pub fn matched(&self) -> Vec<Value> {
        self.matches
            .iter()
            .filter_map(|groups| groups.first().cloned().flatten())
            .map(Value::Str)
            .collect()
    }

    /// Capture groups of the first match; absent groups are empty strings.
    pub fn groups(&self) -> Vec<Value> {
        self.matches
            .first()
            .map(|groups| {
                groups
                    .iter()
                    .map(|g| Value::Str(g.clone().unwrap_or_else(|| Arc::from(""))))
                    .collect()
            })
            .unwrap_or_default()
    }
}

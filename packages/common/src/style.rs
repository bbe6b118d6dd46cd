//! # Style Maps
//!
//! Styles are stored as a tree of string keys. A key maps either to a
//! scalar JSON value (`"red"`, `12`) or to a nested map, which is how
//! interaction states (`":hover"`, `":focus"`) are expressed:
//!
//! ```json
//! { "color": "black", ":hover": { "color": "blue" } }
//! ```
//!
//! Merging is leaf-by-leaf: nested maps merge recursively, everything else
//! is replaced. A `null` scalar in a patch removes that leaf.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single style entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    /// Interaction-state or grouped sub-map
    Nested(StyleMap),

    /// Plain property value
    Scalar(Value),
}

impl StyleValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StyleValue::Scalar(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&StyleMap> {
        match self {
            StyleValue::Nested(map) => Some(map),
            StyleValue::Scalar(_) => None,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, StyleValue::Scalar(Value::Null))
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        StyleValue::Scalar(Value::String(value.to_string()))
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        StyleValue::Scalar(Value::String(value))
    }
}

impl From<i64> for StyleValue {
    fn from(value: i64) -> Self {
        StyleValue::Scalar(Value::from(value))
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        StyleValue::Scalar(Value::from(value))
    }
}

impl From<StyleMap> for StyleValue {
    fn from(value: StyleMap) -> Self {
        StyleValue::Nested(value)
    }
}

impl From<Value> for StyleValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(object) => StyleValue::Nested(
                object
                    .into_iter()
                    .map(|(key, value)| (key, StyleValue::from(value)))
                    .collect(),
            ),
            other => StyleValue::Scalar(other),
        }
    }
}

/// Ordered map of style properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleMap(BTreeMap<String, StyleValue>);

impl StyleMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&StyleValue> {
        self.0.get(key)
    }

    /// Look up a scalar string property, e.g. `get_str("color")`
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(StyleValue::as_str)
    }

    /// Look up an interaction-state sub-map, e.g. `nested(":hover")`
    pub fn nested(&self, key: &str) -> Option<&StyleMap> {
        self.0.get(key).and_then(StyleValue::as_nested)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<StyleValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<StyleValue> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StyleValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Deep-merge `patch` into this map, leaf by leaf.
    pub fn merge(&mut self, patch: &StyleMap) {
        for (key, incoming) in &patch.0 {
            if incoming.is_null() {
                self.0.remove(key);
                continue;
            }

            match (self.0.get_mut(key), incoming) {
                (Some(StyleValue::Nested(existing)), StyleValue::Nested(nested)) => {
                    existing.merge(nested);
                    if existing.is_empty() {
                        self.0.remove(key);
                    }
                }
                (_, StyleValue::Nested(nested)) => {
                    let mut fresh = StyleMap::new();
                    fresh.merge(nested);
                    if fresh.is_empty() {
                        self.0.remove(key);
                    } else {
                        self.0.insert(key.clone(), StyleValue::Nested(fresh));
                    }
                }
                (_, scalar) => {
                    self.0.insert(key.clone(), scalar.clone());
                }
            }
        }
    }

    /// Non-mutating variant of [`StyleMap::merge`]
    pub fn merged(&self, patch: &StyleMap) -> StyleMap {
        let mut out = self.clone();
        out.merge(patch);
        out
    }

    /// Number of scalar leaves, counting inside nested maps
    pub fn leaf_count(&self) -> usize {
        self.0
            .values()
            .map(|value| match value {
                StyleValue::Nested(nested) => nested.leaf_count(),
                StyleValue::Scalar(_) => 1,
            })
            .sum()
    }
}

impl<K: Into<String>, V: Into<StyleValue>> FromIterator<(K, V)> for StyleMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl TryFrom<Value> for StyleMap {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

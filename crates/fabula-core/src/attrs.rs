//! Per-player numeric attribute maps.

use std::collections::BTreeMap;

use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};

/// A flat name → integer attribute map for one (story, player) pair.
///
/// Created empty on first entry from the story root (which also clears any
/// prior progress), mutated in place by effects, and deleted only by an
/// explicit reset. Deserialization is defensive: stores serialize values
/// loosely, so numbers arriving as strings are re-parsed and anything
/// non-numeric is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, i64>);

impl AttributeMap {
    /// Create an empty attribute map.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current value of an attribute, if present.
    pub fn get(&self, stat: &str) -> Option<i64> {
        self.0.get(stat).copied()
    }

    /// The current value of an attribute, treating a missing one as 0.
    pub fn value_or_zero(&self, stat: &str) -> i64 {
        self.get(stat).unwrap_or(0)
    }

    /// Set an attribute to a fixed value.
    pub fn set(&mut self, stat: impl Into<String>, value: i64) {
        self.0.insert(stat.into(), value);
    }

    /// Adjust an attribute by `delta`, treating a missing one as 0.
    /// Returns the new value.
    pub fn add(&mut self, stat: impl Into<String>, delta: i64) -> i64 {
        let entry = self.0.entry(stat.into()).or_insert(0);
        *entry = entry.saturating_add(delta);
        *entry
    }

    /// Overlay every attribute of `other` onto this map.
    pub fn merge(&mut self, other: &AttributeMap) {
        for (stat, value) in &other.0 {
            self.0.insert(stat.clone(), *value);
        }
    }

    /// Remove all attributes.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Whether the map has no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Rebuild a map from a loosely typed JSON object.
    ///
    /// Values that are integers, integral floats, or strings holding an
    /// integer are kept; everything else is dropped.
    pub fn from_json_object(value: &serde_json::Value) -> Self {
        let mut map = BTreeMap::new();
        if let Some(object) = value.as_object() {
            for (key, value) in object {
                if let Some(parsed) = coerce_int(value) {
                    map.insert(key.clone(), parsed);
                }
            }
        }
        Self(map)
    }
}

fn coerce_int(value: &serde_json::Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    if let Some(f) = value.as_f64()
        && f.fract() == 0.0
    {
        return Some(f as i64);
    }
    value.as_str().and_then(|s| s.trim().parse().ok())
}

impl<'de> Deserialize<'de> for AttributeMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(Self::new());
        }
        if !raw.is_object() {
            return Err(D::Error::custom("attribute map must be a JSON object"));
        }
        Ok(Self::from_json_object(&raw))
    }
}

impl FromIterator<(String, i64)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

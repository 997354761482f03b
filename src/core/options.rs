//! core::options
//!
//! Ordered option bags attached to records and references.
//!
//! # Merge Semantics
//!
//! - [`Options::deep_merge`]: nested objects merge key by key, every other
//!   value is overwritten by the incoming one. Used when several records
//!   describe the same target.
//! - [`Options::merge_missing`]: only keys that are absent are copied
//!   (first write wins). Used for metadata passthrough.
//!
//! Key order is insertion order and survives every operation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An insertion-ordered JSON object of options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    /// Create an empty option bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value if it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a string option.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Get a boolean option, treating absence as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Read a key holding either a single string or an array of strings.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Merge `other` into `self`, recursing into nested objects.
    ///
    /// # Example
    ///
    /// ```
    /// use schemaref::core::options::Options;
    /// use serde_json::json;
    ///
    /// let mut a = Options::from_value(json!({"name": "car", "ui": {"color": "red"}})).unwrap();
    /// let b = Options::from_value(json!({"ui": {"icon": "car"}, "name": "Car"})).unwrap();
    /// a.deep_merge(&b);
    /// assert_eq!(
    ///     serde_json::to_value(&a).unwrap(),
    ///     json!({"name": "Car", "ui": {"color": "red", "icon": "car"}})
    /// );
    /// ```
    pub fn deep_merge(&mut self, other: &Options) {
        merge_maps(&mut self.0, &other.0);
    }

    /// Copy keys from `other` that are not present yet.
    pub fn merge_missing(&mut self, other: &Options) {
        for (k, v) in other.iter() {
            if !self.0.contains_key(k) {
                self.0.insert(k.clone(), v.clone());
            }
        }
    }

    /// Whether every key of `pattern` is present with an equal value.
    pub fn matches(&self, pattern: &Options) -> bool {
        pattern
            .iter()
            .all(|(k, v)| self.0.get(k).map(|own| own == v).unwrap_or(false))
    }
}

fn merge_maps(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, incoming) in source {
        match (target.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => merge_maps(existing, nested),
            _ => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}

impl From<Map<String, Value>> for Options {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Options> for Value {
    fn from(options: Options) -> Self {
        Value::Object(options.0)
    }
}

impl FromIterator<(String, Value)> for Options {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts(value: Value) -> Options {
        Options::from_value(value).unwrap()
    }

    #[test]
    fn deep_merge_overwrites_scalars_and_merges_objects() {
        let mut base = opts(json!({"a": 1, "nested": {"x": 1, "y": 2}, "list": [1, 2]}));
        base.deep_merge(&opts(json!({"a": 2, "nested": {"y": 3}, "list": [3]})));

        assert_eq!(
            Value::from(base),
            json!({"a": 2, "nested": {"x": 1, "y": 3}, "list": [3]})
        );
    }

    #[test]
    fn merge_missing_keeps_first_write() {
        let mut base = opts(json!({"minLength": 3}));
        base.merge_missing(&opts(json!({"minLength": 10, "maxLength": 20})));

        assert_eq!(Value::from(base), json!({"minLength": 3, "maxLength": 20}));
    }

    #[test]
    fn preserves_insertion_order() {
        let mut o = Options::new();
        o.insert("zeta", 1);
        o.insert("alpha", 2);
        o.insert("mid", 3);
        let keys: Vec<&String> = o.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);

        o.remove("alpha");
        let keys: Vec<&String> = o.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["zeta", "mid"]);
    }

    #[test]
    fn matches_checks_every_pattern_key() {
        let o = opts(json!({"name": "car", "namespace": "fleet", "extra": true}));
        assert!(o.matches(&opts(json!({"name": "car"}))));
        assert!(o.matches(&opts(json!({"name": "car", "namespace": "fleet"}))));
        assert!(!o.matches(&opts(json!({"name": "truck"}))));
        assert!(!o.matches(&opts(json!({"missing": null}))));
        assert!(o.matches(&Options::new()));
    }

    #[test]
    fn string_list_accepts_string_or_array() {
        let o = opts(json!({"one": "a", "many": ["a", "b", 3], "num": 1}));
        assert_eq!(o.string_list("one"), vec!["a"]);
        assert_eq!(o.string_list("many"), vec!["a", "b"]);
        assert!(o.string_list("num").is_empty());
        assert!(o.string_list("absent").is_empty());
    }
}

//! Order-independent representation of runtime config for fingerprinting.
//!
//! JSON objects serialize in insertion order, so two semantically equal
//! configs built along different code paths would hash differently. The
//! canonical form replaces every object with an array of `{key, value}`
//! records sorted by key, which serializes identically regardless of how
//! the object was built.
//!
//! ```text
//! {"b": 2, "a": {"d": 1, "c": [3, {"z": 0, "y": 0}]}}
//!   → [{"key":"a","value":[{"key":"c","value":[3,[{"key":"y","value":0},{"key":"z","value":0}]]},
//!                          {"key":"d","value":1}]},
//!      {"key":"b","value":2}]
//! ```
//!
//! Arrays keep their element order; their elements are canonicalized in
//! place. An object that already has the record shape (a string `key` and
//! a `value`, nothing else) stays a record with its `value` canonicalized,
//! so canonicalizing a canonical form leaves it unchanged.

use serde_json::{Map, Value};

/// Canonical form of a runtime config value.
#[derive(Debug, Clone, PartialEq)]
pub enum SortedConfig {
    /// Scalars and null, unchanged.
    Value(Value),
    /// An array, element order kept.
    Items(Vec<SortedConfig>),
    /// An object as key-sorted records.
    Entries(Vec<SortedEntry>),
    /// An object already in record shape.
    Record(Box<SortedEntry>),
}

/// One `{key, value}` record of a canonicalized object.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedEntry {
    /// Object key.
    pub key: String,
    /// Canonical form of the value under `key`.
    pub value: SortedConfig,
}

impl SortedEntry {
    fn into_record(self) -> Value {
        let mut record = Map::new();
        record.insert("key".to_owned(), Value::String(self.key));
        record.insert("value".to_owned(), self.value.into_value());
        Value::Object(record)
    }
}

impl SortedConfig {
    /// Converts the canonical form back into a plain JSON value.
    pub fn into_value(self) -> Value {
        match self {
            Self::Value(value) => value,
            Self::Items(items) => {
                Value::Array(items.into_iter().map(SortedConfig::into_value).collect())
            }
            Self::Entries(entries) => {
                Value::Array(entries.into_iter().map(SortedEntry::into_record).collect())
            }
            Self::Record(entry) => entry.into_record(),
        }
    }
}

/// Builds the canonical form of `config`.
pub fn to_sorted_key_value_array(config: &Value) -> SortedConfig {
    match config {
        Value::Array(items) => {
            SortedConfig::Items(items.iter().map(to_sorted_key_value_array).collect())
        }
        Value::Object(map) => match as_record(map) {
            Some((key, value)) => SortedConfig::Record(Box::new(SortedEntry {
                key: key.to_owned(),
                value: to_sorted_key_value_array(value),
            })),
            None => sorted_entries(map),
        },
        other => SortedConfig::Value(other.clone()),
    }
}

fn sorted_entries(map: &Map<String, Value>) -> SortedConfig {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    SortedConfig::Entries(
        keys.into_iter()
            .map(|key| SortedEntry {
                key: key.clone(),
                value: to_sorted_key_value_array(&map[key.as_str()]),
            })
            .collect(),
    )
}

/// `{"key": <string>, "value": <any>}` and nothing else.
fn as_record(map: &Map<String, Value>) -> Option<(&str, &Value)> {
    if map.len() != 2 {
        return None;
    }
    let key = map.get("key")?.as_str()?;
    let value = map.get("value")?;
    Some((key, value))
}

/// Compact JSON of the canonical form; this string is what gets fingerprinted.
pub fn canonical_json(config: &Value) -> String {
    to_sorted_key_value_array(config).into_value().to_string()
}

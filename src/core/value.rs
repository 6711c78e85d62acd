//! Recursive configuration values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A configuration tree: scalars, sequences, and string-keyed mappings.
///
/// Pipeline configurations and function arguments are arbitrarily nested and
/// carry no fixed schema, so tree walks pattern-match this one sum type
/// exhaustively instead of duck-typing. Mapping key order is irrelevant to
/// equality; the `BTreeMap` representation makes traversal deterministic,
/// which the mount builder relies on for stable mount ordering.
///
/// The `untagged` representation round-trips through plain YAML documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ConfigValue>),
    Mapping(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Borrow the string scalar, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Look up a mapping entry by key.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        match self {
            ConfigValue::Mapping(entries) => entries.get(key),
            _ => None,
        }
    }
}

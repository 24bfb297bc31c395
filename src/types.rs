//! Value and mapping types shared by every stage of the pipeline.
//!
//! - [`Scalar`] is a single typed configuration value.
//! - [`RawTable`] is what the ini parser hands back: ordered keys mapping to
//!   scalars or one level of nested sections.
//! - [`FlatConfig`] is the flattened, uppercased key space that resolution,
//!   compilation and loading all work on.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// String form used when a value is concatenated with literal text.
    ///
    /// `null` concatenates as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::String(s) => s.clone(),
        }
    }

    /// Append `suffix` to this value. An empty suffix keeps the original type.
    pub fn concat(self, suffix: &str) -> Scalar {
        if suffix.is_empty() {
            self
        } else {
            Scalar::String(self.to_text() + suffix)
        }
    }

    /// Convert into a JSON value. Non-finite floats have no JSON form and
    /// become `null`; the ini scanner never produces them.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Null => serde_json::Value::Null,
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
            Scalar::Integer(i) => serde_json::Value::from(*i),
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Scalar::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            other => write!(f, "{}", other.to_text()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Integer(i)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Float(f)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// A value in a parsed ini document: a scalar or a nested section.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Scalar(Scalar),
    Table(RawTable),
}

/// Ordered key/value pairs as written in an ini file. Keys keep their
/// original case.
pub type RawTable = Vec<(String, RawValue)>;

/// Insertion-ordered mapping from uppercase flat key to value.
///
/// Inserting a key that already exists replaces its value in place, so the
/// declaration order of the first occurrence is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatConfig {
    entries: Vec<(String, Scalar)>,
}

impl Serialize for FlatConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

impl FlatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace. Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Scalar) -> Option<Scalar> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

}

impl<K: Into<String>> FromIterator<(K, Scalar)> for FlatConfig {
    fn from_iter<I: IntoIterator<Item = (K, Scalar)>>(iter: I) -> Self {
        let mut config = FlatConfig::new();
        for (key, value) in iter {
            config.insert(key, value);
        }
        config
    }
}

impl IntoIterator for FlatConfig {
    type Item = (String, Scalar);
    type IntoIter = std::vec::IntoIter<(String, Scalar)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A dotconst operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstAction {
    /// Show every resolved constant.
    List { json: bool },
    /// Show a single resolved constant.
    Get { key: String },
    /// Compile the configuration into `output` (or the builder's compiled dir).
    Compile { output: Option<PathBuf> },
}

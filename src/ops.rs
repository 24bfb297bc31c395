//! Constant operations: key lookup, listing, and result types.
//!
//! Provides the logic behind `consts list`, `consts get`, `consts compile`,
//! and the `ConstResult` enum that callers use to display results.

use std::fmt;
use std::path::PathBuf;

use crate::error::DotconstError;
use crate::types::{FlatConfig, Scalar};

/// Result of a constant operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstResult {
    /// All resolved constants as display pairs, in definition order.
    Listing { entries: Vec<(String, String)> },
    /// All resolved constants as a JSON object.
    Json(String),
    /// A single constant's resolved value.
    KeyValue { key: String, value: String },
    /// Confirmation that an artifact was written.
    Compiled { path: PathBuf, count: usize },
}

impl fmt::Display for ConstResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstResult::Listing { entries } => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                Ok(())
            }
            ConstResult::Json(json) => write!(f, "{json}"),
            ConstResult::KeyValue { key, value } => write!(f, "{key} = {value}"),
            ConstResult::Compiled { path, count } => {
                write!(f, "Compiled {count} constants to {}", path.display())
            }
        }
    }
}

/// Look up a constant. Keys are matched case-insensitively.
pub fn get_value(config: &FlatConfig, key: &str) -> Result<ConstResult, DotconstError> {
    let name = key.to_uppercase();
    let value = config
        .get(&name)
        .ok_or_else(|| DotconstError::KeyNotFound(key.into()))?;
    Ok(ConstResult::KeyValue {
        key: name,
        value: format_value(value),
    })
}

/// List every constant as `KEY = value` pairs.
pub fn list_values(config: &FlatConfig) -> ConstResult {
    let entries = config
        .iter()
        .map(|(key, value)| (key.to_string(), format_value(value)))
        .collect();
    ConstResult::Listing { entries }
}

/// Every constant as a pretty-printed JSON object, in definition order.
pub fn list_json(config: &FlatConfig) -> Result<ConstResult, DotconstError> {
    Ok(ConstResult::Json(serde_json::to_string_pretty(config)?))
}

/// Format a value for display. Strings are shown bare.
fn format_value(value: &Scalar) -> String {
    match value {
        Scalar::String(s) => s.clone(),
        other => other.to_json().to_string(),
    }
}

//! Flatten parsed ini sections into the single-level constant key space.
//!
//! Section `db`, key `host` becomes `DB_HOST`. Nesting is handled
//! recursively, so `key[sub]` inside `[test]` becomes `TEST_KEY_SUB`.

use crate::types::{FlatConfig, RawTable, RawValue};

/// Flatten a parsed table into uppercase `SECTION_KEY` pairs, keeping
/// declaration order.
pub fn flatten(table: &RawTable) -> FlatConfig {
    let mut out = FlatConfig::new();
    flatten_into(table, "", &mut out);
    out
}

fn flatten_into(table: &RawTable, prefix: &str, out: &mut FlatConfig) {
    for (key, value) in table {
        let flat_key = joined(prefix, key);
        match value {
            RawValue::Scalar(scalar) => {
                out.insert(flat_key, scalar.clone());
            }
            RawValue::Table(sub) => flatten_into(sub, &flat_key, out),
        }
    }
}

fn joined(prefix: &str, key: &str) -> String {
    let key = key.to_uppercase();
    if prefix.is_empty() {
        key
    } else {
        format!("{prefix}_{key}")
    }
}

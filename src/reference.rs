//! Brace references between entries of the same configuration.
//!
//! A value of the form `{OTHER_KEY}suffix` (optionally `@{other_key}@suffix`)
//! takes the value of `OTHER_KEY`, followed by the literal suffix. Only a
//! reference at the very start of the value is recognised, and only once.

use std::sync::LazyLock;

use regex::Regex;

use crate::order::Requires;
use crate::types::{FlatConfig, Scalar};

static BRACE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^@?\{(\w+)\}@?(.*)$").expect("brace reference pattern is valid")
});

/// A parsed `{KEY}suffix` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The key as written between the braces.
    pub token: String,
    /// `token` uppercased, matching the flat key space.
    pub key: String,
    /// Literal text following the reference.
    pub suffix: String,
}

impl Reference {
    pub fn parse(raw: &str) -> Option<Reference> {
        let caps = BRACE_REF.captures(raw)?;
        let token = caps.get(1)?.as_str().to_string();
        let suffix = caps.get(2).map_or("", |m| m.as_str()).to_string();
        Some(Reference {
            key: token.to_uppercase(),
            token,
            suffix,
        })
    }
}

/// An entry whose value is a brace reference, waiting for its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReference {
    pub key: String,
    pub reference: Reference,
    /// Whether `reference.key` names an entry of the same configuration.
    pub known: bool,
}

impl Requires for PendingReference {
    fn key(&self) -> &str {
        &self.key
    }

    fn require(&self) -> Option<&str> {
        self.known.then_some(self.reference.key.as_str())
    }
}

/// Every entry of `raw` holding a brace reference, in declaration order.
pub fn pending_references(raw: &FlatConfig) -> Vec<PendingReference> {
    raw.iter()
        .filter_map(|(key, value)| {
            let reference = Reference::parse(value.as_str()?)?;
            Some(PendingReference {
                key: key.to_string(),
                known: raw.contains_key(&reference.key),
                reference,
            })
        })
        .collect()
}

/// Whether `value` is a string holding a brace reference.
pub fn is_reference(value: &Scalar) -> bool {
    value.as_str().is_some_and(|s| Reference::parse(s).is_some())
}

//! Tagged value extensions.
//!
//! A raw string value that starts with one of the tags below is not a literal:
//! it is handed to the matching [`Extension`], which can either compute the
//! value now ([`Extension::resolve`]) or produce an [`Expr`] that computes it
//! when compiled constants are loaded ([`Extension::emit`]).
//!
//! | Tag | Value |
//! |-----|-------|
//! | `php/dir[:/sub]` | configuration directory, normalized, with `sub` and suffix joined |
//! | `php/env:NAME[:default]` | environment variable, else `default`, else `null` |
//! | `php/const:NAME` | an already defined constant |
//!
//! Tags may be written with a leading `@`, and anything after the tag
//! (optionally introduced by `@`) is a literal suffix: `php/dir@/public`,
//! `php/const:DIRECTORY_SEPARATOR@.cache`.
//!
//! `resolve` is defined as evaluating what `emit` produces, so loading a
//! configuration directly and loading its compiled form always agree.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::artifact::{Expr, Scope};
use crate::error::DotconstError;
use crate::path::normalize_path;
use crate::types::Scalar;

static DIR_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^@?php/dir(?::(/[\w\-. ]+))?@?(.*)$").expect("php/dir pattern is valid")
});

static ENV_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^@?php/env:(\w+)(?::(\w+))?@?(.*)$").expect("php/env pattern is valid")
});

static CONST_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^@?php/const:(\w+)@?(.*)$").expect("php/const pattern is valid")
});

/// The built-in value extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    DirectoryPath,
    EnvironmentLookup,
    ConstantReference,
}

impl Extension {
    /// Dispatch table, in the order extensions are tried.
    pub const ALL: [Extension; 3] = [
        Extension::DirectoryPath,
        Extension::EnvironmentLookup,
        Extension::ConstantReference,
    ];

    /// The first extension whose tag matches `raw`.
    pub fn find(raw: &str) -> Option<Extension> {
        Self::ALL.into_iter().find(|ext| ext.identify(raw))
    }

    pub fn tag(self) -> &'static str {
        match self {
            Extension::DirectoryPath => "php/dir",
            Extension::EnvironmentLookup => "php/env",
            Extension::ConstantReference => "php/const",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Extension::DirectoryPath => &DIR_TAG,
            Extension::EnvironmentLookup => &ENV_TAG,
            Extension::ConstantReference => &CONST_TAG,
        }
    }

    pub fn identify(self, raw: &str) -> bool {
        self.pattern().is_match(raw)
    }

    /// The expression computing `raw`'s value, or `None` if this extension
    /// does not recognise it. `base_dir` is the directory holding the
    /// configuration file.
    pub fn emit(self, raw: &str, base_dir: &str) -> Option<Expr> {
        let caps = self.pattern().captures(raw)?;
        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

        Some(match self {
            Extension::DirectoryPath => {
                let joined = format!("{base_dir}/{}{}", group(1), group(2));
                Expr::Literal(Scalar::String(normalize_path(&joined)))
            }
            Extension::EnvironmentLookup => Expr::Env {
                name: group(1).to_string(),
                default: optional(&caps, 2),
            }
            .with_suffix(group(3)),
            Extension::ConstantReference => {
                Expr::Const(group(1).to_string()).with_suffix(group(2))
            }
        })
    }

    /// Compute `raw`'s value now. Returns `Ok(None)` if this extension does
    /// not recognise it.
    pub fn resolve(
        self,
        raw: &str,
        base_dir: &str,
        scope: &Scope<'_>,
    ) -> Result<Option<Scalar>, DotconstError> {
        self.emit(raw, base_dir)
            .map(|expr| expr.evaluate(scope))
            .transpose()
    }
}

fn optional(caps: &Captures<'_>, i: usize) -> Option<String> {
    caps.get(i).map(|m| m.as_str().to_string())
}

//! Value resolution: turn a raw flat configuration into final values.
//!
//! Operates on an already merged and flattened [`FlatConfig`] with no I/O,
//! so the whole pipeline is testable with synthetic inputs. Two passes:
//!
//! 1. Every string value carrying an extension tag is handed to the first
//!    matching [`Extension`]. Its result is final and is never rescanned.
//! 2. Every remaining `{KEY}suffix` value is substituted, in dependency
//!    order, so a reference always sees the final value of its target.
//!
//! Unknown reference targets keep the bare token text followed by the suffix
//! and log a warning, unless [`ResolveContext::strict`] is set.

use tracing::{trace, warn};

use crate::artifact::Scope;
use crate::constants::Constants;
use crate::env::Environment;
use crate::error::DotconstError;
use crate::extension::Extension;
use crate::order::order;
use crate::reference::{is_reference, pending_references};
use crate::types::{FlatConfig, Scalar};

/// Everything resolution reads besides the configuration itself.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Directory holding the configuration file, used by `php/dir`.
    pub base_dir: &'a str,
    pub env: &'a Environment,
    pub constants: &'a Constants,
    /// Fail on references to keys that do not exist.
    pub strict: bool,
}

/// Resolve `raw` into final values. Keys and their order are unchanged.
pub fn resolve(raw: &FlatConfig, ctx: &ResolveContext<'_>) -> Result<FlatConfig, DotconstError> {
    let mut resolved = FlatConfig::new();
    // Entries whose value is already final, visible to `php/const:`.
    let mut settled = FlatConfig::new();

    for (key, value) in raw.iter() {
        let deferred = is_reference(value);
        let tagged = value
            .as_str()
            .and_then(|text| Extension::find(text).map(|ext| (ext, text)));
        let value = match tagged {
            Some((ext, text)) => {
                let scope = Scope {
                    env: ctx.env,
                    constants: ctx.constants,
                    defined: &settled,
                };
                let computed = ext
                    .resolve(text, ctx.base_dir, &scope)?
                    .unwrap_or(Scalar::Null);
                trace!(key, tag = ext.tag(), value = %computed, "resolved extension");
                computed
            }
            None => value.clone(),
        };
        if !deferred {
            settled.insert(key, value.clone());
        }
        resolved.insert(key, value);
    }

    for pending in order(pending_references(raw))? {
        let reference = &pending.reference;
        let value = match resolved.get(&reference.key) {
            Some(target) if pending.known => target.clone().concat(&reference.suffix),
            _ if ctx.strict => {
                return Err(DotconstError::UnresolvedReference(reference.token.clone()));
            }
            _ => {
                warn!(
                    key = %pending.key,
                    reference = %reference.token,
                    "reference to unknown key, keeping its text"
                );
                Scalar::String(format!("{}{}", reference.token, reference.suffix))
            }
        };
        resolved.insert(pending.key, value);
    }

    Ok(resolved)
}

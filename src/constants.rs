//! The constant namespace that loaded configurations are defined into.
//!
//! Loading never writes here on its own: [`Dotconst`](crate::Dotconst)
//! returns a [`FlatConfig`] and the caller decides when to call
//! [`Constants::define_all`]. Names are write-once.

use tracing::trace;

use crate::error::DotconstError;
use crate::types::{FlatConfig, Scalar};

/// A write-once mapping from constant name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constants {
    values: FlatConfig,
}

impl Constants {
    /// An empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// A namespace pre-seeded with platform constants that configurations
    /// can reference through `php/const:`.
    ///
    /// | Name | Value |
    /// |------|-------|
    /// | `DIRECTORY_SEPARATOR` | platform path separator |
    /// | `INT_MAX`, `INT_MIN`, `INT_SIZE` | `i64` limits and width in bytes |
    /// | `FLOAT_EPSILON`, `FLOAT_MAX` | `f64` limits |
    /// | `OS_FAMILY`, `OS`, `ARCH` | target platform |
    pub fn builtin() -> Self {
        let mut values = FlatConfig::new();
        values.insert(
            "DIRECTORY_SEPARATOR",
            Scalar::String(std::path::MAIN_SEPARATOR.to_string()),
        );
        values.insert("INT_MAX", Scalar::Integer(i64::MAX));
        values.insert("INT_MIN", Scalar::Integer(i64::MIN));
        values.insert("INT_SIZE", Scalar::Integer(std::mem::size_of::<i64>() as i64));
        values.insert("FLOAT_EPSILON", Scalar::Float(f64::EPSILON));
        values.insert("FLOAT_MAX", Scalar::Float(f64::MAX));
        values.insert("OS_FAMILY", Scalar::from(std::env::consts::FAMILY));
        values.insert("OS", Scalar::from(std::env::consts::OS));
        values.insert("ARCH", Scalar::from(std::env::consts::ARCH));
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.values.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.values.iter()
    }

    /// Define a single constant. Fails if `name` is already defined.
    pub fn define(&mut self, name: &str, value: Scalar) -> Result<(), DotconstError> {
        if self.values.contains_key(name) {
            return Err(DotconstError::ConstantAlreadyDefined(name.to_string()));
        }
        trace!(name, %value, "define constant");
        self.values.insert(name, value);
        Ok(())
    }

    /// Define every entry of `config`, in order.
    ///
    /// Duplicates are checked before anything is written: on
    /// [`ConstantAlreadyDefined`](DotconstError::ConstantAlreadyDefined) the
    /// namespace is left unchanged.
    pub fn define_all(&mut self, config: &FlatConfig) -> Result<(), DotconstError> {
        if let Some(name) = config.keys().find(|name| self.is_defined(name)) {
            return Err(DotconstError::ConstantAlreadyDefined(name.to_string()));
        }
        for (name, value) in config.iter() {
            self.define(name, value.clone())?;
        }
        Ok(())
    }
}

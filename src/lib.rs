//! Flat, typed constants from section-structured ini files. Point at a
//! directory, load, and define.
//!
//! ```ignore
//! let values = Dotconst::builder()
//!     .source_dir("config")
//!     .compiled_dir("var/cache")
//!     .load()?;
//!
//! let mut constants = Constants::builtin();
//! constants.define_all(&values)?;
//! ```
//!
//! That call reads `config/.const.ini`, merges the override selected by its
//! `APP_ENV` entry, resolves every tagged value and reference, and hands you
//! an ordered `KEY → value` map. If `var/cache/consts.def` exists it is read
//! instead, without touching the ini files at all.
//!
//! # Files
//!
//! ```text
//! config/.const.ini            base, required for compiling
//! config/.const.<ENV>.ini      override, ENV = resolved APP_ENV of the base
//! ```
//!
//! Sections flatten into `SECTION_KEY`, uppercased:
//!
//! ```ini
//! app_env = php/env:APP_ENV:local
//!
//! [database]
//! host = localhost
//! port = 5432
//! ```
//!
//! gives `APP_ENV`, `DATABASE_HOST` and `DATABASE_PORT`. The override file is
//! sparse: it only lists what changes, section by section. Keys compare
//! case-insensitively when merging.
//!
//! Unquoted values are typed (`true`/`on`/`yes`, `false`/`off`/`no`/`none`,
//! `null`, integers, decimals); quoted values are always strings.
//!
//! # Tagged values
//!
//! A value starting with a tag is computed instead of taken literally. See
//! [`Extension`] for the full grammar.
//!
//! | Value | Result |
//! |-------|--------|
//! | `php/dir` | the configuration directory, normalized |
//! | `php/dir:/storage@/logs` | `<dir>/storage/logs` |
//! | `php/env:HOME` | `$HOME`, or null when unset |
//! | `php/env:APP_ENV:local` | `$APP_ENV`, or `local` when unset |
//! | `php/const:DIRECTORY_SEPARATOR@.cache` | a defined constant followed by `.cache` |
//!
//! A leading `@` on the tag (`@php/dir`) is accepted.
//!
//! # References
//!
//! `{other_key}suffix` takes the value of another entry of the same
//! configuration. Without a suffix the referenced value keeps its type; with
//! one the result is a string. References are resolved in dependency order,
//! so declaration order does not matter, and cycles fail with
//! [`DotconstError::CyclicDependency`].
//!
//! A reference to a key that does not exist keeps the key text (with a
//! `tracing` warning). [`.strict(true)`](DotconstBuilder::strict) makes it
//! an error instead.
//!
//! # Compiling
//!
//! [`compile()`](DotconstBuilder::compile) writes the resolution out once as
//! an [`Artifact`]:
//!
//! ```text
//! #!dotconst v1
//! define BASE_PATH = "/srv/app";
//! define APP_ENV = env("APP_ENV", "local");
//! define DATABASE_PORT = 5432;
//! define LOG_DIR = concat(BASE_PATH, "/logs");
//! ```
//!
//! Directory paths and literals are fixed at compile time. Environment lookups
//! and constant references are evaluated every time the artifact is loaded,
//! so loading the artifact gives the same values as loading the sources
//! under the same environment. The file is written to a temporary file and
//! renamed into place.
//!
//! # Defining constants
//!
//! Loading never defines anything. [`Constants`] is an owned, write-once
//! namespace; [`Constants::define_all`] checks every name before defining any
//! and fails with [`DotconstError::ConstantAlreadyDefined`] on a duplicate.
//!
//! # Clap adapter
//!
//! The `cli` module (behind the `clap` feature, on by default) provides
//! [`ConstArgs`], embeddable as a `consts list|get|compile` subcommand group.
//! [`into_action()`](ConstArgs::into_action) produces a [`ConstAction`] that
//! [`DotconstBuilder::handle`] turns into a displayable [`ConstResult`].
//!
//! # Logging
//!
//! The crate emits `tracing` events (`debug!` for files read and written,
//! `warn!` for unresolved references) and never installs a subscriber.
//!
//! # Error handling
//!
//! All fallible operations return [`DotconstError`]. Errors name the file,
//! line, key or builder method involved. See the [`error`] module.

pub mod error;
pub mod types;

mod artifact;
mod builder;
#[cfg(feature = "clap")]
mod cli;
mod compile;
mod constants;
mod env;
mod extension;
mod file;
mod flatten;
mod ini;
pub(crate) mod merge;
mod ops;
mod order;
mod path;
mod reference;
mod resolve;

#[cfg(test)]
mod fixtures;

pub use artifact::{Artifact, Expr, Scope, Statement};
pub use builder::{Dotconst, DotconstBuilder};
#[cfg(feature = "clap")]
pub use cli::{ConstArgs, ConstSubcommand};
pub use constants::Constants;
pub use env::Environment;
pub use error::DotconstError;
pub use extension::Extension;
pub use ops::ConstResult;
pub use path::normalize_path;
pub use resolve::{ResolveContext, resolve};
pub use types::{ConstAction, FlatConfig, Scalar};

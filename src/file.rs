//! Source file discovery and loading.
//!
//! A configuration directory holds a base file and, optionally, one override
//! file per environment:
//!
//! ```text
//! <dir>/.const.ini           base, always read first
//! <dir>/.const.<ENV>.ini     override, ENV = the base file's resolved APP_ENV
//! ```
//!
//! The environment name is taken from the *resolved* base configuration, so
//! `APP_ENV = php/env:APP_ENV:local` selects the override from the process
//! environment with `local` as the fallback. The override is deep-merged over
//! the base and the result is flattened to `SECTION_KEY` form.
//!
//! Missing files are silently skipped. Only actual I/O errors (permissions,
//! a directory in the file's place) are propagated.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::DotconstError;
use crate::flatten::flatten;
use crate::ini;
use crate::merge::deep_merge;
use crate::resolve::{ResolveContext, resolve};
use crate::types::{FlatConfig, RawTable};

/// Where a configuration's files live and how they are named.
#[derive(Debug, Clone, Copy)]
pub struct SourceFiles<'a> {
    pub dir: &'a Path,
    /// File stem shared by base and override files, e.g. `.const`.
    pub base_name: &'a str,
    /// Key in the base file naming the override environment.
    pub env_key: &'a str,
}

impl SourceFiles<'_> {
    /// `<dir>/<base_name>.ini`
    pub fn base_path(&self) -> PathBuf {
        self.dir.join(format!("{}.ini", self.base_name))
    }

    /// `<dir>/<base_name>.<env_name>.ini`
    pub fn override_path(&self, env_name: &str) -> PathBuf {
        self.dir.join(format!("{}.{env_name}.ini", self.base_name))
    }

    /// Load the merged, flattened, unresolved configuration.
    ///
    /// Returns `Ok(None)` when the base file does not exist.
    pub fn load_raw(&self, ctx: &ResolveContext<'_>) -> Result<Option<FlatConfig>, DotconstError> {
        let base_path = self.base_path();
        let Some(content) = read_optional(&base_path)? else {
            debug!(path = %base_path.display(), "no base configuration file");
            return Ok(None);
        };
        let mut table = parse_file(&base_path, &content)?;

        if let Some(env_name) = self.environment_name(&table, ctx)? {
            let override_path = self.override_path(&env_name);
            match read_optional(&override_path)? {
                Some(content) => {
                    let overlay = parse_file(&override_path, &content)?;
                    debug!(path = %override_path.display(), env = %env_name, "merging environment override");
                    table = deep_merge(table, overlay);
                }
                None => {
                    debug!(path = %override_path.display(), env = %env_name, "no environment override file");
                }
            }
        }

        Ok(Some(flatten(&table)))
    }

    /// The base file's resolved environment name, if set and non-empty.
    ///
    /// References the override would have satisfied do not exist yet, so this
    /// lookup never runs strict.
    fn environment_name(
        &self,
        table: &RawTable,
        ctx: &ResolveContext<'_>,
    ) -> Result<Option<String>, DotconstError> {
        let lookup = ResolveContext {
            strict: false,
            ..*ctx
        };
        let resolved = resolve(&flatten(table), &lookup)?;
        let name = resolved
            .get(&self.env_key.to_uppercase())
            .map(|value| value.to_text())
            .unwrap_or_default();
        Ok((!name.is_empty()).then_some(name))
    }
}

/// Read a file, mapping "not found" to `None`.
pub fn read_optional(path: &Path) -> Result<Option<String>, DotconstError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DotconstError::FileRead {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn parse_file(path: &Path, content: &str) -> Result<RawTable, DotconstError> {
    ini::parse(content).map_err(|e| DotconstError::FileParse {
        path: path.to_path_buf(),
        line: e.line,
        message: e.message,
    })
}

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::artifact::Artifact;
use crate::compile;
use crate::constants::Constants;
use crate::env::Environment;
use crate::error::DotconstError;
use crate::file::SourceFiles;
use crate::ops::{self, ConstResult};
use crate::resolve::{ResolveContext, resolve};
use crate::types::{ConstAction, FlatConfig};

const DEFAULT_BASE_NAME: &str = ".const";
const DEFAULT_ENV_KEY: &str = "APP_ENV";
const DEFAULT_ARTIFACT_NAME: &str = "consts.def";

/// Entry point for loading and compiling constants.
pub struct Dotconst;

impl Dotconst {
    pub fn builder() -> DotconstBuilder {
        DotconstBuilder::new()
    }
}

/// Builder for loading a configuration directory into constants.
///
/// Two directories matter:
///
/// - **Source**: [`source_dir()`](Self::source_dir) holds `.const.ini` and
///   its per-environment overrides.
/// - **Compiled**: [`compiled_dir()`](Self::compiled_dir) is where a
///   compiled artifact is looked for first. When it holds one, loading never
///   touches the source files.
pub struct DotconstBuilder {
    source_dir: Option<PathBuf>,
    compiled_dir: Option<PathBuf>,
    base_name: Option<String>,
    env_key: Option<String>,
    artifact_name: Option<String>,
    strict: bool,
    process_env: bool,
    env_vars: Vec<(String, String)>,
    constants: Constants,
}

impl DotconstBuilder {
    fn new() -> Self {
        Self {
            source_dir: None,
            compiled_dir: None,
            base_name: None,
            env_key: None,
            artifact_name: None,
            strict: false,
            process_env: true,
            env_vars: Vec::new(),
            constants: Constants::builtin(),
        }
    }

    /// Directory holding the configuration files.
    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    /// Directory to look in for a compiled artifact before reading sources.
    pub fn compiled_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.compiled_dir = Some(dir.into());
        self
    }

    /// Override the file stem (default: `".const"`).
    pub fn base_name(mut self, name: &str) -> Self {
        self.base_name = Some(name.to_string());
        self
    }

    /// Override the key naming the override environment (default: `"APP_ENV"`).
    pub fn env_key(mut self, key: &str) -> Self {
        self.env_key = Some(key.to_string());
        self
    }

    /// Override the artifact file name (default: `"consts.def"`).
    pub fn artifact_name(mut self, name: &str) -> Self {
        self.artifact_name = Some(name.to_string());
        self
    }

    /// Enable or disable strict mode (default: `false`).
    /// In strict mode, `{KEY}` references to unknown keys produce errors
    /// instead of keeping their text.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Add environment variables visible to `php/env:` lookups. They take
    /// precedence over the process environment.
    pub fn env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Do not read the process environment. Only variables passed through
    /// [`env_vars()`](Self::env_vars) are visible.
    pub fn no_process_env(mut self) -> Self {
        self.process_env = false;
        self
    }

    /// Replace the namespace `php/const:` and compiled references read from
    /// (default: [`Constants::builtin`]).
    pub fn constants(mut self, constants: Constants) -> Self {
        self.constants = constants;
        self
    }

    fn effective_base_name(&self) -> &str {
        self.base_name.as_deref().unwrap_or(DEFAULT_BASE_NAME)
    }

    fn effective_env_key(&self) -> &str {
        self.env_key.as_deref().unwrap_or(DEFAULT_ENV_KEY)
    }

    fn effective_artifact_name(&self) -> &str {
        self.artifact_name.as_deref().unwrap_or(DEFAULT_ARTIFACT_NAME)
    }

    fn effective_source_dir(&self) -> Result<&Path, DotconstError> {
        self.source_dir
            .as_deref()
            .ok_or(DotconstError::SourceDirRequired)
    }

    /// Where a compiled artifact is looked for, if a compiled dir is set.
    fn artifact_path(&self) -> Option<PathBuf> {
        self.compiled_dir
            .as_ref()
            .map(|dir| dir.join(self.effective_artifact_name()))
    }

    fn environment(&self) -> Environment {
        let mut env = if self.process_env {
            Environment::from_process()
        } else {
            Environment::empty()
        };
        for (name, value) in &self.env_vars {
            env.set(name.clone(), value.clone());
        }
        env
    }

    /// Run `f` against the source files and a resolve context built from
    /// the current builder state.
    fn with_source<T>(
        &self,
        f: impl FnOnce(&SourceFiles<'_>, &ResolveContext<'_>) -> Result<T, DotconstError>,
    ) -> Result<T, DotconstError> {
        let dir = self.effective_source_dir()?;
        let base_dir = dir
            .to_str()
            .ok_or_else(|| DotconstError::NonUtf8Path(dir.to_path_buf()))?;
        let env = self.environment();
        let ctx = ResolveContext {
            base_dir,
            env: &env,
            constants: &self.constants,
            strict: self.strict,
        };
        let files = SourceFiles {
            dir,
            base_name: self.effective_base_name(),
            env_key: self.effective_env_key(),
        };
        f(&files, &ctx)
    }

    /// Merge and flatten the source files without resolving any value.
    /// A missing base file yields an empty configuration.
    pub fn load_raw(self) -> Result<FlatConfig, DotconstError> {
        self.with_source(|files, ctx| Ok(files.load_raw(ctx)?.unwrap_or_default()))
    }

    /// Load the resolved constants.
    ///
    /// Reads the compiled artifact when [`compiled_dir()`](Self::compiled_dir)
    /// holds one, otherwise merges and resolves the source files. A missing
    /// base file yields an empty configuration.
    ///
    /// Nothing is defined: pass the result to [`Constants::define_all`].
    pub fn load(self) -> Result<FlatConfig, DotconstError> {
        if let Some(path) = self.artifact_path()
            && path.is_file()
        {
            debug!(path = %path.display(), "loading compiled constants");
            let artifact = Artifact::read(&path)?;
            return artifact.evaluate(&self.environment(), &self.constants);
        }

        self.with_source(|files, ctx| match files.load_raw(ctx)? {
            Some(raw) => resolve(&raw, ctx),
            None => Ok(FlatConfig::new()),
        })
    }

    /// Compile the source files into `<output_dir>/<artifact_name>` and
    /// return the written path.
    pub fn compile(self, output_dir: impl AsRef<Path>) -> Result<PathBuf, DotconstError> {
        let (path, _) = self.compile_into(output_dir.as_ref())?;
        Ok(path)
    }

    fn compile_into(&self, output_dir: &Path) -> Result<(PathBuf, Artifact), DotconstError> {
        let path = output_dir.join(self.effective_artifact_name());
        let artifact = self.with_source(|files, ctx| compile::compile(files, ctx, &path))?;
        Ok((path, artifact))
    }

    /// Handle a `ConstAction` and print the result to stdout.
    pub fn handle_and_print(self, action: &ConstAction) -> Result<(), DotconstError> {
        let result = self.handle(action)?;
        println!("{result}");
        Ok(())
    }

    /// Handle a `ConstAction` (list / get / compile).
    pub fn handle(self, action: &ConstAction) -> Result<ConstResult, DotconstError> {
        match action {
            ConstAction::List { json } => {
                let config = self.load()?;
                if *json {
                    ops::list_json(&config)
                } else {
                    Ok(ops::list_values(&config))
                }
            }
            ConstAction::Get { key } => {
                let config = self.load()?;
                ops::get_value(&config, key)
            }
            ConstAction::Compile { output } => {
                let output_dir = output
                    .clone()
                    .or_else(|| self.compiled_dir.clone())
                    .ok_or(DotconstError::OutputDirRequired)?;
                let (path, artifact) = self.compile_into(&output_dir)?;
                Ok(ConstResult::Compiled {
                    path,
                    count: artifact.statements.len(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::sample_app;
    use crate::path::normalize_path;
    use crate::types::Scalar;
    use std::fs;
    use tempfile::TempDir;

    fn builder_for(dir: &Path) -> DotconstBuilder {
        Dotconst::builder().source_dir(dir).no_process_env()
    }

    fn base_dir(dir: &Path) -> String {
        normalize_path(&dir.to_string_lossy())
    }

    #[test]
    fn defaults() {
        let builder = Dotconst::builder();
        assert_eq!(builder.effective_base_name(), ".const");
        assert_eq!(builder.effective_env_key(), "APP_ENV");
        assert_eq!(builder.effective_artifact_name(), "consts.def");
        assert!(!builder.strict);
        assert!(builder.artifact_path().is_none());
    }

    #[test]
    fn overrides_names() {
        let builder = Dotconst::builder()
            .base_name("app")
            .env_key("STAGE")
            .artifact_name("app.def")
            .compiled_dir("/var/cache/app");
        assert_eq!(builder.effective_base_name(), "app");
        assert_eq!(builder.effective_env_key(), "STAGE");
        assert_eq!(
            builder.artifact_path(),
            Some(PathBuf::from("/var/cache/app/app.def"))
        );
    }

    #[test]
    fn explicit_env_vars_win_over_process_env() {
        let env = Dotconst::builder()
            .env_vars([("PATH", "/only/this")])
            .environment();
        assert_eq!(env.get("PATH"), Some("/only/this"));
    }

    #[test]
    fn missing_source_dir_errors() {
        let result = Dotconst::builder().load();
        assert!(matches!(result, Err(DotconstError::SourceDirRequired)));
    }

    // --- Load tests ---

    #[test]
    fn load_sample_app_with_testing_override() {
        let app = sample_app();
        let config = builder_for(app.path()).load().unwrap();
        let root = base_dir(app.path());

        assert_eq!(config.get("BASE_PATH"), Some(&Scalar::String(root.clone())));
        assert_eq!(config.get("APP_ENV"), Some(&Scalar::from("testing")));
        assert_eq!(config.get("ENV_WITHOUTDEFAULT"), Some(&Scalar::Null));
        assert_eq!(config.get("TEST_CONST"), Some(&Scalar::Integer(i64::MAX)));
        assert_eq!(config.get("TEST_BOOL"), Some(&Scalar::Bool(true)));
        assert_eq!(config.get("TEST_INT"), Some(&Scalar::Integer(456)));
        assert_eq!(config.get("TEST_FLOAT"), Some(&Scalar::Float(987.5)));
        assert_eq!(config.get("TEST_STR"), Some(&Scalar::from("abc")));
        assert_eq!(config.get("TEST_NOTHING"), Some(&Scalar::Null));
        assert_eq!(
            config.get("TEST_NESTED"),
            Some(&Scalar::String(format!("{root}/storage")))
        );
        assert_eq!(
            config.get("TEST_NESTEDSUB"),
            Some(&Scalar::String(format!("{root}/storage/test")))
        );
        assert_eq!(config.get("DATABASE_HOST"), Some(&Scalar::from("test-db")));
        assert_eq!(config.get("DATABASE_PORT"), Some(&Scalar::Integer(5432)));
        assert_eq!(config.get("DATABASE_NAME"), Some(&Scalar::from("fixtures")));
    }

    #[test]
    fn env_selects_other_override() {
        let app = sample_app();
        let config = builder_for(app.path())
            .env_vars([("APP_ENV", "production")])
            .load()
            .unwrap();
        assert_eq!(config.get("APP_ENV"), Some(&Scalar::from("production")));
        assert_eq!(config.get("DATABASE_HOST"), Some(&Scalar::from("prod-db")));
        assert_eq!(config.get("TEST_INT"), Some(&Scalar::Integer(123)));
        assert!(!config.contains_key("DATABASE_NAME"));
    }

    #[test]
    fn load_raw_leaves_values_unresolved() {
        let app = sample_app();
        let raw = builder_for(app.path()).load_raw().unwrap();
        assert_eq!(raw.get("BASE_PATH"), Some(&Scalar::from("@php/dir")));
        assert_eq!(raw.get("TEST_NESTED"), Some(&Scalar::from("@{storage_path}")));
        assert_eq!(raw.get("DATABASE_HOST"), Some(&Scalar::from("test-db")));
    }

    #[test]
    fn missing_files_load_empty() {
        let dir = TempDir::new().unwrap();
        let config = builder_for(dir.path()).load().unwrap();
        assert!(config.is_empty());
        let raw = builder_for(dir.path()).load_raw().unwrap();
        assert!(raw.is_empty());
    }

    #[test]
    fn malformed_file_errors() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".const.ini"), "[unterminated\n").unwrap();
        let result = builder_for(dir.path()).load();
        assert!(matches!(result, Err(DotconstError::FileParse { line: 1, .. })));
    }

    #[test]
    fn strict_rejects_unknown_reference() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".const.ini"), "link = {nowhere}\n").unwrap();

        let lenient = builder_for(dir.path()).load().unwrap();
        assert_eq!(lenient.get("LINK"), Some(&Scalar::from("nowhere")));

        let result = builder_for(dir.path()).strict(true).load();
        assert!(matches!(result, Err(DotconstError::UnresolvedReference(_))));
    }

    #[test]
    fn custom_base_name_and_env_key() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.ini"), "stage = php/env:STAGE:dev\nport = 80\n").unwrap();
        fs::write(dir.path().join("app.dev.ini"), "port = 8080\n").unwrap();
        let config = builder_for(dir.path())
            .base_name("app")
            .env_key("stage")
            .load()
            .unwrap();
        assert_eq!(config.get("PORT"), Some(&Scalar::Integer(8080)));
    }

    #[test]
    fn defining_loaded_constants_twice_fails() {
        let app = sample_app();
        let config = builder_for(app.path()).load().unwrap();
        let mut namespace = Constants::new();
        namespace.define_all(&config).unwrap();
        assert_eq!(namespace.len(), config.len());

        let err = namespace.define_all(&config).unwrap_err();
        assert!(matches!(err, DotconstError::ConstantAlreadyDefined(name) if name == "BASE_PATH"));
        assert_eq!(namespace.len(), config.len());
    }

    // --- Compile tests ---

    #[test]
    fn compile_then_load_round_trips() {
        let app = sample_app();
        let out = TempDir::new().unwrap();

        let path = builder_for(app.path()).compile(out.path()).unwrap();
        assert_eq!(path, out.path().join("consts.def"));

        let direct = builder_for(app.path()).load().unwrap();
        let compiled = Dotconst::builder()
            .compiled_dir(out.path())
            .no_process_env()
            .load()
            .unwrap();

        assert_eq!(compiled.len(), direct.len());
        for (key, value) in direct.iter() {
            assert_eq!(compiled.get(key), Some(value), "mismatch for {key}");
        }
    }

    #[test]
    fn compiled_artifact_preferred_over_sources() {
        let app = sample_app();
        let out = TempDir::new().unwrap();
        builder_for(app.path()).compile(out.path()).unwrap();

        fs::write(app.path().join(".const.ini"), "changed = 1\n").unwrap();
        let config = builder_for(app.path())
            .compiled_dir(out.path())
            .load()
            .unwrap();
        assert!(!config.contains_key("CHANGED"));
        assert!(config.contains_key("BASE_PATH"));
    }

    #[test]
    fn compiled_env_lookups_happen_at_load_time() {
        let app = sample_app();
        let out = TempDir::new().unwrap();
        builder_for(app.path()).compile(out.path()).unwrap();

        let config = Dotconst::builder()
            .compiled_dir(out.path())
            .no_process_env()
            .env_vars([("APP_ENV", "staging")])
            .load()
            .unwrap();
        assert_eq!(config.get("APP_ENV"), Some(&Scalar::from("staging")));
        // The override was chosen when compiling.
        assert_eq!(config.get("DATABASE_HOST"), Some(&Scalar::from("test-db")));
    }

    #[test]
    fn compiled_dir_without_artifact_falls_back_to_sources() {
        let app = sample_app();
        let empty = TempDir::new().unwrap();
        let config = builder_for(app.path())
            .compiled_dir(empty.path())
            .load()
            .unwrap();
        assert_eq!(config.get("DATABASE_HOST"), Some(&Scalar::from("test-db")));
    }

    #[test]
    fn compile_missing_source_errors() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let result = builder_for(dir.path()).compile(out.path());
        assert!(matches!(result, Err(DotconstError::MissingSource(_))));
    }

    #[test]
    fn compile_into_missing_directory_errors() {
        let app = sample_app();
        let out = TempDir::new().unwrap();
        let result = builder_for(app.path()).compile(out.path().join("missing"));
        assert!(matches!(result, Err(DotconstError::FileWrite { .. })));
    }

    #[test]
    fn compile_overwrites_previous_artifact() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(dir.path().join(".const.ini"), "version = 1\n").unwrap();
        builder_for(dir.path()).compile(out.path()).unwrap();
        fs::write(dir.path().join(".const.ini"), "version = 2\n").unwrap();
        builder_for(dir.path()).compile(out.path()).unwrap();

        let config = Dotconst::builder()
            .compiled_dir(out.path())
            .no_process_env()
            .load()
            .unwrap();
        assert_eq!(config.get("VERSION"), Some(&Scalar::Integer(2)));
    }

    #[test]
    fn invalid_artifact_errors() {
        let out = TempDir::new().unwrap();
        fs::write(out.path().join("consts.def"), "not an artifact\n").unwrap();
        let result = Dotconst::builder()
            .compiled_dir(out.path())
            .no_process_env()
            .load();
        assert!(matches!(result, Err(DotconstError::InvalidArtifact { line: 1, .. })));
    }

    fn compile_and_load_both_ways(ini: &str) -> (FlatConfig, FlatConfig) {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(dir.path().join(".const.ini"), ini).unwrap();

        let direct = builder_for(dir.path()).load().unwrap();
        builder_for(dir.path()).compile(out.path()).unwrap();
        let compiled = Dotconst::builder()
            .compiled_dir(out.path())
            .no_process_env()
            .load()
            .unwrap();
        (direct, compiled)
    }

    #[test]
    fn awkward_keys_round_trip_through_compile() {
        let (direct, compiled) = compile_and_load_both_ways(
            "db-host = localhost\n\
             1st = a\n\
             app.name = demo\n\
             größe = 3\n\
             first_copy = {1st}\n\
             first_link = {1st}/x\n\
             [null]\n\
             env = {first_copy}\n",
        );

        assert_eq!(direct.get("DB-HOST"), Some(&Scalar::from("localhost")));
        assert_eq!(direct.get("GRÖSSE"), Some(&Scalar::Integer(3)));
        assert_eq!(direct.get("FIRST_COPY"), Some(&Scalar::from("a")));
        assert_eq!(direct.get("FIRST_LINK"), Some(&Scalar::from("a/x")));
        assert_eq!(direct.get("NULL_ENV"), Some(&Scalar::from("a")));
        assert_eq!(compiled.len(), direct.len());
        for (key, value) in direct.iter() {
            assert_eq!(compiled.get(key), Some(value), "mismatch for {key}");
        }
    }

    #[test]
    fn overflowing_decimal_round_trips_as_text() {
        let (direct, compiled) =
            compile_and_load_both_ways("big = 1.0e999\nmin = -9223372036854775808\n");
        assert_eq!(direct.get("BIG"), Some(&Scalar::from("1.0e999")));
        assert_eq!(direct.get("MIN"), Some(&Scalar::Integer(i64::MIN)));
        assert_eq!(compiled, direct);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_source_dir_errors() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = PathBuf::from(OsStr::from_bytes(b"/srv/\xffapp"));
        let result = Dotconst::builder().source_dir(&dir).no_process_env().load();
        assert!(matches!(result, Err(DotconstError::NonUtf8Path(path)) if path == dir));
    }

    // --- Action handling ---

    #[test]
    fn handle_list() {
        let app = sample_app();
        let result = builder_for(app.path())
            .handle(&ConstAction::List { json: false })
            .unwrap();
        match result {
            ConstResult::Listing { entries } => {
                assert!(entries.iter().any(|(k, v)| k == "DATABASE_HOST" && v == "test-db"));
            }
            other => panic!("Expected Listing, got {other:?}"),
        }
    }

    #[test]
    fn handle_list_json() {
        let app = sample_app();
        let result = builder_for(app.path())
            .handle(&ConstAction::List { json: true })
            .unwrap();
        let ConstResult::Json(json) = result else {
            panic!("Expected Json");
        };
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["TEST_INT"], serde_json::json!(456));
    }

    #[test]
    fn handle_get() {
        let app = sample_app();
        let result = builder_for(app.path())
            .handle(&ConstAction::Get {
                key: "database_port".into(),
            })
            .unwrap();
        assert_eq!(
            result,
            ConstResult::KeyValue {
                key: "DATABASE_PORT".into(),
                value: "5432".into(),
            }
        );
    }

    #[test]
    fn handle_compile_uses_compiled_dir_by_default() {
        let app = sample_app();
        let out = TempDir::new().unwrap();
        let result = builder_for(app.path())
            .compiled_dir(out.path())
            .handle(&ConstAction::Compile { output: None })
            .unwrap();
        match result {
            ConstResult::Compiled { path, count } => {
                assert_eq!(path, out.path().join("consts.def"));
                assert!(path.exists());
                assert_eq!(count, 16);
            }
            other => panic!("Expected Compiled, got {other:?}"),
        }
    }

    #[test]
    fn handle_compile_without_output_errors() {
        let app = sample_app();
        let result = builder_for(app.path()).handle(&ConstAction::Compile { output: None });
        assert!(matches!(result, Err(DotconstError::OutputDirRequired)));
    }
}

//! Compile a configuration directory into an [`Artifact`].
//!
//! The artifact defines every key of the merged configuration. Statements
//! for plain values and extension tags come first, in declaration order.
//! Brace references follow in dependency order, each as a reference to the
//! constant it points at, so evaluating the artifact reproduces exactly what
//! [`resolve`] computes from the source files.

use std::path::Path;

use tracing::{debug, warn};

use crate::artifact::{Artifact, Expr, Statement};
use crate::error::DotconstError;
use crate::extension::Extension;
use crate::file::SourceFiles;
use crate::order::order;
use crate::reference::{is_reference, pending_references};
use crate::resolve::{ResolveContext, resolve};
use crate::types::{FlatConfig, Scalar};

/// Load, check and compile the configuration in `files`, writing the result
/// atomically to `output`.
///
/// Fails with [`MissingSource`](DotconstError::MissingSource) when the base
/// file does not exist. Resolution errors (cycles, undefined constants,
/// strict-mode references) are reported before anything is written.
pub fn compile(
    files: &SourceFiles<'_>,
    ctx: &ResolveContext<'_>,
    output: &Path,
) -> Result<Artifact, DotconstError> {
    let raw = files
        .load_raw(ctx)?
        .ok_or_else(|| DotconstError::MissingSource(files.base_path()))?;

    resolve(&raw, ctx)?;

    let artifact = build_artifact(&raw, ctx.base_dir)?;
    artifact.write(output)?;
    debug!(
        source = %files.dir.display(),
        output = %output.display(),
        constants = artifact.statements.len(),
        "compiled configuration"
    );
    Ok(artifact)
}

/// Turn a raw flat configuration into statements. No I/O.
pub fn build_artifact(raw: &FlatConfig, base_dir: &str) -> Result<Artifact, DotconstError> {
    let mut statements = Vec::with_capacity(raw.len());

    for (key, value) in raw.iter() {
        if is_reference(value) {
            continue;
        }
        let expr = value
            .as_str()
            .and_then(|text| Extension::find(text)?.emit(text, base_dir))
            .unwrap_or_else(|| Expr::Literal(value.clone()));
        statements.push(Statement::new(key, expr));
    }

    for pending in order(pending_references(raw))? {
        let reference = pending.reference;
        let expr = if pending.known {
            Expr::Const(reference.key).with_suffix(&reference.suffix)
        } else {
            warn!(
                key = %pending.key,
                reference = %reference.token,
                "reference to unknown key, compiling its text"
            );
            Expr::Literal(Scalar::String(format!("{}{}", reference.token, reference.suffix)))
        };
        statements.push(Statement::new(pending.key, expr));
    }

    Ok(Artifact::new(statements))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Constants;
    use crate::env::Environment;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(pairs: &[(&str, Scalar)]) -> FlatConfig {
        pairs.iter().cloned().collect()
    }

    fn rendered(artifact: &Artifact) -> Vec<String> {
        artifact.statements.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn literals_keep_their_types() {
        let raw = config(&[
            ("TEST_BOOL", Scalar::Bool(true)),
            ("TEST_INT", Scalar::Integer(123)),
            ("TEST_FLOAT", Scalar::Float(2.0)),
            ("TEST_NULL", Scalar::Null),
            ("TEST_STR", Scalar::from("abc")),
        ]);
        let artifact = build_artifact(&raw, "/srv").unwrap();
        assert_eq!(
            rendered(&artifact),
            vec![
                "define TEST_BOOL = true;",
                "define TEST_INT = 123;",
                "define TEST_FLOAT = 2.0;",
                "define TEST_NULL = null;",
                r#"define TEST_STR = "abc";"#,
            ]
        );
    }

    #[test]
    fn extensions_emit_expressions() {
        let raw = config(&[
            ("BASE_PATH", Scalar::from("@php/dir")),
            ("APP_ENV", Scalar::from("@php/env:APP_ENV:testing")),
            ("HOME_CACHE", Scalar::from("php/env:HOME@/.cache")),
            ("TEST_CONST", Scalar::from("@php/const:INT_MAX")),
        ]);
        let artifact = build_artifact(&raw, "/srv/app").unwrap();
        assert_eq!(
            rendered(&artifact),
            vec![
                r#"define BASE_PATH = "/srv/app";"#,
                r#"define APP_ENV = env("APP_ENV", "testing");"#,
                r#"define HOME_CACHE = concat(env("HOME"), "/.cache");"#,
                "define TEST_CONST = INT_MAX;",
            ]
        );
    }

    #[test]
    fn references_come_last_in_dependency_order() {
        let raw = config(&[
            ("NESTEDSUB", Scalar::from("@{nested}@/test")),
            ("STORAGE_PATH", Scalar::from("@php/dir:/storage")),
            ("NESTED", Scalar::from("@{storage_path}")),
            ("DANGLING", Scalar::from("{nowhere}")),
        ]);
        let artifact = build_artifact(&raw, "/srv/app").unwrap();
        assert_eq!(
            rendered(&artifact),
            vec![
                r#"define STORAGE_PATH = "/srv/app/storage";"#,
                r#"define DANGLING = "nowhere";"#,
                "define NESTED = STORAGE_PATH;",
                r#"define NESTEDSUB = concat(NESTED, "/test");"#,
            ]
        );
    }

    #[test]
    fn reference_cycle_fails() {
        let raw = config(&[("A", Scalar::from("{a}"))]);
        let err = build_artifact(&raw, "/srv").unwrap_err();
        assert!(matches!(err, DotconstError::CyclicDependency { .. }));
    }

    #[test]
    fn compiled_values_match_direct_resolution() {
        let raw = config(&[
            ("BASE_PATH", Scalar::from("php/dir")),
            ("APP_ENV", Scalar::from("php/env:APP_ENV:testing")),
            ("COPY_INT", Scalar::from("{test_int}")),
            ("TEST_INT", Scalar::Integer(123)),
            ("SEP", Scalar::from("php/const:DIRECTORY_SEPARATOR@x")),
            ("PUBLIC", Scalar::from("{base_path}/public")),
            ("UNKNOWN", Scalar::from("{ghost}/x")),
        ]);
        let env = Environment::from_pairs([("APP_ENV", "ci")]);
        let constants = Constants::builtin();
        let ctx = ResolveContext {
            base_dir: "/srv/app",
            env: &env,
            constants: &constants,
            strict: false,
        };

        let direct = resolve(&raw, &ctx).unwrap();
        let compiled = build_artifact(&raw, "/srv/app")
            .unwrap()
            .evaluate(&env, &constants)
            .unwrap();

        assert_eq!(compiled.len(), direct.len());
        for (key, value) in direct.iter() {
            assert_eq!(compiled.get(key), Some(value), "mismatch for {key}");
        }
    }

    #[test]
    fn compile_writes_artifact() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(src.path().join(".const.ini"), "answer = 42\n").unwrap();

        let env = Environment::empty();
        let constants = Constants::new();
        let base_dir = src.path().to_string_lossy().into_owned();
        let ctx = ResolveContext {
            base_dir: &base_dir,
            env: &env,
            constants: &constants,
            strict: false,
        };
        let files = SourceFiles {
            dir: src.path(),
            base_name: ".const",
            env_key: "APP_ENV",
        };
        let path = out.path().join("consts.def");

        let artifact = compile(&files, &ctx, &path).unwrap();
        assert_eq!(artifact.statements.len(), 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "#!dotconst v1\ndefine ANSWER = 42;\n"
        );
    }

    #[test]
    fn compile_without_base_file_is_missing_source() {
        let src = TempDir::new().unwrap();
        let env = Environment::empty();
        let constants = Constants::new();
        let ctx = ResolveContext {
            base_dir: "",
            env: &env,
            constants: &constants,
            strict: false,
        };
        let files = SourceFiles {
            dir: src.path(),
            base_name: ".const",
            env_key: "APP_ENV",
        };
        let err = compile(&files, &ctx, &src.path().join("consts.def")).unwrap_err();
        assert!(matches!(err, DotconstError::MissingSource(path) if path.ends_with(".const.ini")));
        assert!(!src.path().join("consts.def").exists());
    }

    fn literal() -> impl Strategy<Value = Scalar> {
        prop_oneof![
            Just(Scalar::Null),
            any::<bool>().prop_map(Scalar::Bool),
            any::<i64>().prop_map(Scalar::Integer),
            any::<f64>()
                .prop_filter("finite", |f| f.is_finite())
                .prop_map(Scalar::Float),
            // No braces or slashes, so never a tag or a reference.
            "[a-zA-Z0-9 \"\\\\\n\t;=#äß€]{0,12}".prop_map(Scalar::String),
        ]
    }

    /// Keys are any printable text: punctuation, leading digits, non-ASCII.
    fn literal_config() -> impl Strategy<Value = FlatConfig> {
        prop::collection::vec(("\\PC{1,10}", literal()), 0..20)
            .prop_map(|pairs| pairs.into_iter().collect())
    }

    proptest! {
        #[test]
        fn literal_configs_survive_compile_and_parse(raw in literal_config()) {
            let env = Environment::empty();
            let constants = Constants::new();
            let ctx = ResolveContext {
                base_dir: "/srv",
                env: &env,
                constants: &constants,
                strict: false,
            };

            let direct = resolve(&raw, &ctx).unwrap();
            let text = build_artifact(&raw, "/srv").unwrap().to_string();
            let compiled = Artifact::parse(&text)
                .unwrap()
                .evaluate(&env, &constants)
                .unwrap();
            prop_assert_eq!(compiled, direct);
        }
    }
}

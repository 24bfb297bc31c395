use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DotconstError {
    #[error("Failed to parse {path} (line {line}): {message}")]
    FileParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Nothing to compile: {0} does not exist")]
    MissingSource(PathBuf),

    #[error("Can't create file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cyclic dependency on '{key}': {}", .chain.join(" -> "))]
    CyclicDependency { key: String, chain: Vec<String> },

    #[error("Constant '{0}' is already defined")]
    ConstantAlreadyDefined(String),

    #[error("Undefined constant '{0}'")]
    UndefinedConstant(String),

    #[error("Unresolved reference '{{{0}}}'")]
    UnresolvedReference(String),

    #[error("Invalid compiled constants file {path} (line {line}): {reason}")]
    InvalidArtifact {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Failed to serialize constants: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("No constant named '{0}' in the configuration")]
    KeyNotFound(String),

    #[error("Source directory {0} is not valid UTF-8")]
    NonUtf8Path(PathBuf),

    #[error("Source directory is required: call .source_dir() on the builder")]
    SourceDirRequired,

    #[error("No output directory: pass one or call .compiled_dir() on the builder")]
    OutputDirRequired,
}

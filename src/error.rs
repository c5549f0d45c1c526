//! Crate error type.
//! One error enum covering staging, tool runs, linting, reports and CI logs.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // Missing inputs
    #[error("dataset info not found: {0}")]
    DatasetInfoMissing(PathBuf),

    #[error("corruption level directory not found: {0}")]
    CorruptionLevelMissing(PathBuf),

    #[error("corpus input not found: {0}")]
    CorpusMissing(PathBuf),

    #[error("no cached linter results for tool '{tool}' at {path}")]
    LinterResultsMissing { tool: String, path: PathBuf },

    #[error("project '{0}' has not been staged; run `styleval exp {0}` first")]
    NotStaged(String),

    // External processes
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("checkstyle did not complete on {dir}: {message}")]
    Lint { dir: PathBuf, message: String },

    #[error("failed to extract archive {archive}: {message}")]
    Extract { archive: PathBuf, message: String },

    #[error("analysis interrupted")]
    Interrupted,

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Error::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("timestamp '{timestamp}' is not present among results in {}", root.display())]
    MissingTimestamp { timestamp: String, root: PathBuf },
    #[error(
        "rate in metadata file '{declared}' does not match the rate from file path '{directory}' ({})",
        path.display()
    )]
    RateMismatch {
        declared: String,
        directory: String,
        path: PathBuf,
    },
    #[error("request rate '{0}' is not an integer")]
    InvalidRate(String),
    #[error("invalid exclusion pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("conflict at {path}")]
    MergeConflict { path: String },
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("'{program}' exited with {status}: {stderr}")]
    ProcessFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingTimestamp { .. }
                | Self::RateMismatch { .. }
                | Self::InvalidRate(_)
                | Self::InvalidPattern { .. }
        )
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

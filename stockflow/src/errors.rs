//! Error types for the stockflow pipeline.
//!
//! Every stage failure is one of a small taxonomy: a required location is
//! missing, a file could not be read or written, a table is structurally
//! wrong, the external analytics job failed, or the state store or
//! configuration is broken. Stages log the failure and propagate it; the
//! orchestrator wraps it into [`RunFailed`] together with the run record.

use crate::pipeline::RunRecord;
use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required source location does not exist.
    #[error("Missing input: {what} not found at {}", path.display())]
    MissingInput {
        /// What was expected at the location.
        what: String,
        /// The location that was checked.
        path: PathBuf,
    },

    /// A read, write or copy on an individual file failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A required column is absent or a value could not be coerced.
    #[error("Schema or parse failure in table '{table}': {message}")]
    SchemaOrParse {
        /// The logical table name.
        table: String,
        /// What was wrong.
        message: String,
    },

    /// The external analytics job reported failure.
    #[error("External job {job_id} failed: {reason}")]
    ExternalJob {
        /// The fixed external job reference.
        job_id: String,
        /// The external run id, when one was assigned.
        run_id: Option<String>,
        /// The failure reason reported by the external runner.
        reason: String,
    },

    /// The watermark state store failed.
    #[error("{0}")]
    State(#[from] StateError),

    /// The configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Creates a missing input error.
    #[must_use]
    pub fn missing_input(what: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self::MissingInput {
            what: what.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates an IO error bound to a path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a schema or parse failure.
    #[must_use]
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaOrParse {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates an external job failure.
    #[must_use]
    pub fn external_job(
        job_id: impl Into<String>,
        run_id: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ExternalJob {
            job_id: job_id.into(),
            run_id,
            reason: reason.into(),
        }
    }

    /// Maps a polars error raised while reading or writing `path`.
    ///
    /// I/O failures stay `Io`; everything else (ragged rows, bad UTF-8,
    /// failed casts) is a structural problem with the table.
    #[must_use]
    pub fn from_polars(table: &str, path: &Path, err: PolarsError) -> Self {
        match err {
            PolarsError::IO { error, .. } => {
                Self::io(path, std::io::Error::new(error.kind(), error.to_string()))
            }
            other => Self::schema(table, other.to_string()),
        }
    }

    /// Returns the taxonomy bucket of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingInput { .. } => ErrorKind::MissingInput,
            Self::Io { .. } => ErrorKind::Io,
            Self::SchemaOrParse { .. } => ErrorKind::SchemaOrParse,
            Self::ExternalJob { .. } => ErrorKind::ExternalJob,
            Self::State(_) => ErrorKind::State,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

/// Serializable classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required location was absent.
    MissingInput,
    /// A file operation failed.
    Io,
    /// A table was structurally invalid.
    SchemaOrParse,
    /// The external analytics job failed.
    ExternalJob,
    /// The state store failed.
    State,
    /// The configuration was invalid.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput => write!(f, "missing_input"),
            Self::Io => write!(f, "io"),
            Self::SchemaOrParse => write!(f, "schema_or_parse"),
            Self::ExternalJob => write!(f, "external_job"),
            Self::State => write!(f, "state"),
            Self::Config => write!(f, "config"),
        }
    }
}

/// Errors produced by a [`StateStore`](crate::state::StateStore).
#[derive(Debug, Error)]
pub enum StateError {
    /// The backing file could not be read or written.
    #[error("state store i/o error on {}: {source}", path.display())]
    Io {
        /// The backing file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not a JSON object of strings.
    #[error("state store at {} is not valid JSON: {source}", path.display())]
    Json {
        /// The backing file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A stored value could not be interpreted.
    #[error("state key '{key}' holds an unreadable value: {value:?}")]
    Corrupt {
        /// The key.
        key: String,
        /// The raw stored value.
        value: String,
    },
}

/// Error returned when a pipeline run ends in the failed state.
///
/// Carries the run record so the caller can report every stage outcome.
#[derive(Debug, Error)]
#[error("Pipeline run failed at stage '{stage}': {source}")]
pub struct RunFailed {
    /// The stage that failed.
    pub stage: String,
    /// The record of the run up to and including the failure.
    pub record: Box<RunRecord>,
    /// The stage error.
    #[source]
    pub source: PipelineError,
}

impl RunFailed {
    /// Returns the taxonomy bucket of the underlying error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

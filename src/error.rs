//! Error kinds for the export pipeline.
//!
//! [`ExportError`] names *what* went wrong; [`PipelineError`] adds *where*
//! (the [`Stage`] that was running). Unresolved foreign keys are not errors:
//! they are counted and rendered as empty cells.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("source database unavailable at {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("permission denied reading {path}: {reason}")]
    PermissionDenied { path: PathBuf, reason: String },

    #[error("source database at {path} is locked by another process")]
    SourceLocked { path: PathBuf },

    #[error("schema mismatch in table '{table}': {reason}")]
    SchemaMismatch { table: String, reason: String },

    #[error("cannot write destination {path}: {reason}")]
    DestinationUnwritable { path: PathBuf, reason: String },

    #[error("query failed on table '{table}': {source}")]
    Query {
        table: String,
        #[source]
        source: sqlx::Error,
    },
}

impl ExportError {
    pub fn schema(table: &str, reason: impl Into<String>) -> Self {
        ExportError::SchemaMismatch {
            table: table.to_string(),
            reason: reason.into(),
        }
    }

    pub fn destination(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        ExportError::DestinationUnwritable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Map an I/O error raised while opening the source file.
    pub fn from_source_io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => ExportError::PermissionDenied {
                path,
                reason: err.to_string(),
            },
            _ => ExportError::SourceUnavailable {
                path,
                reason: err.to_string(),
            },
        }
    }

    /// Classify a driver error raised while talking to the source database.
    ///
    /// SQLite reports extended result codes; the low byte is the primary code.
    pub fn from_sqlx(path: impl Into<PathBuf>, table: &str, err: sqlx::Error) -> Self {
        let path = path.into();
        let code = match &err {
            sqlx::Error::Database(db_err) => db_err
                .code()
                .and_then(|c| c.parse::<i32>().ok())
                .map(|c| c & 0xff),
            _ => None,
        };

        match code {
            Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) => ExportError::SourceLocked { path },
            Some(SQLITE_CORRUPT) | Some(SQLITE_NOTADB) => ExportError::SourceUnavailable {
                path,
                reason: err.to_string(),
            },
            Some(SQLITE_PERM) | Some(SQLITE_READONLY) | Some(SQLITE_CANTOPEN) => {
                ExportError::PermissionDenied {
                    path,
                    reason: err.to_string(),
                }
            }
            _ => match err {
                sqlx::Error::Io(io_err) => ExportError::from_source_io(path, &io_err),
                other => ExportError::Query {
                    table: table.to_string(),
                    source: other,
                },
            },
        }
    }
}

const SQLITE_PERM: i32 = 3;
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_READONLY: i32 = 8;
const SQLITE_CORRUPT: i32 = 11;
const SQLITE_CANTOPEN: i32 = 14;
const SQLITE_NOTADB: i32 = 26;

/// Step of the linear export pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    LoadVisits,
    LoadUrls,
    Index,
    Enrich,
    Export,
    Close,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Connect => "connect",
            Stage::LoadVisits => "load visits",
            Stage::LoadUrls => "load urls",
            Stage::Index => "index",
            Stage::Enrich => "enrich",
            Stage::Export => "export",
            Stage::Close => "close",
        };
        f.write_str(name)
    }
}

/// A fatal error tagged with the stage that produced it.
#[derive(Error, Debug)]
#[error("{stage} failed: {error}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub error: ExportError,
}

impl PipelineError {
    pub fn kind(&self) -> &ExportError {
        &self.error
    }
}

/// Extension for tagging results with a [`Stage`].
pub trait StageExt<T> {
    fn at(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T> StageExt<T> for Result<T, ExportError> {
    fn at(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|error| PipelineError { stage, error })
    }
}

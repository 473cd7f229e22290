//! Error taxonomy shared by the dashboard, the catalog engine, and the command router.
//!
//! Every variant is converted into a structured failure at the router boundary; none of
//! them terminates the process.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Referenced operation, skill, skillset, or persona does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Malformed command or missing/unknown/mistyped argument. Raised before any mutation.
    #[error("{0}")]
    Validation(String),

    /// The backing document exists but is not a valid serialized document.
    #[error("corrupt state in {}: {reason}", path.display())]
    CorruptState { path: PathBuf, reason: String },

    /// Writing the backing document failed; the previous file is left as it was.
    #[error("failed to write {}: {source}", path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Optimistic save found a different revision on disk.
    #[error("conflicting update: expected revision {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },

    #[error("operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Failure reported by the catalog engine.
    #[error("{0}")]
    Engine(String),

    /// Unexpected failure (panic, cancelled task). Logged with context where it is caught.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Wire name of an error variant, reported in failure responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Validation,
    CorruptState,
    StorageWrite,
    Conflict,
    Timeout,
    Engine,
    Internal,
}

impl ShellError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::CorruptState { .. } => ErrorKind::CorruptState,
            Self::StorageWrite { .. } => ErrorKind::StorageWrite,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Engine(_) => ErrorKind::Engine,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn storage_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageWrite {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = ShellError> = std::result::Result<T, E>;

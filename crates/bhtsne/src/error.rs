//! Error types for engine runs

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for t-SNE operations
pub type Result<T> = std::result::Result<T, TsneError>;

/// Errors that can occur while driving the t-SNE engine
#[derive(Debug, Error)]
pub enum TsneError {
    /// Input rejected before any file or process was touched
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Exchange directory or one of its files could not be created, written or removed
    #[error("workspace error at {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Engine could not be started or exited with a non-zero status
    #[error("engine execution failed: {0}")]
    EngineExecution(String),

    /// Engine was killed after exceeding its time budget
    #[error("engine did not finish within {0:?} and was killed")]
    EngineTimeout(Duration),

    /// Engine was killed because the run was cancelled
    #[error("engine run cancelled")]
    Cancelled,

    /// Result file disagrees with the request or is truncated
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),
}

impl TsneError {
    pub(crate) fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TsneError::Workspace {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        TsneError::MalformedInput(msg.into())
    }

    pub(crate) fn mismatch(msg: impl Into<String>) -> Self {
        TsneError::ProtocolMismatch(msg.into())
    }
}

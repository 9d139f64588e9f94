//! Error types for the tgzfs system.

use std::io;
use thiserror::Error;

/// Misuse of the interception session state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionStateError {
    /// `enable()` was called on a session that is already active.
    #[error("session for '{main_directory}' is already active")]
    AlreadyActive {
        main_directory: String,
    },

    /// Another session currently owns the process-wide primitive table.
    #[error("another interception session is already active")]
    AnotherSessionActive,
}

/// Comprehensive error type for all tgzfs operations.
#[derive(Debug, Error)]
pub enum TgzfsError {
    /// The compressed stream is corrupt, truncated or not gzip at all.
    #[error("Decompression failed: {source}")]
    Decompression {
        #[source]
        source: io::Error,
    },

    /// A tar header or its declared content does not fit the buffer.
    #[error("Malformed archive at offset {offset}: {reason}")]
    MalformedArchive {
        offset: usize,
        reason: String,
    },

    /// Path is inside an intercepted prefix but has no entry.
    #[error("ENOENT: no such file or directory, '{path}'")]
    NotFound {
        path: String,
    },

    /// Path cannot be represented where it was requested.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        path: String,
        reason: String,
    },

    /// The interception session was driven through an invalid transition.
    #[error("Session state error: {0}")]
    SessionState(#[from] SessionStateError),

    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        #[source]
        source: io::Error,
    },
}

impl TgzfsError {
    /// Builds a `MalformedArchive` error for the header at `offset`.
    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        TgzfsError::MalformedArchive {
            offset,
            reason: reason.into(),
        }
    }

    /// Builds a `NotFound` error for `path`.
    pub fn not_found(path: impl Into<String>) -> Self {
        TgzfsError::NotFound { path: path.into() }
    }
}

impl From<TgzfsError> for io::Error {
    fn from(err: TgzfsError) -> Self {
        match err {
            TgzfsError::Io { source } => source,
            TgzfsError::NotFound { .. } => io::Error::new(io::ErrorKind::NotFound, err),
            TgzfsError::InvalidPath { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            TgzfsError::Decompression { .. } | TgzfsError::MalformedArchive { .. } => {
                io::Error::new(io::ErrorKind::InvalidData, err)
            }
            TgzfsError::SessionState(_) => io::Error::other(err),
        }
    }
}

/// Result type alias for tgzfs operations.
pub type Result<T> = std::result::Result<T, TgzfsError>;

//! Unified error types for bibliocache.
//!
//! Every store failure is surfaced through [`Error`] so callers can decide
//! response semantics. [`Error::kind`] groups variants into the four classes
//! the HTTP layer maps onto status codes.

use std::time::Duration;

use tokio_rusqlite::rusqlite;

/// Unified error types for the book cache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed input (e.g., an empty search term).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Referenced entity does not exist.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Database operation failed.
    ///
    /// Only connectivity failures (closed connection, busy or locked file,
    /// I/O) classify as unavailable; see [`Error::kind`].
    #[error("CACHE_ERROR: database error: {0}")]
    Database(tokio_rusqlite::Error),

    /// A store call did not complete within the configured bound.
    #[error("CACHE_UNAVAILABLE: store call `{op}` timed out after {elapsed:?}")]
    Timeout { op: &'static str, elapsed: Duration },

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored timestamp could not be parsed.
    #[error("CACHE_ERROR: invalid timestamp {0:?}")]
    InvalidTimestamp(String),
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied bad input; retrying will not help.
    Validation,
    /// The store could not be reached or timed out; retry with backoff.
    Unavailable,
    /// The requested entity is absent.
    NotFound,
    /// Anything else.
    Internal,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Timeout { .. } => ErrorKind::Unavailable,
            Error::Database(e) if is_connectivity_failure(e) => ErrorKind::Unavailable,
            Error::Database(_) | Error::MigrationFailed(_) | Error::InvalidTimestamp(_) => ErrorKind::Internal,
        }
    }

    /// True when the cache store could not serve the request.
    pub fn is_unavailable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }
}

/// Failures a retry can plausibly clear. SQL, constraint and type errors are
/// bugs or corrupt data and stay internal.
fn is_connectivity_failure(err: &tokio_rusqlite::Error) -> bool {
    use rusqlite::ErrorCode;

    match err {
        tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(failure, _)) => matches!(
            failure.code,
            ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
                | ErrorCode::FileLockingProtocolFailed
        ),
        tokio_rusqlite::Error::Error(_) => false,
        _ => true,
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

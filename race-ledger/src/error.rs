//! Error types for the race ledger

use thiserror::Error;
use uuid::Uuid;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Submission is missing required fields or is malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Race outcome not found
    #[error("Race not found: {0}")]
    RaceNotFound(Uuid),

    /// Roster not found
    #[error("Roster not found: {0}")]
    RosterNotFound(Uuid),

    /// Driver or constructor not found in the catalog
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Roster edits are locked by the administrator
    #[error("Rosters are locked: {0}")]
    RostersLocked(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Binary encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON encoding error (persisted race outcomes)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invariant violation (duplicate score row, total drift, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client-facing classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, nothing was persisted
    Validation,
    /// Referenced race, roster or entity does not exist
    NotFound,
    /// Roster mutation rejected by the edit lock
    Locked,
    /// Store or runtime failure, the unit of work was aborted
    Persistence,
}

impl Error {
    /// Classify the error for callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::RaceNotFound(_) | Error::RosterNotFound(_) | Error::EntityNotFound(_) => {
                ErrorKind::NotFound
            }
            Error::RostersLocked(_) => ErrorKind::Locked,
            _ => ErrorKind::Persistence,
        }
    }

    /// True for the "not found" family of errors
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

//! Store error types.

use std::io;
use std::path::PathBuf;

/// Failures of the storage layer itself.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("failed to {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The next state could not be serialized.
    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    /// The file exists but does not decode, and no recovery value was supplied.
    #[error("document {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// The store no longer accepts mutations.
    #[error("store {} is closed", path.display())]
    Closed { path: PathBuf },

    /// The mutation task died before reporting a result.
    #[error("store task interrupted: {0}")]
    Interrupted(String),
}

impl StoreError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Outcome of a failed `DocumentStore::update`.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError<E> {
    /// The mutator returned an error; nothing was written.
    #[error("mutation rejected")]
    Rejected(E),

    /// The mutation was accepted but could not be made durable.
    #[error(transparent)]
    Store(#[from] StoreError),
}

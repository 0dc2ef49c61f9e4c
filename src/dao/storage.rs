use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by score store backends regardless of the underlying storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A team with this id has already been created.
    #[error("team `{id}` already exists")]
    AlreadyExists {
        /// Id of the existing team.
        id: String,
    },
    /// No team with this id exists.
    #[error("team `{id}` not found")]
    NotFound {
        /// Id that was looked up.
        id: String,
    },
    /// The increment would push the team past `MAX_CLICKS`; nothing was recorded.
    #[error("team `{id}` cannot take more clicks")]
    ClicksOverflow {
        /// Id of the saturated team.
        id: String,
    },
    /// The storage layer failed; the operation was not retried.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Short description of the failed operation.
        message: String,
        /// Backend error that caused the failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an already-exists error for `id`.
    pub fn already_exists(id: impl Into<String>) -> Self {
        StorageError::AlreadyExists { id: id.into() }
    }

    /// Construct a not-found error for `id`.
    pub fn not_found(id: impl Into<String>) -> Self {
        StorageError::NotFound { id: id.into() }
    }

    /// Construct an overflow error for `id`.
    pub fn clicks_overflow(id: impl Into<String>) -> Self {
        StorageError::ClicksOverflow { id: id.into() }
    }

    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

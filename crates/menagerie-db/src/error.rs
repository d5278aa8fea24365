//! Error types for the Menagerie data layer.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A SQLite operation failed.
    #[error("sqlite error: {source}")]
    Sqlite {
        /// The underlying sqlx error.
        #[from]
        source: sqlx::Error,
    },

    /// Reading or writing the snapshot file failed.
    #[error("snapshot I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The snapshot document could not be (de)serialized.
    #[error("snapshot serialization error: {source}")]
    Serialization {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The requested username is already registered.
    #[error("username already exists: {username}")]
    UsernameTaken {
        /// The conflicting username.
        username: String,
    },

    /// A stored row could not be decoded into a domain type.
    #[error("malformed row: {reason}")]
    Corrupt {
        /// Explanation of what failed to decode.
        reason: String,
    },
}

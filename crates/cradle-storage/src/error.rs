//! Error types

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// SQLite substrate error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Key-value substrate error (generic)
    #[error("Substrate error: {0}")]
    Substrate(String),

    /// Envelope could not be decrypted
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Secret store unavailable or refused the request
    #[error("Secret store error: {0}")]
    SecretStore(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not allowed in the current session state
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

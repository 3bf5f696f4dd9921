//! Error types for auth-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Auth error types
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    Unauthorized,

    #[error("User already exists: {0}")]
    Conflict(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Store file not found: {0}")]
    NotFound(PathBuf),

    #[error("Backup file already exists: {0} - aborting to avoid overwrite")]
    BackupExists(PathBuf),

    #[error("Store is locked by another process (lock file {0}) - remove it if stale")]
    StoreLocked(PathBuf),

    #[error("Cannot restore: {0}")]
    RestoreRefused(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Storage operation timed out: {0}")]
    Timeout(String),

    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Stable classification of an [`AuthError`] as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    Conflict,
    Forbidden,
    Io,
    NotFound,
    BackupExists,
    Config,
}

impl AuthError {
    /// Map this error onto the stable taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Unauthorized | AuthError::InvalidToken(_) | AuthError::TokenExpired => {
                ErrorKind::Unauthorized
            }
            AuthError::Conflict(_) => ErrorKind::Conflict,
            AuthError::Forbidden => ErrorKind::Forbidden,
            AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::BackupExists(_) => ErrorKind::BackupExists,
            AuthError::ConfigError(_) => ErrorKind::Config,
            AuthError::StoreLocked(_)
            | AuthError::RestoreRefused(_)
            | AuthError::StorageError(_)
            | AuthError::Timeout(_)
            | AuthError::HashingError(_)
            | AuthError::IoError(_)
            | AuthError::SerializationError(_) => ErrorKind::Io,
        }
    }
}

//! Error types for logmerge

use thiserror::Error;

/// Result type alias for logmerge operations
pub type Result<T> = std::result::Result<T, LogMergeError>;

/// Main error type for logmerge
///
/// Only [`LogMergeError::Config`] is fatal to a whole run. Every other
/// variant fails the host being processed and is reported through the
/// notifier; [`LogMergeError::Notification`] is only ever logged.
#[derive(Error, Debug)]
pub enum LogMergeError {
    /// Required configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// A discovered hostname has no shards under its date prefix
    #[error("No logs found for {hostname}")]
    EmptyHost { hostname: String },

    /// Listing, fetching or uploading against the object store failed
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// Gzip compression of a merged artifact failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// A notification could not be delivered
    #[error("Notification error: {0}")]
    Notification(String),

    /// Local filesystem failure while handling artifacts
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogMergeError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an empty host error
    pub fn empty_host(hostname: impl Into<String>) -> Self {
        Self::EmptyHost {
            hostname: hostname.into(),
        }
    }

    /// Create a transfer error
    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::Transfer(msg.into())
    }

    /// Create a compression error
    pub fn compression(msg: impl Into<String>) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }

    /// Whether this error must abort the whole run rather than a single host
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

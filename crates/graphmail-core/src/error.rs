//! Error types for the core library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing or sending mail.
#[derive(Debug, Error)]
pub enum Error {
    /// Token acquisition failed.
    #[error("Authentication error: {0}")]
    Auth(#[from] graphmail_oauth::Error),

    /// HTTP transport failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// An attachment could not be read.
    #[error("Cannot read attachment {path}: {source}")]
    Attachment {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The message has no `To` recipients.
    #[error("No recipients specified")]
    NoRecipients,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential storage error.
    #[error("Credential error: {0}")]
    Credential(#[from] crate::credentials::CredentialError),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

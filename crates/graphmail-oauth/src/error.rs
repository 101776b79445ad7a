//! Error types for token acquisition.

use std::io;

/// Result type alias for `OAuth2` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `OAuth2` error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `OAuth2` error from server.
    #[error("OAuth2 error: {error} - {description}")]
    OAuth {
        /// Error code (e.g., `invalid_grant`).
        error: String,
        /// Human-readable description.
        description: String,
    },

    /// Silent acquisition is impossible; the user has to sign in or consent.
    #[error("Interaction required: {0}")]
    InteractionRequired(String),

    /// Token expired.
    #[error("Token expired")]
    TokenExpired,

    /// No refresh token available.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The token is not a readable JWT.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The token carries no `exp` claim.
    #[error("Expiration claim not found in token")]
    MissingExpiry,

    /// Invalid token response.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Authorization timeout.
    #[error("Authorization timed out after {0} seconds")]
    Timeout(u64),

    /// User denied authorization.
    #[error("User denied authorization")]
    AccessDenied,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Token cache backend failure.
    #[error("Token cache error: {0}")]
    Cache(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl Error {
    /// Creates an OAuth error from error code and description.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuth {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Returns true if the error means the user must interact to get a token.
    ///
    /// Covers the explicit [`Error::InteractionRequired`] variant as well as
    /// the server error codes the Microsoft identity platform returns when a
    /// refresh token can no longer be redeemed silently.
    #[must_use]
    pub fn requires_interaction(&self) -> bool {
        match self {
            Self::InteractionRequired(_) | Self::NoRefreshToken => true,
            Self::OAuth { error, .. } => matches!(
                error.as_str(),
                "invalid_grant" | "interaction_required" | "consent_required" | "login_required"
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_interaction() {
        assert!(Error::InteractionRequired("no account".into()).requires_interaction());
        assert!(Error::NoRefreshToken.requires_interaction());
        assert!(Error::oauth_error("invalid_grant", "AADSTS70008").requires_interaction());
        assert!(Error::oauth_error("consent_required", "").requires_interaction());
        assert!(!Error::oauth_error("invalid_client", "").requires_interaction());
        assert!(!Error::MissingExpiry.requires_interaction());
        assert!(!Error::AccessDenied.requires_interaction());
    }

    #[test]
    fn test_missing_expiry_message() {
        assert_eq!(
            Error::MissingExpiry.to_string(),
            "Expiration claim not found in token"
        );
    }
}

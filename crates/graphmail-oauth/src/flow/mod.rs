//! `OAuth2` authorization flows.

mod code;
mod device;
mod pkce;

pub use code::AuthorizationCodeFlow;
pub use device::{DeviceAuthorization, DeviceFlow};
pub use pkce::PkceChallenge;

use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::token::{ErrorResponse, Token, TokenResponse};
use reqwest::{Client, Response};
use std::collections::HashMap;
use tracing::debug;

/// Scopes the identity platform always needs for a public client to get an
/// ID token and a refresh token back.
pub const RESERVED_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

/// Builds the `scope` parameter: the requested scopes followed by any
/// reserved scope not already present.
#[must_use]
pub fn scope_param(scopes: &[String]) -> String {
    let mut all: Vec<&str> = scopes.iter().map(String::as_str).collect();
    for reserved in RESERVED_SCOPES {
        if !all.iter().any(|s| s.eq_ignore_ascii_case(reserved)) {
            all.push(reserved);
        }
    }
    all.join(" ")
}

/// Common `OAuth2` client configuration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID from provider.
    pub client_id: String,
    /// Client secret (optional for public clients).
    pub client_secret: Option<String>,
    /// Redirect URI for authorization code flow.
    pub redirect_uri: Option<String>,
    /// Provider configuration.
    pub provider: Provider,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            provider,
            http_client: Client::new(),
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Replaces the HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Refreshes an access token using a refresh token.
    ///
    /// The v2.0 endpoint requires the scopes to be restated on every
    /// refresh; `scopes` are sent together with the reserved scopes.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails or if the token has no refresh token.
    pub async fn refresh_token(&self, token: &Token, scopes: &[String]) -> Result<Token> {
        let refresh_token = token.refresh_token()?;
        let scope = scope_param(scopes);

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &self.client_id);
        params.insert("scope", &scope);

        if let Some(secret) = &self.client_secret {
            params.insert("client_secret", secret);
        }

        debug!("Redeeming refresh token at {}", self.provider.token_url);
        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let token_response: TokenResponse = response.json().await?;
        let mut new_token = Token::from_response(token_response)?;

        // Preserve refresh token and identity if not returned
        if new_token.refresh_token.is_none() {
            new_token.refresh_token.clone_from(&token.refresh_token);
        }
        if new_token.id_token.is_none() {
            new_token.id_token.clone_from(&token.id_token);
        }

        Ok(new_token)
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub(crate) async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
        code_verifier: Option<&str>,
        scopes: &[String],
    ) -> Result<Token> {
        let scope = scope_param(scopes);

        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("client_id", &self.client_id);
        params.insert("scope", &scope);

        if let Some(uri) = redirect_uri.or(self.redirect_uri.as_deref()) {
            params.insert("redirect_uri", uri);
        }

        if let Some(secret) = &self.client_secret {
            params.insert("client_secret", secret);
        }

        if let Some(verifier) = code_verifier {
            params.insert("code_verifier", verifier);
        }

        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let token_response: TokenResponse = response.json().await?;
        Token::from_response(token_response)
    }
}

/// Turns a non-success token endpoint response into an error.
///
/// The identity platform answers with an `OAuth2` error document; anything
/// else (a proxy page, an empty body) becomes [`Error::InvalidResponse`].
pub(crate) async fn error_from_response(response: Response) -> Error {
    let status = response.status();
    match response.text().await {
        Ok(body) => serde_json::from_str::<ErrorResponse>(&body).map_or_else(
            |_| Error::InvalidResponse(format!("HTTP {status}: {body}")),
            ErrorResponse::into_error,
        ),
        Err(e) => Error::Http(e),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn provider() -> Provider {
        Provider::microsoft("common").unwrap()
    }

    #[test]
    fn test_oauth_client_creation() {
        let client = OAuthClient::new("test_client_id", provider());
        assert_eq!(client.client_id, "test_client_id");
        assert!(client.client_secret.is_none());
    }

    #[test]
    fn test_oauth_client_with_secret() {
        let client = OAuthClient::new("test_client_id", provider())
            .with_client_secret("secret")
            .with_redirect_uri("http://localhost");

        assert_eq!(client.client_secret.as_deref(), Some("secret"));
        assert_eq!(client.redirect_uri.as_deref(), Some("http://localhost"));
    }

    #[test]
    fn test_scope_param_adds_reserved_scopes() {
        let scopes = vec!["Mail.Send".to_string()];
        assert_eq!(scope_param(&scopes), "Mail.Send openid profile offline_access");
    }

    #[test]
    fn test_scope_param_does_not_duplicate() {
        let scopes = vec!["Mail.Send".to_string(), "OFFLINE_ACCESS".to_string()];
        assert_eq!(scope_param(&scopes), "Mail.Send OFFLINE_ACCESS openid profile");
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token() {
        let client = OAuthClient::new("id", provider());
        let token = Token::new("access", "Bearer");
        let err = client
            .refresh_token(&token, &["Mail.Send".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoRefreshToken));
    }
}

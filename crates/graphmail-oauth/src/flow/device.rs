//! Device Authorization Flow implementation (RFC 8628).

use super::{OAuthClient, error_from_response, scope_param};
use crate::error::{Error, Result};
use crate::token::{Token, TokenResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Device authorization response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceAuthorization {
    /// Device code for polling.
    pub device_code: String,
    /// User code to display to the user.
    pub user_code: String,
    /// Verification URI where user should go.
    pub verification_uri: String,
    /// Complete verification URI (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_uri_complete: Option<String>,
    /// Expiration time in seconds.
    pub expires_in: u32,
    /// Polling interval in seconds (minimum 5 seconds).
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Ready-made instructions for the user (Microsoft specific).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeviceAuthorization {
    /// Text to show the user.
    #[must_use]
    pub fn instructions(&self) -> String {
        self.message.clone().unwrap_or_else(|| {
            format!(
                "To sign in, open {} and enter the code {}",
                self.verification_uri, self.user_code
            )
        })
    }
}

const fn default_interval() -> u32 {
    5
}

/// Device Authorization Flow for `OAuth2`.
///
/// This flow is suitable for devices with limited input capabilities
/// or no browser (e.g., CLI applications, headless hosts).
#[derive(Debug)]
pub struct DeviceFlow {
    client: OAuthClient,
}

impl DeviceFlow {
    /// Creates a new device flow.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self { client }
    }

    /// Requests device authorization from the server.
    ///
    /// Returns the device code and user code that should be displayed to the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider has no device endpoint or the request fails.
    pub async fn request_device_authorization(
        &self,
        scopes: &[String],
    ) -> Result<DeviceAuthorization> {
        let device_auth_url = self
            .client
            .provider
            .device_auth_url
            .as_ref()
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "Provider {} does not support device flow",
                    self.client.provider.name
                ))
            })?;

        let scope_str = scope_param(scopes);

        let mut params = HashMap::new();
        params.insert("client_id", self.client.client_id.as_str());
        params.insert("scope", &scope_str);

        let response = self
            .client
            .http_client
            .post(device_auth_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response.json().await.map_err(Into::into)
    }

    /// Polls once for token completion after waiting `interval`.
    ///
    /// # Errors
    ///
    /// Returns `Error::AccessDenied` if the user declined and
    /// `Error::TokenExpired` if the device code expired. The `OAuth2` codes
    /// `authorization_pending` and `slow_down` come back as [`Error::OAuth`]
    /// and mean the caller should keep polling.
    pub async fn poll_for_token(&self, device_code: &str, interval: Duration) -> Result<Token> {
        tokio::time::sleep(interval).await;

        let mut params = HashMap::new();
        params.insert("grant_type", "urn:ietf:params:oauth:grant-type:device_code");
        params.insert("device_code", device_code);
        params.insert("client_id", &self.client.client_id);

        let response = self
            .client
            .http_client
            .post(self.client.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return match error_from_response(response).await {
                Error::OAuth { error, .. } if error == "access_denied" => Err(Error::AccessDenied),
                Error::OAuth { error, .. } if error == "expired_token" => Err(Error::TokenExpired),
                other => Err(other),
            };
        }

        let token_response: TokenResponse = response.json().await?;
        Token::from_response(token_response)
    }

    /// Polls until the user completes sign-in for `auth`.
    ///
    /// # Arguments
    ///
    /// * `auth` - Response of [`DeviceFlow::request_device_authorization`]
    /// * `max_attempts` - Maximum number of polling attempts (0 = unlimited)
    ///
    /// # Errors
    ///
    /// Returns an error if authorization fails or times out.
    pub async fn wait_for_token(
        &self,
        auth: &DeviceAuthorization,
        max_attempts: usize,
    ) -> Result<Token> {
        let mut interval = Duration::from_secs(u64::from(auth.interval));
        let mut attempts = 0;

        loop {
            if max_attempts > 0 && attempts >= max_attempts {
                return Err(Error::Timeout(auth.expires_in.into()));
            }

            match self.poll_for_token(&auth.device_code, interval).await {
                Ok(token) => return Ok(token),
                Err(Error::OAuth { ref error, .. }) if error == "authorization_pending" => {
                    attempts += 1;
                }
                Err(Error::OAuth { ref error, .. }) if error == "slow_down" => {
                    // Increase interval by 5 seconds as per RFC
                    interval += Duration::from_secs(5);
                    attempts += 1;
                    debug!("Device flow asked to slow down, interval now {interval:?}");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

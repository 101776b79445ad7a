//! Headless sign-in via the device code flow.

use super::InteractiveAuthorizer;
use crate::error::Result;
use crate::flow::{DeviceAuthorization, DeviceFlow, OAuthClient};
use crate::token::Token;
use async_trait::async_trait;
use tracing::info;

type Notifier = Box<dyn Fn(&DeviceAuthorization) + Send + Sync>;

/// Shows a user code and polls until it is redeemed on another device.
pub struct DeviceCodeAuthorizer {
    max_attempts: usize,
    notify: Notifier,
}

impl DeviceCodeAuthorizer {
    /// Creates an authorizer that polls until the device code expires.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_attempts: 0,
            notify: Box::new(|auth| info!("{}", auth.instructions())),
        }
    }

    /// Caps the number of polls (0 = until the code expires).
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Replaces how the user code is shown. The default logs it at info level.
    #[must_use]
    pub fn with_notifier(
        mut self,
        notify: impl Fn(&DeviceAuthorization) + Send + Sync + 'static,
    ) -> Self {
        self.notify = Box::new(notify);
        self
    }
}

impl Default for DeviceCodeAuthorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeviceCodeAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCodeAuthorizer")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl InteractiveAuthorizer for DeviceCodeAuthorizer {
    async fn authorize(&self, client: &OAuthClient, scopes: &[String]) -> Result<Token> {
        let flow = DeviceFlow::new(client.clone());
        let auth = flow.request_device_authorization(scopes).await?;
        (self.notify)(&auth);
        flow.wait_for_token(&auth, self.max_attempts).await
    }
}

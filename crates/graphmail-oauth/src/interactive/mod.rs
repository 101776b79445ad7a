//! Interactive token acquisition strategies.
//!
//! When no token can be obtained silently, [`crate::TokenProvider`] hands
//! control to an [`InteractiveAuthorizer`]. The browser strategy mirrors a
//! desktop sign-in; the device-code strategy works on headless hosts; tests
//! plug in their own.

mod browser;
mod device;

pub use browser::BrowserAuthorizer;
pub use device::DeviceCodeAuthorizer;

use crate::error::Result;
use crate::flow::OAuthClient;
use crate::token::Token;
use async_trait::async_trait;

/// A way of obtaining a token that involves the user.
///
/// Implementations may block for as long as the user needs.
#[async_trait]
pub trait InteractiveAuthorizer: Send + Sync {
    /// Obtains a token for `scopes` on behalf of `client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the user declines, the flow times out, or the
    /// token endpoint rejects the grant.
    async fn authorize(&self, client: &OAuthClient, scopes: &[String]) -> Result<Token>;
}

//! # graphmail-oauth
//!
//! `OAuth2` token acquisition against the Microsoft identity platform for a
//! public client that sends mail through Microsoft Graph.
//!
//! ## Features
//!
//! - **Token provider**: supplied token while unexpired, then silent
//!   acquisition from a token cache, then an interactive fallback
//! - **Interactive strategies**: browser sign-in (authorization code with
//!   PKCE and a loopback redirect) and the device code flow for headless hosts
//! - **Token management**: refresh, expiration checking, JWT `exp` reading
//!
//! ## Quick Start
//!
//! ```ignore
//! use graphmail_oauth::{TokenProvider, TokenProviderConfig, DeviceCodeAuthorizer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TokenProviderConfig::new("your_client_id", "your_tenant_id")
//!         .with_scopes(["User.Read"]);
//!     let provider = TokenProvider::new(config)?
//!         .with_interactive(DeviceCodeAuthorizer::new());
//!
//!     let access_token = provider.access_token().await?;
//!     println!("Got a token of {} bytes", access_token.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cache;
mod error;
pub mod flow;
pub mod interactive;
pub mod provider;
pub mod token;
mod token_provider;

pub use cache::{CachedAccount, MemoryTokenCache, TokenCache};
pub use error::{Error, Result};
pub use flow::{AuthorizationCodeFlow, DeviceAuthorization, DeviceFlow, OAuthClient, PkceChallenge};
pub use interactive::{BrowserAuthorizer, DeviceCodeAuthorizer, InteractiveAuthorizer};
pub use provider::{MAIL_SEND_SCOPE, Provider};
pub use token::{Token, token_expiry};
pub use token_provider::{DEFAULT_REDIRECT_URI, TokenProvider, TokenProviderConfig};

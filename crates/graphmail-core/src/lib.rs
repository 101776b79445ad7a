//! # graphmail-core
//!
//! Send mail as a signed-in Microsoft 365 user through Microsoft Graph.
//!
//! This crate provides:
//! - Outgoing message model with file attachments
//! - Graph `sendMail` payload and client ([`GraphMailer`])
//! - Extension-based MIME type lookup
//! - Settings loading (file + environment)
//! - Token persistence in the system keyring
//!
//! Token acquisition itself lives in `graphmail-oauth`.
//!
//! ## Example
//!
//! ```ignore
//! use graphmail_core::{EmailMessage, GraphMailer, Settings};
//! use graphmail_oauth::TokenProvider;
//!
//! let settings = Settings::load(&Settings::default_path()).await?.with_env();
//! let tokens = TokenProvider::new(settings.to_provider_config()?)?;
//! let mailer = GraphMailer::new(tokens)?;
//!
//! let message = EmailMessage::new("Report", "See attached.")
//!     .to("someone@example.com")
//!     .attach("test.pdf");
//! let result = mailer.send_email(&message).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod credentials;
mod error;
pub mod message;
pub mod mime;
pub mod service;

pub use config::Settings;
pub use credentials::{CredentialError, CredentialResult, KeyringTokenCache};
pub use error::{Error, Result};
pub use message::{Attachment, EmailMessage};
pub use mime::mime_type_for_path;
pub use service::{GRAPH_BASE_URL, GraphMailer, SendMailRequest, SendResult, SendStatus};

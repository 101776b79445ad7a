#![allow(clippy::expect_used, clippy::doc_markdown)]
//! Example: send a message with an attachment through Microsoft Graph
//!
//! Signs in through the browser on first run; later runs reuse the token
//! cached in the system keyring.
//!
//! ## Running
//!
//! ```bash
//! export GRAPHMAIL_CLIENT_ID="your-client-id"
//! export GRAPHMAIL_TENANT_ID="your-tenant-id"
//! cargo run --package graphmail-core --example send_report -- someone@example.com test.pdf
//! ```

use std::sync::Arc;

use graphmail_core::{EmailMessage, GraphMailer, KeyringTokenCache, Settings};
use graphmail_oauth::TokenProvider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let to = args.next().expect("usage: send_report <to> [attachment]");
    let attachment = args.next();

    let settings = Settings::load(&Settings::default_path()).await?.with_env();
    let config = settings.to_provider_config()?;
    let cache = Arc::new(KeyringTokenCache::new(config.client_id()));
    let tokens = TokenProvider::new(config)?.with_cache(cache);
    let mailer = GraphMailer::new(tokens)?;

    let mut message = EmailMessage::new("Test Email", "This is a test email sent through Microsoft Graph.")
        .to(to)
        .cc("cc@example.com")
        .bcc("bcc@example.com");
    if let Some(path) = attachment {
        message = message.attach(path);
    }

    let result = mailer.send_email(&message).await?;
    if result.is_success {
        println!("Email sent successfully");
        if result.token_refreshed {
            println!("A new token was issued; store it for the next run");
        }
    } else {
        println!(
            "Failed to send email: {}",
            result.error_message.unwrap_or_default()
        );
    }
    Ok(())
}

//! Example: sign in with the device code flow and print the token expiry.
//!
//! ## Prerequisites
//!
//! Register a public client application in Microsoft Entra ID, enable
//! "Allow public client flows", and grant it the delegated `Mail.Send`
//! permission for Microsoft Graph.
//!
//! ```bash
//! export GRAPHMAIL_CLIENT_ID="your-client-id"
//! export GRAPHMAIL_TENANT_ID="your-tenant-id"
//! cargo run --package graphmail-oauth --example device_login
//! ```

use graphmail_oauth::{DeviceCodeAuthorizer, TokenProvider, TokenProviderConfig, token_expiry};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client_id = env::var("GRAPHMAIL_CLIENT_ID")?;
    let tenant_id = env::var("GRAPHMAIL_TENANT_ID").unwrap_or_else(|_| "common".to_string());

    let authorizer = DeviceCodeAuthorizer::new().with_notifier(|auth| {
        println!("{}", auth.instructions());
    });
    let provider =
        TokenProvider::new(TokenProviderConfig::new(client_id, tenant_id))?.with_interactive(authorizer);

    let token = provider.access_token().await?;
    match token_expiry(&token) {
        Ok(expiry) => println!("Signed in; token valid until {expiry}"),
        Err(_) => println!("Signed in; token is opaque"),
    }
    Ok(())
}

//! Command-line arguments and command dispatch.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use graphmail_core::{EmailMessage, GraphMailer, KeyringTokenCache, Settings};
use graphmail_oauth::{DeviceCodeAuthorizer, TokenProvider, token_expiry};
use tracing::{debug, info};

/// Send mail as a Microsoft 365 user through Microsoft Graph.
#[derive(Debug, Parser)]
#[command(name = "graphmail", version, about)]
pub struct Cli {
    /// Settings file (defaults to the user config directory).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Application (client) id.
    #[arg(long, global = true)]
    client_id: Option<String>,

    /// Directory (tenant) id, or `common`/`organizations`/`consumers`.
    #[arg(long, global = true)]
    tenant_id: Option<String>,

    /// Client secret for confidential app registrations.
    #[arg(long, global = true)]
    client_secret: Option<String>,

    /// Redirect URI registered for browser sign-in.
    #[arg(long, global = true)]
    redirect_uri: Option<String>,

    /// Extra scope to request; repeatable.
    #[arg(long = "scope", global = true, value_name = "SCOPE")]
    scopes: Vec<String>,

    /// Previously issued access token to use while it is unexpired.
    #[arg(long, global = true)]
    token: Option<String>,

    /// Microsoft Graph base URL.
    #[arg(long, global = true, value_name = "URL")]
    graph_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a message.
    Send(SendArgs),
    /// Acquire an access token and print when it expires.
    Token(AuthArgs),
    /// Forget cached accounts and tokens.
    Logout,
}

#[derive(Debug, Args)]
struct SendArgs {
    /// Recipient; repeatable.
    #[arg(long, required = true, value_name = "ADDRESS")]
    to: Vec<String>,

    /// CC recipient; repeatable.
    #[arg(long, value_name = "ADDRESS")]
    cc: Vec<String>,

    /// BCC recipient; repeatable.
    #[arg(long, value_name = "ADDRESS")]
    bcc: Vec<String>,

    /// Subject line.
    #[arg(long)]
    subject: String,

    /// Plain text body.
    #[arg(long, required_unless_present = "body_file", conflicts_with = "body_file")]
    body: Option<String>,

    /// Read the body from a file.
    #[arg(long, value_name = "PATH")]
    body_file: Option<PathBuf>,

    /// File to attach; repeatable.
    #[arg(long = "attach", value_name = "PATH")]
    attachments: Vec<PathBuf>,

    #[command(flatten)]
    auth: AuthArgs,
}

#[derive(Debug, Clone, Copy, Default, Args)]
struct AuthArgs {
    /// Sign in with a device code instead of a browser.
    #[arg(long)]
    device_code: bool,

    /// Keep tokens in memory only.
    #[arg(long)]
    no_cache: bool,
}

impl Cli {
    /// Settings file, then environment, then flags.
    async fn settings(&self) -> Result<Settings> {
        let path = self.config.clone().unwrap_or_else(Settings::default_path);
        let mut settings = Settings::load(&path)
            .await
            .with_context(|| format!("Failed to load settings from {}", path.display()))?
            .with_env();

        if let Some(v) = &self.client_id {
            settings.client_id = Some(v.clone());
        }
        if let Some(v) = &self.tenant_id {
            settings.tenant_id = Some(v.clone());
        }
        if let Some(v) = &self.client_secret {
            settings.client_secret = Some(v.clone());
        }
        if let Some(v) = &self.redirect_uri {
            settings.redirect_uri = Some(v.clone());
        }
        if !self.scopes.is_empty() {
            settings.scopes.clone_from(&self.scopes);
        }
        if let Some(v) = &self.token {
            settings.token = Some(v.clone());
        }
        if let Some(v) = &self.graph_url {
            settings.graph_url = Some(v.clone());
        }
        Ok(settings)
    }
}

fn token_provider(settings: &Settings, auth: AuthArgs) -> Result<TokenProvider> {
    let config = settings.to_provider_config()?;
    let client_id = config.client_id().to_string();
    let mut tokens = TokenProvider::new(config)?;

    if !auth.no_cache {
        tokens = tokens.with_cache(Arc::new(KeyringTokenCache::new(client_id)));
    }
    if auth.device_code {
        tokens = tokens.with_interactive(
            DeviceCodeAuthorizer::new().with_notifier(|device| eprintln!("{}", device.instructions())),
        );
    }
    Ok(tokens)
}

/// Runs the parsed command.
///
/// # Errors
///
/// Returns an error when the command could not run to completion. A send
/// that Graph rejected is reported on stdout with a failure exit code.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = cli.settings().await?;

    match cli.command {
        Command::Send(args) => send(&settings, args).await,
        Command::Token(auth) => {
            let tokens = token_provider(&settings, auth)?;
            let token = tokens
                .access_token()
                .await
                .context("Failed to acquire access token")?;
            match token_expiry(&token) {
                Ok(expiry) => println!("Access token valid until {expiry}"),
                Err(e) => {
                    debug!("Token expiry not readable: {e}");
                    println!("Access token acquired");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Logout => {
            let tokens = token_provider(&settings, AuthArgs::default())?;
            let count = tokens.accounts()?.len();
            tokens.sign_out()?;
            info!("Removed {count} cached account(s)");
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn send(settings: &Settings, args: SendArgs) -> Result<ExitCode> {
    let body = match (args.body, &args.body_file) {
        (Some(body), _) => body,
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read body from {}", path.display()))?,
        (None, None) => String::new(),
    };

    let message = EmailMessage {
        to: args.to,
        cc: args.cc,
        bcc: args.bcc,
        subject: args.subject,
        body,
        attachments: args.attachments,
    };

    let tokens = token_provider(settings, args.auth)?;
    let mut mailer = GraphMailer::new(tokens)?;
    if let Some(url) = &settings.graph_url {
        mailer = mailer.with_base_url(url)?;
    }

    let result = mailer.send_email(&message).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(if result.is_success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_send() {
        let cli = Cli::try_parse_from([
            "graphmail",
            "send",
            "--to",
            "a@example.com",
            "--to",
            "b@example.com",
            "--cc",
            "c@example.com",
            "--subject",
            "Hi",
            "--body",
            "Hello",
            "--attach",
            "test.pdf",
            "--device-code",
            "--client-id",
            "client",
        ])
        .unwrap();

        assert_eq!(cli.client_id.as_deref(), Some("client"));
        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.to, vec!["a@example.com", "b@example.com"]);
        assert_eq!(args.cc, vec!["c@example.com"]);
        assert!(args.bcc.is_empty());
        assert_eq!(args.attachments, vec![PathBuf::from("test.pdf")]);
        assert!(args.auth.device_code);
        assert!(!args.auth.no_cache);
    }

    #[test]
    fn test_send_requires_recipient_and_body() {
        assert!(Cli::try_parse_from(["graphmail", "send", "--subject", "Hi", "--body", "x"]).is_err());
        assert!(Cli::try_parse_from(["graphmail", "send", "--to", "a@example.com", "--subject", "Hi"]).is_err());
        assert!(
            Cli::try_parse_from([
                "graphmail",
                "send",
                "--to",
                "a@example.com",
                "--subject",
                "Hi",
                "--body",
                "x",
                "--body-file",
                "body.txt",
            ])
            .is_err()
        );
    }

    #[tokio::test]
    async fn test_flags_override_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"clientId":"file-client","tenantId":"file-tenant","scopes":["User.Read"]}"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "graphmail",
            "--config",
            path.to_str().unwrap(),
            "--tenant-id",
            "flag-tenant",
            "logout",
        ])
        .unwrap();
        let settings = cli.settings().await.unwrap();

        assert_eq!(settings.tenant_id.as_deref(), Some("flag-tenant"));
        assert_eq!(settings.scopes, vec!["User.Read"]);
    }
}

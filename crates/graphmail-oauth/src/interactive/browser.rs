//! Browser sign-in with a loopback redirect listener.
//!
//! Opens the authorization URL in the system browser, waits for the
//! identity platform to redirect back to `http://localhost:<port>/`, and
//! redeems the code with PKCE.

use super::InteractiveAuthorizer;
use crate::error::{Error, Result};
use crate::flow::{AuthorizationCodeFlow, OAuthClient};
use crate::token::Token;
use crate::token_provider::DEFAULT_REDIRECT_URI;
use async_trait::async_trait;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

const SUCCESS_PAGE: &str =
    "<html><body>Authentication complete. You can close this window.</body></html>";
const FAILURE_PAGE: &str = "<html><body>Authentication failed. Return to the application for details.</body></html>";

/// How long an accepted connection may take to send its request line.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

const NOT_FOUND_RESPONSE: &str =
    "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Interactive sign-in through the system browser.
#[derive(Debug, Clone)]
pub struct BrowserAuthorizer {
    timeout: Duration,
    open_browser: bool,
}

impl BrowserAuthorizer {
    /// Creates an authorizer that waits up to five minutes for the user.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            open_browser: true,
        }
    }

    /// Sets how long to wait for the redirect.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// When false, only logs the URL instead of launching a browser.
    #[must_use]
    pub const fn with_open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }
}

impl Default for BrowserAuthorizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InteractiveAuthorizer for BrowserAuthorizer {
    async fn authorize(&self, client: &OAuthClient, scopes: &[String]) -> Result<Token> {
        let configured = client.redirect_uri.as_deref().unwrap_or(DEFAULT_REDIRECT_URI);
        let (listener, redirect_uri) = bind_loopback(configured).await?;

        let flow = AuthorizationCodeFlow::new(client.clone().with_redirect_uri(&redirect_uri))
            .with_pkce()
            .with_prompt("select_account");

        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let auth_url = flow.authorization_url(Some(scopes), Some(&state))?;

        if self.open_browser {
            if let Err(e) = opener::open(auth_url.as_str()) {
                warn!("Could not open a browser ({e}); visit {auth_url} to sign in");
            } else {
                info!("Opened browser for sign-in; waiting for redirect on {redirect_uri}");
            }
        } else {
            info!("Visit {auth_url} to sign in");
        }

        let code = tokio::time::timeout(self.timeout, wait_for_code(&listener, &state))
            .await
            .map_err(|_| Error::Timeout(self.timeout.as_secs()))??;

        flow.exchange_code(&code, Some(&redirect_uri), scopes).await
    }
}

/// Binds a listener for a loopback redirect URI.
///
/// A URI without an explicit port gets an ephemeral one; the identity
/// platform accepts any port for `localhost` redirects. Returns the
/// listener and the redirect URI to send.
async fn bind_loopback(redirect_uri: &str) -> Result<(TcpListener, String)> {
    let url = Url::parse(redirect_uri)?;
    let host = url.host_str().unwrap_or_default();
    if url.scheme() != "http" || !matches!(host, "localhost" | "127.0.0.1" | "[::1]") {
        return Err(Error::InvalidConfig(format!(
            "browser sign-in needs a loopback http redirect URI, got {redirect_uri}"
        )));
    }

    let bind_host = if host == "[::1]" { "[::1]" } else { "127.0.0.1" };
    let port = url.port().unwrap_or(0);
    let listener = TcpListener::bind(format!("{bind_host}:{port}")).await?;
    let actual = listener.local_addr()?.port();

    let mut redirect = url;
    redirect
        .set_port(Some(actual))
        .map_err(|()| Error::InvalidConfig(format!("cannot set port on {redirect_uri}")))?;
    let redirect = redirect.as_str().trim_end_matches('/').to_string();
    debug!("Listening for redirect on {redirect}");
    Ok((listener, redirect))
}

/// Accepts connections until one carries the authorization response.
///
/// Each connection is served on its own task, so a browser preconnect that
/// never sends a request cannot hold up the redirect.
async fn wait_for_code(listener: &TcpListener, state: &str) -> Result<String> {
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let state = state.to_string();
                connections.spawn(async move {
                    let outcome = handle_redirect(stream, &state).await;
                    if outcome.is_none() {
                        debug!("No authorization response from {peer}");
                    }
                    outcome
                });
            }
            Some(joined) = connections.join_next() => {
                match joined {
                    Ok(Some(outcome)) => return outcome,
                    Ok(None) => {}
                    Err(e) => warn!("Redirect handler failed: {e}"),
                }
            }
        }
    }
}

fn page_response(page: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{page}",
        page.len()
    )
}

/// Answers one request on the redirect listener.
///
/// Returns `None` when the connection carries no authorization response:
/// idle past [`REQUEST_READ_TIMEOUT`], unreadable, or an unrelated request
/// (favicon and similar, answered with a 404).
async fn handle_redirect<S>(stream: S, state: &str) -> Option<Result<String>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    let mut request_line = String::new();
    match tokio::time::timeout(REQUEST_READ_TIMEOUT, stream.read_line(&mut request_line)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            debug!("Unreadable redirect request: {e}");
            return None;
        }
        Err(_) => {
            debug!("Redirect connection sent nothing within {REQUEST_READ_TIMEOUT:?}");
            return None;
        }
    }

    let outcome = parse_redirect(&request_line, state).transpose();
    let response = match &outcome {
        Some(Ok(_)) => page_response(SUCCESS_PAGE),
        None => NOT_FOUND_RESPONSE.to_string(),
        Some(Err(_)) => page_response(FAILURE_PAGE),
    };

    // Best effort; the browser may have disconnected.
    let stream = stream.get_mut();
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
    outcome
}

/// Extracts the code from a redirect request line.
///
/// Returns `Ok(None)` for requests that carry neither a code nor an error,
/// including malformed request targets.
fn parse_redirect(request_line: &str, expected_state: &str) -> Result<Option<String>> {
    let mut parts = request_line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        return Ok(None);
    };
    let Ok(url) = Url::parse(&format!("http://localhost{target}")) else {
        return Ok(None);
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = String::new();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = value.into_owned(),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(if error == "access_denied" {
            Error::AccessDenied
        } else {
            Error::oauth_error(error, description)
        });
    }

    let Some(code) = code else {
        return Ok(None);
    };
    if state.as_deref() != Some(expected_state) {
        return Err(Error::InvalidResponse(
            "state parameter does not match the request".into(),
        ));
    }
    Ok(Some(code))
}

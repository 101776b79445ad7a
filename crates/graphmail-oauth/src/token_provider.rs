//! Access token acquisition: supplied token, then cache, then the user.

use crate::cache::{CachedAccount, MemoryTokenCache, TokenCache};
use crate::error::{Error, Result};
use crate::flow::OAuthClient;
use crate::interactive::{BrowserAuthorizer, InteractiveAuthorizer};
use crate::provider::{MAIL_SEND_SCOPE, MICROSOFT_AUTHORITY, Provider};
use crate::token::{Token, token_expiry};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Default redirect URI for public clients.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost";

/// Identity configuration, fixed once a [`TokenProvider`] is built.
#[derive(Debug, Clone)]
pub struct TokenProviderConfig {
    client_id: String,
    tenant_id: String,
    client_secret: Option<String>,
    redirect_uri: String,
    scopes: Vec<String>,
    token: Option<String>,
    authority: String,
}

impl TokenProviderConfig {
    /// Creates a configuration requesting only `Mail.Send`.
    #[must_use]
    pub fn new(client_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            tenant_id: tenant_id.into(),
            client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: vec![MAIL_SEND_SCOPE.to_string()],
            token: None,
            authority: MICROSOFT_AUTHORITY.to_string(),
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
        self.redirect_uri = uri.into();
        self
    }

    /// Adds scopes on top of `Mail.Send`. Duplicates are dropped.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for scope in scopes {
            let scope = scope.into();
            let scope = scope.trim();
            if scope.is_empty() || self.scopes.iter().any(|s| s.eq_ignore_ascii_case(scope)) {
                continue;
            }
            self.scopes.push(scope.to_string());
        }
        self
    }

    /// Supplies an access token to use while it is unexpired.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    /// Overrides the identity platform host.
    #[must_use]
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    /// Client (application) id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Tenant id or domain.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Client secret, if configured.
    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    /// Redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Requested scopes; always starts with `Mail.Send`.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Token supplied at construction.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::InvalidConfig("client id is empty".into()));
        }
        if self.tenant_id.trim().is_empty() {
            return Err(Error::InvalidConfig("tenant id is empty".into()));
        }
        Ok(())
    }
}

/// Hands out access tokens for the configured scopes.
///
/// Order of preference: the token supplied in the configuration while its
/// `exp` claim lies in the future, a token from the cache (refreshed if
/// needed), and finally the interactive authorizer. One instance performs
/// one acquisition at a time.
pub struct TokenProvider {
    config: TokenProviderConfig,
    client: OAuthClient,
    cache: Arc<dyn TokenCache>,
    interactive: Option<Box<dyn InteractiveAuthorizer>>,
    lock: Mutex<()>,
}

impl TokenProvider {
    /// Creates a provider with an in-memory cache and browser sign-in.
    ///
    /// # Errors
    ///
    /// Returns an error if the client id or tenant id is empty or the
    /// authority is not a valid URL.
    pub fn new(config: TokenProviderConfig) -> Result<Self> {
        config.validate()?;
        let provider = Provider::microsoft_with_authority(&config.authority, &config.tenant_id)?;
        let mut client = OAuthClient::new(&config.client_id, provider)
            .with_redirect_uri(&config.redirect_uri);
        if let Some(secret) = &config.client_secret {
            client = client.with_client_secret(secret);
        }

        Ok(Self {
            config,
            client,
            cache: Arc::new(MemoryTokenCache::new()),
            interactive: Some(Box::new(BrowserAuthorizer::new())),
            lock: Mutex::new(()),
        })
    }

    /// Uses `cache` for silent acquisition and to store new tokens.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Replaces the interactive strategy.
    #[must_use]
    pub fn with_interactive(mut self, authorizer: impl InteractiveAuthorizer + 'static) -> Self {
        self.interactive = Some(Box::new(authorizer));
        self
    }

    /// Disables interactive acquisition; callers get
    /// [`Error::InteractionRequired`] instead.
    #[must_use]
    pub fn without_interactive(mut self) -> Self {
        self.interactive = None;
        self
    }

    /// Replaces the HTTP client used for token requests.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.client = self.client.with_http_client(http);
        self
    }

    /// The configuration this provider was built with.
    #[must_use]
    pub const fn config(&self) -> &TokenProviderConfig {
        &self.config
    }

    /// Returns a valid access token.
    ///
    /// # Errors
    ///
    /// Fails if the supplied token cannot be read or has no `exp` claim,
    /// or if neither silent nor interactive acquisition succeeds.
    pub async fn access_token(&self) -> Result<String> {
        let _guard = self.lock.lock().await;

        if let Some(token) = self.config.token.as_deref() {
            let expiry = token_expiry(token)?;
            if expiry > Utc::now() {
                debug!("Using supplied token, valid until {expiry}");
                return Ok(token.to_string());
            }
            debug!("Supplied token expired at {expiry}");
        }

        match self.silent().await {
            Ok(token) => Ok(token.access_token),
            Err(e) if e.requires_interaction() => {
                info!("Silent token acquisition failed ({e}); falling back to interactive sign-in");
                Ok(self.interactive().await?.access_token)
            }
            Err(e) => Err(e),
        }
    }

    /// Acquires a token from the cache without user interaction.
    ///
    /// # Errors
    ///
    /// Returns an error for which [`Error::requires_interaction`] is true
    /// when there is no usable cached account.
    pub async fn acquire_token_silent(&self) -> Result<Token> {
        let _guard = self.lock.lock().await;
        self.silent().await
    }

    /// Runs the interactive strategy and caches the result.
    ///
    /// # Errors
    ///
    /// Returns an error if no strategy is configured or it fails.
    pub async fn acquire_token_interactive(&self) -> Result<Token> {
        let _guard = self.lock.lock().await;
        self.interactive().await
    }

    /// Accounts available for silent acquisition.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be read.
    pub fn accounts(&self) -> Result<Vec<CachedAccount>> {
        self.cache.accounts()
    }

    /// Forgets all cached accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be written.
    pub fn sign_out(&self) -> Result<()> {
        self.cache.clear()
    }

    async fn silent(&self) -> Result<Token> {
        let accounts = self.cache.accounts()?;
        let Some(account) = accounts.first() else {
            return Err(Error::InteractionRequired("no cached account".into()));
        };
        if accounts.len() > 1 {
            debug!(
                "{} cached accounts, using {}",
                accounts.len(),
                account.username.as_deref().unwrap_or(&account.home_account_id)
            );
        }

        let cached = self.cache.load(account)?.ok_or_else(|| {
            Error::InteractionRequired(format!(
                "no token cached for account {}",
                account.home_account_id
            ))
        })?;

        if cached.expires_at.is_some()
            && cached.is_valid()
            && cached.covers_scopes(&self.config.scopes)
        {
            debug!("Using cached access token");
            return Ok(cached);
        }

        let refreshed = self
            .client
            .refresh_token(&cached, &self.config.scopes)
            .await?;
        self.cache.store(account, &refreshed)?;
        debug!("Refreshed access token for {}", account.home_account_id);
        Ok(refreshed)
    }

    async fn interactive(&self) -> Result<Token> {
        let authorizer = self.interactive.as_deref().ok_or_else(|| {
            Error::InteractionRequired("interactive sign-in is disabled".into())
        })?;

        let token = authorizer
            .authorize(&self.client, &self.config.scopes)
            .await?;
        let account = CachedAccount::from_token(&token, &self.config.client_id);
        self.cache.store(&account, &token)?;
        info!(
            "Signed in as {}",
            account.username.as_deref().unwrap_or(&account.home_account_id)
        );
        Ok(token)
    }
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("client_id", &self.config.client_id)
            .field("tenant_id", &self.config.tenant_id)
            .field("scopes", &self.config.scopes)
            .field("interactive", &self.interactive.is_some())
            .finish_non_exhaustive()
    }
}

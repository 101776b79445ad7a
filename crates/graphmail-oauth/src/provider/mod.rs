//! `OAuth2` provider configurations.

use crate::error::{Error, Result};
use url::Url;

/// Public cloud authority of the Microsoft identity platform.
pub const MICROSOFT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Scope that allows sending mail as the signed-in user.
pub const MAIL_SEND_SCOPE: &str = "Mail.Send";

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Microsoft").
    pub name: String,
    /// Authorization endpoint URL.
    pub auth_url: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Device authorization endpoint (if supported).
    pub device_auth_url: Option<Url>,
    /// Default scopes.
    pub default_scopes: Vec<String>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            device_auth_url: None,
            default_scopes: Vec::new(),
        })
    }

    /// Sets the device authorization URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_device_auth_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.device_auth_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the default scopes.
    #[must_use]
    pub fn with_default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Microsoft identity platform (v2.0 endpoints) for a single tenant.
    ///
    /// `tenant_id` may be a directory GUID, a verified domain, or one of
    /// `common`, `organizations`, `consumers`.
    ///
    /// Scopes:
    /// - `Mail.Send` - Send mail through Microsoft Graph
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant id is empty or URL parsing fails.
    pub fn microsoft(tenant_id: &str) -> Result<Self> {
        Self::microsoft_with_authority(MICROSOFT_AUTHORITY, tenant_id)
    }

    /// Microsoft identity platform on a custom authority host.
    ///
    /// Used for sovereign clouds and for pointing the client at a local
    /// test server.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant id is empty or URL parsing fails.
    pub fn microsoft_with_authority(authority: &str, tenant_id: &str) -> Result<Self> {
        let tenant = tenant_id.trim();
        if tenant.is_empty() {
            return Err(Error::InvalidConfig("tenant id is empty".into()));
        }
        let base = format!("{}/{tenant}/oauth2/v2.0", authority.trim_end_matches('/'));

        Ok(Self::new(
            "Microsoft",
            format!("{base}/authorize"),
            format!("{base}/token"),
        )?
        .with_device_auth_url(format!("{base}/devicecode"))?
        .with_default_scopes(vec![MAIL_SEND_SCOPE.to_string()]))
    }
}

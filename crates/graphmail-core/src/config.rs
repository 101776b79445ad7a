//! Application settings.
//!
//! Settings come from `config.json` in the user's config directory, then
//! `GRAPHMAIL_*` environment variables, then whatever the caller sets on
//! top (command-line flags).

use crate::error::{Error, Result};
use graphmail_oauth::TokenProviderConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name under the platform config directory.
const APP_DIR: &str = "graphmail";

/// Settings file name.
const SETTINGS_FILE: &str = "config.json";

/// Environment variable names.
pub mod env {
    /// Application (client) id.
    pub const CLIENT_ID: &str = "GRAPHMAIL_CLIENT_ID";
    /// Directory (tenant) id.
    pub const TENANT_ID: &str = "GRAPHMAIL_TENANT_ID";
    /// Client secret for confidential registrations.
    pub const CLIENT_SECRET: &str = "GRAPHMAIL_CLIENT_SECRET";
    /// Redirect URI for the browser flow.
    pub const REDIRECT_URI: &str = "GRAPHMAIL_REDIRECT_URI";
    /// Extra scopes, space or comma separated.
    pub const SCOPES: &str = "GRAPHMAIL_SCOPES";
    /// Previously issued access token.
    pub const TOKEN: &str = "GRAPHMAIL_TOKEN";
}

/// File and environment-derived settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Application (client) id.
    pub client_id: Option<String>,
    /// Directory (tenant) id.
    pub tenant_id: Option<String>,
    /// Client secret.
    pub client_secret: Option<String>,
    /// Redirect URI.
    pub redirect_uri: Option<String>,
    /// Scopes requested in addition to `Mail.Send`.
    pub scopes: Vec<String>,
    /// Previously issued access token.
    pub token: Option<String>,
    /// Microsoft Graph base URL override.
    pub graph_url: Option<String>,
    /// Identity platform host override.
    pub authority: Option<String>,
}

impl Settings {
    /// Default settings file location.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(SETTINGS_FILE)
    }

    /// Loads settings from `path`; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            debug!("No settings file at {}", path.display());
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Applies overrides from the process environment.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`; empty values are ignored.
    #[must_use]
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(env::CLIENT_ID) {
            self.client_id = Some(v);
        }
        if let Some(v) = get(env::TENANT_ID) {
            self.tenant_id = Some(v);
        }
        if let Some(v) = get(env::CLIENT_SECRET) {
            self.client_secret = Some(v);
        }
        if let Some(v) = get(env::REDIRECT_URI) {
            self.redirect_uri = Some(v);
        }
        if let Some(v) = get(env::SCOPES) {
            self.scopes = split_scopes(&v);
        }
        if let Some(v) = get(env::TOKEN) {
            self.token = Some(v);
        }
        self
    }

    /// Builds the token provider configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the client id or tenant id is missing.
    pub fn to_provider_config(&self) -> Result<TokenProviderConfig> {
        let client_id = required(self.client_id.as_deref(), env::CLIENT_ID)?;
        let tenant_id = required(self.tenant_id.as_deref(), env::TENANT_ID)?;

        let mut config =
            TokenProviderConfig::new(client_id, tenant_id).with_scopes(self.scopes.iter().cloned());
        if let Some(secret) = &self.client_secret {
            config = config.with_client_secret(secret.clone());
        }
        if let Some(uri) = &self.redirect_uri {
            config = config.with_redirect_uri(uri.clone());
        }
        if let Some(token) = &self.token {
            config = config.with_token(token.clone());
        }
        if let Some(authority) = &self.authority {
            config = config.with_authority(authority.clone());
        }
        Ok(config)
    }
}

fn required<'a>(value: Option<&'a str>, var: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("missing {var} (or the matching setting)")))
}

/// Splits a scope list on whitespace and commas.
#[must_use]
pub fn split_scopes(value: &str) -> Vec<String> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_split_scopes() {
        assert_eq!(
            split_scopes("User.Read, Mail.ReadWrite  offline_access"),
            vec!["User.Read", "Mail.ReadWrite", "offline_access"]
        );
        assert!(split_scopes(" , ").is_empty());
    }

    #[test]
    fn test_env_overrides_file() {
        let file = Settings {
            client_id: Some("file-client".into()),
            tenant_id: Some("file-tenant".into()),
            scopes: vec!["User.Read".into()],
            ..Settings::default()
        };
        let settings = file.with_env_from(lookup(&[
            (env::CLIENT_ID, "env-client"),
            (env::SCOPES, "Mail.Read"),
            (env::TENANT_ID, "  "),
            (env::TOKEN, "tok"),
        ]));

        assert_eq!(settings.client_id.as_deref(), Some("env-client"));
        assert_eq!(settings.tenant_id.as_deref(), Some("file-tenant"));
        assert_eq!(settings.scopes, vec!["Mail.Read"]);
        assert_eq!(settings.token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_provider_config() {
        let settings = Settings {
            client_id: Some("client".into()),
            tenant_id: Some("tenant".into()),
            client_secret: Some("secret".into()),
            redirect_uri: Some("http://localhost:8400".into()),
            scopes: vec!["User.Read".into(), "mail.send".into()],
            token: Some("tok".into()),
            ..Settings::default()
        };
        let config = settings.to_provider_config().unwrap();

        assert_eq!(config.client_id(), "client");
        assert_eq!(config.tenant_id(), "tenant");
        assert_eq!(config.client_secret(), Some("secret"));
        assert_eq!(config.redirect_uri(), "http://localhost:8400");
        assert_eq!(config.scopes(), ["Mail.Send", "User.Read"]);
        assert_eq!(config.token(), Some("tok"));
    }

    #[test]
    fn test_missing_ids() {
        let err = Settings::default().to_provider_config().unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains(env::CLIENT_ID)));

        let settings = Settings {
            client_id: Some("client".into()),
            ..Settings::default()
        };
        let err = settings.to_provider_config().unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains(env::TENANT_ID)));
    }

    #[tokio::test]
    async fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        assert_eq!(Settings::load(&path).await.unwrap(), Settings::default());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"clientId":"client","tenantId":"common","graphUrl":"http://127.0.0.1:1/v1.0"}"#,
        )
        .unwrap();

        let loaded = Settings::load(&path).await.unwrap();
        assert_eq!(loaded.client_id.as_deref(), Some("client"));
        assert_eq!(loaded.tenant_id.as_deref(), Some("common"));
        assert_eq!(loaded.graph_url.as_deref(), Some("http://127.0.0.1:1/v1.0"));
        assert!(loaded.scopes.is_empty());
        assert!(loaded.token.is_none());
    }

    #[tokio::test]
    async fn test_load_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(&path).await, Err(Error::Serde(_))));
    }
}

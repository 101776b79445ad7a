//! Token cache persisted in the system keyring.
//!
//! Uses the platform's native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager
//!
//! Entries are namespaced by client id so two app registrations never share
//! refresh tokens.

use graphmail_oauth::{CachedAccount, Token, TokenCache};
use keyring::Entry;
use tracing::{debug, warn};

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "graphmail";

/// Credential type for the ordered account list.
const ACCOUNTS_CREDENTIAL: &str = "accounts";

/// Credential type for per-account `OAuth2` tokens.
const OAUTH_TOKEN_CREDENTIAL: &str = "oauth_token";

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Stored value is not valid JSON.
    #[error("Corrupt keyring entry: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

impl From<CredentialError> for graphmail_oauth::Error {
    fn from(e: CredentialError) -> Self {
        Self::Cache(e.to_string())
    }
}

/// Generates the keyring entry key for a credential.
fn credential_key(client_id: &str, credential_type: &str, account: Option<&str>) -> String {
    match account {
        Some(account) => format!("{SERVICE_NAME}_{client_id}_{credential_type}_{account}"),
        None => format!("{SERVICE_NAME}_{client_id}_{credential_type}"),
    }
}

/// Reads a JSON value from the keyring; a missing entry is `None`.
fn read_json<T: serde::de::DeserializeOwned>(key: &str) -> CredentialResult<Option<T>> {
    let entry = Entry::new(SERVICE_NAME, key)?;
    match entry.get_password() {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_json<T: serde::Serialize>(key: &str, value: &T) -> CredentialResult<()> {
    let entry = Entry::new(SERVICE_NAME, key)?;
    entry.set_password(&serde_json::to_string(value)?)?;
    Ok(())
}

fn delete_entry(key: &str) -> CredentialResult<()> {
    let entry = Entry::new(SERVICE_NAME, key)?;
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => {
            warn!("Failed to delete keyring entry {key}: {e}");
            Err(e.into())
        }
    }
}

/// [`TokenCache`] backed by the system keyring.
#[derive(Debug, Clone)]
pub struct KeyringTokenCache {
    client_id: String,
}

impl KeyringTokenCache {
    /// Creates a cache for one app registration.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
        }
    }

    fn accounts_key(&self) -> String {
        credential_key(&self.client_id, ACCOUNTS_CREDENTIAL, None)
    }

    fn token_key(&self, account: &CachedAccount) -> String {
        credential_key(
            &self.client_id,
            OAUTH_TOKEN_CREDENTIAL,
            Some(&account.home_account_id),
        )
    }

    fn read_accounts(&self) -> CredentialResult<Vec<CachedAccount>> {
        Ok(read_json(&self.accounts_key())?.unwrap_or_default())
    }
}

impl TokenCache for KeyringTokenCache {
    fn accounts(&self) -> graphmail_oauth::Result<Vec<CachedAccount>> {
        Ok(self.read_accounts()?)
    }

    fn load(&self, account: &CachedAccount) -> graphmail_oauth::Result<Option<Token>> {
        let token = read_json(&self.token_key(account))?;
        if token.is_none() {
            debug!("No OAuth2 token found for {}", account.home_account_id);
        }
        Ok(token)
    }

    fn store(&self, account: &CachedAccount, token: &Token) -> graphmail_oauth::Result<()> {
        write_json(&self.token_key(account), token)?;

        let mut accounts = self.read_accounts()?;
        if let Some(existing) = accounts
            .iter_mut()
            .find(|a| a.home_account_id == account.home_account_id)
        {
            existing.clone_from(account);
        } else {
            accounts.push(account.clone());
        }
        write_json(&self.accounts_key(), &accounts)?;
        debug!("Stored OAuth2 token for {}", account.home_account_id);
        Ok(())
    }

    fn clear(&self) -> graphmail_oauth::Result<()> {
        for account in self.read_accounts()? {
            delete_entry(&self.token_key(&account))?;
        }
        delete_entry(&self.accounts_key())?;
        debug!("Cleared keyring token cache for client {}", self.client_id);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_keys() {
        assert_eq!(
            credential_key("app", ACCOUNTS_CREDENTIAL, None),
            "graphmail_app_accounts"
        );
        assert_eq!(
            credential_key("app", OAUTH_TOKEN_CREDENTIAL, Some("oid.tid")),
            "graphmail_app_oauth_token_oid.tid"
        );
    }

    #[test]
    fn test_cache_error_conversion() {
        let err = serde_json::from_str::<Token>("{").unwrap_err();
        let converted: graphmail_oauth::Error = CredentialError::from(err).into();
        assert!(matches!(converted, graphmail_oauth::Error::Cache(_)));
    }

    // These interact with the actual system keyring; run manually with
    // `cargo test -- --ignored`.

    #[test]
    #[ignore = "Interacts with system keyring"]
    fn test_store_load_clear() {
        let cache = KeyringTokenCache::new("graphmail-test-client");
        let account = CachedAccount {
            home_account_id: "test-oid.test-tid".to_string(),
            username: Some("test@example.com".to_string()),
        };
        let token = Token::new("access", "Bearer").with_refresh_token("refresh");

        cache.store(&account, &token).unwrap();
        assert_eq!(cache.accounts().unwrap(), vec![account.clone()]);
        assert_eq!(cache.load(&account).unwrap(), Some(token));

        cache.clear().unwrap();
        assert!(cache.accounts().unwrap().is_empty());
        assert_eq!(cache.load(&account).unwrap(), None);
    }
}

//! Token cache used for silent acquisition.

use crate::error::{Error, Result};
use crate::token::Token;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// An account that has signed in before.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CachedAccount {
    /// Stable key, `<oid>.<tid>` when known.
    pub home_account_id: String,
    /// Sign-in name, for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl CachedAccount {
    /// Derives the account from a freshly issued token.
    ///
    /// Uses the ID token claims when present; otherwise falls back to
    /// `fallback_id` (typically the client id) so a single-user client can
    /// still reuse its refresh token.
    #[must_use]
    pub fn from_token(token: &Token, fallback_id: &str) -> Self {
        let claims = token.id_claims();
        let home_account_id = claims
            .as_ref()
            .and_then(crate::token::Claims::home_account_id)
            .unwrap_or_else(|| fallback_id.to_string());
        let username = claims.and_then(|c| c.preferred_username);
        Self {
            home_account_id,
            username,
        }
    }
}

/// Storage for accounts and their most recent tokens.
///
/// Implementations must keep accounts in insertion order; silent acquisition
/// uses the first one.
pub trait TokenCache: Send + Sync {
    /// Lists known accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn accounts(&self) -> Result<Vec<CachedAccount>>;

    /// Loads the token stored for `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self, account: &CachedAccount) -> Result<Option<Token>>;

    /// Stores `token` for `account`, registering the account if new.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn store(&self, account: &CachedAccount, token: &Token) -> Result<()>;

    /// Forgets every account and token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn clear(&self) -> Result<()>;
}

/// Process-local cache; lost on exit.
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    order: Vec<CachedAccount>,
    tokens: HashMap<String, Token>,
}

impl MemoryTokenCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.inner
            .lock()
            .map_err(|_| Error::Cache("memory cache lock poisoned".into()))
    }
}

impl TokenCache for MemoryTokenCache {
    fn accounts(&self) -> Result<Vec<CachedAccount>> {
        Ok(self.state()?.order.clone())
    }

    fn load(&self, account: &CachedAccount) -> Result<Option<Token>> {
        Ok(self.state()?.tokens.get(&account.home_account_id).cloned())
    }

    fn store(&self, account: &CachedAccount, token: &Token) -> Result<()> {
        let mut state = self.state()?;
        if let Some(existing) = state
            .order
            .iter_mut()
            .find(|a| a.home_account_id == account.home_account_id)
        {
            existing.clone_from(account);
        } else {
            state.order.push(account.clone());
        }
        state
            .tokens
            .insert(account.home_account_id.clone(), token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.state()?;
        state.order.clear();
        state.tokens.clear();
        Ok(())
    }
}

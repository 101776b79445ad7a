//! Unverified reading of JWT claims.
//!
//! Access tokens issued by the Microsoft identity platform are JWTs. The
//! client never validates their signature (that is the resource server's
//! job); it only needs the expiry and, for ID tokens, the account identity.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Claims read from a JWT payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    /// Expiry, Unix seconds. Some issuers encode it as a string.
    #[serde(default)]
    exp: Option<Value>,
    /// Object id of the signed-in user.
    #[serde(default)]
    pub oid: Option<String>,
    /// Tenant id the token was issued in.
    #[serde(default)]
    pub tid: Option<String>,
    /// Sign-in name (usually the UPN or email).
    #[serde(default)]
    pub preferred_username: Option<String>,
}

impl Claims {
    /// Decodes the payload segment of a compact JWT.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToken`] if the token does not have three
    /// segments or the payload is not base64url-encoded JSON.
    pub fn decode(token: &str) -> Result<Self> {
        let mut segments = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(Error::InvalidToken("expected three dot-separated segments".into()));
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::InvalidToken(format!("payload is not base64url: {e}")))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidToken(format!("payload is not a JSON object: {e}")))
    }

    /// Returns the `exp` claim as a UTC timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingExpiry`] when the claim is absent and
    /// [`Error::InvalidToken`] when it is not a Unix timestamp.
    #[allow(clippy::cast_possible_truncation)]
    pub fn expires_at(&self) -> Result<DateTime<Utc>> {
        let secs = match self.exp.as_ref() {
            None | Some(Value::Null) => return Err(Error::MissingExpiry),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            Some(_) => None,
        }
        .ok_or_else(|| Error::InvalidToken("exp claim is not a Unix timestamp".into()))?;

        DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| Error::InvalidToken(format!("exp claim {secs} is out of range")))
    }

    /// Home account identifier in the `<oid>.<tid>` form MSAL uses.
    #[must_use]
    pub fn home_account_id(&self) -> Option<String> {
        match (&self.oid, &self.tid) {
            (Some(oid), Some(tid)) => Some(format!("{oid}.{tid}")),
            _ => None,
        }
    }
}

/// Reads the expiry of a JWT access token.
///
/// # Errors
///
/// Fails if the token cannot be decoded or has no `exp` claim.
pub fn token_expiry(token: &str) -> Result<DateTime<Utc>> {
    Claims::decode(token)?.expires_at()
}

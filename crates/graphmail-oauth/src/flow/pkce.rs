//! PKCE (Proof Key for Code Exchange, RFC 7636).
//!
//! Public clients cannot keep a secret, so the browser flow binds the
//! authorization code to a one-time verifier instead.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Length in bytes of the random verifier before encoding (43 chars encoded).
const VERIFIER_BYTES: usize = 32;

/// PKCE code challenge and verifier pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    verifier: String,
    challenge: String,
}

impl PkceChallenge {
    /// Generates a fresh verifier and its S256 challenge.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; VERIFIER_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_verifier(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Builds the pair for a known verifier.
    #[must_use]
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }

    /// Returns the verifier.
    #[must_use]
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// Returns the challenge.
    #[must_use]
    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// Returns the method.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        "S256"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_length() {
        let pkce = PkceChallenge::generate();
        assert_eq!(pkce.verifier().len(), 43);
        assert_ne!(pkce.verifier(), pkce.challenge());
    }

    #[test]
    fn test_known_challenge() {
        let pkce = PkceChallenge::from_verifier("dBjftJeZ4CZP-OQbOuQWpMqLGWrkewcmdlDLEa0Dy6QE");
        assert_eq!(
            pkce.challenge(),
            "LbAwa4b6v9F9mTaIpGOtRgWSSNF7lvBaLKld61icKb8"
        );
        assert_eq!(pkce.method(), "S256");
    }

    #[test]
    fn test_generations_unique() {
        let a = PkceChallenge::generate();
        let b = PkceChallenge::generate();
        assert_ne!(a.verifier(), b.verifier());
    }
}

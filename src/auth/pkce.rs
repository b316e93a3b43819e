//! PKCE (Proof Key for Code Exchange) material for one authorization attempt.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Verifier and derived challenge.
///
/// Both are URL-safe base64 without padding. The challenge is the digest of
/// the raw verifier bytes. Never persisted; drop it once the code exchange
/// has completed.
#[derive(Clone)]
pub struct PkceSecret {
    pub verifier: String,
    pub challenge: String,
}

impl PkceSecret {
    /// Generate a new secret from 32 bytes of OS-seeded randomness.
    pub fn new() -> Self {
        let mut verifier_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut verifier_bytes);
        Self::from_verifier_bytes(&verifier_bytes)
    }

    /// Derive the secret for a known verifier.
    pub fn from_verifier_bytes(verifier_bytes: &[u8]) -> Self {
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier_bytes));

        Self {
            verifier,
            challenge,
        }
    }
}

impl Default for PkceSecret {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PkceSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceSecret")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkce_secret() {
        let pkce = PkceSecret::new();

        // 32 bytes encode to 43 unpadded characters
        assert_eq!(pkce.verifier.len(), 43);
        assert_eq!(pkce.challenge.len(), 43);
        assert_ne!(pkce.verifier, pkce.challenge);

        let raw = URL_SAFE_NO_PAD.decode(&pkce.verifier).unwrap();
        let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(&raw));
        assert_eq!(pkce.challenge, expected);
    }

    #[test]
    fn test_challenge_is_deterministic() {
        let bytes = [7u8; 32];
        let a = PkceSecret::from_verifier_bytes(&bytes);
        let b = PkceSecret::from_verifier_bytes(&bytes);
        assert_eq!(a.verifier, b.verifier);
        assert_eq!(a.challenge, b.challenge);
    }

    #[test]
    fn test_challenge_is_url_safe() {
        for _ in 0..64 {
            let pkce = PkceSecret::new();
            for encoded in [&pkce.verifier, &pkce.challenge] {
                assert!(
                    !encoded.contains(['+', '/', '=']),
                    "not url-safe: {encoded}"
                );
            }
        }
    }

    #[test]
    fn test_debug_redacts_verifier() {
        let pkce = PkceSecret::new();
        let debug = format!("{pkce:?}");
        assert!(!debug.contains(&pkce.verifier));
        assert!(debug.contains(&pkce.challenge));
    }
}

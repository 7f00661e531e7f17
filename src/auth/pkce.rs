//! PKCE material and the per-attempt OAuth transaction

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::config::{keys, CredentialStore};

/// Base64url (unpadded) encoding of `len` bytes from the OS RNG.
pub fn random_string(len: usize) -> Result<String> {
    let mut bytes = vec![0u8; len];
    getrandom::getrandom(&mut bytes).context("OS random source unavailable")?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// S256 code challenge for `verifier`.
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// State for one browser consent round-trip. Single use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthTransaction {
    pub state: String,
    pub code_verifier: String,
    pub redirect_port: u16,
}

impl OAuthTransaction {
    /// Fresh transaction: 32 random bytes of state, 64 of verifier.
    pub fn generate(redirect_port: u16) -> Result<Self> {
        Ok(Self {
            state: random_string(32)?,
            code_verifier: random_string(64)?,
            redirect_port,
        })
    }

    pub fn code_challenge(&self) -> String {
        code_challenge(&self.code_verifier)
    }

    /// Overwrites any previous transaction.
    pub fn save(&self, store: &dyn CredentialStore) -> Result<()> {
        store.set(keys::OAUTH_STATE, &self.state)?;
        store.set(keys::CODE_VERIFIER, &self.code_verifier)?;
        store.set(keys::REDIRECT_PORT, &self.redirect_port.to_string())
    }

    /// Pending transaction, if both state and verifier are stored.
    pub fn load(store: &dyn CredentialStore, default_port: u16) -> Option<Self> {
        let state = store.get(keys::OAUTH_STATE)?;
        let code_verifier = store.get(keys::CODE_VERIFIER)?;
        let redirect_port = stored_redirect_port(store).unwrap_or(default_port);
        Some(Self {
            state,
            code_verifier,
            redirect_port,
        })
    }

    /// Remove state and verifier. The redirect port stays, it is reused.
    pub fn clear(store: &dyn CredentialStore) -> Result<()> {
        store.delete(keys::OAUTH_STATE)?;
        store.delete(keys::CODE_VERIFIER)
    }
}

pub fn stored_redirect_port(store: &dyn CredentialStore) -> Option<u16> {
    store.get(keys::REDIRECT_PORT)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryStore;
    use oauth2::{PkceCodeChallenge, PkceCodeVerifier};

    #[test]
    fn test_random_string_is_base64url() {
        let s = random_string(64).unwrap();
        // 64 bytes -> 86 unpadded base64 chars
        assert_eq!(s.len(), 86);
        assert!(s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(s, random_string(64).unwrap());
    }

    #[test]
    fn test_code_challenge_rfc7636_vector() {
        // RFC 7636 appendix B
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            code_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_code_challenge_matches_oauth2_crate() {
        let tx = OAuthTransaction::generate(43821).unwrap();
        let expected = PkceCodeChallenge::from_code_verifier_sha256(&PkceCodeVerifier::new(
            tx.code_verifier.clone(),
        ));
        assert_eq!(tx.code_challenge(), expected.as_str());
    }

    #[test]
    fn test_transaction_save_load_clear() {
        let store = MemoryStore::new();
        assert!(OAuthTransaction::load(&store, 1).is_none());

        let tx = OAuthTransaction::generate(5555).unwrap();
        tx.save(&store).unwrap();
        assert_eq!(OAuthTransaction::load(&store, 1), Some(tx.clone()));

        // A second attempt overwrites the first.
        let next = OAuthTransaction::generate(5555).unwrap();
        next.save(&store).unwrap();
        assert_eq!(OAuthTransaction::load(&store, 1).unwrap().state, next.state);

        OAuthTransaction::clear(&store).unwrap();
        assert!(OAuthTransaction::load(&store, 1).is_none());
        assert_eq!(stored_redirect_port(&store), Some(5555));
    }
}

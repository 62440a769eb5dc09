// ABOUTME: AEAD sealing for credential material at rest
// ABOUTME: Derives an AES-256-GCM key from the configured sealing key

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::warn;

use crate::error::{AuthError, AuthResult};

/// Seals and opens token strings before they touch the database. Constructed
/// without a key, it passes values through unchanged.
#[derive(Clone)]
pub struct TokenSealer {
    key: Option<Arc<LessSafeKey>>,
    rng: SystemRandom,
}

impl TokenSealer {
    /// Build a sealer from the configured key string. The key is digested to
    /// 256 bits so operators can supply any sufficiently random passphrase.
    pub fn from_key(key: &str) -> AuthResult<Self> {
        let derived = digest::digest(&digest::SHA256, key.as_bytes());
        let unbound = UnboundKey::new(&AES_256_GCM, derived.as_ref())
            .map_err(|_| AuthError::Seal("failed to initialize sealing key".to_string()))?;
        Ok(Self {
            key: Some(Arc::new(LessSafeKey::new(unbound))),
            rng: SystemRandom::new(),
        })
    }

    /// Passthrough sealer for deployments without a configured key.
    pub fn disabled() -> Self {
        warn!("No sealing key configured, tokens will be stored in plaintext");
        Self {
            key: None,
            rng: SystemRandom::new(),
        }
    }

    pub fn from_optional_key(key: Option<&str>) -> AuthResult<Self> {
        match key {
            Some(k) => Self::from_key(k),
            None => Ok(Self::disabled()),
        }
    }

    pub fn is_sealing(&self) -> bool {
        self.key.is_some()
    }

    /// Seal a token. Output is base64 over nonce || ciphertext || tag.
    pub fn seal(&self, plaintext: &str) -> AuthResult<String> {
        let Some(key) = &self.key else {
            return Ok(plaintext.to_string());
        };

        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| AuthError::Seal("nonce generation failed".to_string()))?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.as_bytes().to_vec();
        key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| AuthError::Seal("seal failed".to_string()))?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&in_out);
        Ok(STANDARD.encode(sealed))
    }

    /// Open a sealed token produced by `seal`.
    pub fn open(&self, sealed: &str) -> AuthResult<String> {
        let Some(key) = &self.key else {
            return Ok(sealed.to_string());
        };

        let bytes = STANDARD
            .decode(sealed)
            .map_err(|e| AuthError::Seal(format!("sealed value is not base64: {}", e)))?;
        if bytes.len() <= NONCE_LEN {
            return Err(AuthError::Seal("sealed value too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| AuthError::Seal("bad nonce".to_string()))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| AuthError::Seal("open failed, wrong key or corrupt value".to_string()))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| AuthError::Seal("opened value is not UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_round_trip() {
        let sealer = TokenSealer::from_key("a test sealing key").unwrap();
        let sealed = sealer.seal("tok_secret_value").unwrap();
        assert_ne!(sealed, "tok_secret_value");
        assert_eq!(sealer.open(&sealed).unwrap(), "tok_secret_value");
    }

    #[test]
    fn test_seal_is_randomized() {
        let sealer = TokenSealer::from_key("a test sealing key").unwrap();
        let a = sealer.seal("tok_secret_value").unwrap();
        let b = sealer.seal("tok_secret_value").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let sealer = TokenSealer::from_key("key one").unwrap();
        let other = TokenSealer::from_key("key two").unwrap();
        let sealed = sealer.seal("tok_secret_value").unwrap();
        assert!(other.open(&sealed).is_err());
    }

    #[test]
    fn test_disabled_sealer_passthrough() {
        let sealer = TokenSealer::disabled();
        assert!(!sealer.is_sealing());
        assert_eq!(sealer.seal("plain").unwrap(), "plain");
        assert_eq!(sealer.open("plain").unwrap(), "plain");
    }
}

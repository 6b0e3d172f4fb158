//! Session crypto contexts derived from a key-agreement shared secret.
//!
//! ```text
//! shared_secret ─[HKDF-SHA256]─► "keyx/v1/session/encryption" ─► ChaCha20-Poly1305 key
//!               └[HKDF-SHA256]─► "keyx/v1/session/hmac"       ─► HMAC-SHA256 key
//! ```
//!
//! Both parties run the same derivation over the same shared secret, so their
//! contexts hold identical key material. Signatures therefore match byte for
//! byte, while ciphertexts differ because every encryption draws a fresh nonce.

use std::fmt;

use rand::rngs::OsRng;

use super::aead::AeadCipher;
use super::error::CryptoError;
use super::hmac_auth::{HmacAuth, HmacError};
use super::key::KeyMaterial;
use super::{AEAD_KEY_SIZE, HMAC_KEY_SIZE};

/// HKDF label for the session encryption key
pub const ENCRYPTION_KEY_INFO: &[u8] = b"keyx/v1/session/encryption";

/// HKDF label for the session HMAC key
pub const HMAC_KEY_INFO: &[u8] = b"keyx/v1/session/hmac";

/// Symmetric operations available once a key exchange has completed.
///
/// Implementations must be usable from several threads at once; they hold
/// only immutable key material.
pub trait CryptoContext: fmt::Debug + Send + Sync {
    /// Encrypt `plaintext`. Output is randomized.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt a ciphertext produced by `encrypt` under the same keys.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Compute a deterministic signature (MAC) over `data`.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Check `signature` against `data`. A mismatch is `Ok(false)`, not an error.
    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError>;
}

/// Crypto context holding session keys derived from a shared secret.
pub struct SessionCryptoContext {
    cipher: AeadCipher,
    auth: HmacAuth,
}

impl SessionCryptoContext {
    /// Derive encryption and HMAC keys from a raw shared secret.
    pub fn from_shared_secret(shared_secret: &KeyMaterial) -> Result<Self, CryptoError> {
        let encryption_key = shared_secret.expand(ENCRYPTION_KEY_INFO, AEAD_KEY_SIZE)?;
        let hmac_key = shared_secret.expand(HMAC_KEY_INFO, HMAC_KEY_SIZE)?;

        tracing::debug!(
            secret_len = shared_secret.len(),
            "derived session keys from shared secret"
        );

        Ok(Self {
            cipher: AeadCipher::new(encryption_key)?,
            auth: HmacAuth::new(hmac_key)?,
        })
    }
}

impl CryptoContext for SessionCryptoContext {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(self.cipher.seal(&mut OsRng, plaintext, &[])?)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(self.cipher.open(ciphertext, &[])?)
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(self.auth.compute_tag(data)?.to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        match self.auth.verify_tag(data, signature) {
            Ok(()) => Ok(true),
            Err(HmacError::Mismatch) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl fmt::Debug for SessionCryptoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCryptoContext")
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

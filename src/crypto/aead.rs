//! Payload sealing for session crypto contexts.
//!
//! A sealed payload carries its own nonce:
//!
//! ```text
//! <nonce:12><ciphertext:len(plaintext)><tag:16>
//! ```
//!
//! Every call to [`AeadCipher::seal`] draws a new nonce, so sealing the same
//! plaintext twice never yields the same bytes.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::{CryptoRng, RngCore};
use thiserror::Error;

use super::key::KeyMaterial;
use super::{AEAD_KEY_SIZE, AEAD_TAG_SIZE, NONCE_SIZE};

/// Errors from sealing and opening payloads
#[derive(Debug, Error)]
pub enum AeadError {
    /// Key is not exactly [`AEAD_KEY_SIZE`] bytes
    #[error("Session encryption key must be 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// Cipher refused to seal the payload
    #[error("Sealing failed")]
    SealFailed,

    /// Tag did not verify: wrong key, wrong associated data or modified bytes
    #[error("Sealed payload failed authentication")]
    OpenFailed,

    /// Input is shorter than a nonce plus a tag
    #[error("Sealed payload too short: {0} bytes")]
    Truncated(usize),
}

/// ChaCha20-Poly1305 over a single session key
pub struct AeadCipher {
    key: KeyMaterial,
}

impl AeadCipher {
    /// Wrap a 256-bit session key
    pub fn new(key: KeyMaterial) -> Result<Self, AeadError> {
        match key.len() {
            AEAD_KEY_SIZE => Ok(Self { key }),
            len => Err(AeadError::InvalidKeyLength(len)),
        }
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(self.key.as_bytes()))
    }

    /// Seal under a caller-chosen nonce. The nonce must never repeat for a key.
    pub fn seal_with_nonce(
        &self,
        nonce: [u8; NONCE_SIZE],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, AeadError> {
        let sealed = self
            .cipher()
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| AeadError::SealFailed)?;

        let mut out = nonce.to_vec();
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Seal under a nonce drawn from `rng`.
    pub fn seal<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, AeadError> {
        let mut nonce = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut nonce);
        self.seal_with_nonce(nonce, plaintext, aad)
    }

    /// Open a payload produced by [`seal`](Self::seal) or
    /// [`seal_with_nonce`](Self::seal_with_nonce).
    pub fn open(&self, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>, AeadError> {
        if sealed.len() < NONCE_SIZE + AEAD_TAG_SIZE {
            return Err(AeadError::Truncated(sealed.len()));
        }

        let (nonce, body) = sealed.split_at(NONCE_SIZE);
        self.cipher()
            .decrypt(Nonce::from_slice(nonce), Payload { msg: body, aad })
            .map_err(|_| AeadError::OpenFailed)
    }
}

impl std::fmt::Debug for AeadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AeadCipher(ChaCha20-Poly1305)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn session_cipher(fill: u8) -> AeadCipher {
        AeadCipher::new(KeyMaterial::new(vec![fill; AEAD_KEY_SIZE])).unwrap()
    }

    const NONCE: [u8; NONCE_SIZE] = [7; NONCE_SIZE];

    #[test]
    fn test_sealed_layout() {
        let sealed = session_cipher(1)
            .seal_with_nonce(NONCE, b"payload", b"")
            .unwrap();
        assert_eq!(&sealed[..NONCE_SIZE], &NONCE);
        assert_eq!(sealed.len(), NONCE_SIZE + 7 + AEAD_TAG_SIZE);
    }

    #[test]
    fn test_open_sealed() {
        let cipher = session_cipher(1);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let sealed = cipher.seal(&mut rng, b"payload", b"header").unwrap();
        assert_eq!(cipher.open(&sealed, b"header").unwrap(), b"payload");
    }

    #[test]
    fn test_open_rejects_modified_payload() {
        let cipher = session_cipher(1);
        let sealed = cipher.seal_with_nonce(NONCE, b"payload", b"").unwrap();

        for i in [0, NONCE_SIZE, sealed.len() - 1] {
            let mut bad = sealed.clone();
            bad[i] ^= 0x01;
            assert!(matches!(cipher.open(&bad, b""), Err(AeadError::OpenFailed)));
        }
        assert!(matches!(
            cipher.open(&sealed, b"other header"),
            Err(AeadError::OpenFailed)
        ));
        assert!(session_cipher(2).open(&sealed, b"").is_err());
    }

    #[test]
    fn test_key_length_enforced() {
        for len in [0, 16, 33] {
            assert!(matches!(
                AeadCipher::new(KeyMaterial::new(vec![0u8; len])),
                Err(AeadError::InvalidKeyLength(l)) if l == len
            ));
        }
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(
            session_cipher(1).open(&[0u8; NONCE_SIZE + AEAD_TAG_SIZE - 1], b""),
            Err(AeadError::Truncated(27))
        ));
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let cipher = session_cipher(1);
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let a = cipher.seal(&mut rng, b"payload", b"").unwrap();
        let b = cipher.seal(&mut rng, b"payload", b"").unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
    }
}

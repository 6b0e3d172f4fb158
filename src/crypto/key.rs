//! Secret byte strings and HKDF expansion.
//!
//! Session keys are never taken directly from the Diffie-Hellman shared
//! secret; each one is expanded from it under its own label.

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Errors from key handling
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Input keying material was empty
    #[error("Key material is empty")]
    Empty,

    /// Requested output exceeds what HKDF-SHA256 can produce (8160 bytes)
    #[error("Cannot expand {0} bytes of key material")]
    OutputTooLong(usize),
}

/// Secret bytes, wiped from memory on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: Vec<u8>,
}

impl KeyMaterial {
    /// Take ownership of secret bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The secret bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether there are no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// HKDF-SHA256 with an empty salt, using `label` as the info string.
    pub fn expand(&self, label: &[u8], len: usize) -> Result<KeyMaterial, KeyError> {
        if self.is_empty() {
            return Err(KeyError::Empty);
        }

        let mut okm = vec![0u8; len];
        Hkdf::<Sha256>::new(None, &self.bytes)
            .expand(label, &mut okm)
            .map_err(|_| KeyError::OutputTooLong(len))?;
        Ok(Self::new(okm))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial({} bytes, REDACTED)", self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_debug_hides_bytes() {
        let debug = format!("{:?}", KeyMaterial::new(b"secret".to_vec()));
        assert_eq!(debug, "KeyMaterial(6 bytes, REDACTED)");
    }

    #[test]
    fn test_labels_separate_keys() {
        let secret = KeyMaterial::new(vec![0x17; 256]);
        let enc = secret.expand(b"label/a", 32).unwrap();
        let mac = secret.expand(b"label/b", 32).unwrap();

        assert_eq!(enc, secret.expand(b"label/a", 32).unwrap());
        assert_ne!(enc, mac);
        assert_eq!(enc.len(), 32);
    }

    /// RFC 5869 Appendix A.3: zero-length salt and info.
    #[test]
    fn test_hkdf_rfc5869_case3() {
        let ikm = KeyMaterial::new(hex!("0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b").to_vec());
        let okm = ikm.expand(b"", 42).unwrap();
        assert_eq!(
            okm.as_bytes(),
            hex!(
                "8da4e775a563c18f715f802a063c5a31"
                "b8a11f5c5ee1879ec3454e5f3c738d2d"
                "9d201395faa4b61a96c8"
            )
        );
    }

    #[test]
    fn test_expand_limits() {
        let secret = KeyMaterial::new(vec![1; 32]);
        assert!(secret.expand(b"x", 255 * 32).is_ok());
        assert_eq!(
            secret.expand(b"x", 255 * 32 + 1),
            Err(KeyError::OutputTooLong(8161))
        );
        assert_eq!(KeyMaterial::new(Vec::new()).expand(b"x", 32), Err(KeyError::Empty));
    }
}

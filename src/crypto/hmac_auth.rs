//! HMAC-SHA256 signatures.
//!
//! Tags depend only on key and message, which is what lets two independently
//! derived session contexts produce byte-identical signatures.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use super::key::KeyMaterial;
use super::{HMAC_TAG_SIZE, MIN_HMAC_KEY_SIZE};

type HmacSha256 = Hmac<Sha256>;

/// Errors from HMAC signing and verification
#[derive(Debug, Error)]
pub enum HmacError {
    /// Key shorter than [`MIN_HMAC_KEY_SIZE`]
    #[error("HMAC key too short: {0} bytes (minimum 16)")]
    KeyTooShort(usize),

    /// MAC construction rejected the key
    #[error("Invalid HMAC key: {0}")]
    InvalidKey(String),

    /// Tag does not match the message
    #[error("HMAC tag mismatch")]
    Mismatch,
}

/// HMAC-SHA256 keyed signer
#[derive(Debug)]
pub struct HmacAuth {
    key: KeyMaterial,
}

impl HmacAuth {
    /// Create a signer. Keys below 128 bits are refused.
    pub fn new(key: KeyMaterial) -> Result<Self, HmacError> {
        if key.len() < MIN_HMAC_KEY_SIZE {
            return Err(HmacError::KeyTooShort(key.len()));
        }
        Ok(Self { key })
    }

    fn keyed(&self, data: &[u8]) -> Result<HmacSha256, HmacError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.key.as_bytes())
            .map_err(|e| HmacError::InvalidKey(e.to_string()))?;
        mac.update(data);
        Ok(mac)
    }

    /// Tag over `data`
    pub fn compute_tag(&self, data: &[u8]) -> Result<[u8; HMAC_TAG_SIZE], HmacError> {
        Ok(self.keyed(data)?.finalize().into_bytes().into())
    }

    /// Constant-time check of `tag` against `data`
    pub fn verify_tag(&self, data: &[u8], tag: &[u8]) -> Result<(), HmacError> {
        self.keyed(data)?
            .verify_slice(tag)
            .map_err(|_| HmacError::Mismatch)
    }
}

//! Error type returned by [`CryptoContext`](super::CryptoContext) operations.

use thiserror::Error;

use super::aead::AeadError;
use super::hmac_auth::HmacError;
use super::key::KeyError;

/// Failure inside a session crypto context or while building one.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Payload sealing or opening failed
    #[error("AEAD: {0}")]
    Aead(#[from] AeadError),

    /// Signature computation failed
    #[error("HMAC: {0}")]
    Hmac(#[from] HmacError),

    /// Session key derivation failed
    #[error("Key: {0}")]
    Key(#[from] KeyError),
}

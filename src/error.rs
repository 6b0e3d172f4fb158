//! Key exchange error types.
//!
//! Every failure is returned to the immediate caller; nothing in this crate
//! retries or recovers silently. Most variants describe a bad input from the
//! remote peer (malformed key data, unknown parameters, untrusted token).
//! [`KeyxError::InternalContract`] is different: it means the caller handed a
//! factory the wrong kind of message and is always a local bug.
//!
//! The `Crypto` and `MasterToken` variants preserve the full error chain via
//! `#[source]`.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::token::MasterTokenError;

/// Key exchange errors.
#[derive(Error, Debug)]
pub enum KeyxError {
    /// A required wire field is absent or structurally malformed.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Public key bytes do not decode to a valid group element.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Parameters ID is not registered (malformed or simply unknown).
    #[error("Unknown key exchange parameters ID: {0}")]
    UnknownParameters(String),

    /// Response parameters ID differs from the request's.
    #[error("Key response parameters ID {response} does not match request {request}")]
    ResponseRequestMismatch {
        /// Parameters ID in the request
        request: String,
        /// Parameters ID in the response
        response: String,
    },

    /// Context derivation needs the locally retained private key.
    #[error("Key request data has no private key")]
    PrivateKeyMissing,

    /// Master token failed trust verification.
    #[error("Master token is not trusted (serial number {serial_number})")]
    MasterTokenUntrusted {
        /// Serial number of the rejected token
        serial_number: u64,
    },

    /// Wrong message variant passed to a factory. Caller bug.
    #[error("Internal contract violation: {0}")]
    InternalContract(String),

    /// Master token collaborator failure.
    #[error("Master token error: {0}")]
    MasterToken(#[source] MasterTokenError),

    /// Symmetric crypto failure while building or using a context.
    #[error("Crypto error: {0}")]
    Crypto(#[source] CryptoError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for key exchange operations
pub type Result<T> = std::result::Result<T, KeyxError>;

impl From<CryptoError> for KeyxError {
    fn from(err: CryptoError) -> Self {
        KeyxError::Crypto(err)
    }
}

impl From<MasterTokenError> for KeyxError {
    fn from(err: MasterTokenError) -> Self {
        KeyxError::MasterToken(err)
    }
}

impl From<toml::de::Error> for KeyxError {
    fn from(err: toml::de::Error) -> Self {
        KeyxError::Config(err.to_string())
    }
}

//! Master tokens and the service contract that issues them.
//!
//! A master token binds an entity identity to a trust context. The key
//! exchange only consumes the contract below: it asks for a fresh token on
//! the initial path, checks trust and asks for a renewal on the renewal path,
//! and delegates the token's wire form when parsing a response.
//!
//! # Wire Format
//!
//! ```text
//! {
//!   "tokendata": <base64 of JSON claims>,
//!   "signature": <base64 of issuer signature over tokendata bytes>
//! }
//!
//! claims = {
//!   "identity": <string>,
//!   "serialnumber": <0..=2^53>,
//!   "sequencenumber": <0..=2^53>,
//!   "renewalwindow": <unix seconds>,
//!   "expiration": <unix seconds>
//! }
//! ```

mod issuer;

pub use issuer::LocalTokenIssuer;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::crypto::HmacError;

/// Largest serial or sequence number a master token may carry (2^53).
pub const MAX_SEQUENCE_NUMBER: u64 = 1 << 53;

/// JSON key for the token claims
const KEY_TOKENDATA: &str = "tokendata";
/// JSON key for the issuer signature
const KEY_SIGNATURE: &str = "signature";

/// Errors from the master token collaborator
#[derive(Debug, Error)]
pub enum MasterTokenError {
    /// Wire form is missing fields or does not decode
    #[error("Malformed master token: {0}")]
    Malformed(String),

    /// Serial or sequence number outside `0..=2^53`
    #[error("Master token number out of range: {0}")]
    SequenceOutOfRange(u64),

    /// Token signature does not verify under this issuer
    #[error("Master token {serial_number} was not issued by this service")]
    Unverified {
        /// Serial number of the offending token
        serial_number: u64,
    },

    /// Signing failed
    #[error("Master token signing failed: {0}")]
    Signing(#[source] HmacError),
}

/// Increment a sequence number, wrapping from `2^53` back to zero.
pub fn next_sequence_number(sequence_number: u64) -> u64 {
    if sequence_number >= MAX_SEQUENCE_NUMBER {
        0
    } else {
        sequence_number + 1
    }
}

/// Signed claims carried by a master token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Entity identity the token is bound to
    pub identity: String,
    /// Serial number, fixed for the token's lifetime across renewals
    #[serde(rename = "serialnumber")]
    pub serial_number: u64,
    /// Sequence number, incremented on each renewal
    #[serde(rename = "sequencenumber")]
    pub sequence_number: u64,
    /// Unix time after which renewal is permitted
    #[serde(rename = "renewalwindow")]
    pub renewal_window: u64,
    /// Unix time after which the token is expired
    pub expiration: u64,
}

impl TokenClaims {
    fn validate(&self) -> Result<(), MasterTokenError> {
        for number in [self.serial_number, self.sequence_number] {
            if number > MAX_SEQUENCE_NUMBER {
                return Err(MasterTokenError::SequenceOutOfRange(number));
            }
        }
        if self.identity.is_empty() {
            return Err(MasterTokenError::Malformed("empty identity".to_string()));
        }
        Ok(())
    }
}

/// A signed, renewable credential.
///
/// The exact claim bytes are retained so that re-serializing a parsed token
/// reproduces its original wire form and signature input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MasterToken {
    claims: TokenClaims,
    tokendata: Vec<u8>,
    signature: Vec<u8>,
}

impl MasterToken {
    /// Encode claims for signing. The returned bytes are what the signature covers.
    pub fn encode_claims(claims: &TokenClaims) -> Result<Vec<u8>, MasterTokenError> {
        claims.validate()?;
        serde_json::to_vec(claims).map_err(|e| MasterTokenError::Malformed(e.to_string()))
    }

    /// Assemble a token from encoded claims and the issuer's signature over them.
    pub fn from_parts(tokendata: Vec<u8>, signature: Vec<u8>) -> Result<Self, MasterTokenError> {
        let claims: TokenClaims = serde_json::from_slice(&tokendata)
            .map_err(|e| MasterTokenError::Malformed(format!("token data: {e}")))?;
        claims.validate()?;
        Ok(Self {
            claims,
            tokendata,
            signature,
        })
    }

    /// Parse a token from its wire form. Does not check trust.
    pub fn from_json(value: &Value) -> Result<Self, MasterTokenError> {
        let field = |key: &str| -> Result<Vec<u8>, MasterTokenError> {
            let encoded = value
                .get(key)
                .and_then(Value::as_str)
                .ok_or_else(|| MasterTokenError::Malformed(format!("missing {key}")))?;
            STANDARD
                .decode(encoded)
                .map_err(|e| MasterTokenError::Malformed(format!("{key}: {e}")))
        };

        Self::from_parts(field(KEY_TOKENDATA)?, field(KEY_SIGNATURE)?)
    }

    /// Wire form of the token
    pub fn to_json(&self) -> Value {
        json!({
            KEY_TOKENDATA: STANDARD.encode(&self.tokendata),
            KEY_SIGNATURE: STANDARD.encode(&self.signature),
        })
    }

    /// Claims carried by the token
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Entity identity
    pub fn identity(&self) -> &str {
        &self.claims.identity
    }

    /// Serial number
    pub fn serial_number(&self) -> u64 {
        self.claims.serial_number
    }

    /// Sequence number
    pub fn sequence_number(&self) -> u64 {
        self.claims.sequence_number
    }

    /// Renewal window (unix seconds)
    pub fn renewal_window(&self) -> u64 {
        self.claims.renewal_window
    }

    /// Expiration (unix seconds)
    pub fn expiration(&self) -> u64 {
        self.claims.expiration
    }

    /// Bytes covered by the signature
    pub fn tokendata(&self) -> &[u8] {
        &self.tokendata
    }

    /// Issuer signature
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

/// Issues, renews and verifies master tokens.
///
/// Passed explicitly into key exchange operations; the factories hold no
/// reference to a token store of their own.
pub trait MasterTokenService: Send + Sync {
    /// Issue a new token bound to `identity`.
    fn issue(&self, identity: &str, sequence_number: u64) -> Result<MasterToken, MasterTokenError>;

    /// Renew `token`, keeping identity and serial number and incrementing the
    /// sequence number by one (see [`next_sequence_number`]).
    fn renew(&self, token: &MasterToken) -> Result<MasterToken, MasterTokenError>;

    /// Whether `token` was issued by this trust context and is unmodified.
    fn is_trusted(&self, token: &MasterToken) -> bool;

    /// Parse the token's wire form.
    fn parse(&self, value: &Value) -> Result<MasterToken, MasterTokenError> {
        MasterToken::from_json(value)
    }
}

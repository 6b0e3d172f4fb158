//! Key exchange schemes and the scheme-tagged message envelope.
//!
//! Key request and response data travel inside a small envelope naming the
//! scheme that understands them:
//!
//! ```text
//! { "scheme": "DIFFIE_HELLMAN", "keydata": { ... } }
//! ```
//!
//! Dispatch is on the `scheme` tag. Schemes this crate does not implement
//! still parse, as [`KeyRequestData::Opaque`] / [`KeyResponseData::Opaque`],
//! so an outer handshake can route them to another factory. Handing a
//! factory a variant it does not own is a caller bug and fails with
//! [`KeyxError::InternalContract`].
//!
//! # Schemes
//!
//! | Scheme               | Implemented here |
//! |----------------------|------------------|
//! | `SYMMETRIC_WRAPPED`  | no               |
//! | `ASYMMETRIC_WRAPPED` | no               |
//! | `DIFFIE_HELLMAN`     | yes ([`dh`])     |
//! | `JWE_LADDER`         | no               |
//! | `JWK_LADDER`         | no               |

pub mod dh;

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::crypto::CryptoContext;
use crate::error::{KeyxError, Result};
use crate::token::{MasterToken, MasterTokenService};

use dh::{RequestData, ResponseData};

/// JSON key for the scheme name
pub const KEY_SCHEME: &str = "scheme";
/// JSON key for the scheme-specific key data
pub const KEY_KEYDATA: &str = "keydata";

/// Key exchange schemes known to the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyExchangeScheme {
    /// Session keys wrapped under a pre-shared key
    SymmetricWrapped,
    /// Session keys wrapped under an ephemeral RSA key
    AsymmetricWrapped,
    /// Ephemeral Diffie-Hellman agreement
    DiffieHellman,
    /// JSON Web Encryption ladder
    JweLadder,
    /// JSON Web Key ladder
    JwkLadder,
}

impl KeyExchangeScheme {
    /// All schemes
    pub const ALL: [KeyExchangeScheme; 5] = [
        KeyExchangeScheme::SymmetricWrapped,
        KeyExchangeScheme::AsymmetricWrapped,
        KeyExchangeScheme::DiffieHellman,
        KeyExchangeScheme::JweLadder,
        KeyExchangeScheme::JwkLadder,
    ];

    /// Wire name. The only mapping between variants and their names.
    pub fn name(&self) -> &'static str {
        match self {
            KeyExchangeScheme::SymmetricWrapped => "SYMMETRIC_WRAPPED",
            KeyExchangeScheme::AsymmetricWrapped => "ASYMMETRIC_WRAPPED",
            KeyExchangeScheme::DiffieHellman => "DIFFIE_HELLMAN",
            KeyExchangeScheme::JweLadder => "JWE_LADDER",
            KeyExchangeScheme::JwkLadder => "JWK_LADDER",
        }
    }

    /// Look up a scheme by wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for KeyExchangeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split an envelope into its scheme and key data.
fn parse_envelope(value: &Value) -> Result<(KeyExchangeScheme, &Map<String, Value>)> {
    let name = value
        .get(KEY_SCHEME)
        .and_then(Value::as_str)
        .ok_or_else(|| KeyxError::Encoding(format!("missing {KEY_SCHEME}")))?;
    let scheme = KeyExchangeScheme::from_name(name)
        .ok_or_else(|| KeyxError::Encoding(format!("unknown key exchange scheme {name}")))?;
    let keydata = value
        .get(KEY_KEYDATA)
        .and_then(Value::as_object)
        .ok_or_else(|| KeyxError::Encoding(format!("missing {KEY_KEYDATA}")))?;
    Ok((scheme, keydata))
}

fn envelope(scheme: KeyExchangeScheme, keydata: Map<String, Value>) -> Value {
    let mut object = Map::new();
    object.insert(KEY_SCHEME.to_string(), Value::String(scheme.name().to_string()));
    object.insert(KEY_KEYDATA.to_string(), Value::Object(keydata));
    Value::Object(object)
}

/// Key request data, tagged by scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRequestData {
    /// Diffie-Hellman request
    DiffieHellman(RequestData),
    /// Request for a scheme this crate does not interpret
    Opaque {
        /// Scheme tag
        scheme: KeyExchangeScheme,
        /// Uninterpreted key data
        keydata: Map<String, Value>,
    },
}

impl KeyRequestData {
    /// Scheme tag
    pub fn scheme(&self) -> KeyExchangeScheme {
        match self {
            KeyRequestData::DiffieHellman(_) => KeyExchangeScheme::DiffieHellman,
            KeyRequestData::Opaque { scheme, .. } => *scheme,
        }
    }

    /// Scheme-specific key data
    pub fn keydata(&self) -> Map<String, Value> {
        match self {
            KeyRequestData::DiffieHellman(data) => data.keydata(),
            KeyRequestData::Opaque { keydata, .. } => keydata.clone(),
        }
    }

    /// Envelope `{scheme, keydata}`
    pub fn to_json(&self) -> Value {
        envelope(self.scheme(), self.keydata())
    }

    /// Parse an envelope, dispatching on `scheme`
    pub fn parse(value: &Value) -> Result<Self> {
        let (scheme, keydata) = parse_envelope(value)?;
        match scheme {
            KeyExchangeScheme::DiffieHellman => {
                Ok(KeyRequestData::DiffieHellman(RequestData::parse(keydata)?))
            },
            scheme => Ok(KeyRequestData::Opaque {
                scheme,
                keydata: keydata.clone(),
            }),
        }
    }
}

impl From<RequestData> for KeyRequestData {
    fn from(data: RequestData) -> Self {
        KeyRequestData::DiffieHellman(data)
    }
}

/// Key response data, tagged by scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResponseData {
    /// Diffie-Hellman response
    DiffieHellman(ResponseData),
    /// Response for a scheme this crate does not interpret
    Opaque {
        /// Scheme tag
        scheme: KeyExchangeScheme,
        /// Uninterpreted key data
        keydata: Map<String, Value>,
    },
}

impl KeyResponseData {
    /// Scheme tag
    pub fn scheme(&self) -> KeyExchangeScheme {
        match self {
            KeyResponseData::DiffieHellman(_) => KeyExchangeScheme::DiffieHellman,
            KeyResponseData::Opaque { scheme, .. } => *scheme,
        }
    }

    /// Scheme-specific key data
    pub fn keydata(&self) -> Map<String, Value> {
        match self {
            KeyResponseData::DiffieHellman(data) => data.keydata(),
            KeyResponseData::Opaque { keydata, .. } => keydata.clone(),
        }
    }

    /// Master token carried by the response, if the scheme is understood
    pub fn master_token(&self) -> Option<&MasterToken> {
        match self {
            KeyResponseData::DiffieHellman(data) => Some(data.master_token()),
            KeyResponseData::Opaque { .. } => None,
        }
    }

    /// Diffie-Hellman response data, if that is the variant
    pub fn as_diffie_hellman(&self) -> Option<&ResponseData> {
        match self {
            KeyResponseData::DiffieHellman(data) => Some(data),
            KeyResponseData::Opaque { .. } => None,
        }
    }

    /// Envelope `{scheme, keydata}`
    pub fn to_json(&self) -> Value {
        envelope(self.scheme(), self.keydata())
    }

    /// Parse an envelope, dispatching on `scheme`
    pub fn parse(tokens: &dyn MasterTokenService, value: &Value) -> Result<Self> {
        let (scheme, keydata) = parse_envelope(value)?;
        match scheme {
            KeyExchangeScheme::DiffieHellman => Ok(KeyResponseData::DiffieHellman(
                ResponseData::parse(tokens, keydata)?,
            )),
            scheme => Ok(KeyResponseData::Opaque {
                scheme,
                keydata: keydata.clone(),
            }),
        }
    }
}

impl From<ResponseData> for KeyResponseData {
    fn from(data: ResponseData) -> Self {
        KeyResponseData::DiffieHellman(data)
    }
}

/// Credential presented by the initiator to the responder's factory
#[derive(Debug, Clone, Copy)]
pub enum Credential<'a> {
    /// Entity identity; a new master token will be issued
    Identity(&'a str),
    /// Existing master token; it will be verified and renewed
    MasterToken(&'a MasterToken),
}

/// Result of a responder-side exchange
#[derive(Debug, Clone)]
pub struct KeyExchangeData {
    /// Session crypto context for the responder
    pub crypto_context: Arc<dyn CryptoContext>,
    /// Response to send back to the initiator
    pub key_response_data: KeyResponseData,
}

/// A key exchange scheme implementation.
///
/// Factories are shared between concurrent exchanges and hold only
/// immutable state; collaborators are passed in per call.
pub trait KeyExchangeFactory: Send + Sync {
    /// Scheme this factory implements
    fn scheme(&self) -> KeyExchangeScheme;

    /// Responder side: answer `request`, issuing or renewing a master token
    /// through `tokens`.
    fn generate_response(
        &self,
        tokens: &dyn MasterTokenService,
        request: &KeyRequestData,
        credential: Credential<'_>,
    ) -> Result<KeyExchangeData>;

    /// Initiator side: derive the session context from the retained request
    /// and the peer's response.
    ///
    /// `master_token` is the initiator's current token, if any. Schemes that
    /// wrap keys under it need it; Diffie-Hellman ignores it.
    fn get_crypto_context(
        &self,
        request: &KeyRequestData,
        response: &KeyResponseData,
        master_token: Option<&MasterToken>,
    ) -> Result<Arc<dyn CryptoContext>>;
}

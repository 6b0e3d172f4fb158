//! Diffie-Hellman key response data.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::keys::DhPublicKey;
use super::{hex_encode, required_str, KEY_MASTER_TOKEN, KEY_PARAMETERS_ID, KEY_PUBLIC_KEY};
use crate::error::{KeyxError, Result};
use crate::token::{MasterToken, MasterTokenService};

/// Responder's half of a Diffie-Hellman exchange.
///
/// Always carries a trusted master token: it is either minted by the
/// responder's token service or rejected when parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseData {
    master_token: MasterToken,
    parameters_id: String,
    public_key: DhPublicKey,
}

impl ResponseData {
    /// Create response data
    pub fn new(
        master_token: MasterToken,
        parameters_id: impl Into<String>,
        public_key: DhPublicKey,
    ) -> Self {
        Self {
            master_token,
            parameters_id: parameters_id.into(),
            public_key,
        }
    }

    /// Master token issued or renewed for the initiator
    pub fn master_token(&self) -> &MasterToken {
        &self.master_token
    }

    /// Parameters ID, echoed from the request
    pub fn parameters_id(&self) -> &str {
        &self.parameters_id
    }

    /// Responder public value
    pub fn public_key(&self) -> &DhPublicKey {
        &self.public_key
    }

    /// Wire key data: `{mastertoken, parametersid, publickey}`
    pub fn keydata(&self) -> Map<String, Value> {
        let mut keydata = Map::new();
        keydata.insert(KEY_MASTER_TOKEN.to_string(), self.master_token.to_json());
        keydata.insert(
            KEY_PARAMETERS_ID.to_string(),
            Value::String(self.parameters_id.clone()),
        );
        keydata.insert(
            KEY_PUBLIC_KEY.to_string(),
            Value::String(self.public_key.to_base64()),
        );
        keydata
    }

    /// Parse wire key data, delegating the embedded token to `tokens`.
    ///
    /// Fails with [`KeyxError::MasterTokenUntrusted`] if the token does not
    /// verify.
    pub fn parse(tokens: &dyn MasterTokenService, keydata: &Map<String, Value>) -> Result<Self> {
        let parameters_id = required_str(keydata, KEY_PARAMETERS_ID)?;
        let public_key = required_str(keydata, KEY_PUBLIC_KEY)?;
        let token_value = keydata
            .get(KEY_MASTER_TOKEN)
            .ok_or_else(|| KeyxError::Encoding(format!("missing {KEY_MASTER_TOKEN}")))?;

        let public_key = DhPublicKey::from_base64(public_key)?;
        let master_token = tokens.parse(token_value)?;
        if !tokens.is_trusted(&master_token) {
            tracing::warn!(
                serial_number = master_token.serial_number(),
                "rejecting key response with untrusted master token"
            );
            return Err(KeyxError::MasterTokenUntrusted {
                serial_number: master_token.serial_number(),
            });
        }

        Ok(Self::new(master_token, parameters_id, public_key))
    }

    /// Key that is equal for two values iff the values are equal.
    pub fn unique_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.master_token.tokendata());
        hasher.update(self.master_token.signature());
        format!(
            "{}:{}:{}",
            hex_encode(&hasher.finalize()),
            self.parameters_id,
            self.public_key.to_base64()
        )
    }
}

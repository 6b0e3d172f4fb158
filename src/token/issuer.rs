//! HMAC-signed master token issuer.
//!
//! Trust is decided by signature: a token is trusted iff its claim bytes
//! verify under this issuer's key. Tokens minted under any other key,
//! or modified after signing, are untrusted.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::{Rng, RngCore};

use super::{
    next_sequence_number, MasterToken, MasterTokenError, MasterTokenService, TokenClaims,
    MAX_SEQUENCE_NUMBER,
};
use crate::crypto::{HmacAuth, KeyMaterial};

/// Default token lifetime (24 hours)
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Default delay before renewal is permitted (12 hours)
pub const DEFAULT_RENEWAL_OFFSET: Duration = Duration::from_secs(12 * 60 * 60);

/// Issues master tokens signed with a local HMAC key
#[derive(Debug)]
pub struct LocalTokenIssuer {
    auth: HmacAuth,
    lifetime: Duration,
    renewal_offset: Duration,
}

impl LocalTokenIssuer {
    /// Create an issuer signing with `key`
    pub fn new(key: KeyMaterial) -> Result<Self, MasterTokenError> {
        Ok(Self {
            auth: HmacAuth::new(key).map_err(MasterTokenError::Signing)?,
            lifetime: DEFAULT_LIFETIME,
            renewal_offset: DEFAULT_RENEWAL_OFFSET,
        })
    }

    /// Create an issuer with a fresh random 256-bit signing key
    pub fn generate() -> Result<Self, MasterTokenError> {
        let mut key = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self::new(KeyMaterial::new(key))
    }

    /// Set token lifetime and the offset after which renewal is permitted
    pub fn with_lifetime(mut self, lifetime: Duration, renewal_offset: Duration) -> Self {
        self.lifetime = lifetime;
        self.renewal_offset = renewal_offset.min(lifetime);
        self
    }

    fn sign(&self, claims: &TokenClaims) -> Result<MasterToken, MasterTokenError> {
        let tokendata = MasterToken::encode_claims(claims)?;
        let signature = self
            .auth
            .compute_tag(&tokendata)
            .map_err(MasterTokenError::Signing)?;
        MasterToken::from_parts(tokendata, signature.to_vec())
    }

    fn claims_for(&self, identity: &str, serial_number: u64, sequence_number: u64) -> TokenClaims {
        let now = unix_now();
        TokenClaims {
            identity: identity.to_string(),
            serial_number,
            sequence_number,
            renewal_window: now.saturating_add(self.renewal_offset.as_secs()),
            expiration: now.saturating_add(self.lifetime.as_secs()),
        }
    }
}

impl MasterTokenService for LocalTokenIssuer {
    fn issue(&self, identity: &str, sequence_number: u64) -> Result<MasterToken, MasterTokenError> {
        let serial_number = rand::thread_rng().gen_range(0..=MAX_SEQUENCE_NUMBER);
        let token = self.sign(&self.claims_for(identity, serial_number, sequence_number))?;

        tracing::info!(
            identity,
            serial_number,
            sequence_number,
            "issued master token"
        );
        Ok(token)
    }

    fn renew(&self, token: &MasterToken) -> Result<MasterToken, MasterTokenError> {
        if !self.is_trusted(token) {
            return Err(MasterTokenError::Unverified {
                serial_number: token.serial_number(),
            });
        }

        let sequence_number = next_sequence_number(token.sequence_number());
        let renewed = self.sign(&self.claims_for(
            token.identity(),
            token.serial_number(),
            sequence_number,
        ))?;

        tracing::info!(
            identity = token.identity(),
            serial_number = token.serial_number(),
            sequence_number,
            "renewed master token"
        );
        Ok(renewed)
    }

    fn is_trusted(&self, token: &MasterToken) -> bool {
        self.auth
            .verify_tag(token.tokendata(), token.signature())
            .is_ok()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

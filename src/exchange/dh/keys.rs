//! Finite-field Diffie-Hellman keys.
//!
//! ```text
//! x  = random in [2, p-2]        private exponent
//! y  = g^x mod p                  public value
//! zz = y_peer^x mod p             shared secret, left-padded to |p| bytes
//! ```
//!
//! Public values travel as the big-endian unsigned encoding with a leading
//! zero byte whenever the top bit is set, so a two's-complement reader never
//! sees a negative number.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use super::params::ParameterSpec;
use crate::crypto::KeyMaterial;
use crate::error::{KeyxError, Result};

/// Exponent draws before key generation gives up on a group
pub const MAX_KEYGEN_ATTEMPTS: usize = 64;

/// Diffie-Hellman public value `y = g^x mod p`
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DhPublicKey(BigUint);

impl DhPublicKey {
    /// Wrap a public value
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    /// The public value
    pub fn value(&self) -> &BigUint {
        &self.0
    }

    /// Sign-safe big-endian encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.0.to_bytes_be();
        if bytes.first().is_some_and(|b| b & 0x80 != 0) {
            bytes.insert(0, 0);
        }
        bytes
    }

    /// Decode a big-endian unsigned value (leading zero bytes allowed).
    ///
    /// Rejects empty input and values below 2, which are never valid group
    /// elements.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(KeyxError::InvalidPublicKey("empty public key".to_string()));
        }
        let value = BigUint::from_bytes_be(bytes);
        if value <= BigUint::one() {
            return Err(KeyxError::InvalidPublicKey(format!(
                "public value {value} is not a group element"
            )));
        }
        Ok(Self(value))
    }

    /// Base64 of [`to_bytes`](Self::to_bytes), as carried on the wire
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Decode the wire form
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| KeyxError::InvalidPublicKey(format!("base64: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Check `1 < y < p - 1` for the given group.
    pub fn validate_for(&self, spec: &ParameterSpec) -> Result<()> {
        let p_minus_one = spec.prime_modulus() - BigUint::one();
        if self.0 <= BigUint::one() || self.0 >= p_minus_one {
            return Err(KeyxError::InvalidPublicKey(format!(
                "public value out of range for parameters {}",
                spec.id()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for DhPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = format!("{:x}", self.0);
        write!(
            f,
            "DhPublicKey({} bits, {}...)",
            self.0.bits(),
            &hex[..hex.len().min(8)]
        )
    }
}

/// Diffie-Hellman private exponent `x`
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DhPrivateKey(BigUint);

impl DhPrivateKey {
    /// Wrap a private exponent
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    /// The private exponent
    pub fn value(&self) -> &BigUint {
        &self.0
    }

    /// SHA-256 of the exponent bytes. Identifies the key without revealing it.
    pub fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(self.0.to_bytes_be()).into()
    }

    /// Public value for this exponent under `spec`
    pub fn public_key(&self, spec: &ParameterSpec) -> DhPublicKey {
        DhPublicKey(spec.generator().modpow(&self.0, spec.prime_modulus()))
    }

    /// Compute the shared secret with a peer's public value.
    ///
    /// The peer value is range-checked first; the result is padded to the
    /// modulus length so both sides hash identical bytes.
    pub fn agree(&self, peer: &DhPublicKey, spec: &ParameterSpec) -> Result<KeyMaterial> {
        peer.validate_for(spec)?;

        let shared = peer.0.modpow(&self.0, spec.prime_modulus()).to_bytes_be();
        let len = spec.modulus_len();
        let mut padded = vec![0u8; len.saturating_sub(shared.len())];
        padded.extend_from_slice(&shared);

        Ok(KeyMaterial::new(padded))
    }
}

impl fmt::Debug for DhPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DhPrivateKey([REDACTED])")
    }
}

/// Ephemeral Diffie-Hellman key pair
#[derive(Clone)]
pub struct DhKeyPair {
    public: DhPublicKey,
    private: DhPrivateKey,
}

impl DhKeyPair {
    /// Generate a key pair under `spec`.
    ///
    /// Exponents whose public value would fail [`DhPublicKey::validate_for`]
    /// are redrawn, so the peer never rejects an honestly generated key.
    /// Gives up after [`MAX_KEYGEN_ATTEMPTS`] draws.
    pub fn generate<R: RngCore + CryptoRng>(spec: &ParameterSpec, rng: &mut R) -> Result<Self> {
        let low = BigUint::from(2u32);
        let high = spec.prime_modulus() - BigUint::one();

        for _ in 0..MAX_KEYGEN_ATTEMPTS {
            let private = DhPrivateKey(rng.gen_biguint_range(&low, &high));
            let public = private.public_key(spec);
            if public.validate_for(spec).is_ok() {
                tracing::debug!(
                    parameters_id = spec.id(),
                    bits = spec.prime_modulus().bits(),
                    "generated ephemeral key pair"
                );
                return Ok(Self { public, private });
            }
        }

        tracing::warn!(
            parameters_id = spec.id(),
            attempts = MAX_KEYGEN_ATTEMPTS,
            "no usable public value"
        );
        Err(KeyxError::Config(format!(
            "parameters {}: no usable key pair after {MAX_KEYGEN_ATTEMPTS} draws",
            spec.id()
        )))
    }

    /// Public half
    pub fn public_key(&self) -> &DhPublicKey {
        &self.public
    }

    /// Private half
    pub fn private_key(&self) -> &DhPrivateKey {
        &self.private
    }

    /// Split into `(public, private)`
    pub fn into_parts(self) -> (DhPublicKey, DhPrivateKey) {
        (self.public, self.private)
    }
}

impl fmt::Debug for DhKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DhKeyPair")
            .field("public", &self.public)
            .field("private", &"[REDACTED]")
            .finish()
    }
}

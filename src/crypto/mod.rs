//! Symmetric cryptography for negotiated sessions.
//!
//! This module turns the raw output of a key agreement into something usable
//! for protecting messages:
//!
//! - **HKDF key derivation**: expand a shared secret into per-purpose keys
//! - **ChaCha20-Poly1305 AEAD**: confidentiality + integrity for payloads
//! - **HMAC-SHA256**: deterministic message signatures
//!
//! # Crypto Contexts
//!
//! ```text
//! shared_secret = DH(sk_a, pk_b) = DH(sk_b, pk_a)
//! context       = SessionCryptoContext::from_shared_secret(shared_secret)
//! ```
//!
//! The [`CryptoContext`] trait is the seam the key exchange factories return
//! through, so other schemes can plug in their own context types.
//!
//! # Wire Format
//!
//! ```text
//! encrypt: <nonce:12><ciphertext><auth_tag:16>
//! sign:    <hmac_tag:32>
//! ```

mod aead;
mod context;
mod error;
mod hmac_auth;
mod key;

pub use aead::{AeadCipher, AeadError};
pub use context::{CryptoContext, SessionCryptoContext, ENCRYPTION_KEY_INFO, HMAC_KEY_INFO};
pub use error::CryptoError;
pub use hmac_auth::{HmacAuth, HmacError};
pub use key::{KeyError, KeyMaterial};

/// Nonce size for ChaCha20-Poly1305 (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size for ChaCha20-Poly1305 (128 bits)
pub const AEAD_TAG_SIZE: usize = 16;

/// ChaCha20-Poly1305 key size (256 bits)
pub const AEAD_KEY_SIZE: usize = 32;

/// HMAC-SHA256 tag size (256 bits)
pub const HMAC_TAG_SIZE: usize = 32;

/// Derived HMAC key size (256 bits)
pub const HMAC_KEY_SIZE: usize = 32;

/// Smallest HMAC key accepted (128 bits)
pub const MIN_HMAC_KEY_SIZE: usize = 16;

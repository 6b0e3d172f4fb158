//! # keyx - Diffie-Hellman key exchange for message-security sessions
//!
//! An initiator and a responder agree on symmetric session keys over an
//! untrusted channel. The responder also issues (or renews) the master token
//! that identifies the session for later messages.
//!
//! ## Protocol Overview
//!
//! ```text
//! Initiator                                   Responder
//!    |---- KeyRequestData {scheme, keydata} ---->|
//!    |                                           | generate_response()
//!    |<--- KeyResponseData {scheme, keydata} ----|   -> CryptoContext
//!    | get_crypto_context()                      |
//!    |   -> CryptoContext                        |
//!    |                                           |
//!    |====== encrypt / sign with shared keys ====|
//! ```
//!
//! Both contexts are derived from the same Diffie-Hellman shared secret, so
//! a signature computed on one side is byte-identical to the other's and
//! either side can decrypt what the other encrypts.
//!
//! ## Session Keys
//!
//! | Key              | Derivation                                      | Use                |
//! |------------------|-------------------------------------------------|--------------------|
//! | Encryption (32B) | HKDF-SHA256(zz, `keyx/v1/session/encryption`)   | ChaCha20-Poly1305  |
//! | HMAC (32B)       | HKDF-SHA256(zz, `keyx/v1/session/hmac`)         | HMAC-SHA256        |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keyx::exchange::dh::{DiffieHellmanExchange, ParameterRegistry};
//! use keyx::exchange::{Credential, KeyExchangeFactory, KeyRequestData};
//! use keyx::token::LocalTokenIssuer;
//!
//! let factory = DiffieHellmanExchange::new(ParameterRegistry::with_defaults()?);
//! let tokens = LocalTokenIssuer::generate()?;
//!
//! // Initiator
//! let request: KeyRequestData = factory.request("modp2048", &mut rand::rngs::OsRng)?.into();
//!
//! // Responder
//! let exchange = factory.generate_response(&tokens, &request, Credential::Identity("ESN123"))?;
//!
//! // Initiator
//! let ctx = factory.get_crypto_context(&request, &exchange.key_response_data, None)?;
//! let ct = exchange.crypto_context.encrypt(b"hello")?;
//! assert_eq!(ctx.decrypt(&ct)?, b"hello");
//! ```
//!
//! ## Modules
//!
//! - [`exchange`]: Scheme envelope, factory trait, and the Diffie-Hellman scheme
//! - [`crypto`]: Session crypto context and its primitives
//! - [`token`]: Master tokens and the token service seam
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod config;
pub mod crypto;
pub mod error;
pub mod exchange;
pub mod token;

// Re-exports for convenience
pub use config::Config;
pub use crypto::{CryptoContext, SessionCryptoContext};
pub use error::{KeyxError, Result};
pub use exchange::dh::{DiffieHellmanExchange, ParameterRegistry, ParameterSpec};
pub use exchange::{
    Credential, KeyExchangeData, KeyExchangeFactory, KeyExchangeScheme, KeyRequestData,
    KeyResponseData,
};
pub use token::{LocalTokenIssuer, MasterToken, MasterTokenError, MasterTokenService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Diffie-Hellman key exchange scheme.
//!
//! ```text
//! Initiator                                   Responder
//!    | (x_a, y_a) = generate(params)              |
//!    |---- {parametersid, publickey: y_a} ------->|
//!    |                                            | (x_b, y_b) = generate(params)
//!    |                                            | zz  = y_a^x_b mod p
//!    |                                            | ctx = derive(zz)
//!    |                                            | mt  = issue(identity) | renew(mt)
//!    |<--- {mastertoken, parametersid, y_b} ------|
//!    | zz  = y_b^x_a mod p                        |
//!    | ctx = derive(zz)                           |
//! ```
//!
//! The initiator must keep its [`RequestData`] (with the private key) until
//! the response arrives; a request parsed back from the wire cannot derive
//! the context.

mod factory;
mod keys;
mod params;
mod request;
mod response;

pub use factory::DiffieHellmanExchange;
pub use keys::{DhKeyPair, DhPrivateKey, DhPublicKey, MAX_KEYGEN_ATTEMPTS};
pub use params::{ParameterRegistry, ParameterSpec, MODP_2048_ID};
pub use request::RequestData;
pub use response::ResponseData;

use serde_json::{Map, Value};

use crate::error::{KeyxError, Result};

/// JSON key for the parameters ID
pub const KEY_PARAMETERS_ID: &str = "parametersid";
/// JSON key for the public value
pub const KEY_PUBLIC_KEY: &str = "publickey";
/// JSON key for the embedded master token (response only)
pub const KEY_MASTER_TOKEN: &str = "mastertoken";

/// Fetch a required string field from key data.
fn required_str<'a>(keydata: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    match keydata.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(KeyxError::Encoding(format!("{key} is not a string"))),
        None => Err(KeyxError::Encoding(format!("missing {key}"))),
    }
}

/// Simple hex encoder
fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
            let _ = write!(s, "{:02x}", b);
            s
        })
}

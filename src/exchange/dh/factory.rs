//! Diffie-Hellman key exchange factory.

use std::sync::Arc;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use super::keys::DhKeyPair;
use super::params::ParameterRegistry;
use super::request::RequestData;
use super::response::ResponseData;
use crate::crypto::{CryptoContext, SessionCryptoContext};
use crate::error::{KeyxError, Result};
use crate::exchange::{
    Credential, KeyExchangeData, KeyExchangeFactory, KeyExchangeScheme, KeyRequestData,
    KeyResponseData,
};
use crate::token::{MasterToken, MasterTokenService};

/// Diffie-Hellman key exchange over a fixed parameter registry.
///
/// Holds nothing but the registry, so one instance can serve any number of
/// concurrent exchanges.
#[derive(Debug, Clone)]
pub struct DiffieHellmanExchange {
    registry: ParameterRegistry,
}

impl DiffieHellmanExchange {
    /// Create a factory over `registry`
    pub fn new(registry: ParameterRegistry) -> Self {
        Self { registry }
    }

    /// Parameter registry
    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    /// Initiator side: build request data with a fresh ephemeral key pair.
    ///
    /// The returned value holds the private key and must be kept until the
    /// response arrives.
    pub fn request<R: RngCore + CryptoRng>(
        &self,
        parameters_id: &str,
        rng: &mut R,
    ) -> Result<RequestData> {
        let spec = self.registry.lookup(parameters_id)?;
        RequestData::generate(spec, rng)
    }

    /// [`KeyExchangeFactory::generate_response`] with an explicit RNG.
    pub fn generate_response_with_rng<R: RngCore + CryptoRng>(
        &self,
        tokens: &dyn MasterTokenService,
        request: &KeyRequestData,
        credential: Credential<'_>,
        rng: &mut R,
    ) -> Result<KeyExchangeData> {
        let request = dh_request(request)?;
        let spec = self.registry.lookup(request.parameters_id())?;

        if let Credential::MasterToken(token) = credential {
            if !tokens.is_trusted(token) {
                tracing::warn!(
                    serial_number = token.serial_number(),
                    "refusing to renew untrusted master token"
                );
                return Err(KeyxError::MasterTokenUntrusted {
                    serial_number: token.serial_number(),
                });
            }
        }

        let (public, private) = DhKeyPair::generate(spec, rng)?.into_parts();
        let shared_secret = private.agree(request.public_key(), spec)?;
        let crypto_context: Arc<dyn CryptoContext> =
            Arc::new(SessionCryptoContext::from_shared_secret(&shared_secret)?);

        let master_token = match credential {
            Credential::Identity(identity) => tokens.issue(identity, 1)?,
            Credential::MasterToken(token) => tokens.renew(token)?,
        };

        tracing::debug!(
            parameters_id = request.parameters_id(),
            serial_number = master_token.serial_number(),
            sequence_number = master_token.sequence_number(),
            "generated key response"
        );

        Ok(KeyExchangeData {
            crypto_context,
            key_response_data: KeyResponseData::DiffieHellman(ResponseData::new(
                master_token,
                request.parameters_id(),
                public,
            )),
        })
    }
}

fn dh_request(request: &KeyRequestData) -> Result<&RequestData> {
    match request {
        KeyRequestData::DiffieHellman(data) => Ok(data),
        other => Err(KeyxError::InternalContract(format!(
            "{} key request passed to {} factory",
            other.scheme(),
            KeyExchangeScheme::DiffieHellman
        ))),
    }
}

fn dh_response(response: &KeyResponseData) -> Result<&ResponseData> {
    match response {
        KeyResponseData::DiffieHellman(data) => Ok(data),
        other => Err(KeyxError::InternalContract(format!(
            "{} key response passed to {} factory",
            other.scheme(),
            KeyExchangeScheme::DiffieHellman
        ))),
    }
}

impl KeyExchangeFactory for DiffieHellmanExchange {
    fn scheme(&self) -> KeyExchangeScheme {
        KeyExchangeScheme::DiffieHellman
    }

    fn generate_response(
        &self,
        tokens: &dyn MasterTokenService,
        request: &KeyRequestData,
        credential: Credential<'_>,
    ) -> Result<KeyExchangeData> {
        self.generate_response_with_rng(tokens, request, credential, &mut OsRng)
    }

    fn get_crypto_context(
        &self,
        request: &KeyRequestData,
        response: &KeyResponseData,
        _master_token: Option<&MasterToken>,
    ) -> Result<Arc<dyn CryptoContext>> {
        let request = dh_request(request)?;
        let response = dh_response(response)?;

        if request.parameters_id() != response.parameters_id() {
            return Err(KeyxError::ResponseRequestMismatch {
                request: request.parameters_id().to_string(),
                response: response.parameters_id().to_string(),
            });
        }
        let private = request.private_key().ok_or(KeyxError::PrivateKeyMissing)?;
        let spec = self.registry.lookup(request.parameters_id())?;

        let shared_secret = private.agree(response.public_key(), spec)?;
        Ok(Arc::new(SessionCryptoContext::from_shared_secret(
            &shared_secret,
        )?))
    }
}

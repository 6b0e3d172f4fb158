//! Diffie-Hellman key request data.

use rand::{CryptoRng, RngCore};
use serde_json::{Map, Value};

use super::keys::{DhKeyPair, DhPrivateKey, DhPublicKey};
use super::params::ParameterSpec;
use super::{hex_encode, required_str, KEY_PARAMETERS_ID, KEY_PUBLIC_KEY};
use crate::error::Result;

/// Initiator's half of a Diffie-Hellman exchange.
///
/// The private key only exists on the object that started the exchange. It
/// is never serialized, so a value parsed from the wire always has
/// `private_key() == None` and compares unequal to the original.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestData {
    parameters_id: String,
    public_key: DhPublicKey,
    private_key: Option<DhPrivateKey>,
}

impl RequestData {
    /// Create request data
    pub fn new(
        parameters_id: impl Into<String>,
        public_key: DhPublicKey,
        private_key: Option<DhPrivateKey>,
    ) -> Self {
        Self {
            parameters_id: parameters_id.into(),
            public_key,
            private_key,
        }
    }

    /// Generate a fresh ephemeral key pair under `spec` and wrap it.
    pub fn generate<R: RngCore + CryptoRng>(spec: &ParameterSpec, rng: &mut R) -> Result<Self> {
        let (public, private) = DhKeyPair::generate(spec, rng)?.into_parts();
        Ok(Self::new(spec.id(), public, Some(private)))
    }

    /// Parameters ID
    pub fn parameters_id(&self) -> &str {
        &self.parameters_id
    }

    /// Initiator public value
    pub fn public_key(&self) -> &DhPublicKey {
        &self.public_key
    }

    /// Initiator private exponent, present only on the originating side
    pub fn private_key(&self) -> Option<&DhPrivateKey> {
        self.private_key.as_ref()
    }

    /// Wire key data: `{parametersid, publickey}`
    pub fn keydata(&self) -> Map<String, Value> {
        let mut keydata = Map::new();
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

    /// Parse wire key data. The result never carries a private key.
    pub fn parse(keydata: &Map<String, Value>) -> Result<Self> {
        let parameters_id = required_str(keydata, KEY_PARAMETERS_ID)?;
        let public_key = required_str(keydata, KEY_PUBLIC_KEY)?;

        Ok(Self::new(
            parameters_id,
            DhPublicKey::from_base64(public_key)?,
            None,
        ))
    }

    /// Key that is equal for two values iff the values are equal.
    pub fn unique_key(&self) -> String {
        let private = self
            .private_key
            .as_ref()
            .map(|k| hex_encode(&k.fingerprint()))
            .unwrap_or_default();
        format!(
            "{}:{}:{}",
            self.parameters_id,
            self.public_key.to_base64(),
            private
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeyxError;
    use num_bigint::BigUint;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn spec() -> ParameterSpec {
        ParameterSpec::new("1", BigUint::from(23u32), BigUint::from(5u32)).unwrap()
    }

    fn pair(seed: u64) -> (DhPublicKey, DhPrivateKey) {
        DhKeyPair::generate(&spec(), &mut ChaCha20Rng::seed_from_u64(seed))
            .unwrap()
            .into_parts()
    }

    /// Two key pairs with distinct public and private values.
    fn two_pairs() -> ((DhPublicKey, DhPrivateKey), (DhPublicKey, DhPrivateKey)) {
        let a = pair(1);
        let mut seed = 2;
        loop {
            let b = pair(seed);
            if b.0 != a.0 && b.1 != a.1 {
                return (a, b);
            }
            seed += 1;
        }
    }

    #[test]
    fn test_parse_drops_private_key() {
        let (public, private) = pair(1);
        let req = RequestData::new("1", public, Some(private));

        let parsed = RequestData::parse(&req.keydata()).unwrap();
        assert_eq!(parsed.parameters_id(), req.parameters_id());
        assert_eq!(parsed.public_key(), req.public_key());
        assert!(parsed.private_key().is_none());
        assert_eq!(parsed.keydata(), req.keydata());
    }

    #[test]
    fn test_keydata_fields() {
        let req = RequestData::new("1", DhPublicKey::new(BigUint::from(0x80u32)), None);
        let keydata = req.keydata();
        assert_eq!(keydata[KEY_PARAMETERS_ID], "1");
        // 0x80 gains a leading zero byte: [0x00, 0x80]
        assert_eq!(keydata[KEY_PUBLIC_KEY], "AIA=");
    }

    #[test]
    fn test_missing_fields() {
        let (public, private) = pair(1);
        let req = RequestData::new("1", public, Some(private));

        for field in [KEY_PARAMETERS_ID, KEY_PUBLIC_KEY] {
            let mut keydata = req.keydata();
            keydata.remove(field);
            assert!(matches!(
                RequestData::parse(&keydata),
                Err(KeyxError::Encoding(_))
            ));
        }
    }

    #[test]
    fn test_invalid_public_key() {
        let (public, _) = pair(1);
        let mut keydata = RequestData::new("1", public, None).keydata();
        keydata.insert(KEY_PUBLIC_KEY.to_string(), Value::String("x".to_string()));
        assert!(matches!(
            RequestData::parse(&keydata),
            Err(KeyxError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_non_string_field_is_encoding_error() {
        let (public, _) = pair(1);
        let mut keydata = RequestData::new("1", public, None).keydata();
        keydata.insert(KEY_PARAMETERS_ID.to_string(), Value::from(1));
        assert!(matches!(
            RequestData::parse(&keydata),
            Err(KeyxError::Encoding(_))
        ));
    }

    #[test]
    fn test_equality_over_all_fields() {
        let ((pub_a, priv_a), (pub_b, priv_b)) = two_pairs();
        let data = RequestData::new("1", pub_a.clone(), Some(priv_a.clone()));

        let variants = [
            RequestData::new("1A", pub_a.clone(), Some(priv_a.clone())),
            RequestData::new("1", pub_b, Some(priv_a.clone())),
            RequestData::new("1", pub_a.clone(), Some(priv_b)),
            RequestData::parse(&data.keydata()).unwrap(),
        ];

        assert_eq!(data, data.clone());
        assert_eq!(data.unique_key(), data.clone().unique_key());
        for other in &variants {
            assert_ne!(&data, other);
            assert_ne!(other, &data);
            assert_ne!(data.unique_key(), other.unique_key());
        }
    }

    #[test]
    fn test_generate_retains_private_key() {
        let spec = spec();
        let req = RequestData::generate(&spec, &mut ChaCha20Rng::seed_from_u64(9)).unwrap();
        assert_eq!(req.parameters_id(), "1");
        let private = req.private_key().unwrap();
        assert_eq!(&private.public_key(&spec), req.public_key());
    }
}

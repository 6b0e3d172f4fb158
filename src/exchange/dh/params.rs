//! Diffie-Hellman parameter registry.
//!
//! Maps a parameters ID to a `(prime modulus, generator)` pair. The registry
//! is built once, handed to the factory, and never mutated afterwards, so
//! lookups need no locking.

use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::error::{KeyxError, Result};

/// Miller-Rabin witnesses. Deterministic below 3.3e24; a strong
/// probable-prime test above that.
const PRIMALITY_BASES: [u32; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Parameters ID of the built-in RFC 3526 2048-bit MODP group
pub const MODP_2048_ID: &str = "modp2048";

/// RFC 3526 §3, 2048-bit MODP group prime (generator 2)
const MODP_2048_PRIME_HEX: &[u8] = b"\
    FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
    29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
    EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
    E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
    EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D\
    C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F\
    83655D23DCA3AD961C62F356208552BB9ED529077096966D\
    670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
    E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9\
    DE2BCBF6955817183995497CEA956AE515D2261898FA0510\
    15728E5A8AACAA68FFFFFFFFFFFFFFFF";

lazy_static::lazy_static! {
    /// Parsed RFC 3526 2048-bit prime; zero only if the literal is corrupt,
    /// which `ParameterSpec::new` then rejects.
    static ref MODP_2048_PRIME: BigUint =
        BigUint::parse_bytes(MODP_2048_PRIME_HEX, 16).unwrap_or_default();
}

/// A registered `(prime modulus, generator)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    id: String,
    prime_modulus: BigUint,
    generator: BigUint,
}

impl ParameterSpec {
    /// Create a parameter spec.
    ///
    /// Requires a non-empty ID, a prime modulus of at least 5, and a generator
    /// strictly between 1 and `p - 1`.
    pub fn new(
        id: impl Into<String>,
        prime_modulus: BigUint,
        generator: BigUint,
    ) -> Result<Self> {
        let spec = Self::checked_ranges(id.into(), prime_modulus, generator)?;
        if !is_probable_prime(&spec.prime_modulus) {
            return Err(KeyxError::Config(format!(
                "parameters {}: modulus is not prime",
                spec.id
            )));
        }
        Ok(spec)
    }

    fn checked_ranges(id: String, prime_modulus: BigUint, generator: BigUint) -> Result<Self> {
        if id.is_empty() {
            return Err(KeyxError::Config("parameters ID cannot be empty".to_string()));
        }
        if prime_modulus < BigUint::from(5u32) || !prime_modulus.bit(0) {
            return Err(KeyxError::Config(format!(
                "parameters {id}: modulus must be an odd prime of at least 5"
            )));
        }
        let p_minus_one = &prime_modulus - BigUint::one();
        if generator <= BigUint::one() || generator >= p_minus_one {
            return Err(KeyxError::Config(format!(
                "parameters {id}: generator must lie in (1, p-1)"
            )));
        }

        Ok(Self {
            id,
            prime_modulus,
            generator,
        })
    }

    /// No validation. Lets tests build groups `new` refuses.
    #[cfg(test)]
    pub(crate) fn unchecked(id: &str, prime_modulus: u32, generator: u32) -> Self {
        Self {
            id: id.to_string(),
            prime_modulus: BigUint::from(prime_modulus),
            generator: BigUint::from(generator),
        }
    }

    /// Parse a spec from a hexadecimal prime and a decimal generator.
    pub fn from_hex(id: impl Into<String>, prime_hex: &str, generator: u64) -> Result<Self> {
        let id = id.into();
        let cleaned: String = prime_hex
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let cleaned = cleaned
            .strip_prefix("0x")
            .or_else(|| cleaned.strip_prefix("0X"))
            .unwrap_or(&cleaned);
        let prime = BigUint::parse_bytes(cleaned.as_bytes(), 16).ok_or_else(|| {
            KeyxError::Config(format!("parameters {id}: prime is not valid hex"))
        })?;
        Self::new(id, prime, BigUint::from(generator))
    }

    /// The RFC 3526 2048-bit MODP group, registered as [`MODP_2048_ID`]
    ///
    /// The published prime is not re-tested for primality.
    pub fn modp_2048() -> Result<Self> {
        Self::checked_ranges(
            MODP_2048_ID.to_string(),
            MODP_2048_PRIME.clone(),
            BigUint::from(2u32),
        )
    }

    /// Parameters ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Prime modulus `p`
    pub fn prime_modulus(&self) -> &BigUint {
        &self.prime_modulus
    }

    /// Generator `g`
    pub fn generator(&self) -> &BigUint {
        &self.generator
    }

    /// Byte length of the modulus; shared secrets are padded to this length.
    pub fn modulus_len(&self) -> usize {
        ((self.prime_modulus.bits() + 7) / 8) as usize
    }
}

/// Miller-Rabin over [`PRIMALITY_BASES`], after trial division by the same
/// small primes.
fn is_probable_prime(n: &BigUint) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    if *n < two {
        return false;
    }
    for base in PRIMALITY_BASES {
        let base = BigUint::from(base);
        if *n == base {
            return true;
        }
        if (n % &base).is_zero() {
            return false;
        }
    }

    // n - 1 = d * 2^s with d odd
    let n_minus_one = n - &one;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for base in PRIMALITY_BASES {
        let mut x = BigUint::from(base).modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Immutable map from parameters ID to [`ParameterSpec`]
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    specs: HashMap<String, ParameterSpec>,
}

impl ParameterRegistry {
    /// Build a registry. Duplicate IDs are a configuration error.
    pub fn new(specs: impl IntoIterator<Item = ParameterSpec>) -> Result<Self> {
        let mut map = HashMap::new();
        for spec in specs {
            let id = spec.id.clone();
            if map.insert(id.clone(), spec).is_some() {
                return Err(KeyxError::Config(format!(
                    "duplicate parameters ID: {id}"
                )));
            }
        }
        Ok(Self { specs: map })
    }

    /// Registry holding only the built-in RFC 3526 2048-bit group
    pub fn with_defaults() -> Result<Self> {
        Self::new([ParameterSpec::modp_2048()?])
    }

    /// Look up a parameters ID.
    ///
    /// Malformed and unregistered IDs both fail with
    /// [`KeyxError::UnknownParameters`].
    pub fn lookup(&self, id: &str) -> Result<&ParameterSpec> {
        self.specs
            .get(id)
            .ok_or_else(|| KeyxError::UnknownParameters(id.to_string()))
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: &str) -> bool {
        self.specs.contains_key(id)
    }

    /// Registered IDs, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.specs.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered specs
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> ParameterSpec {
        ParameterSpec::new("1", BigUint::from(23u32), BigUint::from(5u32)).unwrap()
    }

    #[test]
    fn test_lookup_registered() {
        let registry = ParameterRegistry::new([small()]).unwrap();
        let spec = registry.lookup("1").unwrap();
        assert_eq!(spec.prime_modulus(), &BigUint::from(23u32));
        assert_eq!(spec.generator(), &BigUint::from(5u32));
        assert_eq!(spec.modulus_len(), 1);
    }

    #[test]
    fn test_lookup_unknown_and_malformed_merge() {
        let registry = ParameterRegistry::new([small()]).unwrap();
        for id in ["98765", "x", ""] {
            assert!(matches!(
                registry.lookup(id),
                Err(KeyxError::UnknownParameters(ref got)) if got == id
            ));
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = ParameterRegistry::new([small(), small()]);
        assert!(matches!(result, Err(KeyxError::Config(_))));
    }

    #[test]
    fn test_spec_validation() {
        let bad_modulus = ParameterSpec::new("e", BigUint::from(22u32), BigUint::from(5u32));
        assert!(bad_modulus.is_err());
        let tiny = ParameterSpec::new("t", BigUint::from(3u32), BigUint::from(2u32));
        assert!(tiny.is_err());
        let bad_generator = ParameterSpec::new("g", BigUint::from(23u32), BigUint::from(22u32));
        assert!(bad_generator.is_err());
        let empty_id = ParameterSpec::new("", BigUint::from(23u32), BigUint::from(5u32));
        assert!(empty_id.is_err());
    }

    #[test]
    fn test_composite_modulus_rejected() {
        let result = ParameterSpec::new("c", BigUint::from(9u32), BigUint::from(3u32));
        assert!(matches!(result, Err(KeyxError::Config(ref msg)) if msg.contains("not prime")));

        // 561 is a Carmichael number; 65_537 * 65_539 has no small factor
        for composite in [15u64, 561, 4_295_229_443] {
            assert!(!is_probable_prime(&BigUint::from(composite)), "{composite}");
        }
    }

    #[test]
    fn test_primes_accepted() {
        for prime in [5u64, 23, 37, 41, 65_537, 4_294_967_291] {
            assert!(is_probable_prime(&BigUint::from(prime)), "{prime}");
        }
        assert!(ParameterSpec::from_hex("p", "0x10001", 3).is_ok());
        assert!(is_probable_prime(&MODP_2048_PRIME));
    }

    #[test]
    fn test_from_hex() {
        let spec = ParameterSpec::from_hex("h", "0x17", 5).unwrap();
        assert_eq!(spec, ParameterSpec::new("h", BigUint::from(23u32), BigUint::from(5u32)).unwrap());
        assert!(ParameterSpec::from_hex("h", "zz", 5).is_err());
    }

    #[test]
    fn test_modp_2048_group() {
        let spec = ParameterSpec::modp_2048().unwrap();
        assert_eq!(spec.prime_modulus().bits(), 2048);
        assert_eq!(spec.modulus_len(), 256);
        assert_eq!(spec.generator(), &BigUint::from(2u32));

        let registry = ParameterRegistry::with_defaults().unwrap();
        assert_eq!(registry.ids(), vec![MODP_2048_ID]);
    }
}

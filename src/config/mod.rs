//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (`KEYX_*`)
//!
//! ```toml
//! [keyx]
//! include_modp_2048 = true
//!
//! [[keyx.parameters]]
//! id = "1"
//! prime = "17"
//! generator = 5
//!
//! [tokens]
//! lifetime_secs = 86400
//! renewal_offset_secs = 43200
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::KeyMaterial;
use crate::error::{KeyxError, Result};
use crate::exchange::dh::{ParameterRegistry, ParameterSpec};
use crate::token::LocalTokenIssuer;

/// Environment variable overriding `logging.level`
pub const ENV_LOG_LEVEL: &str = "KEYX_LOG_LEVEL";
/// Environment variable overriding `logging.json`
pub const ENV_LOG_JSON: &str = "KEYX_LOG_JSON";
/// Environment variable overriding `tokens.lifetime_secs`
pub const ENV_TOKEN_LIFETIME_SECS: &str = "KEYX_TOKEN_LIFETIME_SECS";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Key exchange configuration
    #[serde(default)]
    pub keyx: KeyxConfig,

    /// Master token configuration
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            KeyxError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Load from `path`, or from [`Config::default_path`] if it exists, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(path)?,
                None => Self::default(),
            },
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Default config file location (`<config dir>/keyx/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("keyx").join("config.toml"))
    }

    /// Apply `KEYX_*` overrides read through `lookup`.
    ///
    /// Values that fail to parse are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(json) = lookup(ENV_LOG_JSON).and_then(|v| parse_bool(&v)) {
            self.logging.json = json;
        }
        if let Some(secs) = lookup(ENV_TOKEN_LIFETIME_SECS).and_then(|v| v.parse().ok()) {
            self.tokens.lifetime_secs = secs;
        }
        self
    }

    /// Build the parameter registry this config describes
    pub fn registry(&self) -> Result<ParameterRegistry> {
        let mut specs = Vec::with_capacity(self.keyx.parameters.len() + 1);
        if self.keyx.include_modp_2048 {
            specs.push(ParameterSpec::modp_2048()?);
        }
        for group in &self.keyx.parameters {
            specs.push(ParameterSpec::from_hex(
                group.id.as_str(),
                &group.prime,
                group.generator,
            )?);
        }
        ParameterRegistry::new(specs)
    }

    /// Build a token issuer from the token settings.
    ///
    /// Uses the configured signing key if present, otherwise a fresh random
    /// key (tokens then only verify within this process).
    pub fn token_issuer(&self) -> Result<LocalTokenIssuer> {
        let issuer = match &self.tokens.signing_key {
            Some(encoded) => {
                let key = STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| KeyxError::Config(format!("tokens.signing_key: {e}")))?;
                LocalTokenIssuer::new(KeyMaterial::new(key))?
            },
            None => LocalTokenIssuer::generate()?,
        };
        Ok(issuer.with_lifetime(
            Duration::from_secs(self.tokens.lifetime_secs),
            Duration::from_secs(self.tokens.renewal_offset_secs),
        ))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Key exchange configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyxConfig {
    /// Register the RFC 3526 2048-bit group as `modp2048`
    #[serde(default = "default_true")]
    pub include_modp_2048: bool,

    /// Additional Diffie-Hellman groups
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
}

impl Default for KeyxConfig {
    fn default() -> Self {
        Self {
            include_modp_2048: true,
            parameters: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A Diffie-Hellman group declared in config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterConfig {
    /// Parameters ID
    pub id: String,
    /// Prime modulus, hexadecimal
    pub prime: String,
    /// Generator
    pub generator: u64,
}

/// Master token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token lifetime in seconds
    pub lifetime_secs: u64,

    /// Seconds after issue when renewal becomes permitted
    pub renewal_offset_secs: u64,

    /// Base64 HMAC signing key; random per process if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: 24 * 60 * 60,
            renewal_offset_secs: 12 * 60 * 60,
            signing_key: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::dh::MODP_2048_ID;
    use crate::token::MasterTokenService;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.keyx.include_modp_2048);
        assert!(config.keyx.parameters.is_empty());
        assert_eq!(config.tokens.lifetime_secs, 86_400);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);

        let registry = config.registry().unwrap();
        assert_eq!(registry.ids(), vec![MODP_2048_ID]);
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            [keyx]
            include_modp_2048 = false

            [[keyx.parameters]]
            id = "1"
            prime = "17"
            generator = 5

            [logging]
            level = "debug"
            json = true
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.keyx.include_modp_2048);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.tokens.renewal_offset_secs, 43_200);

        let registry = config.registry().unwrap();
        assert_eq!(registry.ids(), vec!["1"]);
        let spec = registry.lookup("1").unwrap();
        assert_eq!(spec.prime_modulus(), &num_bigint::BigUint::from(23u32));
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[keyx.parameters]]\nid = \"small\"\nprime = \"0x17\"\ngenerator = 5"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        let registry = config.registry().unwrap();
        assert_eq!(registry.ids(), vec![MODP_2048_ID, "small"]);
    }

    #[test]
    fn test_invalid_files() {
        assert!(matches!(
            Config::from_file("/nonexistent/keyx.toml"),
            Err(KeyxError::Config(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[keyx\nbroken").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(KeyxError::Config(_))
        ));
    }

    #[test]
    fn test_bad_parameters_rejected() {
        let mut config = Config::default();
        config.keyx.parameters.push(ParameterConfig {
            id: "bad".to_string(),
            prime: "not hex".to_string(),
            generator: 2,
        });
        assert!(matches!(config.registry(), Err(KeyxError::Config(_))));

        config.keyx.parameters = vec![ParameterConfig {
            id: MODP_2048_ID.to_string(),
            prime: "17".to_string(),
            generator: 5,
        }];
        assert!(matches!(config.registry(), Err(KeyxError::Config(_))));
    }

    #[test]
    fn test_composite_modulus_rejected() {
        let toml = r#"
            [keyx]
            include_modp_2048 = false

            [[keyx.parameters]]
            id = "c"
            prime = "9"
            generator = 3
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert!(matches!(config.registry(), Err(KeyxError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_LOG_LEVEL, "trace"),
            (ENV_LOG_JSON, "yes"),
            (ENV_TOKEN_LIFETIME_SECS, "60"),
        ]
        .into_iter()
        .collect();

        let config =
            Config::default().with_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.logging.level, "trace");
        assert!(config.logging.json);
        assert_eq!(config.tokens.lifetime_secs, 60);
    }

    #[test]
    fn test_unparseable_override_ignored() {
        let config = Config::default().with_overrides(|key| match key {
            ENV_TOKEN_LIFETIME_SECS => Some("soon".to_string()),
            ENV_LOG_JSON => Some("maybe".to_string()),
            _ => None,
        });
        assert_eq!(config.tokens.lifetime_secs, 86_400);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_max_lifetime_override_issues() {
        let max = u64::MAX.to_string();
        let config = Config::default().with_overrides(|key| match key {
            ENV_TOKEN_LIFETIME_SECS => Some(max.clone()),
            _ => None,
        });
        assert_eq!(config.tokens.lifetime_secs, u64::MAX);

        let token = config.token_issuer().unwrap().issue("ESN123", 1).unwrap();
        assert_eq!(token.expiration(), u64::MAX);
        assert!(token.renewal_window() < token.expiration());
    }

    #[test]
    fn test_token_issuer_from_signing_key() {
        let mut config = Config::default();
        config.tokens.signing_key = Some(STANDARD.encode([0x55u8; 32]));

        let a = config.token_issuer().unwrap();
        let b = config.token_issuer().unwrap();
        let token = a.issue("ESN123", 1).unwrap();
        assert!(b.is_trusted(&token));

        config.tokens.signing_key = Some("%%%".to_string());
        assert!(matches!(config.token_issuer(), Err(KeyxError::Config(_))));
    }
}

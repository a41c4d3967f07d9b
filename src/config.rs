//! Negotiation configuration.
//!
//! [`SaslConfig`] gathers everything one side brings to an authentication
//! attempt: its QOP and strength preference lists, buffer size, policy flags
//! and the cipher order used for `auth-conf`. It can be built from the
//! string property map a SASL caller passes around, or (with the
//! `config-file` feature) from TOML.
//!
//! ```
//! use std::collections::HashMap;
//! use saslwrap::config::SaslConfig;
//!
//! let mut props = HashMap::new();
//! props.insert("sasl.qop".to_string(), "auth-conf,auth-int".to_string());
//! props.insert("sasl.maxbuffer".to_string(), "16384".to_string());
//!
//! let config = SaslConfig::from_properties(&props).unwrap();
//! assert_eq!(config.max_buffer, 16384);
//! ```

use crate::error::SaslResult;
use crate::negotiation::properties;
use crate::negotiation::record::DEFAULT_MAXBUF;
use crate::security::cipher::{CipherKind, CipherSelector};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Property key carrying the cipher order for `auth-conf`.
pub const DIGEST_CIPHER: &str = "sasl.digest.cipher";
/// Property key for the integrity-failure escalation threshold.
pub const MAX_INTEGRITY_FAILURES: &str = "sasl.digest.maxintegrityfailures";

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A property value could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Property key.
        key: String,
        /// Offending value.
        value: String,
    },
    /// The configuration is internally inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// TOML could not be parsed.
    #[error("toml parse error: {0}")]
    Toml(String),
}

/// Mechanism selection policy flags.
///
/// These are carried through to the negotiated-property surface; this crate
/// does not select mechanisms itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolicyFlags {
    /// Disallow mechanisms open to passive plaintext attacks.
    pub no_plaintext: bool,
    /// Disallow mechanisms open to active attacks.
    pub no_active: bool,
    /// Disallow mechanisms open to dictionary attacks.
    pub no_dictionary: bool,
    /// Disallow mechanisms accepting anonymous login.
    pub no_anonymous: bool,
    /// Require forward secrecy between sessions.
    pub forward_secrecy: bool,
    /// Require mechanisms that pass client credentials.
    pub pass_credentials: bool,
}

/// One side's negotiation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SaslConfig {
    /// QOP preference list; empty means `auth-conf,auth-int,auth`.
    pub qop: String,
    /// Strength preference list; empty means `high,medium,low`.
    pub strength: String,
    /// Maximum receive buffer size advertised to the peer.
    pub max_buffer: usize,
    /// Whether the server must authenticate to the client.
    pub server_auth: bool,
    /// Reuse hint.
    pub reuse: bool,
    /// Policy flags.
    pub policy: PolicyFlags,
    /// Skip unknown preference tokens instead of failing.
    pub ignore_unmatched: bool,
    /// Cipher names in preference order; empty means the default order.
    pub cipher_order: Vec<String>,
    /// Consecutive MAC failures tolerated before a session is torn down.
    pub max_integrity_failures: u32,
}

impl Default for SaslConfig {
    fn default() -> Self {
        Self {
            qop: String::new(),
            strength: String::new(),
            max_buffer: DEFAULT_MAXBUF,
            server_auth: false,
            reuse: false,
            policy: PolicyFlags::default(),
            ignore_unmatched: false,
            cipher_order: Vec::new(),
            max_integrity_failures: 3,
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.into(),
            value: value.into(),
        }),
    }
}

fn parse_number<T: core::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.into(),
        value: value.into(),
    })
}

impl SaslConfig {
    /// Builds a configuration from a SASL property map.
    ///
    /// Keys not listed in [`properties`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unparseable values or an inconsistent
    /// result.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (key, value) in props {
            match key.as_str() {
                properties::QOP => config.qop.clone_from(value),
                properties::STRENGTH => config.strength.clone_from(value),
                properties::MAX_BUFFER => config.max_buffer = parse_number(key, value)?,
                properties::SERVER_AUTH => config.server_auth = parse_flag(key, value)?,
                properties::REUSE => config.reuse = parse_flag(key, value)?,
                properties::POLICY_NO_PLAINTEXT => {
                    config.policy.no_plaintext = parse_flag(key, value)?;
                }
                properties::POLICY_NO_ACTIVE => config.policy.no_active = parse_flag(key, value)?,
                properties::POLICY_NO_DICTIONARY => {
                    config.policy.no_dictionary = parse_flag(key, value)?;
                }
                properties::POLICY_NO_ANONYMOUS => {
                    config.policy.no_anonymous = parse_flag(key, value)?;
                }
                properties::POLICY_FORWARD_SECRECY => {
                    config.policy.forward_secrecy = parse_flag(key, value)?;
                }
                properties::POLICY_PASS_CREDENTIALS => {
                    config.policy.pass_credentials = parse_flag(key, value)?;
                }
                DIGEST_CIPHER => {
                    config.cipher_order = value
                        .split(crate::negotiation::SEPARATORS)
                        .filter(|t| !t.is_empty())
                        .map(str::to_ascii_lowercase)
                        .collect();
                }
                MAX_INTEGRITY_FAILURES => {
                    config.max_integrity_failures = parse_number(key, value)?;
                }
                _ => {}
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] for syntax errors, or a validation
    /// error.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::Toml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero buffer or escalation
    /// threshold, or an unknown cipher name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_buffer == 0 {
            return Err(ConfigError::Invalid("max_buffer must be non-zero".into()));
        }
        if self.max_integrity_failures == 0 {
            return Err(ConfigError::Invalid(
                "max_integrity_failures must be at least 1".into(),
            ));
        }
        if let Some(bad) = self
            .cipher_order
            .iter()
            .find(|name| name.parse::<CipherKind>().is_err())
        {
            return Err(ConfigError::InvalidValue {
                key: DIGEST_CIPHER.into(),
                value: bad.clone(),
            });
        }
        Ok(())
    }

    /// Builds the cipher selector for this configuration.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCipher` for an unknown cipher name.
    pub fn cipher_selector(&self) -> SaslResult<CipherSelector> {
        if self.cipher_order.is_empty() {
            return Ok(CipherSelector::default());
        }
        let order = self
            .cipher_order
            .iter()
            .map(|name| name.parse::<CipherKind>())
            .collect::<SaslResult<Vec<_>>>()?;
        Ok(CipherSelector::with_order(order))
    }
}

//! Credential service configuration.

use std::path::PathBuf;
use std::time::Duration;

use quill_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Longest accepted session or refresh token lifetime (10 years).
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

/// Credential configuration.
///
/// Both key paths must be set together. When neither is set the service
/// generates an ephemeral key pair, which invalidates every session on
/// restart.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Issuer written into tokens that do not carry one.
    pub issuer: String,

    /// Lifetime of session tokens built with
    /// [`CredentialService::session_token_lifetime`](crate::CredentialService::session_token_lifetime).
    #[serde(with = "humantime_serde")]
    pub session_token_lifetime: Duration,

    /// Lifetime of a refresh token, renewed on every use.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// PKCS#8 PEM file with the Ed25519 private key.
    pub private_key_path: Option<PathBuf>,

    /// SPKI PEM file with the Ed25519 public key.
    pub public_key_path: Option<PathBuf>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            issuer: "quill".to_string(),
            session_token_lifetime: Duration::from_secs(3600), // 1 hour
            refresh_token_lifetime: Duration::from_secs(7 * 24 * 3600), // 7 days
            private_key_path: None,
            public_key_path: None,
        }
    }
}

impl CredentialConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the issuer is empty or a
    /// lifetime is shorter than one second or longer than
    /// [`MAX_TOKEN_LIFETIME`], and `ConfigError::Missing` if
    /// only one of the key paths is set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::invalid("issuer cannot be empty"));
        }
        check_lifetime("session_token_lifetime", self.session_token_lifetime)?;
        check_lifetime("refresh_token_lifetime", self.refresh_token_lifetime)?;
        match (&self.private_key_path, &self.public_key_path) {
            (Some(_), None) => Err(ConfigError::missing("public_key_path")),
            (None, Some(_)) => Err(ConfigError::missing("private_key_path")),
            _ => Ok(()),
        }
    }
}

fn check_lifetime(name: &str, lifetime: Duration) -> Result<(), ConfigError> {
    if lifetime < Duration::from_secs(1) {
        return Err(ConfigError::invalid(format!("{name} must be at least 1s")));
    }
    if lifetime > MAX_TOKEN_LIFETIME {
        return Err(ConfigError::invalid(format!(
            "{name} must be at most {}s",
            MAX_TOKEN_LIFETIME.as_secs()
        )));
    }
    Ok(())
}

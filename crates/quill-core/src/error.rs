//! Error classification shared by every Quill crate.
//!
//! Domain errors carry a stable numeric code, an HTTP-style status hint and a
//! "transparent" flag telling the outer layer whether the message may be shown
//! to an untrusted caller verbatim. Infrastructure errors are never
//! transparent.

use std::fmt;

/// Message returned by [`ClassifiedError::public_message`] for opaque errors.
pub const OPAQUE_MESSAGE: &str = "Internal server error";

/// Error code used by errors that have no dedicated code.
pub const CODE_UNCLASSIFIED: u32 = 0;

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A requested entry does not exist (or has expired).
    NotFound,
    /// Identity verification failed.
    Authentication,
    /// Caller-supplied data was rejected.
    Validation,
    /// A backend (database, cache, pool) failed.
    Infrastructure,
    /// Encoding, signing or other internal failures.
    Internal,
    /// Configuration values are missing or invalid.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Authentication => write!(f, "authentication"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// An error that knows how it should be reported outside the process.
pub trait ClassifiedError: std::error::Error {
    /// Stable machine-readable code.
    fn error_code(&self) -> u32;

    /// HTTP-style status hint.
    fn status(&self) -> u16;

    /// Returns `true` if the display message is safe to expose externally.
    fn is_transparent(&self) -> bool;

    /// Category for logging and metrics.
    fn category(&self) -> ErrorCategory;

    /// Message suitable for an untrusted caller.
    fn public_message(&self) -> String {
        if self.is_transparent() {
            self.to_string()
        } else {
            OPAQUE_MESSAGE.to_string()
        }
    }

    /// Returns `true` for 5xx-style errors.
    fn is_server_error(&self) -> bool {
        self.status() >= 500
    }
}

/// Errors raised while validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration text could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing(field.into())
    }
}

impl ClassifiedError for ConfigError {
    fn error_code(&self) -> u32 {
        CODE_UNCLASSIFIED
    }

    fn status(&self) -> u16 {
        500
    }

    fn is_transparent(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

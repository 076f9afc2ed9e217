//! Error types for credential operations.

use quill_core::error::{ClassifiedError, ConfigError, ErrorCategory};
use quill_kv::KvError;

/// Result type for credential operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while issuing or checking credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The session token is correctly signed but past its expiry.
    #[error("Authentication token expired")]
    TokenExpired,

    /// The session token is malformed, forged or uses another algorithm.
    #[error("Authentication token invalid")]
    TokenInvalid,

    /// The refresh token is malformed, unknown or superseded.
    #[error("Refresh token invalid")]
    InvalidRefreshToken,

    /// Claims handed to the encoder are inconsistent.
    #[error("Invalid claims: {0}")]
    InvalidClaims(String),

    /// Signing a token failed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Key material could not be loaded or encoded.
    #[error("Invalid key: {0}")]
    Key(String),

    /// The credential configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The key-value store failed.
    #[error(transparent)]
    Storage(#[from] KvError),
}

impl AuthError {
    /// Create an `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims(message.into())
    }

    /// Create a `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing(message.into())
    }

    /// Create a `Key` error.
    #[must_use]
    pub fn key(message: impl Into<String>) -> Self {
        Self::Key(message.into())
    }

    /// Returns `true` if the caller presented an unusable credential.
    #[must_use]
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            Self::TokenExpired | Self::TokenInvalid | Self::InvalidRefreshToken
        )
    }

    /// Returns `true` if this is a storage error.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl ClassifiedError for AuthError {
    fn error_code(&self) -> u32 {
        match self {
            Self::TokenExpired => 2001,
            Self::TokenInvalid => 2002,
            Self::InvalidRefreshToken => 2003,
            Self::InvalidClaims(_) => 2004,
            Self::Signing(_) => 2005,
            Self::Key(_) => 2006,
            Self::Config(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
        }
    }

    fn status(&self) -> u16 {
        match self {
            Self::TokenExpired | Self::TokenInvalid | Self::InvalidRefreshToken => 401,
            Self::InvalidClaims(_) | Self::Signing(_) | Self::Key(_) => 500,
            Self::Config(e) => e.status(),
            Self::Storage(e) => e.status(),
        }
    }

    fn is_transparent(&self) -> bool {
        match self {
            Self::TokenExpired | Self::TokenInvalid | Self::InvalidRefreshToken => true,
            Self::InvalidClaims(_) | Self::Signing(_) | Self::Key(_) => false,
            Self::Config(e) => e.is_transparent(),
            Self::Storage(e) => e.is_transparent(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::TokenExpired | Self::TokenInvalid | Self::InvalidRefreshToken => {
                ErrorCategory::Authentication
            }
            Self::InvalidClaims(_) | Self::Signing(_) | Self::Key(_) => ErrorCategory::Internal,
            Self::Config(e) => e.category(),
            Self::Storage(e) => e.category(),
        }
    }
}

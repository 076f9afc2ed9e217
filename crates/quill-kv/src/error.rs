//! Error types for key-value storage.

use quill_core::error::{CODE_UNCLASSIFIED, ClassifiedError, ConfigError, ErrorCategory};
use quill_core::queries::QueryError;

/// Result type for key-value operations.
pub type KvResult<T> = std::result::Result<T, KvError>;

/// Errors that can occur during key-value operations.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// The key does not exist or its entry has expired.
    #[error("Key not found: {key}")]
    NotFound { key: String },

    /// A TTL below one millisecond was supplied.
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),

    /// The value could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend could not be reached or the pool is exhausted.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The backend rejected or failed a command.
    #[error("Backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A named query is not registered.
    #[error("Query error: {0}")]
    Query(String),

    /// The store configuration was rejected before connecting.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl KvError {
    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an `InvalidTtl` error.
    #[must_use]
    pub fn invalid_ttl(message: impl Into<String>) -> Self {
        Self::InvalidTtl(message.into())
    }

    /// Create a `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a `Backend` error from any backend failure.
    #[must_use]
    pub fn backend(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(error))
    }

    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an `InvalidTtl` error.
    #[must_use]
    pub fn is_invalid_ttl(&self) -> bool {
        matches!(self, Self::InvalidTtl(_))
    }

    /// Returns `true` if the configuration was rejected.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns `true` if the backend could not be reached.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl ClassifiedError for KvError {
    fn error_code(&self) -> u32 {
        match self {
            Self::NotFound { .. } => 5001,
            Self::InvalidTtl(_) => 5002,
            Self::Serialization(_) => 5003,
            Self::Connection(_) | Self::Backend(_) | Self::Query(_) => CODE_UNCLASSIFIED,
            Self::Config(e) => e.error_code(),
        }
    }

    fn status(&self) -> u16 {
        500
    }

    fn is_transparent(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidTtl(_) => ErrorCategory::Validation,
            Self::Serialization(_) => ErrorCategory::Internal,
            Self::Connection(_) | Self::Backend(_) | Self::Query(_) => {
                ErrorCategory::Infrastructure
            }
            Self::Config(e) => e.category(),
        }
    }
}

impl From<sqlx_core::Error> for KvError {
    fn from(e: sqlx_core::Error) -> Self {
        match e {
            sqlx_core::Error::PoolTimedOut
            | sqlx_core::Error::PoolClosed
            | sqlx_core::Error::Io(_)
            | sqlx_core::Error::Tls(_) => Self::Connection(e.to_string()),
            other => Self::Backend(Box::new(other)),
        }
    }
}

impl From<QueryError<sqlx_core::Error>> for KvError {
    fn from(e: QueryError<sqlx_core::Error>) -> Self {
        match e {
            QueryError::Unknown { name } => Self::Query(format!("unknown query {name}")),
            QueryError::Prepare { source, .. } => Self::from(source),
        }
    }
}

impl From<deadpool_redis::PoolError> for KvError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        Self::Connection(e.to_string())
    }
}

impl From<deadpool_redis::CreatePoolError> for KvError {
    fn from(e: deadpool_redis::CreatePoolError) -> Self {
        Self::Connection(e.to_string())
    }
}

impl From<redis::RedisError> for KvError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_refusal() || e.is_timeout() {
            Self::Connection(e.to_string())
        } else {
            Self::Backend(Box::new(e))
        }
    }
}

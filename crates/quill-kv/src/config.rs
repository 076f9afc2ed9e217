//! Backend selection and pool settings for the key-value store.

use quill_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Key-value store configuration.
///
/// Redis is used when `redis.enabled` is set; otherwise the SQL backend is
/// opened from `sql.url`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KvConfig {
    #[serde(default)]
    pub redis: RedisConfig,

    #[serde(default)]
    pub sql: SqlConfig,
}

impl KvConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.redis.enabled {
            self.redis.validate()
        } else {
            self.sql.validate()
        }
    }
}

/// Redis backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Use Redis instead of the SQL backend.
    /// Default: false
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_pool_size(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RedisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::missing("redis.url"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ConfigError::invalid(format!(
                "redis.url must use the redis:// or rediss:// scheme, got '{}'",
                self.url
            )));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::invalid("redis.pool_size must be > 0"));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::invalid("redis.timeout_ms must be > 0"));
        }
        Ok(())
    }
}

/// SQL backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlConfig {
    /// Database URL. `sqlite:` URLs open SQLite, anything else PostgreSQL.
    #[serde(default = "default_sql_url")]
    pub url: String,

    /// Maximum number of pooled connections
    #[serde(default = "default_pool_size_u32")]
    pub pool_size: u32,

    /// Pool acquire timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Create the `keyvalue` table on connect if it is missing
    #[serde(default = "default_create_schema")]
    pub create_schema: bool,
}

fn default_sql_url() -> String {
    "sqlite://quill.db?mode=rwc".to_string()
}

fn default_pool_size_u32() -> u32 {
    10
}

fn default_create_schema() -> bool {
    true
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            url: default_sql_url(),
            pool_size: default_pool_size_u32(),
            connect_timeout_ms: default_timeout_ms(),
            create_schema: default_create_schema(),
        }
    }
}

impl SqlConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::missing("sql.url"));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::invalid("sql.pool_size must be > 0"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::invalid("sql.connect_timeout_ms must be > 0"));
        }
        Ok(())
    }

    /// Returns `true` if `url` selects the SQLite dialect.
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }
}

/// Masks the password in a connection URL for logging.
pub(crate) fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.find('@')
        && let Some(colon_pos) = url[..at_pos].rfind(':')
    {
        let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
        if colon_pos >= scheme_end {
            return format!("{}:****{}", &url[..colon_pos], &url[at_pos..]);
        }
    }
    url.to_string()
}

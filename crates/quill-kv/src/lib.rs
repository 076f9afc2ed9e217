//! TTL-aware key-value storage with SQL and Redis backends.
//!
//! Callers hold an `Arc<dyn KeyValueStore>` built by [`connect`] and never
//! see which backend is behind it.
//!
//! ```ignore
//! let kv = quill_kv::connect(&KvConfig::default()).await?;
//! kv.set_ex("greeting", "hello", Duration::from_secs(60)).await?;
//! assert_eq!(kv.get("greeting").await?, "hello");
//! ```

pub mod config;
pub mod error;
pub mod redis;
pub mod sql;
pub mod store;

use std::sync::Arc;

use tracing::info;

pub use config::{KvConfig, RedisConfig, SqlConfig};
pub use error::{KvError, KvResult};
pub use self::redis::RedisKvStore;
pub use sql::{PgKvStore, SqlKvStore, SqliteKvStore};
pub use store::{KeyValueStore, KeyValueStoreExt};

/// Validates `config` and opens the backend it selects.
///
/// Redis wins when enabled. Otherwise the SQL URL scheme picks SQLite
/// (`sqlite:`) or PostgreSQL, and the table is created when
/// `sql.create_schema` is set.
pub async fn connect(config: &KvConfig) -> KvResult<Arc<dyn KeyValueStore>> {
    config.validate()?;

    if config.redis.enabled {
        let store = RedisKvStore::connect(&config.redis).await?;
        return Ok(Arc::new(store));
    }

    let store: Arc<dyn KeyValueStore> = if config.sql.is_sqlite() {
        let store = SqliteKvStore::connect(&config.sql).await?;
        if config.sql.create_schema {
            store.create_schema().await?;
        }
        Arc::new(store)
    } else {
        let store = PgKvStore::connect(&config.sql).await?;
        if config.sql.create_schema {
            store.create_schema().await?;
        }
        Arc::new(store)
    };

    info!(backend = store.backend_name(), "Key-value store ready");
    Ok(store)
}

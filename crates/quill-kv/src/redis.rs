//! Redis key-value backend.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info, instrument};

use crate::config::{RedisConfig, mask_password};
use crate::error::{KvError, KvResult};
use crate::store::{KeyValueStore, check_ttl, ttl_millis};

/// Key-value store on a Redis connection pool.
///
/// Expiry is handled by Redis itself, so [`KeyValueStore::cleanup`] is a
/// no-op here.
#[derive(Clone)]
pub struct RedisKvStore {
    pool: Pool,
}

impl RedisKvStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Builds the pool and checks that Redis answers.
    #[instrument(skip(config), fields(url = %mask_password(&config.url)))]
    pub async fn connect(config: &RedisConfig) -> KvResult<Self> {
        let timeout = Some(Duration::from_millis(config.timeout_ms));

        let mut redis_config = Config::from_url(&config.url);
        let mut pool_config = redis_config
            .pool
            .take()
            .unwrap_or_else(|| PoolConfig::new(config.pool_size));
        pool_config.max_size = config.pool_size;
        pool_config.timeouts.wait = timeout;
        pool_config.timeouts.create = timeout;
        pool_config.timeouts.recycle = timeout;
        redis_config.pool = Some(pool_config);

        let pool = redis_config.create_pool(Some(Runtime::Tokio1))?;
        let store = Self::new(pool);
        store.ping().await?;

        info!(pool_size = config.pool_size, "Connected key-value store to Redis");
        Ok(store)
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Sends `PING` over a pooled connection.
    pub async fn ping(&self) -> KvResult<()> {
        let mut conn = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for RedisKvStore {
    async fn exists(&self, key: &str) -> KvResult<bool> {
        let mut conn = self.pool.get().await?;
        Ok(conn.exists::<_, bool>(key).await?)
    }

    async fn get(&self, key: &str) -> KvResult<String> {
        let mut conn = self.pool.get().await?;
        match conn.get::<_, Option<String>>(key).await? {
            Some(value) => Ok(value),
            None => {
                debug!(key = %key, "kv miss");
                Err(KvError::not_found(key))
            }
        }
    }

    async fn get_ex(&self, key: &str, ttl: Duration) -> KvResult<String> {
        check_ttl(ttl)?;
        let mut conn = self.pool.get().await?;
        let value: Option<String> = redis::cmd("GETEX")
            .arg(key)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        match value {
            Some(value) => Ok(value),
            None => {
                debug!(key = %key, "kv miss");
                Err(KvError::not_found(key))
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let mut conn = self.pool.get().await?;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()> {
        check_ttl(ttl)?;
        let mut conn = self.pool.get().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> KvResult<()> {
        let mut conn = self.pool.get().await?;
        let deleted = conn.del::<_, i64>(key).await?;
        if deleted == 0 {
            debug!(key = %key, "kv delete miss");
            return Err(KvError::not_found(key));
        }
        Ok(())
    }

    async fn close(&self) -> KvResult<()> {
        self.pool.close();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quill_core::PreparedQueryCache;
use quill_core::time::unix_now_millis;
use sqlx_core::pool::PoolOptions;
use sqlx_postgres::Postgres;
use sqlx_sqlite::Sqlite;
use tracing::{debug, info, instrument};

use super::executor::{Dialect, PgExecutor, SqlExecutor, SqlParam, SqliteExecutor};
use crate::config::{SqlConfig, mask_password};
use crate::error::{KvError, KvResult};
use crate::store::{KeyValueStore, check_ttl};

const CREATE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS keyvalue (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        expiry BIGINT NULL
    )";

const EXISTS: &str = "
    SELECT key FROM keyvalue
    WHERE key=$1 AND (expiry IS NULL OR expiry > $2)";

const GET: &str = "
    SELECT value FROM keyvalue
    WHERE key=$1 AND (expiry IS NULL OR expiry > $2)";

const GET_EX: &str = "
    UPDATE keyvalue SET expiry=$1
    WHERE key=$2 AND (expiry IS NULL OR expiry > $3)
    RETURNING value";

const SET_POSTGRES: &str = "
    INSERT INTO keyvalue (key, value, expiry) VALUES ($1, $2, $3)
    ON CONFLICT (key) DO UPDATE SET value=EXCLUDED.value, expiry=EXCLUDED.expiry";

const SET_SQLITE: &str = "
    INSERT OR REPLACE INTO keyvalue (key, value, expiry) VALUES ($1, $2, $3)";

const DELETE: &str = "
    DELETE FROM keyvalue
    WHERE key=$1 AND (expiry IS NULL OR expiry > $2)";

const CLEANUP: &str = "
    DELETE FROM keyvalue
    WHERE expiry IS NOT NULL AND expiry <= $1";

/// Key-value store on a single SQL table.
///
/// Expiry is stored as unix milliseconds. Statements are prepared lazily, so the
/// store can be built before the table exists as long as
/// [`create_schema`](Self::create_schema) runs before first use.
///
/// Closing the store drops the cached statement handles and then closes the
/// pool. Server-side statements belong to the pooled connections, so they are
/// released with the pool rather than one by one.
pub struct SqlKvStore<X: SqlExecutor> {
    executor: Arc<X>,
    queries: PreparedQueryCache<X>,
}

pub type PgKvStore = SqlKvStore<PgExecutor>;
pub type SqliteKvStore = SqlKvStore<SqliteExecutor>;

impl<X: SqlExecutor> SqlKvStore<X> {
    pub fn new(executor: X) -> Self {
        let executor = Arc::new(executor);
        let mut queries = PreparedQueryCache::new("keyvalue", executor.clone());
        queries.add(EXISTS, "Exists");
        queries.add(GET, "Get");
        queries.add(GET_EX, "GetEx");
        match X::DIALECT {
            Dialect::Postgres => queries.add(SET_POSTGRES, "Set"),
            Dialect::Sqlite => queries.add(SET_SQLITE, "Set"),
        }
        queries.add(DELETE, "Delete");
        queries.add(CLEANUP, "Cleanup");

        Self { executor, queries }
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    /// Creates the `keyvalue` table if it does not exist.
    pub async fn create_schema(&self) -> KvResult<()> {
        self.executor.execute_raw(CREATE_SCHEMA).await?;
        debug!(backend = self.backend_name(), "keyvalue schema ready");
        Ok(())
    }

    async fn fetch_text(&self, query: &str, params: &[SqlParam<'_>]) -> KvResult<Option<String>> {
        let statement = self.queries.get(query).await?;
        Ok(self.executor.fetch_text(&statement, params).await?)
    }

    async fn execute(&self, query: &str, params: &[SqlParam<'_>]) -> KvResult<u64> {
        let statement = self.queries.get(query).await?;
        Ok(self.executor.execute(&statement, params).await?)
    }

    async fn write(&self, key: &str, value: &str, expiry: SqlParam<'_>) -> KvResult<()> {
        self.execute("Set", &[SqlParam::Text(key), SqlParam::Text(value), expiry])
            .await?;
        Ok(())
    }
}

impl PgKvStore {
    /// Opens a PostgreSQL pool for the key-value table.
    #[instrument(skip(config), fields(url = %mask_password(&config.url)))]
    pub async fn connect(config: &SqlConfig) -> KvResult<Self> {
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
            .connect(&config.url)
            .await?;

        info!(pool_size = config.pool_size, "Connected key-value store to PostgreSQL");
        Ok(Self::new(PgExecutor(pool)))
    }
}

impl SqliteKvStore {
    /// Opens a SQLite pool for the key-value table.
    #[instrument(skip(config), fields(url = %config.url))]
    pub async fn connect(config: &SqlConfig) -> KvResult<Self> {
        let pool = PoolOptions::<Sqlite>::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
            .connect(&config.url)
            .await?;

        info!(pool_size = config.pool_size, "Connected key-value store to SQLite");
        Ok(Self::new(SqliteExecutor(pool)))
    }

    /// Opens a private in-memory database with the schema already created.
    ///
    /// Every SQLite connection to `:memory:` gets its own database, so the
    /// pool is pinned to a single connection that is never recycled.
    pub async fn connect_in_memory() -> KvResult<Self> {
        let pool = PoolOptions::<Sqlite>::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self::new(SqliteExecutor(pool));
        store.create_schema().await?;
        Ok(store)
    }
}

#[async_trait]
impl<X: SqlExecutor> KeyValueStore for SqlKvStore<X> {
    async fn exists(&self, key: &str) -> KvResult<bool> {
        let row = self
            .fetch_text("Exists", &[SqlParam::Text(key), SqlParam::Int(unix_now_millis())])
            .await?;
        Ok(row.is_some())
    }

    async fn get(&self, key: &str) -> KvResult<String> {
        match self
            .fetch_text("Get", &[SqlParam::Text(key), SqlParam::Int(unix_now_millis())])
            .await?
        {
            Some(value) => Ok(value),
            None => {
                debug!(key = %key, "kv miss");
                Err(KvError::not_found(key))
            }
        }
    }

    async fn get_ex(&self, key: &str, ttl: Duration) -> KvResult<String> {
        let expiry = check_ttl(ttl)?;
        let params = [
            SqlParam::Int(expiry),
            SqlParam::Text(key),
            SqlParam::Int(unix_now_millis()),
        ];
        match self.fetch_text("GetEx", &params).await? {
            Some(value) => Ok(value),
            None => {
                debug!(key = %key, "kv miss");
                Err(KvError::not_found(key))
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        self.write(key, value, SqlParam::Null).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()> {
        let expiry = check_ttl(ttl)?;
        self.write(key, value, SqlParam::Int(expiry)).await
    }

    async fn delete(&self, key: &str) -> KvResult<()> {
        let deleted = self
            .execute("Delete", &[SqlParam::Text(key), SqlParam::Int(unix_now_millis())])
            .await?;
        if deleted == 0 {
            debug!(key = %key, "kv delete miss");
            return Err(KvError::not_found(key));
        }
        Ok(())
    }

    async fn cleanup(&self) -> KvResult<u64> {
        let removed = self
            .execute("Cleanup", &[SqlParam::Int(unix_now_millis())])
            .await?;
        debug!(removed, "kv cleanup");
        Ok(removed)
    }

    /// Drops the statement cache, then closes the pool, which releases the
    /// server-side statements.
    async fn close(&self) -> KvResult<()> {
        let result = self.queries.close().await;
        self.executor.close_pool().await;
        result.map_err(KvError::from)
    }

    fn backend_name(&self) -> &'static str {
        match X::DIALECT {
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }
}

//! The key-value store abstraction shared by every backend.

use std::time::Duration;

use async_trait::async_trait;
use quill_core::time::expiry_after;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{KvError, KvResult};

/// A string key-value store with optional per-entry expiry.
///
/// Expired entries behave exactly like absent ones: reads return
/// [`KvError::NotFound`] and `exists` returns `false`. Every method is a
/// single backend statement or command, so a dropped future either took full
/// effect or none.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `true` if `key` holds a live entry.
    async fn exists(&self, key: &str) -> KvResult<bool>;

    /// Reads a live entry.
    async fn get(&self, key: &str) -> KvResult<String>;

    /// Reads a live entry and moves its expiry to now + `ttl`.
    async fn get_ex(&self, key: &str, ttl: Duration) -> KvResult<String>;

    /// Writes an entry that never expires, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> KvResult<()>;

    /// Writes an entry that expires after `ttl`, replacing any previous one.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()>;

    /// Removes a live entry. Absent or expired keys are `NotFound`.
    async fn delete(&self, key: &str) -> KvResult<()>;

    /// Reclaims expired entries and returns how many were removed.
    ///
    /// Backends that expire natively return 0.
    async fn cleanup(&self) -> KvResult<u64> {
        Ok(0)
    }

    /// Releases backend resources. The store must not be used afterwards.
    async fn close(&self) -> KvResult<()>;

    /// Short backend identifier for logs.
    fn backend_name(&self) -> &'static str;
}

/// JSON helpers available on every [`KeyValueStore`].
#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    async fn get_value<T>(&self, key: &str) -> KvResult<T>
    where
        T: DeserializeOwned + Send,
    {
        let raw = self.get(key).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn get_value_ex<T>(&self, key: &str, ttl: Duration) -> KvResult<T>
    where
        T: DeserializeOwned + Send,
    {
        let raw = self.get_ex(key, ttl).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn set_value<T>(&self, key: &str, value: &T) -> KvResult<()>
    where
        T: Serialize + Sync,
    {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }

    async fn set_value_ex<T>(&self, key: &str, value: &T, ttl: Duration) -> KvResult<()>
    where
        T: Serialize + Sync,
    {
        let raw = serde_json::to_string(value)?;
        self.set_ex(key, &raw, ttl).await
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// Validates `ttl` and returns the absolute expiry, in unix milliseconds, of
/// an entry written now.
///
/// TTLs shorter than one millisecond, or reaching past the representable date
/// range, are `InvalidTtl` on every backend.
pub(crate) fn check_ttl(ttl: Duration) -> KvResult<i64> {
    if ttl < Duration::from_millis(1) {
        return Err(KvError::invalid_ttl(format!(
            "ttl must be at least 1ms, got {ttl:?}"
        )));
    }
    expiry_after(ttl)
        .ok_or_else(|| KvError::invalid_ttl(format!("ttl {ttl:?} is out of range")))
}

/// Whole milliseconds of `ttl`, for backends that take `PX`.
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}

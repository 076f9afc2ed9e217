//! Memoized asynchronous initialization that retries on failure.
//!
//! [`Lazy`] runs its factory on first access and caches the first successful
//! result for the rest of its life. A failed attempt caches nothing, so the
//! next caller tries again. Callers that race before the first success are
//! serialized; once a value is present reads never touch the mutex.

use std::fmt;
use std::sync::OnceLock;

use futures_util::future::BoxFuture;
use tokio::sync::Mutex;

type Factory<T, E> = Box<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

pub struct Lazy<T, E> {
    value: OnceLock<T>,
    init_lock: Mutex<()>,
    init: Factory<T, E>,
}

impl<T, E> Lazy<T, E> {
    /// Creates an uninitialized cell. `init` is not called until [`Lazy::get`].
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync + 'static,
    {
        Self {
            value: OnceLock::new(),
            init_lock: Mutex::new(()),
            init: Box::new(init),
        }
    }

    /// Returns the cached value, running the factory if nothing is cached yet.
    ///
    /// An error from the factory is returned to this caller only; it is not
    /// remembered.
    pub async fn get(&self) -> Result<&T, E> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        self.get_slow().await
    }

    async fn get_slow(&self) -> Result<&T, E> {
        let _guard = self.init_lock.lock().await;

        // Another caller may have finished while we waited for the lock.
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let value = (self.init)().await?;
        Ok(self.value.get_or_init(|| value))
    }

    /// Returns the cached value without initializing.
    pub fn peek(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Lazy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy").field("value", &self.value.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting(calls: Arc<AtomicUsize>, fail_first: usize) -> Lazy<usize, String> {
        Lazy::new(move || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                if n < fail_first {
                    Err(format!("attempt {n} failed"))
                } else {
                    Ok(n)
                }
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn test_get_initializes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = counting(calls.clone(), 0);

        assert!(!lazy.is_initialized());
        assert_eq!(*lazy.get().await.unwrap(), 0);
        assert_eq!(*lazy.get().await.unwrap(), 0);
        assert!(lazy.is_initialized());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_get_runs_factory_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = Arc::new(counting(calls.clone(), 0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let lazy = lazy.clone();
            handles.push(tokio::spawn(async move { *lazy.get().await.unwrap() }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 0);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = counting(calls.clone(), 2);

        assert_eq!(lazy.get().await.unwrap_err(), "attempt 0 failed");
        assert!(!lazy.is_initialized());
        assert_eq!(lazy.get().await.unwrap_err(), "attempt 1 failed");
        assert_eq!(*lazy.get().await.unwrap(), 2);
        assert_eq!(*lazy.get().await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_concurrent_callers_retry_after_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = Arc::new(counting(calls.clone(), 1));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lazy = lazy.clone();
            handles.push(tokio::spawn(async move { lazy.get().await.map(|v| *v) }));
        }

        let mut failures = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(v) => assert_eq!(v, 1),
                Err(_) => failures += 1,
            }
        }

        assert_eq!(failures, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_value_visible_without_runtime_after_init() {
        use tokio_test::block_on;

        let lazy: Lazy<&'static str, String> = Lazy::new(|| async { Ok("ready") }.boxed());
        assert!(lazy.peek().is_none());

        assert_eq!(*block_on(lazy.get()).unwrap(), "ready");
        assert_eq!(lazy.peek(), Some(&"ready"));
    }

    #[tokio::test]
    async fn test_cancelled_get_caches_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = counting(calls.clone(), 0);

        let attempt = tokio::time::timeout(Duration::from_millis(1), lazy.get()).await;
        assert!(attempt.is_err());
        assert!(lazy.peek().is_none());

        assert_eq!(*lazy.get().await.unwrap(), 1);
    }
}

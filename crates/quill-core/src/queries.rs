//! Named prepared statements compiled on first use.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::FutureExt;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::error::{CODE_UNCLASSIFIED, ClassifiedError, ErrorCategory};
use crate::lazy::Lazy;

/// Compiles SQL text into a backend statement handle and releases it again.
#[async_trait]
pub trait StatementPreparer: Send + Sync + 'static {
    type Statement: Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn prepare(&self, sql: &str) -> Result<Self::Statement, Self::Error>;

    async fn close(&self, statement: &Self::Statement) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum QueryError<E>
where
    E: std::error::Error + 'static,
{
    #[error("Unknown query: {name}")]
    Unknown { name: String },

    #[error("Failed to prepare query {name}: {source}")]
    Prepare {
        name: String,
        #[source]
        source: E,
    },
}

impl<E> QueryError<E>
where
    E: std::error::Error + 'static,
{
    #[must_use]
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::Unknown { name: name.into() }
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    /// Returns the backend error if preparation failed.
    pub fn into_source(self) -> Option<E> {
        match self {
            Self::Unknown { .. } => None,
            Self::Prepare { source, .. } => Some(source),
        }
    }
}

impl<E> ClassifiedError for QueryError<E>
where
    E: std::error::Error + 'static,
{
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
        ErrorCategory::Internal
    }
}

type Entry<P> = Lazy<
    Arc<<P as StatementPreparer>::Statement>,
    QueryError<<P as StatementPreparer>::Error>,
>;

/// A set of named queries prepared lazily against one backend.
///
/// Queries are registered with [`add`](Self::add) while the owner is being
/// built, then compiled the first time [`get`](Self::get) asks for them. A
/// failed preparation is retried on the next `get`. Every compiled handle is
/// remembered so [`close`](Self::close) can release all of them.
pub struct PreparedQueryCache<P: StatementPreparer> {
    name: String,
    preparer: Arc<P>,
    queries: HashMap<String, Entry<P>>,
    compiled: Arc<Mutex<Vec<Arc<P::Statement>>>>,
}

impl<P: StatementPreparer> PreparedQueryCache<P> {
    pub fn new(name: impl Into<String>, preparer: Arc<P>) -> Self {
        Self {
            name: name.into(),
            preparer,
            queries: HashMap::new(),
            compiled: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn preparer(&self) -> &Arc<P> {
        &self.preparer
    }

    /// Registers `sql` under `name`, replacing any earlier registration.
    pub fn add(&mut self, sql: &str, name: &str) {
        let sql = normalize_sql(sql);
        let cache = self.name.clone();
        let query = name.to_string();
        let preparer = self.preparer.clone();
        let compiled = self.compiled.clone();

        let entry = Lazy::new(move || {
            let sql = sql.clone();
            let cache = cache.clone();
            let query = query.clone();
            let preparer = preparer.clone();
            let compiled = compiled.clone();

            async move {
                let started = Instant::now();
                match preparer.prepare(&sql).await {
                    Ok(statement) => {
                        let statement = Arc::new(statement);
                        compiled.lock().push(statement.clone());
                        info!(
                            cache = %cache,
                            query = %query,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Prepared query"
                        );
                        Ok(statement)
                    }
                    Err(e) => {
                        error!(cache = %cache, query = %query, error = %e, "Failed to prepare query");
                        Err(QueryError::Prepare {
                            name: query,
                            source: e,
                        })
                    }
                }
            }
            .boxed()
        });

        self.queries.insert(name.to_string(), entry);
    }

    /// Returns the compiled statement for `name`, preparing it if needed.
    pub async fn get(&self, name: &str) -> Result<Arc<P::Statement>, QueryError<P::Error>> {
        let entry = self
            .queries
            .get(name)
            .ok_or_else(|| QueryError::unknown(name))?;
        entry.get().await.cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.queries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Number of statements compiled and not yet closed.
    pub fn compiled_count(&self) -> usize {
        self.compiled.lock().len()
    }

    /// Closes every statement compiled so far.
    ///
    /// All closes are attempted; the last failure, if any, is returned.
    pub async fn close(&self) -> Result<(), P::Error> {
        let statements = std::mem::take(&mut *self.compiled.lock());

        let mut result = Ok(());
        for statement in statements {
            if let Err(e) = self.preparer.close(&statement).await {
                warn!(cache = %self.name, error = %e, "Failed to close prepared statement");
                result = Err(e);
            }
        }
        result
    }
}

impl<P: StatementPreparer> fmt::Debug for PreparedQueryCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedQueryCache")
            .field("name", &self.name)
            .field("queries", &self.queries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Collapses line breaks so multi-line literals log and prepare as one line.
pub fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Error)]
    #[error("{0}")]
    struct FakeError(String);

    #[derive(Default)]
    struct FakePreparer {
        prepares: AtomicUsize,
        fail_prepares: AtomicUsize,
        closed: Mutex<Vec<String>>,
        fail_close_on: Vec<String>,
    }

    #[async_trait]
    impl StatementPreparer for FakePreparer {
        type Statement = String;
        type Error = FakeError;

        async fn prepare(&self, sql: &str) -> Result<String, FakeError> {
            self.prepares.fetch_add(1, Ordering::SeqCst);
            let remaining = self.fail_prepares.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_prepares.store(remaining - 1, Ordering::SeqCst);
                return Err(FakeError(format!("cannot prepare {sql}")));
            }
            Ok(sql.to_string())
        }

        async fn close(&self, statement: &String) -> Result<(), FakeError> {
            self.closed.lock().push(statement.clone());
            if self.fail_close_on.contains(statement) {
                return Err(FakeError(format!("cannot close {statement}")));
            }
            Ok(())
        }
    }

    #[test]
    fn test_normalize_sql() {
        assert_eq!(
            normalize_sql("\n  SELECT value\n  FROM keyvalue\n  WHERE key=$1\n"),
            "SELECT value FROM keyvalue WHERE key=$1"
        );
    }

    #[tokio::test]
    async fn test_get_prepares_once() {
        let preparer = Arc::new(FakePreparer::default());
        let mut cache = PreparedQueryCache::new("test", preparer.clone());
        cache.add("SELECT 1", "One");

        assert_eq!(cache.compiled_count(), 0);
        assert_eq!(*cache.get("One").await.unwrap(), "SELECT 1");
        assert_eq!(*cache.get("One").await.unwrap(), "SELECT 1");
        assert_eq!(preparer.prepares.load(Ordering::SeqCst), 1);
        assert_eq!(cache.compiled_count(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_query() {
        let cache = PreparedQueryCache::new("test", Arc::new(FakePreparer::default()));

        let err = cache.get("Missing").await.unwrap_err();
        assert!(err.is_unknown());
        assert_eq!(err.to_string(), "Unknown query: Missing");
        assert!(!err.is_transparent());
    }

    #[tokio::test]
    async fn test_get_retries_failed_preparation() {
        let preparer = Arc::new(FakePreparer {
            fail_prepares: AtomicUsize::new(1),
            ..Default::default()
        });
        let mut cache = PreparedQueryCache::new("test", preparer.clone());
        cache.add("SELECT 1", "One");

        let err = cache.get("One").await.unwrap_err();
        assert!(matches!(err, QueryError::Prepare { ref name, .. } if name == "One"));
        assert_eq!(cache.compiled_count(), 0);

        assert_eq!(*cache.get("One").await.unwrap(), "SELECT 1");
        assert_eq!(preparer.prepares.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_close_attempts_every_statement() {
        let preparer = Arc::new(FakePreparer {
            fail_close_on: vec!["SELECT 1".to_string(), "SELECT 2".to_string()],
            ..Default::default()
        });
        let mut cache = PreparedQueryCache::new("test", preparer.clone());
        cache.add("SELECT 1", "One");
        cache.add("SELECT 2", "Two");
        cache.add("SELECT 3", "Three");

        cache.get("One").await.unwrap();
        cache.get("Three").await.unwrap();
        cache.get("Two").await.unwrap();

        let err = cache.close().await.unwrap_err();
        assert_eq!(err.to_string(), "cannot close SELECT 2");
        assert_eq!(preparer.closed.lock().len(), 3);
        assert_eq!(cache.compiled_count(), 0);

        // Nothing left to close.
        cache.close().await.unwrap();
        assert_eq!(preparer.closed.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_close_without_compiled_statements() {
        let preparer = Arc::new(FakePreparer::default());
        let mut cache = PreparedQueryCache::new("test", preparer.clone());
        cache.add("SELECT 1", "One");

        cache.close().await.unwrap();
        assert!(preparer.closed.lock().is_empty());
    }
}

//! Dialect-specific statement execution on top of sqlx pools.

use async_trait::async_trait;
use quill_core::queries::StatementPreparer;
use sqlx_core::executor::Executor;
use sqlx_core::row::Row;
use sqlx_postgres::{PgPool, PgStatement};
use sqlx_sqlite::{SqlitePool, SqliteStatement};

/// SQL flavour a [`SqlExecutor`] speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

/// A positional statement parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlParam<'a> {
    Text(&'a str),
    Int(i64),
    /// SQL `NULL` in an integer column.
    Null,
}

/// Runs prepared key-value statements against one pool.
#[async_trait]
pub trait SqlExecutor: StatementPreparer<Error = sqlx_core::Error> {
    const DIALECT: Dialect;

    /// Runs a statement returning at most one row and reads its first
    /// column as text.
    async fn fetch_text(
        &self,
        statement: &Self::Statement,
        params: &[SqlParam<'_>],
    ) -> Result<Option<String>, sqlx_core::Error>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(
        &self,
        statement: &Self::Statement,
        params: &[SqlParam<'_>],
    ) -> Result<u64, sqlx_core::Error>;

    /// Runs unprepared SQL, used for schema bootstrap.
    async fn execute_raw(&self, sql: &str) -> Result<(), sqlx_core::Error>;

    /// Closes the underlying pool.
    async fn close_pool(&self);
}

/// [`SqlExecutor`] over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgExecutor(pub PgPool);

/// [`SqlExecutor`] over a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteExecutor(pub SqlitePool);

macro_rules! sql_executor {
    ($executor:ident, $statement:ident, $dialect:expr) => {
        #[async_trait]
        impl StatementPreparer for $executor {
            type Statement = $statement<'static>;
            type Error = sqlx_core::Error;

            async fn prepare(&self, sql: &str) -> Result<Self::Statement, Self::Error> {
                let statement = (&self.0).prepare(sql).await?;
                Ok(sqlx_core::statement::Statement::to_owned(&statement))
            }

            async fn close(&self, _statement: &Self::Statement) -> Result<(), Self::Error> {
                // Pooled connections own their server-side statements and
                // release them when the pool closes.
                Ok(())
            }
        }

        #[async_trait]
        impl SqlExecutor for $executor {
            const DIALECT: Dialect = $dialect;

            async fn fetch_text(
                &self,
                statement: &Self::Statement,
                params: &[SqlParam<'_>],
            ) -> Result<Option<String>, sqlx_core::Error> {
                let mut query = sqlx_core::statement::Statement::query(statement);
                for param in params {
                    query = match *param {
                        SqlParam::Text(s) => query.bind(s.to_owned()),
                        SqlParam::Int(i) => query.bind(i),
                        SqlParam::Null => query.bind(Option::<i64>::None),
                    };
                }
                let row = query.fetch_optional(&self.0).await?;
                row.map(|row| row.try_get::<String, _>(0)).transpose()
            }

            async fn execute(
                &self,
                statement: &Self::Statement,
                params: &[SqlParam<'_>],
            ) -> Result<u64, sqlx_core::Error> {
                let mut query = sqlx_core::statement::Statement::query(statement);
                for param in params {
                    query = match *param {
                        SqlParam::Text(s) => query.bind(s.to_owned()),
                        SqlParam::Int(i) => query.bind(i),
                        SqlParam::Null => query.bind(Option::<i64>::None),
                    };
                }
                Ok(query.execute(&self.0).await?.rows_affected())
            }

            async fn execute_raw(&self, sql: &str) -> Result<(), sqlx_core::Error> {
                sqlx_core::query::query(sql).execute(&self.0).await?;
                Ok(())
            }

            async fn close_pool(&self) {
                self.0.close().await;
            }
        }
    };
}

sql_executor!(PgExecutor, PgStatement, Dialect::Postgres);
sql_executor!(SqliteExecutor, SqliteStatement, Dialect::Sqlite);

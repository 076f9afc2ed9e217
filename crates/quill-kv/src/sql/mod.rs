//! SQL key-value backend for PostgreSQL and SQLite.

mod executor;
mod store;

pub use executor::{Dialect, PgExecutor, SqlExecutor, SqlParam, SqliteExecutor};
pub use store::{PgKvStore, SqlKvStore, SqliteKvStore};

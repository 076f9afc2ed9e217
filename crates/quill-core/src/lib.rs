pub mod error;
pub mod id;
pub mod lazy;
pub mod queries;
pub mod time;

pub use error::{ClassifiedError, ConfigError, ErrorCategory, OPAQUE_MESSAGE};
pub use id::{IdError, SubjectId};
pub use lazy::Lazy;
pub use queries::{PreparedQueryCache, QueryError, StatementPreparer, normalize_sql};
pub use self::time::{expiry_after, expiry_from, unix_now_millis};

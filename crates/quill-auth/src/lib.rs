//! Session and refresh credentials for Quill.
//!
//! [`CredentialService`] signs short-lived session tokens (EdDSA JWTs) and
//! manages one long-lived opaque refresh token per subject in a
//! [`quill_kv::KeyValueStore`].
//!
//! ## Example
//!
//! ```ignore
//! let kv = quill_kv::connect(&KvConfig::default()).await?;
//! let service = CredentialService::from_config(&CredentialConfig::default(), kv)?;
//!
//! let claims = SessionToken::new(
//!     subject,
//!     "ada",
//!     "ada@example.com",
//!     Permission::DEFAULT,
//!     service.session_token_lifetime(),
//! )?;
//! let jwt = service.encode_token(&claims)?;
//! let refresh = service.gen_refresh_token(subject).await?;
//!
//! // Later, when the session token has expired:
//! let subject = service.validate_refresh_token(&refresh).await?;
//! ```

pub mod config;
pub mod error;
pub mod keys;
pub mod permission;
pub mod refresh;
pub mod service;
pub mod token;

pub use config::{CredentialConfig, MAX_TOKEN_LIFETIME};
pub use error::{AuthError, AuthResult};
pub use keys::SigningKeyPair;
pub use permission::Permission;
pub use refresh::{REFRESH_TOKEN_BYTES, REFRESH_TOKEN_LEN};
pub use service::CredentialService;
pub use token::SessionToken;

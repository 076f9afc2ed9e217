//! Session-token and refresh-token issuance.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Header, Validation, decode, encode};
use quill_core::SubjectId;
use quill_kv::KeyValueStore;
use tracing::{debug, instrument, warn};

use crate::config::CredentialConfig;
use crate::error::{AuthError, AuthResult};
use crate::keys::SigningKeyPair;
use crate::refresh::{
    generate_refresh_token, refresh_token_key, refresh_token_owner, refresh_tokens_match,
};
use crate::token::SessionToken;

/// Default refresh-token lifetime.
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Default session-token lifetime.
pub const DEFAULT_SESSION_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Issues and checks session tokens and refresh tokens.
///
/// Session tokens are stateless EdDSA-signed JWTs. Refresh tokens are opaque
/// and live in the key-value store under `refresh_token/<subject>`, one per
/// subject; using one renews its lease.
///
/// This service is `Send + Sync` and can be shared across tasks.
pub struct CredentialService {
    keys: SigningKeyPair,
    issuer: String,
    kv: Arc<dyn KeyValueStore>,
    refresh_token_ttl: Duration,
    session_token_lifetime: Duration,
    validation: Validation,
}

impl CredentialService {
    pub fn new(keys: SigningKeyPair, issuer: impl Into<String>, kv: Arc<dyn KeyValueStore>) -> Self {
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.leeway = 0;
        validation.validate_aud = false;

        Self {
            keys,
            issuer: issuer.into(),
            kv,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            session_token_lifetime: DEFAULT_SESSION_TOKEN_LIFETIME,
            validation,
        }
    }

    /// Builds the service from configuration.
    ///
    /// Keys are read from the configured PEM files, or generated when no
    /// paths are set.
    pub fn from_config(config: &CredentialConfig, kv: Arc<dyn KeyValueStore>) -> AuthResult<Self> {
        config.validate()?;

        let keys = match (&config.private_key_path, &config.public_key_path) {
            (Some(private_path), Some(public_path)) => {
                SigningKeyPair::from_pem_files(private_path, public_path)?
            }
            _ => {
                warn!("No signing keys configured, generating an ephemeral key pair");
                SigningKeyPair::generate()?
            }
        };

        Ok(Self::new(keys, config.issuer.clone(), kv)
            .with_refresh_token_ttl(config.refresh_token_lifetime)
            .with_session_token_lifetime(config.session_token_lifetime))
    }

    #[must_use]
    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_session_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.session_token_lifetime = lifetime;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn keys(&self) -> &SigningKeyPair {
        &self.keys
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_token_ttl
    }

    /// Lifetime callers should give new session tokens.
    pub fn session_token_lifetime(&self) -> Duration {
        self.session_token_lifetime
    }

    /// Signs `token`, filling in the default issuer if it has none.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidClaims` unless `expires_at` is after
    /// `issued_at`.
    pub fn encode_token(&self, token: &SessionToken) -> AuthResult<String> {
        if token.expires_at <= token.issued_at {
            return Err(AuthError::invalid_claims(format!(
                "expires_at ({}) must be after issued_at ({})",
                token.expires_at.unix_timestamp(),
                token.issued_at.unix_timestamp()
            )));
        }

        let claims = if token.issuer.is_empty() {
            Cow::Owned(token.clone().with_issuer(self.issuer.clone()))
        } else {
            Cow::Borrowed(token)
        };

        encode(
            &Header::new(Algorithm::EdDSA),
            claims.as_ref(),
            self.keys.encoding_key(),
        )
        .map_err(|e| AuthError::signing(e.to_string()))
    }

    /// Verifies `token` and returns its claims.
    ///
    /// # Errors
    /// `AuthError::TokenExpired` for a genuine token past its expiry,
    /// `AuthError::TokenInvalid` for anything else that fails.
    pub fn decode_token(&self, token: &str) -> AuthResult<SessionToken> {
        match decode::<SessionToken>(token, self.keys.decoding_key(), &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(AuthError::TokenExpired),
                _ => {
                    debug!(error = %e, "Rejected session token");
                    Err(AuthError::TokenInvalid)
                }
            },
        }
    }

    /// Returns `subject`'s live refresh token, minting one if there is none.
    ///
    /// Reusing a live token also renews its lease.
    #[instrument(skip(self), fields(subject = %subject))]
    pub async fn gen_refresh_token(&self, subject: SubjectId) -> AuthResult<String> {
        let key = refresh_token_key(subject);

        match self.kv.get_ex(&key, self.refresh_token_ttl).await {
            Ok(token) => {
                debug!("Reusing live refresh token");
                return Ok(token);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let token = generate_refresh_token(subject);
        self.kv
            .set_ex(&key, &token, self.refresh_token_ttl)
            .await?;

        debug!("Issued refresh token");
        Ok(token)
    }

    /// Checks a presented refresh token and returns its owner.
    ///
    /// A valid token has its lease renewed.
    ///
    /// # Errors
    /// `AuthError::InvalidRefreshToken` if the token is malformed, unknown
    /// or no longer the owner's current token; `AuthError::Storage` if the
    /// store fails.
    #[instrument(skip_all)]
    pub async fn validate_refresh_token(&self, token: &str) -> AuthResult<SubjectId> {
        let Some(owner) = refresh_token_owner(token) else {
            debug!("Malformed refresh token");
            return Err(AuthError::InvalidRefreshToken);
        };

        let stored = match self
            .kv
            .get_ex(&refresh_token_key(owner), self.refresh_token_ttl)
            .await
        {
            Ok(stored) => stored,
            Err(e) if e.is_not_found() => {
                debug!(subject = %owner, "No live refresh token");
                return Err(AuthError::InvalidRefreshToken);
            }
            Err(e) => return Err(e.into()),
        };

        if !refresh_tokens_match(&stored, token) {
            debug!(subject = %owner, "Refresh token superseded");
            return Err(AuthError::InvalidRefreshToken);
        }

        Ok(owner)
    }

    /// Revokes `subject`'s refresh token. Succeeds if there was none.
    #[instrument(skip(self), fields(subject = %subject))]
    pub async fn delete_refresh_tokens(&self, subject: SubjectId) -> AuthResult<()> {
        match self.kv.delete(&refresh_token_key(subject)).await {
            Ok(()) => {
                debug!("Revoked refresh token");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

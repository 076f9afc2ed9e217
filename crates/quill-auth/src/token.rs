//! Session token claims.

use std::time::Duration;

use quill_core::SubjectId;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{AuthError, AuthResult};
use crate::permission::Permission;

/// Claims carried by a signed session token.
///
/// Timestamps are whole seconds; sub-second precision does not survive the
/// JWT `NumericDate` encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// Authenticated subject.
    #[serde(rename = "sub")]
    pub subject: SubjectId,

    #[serde(rename = "iat", with = "time::serde::timestamp")]
    pub issued_at: OffsetDateTime,

    #[serde(rename = "exp", with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,

    /// Issuer. Left empty, it is filled in by the encoder.
    #[serde(rename = "iss", default)]
    pub issuer: String,

    #[serde(rename = "nick", default)]
    pub display_name: String,

    #[serde(default)]
    pub email: String,

    #[serde(rename = "perm", default)]
    pub permissions: Permission,
}

impl SessionToken {
    /// Builds claims issued now and valid for `lifetime`.
    ///
    /// # Errors
    /// Returns `AuthError::InvalidClaims` if the expiry is not representable.
    pub fn new(
        subject: SubjectId,
        display_name: impl Into<String>,
        email: impl Into<String>,
        permissions: Permission,
        lifetime: Duration,
    ) -> AuthResult<Self> {
        let now = now_whole_seconds();
        let expires_at = time::Duration::try_from(lifetime)
            .ok()
            .and_then(|span| now.checked_add(span))
            .ok_or_else(|| {
                AuthError::invalid_claims(format!("lifetime {lifetime:?} is out of range"))
            })?;

        Ok(Self {
            subject,
            issued_at: now,
            expires_at,
            issuer: String::new(),
            display_name: display_name.into(),
            email: email.into(),
            permissions,
        })
    }

    /// Sets the issuer claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Returns `true` if the token is past its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at < OffsetDateTime::now_utc()
    }
}

fn now_whole_seconds() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - time::Duration::nanoseconds(i64::from(now.nanosecond()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_new_uses_whole_seconds() {
        let token = SessionToken::new(
            SubjectId::new(7),
            "ada",
            "ada@example.com",
            Permission::DEFAULT,
            Duration::from_secs(3600),
        )
        .unwrap();

        assert_eq!(token.issued_at.nanosecond(), 0);
        assert_eq!(
            token.expires_at.unix_timestamp() - token.issued_at.unix_timestamp(),
            3600
        );
        assert!(token.issuer.is_empty());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_new_rejects_out_of_range_lifetime() {
        for lifetime in [Duration::from_secs(u64::MAX / 4), Duration::MAX] {
            let err = SessionToken::new(
                SubjectId::new(7),
                "ada",
                "ada@example.com",
                Permission::DEFAULT,
                lifetime,
            )
            .unwrap_err();
            assert!(matches!(err, AuthError::InvalidClaims(_)));
        }
    }

    #[test]
    fn test_wire_claim_names() {
        let token = SessionToken {
            subject: SubjectId::new(42),
            issued_at: datetime!(2024-01-01 00:00:00 UTC),
            expires_at: datetime!(2024-01-01 01:00:00 UTC),
            issuer: "quill".to_string(),
            display_name: "ada".to_string(),
            email: "ada@example.com".to_string(),
            permissions: Permission::PUBLISHER,
        };

        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["sub"], "42");
        assert_eq!(json["iat"], 1_704_067_200);
        assert_eq!(json["exp"], 1_704_070_800);
        assert_eq!(json["iss"], "quill");
        assert_eq!(json["nick"], "ada");
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["perm"], 47);

        let back: SessionToken = serde_json::from_value(json).unwrap();
        assert_eq!(back, token);
    }
}

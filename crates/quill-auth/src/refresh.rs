//! Refresh-token wire format.
//!
//! A refresh token is 64 random bytes whose first eight bytes are replaced
//! by the owner's subject id (little-endian), encoded as padded standard
//! base64. The owner is therefore recoverable without a lookup, and the
//! store only has to keep one slot per subject.

use base64::{Engine, engine::general_purpose::STANDARD};
use quill_core::SubjectId;
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;

/// Raw token size in bytes.
pub const REFRESH_TOKEN_BYTES: usize = 64;

/// Encoded token length in characters.
pub const REFRESH_TOKEN_LEN: usize = REFRESH_TOKEN_BYTES.div_ceil(3) * 4;

/// Key of the slot holding `subject`'s live refresh token.
pub fn refresh_token_key(subject: SubjectId) -> String {
    format!("refresh_token/{subject}")
}

/// Mints a new token owned by `subject`.
pub fn generate_refresh_token(subject: SubjectId) -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes[..8].copy_from_slice(&subject.to_le_bytes());
    STANDARD.encode(bytes)
}

/// Extracts the owner of a well-formed token.
///
/// Returns `None` if `token` is not base64 or does not decode to exactly
/// [`REFRESH_TOKEN_BYTES`] bytes.
pub fn refresh_token_owner(token: &str) -> Option<SubjectId> {
    if token.len() != REFRESH_TOKEN_LEN {
        return None;
    }
    let bytes = STANDARD.decode(token).ok()?;
    if bytes.len() != REFRESH_TOKEN_BYTES {
        return None;
    }
    let owner: [u8; 8] = bytes[..8].try_into().ok()?;
    Some(SubjectId::from_le_bytes(owner))
}

/// Compares a presented token with the stored one in constant time.
pub fn refresh_tokens_match(stored: &str, presented: &str) -> bool {
    stored.as_bytes().ct_eq(presented.as_bytes()).into()
}

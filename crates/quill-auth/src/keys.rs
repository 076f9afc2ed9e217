//! Ed25519 key material for signing session tokens.

use std::fmt;
use std::path::Path;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::rngs::OsRng;

use crate::error::{AuthError, AuthResult};

/// An Ed25519 key pair in the forms `jsonwebtoken` needs.
pub struct SigningKeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKeyPair {
    /// Generates a fresh key pair from the OS random source.
    pub fn generate() -> AuthResult<Self> {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self::from_keys(signing_key, verifying_key)
    }

    /// Loads a key pair from PKCS#8 (private) and SPKI (public) PEM text.
    ///
    /// # Errors
    /// Returns `AuthError::Key` if either PEM is malformed or the halves do
    /// not belong together.
    pub fn from_pem(private_pem: &str, public_pem: &str) -> AuthResult<Self> {
        let signing_key =
            SigningKey::from_pkcs8_pem(private_pem).map_err(|e| AuthError::key(e.to_string()))?;
        let verifying_key = VerifyingKey::from_public_key_pem(public_pem)
            .map_err(|e| AuthError::key(e.to_string()))?;

        if signing_key.verifying_key() != verifying_key {
            return Err(AuthError::key("public key does not match private key"));
        }

        Self::from_keys(signing_key, verifying_key)
    }

    /// Reads both PEM files and loads them with [`from_pem`](Self::from_pem).
    pub fn from_pem_files(
        private_path: impl AsRef<Path>,
        public_path: impl AsRef<Path>,
    ) -> AuthResult<Self> {
        let private_path = private_path.as_ref();
        let public_path = public_path.as_ref();

        let private_pem = std::fs::read_to_string(private_path)
            .map_err(|e| AuthError::key(format!("{}: {e}", private_path.display())))?;
        let public_pem = std::fs::read_to_string(public_path)
            .map_err(|e| AuthError::key(format!("{}: {e}", public_path.display())))?;

        Self::from_pem(&private_pem, &public_pem)
    }

    fn from_keys(signing_key: SigningKey, verifying_key: VerifyingKey) -> AuthResult<Self> {
        let der = signing_key
            .to_pkcs8_der()
            .map_err(|e| AuthError::key(e.to_string()))?;
        let encoding_key = EncodingKey::from_ed_der(der.as_bytes());

        let x = URL_SAFE_NO_PAD.encode(verifying_key.as_bytes());
        let decoding_key =
            DecodingKey::from_ed_components(&x).map_err(|e| AuthError::key(e.to_string()))?;

        Ok(Self {
            signing_key,
            verifying_key,
            encoding_key,
            decoding_key,
        })
    }

    /// Private key as PKCS#8 PEM.
    pub fn private_key_pem(&self) -> AuthResult<String> {
        let pem = self
            .signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AuthError::key(e.to_string()))?;
        Ok(pem.to_string())
    }

    /// Public key as SPKI PEM.
    pub fn public_key_pem(&self) -> AuthResult<String> {
        self.verifying_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AuthError::key(e.to_string()))
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("public_key", &URL_SAFE_NO_PAD.encode(self.verifying_key.as_bytes()))
            .finish_non_exhaustive()
    }
}

//! Symmetric payload encryption for the two vendor surfaces.
//!
//! Wire format: `{"encryptRes": base64(nonce || ciphertext)}` where the
//! ciphertext is `ChaCha20-Poly1305` under `SHA-256(shared secret)`. A card-control
//! transaction id, when present, is bound as associated data, so an envelope
//! only opens under the id it was sealed with.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use vendor_auth::SecretString;
use zeroize::Zeroizing;

/// JSON field carrying the ciphertext in both directions.
pub const ENVELOPE_FIELD: &str = "encryptRes";

const NONCE_LEN: usize = 12;

/// Which vendor gateway a key belongs to. Keys are never shared across surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorSurface {
    Fintech,
    CardControl,
}

impl fmt::Display for VendorSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fintech => "fintech",
            Self::CardControl => "card_control",
        })
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CipherError {
    /// The body has no `encryptRes` field. The vendor sent a raw, unencrypted
    /// error object instead of an envelope.
    #[error("response has no 'encryptRes' envelope field")]
    MissingEnvelope,

    #[error("invalid key material: {0}")]
    Key(String),

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("cipher for {actual} used on the {expected} surface")]
    SurfaceMismatch {
        expected: VendorSurface,
        actual: VendorSurface,
    },
}

/// Encrypted payload as sent on the wire.
///
/// The transaction id is carried as the `X-Transaction-ID` header, never in
/// the serialized body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "encryptRes")]
    pub cipher_text: String,
    #[serde(skip)]
    pub transaction_id: Option<String>,
}

impl Envelope {
    /// Serialized request body.
    ///
    /// # Errors
    /// Returns [`CipherError::Encrypt`] if serialization fails.
    pub fn to_body(&self) -> Result<Bytes, CipherError> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|_| CipherError::Encrypt)
    }
}

/// Seals and opens payloads for one [`VendorSurface`].
pub struct PayloadCipher {
    surface: VendorSurface,
    aead: ChaCha20Poly1305,
}

impl fmt::Debug for PayloadCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadCipher")
            .field("surface", &self.surface)
            .finish_non_exhaustive()
    }
}

impl PayloadCipher {
    /// # Errors
    /// Returns [`CipherError::Key`] if `secret` is empty.
    pub fn new(surface: VendorSurface, secret: &SecretString) -> Result<Self, CipherError> {
        if secret.is_empty() {
            return Err(CipherError::Key(format!("{surface} secret is empty")));
        }
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&Sha256::digest(secret.expose().as_bytes()));
        let aead = ChaCha20Poly1305::new_from_slice(key.as_slice())
            .map_err(|e| CipherError::Key(e.to_string()))?;
        Ok(Self { surface, aead })
    }

    #[must_use]
    pub fn surface(&self) -> VendorSurface {
        self.surface
    }

    /// Fail unless this cipher holds the key for `expected`.
    ///
    /// # Errors
    /// Returns [`CipherError::SurfaceMismatch`].
    pub fn ensure_surface(&self, expected: VendorSurface) -> Result<(), CipherError> {
        if self.surface == expected {
            Ok(())
        } else {
            Err(CipherError::SurfaceMismatch {
                expected,
                actual: self.surface,
            })
        }
    }

    /// Seal `plaintext` under a fresh random nonce.
    ///
    /// # Errors
    /// Returns [`CipherError::Encrypt`] if the AEAD primitive fails.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        transaction_id: Option<&str>,
    ) -> Result<Envelope, CipherError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let sealed = self
            .aead
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad: transaction_id.unwrap_or_default().as_bytes(),
                },
            )
            .map_err(|_| CipherError::Encrypt)?;

        let mut wire = Vec::with_capacity(NONCE_LEN + sealed.len());
        wire.extend_from_slice(nonce.as_slice());
        wire.extend_from_slice(&sealed);

        Ok(Envelope {
            cipher_text: STANDARD.encode(wire),
            transaction_id: transaction_id.map(str::to_owned),
        })
    }

    /// Open a response body of the form `{"encryptRes": "..."}`.
    ///
    /// # Errors
    /// - [`CipherError::MissingEnvelope`] if the body is not a JSON object with
    ///   a string `encryptRes` field
    /// - [`CipherError::Decrypt`] for bad base64, truncated input, or a failed
    ///   authentication tag
    pub fn decrypt(&self, body: &[u8], transaction_id: Option<&str>) -> Result<Vec<u8>, CipherError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|_| CipherError::MissingEnvelope)?;
        let Some(encoded) = value.get(ENVELOPE_FIELD).and_then(serde_json::Value::as_str) else {
            return Err(CipherError::MissingEnvelope);
        };

        let wire = STANDARD
            .decode(encoded)
            .map_err(|e| CipherError::Decrypt(format!("invalid base64: {e}")))?;
        if wire.len() <= NONCE_LEN {
            return Err(CipherError::Decrypt("envelope too short".to_owned()));
        }
        let (nonce, sealed) = wire.split_at(NONCE_LEN);

        self.aead
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: transaction_id.unwrap_or_default().as_bytes(),
                },
            )
            .map_err(|_| CipherError::Decrypt("authentication failed".to_owned()))
    }
}

//! Sealed field values
//!
//! A [`Field`] records at write time whether a value was encrypted, so readers
//! never have to guess. Plaintext serializes as a bare JSON string; encrypted
//! values serialize as `{"envelope": "<iv-hex><ciphertext-b64>"}`.

use crate::security::{looks_like_envelope, FieldCodec};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Shown in place of a field that failed to decrypt
pub const DECRYPTION_FAILED_PLACEHOLDER: &str = "[unable to decrypt]";

/// A string value that is either stored in the clear or as an envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    /// Encrypted with [`FieldCodec`]
    Encrypted {
        /// IV-prefixed ciphertext
        envelope: String,
    },
    /// Stored in the clear
    Plaintext(String),
}

impl Field {
    /// Encrypt `plaintext` into a sealed field
    pub fn seal(codec: &FieldCodec, plaintext: &str) -> Result<Self> {
        Ok(Self::Encrypted {
            envelope: codec.encrypt(plaintext)?,
        })
    }

    /// Wrap a value that is deliberately stored in the clear
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plaintext(text.into())
    }

    /// Classify an untagged string from older rows or remote columns.
    ///
    /// Legacy compatibility only: falls back on the envelope shape heuristic.
    pub fn from_legacy(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if looks_like_envelope(&raw) {
            Self::Encrypted { envelope: raw }
        } else {
            Self::Plaintext(raw)
        }
    }

    /// Whether the value is an envelope
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted { .. })
    }

    /// The value as it would be stored in an untagged remote column
    pub fn as_stored_str(&self) -> &str {
        match self {
            Self::Encrypted { envelope } => envelope,
            Self::Plaintext(text) => text,
        }
    }

    /// Plaintext value, decrypting if needed
    pub fn reveal(&self, codec: &FieldCodec) -> Result<String> {
        match self {
            Self::Encrypted { envelope } => codec.decrypt(envelope),
            Self::Plaintext(text) => Ok(text.clone()),
        }
    }

    /// Plaintext value, or [`DECRYPTION_FAILED_PLACEHOLDER`] if decryption fails
    pub fn display(&self, codec: &FieldCodec) -> String {
        match self.reveal(codec) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Field decryption failed: {}", e);
                DECRYPTION_FAILED_PLACEHOLDER.to_string()
            }
        }
    }
}

/// Seal an optional value
pub fn seal_optional(codec: &FieldCodec, value: Option<&str>) -> Result<Option<Field>> {
    value.map(|v| Field::seal(codec, v)).transpose()
}

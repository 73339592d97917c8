//! Field-level encryption codec
//!
//! Encrypts single string values with AES-256-CBC / PKCS7 under a key derived
//! from the stored secret. Every call draws a fresh 16-byte IV, so encrypting
//! the same value twice never yields the same envelope.
//!
//! Envelope format: `hex(iv)` (32 lowercase hex chars) followed by the
//! standard base64 encoding of the ciphertext. Local rows and remote columns
//! carry exactly the same string.

use crate::encryption::EncryptionKey;
use crate::secret_store::SecretStore;
use crate::{Error, Result};
use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// IV length in bytes
pub const IV_LEN: usize = 16;

/// Hex-encoded IV prefix length
pub const IV_HEX_LEN: usize = IV_LEN * 2;

/// AES block size
const BLOCK_LEN: usize = 16;

/// Default secret store entry for the field key
pub const DEFAULT_SECRET_NAME: &str = "cradle.field-key";

/// Encrypts and decrypts individual string fields
#[derive(Clone)]
pub struct FieldCodec {
    secrets: Arc<dyn SecretStore>,
    secret_name: String,
}

impl FieldCodec {
    /// Codec using the default secret name
    pub fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self::with_secret_name(secrets, DEFAULT_SECRET_NAME)
    }

    /// Codec using an explicit secret name
    pub fn with_secret_name(secrets: Arc<dyn SecretStore>, secret_name: &str) -> Self {
        Self {
            secrets,
            secret_name: secret_name.to_string(),
        }
    }

    /// Secret store entry this codec derives its key from
    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    /// Derive the working key; recomputed on every call.
    fn working_key(&self) -> Result<EncryptionKey> {
        let secret = self.secrets.get_or_create_secret(&self.secret_name)?;
        Ok(EncryptionKey::from_secret(&secret))
    }

    /// Encrypt `plaintext` into an envelope
    ///
    /// Only fails when the secret store is unavailable.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let key = self.working_key()?;

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        Ok(seal(&key, &iv, plaintext))
    }

    /// Decrypt an envelope produced by [`FieldCodec::encrypt`]
    pub fn decrypt(&self, envelope: &str) -> Result<String> {
        let key = self.working_key()?;
        open(&key, envelope)
    }
}

/// Encrypt with an explicit key and IV
pub fn seal(key: &EncryptionKey, iv: &[u8; IV_LEN], plaintext: &str) -> String {
    let ciphertext = Aes256CbcEnc::new(key.as_bytes().into(), iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mut envelope = hex::encode(iv);
    envelope.push_str(&STANDARD.encode(ciphertext));
    envelope
}

/// Decrypt an envelope with an explicit key
pub fn open(key: &EncryptionKey, envelope: &str) -> Result<String> {
    let (iv_hex, body) = split_envelope(envelope)?;

    let mut iv = [0u8; IV_LEN];
    hex::decode_to_slice(iv_hex, &mut iv)
        .map_err(|e| Error::Decryption(format!("Invalid IV: {}", e)))?;

    let ciphertext = STANDARD
        .decode(body)
        .map_err(|e| Error::Decryption(format!("Invalid ciphertext encoding: {}", e)))?;
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(Error::Decryption(format!(
            "Invalid ciphertext length: {}",
            ciphertext.len()
        )));
    }

    let plaintext = Aes256CbcDec::new(key.as_bytes().into(), (&iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| Error::Decryption("Bad padding (wrong key or corrupt data)".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|e| Error::Decryption(format!("Plaintext is not UTF-8: {}", e)))
}

/// Structural check for untagged values written before fields were tagged.
///
/// 32 hex characters followed by base64 that decodes to a non-empty whole
/// number of AES blocks. A match is a guess, not proof.
pub fn looks_like_envelope(value: &str) -> bool {
    let Ok((iv_hex, body)) = split_envelope(value) else {
        return false;
    };
    if !iv_hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }
    match STANDARD.decode(body) {
        Ok(bytes) => !bytes.is_empty() && bytes.len() % BLOCK_LEN == 0,
        Err(_) => false,
    }
}

fn split_envelope(envelope: &str) -> Result<(&str, &str)> {
    if envelope.len() < IV_HEX_LEN {
        return Err(Error::Decryption(format!(
            "Envelope too short: {} < {}",
            envelope.len(),
            IV_HEX_LEN
        )));
    }
    if !envelope.is_char_boundary(IV_HEX_LEN) {
        return Err(Error::Decryption("Envelope IV is not hex".to_string()));
    }
    Ok(envelope.split_at(IV_HEX_LEN))
}

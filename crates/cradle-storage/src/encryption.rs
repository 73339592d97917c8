//! Working key derivation
//!
//! The field key is SHA-256 of the long-lived secret held by the secret store.
//! Secrets must be high-entropy: there is no stretching.

use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

/// AES-256 key length
pub const KEY_LEN: usize = 32;

/// Working key for field encryption
pub struct EncryptionKey(Zeroizing<[u8; KEY_LEN]>);

impl EncryptionKey {
    /// Derive from the stored secret using SHA-256
    pub fn from_secret(secret: &str) -> Self {
        let hash = Sha256::digest(secret.as_bytes());
        Self(Zeroizing::new(hash.into()))
    }

    /// Get key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey([REDACTED])")
    }
}

//! Secret store integration
//!
//! The root encryption secret lives in a platform vault (Android Keystore,
//! iOS Keychain, ...). The storage layer only needs one operation from it:
//! return the named secret, creating it exactly once if it does not exist yet.
//! Platform bridges implement [`SecretStore`]; the two implementations here
//! cover tests and desktop development.

use crate::{Error, Result};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Random bytes in a generated secret
pub const SECRET_BYTES: usize = 32;

/// Create-once secret storage
///
/// Concurrent callers asking for the same missing secret must all converge on
/// a single stored value.
pub trait SecretStore: Send + Sync {
    /// Return the secret called `name`, creating and persisting it on first use
    fn get_or_create_secret(&self, name: &str) -> Result<Zeroizing<String>>;
}

/// Generate a fresh hex-encoded secret from the OS RNG
pub fn generate_secret() -> Zeroizing<String> {
    let mut bytes = Zeroizing::new([0u8; SECRET_BYTES]);
    OsRng.fill_bytes(&mut *bytes);
    Zeroizing::new(hex::encode(&*bytes))
}

/// Process-local secret store for tests
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, Zeroizing<String>>>,
}

impl MemorySecretStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with one secret
    pub fn with_secret(name: &str, secret: &str) -> Self {
        let store = Self::new();
        store
            .secrets
            .lock()
            .insert(name.to_string(), Zeroizing::new(secret.to_string()));
        store
    }
}

impl SecretStore for MemorySecretStore {
    fn get_or_create_secret(&self, name: &str) -> Result<Zeroizing<String>> {
        let mut secrets = self.secrets.lock();
        let secret = secrets
            .entry(name.to_string())
            .or_insert_with(generate_secret);
        Ok(secret.clone())
    }
}

/// One file per secret under a directory
///
/// New secrets are written to a temporary file and hard-linked into place, so
/// a secret file is either absent or complete and the first creator wins.
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    /// Use `dir` for secret files, creating it if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::SecretStore(format!(
                "Cannot create secret directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    /// Directory holding the secret files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn secret_path(&self, name: &str) -> Result<PathBuf> {
        validate_secret_name(name)?;
        Ok(self.dir.join(name))
    }

    fn read_secret(path: &Path) -> Result<Option<Zeroizing<String>>> {
        let mut file = match fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable(path, e)),
        };

        let mut secret = Zeroizing::new(String::new());
        file.read_to_string(&mut secret)
            .map_err(|e| unavailable(path, e))?;
        if secret.is_empty() {
            return Err(Error::SecretStore(format!(
                "Secret file {} is empty",
                path.display()
            )));
        }
        Ok(Some(secret))
    }

    fn write_temp(&self, name: &str, secret: &str) -> Result<PathBuf> {
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()));

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp).map_err(|e| unavailable(&tmp, e))?;
        file.write_all(secret.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| unavailable(&tmp, e))?;
        Ok(tmp)
    }
}

impl SecretStore for FileSecretStore {
    fn get_or_create_secret(&self, name: &str) -> Result<Zeroizing<String>> {
        let path = self.secret_path(name)?;
        if let Some(secret) = Self::read_secret(&path)? {
            return Ok(secret);
        }

        let secret = generate_secret();
        let tmp = self.write_temp(name, &secret)?;
        let linked = fs::hard_link(&tmp, &path);
        let _ = fs::remove_file(&tmp);

        match linked {
            Ok(()) => {
                tracing::debug!("Created secret {}", name);
                Ok(secret)
            }
            // Lost the race: converge on the winner's value
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Self::read_secret(&path)?
                .ok_or_else(|| {
                    Error::SecretStore(format!("Secret {} vanished after creation", name))
                }),
            Err(e) => Err(unavailable(&path, e)),
        }
    }
}

/// Secret names become file names: `[A-Za-z0-9._-]+`, not starting with `.`
pub fn validate_secret_name(name: &str) -> Result<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if name.is_empty() || name.starts_with('.') || !valid_chars {
        return Err(Error::Validation(format!("Invalid secret name: {:?}", name)));
    }
    Ok(())
}

fn unavailable(path: &Path, e: io::Error) -> Error {
    Error::SecretStore(format!("{}: {}", path.display(), e))
}

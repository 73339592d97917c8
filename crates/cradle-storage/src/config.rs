//! Store configuration
//!
//! Loaded from an optional JSON file, then overridden from the environment.

use crate::namespace::{validate_namespace, StorageKeys, DEFAULT_NAMESPACE};
use crate::secret_store::validate_secret_name;
use crate::security::DEFAULT_SECRET_NAME;
use crate::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Overrides [`StoreConfig::namespace`]
pub const ENV_NAMESPACE: &str = "CRADLE_NAMESPACE";
/// Overrides [`StoreConfig::data_dir`]
pub const ENV_DATA_DIR: &str = "CRADLE_DATA_DIR";
/// Overrides [`StoreConfig::secret_name`]
pub const ENV_SECRET_NAME: &str = "CRADLE_SECRET_NAME";

/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "cradle.db";

/// Secret directory name inside the data directory
pub const SECRETS_DIR: &str = "secrets";

/// Local data layer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Substrate key prefix
    pub namespace: String,
    /// Data directory; platform default when unset
    pub data_dir: Option<PathBuf>,
    /// Secret store entry holding the field-encryption secret
    pub secret_name: String,
    /// Also clear the guest flag when a remote session signs out
    pub clear_guest_on_sign_out: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            data_dir: None,
            secret_name: DEFAULT_SECRET_NAME.to_string(),
            clear_guest_on_sign_out: false,
        }
    }
}

impl StoreConfig {
    /// Load from a JSON file; missing keys take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("Invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CRADLE_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            self.namespace = namespace;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(secret_name) = lookup(ENV_SECRET_NAME) {
            self.secret_name = secret_name;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check namespace and secret name
    pub fn validate(&self) -> Result<()> {
        validate_namespace(&self.namespace)?;
        validate_secret_name(&self.secret_name)
            .map_err(|e| Error::Config(format!("secret_name: {}", e)))?;
        Ok(())
    }

    /// Key layout for this namespace
    pub fn storage_keys(&self) -> Result<StorageKeys> {
        StorageKeys::new(&self.namespace)
    }

    /// Configured data directory, or the platform data directory
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        ProjectDirs::from("org", "Cradle", "Cradle")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| Error::Config("Cannot determine a data directory".to_string()))
    }

    /// SQLite substrate file
    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(self.resolve_data_dir()?.join(DATABASE_FILE))
    }

    /// Directory for the file secret store
    pub fn secrets_dir(&self) -> Result<PathBuf> {
        Ok(self.resolve_data_dir()?.join(SECRETS_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.namespace, "cradle");
        assert_eq!(config.secret_name, "cradle.field-key");
        assert!(!config.clear_guest_on_sign_out);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cradle.json");
        std::fs::write(&path, r#"{ "namespace": "babylog", "clear_guest_on_sign_out": true }"#)
            .unwrap();

        let config = StoreConfig::load(&path).unwrap();
        assert_eq!(config.namespace, "babylog");
        assert!(config.clear_guest_on_sign_out);
        assert_eq!(config.secret_name, DEFAULT_SECRET_NAME);
    }

    #[test]
    fn test_load_rejects_bad_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cradle.json");
        std::fs::write(&path, r#"{ "namespace": "a:b" }"#).unwrap();

        assert!(matches!(StoreConfig::load(&path), Err(Error::Config(_))));
        assert!(matches!(
            StoreConfig::load(dir.path().join("missing.json")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_NAMESPACE, "test-ns"),
            (ENV_DATA_DIR, "/tmp/cradle-test"),
        ]
        .into_iter()
        .collect();

        let config = StoreConfig::default()
            .with_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.namespace, "test-ns");
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/cradle-test").join(DATABASE_FILE)
        );
        assert_eq!(
            config.secrets_dir().unwrap(),
            PathBuf::from("/tmp/cradle-test").join(SECRETS_DIR)
        );
    }

    #[test]
    fn test_invalid_secret_name_override() {
        let result = StoreConfig::default().with_overrides(|name| {
            (name == ENV_SECRET_NAME).then(|| "../up".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

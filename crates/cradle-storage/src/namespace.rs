//! Substrate key layout
//!
//! Every key the store writes lives under a single `<ns>:` prefix. Scalars use
//! fixed names; tables live under `<ns>:table:<name>`, except the reserved
//! `children` table which has its own key.

use crate::{Error, Result};

/// Default namespace prefix
pub const DEFAULT_NAMESPACE: &str = "cradle";

/// Name of the reserved children table
pub const CHILDREN_TABLE: &str = "children";

/// Derives substrate keys for one namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    namespace: String,
}

impl StorageKeys {
    /// Create key layout for `namespace`
    pub fn new(namespace: &str) -> Result<Self> {
        validate_namespace(namespace)?;
        Ok(Self {
            namespace: namespace.to_string(),
        })
    }

    /// Namespace prefix
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Guest flag key
    pub fn is_guest(&self) -> String {
        format!("{}:isGuest", self.namespace)
    }

    /// Guest id key
    pub fn guest_id(&self) -> String {
        format!("{}:guestId", self.namespace)
    }

    /// Active child key
    pub fn active_child_id(&self) -> String {
        format!("{}:activeChildId", self.namespace)
    }

    /// Children table key
    pub fn children(&self) -> String {
        format!("{}:children", self.namespace)
    }

    /// Key for an arbitrary table
    pub fn table(&self, name: &str) -> String {
        if name == CHILDREN_TABLE {
            return self.children();
        }
        format!("{}:table:{}", self.namespace, name)
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Namespace must be non-empty and must not contain the `:` separator
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() {
        return Err(Error::Config("Namespace cannot be empty".to_string()));
    }
    if namespace.contains(':') {
        return Err(Error::Config(format!(
            "Namespace must not contain ':' (got {:?})",
            namespace
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let keys = StorageKeys::new("babylog").unwrap();
        assert_eq!(keys.is_guest(), "babylog:isGuest");
        assert_eq!(keys.guest_id(), "babylog:guestId");
        assert_eq!(keys.active_child_id(), "babylog:activeChildId");
        assert_eq!(keys.children(), "babylog:children");
        assert_eq!(keys.table("diaper_logs"), "babylog:table:diaper_logs");
    }

    #[test]
    fn test_children_table_uses_reserved_key() {
        let keys = StorageKeys::default();
        assert_eq!(keys.table(CHILDREN_TABLE), keys.children());
    }

    #[test]
    fn test_invalid_namespace() {
        assert!(StorageKeys::new("").is_err());
        assert!(StorageKeys::new("a:b").is_err());
    }
}

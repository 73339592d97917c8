//! Local table store for guest users
//!
//! Gives an unauthenticated device table semantics (insert/list/update/delete
//! with generated ids and creation timestamps) on top of a flat key-value
//! substrate. Each table is one JSON array under one substrate key and every
//! mutation rewrites the whole array.

use crate::models::{Child, Fields, Row, CREATED_AT_FIELD, ID_FIELD};
use crate::namespace::{StorageKeys, CHILDREN_TABLE};
use crate::substrate::KvSubstrate;
use crate::table::{Table, TableRecord};
use crate::{Error, Result};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Stored under the guest flag key while guest mode is on
const GUEST_FLAG_VALUE: &str = "true";

/// One element of a stored table array
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Row(Row),
    /// Not a row; written back unchanged
    Unreadable(Value),
}

impl StoredEntry {
    fn row(&self) -> Option<&Row> {
        match self {
            StoredEntry::Row(row) => Some(row),
            StoredEntry::Unreadable(_) => None,
        }
    }

    fn row_mut(&mut self) -> Option<&mut Row> {
        match self {
            StoredEntry::Row(row) => Some(row),
            StoredEntry::Unreadable(_) => None,
        }
    }
}

/// Table and scalar storage on top of a [`KvSubstrate`]
pub struct LocalStore {
    substrate: Arc<dyn KvSubstrate>,
    keys: StorageKeys,
    // Held across every read-modify-write so interleaved mutations cannot
    // drop each other's rows.
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Create a store using the default namespace
    pub fn new(substrate: Arc<dyn KvSubstrate>) -> Self {
        Self::with_keys(substrate, StorageKeys::default())
    }

    /// Create a store with an explicit key layout
    pub fn with_keys(substrate: Arc<dyn KvSubstrate>, keys: StorageKeys) -> Self {
        Self {
            substrate,
            keys,
            write_lock: Mutex::new(()),
        }
    }

    /// Key layout in use
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Typed view over the table named by `T::TABLE`
    pub fn table<T: TableRecord>(&self) -> Table<'_, T> {
        Table::new(self)
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Insert a row, assigning `id` and `created_at`
    ///
    /// Caller-supplied `id` / `created_at` fields are discarded.
    pub fn insert(&self, table: &str, fields: Fields) -> Result<Row> {
        let _guard = self.write_lock.lock();
        self.append_row(table, fields)
    }

    /// All rows of `table` in insertion order
    ///
    /// Never fails: absent, unreadable or corrupt data yields an empty list.
    /// Elements that are not rows are skipped.
    pub fn list(&self, table: &str) -> Vec<Row> {
        let entries = match self.load_entries(table) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to read table {}: {}", table, e);
                return Vec::new();
            }
        };

        let total = entries.len();
        let rows: Vec<Row> = entries
            .into_iter()
            .filter_map(|entry| match entry {
                StoredEntry::Row(row) => Some(row),
                StoredEntry::Unreadable(_) => None,
            })
            .collect();
        if rows.len() < total {
            tracing::warn!(
                "Skipping {} unreadable entries in table {}",
                total - rows.len(),
                table
            );
        }
        rows
    }

    /// Find a row by id
    pub fn find(&self, table: &str, id: &str) -> Option<Row> {
        self.list(table).into_iter().find(|row| row.id == id)
    }

    /// Shallow-merge `patch` into the row with `id`
    ///
    /// Returns `false` without writing when no row matches. `id` and
    /// `created_at` are immutable and ignored if present in the patch.
    pub fn update(&self, table: &str, id: &str, patch: Fields) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let mut entries = self.load_entries(table)?;

        let Some(row) = find_row_mut(&mut entries, id) else {
            return Ok(false);
        };
        merge_fields(&mut row.fields, patch);

        self.save_entries(table, &entries)?;
        tracing::debug!("Updated row in table {}", table);
        Ok(true)
    }

    /// Replace all caller-defined fields of the row with `id`
    pub(crate) fn replace(&self, table: &str, id: &str, mut fields: Fields) -> Result<bool> {
        strip_system_fields(&mut fields);

        let _guard = self.write_lock.lock();
        let mut entries = self.load_entries(table)?;

        let Some(row) = find_row_mut(&mut entries, id) else {
            return Ok(false);
        };
        row.fields = fields;

        self.save_entries(table, &entries)?;
        tracing::debug!("Replaced row in table {}", table);
        Ok(true)
    }

    /// Delete the row with `id`, `false` when nothing matched
    pub fn delete(&self, table: &str, id: &str) -> Result<bool> {
        self.delete_if(table, id, |_| true)
    }

    /// Delete the row with `id` only if `allow` accepts it
    pub(crate) fn delete_if<F>(&self, table: &str, id: &str, allow: F) -> Result<bool>
    where
        F: Fn(&Row) -> bool,
    {
        let _guard = self.write_lock.lock();
        let mut entries = self.load_entries(table)?;

        let Some(pos) = entries
            .iter()
            .position(|entry| entry.row().is_some_and(|row| row.id == id && allow(row)))
        else {
            return Ok(false);
        };
        entries.remove(pos);

        self.save_entries(table, &entries)?;
        tracing::debug!("Deleted row from table {} ({} remaining)", table, entries.len());
        Ok(true)
    }

    // =========================================================================
    // Scalars
    // =========================================================================

    /// Whether the guest flag is set
    pub fn is_guest(&self) -> Result<bool> {
        let value = self.substrate.get_string(&self.keys.is_guest())?;
        Ok(value.as_deref() == Some(GUEST_FLAG_VALUE))
    }

    /// Set the guest flag
    pub fn set_guest_flag(&self) -> Result<()> {
        self.substrate
            .set_string(&self.keys.is_guest(), GUEST_FLAG_VALUE)
    }

    /// Clear the guest flag
    pub fn clear_guest_flag(&self) -> Result<()> {
        self.substrate.remove_string(&self.keys.is_guest())
    }

    /// Guest id, if one was ever created on this device
    pub fn guest_id(&self) -> Result<Option<String>> {
        self.substrate.get_string(&self.keys.guest_id())
    }

    /// Return the guest id, creating it on first call
    pub fn ensure_guest_id(&self) -> Result<String> {
        let _guard = self.write_lock.lock();
        let key = self.keys.guest_id();

        if let Some(existing) = self.substrate.get_string(&key)? {
            return Ok(existing);
        }

        let guest_id = format!("guest-{}", Uuid::new_v4());
        self.substrate.set_string(&key, &guest_id)?;
        tracing::debug!("Created guest id");
        Ok(guest_id)
    }

    /// Currently active child id
    pub fn active_child_id(&self) -> Result<Option<String>> {
        self.substrate.get_string(&self.keys.active_child_id())
    }

    /// Make `child_id` the active child
    pub fn set_active_child_id(&self, child_id: &str) -> Result<()> {
        self.substrate
            .set_string(&self.keys.active_child_id(), child_id)
    }

    /// Forget the active child
    pub fn clear_active_child_id(&self) -> Result<()> {
        self.substrate.remove_string(&self.keys.active_child_id())
    }

    // =========================================================================
    // Children
    // =========================================================================

    /// Insert a child; the first child becomes active if none is set
    pub fn create_child(&self, name: &str) -> Result<Child> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Child name cannot be empty".to_string()));
        }

        let mut fields = Fields::new();
        fields.insert(Child::NAME_FIELD.to_string(), Value::String(name.to_string()));

        let _guard = self.write_lock.lock();
        let row = self.append_row(CHILDREN_TABLE, fields)?;

        let active_key = self.keys.active_child_id();
        if self.substrate.get_string(&active_key)?.is_none() {
            self.substrate.set_string(&active_key, &row.id)?;
            tracing::debug!("First child created, now active");
        }

        Ok(Child {
            id: row.id,
            name: name.to_string(),
            created_at: row.created_at,
        })
    }

    /// All children in creation order
    pub fn children(&self) -> Vec<Child> {
        self.list(CHILDREN_TABLE)
            .iter()
            .filter_map(Child::from_row)
            .collect()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Append under an already-held write lock
    fn append_row(&self, table: &str, mut fields: Fields) -> Result<Row> {
        strip_system_fields(&mut fields);
        let row = Row {
            id: Uuid::new_v4().to_string(),
            created_at: now_timestamp(),
            fields,
        };

        let mut entries = self.load_entries(table)?;
        entries.push(StoredEntry::Row(row.clone()));
        self.save_entries(table, &entries)?;

        tracing::debug!("Inserted row into table {} ({} entries)", table, entries.len());
        Ok(row)
    }

    /// Substrate failures propagate. A value that is not a JSON array reads
    /// as empty; array elements that are not rows are kept as they are.
    fn load_entries(&self, table: &str) -> Result<Vec<StoredEntry>> {
        let Some(raw) = self.substrate.get_string(&self.keys.table(table))? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<StoredEntry>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!("Discarding unreadable data for table {}: {}", table, e);
                Ok(Vec::new())
            }
        }
    }

    fn save_entries(&self, table: &str, entries: &[StoredEntry]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        self.substrate.set_string(&self.keys.table(table), &raw)
    }
}

/// Current instant as RFC 3339 at full clock precision (`2024-05-01T08:30:00.123456789Z`)
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn find_row_mut<'a>(entries: &'a mut [StoredEntry], id: &str) -> Option<&'a mut Row> {
    entries
        .iter_mut()
        .filter_map(StoredEntry::row_mut)
        .find(|row| row.id == id)
}

fn strip_system_fields(fields: &mut Fields) {
    fields.remove(ID_FIELD);
    fields.remove(CREATED_AT_FIELD);
}

fn merge_fields(target: &mut Fields, mut patch: Fields) {
    strip_system_fields(&mut patch);
    for (name, value) in patch {
        target.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substrate::MemorySubstrate;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn setup() -> (Arc<MemorySubstrate>, LocalStore) {
        let substrate = Arc::new(MemorySubstrate::new());
        let store = LocalStore::new(substrate.clone());
        (substrate, store)
    }

    #[test]
    fn test_insert_overwrites_system_fields() {
        let (_, store) = setup();

        let row = store
            .insert(
                "t",
                fields(json!({ "id": "mine", "created_at": "yesterday", "a": 1 })),
            )
            .unwrap();

        assert_ne!(row.id, "mine");
        assert_ne!(row.created_at, "yesterday");
        assert!(row.created_at_utc().is_some());
        assert_eq!(row.get("a"), Some(&json!(1)));
        assert!(row.get("id").is_none());
    }

    #[test]
    fn test_update_ignores_system_fields_in_patch() {
        let (_, store) = setup();
        let row = store.insert("t", fields(json!({ "a": 1 }))).unwrap();

        let updated = store
            .update(
                "t",
                &row.id,
                fields(json!({ "id": "other", "created_at": "never", "a": 2 })),
            )
            .unwrap();
        assert!(updated);

        let stored = store.find("t", &row.id).unwrap();
        assert_eq!(stored.created_at, row.created_at);
        assert_eq!(stored.get("a"), Some(&json!(2)));
    }

    #[test]
    fn test_rows_land_under_namespaced_key() {
        let substrate = Arc::new(MemorySubstrate::new());
        let store = LocalStore::with_keys(substrate.clone(), StorageKeys::new("ns").unwrap());

        store.insert("diaper_logs", Fields::new()).unwrap();
        store.create_child("Alice").unwrap();

        assert_eq!(
            substrate.keys(),
            vec![
                "ns:activeChildId".to_string(),
                "ns:children".to_string(),
                "ns:table:diaper_logs".to_string(),
            ]
        );
    }

    #[test]
    fn test_ensure_guest_id_is_stable() {
        let (_, store) = setup();
        assert_eq!(store.guest_id().unwrap(), None);

        let first = store.ensure_guest_id().unwrap();
        let second = store.ensure_guest_id().unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("guest-"));
    }

    #[test]
    fn test_guest_flag_marker() {
        let (substrate, store) = setup();
        assert!(!store.is_guest().unwrap());

        store.set_guest_flag().unwrap();
        assert!(store.is_guest().unwrap());

        // Any other value does not count as guest mode
        substrate.set_string("cradle:isGuest", "false").unwrap();
        assert!(!store.is_guest().unwrap());

        store.clear_guest_flag().unwrap();
        assert!(!store.is_guest().unwrap());
    }

    #[test]
    fn test_unreadable_entries_survive_rewrites() {
        let (substrate, store) = setup();
        let good = store.insert("t", fields(json!({ "a": 1 }))).unwrap();

        let raw = substrate.get_string("cradle:table:t").unwrap().unwrap();
        let mut array: Vec<Value> = serde_json::from_str(&raw).unwrap();
        array.push(json!({ "id": "x", "created_at": 5 }));
        substrate
            .set_string("cradle:table:t", &serde_json::to_string(&array).unwrap())
            .unwrap();

        assert_eq!(store.list("t").len(), 1);
        assert!(!store.delete("t", "x").unwrap());

        let second = store.insert("t", fields(json!({ "a": 2 }))).unwrap();
        assert!(store.update("t", &good.id, fields(json!({ "a": 3 }))).unwrap());

        let ids: Vec<String> = store.list("t").into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![good.id, second.id]);

        let raw = substrate.get_string("cradle:table:t").unwrap().unwrap();
        let array: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array[1], json!({ "id": "x", "created_at": 5 }));
    }

    #[test]
    fn test_delete_if_respects_predicate() {
        let (_, store) = setup();
        let row = store.insert("t", fields(json!({ "owner": "a" }))).unwrap();

        assert!(!store
            .delete_if("t", &row.id, |r| r.get_str("owner") == Some("b"))
            .unwrap());
        assert!(store.find("t", &row.id).is_some());

        assert!(store
            .delete_if("t", &row.id, |r| r.get_str("owner") == Some("a"))
            .unwrap());
        assert!(store.find("t", &row.id).is_none());
    }

    #[test]
    fn test_create_child_rejects_blank_name() {
        let (_, store) = setup();
        assert!(matches!(store.create_child("   "), Err(Error::Validation(_))));
        assert!(store.children().is_empty());
        assert_eq!(store.active_child_id().unwrap(), None);
    }
}

//! Typed views over local tables

use crate::local_store::LocalStore;
use crate::models::{Fields, Row};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;

/// A record type stored in its own table
pub trait TableRecord: Serialize + DeserializeOwned {
    /// Table name
    const TABLE: &'static str;
}

/// A record logged against one child
pub trait LogRecord: TableRecord {
    /// Child this entry belongs to
    fn child_id(&self) -> &str;
}

/// A typed row: system fields plus the record body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    /// Row id
    pub id: String,
    /// Creation timestamp
    pub created_at: String,
    /// Record body
    #[serde(flatten)]
    pub data: T,
}

impl<T: DeserializeOwned> Record<T> {
    /// Decode a raw row
    pub fn from_row(row: Row) -> Result<Self> {
        let Row {
            id,
            created_at,
            fields,
        } = row;
        let data = serde_json::from_value(Value::Object(fields))?;
        Ok(Self {
            id,
            created_at,
            data,
        })
    }
}

/// Encode a record body as row fields
pub fn to_fields<T: Serialize>(data: &T) -> Result<Fields> {
    match serde_json::to_value(data)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::Validation(format!(
            "Record must serialize to a JSON object, got {}",
            value_kind(&other)
        ))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Typed access to the table named by `T::TABLE`
pub struct Table<'a, T> {
    store: &'a LocalStore,
    _record: PhantomData<fn() -> T>,
}

impl<'a, T: TableRecord> Table<'a, T> {
    pub(crate) fn new(store: &'a LocalStore) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// Table name
    pub fn name(&self) -> &'static str {
        T::TABLE
    }

    /// Insert a record
    pub fn insert(&self, data: &T) -> Result<Record<T>> {
        let row = self.store.insert(T::TABLE, to_fields(data)?)?;
        Record::from_row(row)
    }

    /// All records that decode as `T`; others are skipped
    pub fn list(&self) -> Vec<Record<T>> {
        self.store
            .list(T::TABLE)
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                match Record::from_row(row) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!("Skipping row {} in {}: {}", id, T::TABLE, e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Find a record by id
    pub fn find(&self, id: &str) -> Option<Record<T>> {
        self.list().into_iter().find(|record| record.id == id)
    }

    /// Replace the body of the record with `id`, keeping id and timestamp
    pub fn update(&self, id: &str, data: &T) -> Result<bool> {
        self.store.replace(T::TABLE, id, to_fields(data)?)
    }

    /// Delete the record with `id`
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(T::TABLE, id)
    }
}

impl<'a, T: LogRecord> Table<'a, T> {
    /// Records logged against `child_id`, in insertion order
    pub fn list_for_child(&self, child_id: &str) -> Vec<Record<T>> {
        self.list()
            .into_iter()
            .filter(|record| record.data.child_id() == child_id)
            .collect()
    }

    /// Delete the record with `id` only if it belongs to `child_id`
    pub fn delete_for_child(&self, child_id: &str, id: &str) -> Result<bool> {
        self.store.delete_if(T::TABLE, id, |row| {
            Record::<T>::from_row(row.clone())
                .map(|record| record.data.child_id() == child_id)
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substrate::MemorySubstrate;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        child_id: String,
        text: String,
    }

    impl TableRecord for Note {
        const TABLE: &'static str = "notes";
    }

    impl LogRecord for Note {
        fn child_id(&self) -> &str {
            &self.child_id
        }
    }

    fn note(child: &str, text: &str) -> Note {
        Note {
            child_id: child.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_typed_insert_and_list() {
        let store = LocalStore::new(Arc::new(MemorySubstrate::new()));
        let notes = store.table::<Note>();

        let first = notes.insert(&note("c1", "hello")).unwrap();
        notes.insert(&note("c2", "world")).unwrap();

        let all = notes.list();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], first);
        assert_eq!(notes.list_for_child("c2")[0].data.text, "world");
        assert!(notes.list_for_child("c3").is_empty());
    }

    #[test]
    fn test_update_replaces_body() {
        let store = LocalStore::new(Arc::new(MemorySubstrate::new()));
        let notes = store.table::<Note>();
        let record = notes.insert(&note("c1", "draft")).unwrap();

        assert!(notes.update(&record.id, &note("c1", "final")).unwrap());
        let stored = notes.find(&record.id).unwrap();
        assert_eq!(stored.data.text, "final");
        assert_eq!(stored.created_at, record.created_at);

        assert!(!notes.update("missing", &note("c1", "x")).unwrap());
    }

    #[test]
    fn test_list_skips_foreign_rows() {
        let store = LocalStore::new(Arc::new(MemorySubstrate::new()));
        store.insert("notes", Fields::new()).unwrap();
        store.table::<Note>().insert(&note("c1", "kept")).unwrap();

        let notes = store.table::<Note>().list();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].data.text, "kept");
    }

    #[test]
    fn test_delete_for_child_leaves_other_children_alone() {
        let store = LocalStore::new(Arc::new(MemorySubstrate::new()));
        let notes = store.table::<Note>();
        let theirs = notes.insert(&note("c2", "not yours")).unwrap();

        assert!(!notes.delete_for_child("c1", &theirs.id).unwrap());
        assert!(notes.find(&theirs.id).is_some());

        assert!(notes.delete_for_child("c2", &theirs.id).unwrap());
        assert!(notes.find(&theirs.id).is_none());
        assert!(!notes.delete_for_child("c2", &theirs.id).unwrap());
    }

    #[test]
    fn test_to_fields_rejects_non_objects() {
        assert!(matches!(to_fields(&"text"), Err(Error::Validation(_))));
        assert!(to_fields(&note("c1", "x")).is_ok());
    }
}

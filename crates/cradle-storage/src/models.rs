//! Stored row models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-defined row content
pub type Fields = Map<String, Value>;

/// System-assigned row id field
pub const ID_FIELD: &str = "id";

/// System-assigned creation timestamp field
pub const CREATED_AT_FIELD: &str = "created_at";

/// One row of a local table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Unique id, assigned at insertion
    pub id: String,
    /// RFC 3339 creation timestamp, assigned at insertion
    pub created_at: String,
    /// Everything else, opaque to the store
    #[serde(flatten)]
    pub fields: Fields,
}

impl Row {
    /// Get a caller-defined field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a caller-defined field as a string
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Parsed creation timestamp
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

/// Child record in the reserved `children` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    /// Child id
    pub id: String,
    /// Display name
    pub name: String,
    /// Created timestamp
    pub created_at: String,
}

impl Child {
    /// Name field in the children table
    pub const NAME_FIELD: &'static str = "name";

    /// Read a child out of a children-table row
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            id: row.id.clone(),
            name: row.get_str(Self::NAME_FIELD)?.to_string(),
            created_at: row.created_at.clone(),
        })
    }
}

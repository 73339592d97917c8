//! Local data layer for Cradle
//!
//! Keeps infant-care data on the device while the user is in guest mode,
//! and encrypts sensitive fields wherever they end up.
//!
//! ## Pieces
//!
//! - **Local table store**: JSON-array tables on a key-value substrate
//!   (in-memory or SQLite), with ids and creation timestamps assigned on insert
//! - **Field encryption**: AES-256-CBC/PKCS7 with a fresh IV per value, key
//!   derived from a secret held in a [`SecretStore`]
//! - **Session**: guest mode vs. remote sign-in, and guest-mode children

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod database;
pub mod encryption;
pub mod error;
pub mod field;
pub mod local_store;
pub mod logs;
pub mod models;
pub mod namespace;
pub mod secret_store;
pub mod security;
pub mod session;
pub mod substrate;
pub mod table;

pub use config::StoreConfig;
pub use database::SqliteSubstrate;
pub use encryption::EncryptionKey;
pub use error::{Error, Result};
pub use field::{Field, DECRYPTION_FAILED_PLACEHOLDER};
pub use local_store::{now_timestamp, LocalStore};
pub use logs::{
    DiaperKind, DiaperLog, FeedingLog, FeedingMethod, HealthCategory, HealthLog, LogKind,
    Milestone, NursingLog, NursingSide, SleepLog,
};
pub use models::*;
pub use namespace::{StorageKeys, DEFAULT_NAMESPACE};
pub use secret_store::{FileSecretStore, MemorySecretStore, SecretStore};
pub use security::{looks_like_envelope, FieldCodec, DEFAULT_SECRET_NAME};
pub use session::{DataRoute, OfflineAuth, RemoteAuth, RemoteSession, Session, SessionState};
pub use substrate::{KvSubstrate, MemorySubstrate};
pub use table::{LogRecord, Record, Table, TableRecord};

//! Opened data layer for one CLI invocation

use anyhow::{bail, Context};
use cradle_storage::{
    DataRoute, FieldCodec, FileSecretStore, LocalStore, OfflineAuth, Session, SqliteSubstrate,
    StoreConfig,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Store, session and codec wired from config
pub struct App {
    pub session: Session,
    pub codec: FieldCodec,
    pub data_dir: PathBuf,
}

impl App {
    /// Load config (file, then environment) and open the stores it points at
    pub fn open(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(path) => StoreConfig::load(path)?,
            None => StoreConfig::default(),
        }
        .with_env_overrides()?;

        let data_dir = config.resolve_data_dir()?;
        let db_path = config.database_path()?;
        let substrate = SqliteSubstrate::open(&db_path)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;
        let secrets = FileSecretStore::new(config.secrets_dir()?)?;

        let store = Arc::new(LocalStore::with_keys(
            Arc::new(substrate),
            config.storage_keys()?,
        ));
        // No backend in this build
        let session = Session::with_config(store, Arc::new(OfflineAuth), &config);
        session.initialize()?;

        let codec = FieldCodec::with_secret_name(Arc::new(secrets), &config.secret_name);

        tracing::debug!("Using data directory {}", data_dir.display());
        Ok(Self {
            session,
            codec,
            data_dir,
        })
    }

    /// Fail unless guest mode is on
    pub fn require_guest(&self) -> anyhow::Result<()> {
        if self.session.route() != DataRoute::Local {
            bail!("Not in guest mode; run `cradle guest enter` first");
        }
        Ok(())
    }

    /// Active child id, or an error telling the user to pick one
    pub fn active_child_id(&self) -> anyhow::Result<String> {
        self.require_guest()?;
        self.session
            .active_child_id()?
            .context("No active child; run `cradle child add <name>` first")
    }
}

/// Print as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! Guest / authenticated session state
//!
//! A [`Session`] decides where data goes. With a remote session everything
//! routes to the backend and the local guest flag is ignored, even if it is
//! still set. Without one, the guest flag selects the local table store.

use crate::config::StoreConfig;
use crate::local_store::LocalStore;
use crate::models::Child;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;

/// Authenticated remote user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSession {
    /// Backend user id
    pub user_id: String,
    /// Account email, if the provider exposes it
    pub email: Option<String>,
}

/// Remote authentication provider
pub trait RemoteAuth: Send + Sync {
    /// Current remote session, if any
    fn current_session(&self) -> Result<Option<RemoteSession>>;

    /// End the remote session
    fn sign_out(&self) -> Result<()>;
}

/// Provider for builds without a backend: never signed in
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineAuth;

impl RemoteAuth for OfflineAuth {
    fn current_session(&self) -> Result<Option<RemoteSession>> {
        Ok(None)
    }

    fn sign_out(&self) -> Result<()> {
        Ok(())
    }
}

/// Session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Neither signed in nor in guest mode
    Unknown,
    /// Guest mode, data stays on the device
    Guest {
        /// Stable per-installation guest id
        guest_id: String,
    },
    /// Signed in to the remote backend
    Authenticated(RemoteSession),
}

/// Where reads and writes should go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRoute {
    /// Nowhere yet: the user has to sign in or enter guest mode
    None,
    /// Local table store
    Local,
    /// Remote backend
    Remote,
}

/// Process-lifetime session owner
pub struct Session {
    store: Arc<LocalStore>,
    remote: Arc<dyn RemoteAuth>,
    clear_guest_on_sign_out: bool,
    state: RwLock<SessionState>,
}

impl Session {
    /// Create with default settings; call [`Session::initialize`] next
    pub fn new(store: Arc<LocalStore>, remote: Arc<dyn RemoteAuth>) -> Self {
        Self::with_config(store, remote, &StoreConfig::default())
    }

    /// Create with explicit settings
    pub fn with_config(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteAuth>,
        config: &StoreConfig,
    ) -> Self {
        Self {
            store,
            remote,
            clear_guest_on_sign_out: config.clear_guest_on_sign_out,
            state: RwLock::new(SessionState::Unknown),
        }
    }

    /// Underlying local store
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// Resolve the starting state: remote session first, then the guest flag
    pub fn initialize(&self) -> Result<SessionState> {
        let state = if let Some(remote) = self.remote.current_session()? {
            SessionState::Authenticated(remote)
        } else if self.store.is_guest()? {
            SessionState::Guest {
                guest_id: self.store.ensure_guest_id()?,
            }
        } else {
            SessionState::Unknown
        };

        tracing::debug!("Session initialized: {:?}", route_of(&state));
        *self.state.write() = state.clone();
        Ok(state)
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    /// In guest mode
    pub fn is_guest(&self) -> bool {
        matches!(*self.state.read(), SessionState::Guest { .. })
    }

    /// Signed in remotely
    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.read(), SessionState::Authenticated(_))
    }

    /// Where data should go right now
    pub fn route(&self) -> DataRoute {
        route_of(&self.state.read())
    }

    /// Enter guest mode, creating the guest id on first use
    pub fn enter_guest(&self) -> Result<String> {
        let guest_id = self.store.ensure_guest_id()?;
        self.store.set_guest_flag()?;

        *self.state.write() = SessionState::Guest {
            guest_id: guest_id.clone(),
        };
        tracing::info!("Entered guest mode");
        Ok(guest_id)
    }

    /// Leave guest mode; local data is kept for the next visit
    pub fn exit_guest(&self) -> Result<()> {
        self.store.clear_guest_flag()?;

        let mut state = self.state.write();
        if matches!(*state, SessionState::Guest { .. }) {
            *state = SessionState::Unknown;
        }
        tracing::info!("Exited guest mode");
        Ok(())
    }

    /// Record a successful remote sign-in or sign-up
    ///
    /// The guest flag is left alone; it is simply no longer consulted.
    pub fn signed_in(&self, session: RemoteSession) {
        *self.state.write() = SessionState::Authenticated(session);
        tracing::info!("Signed in");
    }

    /// End the remote session
    pub fn sign_out(&self) -> Result<()> {
        if self.is_authenticated() {
            self.remote.sign_out()?;
        }
        if self.clear_guest_on_sign_out {
            self.store.clear_guest_flag()?;
        }

        *self.state.write() = SessionState::Unknown;
        tracing::info!("Signed out");
        Ok(())
    }

    // =========================================================================
    // Children (guest mode)
    // =========================================================================

    /// Create a child; the first one becomes active
    pub fn create_child(&self, name: &str) -> Result<Child> {
        self.require_guest()?;
        self.store.create_child(name)
    }

    /// Children in creation order
    pub fn children(&self) -> Result<Vec<Child>> {
        self.require_guest()?;
        Ok(self.store.children())
    }

    /// Active child id
    pub fn active_child_id(&self) -> Result<Option<String>> {
        self.require_guest()?;
        self.store.active_child_id()
    }

    /// Active child record
    pub fn active_child(&self) -> Result<Option<Child>> {
        let Some(id) = self.active_child_id()? else {
            return Ok(None);
        };
        Ok(self.store.children().into_iter().find(|child| child.id == id))
    }

    /// Select the active child; it must exist
    pub fn set_active_child_id(&self, child_id: &str) -> Result<()> {
        self.require_guest()?;
        if !self.store.children().iter().any(|child| child.id == child_id) {
            return Err(Error::Validation(format!("Unknown child: {}", child_id)));
        }
        self.store.set_active_child_id(child_id)
    }

    fn require_guest(&self) -> Result<()> {
        match self.route() {
            DataRoute::Local => Ok(()),
            DataRoute::Remote => Err(Error::Session(
                "Signed in: children are managed by the remote backend".to_string(),
            )),
            DataRoute::None => Err(Error::Session(
                "Not in guest mode and not signed in".to_string(),
            )),
        }
    }
}

fn route_of(state: &SessionState) -> DataRoute {
    match state {
        SessionState::Unknown => DataRoute::None,
        SessionState::Guest { .. } => DataRoute::Local,
        SessionState::Authenticated(_) => DataRoute::Remote,
    }
}

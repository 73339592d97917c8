//! Session tests: guest mode, remote precedence and guest-mode children

use cradle_storage::{
    DataRoute, Error, Fields, LocalStore, MemorySubstrate, OfflineAuth, RemoteAuth,
    RemoteSession, Result, Session, SessionState, StoreConfig,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Remote provider with a settable session
#[derive(Default)]
struct MockAuth {
    session: Mutex<Option<RemoteSession>>,
    sign_outs: AtomicUsize,
}

impl MockAuth {
    fn signed_in(user_id: &str) -> Self {
        Self {
            session: Mutex::new(Some(remote(user_id))),
            sign_outs: AtomicUsize::new(0),
        }
    }
}

impl RemoteAuth for MockAuth {
    fn current_session(&self) -> Result<Option<RemoteSession>> {
        Ok(self.session.lock().clone())
    }

    fn sign_out(&self) -> Result<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        *self.session.lock() = None;
        Ok(())
    }
}

/// Remote provider whose backend is down
struct FailingAuth;

impl RemoteAuth for FailingAuth {
    fn current_session(&self) -> Result<Option<RemoteSession>> {
        Err(Error::Session("backend unreachable".to_string()))
    }

    fn sign_out(&self) -> Result<()> {
        Err(Error::Session("backend unreachable".to_string()))
    }
}

fn remote(user_id: &str) -> RemoteSession {
    RemoteSession {
        user_id: user_id.to_string(),
        email: Some(format!("{}@example.com", user_id)),
    }
}

fn store() -> Arc<LocalStore> {
    Arc::new(LocalStore::new(Arc::new(MemorySubstrate::new())))
}

// =============================================================================
// Initialization
// =============================================================================

#[test]
fn test_initialize_restores_guest_mode() {
    let store = store();
    store.set_guest_flag().unwrap();

    let session = Session::new(store.clone(), Arc::new(OfflineAuth));
    let state = session.initialize().unwrap();

    let guest_id = store.guest_id().unwrap().unwrap();
    assert_eq!(state, SessionState::Guest { guest_id });
    assert_eq!(session.route(), DataRoute::Local);
}

#[test]
fn test_remote_session_wins_over_guest_flag() {
    let store = store();
    store.set_guest_flag().unwrap();

    let session = Session::new(store.clone(), Arc::new(MockAuth::signed_in("u1")));
    assert_eq!(
        session.initialize().unwrap(),
        SessionState::Authenticated(remote("u1"))
    );
    assert_eq!(session.route(), DataRoute::Remote);
    assert!(!session.is_guest());

    // The flag is ignored, not cleared
    assert!(store.is_guest().unwrap());
}

#[test]
fn test_initialize_propagates_remote_failure() {
    let session = Session::new(store(), Arc::new(FailingAuth));
    assert!(matches!(session.initialize(), Err(Error::Session(_))));
    assert_eq!(session.state(), SessionState::Unknown);
}

// =============================================================================
// Guest mode
// =============================================================================

#[test]
fn test_guest_id_is_stable_across_reentry() {
    let session = Session::new(store(), Arc::new(OfflineAuth));

    let first = session.enter_guest().unwrap();
    session.exit_guest().unwrap();
    assert_eq!(session.route(), DataRoute::None);
    let second = session.enter_guest().unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_guest_data_survives_exit() {
    let store = store();
    let session = Session::new(store.clone(), Arc::new(OfflineAuth));

    session.enter_guest().unwrap();
    let row = store.insert("sleep_logs", Fields::new()).unwrap();
    session.exit_guest().unwrap();
    assert!(!store.is_guest().unwrap());

    session.enter_guest().unwrap();
    assert!(store.find("sleep_logs", &row.id).is_some());
}

#[test]
fn test_guest_mode_survives_restart() {
    let store = store();
    let guest_id = {
        let session = Session::new(store.clone(), Arc::new(OfflineAuth));
        session.enter_guest().unwrap()
    };

    let session = Session::new(store, Arc::new(OfflineAuth));
    assert_eq!(session.initialize().unwrap(), SessionState::Guest { guest_id });
}

// =============================================================================
// Sign in / sign out
// =============================================================================

#[test]
fn test_signed_in_routes_remote() {
    let session = Session::new(store(), Arc::new(OfflineAuth));
    session.enter_guest().unwrap();

    session.signed_in(remote("u2"));
    assert!(session.is_authenticated());
    assert_eq!(session.route(), DataRoute::Remote);
    assert!(matches!(session.children(), Err(Error::Session(_))));
}

#[test]
fn test_sign_out_keeps_guest_flag_by_default() {
    let store = store();
    store.set_guest_flag().unwrap();
    let auth = Arc::new(MockAuth::signed_in("u1"));
    let session = Session::new(store.clone(), auth.clone());
    session.initialize().unwrap();

    session.sign_out().unwrap();
    assert_eq!(auth.sign_outs.load(Ordering::SeqCst), 1);
    assert_eq!(session.state(), SessionState::Unknown);
    assert!(store.is_guest().unwrap());

    // Next launch falls back to guest mode
    assert!(matches!(
        session.initialize().unwrap(),
        SessionState::Guest { .. }
    ));
}

#[test]
fn test_sign_out_can_clear_guest_flag() {
    let store = store();
    store.set_guest_flag().unwrap();
    let config = StoreConfig {
        clear_guest_on_sign_out: true,
        ..StoreConfig::default()
    };
    let session = Session::with_config(store.clone(), Arc::new(MockAuth::signed_in("u1")), &config);
    session.initialize().unwrap();

    session.sign_out().unwrap();
    assert!(!store.is_guest().unwrap());
    assert_eq!(session.initialize().unwrap(), SessionState::Unknown);
}

#[test]
fn test_sign_out_from_guest_skips_remote() {
    let auth = Arc::new(MockAuth::default());
    let session = Session::new(store(), auth.clone());
    session.enter_guest().unwrap();

    session.sign_out().unwrap();
    assert_eq!(auth.sign_outs.load(Ordering::SeqCst), 0);
    assert_eq!(session.route(), DataRoute::None);
}

// =============================================================================
// Children
// =============================================================================

#[test]
fn test_first_child_active_through_session() {
    let session = Session::new(store(), Arc::new(OfflineAuth));
    session.enter_guest().unwrap();

    let alice = session.create_child("Alice").unwrap();
    assert_eq!(session.active_child_id().unwrap(), Some(alice.id.clone()));

    let bob = session.create_child("Bob").unwrap();
    assert_eq!(session.active_child().unwrap(), Some(alice));

    session.set_active_child_id(&bob.id).unwrap();
    assert_eq!(session.active_child().unwrap(), Some(bob));
    assert_eq!(session.children().unwrap().len(), 2);
}

#[test]
fn test_children_unavailable_without_guest_mode() {
    let session = Session::new(store(), Arc::new(OfflineAuth));
    session.initialize().unwrap();

    assert!(matches!(session.children(), Err(Error::Session(_))));
    assert!(matches!(session.active_child_id(), Err(Error::Session(_))));
    assert!(matches!(
        session.set_active_child_id("x"),
        Err(Error::Session(_))
    ));
}

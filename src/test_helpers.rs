//! Shared fakes for the identity provider and document store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::identity::{EventHub, Identity, IdentityError, IdentityProvider, Subscription};
use crate::role::{DocumentStore, RoleRecord, StoreError};

// =============================================================================
// FakeProvider
// =============================================================================

/// In-memory identity provider backed by a fixed account table.
#[derive(Default)]
pub struct FakeProvider {
    pub hub: EventHub,
    /// email -> (password, uid)
    accounts: Mutex<HashMap<String, (String, String)>>,
    pub sign_in_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    /// When set, `sign_out` errors and leaves the session in place.
    pub fail_sign_out: AtomicBool,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_account(self: Arc<Self>, uid: &str, email: &str, password: &str) -> Arc<Self> {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_owned(), (password.to_owned(), uid.to_owned()));
        self
    }

    pub fn sign_in_count(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_count(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FakeProvider {
    fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        let account = self.accounts.lock().unwrap().get(email).cloned();
        match account {
            Some((expected, uid)) if expected == password => {
                let identity = Identity::new(uid, email);
                self.hub.publish(Some(identity.clone()));
                Ok(identity)
            }
            Some(_) => Err(IdentityError::InvalidCredentials { message: Some("Incorrect password.".into()) }),
            None => Err(IdentityError::InvalidCredentials { message: None }),
        }
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(IdentityError::Transport("offline".into()));
        }
        self.hub.publish(None);
        Ok(())
    }
}

// =============================================================================
// FakeStore
// =============================================================================

/// In-memory role store with call counting, forced failure, and per-key
/// holds that park a lookup until released.
#[derive(Default)]
pub struct FakeStore {
    records: Mutex<HashMap<String, RoleRecord>>,
    holds: Mutex<HashMap<String, Arc<Notify>>>,
    pub fail: AtomicBool,
    calls: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let store = Self::default();
        store.fail.store(true, Ordering::SeqCst);
        Arc::new(store)
    }

    pub fn with_record(self: Arc<Self>, uid: &str, record: RoleRecord) -> Arc<Self> {
        self.records.lock().unwrap().insert(uid.to_owned(), record);
        self
    }

    /// Park lookups for `uid` until the returned handle is notified.
    pub fn hold(&self, uid: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.holds
            .lock()
            .unwrap()
            .insert(uid.to_owned(), Arc::clone(&notify));
        notify
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DocumentStore for FakeStore {
    async fn get_document(&self, collection: &str, key: &str) -> Result<Option<RoleRecord>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(collection, crate::role::USERS_COLLECTION);

        let hold = self.holds.lock().unwrap().get(key).cloned();
        if let Some(hold) = hold {
            hold.notified().await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("permission denied".into()));
        }
        Ok(self.records.lock().unwrap().get(key).cloned())
    }
}

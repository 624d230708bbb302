//! In-process fakes shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use authgate::auth::AuthService;
use authgate::identity::{IdentityClient, IdentityError};
use authgate::models::{Account, NewAccount};
use authgate::store::{MemoryStore, RevocationStore, StoreError};
use authgate::tokens::{ManualClock, TokenManager};

pub const SECRET: &[u8] = b"integration-test-secret";
pub const TTL: Duration = Duration::from_secs(3600);
pub const STORE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn daniel() -> Account {
    Account {
        id: 1,
        name: "Daniel".into(),
        email: "daniel@example.com".into(),
        image: None,
        created_at: None,
        updated_at: None,
    }
}

// ── Identity ─────────────────────────────────────────────────

/// User service backed by a vector, with call counters.
#[derive(Default)]
pub struct FakeIdentity {
    accounts: Mutex<Vec<(Account, String)>>,
    pub find_by_id_calls: AtomicUsize,
    pub find_by_credential_calls: AtomicUsize,
    pub lookups_fail: AtomicBool,
    pub unhealthy: AtomicBool,
}

impl FakeIdentity {
    pub fn with_account(account: Account, password: &str) -> Self {
        let fake = Self::default();
        fake.insert(account, password);
        fake
    }

    pub fn insert(&self, account: Account, password: &str) {
        self.accounts
            .lock()
            .unwrap()
            .push((account, password.to_string()));
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    pub fn lookups(&self) -> usize {
        self.find_by_id_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityClient for FakeIdentity {
    async fn find_by_id(&self, id: i64) -> Result<Account, IdentityError> {
        self.find_by_id_calls.fetch_add(1, Ordering::SeqCst);
        if self.lookups_fail.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable("connection refused".into()));
        }
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|(a, _)| a.id == id)
            .map(|(a, _)| a.clone())
            .ok_or_else(|| IdentityError::NotFound("User not found".into()))
    }

    async fn find_by_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Account, IdentityError> {
        self.find_by_credential_calls.fetch_add(1, Ordering::SeqCst);
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|(a, p)| a.email == email && p == password)
            .map(|(a, _)| a.clone())
            .ok_or_else(|| IdentityError::InvalidCredentials("Invalid email or password".into()))
    }

    async fn create_account(&self, new: &NewAccount) -> Result<Account, IdentityError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.iter().any(|(a, _)| a.email == new.email) {
            return Err(IdentityError::AlreadyExists("Email already registered".into()));
        }
        let account = Account {
            id: accounts.len() as i64 + 1,
            name: new.name.clone(),
            email: new.email.clone(),
            image: None,
            created_at: None,
            updated_at: None,
        };
        accounts.push((account.clone(), new.password.clone()));
        Ok(account)
    }

    async fn health(&self) -> Result<(), IdentityError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable("user service down".into()));
        }
        Ok(())
    }
}

// ── Stores ───────────────────────────────────────────────────

/// Every operation fails as if Redis were unreachable.
pub struct FailingStore;

#[async_trait]
impl RevocationStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn health(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

/// Reads succeed, writes fail.
pub struct ReadOnlyStore(pub MemoryStore);

#[async_trait]
impl RevocationStore for ReadOnlyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.0.get(key).await
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("READONLY replica".into()))
    }

    async fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Where a [`GatedStore`] parks a write until [`GatedStore::open`].
#[derive(Clone, Copy, PartialEq)]
pub enum Hold {
    /// Before anything reaches the inner store.
    BeforeWrite,
    /// After the entry has landed, before the call returns.
    AfterWrite,
}

/// Parks every write at a gate, announcing when a write has started and
/// when it has reached the inner store.
pub struct GatedStore {
    pub inner: MemoryStore,
    hold: Hold,
    gate: Notify,
    pub write_started: Notify,
    pub write_done: Notify,
}

impl GatedStore {
    pub fn new(inner: MemoryStore, hold: Hold) -> Self {
        Self {
            inner,
            hold,
            gate: Notify::new(),
            write_started: Notify::new(),
            write_done: Notify::new(),
        }
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl RevocationStore for GatedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.write_started.notify_one();
        if self.hold == Hold::BeforeWrite {
            self.gate.notified().await;
        }
        self.inner.set_ex(key, value, ttl).await?;
        self.write_done.notify_one();
        if self.hold == Hold::AfterWrite {
            self.gate.notified().await;
        }
        Ok(())
    }

    async fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ── Wiring ───────────────────────────────────────────────────

/// Auth service on a manual clock, with Daniel registered upstream.
pub struct Harness {
    pub auth: AuthService,
    pub identity: Arc<FakeIdentity>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// Memory store sharing the harness clock.
    pub fn new() -> (Self, MemoryStore) {
        let clock = Arc::new(ManualClock::starting_now());
        let store = MemoryStore::with_clock(clock.clone());
        let harness = Self::with_store_and_clock(Arc::new(store.clone()), clock);
        (harness, store)
    }

    pub fn with_store(store: Arc<dyn RevocationStore>) -> Self {
        Self::with_store_and_clock(store, Arc::new(ManualClock::starting_now()))
    }

    pub fn with_store_and_clock(store: Arc<dyn RevocationStore>, clock: Arc<ManualClock>) -> Self {
        let identity = Arc::new(FakeIdentity::with_account(daniel(), "hunter2"));
        let tokens = TokenManager::new(SECRET, TTL, store, STORE_TIMEOUT).with_clock(clock.clone());
        Self {
            auth: AuthService::new(identity.clone(), tokens),
            identity,
            clock,
        }
    }

    pub async fn login(&self) -> String {
        self.auth
            .login("daniel@example.com", "hunter2")
            .await
            .unwrap()
            .token
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

//! Mock implementations for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use warden_auth::{ExchangeError, ExchangeResult, TokenExchange, TokenGrant, UserInfo};
use warden_storage::{
    AssignmentStore, Assignments, MemoryAssignmentStore, StorageError, StorageResult,
};

/// Scripted [`TokenExchange`].
///
/// Tokens registered with [`with_user`](Self::with_user) exchange for that
/// user; everything else, and anything [`revoke`](Self::revoke)d, is
/// rejected. Each grant's access token is `access-<token>-<n>` where `n`
/// counts all exchanges so far. Clones share state.
#[derive(Debug, Clone)]
pub struct MockTokenExchange {
    users: Arc<Mutex<HashMap<String, UserInfo>>>,
    revoked: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
    total: Arc<AtomicUsize>,
    ttl: Duration,
    delay: Option<Duration>,
}

impl Default for MockTokenExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTokenExchange {
    /// A mock that knows no tokens and grants one-hour access tokens.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
            revoked: Arc::new(Mutex::new(HashSet::new())),
            calls: Arc::new(Mutex::new(HashMap::new())),
            total: Arc::new(AtomicUsize::new(0)),
            ttl: Duration::from_secs(3600),
            delay: None,
        }
    }

    /// Exchange `refresh_token` for `email`.
    #[must_use]
    pub fn with_user(self, refresh_token: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        if let Ok(mut users) = self.users.lock() {
            users.insert(
                refresh_token.into(),
                UserInfo::new(email.clone(), format!("sub-{email}")),
            );
        }
        self
    }

    /// Lifetime of granted access tokens.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sleep this long inside every exchange.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reject `refresh_token` from now on.
    pub fn revoke(&self, refresh_token: &str) {
        if let Ok(mut revoked) = self.revoked.lock() {
            revoked.insert(refresh_token.to_owned());
        }
    }

    /// Total number of exchanges attempted.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Number of exchanges attempted for `refresh_token`.
    #[must_use]
    pub fn calls_for(&self, refresh_token: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(refresh_token).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl TokenExchange for MockTokenExchange {
    async fn exchange(&self, refresh_token: &str) -> ExchangeResult<TokenGrant> {
        let n = self.total.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            let count = calls.entry(refresh_token.to_owned()).or_insert(0);
            *count = count.saturating_add(1);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let revoked = self
            .revoked
            .lock()
            .map(|revoked| revoked.contains(refresh_token))
            .unwrap_or(true);
        let user = self
            .users
            .lock()
            .ok()
            .and_then(|users| users.get(refresh_token).cloned());

        match user {
            Some(user) if !revoked => Ok(TokenGrant {
                user,
                access_token: format!("access-{refresh_token}-{n}"),
                expires_in: self.ttl,
            }),
            _ => Err(ExchangeError::Rejected {
                status: 400,
                body: r#"{"error":"invalid_grant"}"#.to_owned(),
            }),
        }
    }
}

/// An in-memory [`AssignmentStore`] whose saves can be made to fail.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryAssignmentStore,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl FailingStore {
    /// A store holding `assignments` whose saves succeed until told
    /// otherwise.
    #[must_use]
    pub fn new(assignments: Assignments) -> Self {
        Self {
            inner: MemoryAssignmentStore::with_assignments(assignments),
            fail_saves: AtomicBool::new(false),
            saves: AtomicUsize::new(0),
        }
    }

    /// Make every following save fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }

    /// Number of successful saves.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The document as last successfully saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the inner store's lock is poisoned.
    pub fn snapshot(&self) -> StorageResult<Assignments> {
        self.inner.snapshot()
    }
}

#[async_trait]
impl AssignmentStore for FailingStore {
    async fn load(&self) -> StorageResult<Assignments> {
        self.inner.load().await
    }

    async fn save(&self, assignments: &Assignments) -> StorageResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Internal("injected save failure".into()));
        }
        self.inner.save(assignments).await?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

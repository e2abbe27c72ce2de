//! Refresh-token cache.
//!
//! Maps opaque refresh tokens to the user they belong to and a live access
//! token. Entries move through three states:
//!
//! - absent: the first use exchanges the token
//! - valid: served from memory until the access token expires
//! - expired: the next use exchanges again; on failure the entry is dropped
//!
//! Failures are never cached. Entries are replaced on refresh and not
//! evicted on a timer.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::{AuthError, AuthResult};
use crate::exchange::TokenExchange;
use crate::identity::UserInfo;

/// Upper bound on one exchange unless configured otherwise.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest an access token is served from memory, whatever the provider says.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(86_400);

/// Short, non-reversible tag for a token, safe to log.
#[must_use]
pub fn fingerprint(token: &str) -> String {
    let hash = blake3::hash(token.as_bytes()).to_hex();
    hash.as_str().get(..8).unwrap_or_default().to_owned()
}

#[derive(Debug, Clone)]
struct CachedToken {
    user: UserInfo,
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

struct Inner {
    exchange: Arc<dyn TokenExchange>,
    entries: RwLock<HashMap<String, CachedToken>>,
    timeout: Duration,
}

impl Inner {
    fn valid_entry(&self, refresh_token: &str) -> AuthResult<Option<CachedToken>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(entries
            .get(refresh_token)
            .filter(|entry| entry.is_valid(Instant::now()))
            .cloned())
    }

    fn forget(&self, refresh_token: &str) -> AuthResult<()> {
        self.entries
            .write()
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .remove(refresh_token);
        Ok(())
    }

    /// Drop any entry for `refresh_token` and report the failure.
    ///
    /// `detail` goes to the log only; callers see `reason`.
    fn fail(&self, refresh_token: &str, detail: &str, reason: String) -> AuthResult<UserInfo> {
        self.forget(refresh_token)?;
        warn!(token = %fingerprint(refresh_token), %detail, "token refresh failed");
        Err(AuthError::InvalidToken { reason })
    }

    async fn refresh(&self, refresh_token: String) -> AuthResult<UserInfo> {
        let token = fingerprint(&refresh_token);

        let grant =
            match tokio::time::timeout(self.timeout, self.exchange.exchange(&refresh_token)).await {
                Ok(Ok(grant)) => grant,
                Ok(Err(e)) => return self.fail(&refresh_token, &e.to_string(), e.summary()),
                Err(_) => {
                    let reason = format!("token exchange timed out after {:?}", self.timeout);
                    return self.fail(&refresh_token, &reason, reason.clone());
                },
            };

        if grant.expires_in > MAX_TOKEN_LIFETIME {
            debug!(
                %token,
                expires_in_secs = grant.expires_in.as_secs(),
                "clamping access token lifetime"
            );
        }
        let lifetime = grant.expires_in.min(MAX_TOKEN_LIFETIME);
        let Some(expires_at) = Instant::now().checked_add(lifetime) else {
            let reason = format!("token lifetime {lifetime:?} is out of range");
            return self.fail(&refresh_token, &reason, reason.clone());
        };

        debug!(
            %token,
            identity = %grant.user.email,
            expires_in_secs = lifetime.as_secs(),
            "refreshed access token"
        );

        let user = grant.user.clone();
        self.entries
            .write()
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .insert(
                refresh_token,
                CachedToken {
                    user: grant.user,
                    access_token: grant.access_token,
                    expires_at,
                },
            );
        Ok(user)
    }
}

/// Cache of refresh tokens resolved through a [`TokenExchange`].
///
/// Cloning is cheap and clones share the same entries. Exchanges run on
/// their own task, so a refresh finishes and populates the cache even if
/// the caller that started it goes away. Concurrent resolutions of the
/// same expired token may each call the exchange; the last one wins.
#[derive(Clone)]
pub struct TokenCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("entries", &self.len())
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

impl TokenCache {
    /// Create an empty cache backed by `exchange`.
    #[must_use]
    pub fn new(exchange: Arc<dyn TokenExchange>) -> Self {
        Self {
            inner: Arc::new(Inner {
                exchange,
                entries: RwLock::new(HashMap::new()),
                timeout: DEFAULT_EXCHANGE_TIMEOUT,
            }),
        }
    }

    /// Bound each exchange by `timeout`. A timed-out exchange is an invalid
    /// token.
    #[must_use]
    pub fn with_timeout(exchange: Arc<dyn TokenExchange>, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                exchange,
                entries: RwLock::new(HashMap::new()),
                timeout,
            }),
        }
    }

    /// Resolve `refresh_token` to its user, exchanging it when there is no
    /// valid entry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the exchange fails or times
    /// out. The stale entry, if any, is removed.
    pub async fn resolve(&self, refresh_token: &str) -> AuthResult<UserInfo> {
        if let Some(entry) = self.inner.valid_entry(refresh_token)? {
            trace!(token = %fingerprint(refresh_token), "token cache hit");
            return Ok(entry.user);
        }

        let inner = Arc::clone(&self.inner);
        let refresh_token = refresh_token.to_owned();
        tokio::spawn(async move { inner.refresh(refresh_token).await })
            .await
            .map_err(|e| AuthError::Internal(format!("token refresh task failed: {e}")))?
    }

    /// The cached access token for `refresh_token`, if its entry is valid.
    ///
    /// Never triggers an exchange.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the cache lock is poisoned.
    pub fn access_token(&self, refresh_token: &str) -> AuthResult<Option<String>> {
        Ok(self
            .inner
            .valid_entry(refresh_token)?
            .map(|entry| entry.access_token))
    }

    /// Number of entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.read().map_or(0, |entries| entries.len())
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

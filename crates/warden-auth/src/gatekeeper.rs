//! Request-level identity resolution and capability enforcement.

use std::sync::Arc;

use tracing::debug;

use crate::authorizer::{Authorizer, CapabilityRef};
use crate::cache::TokenCache;
use crate::error::{AuthError, AuthResult};
use crate::identity::Identity;
use crate::seal::TokenSealer;

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// # Errors
///
/// Returns [`AuthError::MalformedAuthorization`] for any other shape.
pub fn parse_bearer(header: &str) -> AuthResult<&str> {
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() && !token.contains(char::is_whitespace) => Ok(token),
        _ => Err(AuthError::MalformedAuthorization),
    }
}

/// Front door for requests: turns a session identity or bearer token into
/// an [`Identity`] and enforces capabilities through the [`Authorizer`].
///
/// A bearer token takes precedence over the session. Without either, the
/// request is anonymous. Bearer tokens are sealed refresh tokens and are
/// opened with the [`TokenSealer`] before the cache sees them.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    authorizer: Arc<Authorizer>,
    tokens: TokenCache,
    sealer: TokenSealer,
}

impl Gatekeeper {
    /// Combine an authorizer, a token cache and the sealer for bearer tokens.
    #[must_use]
    pub fn new(authorizer: Arc<Authorizer>, tokens: TokenCache, sealer: TokenSealer) -> Self {
        Self {
            authorizer,
            tokens,
            sealer,
        }
    }

    /// The authorizer used for checks and management.
    #[must_use]
    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    /// The bearer token cache.
    #[must_use]
    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    /// The bearer token to hand a client holding `refresh_token`.
    #[must_use]
    pub fn issue(&self, refresh_token: &str) -> String {
        self.sealer.seal(refresh_token)
    }

    /// Who is making the request, if anyone.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedAuthorization`] for a bad header and
    /// [`AuthError::InvalidToken`] when the bearer token is not sealed with
    /// our key or cannot be resolved.
    pub async fn identify(
        &self,
        session: Option<&Identity>,
        authorization: Option<&str>,
    ) -> AuthResult<Option<Identity>> {
        let Some(header) = authorization else {
            return Ok(session.cloned());
        };

        let refresh_token = self.sealer.open(parse_bearer(header)?)?;
        let user = self.tokens.resolve(&refresh_token).await?;
        debug!(identity = %user.email, "identified bearer token");
        Ok(Some(user.identity()))
    }

    /// Identify the caller, failing if the request is anonymous.
    ///
    /// # Errors
    ///
    /// As [`identify`](Self::identify), plus [`AuthError::Unauthenticated`].
    pub async fn require_identity(
        &self,
        session: Option<&Identity>,
        authorization: Option<&str>,
    ) -> AuthResult<Identity> {
        self.identify(session, authorization)
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    /// Identify the caller and check it holds `required`.
    ///
    /// The caller is identified before `required` is looked up, so a bad
    /// token wins over an unknown capability.
    ///
    /// # Errors
    ///
    /// As [`identify`](Self::identify), plus [`AuthError::Unauthenticated`],
    /// [`AuthError::Forbidden`] and [`AuthError::UnknownCapability`].
    pub async fn require<R>(
        &self,
        session: Option<&Identity>,
        authorization: Option<&str>,
        required: &R,
    ) -> AuthResult<Identity>
    where
        R: CapabilityRef + Sync + ?Sized,
    {
        let identity = self.identify(session, authorization).await?;
        self.authorizer.require(identity.as_ref(), required)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use warden_capabilities::CapabilityGraph;
    use warden_storage::{Assignments, MemoryAssignmentStore};

    use super::*;
    use crate::exchange::{ExchangeError, ExchangeResult, TokenExchange, TokenGrant};
    use crate::identity::UserInfo;
    use crate::policy::Policy;

    const SECRET: &str = "sleep with the fishes";

    struct FixedExchange;

    #[async_trait]
    impl TokenExchange for FixedExchange {
        async fn exchange(&self, refresh_token: &str) -> ExchangeResult<TokenGrant> {
            match refresh_token {
                "boss-token" => Ok(TokenGrant {
                    user: UserInfo::new("boss@corleone.com", "7"),
                    access_token: "access".into(),
                    expires_in: Duration::from_secs(60),
                }),
                _ => Err(ExchangeError::InvalidResponse("unknown token".into())),
            }
        }
    }

    async fn gatekeeper() -> Gatekeeper {
        let adjacency: BTreeMap<String, Vec<String>> = BTreeMap::from([
            ("villager".to_owned(), vec![]),
            ("mafia".to_owned(), vec!["villager".to_owned()]),
            ("mayor".to_owned(), vec!["villager".to_owned()]),
        ]);
        let graph = Arc::new(CapabilityGraph::from_adjacency(&adjacency, Some("admin")).unwrap());
        let store = Arc::new(MemoryAssignmentStore::with_assignments(
            Assignments::from_iter([("boss@corleone.com", ["mafia"])]),
        ));
        let authorizer = Authorizer::load(graph, store, &Policy::new()).await.unwrap();
        Gatekeeper::new(
            Arc::new(authorizer),
            TokenCache::new(Arc::new(FixedExchange)),
            TokenSealer::new(SECRET),
        )
    }

    fn bearer(refresh_token: &str) -> String {
        format!("Bearer {}", TokenSealer::new(SECRET).seal(refresh_token))
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc.def").unwrap(), "abc.def");
        for bad in ["abc", "Bearer ", "Basic abc", "bearer abc", "Bearer a b", "Bearer  abc"] {
            assert!(
                matches!(parse_bearer(bad), Err(AuthError::MalformedAuthorization)),
                "accepted {bad:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_identify_session_and_anonymous() {
        let gate = gatekeeper().await;
        let session = Identity::new("wiggum@springfield.us");

        assert_eq!(gate.identify(Some(&session), None).await.unwrap(), Some(session));
        assert_eq!(gate.identify(None, None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bearer_overrides_session() {
        let gate = gatekeeper().await;
        let session = Identity::new("wiggum@springfield.us");

        let identity = gate
            .identify(Some(&session), Some(bearer("boss-token").as_str()))
            .await
            .unwrap();
        assert_eq!(identity, Some(Identity::new("boss@corleone.com")));
    }

    #[tokio::test]
    async fn test_require_through_bearer() {
        let gate = gatekeeper().await;

        let identity = gate
            .require(None, Some(bearer("boss-token").as_str()), "villager")
            .await
            .unwrap();
        assert_eq!(identity.as_str(), "boss@corleone.com");

        assert!(matches!(
            gate.require(None, Some(bearer("boss-token").as_str()), "mayor").await,
            Err(AuthError::Forbidden { .. })
        ));
        assert!(matches!(
            gate.require(None, None, "villager").await,
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            gate.require(None, Some(bearer("stolen").as_str()), "villager").await,
            Err(AuthError::InvalidToken { .. })
        ));
        assert!(matches!(
            gate.require(None, Some("Token boss-token"), "villager").await,
            Err(AuthError::MalformedAuthorization)
        ));
    }

    #[tokio::test]
    async fn test_require_identity() {
        let gate = gatekeeper().await;
        assert!(matches!(
            gate.require_identity(None, None).await,
            Err(AuthError::Unauthenticated)
        ));
        assert_eq!(
            gate.require_identity(None, Some(bearer("boss-token").as_str()))
                .await
                .unwrap()
                .as_str(),
            "boss@corleone.com"
        );
    }

    #[tokio::test]
    async fn test_unsealed_and_foreign_tokens_never_reach_exchange() {
        let gate = gatekeeper().await;
        let foreign = TokenSealer::new("leave the gun").seal("boss-token");

        for header in ["Bearer boss-token".to_owned(), format!("Bearer {foreign}")] {
            assert!(
                matches!(
                    gate.identify(None, Some(header.as_str())).await,
                    Err(AuthError::InvalidToken { .. })
                ),
                "accepted {header:?}"
            );
        }
        assert!(gate.tokens().is_empty());

        let issued = gate.issue("boss-token");
        let identity = gate
            .require_identity(None, Some(format!("Bearer {issued}").as_str()))
            .await
            .unwrap();
        assert_eq!(identity.as_str(), "boss@corleone.com");
    }

    #[tokio::test]
    async fn test_bad_token_wins_over_unknown_capability() {
        let gate = gatekeeper().await;

        assert!(matches!(
            gate.require(None, Some(bearer("stolen").as_str()), "consigliere").await,
            Err(AuthError::InvalidToken { .. })
        ));
        assert!(matches!(
            gate.require(None, Some(bearer("boss-token").as_str()), "consigliere").await,
            Err(AuthError::UnknownCapability { .. })
        ));
    }
}

//! Refresh-token exchange with an identity provider.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::identity::UserInfo;

/// Access-token lifetime assumed when the provider does not say.
pub const DEFAULT_EXPIRES_IN: Duration = Duration::from_secs(3600);

/// Errors from a token exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The request could not be sent or timed out.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("token endpoint returned HTTP {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response body was not a usable token response.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    /// The id token could not be decoded into user claims.
    #[error("invalid id token: {0}")]
    InvalidIdToken(String),
}

impl ExchangeError {
    /// A short description that leaves out provider response bodies.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Http(e) if e.is_timeout() => "token endpoint timed out".to_owned(),
            Self::Http(_) => "token endpoint unreachable".to_owned(),
            Self::Rejected { status, .. } => format!("token endpoint returned HTTP {status}"),
            Self::InvalidResponse(_) => "invalid token response".to_owned(),
            Self::InvalidIdToken(_) => "invalid id token".to_owned(),
        }
    }
}

/// Result type for token exchanges.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// What a successful exchange yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// The user the refresh token belongs to.
    pub user: UserInfo,
    /// A fresh access token.
    pub access_token: String,
    /// How long the access token stays valid.
    pub expires_in: Duration,
}

/// Trades a refresh token for a user and a fresh access token.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Exchange `refresh_token` with the provider.
    async fn exchange(&self, refresh_token: &str) -> ExchangeResult<TokenGrant>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    id_token: Option<String>,
    expires_in: Option<u64>,
}

/// Decode the claims of a JWT id token.
///
/// The signature is not checked.
///
/// # Errors
///
/// Returns [`ExchangeError::InvalidIdToken`] if the token does not have
/// three segments or its payload is not base64url-encoded JSON claims with
/// `email` and `sub`.
pub fn decode_id_token(id_token: &str) -> ExchangeResult<UserInfo> {
    let mut segments = id_token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(ExchangeError::InvalidIdToken(
            "expected three dot-separated segments".into(),
        ));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ExchangeError::InvalidIdToken(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ExchangeError::InvalidIdToken(e.to_string()))
}

/// OAuth 2.0 refresh-token grant against a provider's token endpoint.
#[derive(Clone)]
pub struct RefreshGrantExchange {
    client: Client,
    token_endpoint: String,
    client_id: String,
    client_secret: String,
    default_expires_in: Duration,
}

impl std::fmt::Debug for RefreshGrantExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshGrantExchange")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("default_expires_in", &self.default_expires_in)
            .finish_non_exhaustive()
    }
}

impl RefreshGrantExchange {
    /// Create an exchange whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Http`] if the HTTP client cannot be built.
    pub fn new(
        token_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> ExchangeResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            token_endpoint: token_endpoint.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            default_expires_in: DEFAULT_EXPIRES_IN,
        })
    }

    /// Lifetime to assume when the response has no `expires_in`.
    #[must_use]
    pub fn with_default_expires_in(mut self, expires_in: Duration) -> Self {
        self.default_expires_in = expires_in;
        self
    }

    /// The token endpoint URL.
    #[must_use]
    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }
}

#[async_trait]
impl TokenExchange for RefreshGrantExchange {
    async fn exchange(&self, refresh_token: &str) -> ExchangeResult<TokenGrant> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        debug!(endpoint = %self.token_endpoint, "requesting refresh-token grant");
        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ExchangeError::InvalidResponse(e.to_string()))?;

        let access_token = body
            .access_token
            .ok_or_else(|| ExchangeError::InvalidResponse("missing access_token".into()))?;
        let id_token = body
            .id_token
            .ok_or_else(|| ExchangeError::InvalidResponse("missing id_token".into()))?;

        Ok(TokenGrant {
            user: decode_id_token(&id_token)?,
            access_token,
            expires_in: body
                .expires_in
                .map_or(self.default_expires_in, Duration::from_secs),
        })
    }
}

//! Signed bearer tokens.
//!
//! Clients never present a raw refresh token. They present a sealed one,
//! `<payload>.<tag>`, where the payload is the base64url refresh token and
//! the tag is its blake3 keyed hash under a key derived from the configured
//! secret. Tampered or foreign tokens are turned away before any exchange.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::debug;

use crate::error::{AuthError, AuthResult};

const KEY_CONTEXT: &str = "warden 2024-06-01 bearer token seal";

/// Seals refresh tokens for clients and opens what they send back.
#[derive(Clone)]
pub struct TokenSealer {
    key: [u8; blake3::KEY_LEN],
}

impl std::fmt::Debug for TokenSealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSealer").finish_non_exhaustive()
    }
}

impl TokenSealer {
    /// Derive the sealing key from `secret`.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret.as_ref()),
        }
    }

    /// Wrap `refresh_token` into the form clients present as a bearer token.
    #[must_use]
    pub fn seal(&self, refresh_token: &str) -> String {
        let tag = blake3::keyed_hash(&self.key, refresh_token.as_bytes());
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(refresh_token),
            URL_SAFE_NO_PAD.encode(tag.as_bytes())
        )
    }

    /// Recover the refresh token from a sealed bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if `sealed` is malformed or was
    /// not sealed with this key.
    pub fn open(&self, sealed: &str) -> AuthResult<String> {
        let malformed = || AuthError::InvalidToken {
            reason: "malformed bearer token".into(),
        };

        let (payload, tag) = sealed.split_once('.').ok_or_else(malformed)?;
        let payload = URL_SAFE_NO_PAD.decode(payload).map_err(|_| malformed())?;
        let tag: [u8; blake3::OUT_LEN] = URL_SAFE_NO_PAD
            .decode(tag)
            .ok()
            .and_then(|tag| tag.try_into().ok())
            .ok_or_else(malformed)?;

        // Hash equality is constant-time.
        if blake3::keyed_hash(&self.key, &payload) != blake3::Hash::from(tag) {
            debug!("bearer token signature mismatch");
            return Err(AuthError::InvalidToken {
                reason: "bad bearer token signature".into(),
            });
        }

        String::from_utf8(payload).map_err(|_| malformed())
    }
}

//! Authenticated identities.

use serde::{Deserialize, Serialize};

/// An authenticated principal, identified by email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap an email address.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    /// The email address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identity {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

impl From<String> for Identity {
    fn from(email: String) -> Self {
        Self(email)
    }
}

/// Claims taken from an identity provider's id token.
///
/// Unknown claims are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// The user's email address.
    pub email: String,
    /// The provider's stable subject identifier.
    pub sub: String,
}

impl UserInfo {
    /// Create user info from an email and subject.
    #[must_use]
    pub fn new(email: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            sub: sub.into(),
        }
    }

    /// The identity capabilities are checked against.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(self.email.clone())
    }
}

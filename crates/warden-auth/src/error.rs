//! Authorization error types.

use thiserror::Error;
use warden_capabilities::CapabilityError;
use warden_storage::StorageError;

/// Errors surfaced by authorization, management and token resolution.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No identity accompanied the request.
    #[error("authentication required")]
    Unauthenticated,

    /// The identity lacks the capability an action requires.
    #[error("{required} capability required (holding {held})")]
    Forbidden {
        /// The required capability.
        required: String,
        /// Description of what the identity holds.
        held: String,
    },

    /// The caller may not manage capability assignments.
    #[error("{required} capability is required to manage capabilities")]
    PermissionDenied {
        /// The management capability, or `none` if the graph has none.
        required: String,
    },

    /// A request named a capability the graph does not define.
    #[error("unknown capability: {name}")]
    UnknownCapability {
        /// The unrecognised name.
        name: String,
    },

    /// A bearer token could not be exchanged for an identity.
    #[error("invalid token: {reason}")]
    InvalidToken {
        /// Why the token was rejected.
        reason: String,
    },

    /// The `Authorization` header is not of the form `Bearer <token>`.
    #[error("malformed authorization header")]
    MalformedAuthorization,

    /// Persisting or loading assignments failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The capability graph is misconfigured.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Internal failure such as a poisoned lock or a panicked task.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status code a boundary layer should answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated | Self::InvalidToken { .. } | Self::MalformedAuthorization => {
                401
            },
            Self::Forbidden { .. } | Self::PermissionDenied { .. } => 403,
            Self::UnknownCapability { .. } => 400,
            Self::Capability(CapabilityError::NotFound { .. }) => 404,
            Self::Capability(_) | Self::Storage(_) | Self::Internal(_) => 500,
        }
    }

    /// Whether the request, not the server, is at fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// Result type for authorization operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::Unauthenticated.status_code(), 401);
        assert_eq!(AuthError::MalformedAuthorization.status_code(), 401);
        assert_eq!(
            AuthError::InvalidToken {
                reason: "expired".into()
            }
            .status_code(),
            401
        );
        assert_eq!(
            AuthError::Forbidden {
                required: "mayor".into(),
                held: "mafia".into()
            }
            .status_code(),
            403
        );
        assert_eq!(
            AuthError::PermissionDenied {
                required: "user_management".into()
            }
            .status_code(),
            403
        );
        assert_eq!(
            AuthError::UnknownCapability {
                name: "ghost".into()
            }
            .status_code(),
            400
        );
        assert_eq!(
            AuthError::Storage(StorageError::Internal("disk".into())).status_code(),
            500
        );
    }

    #[test]
    fn test_client_errors() {
        assert!(AuthError::Unauthenticated.is_client_error());
        assert!(
            AuthError::Capability(CapabilityError::NotFound { name: "x".into() })
                .is_client_error()
        );
        assert!(
            !AuthError::Capability(CapabilityError::DuplicateName { name: "x".into() })
                .is_client_error()
        );
        assert!(!AuthError::Internal("poisoned".into()).is_client_error());
    }

    #[test]
    fn test_forbidden_message() {
        let err = AuthError::Forbidden {
            required: "mayor".into(),
            held: "villager&mafia".into(),
        };
        assert_eq!(
            err.to_string(),
            "mayor capability required (holding villager&mafia)"
        );
    }
}

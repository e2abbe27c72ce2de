//! Capability-related error types.

use thiserror::Error;

/// Errors raised while building or querying a capability graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// A capability with this name is already registered.
    #[error("capability already registered: {name}")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },

    /// An implication refers to a capability that has not been registered.
    #[error("capability {name} implies unregistered capability {implied}")]
    UnknownImplication {
        /// The capability being registered or wired.
        name: String,
        /// The missing implied capability.
        implied: String,
    },

    /// The capability name is empty or otherwise unusable.
    #[error("invalid capability name: {name:?}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// Lookup of a capability that does not exist.
    #[error("capability not found: {name}")]
    NotFound {
        /// The name that was looked up.
        name: String,
    },
}

impl CapabilityError {
    /// Whether the error stems from a bad graph definition rather than a
    /// request-time lookup.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::NotFound { .. })
    }
}

/// Result type for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

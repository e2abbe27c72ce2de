//! Assignment changes and the report returned after them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use warden_storage::{AssignmentStore, Assignments, StorageResult};

use crate::identity::Identity;

/// A change to one identity's stored capabilities.
///
/// Only the assignment store is touched. Overrides and baseline grants are
/// never affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CapabilityMutation {
    /// Grant one more capability.
    AddCapability {
        /// Identity being changed.
        email: Identity,
        /// Capability to add.
        capability: String,
    },
    /// Withdraw one stored capability. Removing an absent one is a no-op.
    RemoveCapability {
        /// Identity being changed.
        email: Identity,
        /// Capability to remove.
        capability: String,
    },
    /// Replace every stored capability.
    SetCapabilities {
        /// Identity being changed.
        email: Identity,
        /// The new stored set.
        capabilities: BTreeSet<String>,
    },
}

impl CapabilityMutation {
    /// The identity whose assignments change.
    #[must_use]
    pub fn target(&self) -> &Identity {
        match self {
            Self::AddCapability { email, .. }
            | Self::RemoveCapability { email, .. }
            | Self::SetCapabilities { email, .. } => email,
        }
    }

    /// Every capability name the mutation mentions.
    #[must_use]
    pub fn capability_names(&self) -> Vec<&str> {
        match self {
            Self::AddCapability { capability, .. } | Self::RemoveCapability { capability, .. } => {
                vec![capability.as_str()]
            },
            Self::SetCapabilities { capabilities, .. } => {
                capabilities.iter().map(String::as_str).collect()
            },
        }
    }

    /// Short operation name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddCapability { .. } => "add",
            Self::RemoveCapability { .. } => "remove",
            Self::SetCapabilities { .. } => "set",
        }
    }

    fn edit(&self, assignments: &mut Assignments) {
        match self {
            Self::AddCapability { email, capability } => {
                assignments.entry(email.as_str()).insert(capability.clone());
            },
            Self::RemoveCapability { email, capability } => {
                assignments.entry(email.as_str()).remove(capability);
            },
            Self::SetCapabilities {
                email,
                capabilities,
            } => {
                assignments.replace(email.as_str(), capabilities.clone());
            },
        }
    }
}

/// Apply `mutation` to a copy of `current` and persist the result.
///
/// Returns the new document only once `store` has saved it. On failure
/// `current` is untouched and nothing should be published.
///
/// # Errors
///
/// Returns the store's error if saving fails.
pub async fn apply(
    mutation: &CapabilityMutation,
    store: &dyn AssignmentStore,
    current: &Assignments,
) -> StorageResult<Assignments> {
    let mut next = current.clone();
    mutation.edit(&mut next);
    store.save(&next).await?;
    Ok(next)
}

/// Response body for management operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityReport {
    /// Always `"ok"`; failures are reported as errors instead.
    pub status: String,
    /// Identity the report is about.
    pub email: Identity,
    /// Effective capability names, including implied ones.
    pub capabilities: BTreeSet<String>,
}

impl CapabilityReport {
    /// A successful report.
    #[must_use]
    pub fn ok(email: Identity, capabilities: BTreeSet<String>) -> Self {
        Self {
            status: "ok".to_owned(),
            email,
            capabilities,
        }
    }
}

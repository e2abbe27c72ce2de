//! Baseline grants that do not live in the assignment store.

use std::collections::BTreeMap;

/// Capability granted management rights unless configured otherwise.
pub const DEFAULT_MANAGEMENT_CAPABILITY: &str = "user_management";

/// Grants fixed at startup, by capability name.
///
/// Names are resolved against the graph when an
/// [`Authorizer`](crate::Authorizer) is built; unknown names fail the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Granted to every authenticated identity.
    pub defaults: Vec<String>,
    /// Granted to requests without an identity.
    pub guest: Vec<String>,
    /// Per-identity grants that assignment changes cannot remove.
    pub overrides: BTreeMap<String, Vec<String>>,
    /// Capability that allows managing other identities' assignments. When
    /// the graph has no such capability, nobody can manage assignments.
    pub management: String,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            defaults: Vec::new(),
            guest: Vec::new(),
            overrides: BTreeMap::new(),
            management: DEFAULT_MANAGEMENT_CAPABILITY.to_owned(),
        }
    }
}

impl Policy {
    /// An empty policy with the default management capability name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `capability` to every authenticated identity.
    #[must_use]
    pub fn with_default(mut self, capability: impl Into<String>) -> Self {
        self.defaults.push(capability.into());
        self
    }

    /// Grant `capability` to anonymous requests.
    #[must_use]
    pub fn with_guest(mut self, capability: impl Into<String>) -> Self {
        self.guest.push(capability.into());
        self
    }

    /// Pin `capability` to `identity` regardless of stored assignments.
    #[must_use]
    pub fn with_override(
        mut self,
        identity: impl Into<String>,
        capability: impl Into<String>,
    ) -> Self {
        self.overrides
            .entry(identity.into())
            .or_default()
            .push(capability.into());
        self
    }

    /// Use `capability` as the management capability.
    #[must_use]
    pub fn with_management(mut self, capability: impl Into<String>) -> Self {
        self.management = capability.into();
        self
    }
}

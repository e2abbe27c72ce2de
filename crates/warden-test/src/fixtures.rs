//! Test fixtures: the village capability graph and its inhabitants.

use std::collections::BTreeMap;
use std::sync::Arc;

use warden_auth::{Authorizer, Identity, Policy};
use warden_capabilities::CapabilityGraph;
use warden_storage::{AssignmentStore, Assignments, MemoryAssignmentStore};

/// Identity pinned to `admin` by [`test_policy`].
pub const ADMIN_EMAIL: &str = "admin@admin.admin";

/// The village graph as an adjacency list.
///
/// `mafia`, `police`, `baker` imply `villager`; `mayor` implies `villager`
/// and `police`; `user_management` stands alone.
#[must_use]
pub fn test_village_adjacency() -> BTreeMap<String, Vec<String>> {
    [
        ("villager", &[][..]),
        ("mafia", &["villager"][..]),
        ("police", &["villager"][..]),
        ("mayor", &["villager", "police"][..]),
        ("baker", &["villager"][..]),
        ("user_management", &[][..]),
    ]
    .into_iter()
    .map(|(name, implies)| {
        (
            name.to_owned(),
            implies.iter().map(|s| (*s).to_owned()).collect(),
        )
    })
    .collect()
}

/// The village graph with a synthesized `admin`.
///
/// # Panics
///
/// Never for the built-in adjacency list.
#[must_use]
pub fn test_village_graph() -> Arc<CapabilityGraph> {
    Arc::new(
        CapabilityGraph::from_adjacency(&test_village_adjacency(), Some("admin"))
            .expect("village graph is valid"),
    )
}

/// Assignments for the usual suspects.
#[must_use]
pub fn test_village_assignments() -> Assignments {
    Assignments::from_iter([
        ("boss@corleone.com", vec!["mafia"]),
        ("paul.baguette@corleone.com", vec!["mafia", "baker"]),
        ("wiggum@springfield.us", vec!["police"]),
        ("quimby@springfield.us", vec!["mayor"]),
    ])
}

/// A policy pinning `admin` to [`ADMIN_EMAIL`] and nothing else.
#[must_use]
pub fn test_policy() -> Policy {
    Policy::new().with_override(ADMIN_EMAIL, "admin")
}

/// The identity holding the `admin` override.
#[must_use]
pub fn test_admin() -> Identity {
    Identity::new(ADMIN_EMAIL)
}

/// An identity from the village.
#[must_use]
pub fn test_identity(email: &str) -> Identity {
    Identity::new(email)
}

/// An [`Authorizer`] over the village graph with [`test_policy`] and an
/// in-memory store holding `assignments`.
///
/// # Panics
///
/// Panics if the authorizer cannot be built, which only happens if the
/// fixtures are inconsistent.
pub async fn test_authorizer(assignments: Assignments) -> Authorizer {
    test_authorizer_with(
        Arc::new(MemoryAssignmentStore::with_assignments(assignments)),
        &test_policy(),
    )
    .await
}

/// An [`Authorizer`] over the village graph with a caller-supplied store
/// and policy.
///
/// # Panics
///
/// Panics if the policy names capabilities outside the village graph or
/// the store fails to load.
pub async fn test_authorizer_with(store: Arc<dyn AssignmentStore>, policy: &Policy) -> Authorizer {
    Authorizer::load(test_village_graph(), store, policy)
        .await
        .expect("village authorizer")
}

/// A `warden.toml` describing the village.
pub const VILLAGE_CONFIG_TOML: &str = r#"
[capabilities]
default = []
guest = []

[capabilities.graph]
villager = []
mafia = ["villager"]
police = ["villager"]
mayor = ["villager", "police"]
baker = ["villager"]
user_management = []

[overrides]
"admin@admin.admin" = ["admin"]
"#;

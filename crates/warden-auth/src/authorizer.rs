//! Effective capability sets and assignment management.
//!
//! An identity's effective capability is the union of what the assignment
//! store grants it, what the policy pins to it as an override, and the
//! policy's defaults. Anonymous requests get the guest grants only.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};
use warden_capabilities::{CapabilityGraph, CapabilityId, CapabilityUnion};
use warden_storage::{AssignmentStore, Assignments};

use crate::error::{AuthError, AuthResult};
use crate::identity::Identity;
use crate::mutation::{self, CapabilityMutation, CapabilityReport};
use crate::policy::Policy;

/// Something that names a capability in a graph.
pub trait CapabilityRef {
    /// Resolve to a handle in `graph`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownCapability`] if `graph` has no such
    /// capability.
    fn resolve(&self, graph: &CapabilityGraph) -> AuthResult<CapabilityId>;
}

impl CapabilityRef for CapabilityId {
    fn resolve(&self, graph: &CapabilityGraph) -> AuthResult<CapabilityId> {
        graph
            .capability(*self)
            .map(|_| *self)
            .ok_or_else(|| AuthError::UnknownCapability {
                name: format!("#{}", self.index()),
            })
    }
}

impl CapabilityRef for str {
    fn resolve(&self, graph: &CapabilityGraph) -> AuthResult<CapabilityId> {
        graph.get(self).ok_or_else(|| AuthError::UnknownCapability {
            name: self.to_owned(),
        })
    }
}

impl CapabilityRef for String {
    fn resolve(&self, graph: &CapabilityGraph) -> AuthResult<CapabilityId> {
        self.as_str().resolve(graph)
    }
}

fn resolve_names(graph: &CapabilityGraph, names: &[String]) -> AuthResult<BTreeSet<CapabilityId>> {
    names.iter().map(|name| name.resolve(graph)).collect()
}

/// Answers "may this identity do that?" and manages stored assignments.
///
/// Checks are synchronous and read a snapshot of the stored assignments.
/// Mutations are serialized, persisted, and only then published, so a
/// failed save leaves the snapshot unchanged.
pub struct Authorizer {
    graph: Arc<CapabilityGraph>,
    store: Arc<dyn AssignmentStore>,
    assigned: RwLock<Assignments>,
    overrides: HashMap<Identity, BTreeSet<CapabilityId>>,
    defaults: BTreeSet<CapabilityId>,
    guest: BTreeSet<CapabilityId>,
    management: String,
    manage: Option<CapabilityId>,
    writer: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("capabilities", &self.graph.len())
            .field("overrides", &self.overrides.len())
            .field("defaults", &self.defaults)
            .field("guest", &self.guest)
            .field("management", &self.management)
            .finish_non_exhaustive()
    }
}

impl Authorizer {
    /// Resolve `policy` against `graph` and load the stored assignments.
    ///
    /// Stored capability names the graph does not know are kept in the
    /// document but grant nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownCapability`] if the policy names a
    /// capability missing from the graph, or a storage error if loading
    /// fails.
    pub async fn load(
        graph: Arc<CapabilityGraph>,
        store: Arc<dyn AssignmentStore>,
        policy: &Policy,
    ) -> AuthResult<Self> {
        let defaults = resolve_names(&graph, &policy.defaults)?;
        let guest = resolve_names(&graph, &policy.guest)?;
        let overrides = policy
            .overrides
            .iter()
            .map(|(identity, names)| {
                Ok((Identity::new(identity.clone()), resolve_names(&graph, names)?))
            })
            .collect::<AuthResult<HashMap<_, _>>>()?;

        let manage = graph.get(&policy.management);
        if manage.is_none() {
            warn!(
                management = %policy.management,
                "management capability not in graph, assignments are read-only"
            );
        }

        let assigned = store.load().await?;
        for (identity, names) in assigned.iter() {
            for name in names.iter().filter(|name| graph.get(name).is_none()) {
                warn!(%identity, capability = %name, "ignoring unknown stored capability");
            }
        }

        info!(
            identities = assigned.len(),
            overrides = overrides.len(),
            defaults = defaults.len(),
            guest = guest.len(),
            "loaded capability assignments"
        );

        Ok(Self {
            graph,
            store,
            assigned: RwLock::new(assigned),
            overrides,
            defaults,
            guest,
            management: policy.management.clone(),
            manage,
            writer: tokio::sync::Mutex::new(()),
        })
    }

    /// The capability graph checks run against.
    #[must_use]
    pub fn graph(&self) -> &CapabilityGraph {
        &self.graph
    }

    /// Configured name of the management capability.
    #[must_use]
    pub fn management(&self) -> &str {
        &self.management
    }

    /// The management capability, if the graph defines it.
    #[must_use]
    pub fn management_capability(&self) -> Option<CapabilityId> {
        self.manage
    }

    /// Copy of the stored assignment document.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the snapshot lock is poisoned.
    pub fn snapshot(&self) -> AuthResult<Assignments> {
        self.assigned
            .read()
            .map(|assigned| assigned.clone())
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Capability names stored for `identity`, without overrides, defaults
    /// or implications.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the snapshot lock is poisoned.
    pub fn assigned(&self, identity: &Identity) -> AuthResult<BTreeSet<String>> {
        let assigned = self
            .assigned
            .read()
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(assigned.get(identity.as_str()).cloned().unwrap_or_default())
    }

    fn effective_ids(&self, identity: Option<&Identity>) -> AuthResult<BTreeSet<CapabilityId>> {
        let Some(identity) = identity else {
            return Ok(self.guest.clone());
        };

        let mut ids = self.defaults.clone();
        if let Some(pinned) = self.overrides.get(identity) {
            ids.extend(pinned);
        }

        let assigned = self
            .assigned
            .read()
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if let Some(names) = assigned.get(identity.as_str()) {
            ids.extend(names.iter().filter_map(|name| self.graph.get(name)));
        }

        Ok(ids)
    }

    /// Union of every capability `identity` (or a guest, for `None`) holds.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the snapshot lock is poisoned.
    pub fn effective(&self, identity: Option<&Identity>) -> AuthResult<CapabilityUnion<'_>> {
        Ok(self.graph.union(self.effective_ids(identity)?))
    }

    /// Whether `identity` (or a guest, for `None`) holds `required`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownCapability`] if `required` is not in the
    /// graph.
    pub fn check<R>(&self, identity: Option<&Identity>, required: &R) -> AuthResult<bool>
    where
        R: CapabilityRef + ?Sized,
    {
        let required = required.resolve(&self.graph)?;
        Ok(self.effective(identity)?.contains(required))
    }

    /// Names of every capability `identity` holds, implied ones included.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the snapshot lock is poisoned.
    pub fn list_effective(&self, identity: Option<&Identity>) -> AuthResult<BTreeSet<String>> {
        Ok(self.effective(identity)?.closure_names())
    }

    /// Admit `identity` only if it is present and holds `required`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] without an identity and
    /// [`AuthError::Forbidden`] when the capability is missing.
    pub fn require<R>(&self, identity: Option<&Identity>, required: &R) -> AuthResult<Identity>
    where
        R: CapabilityRef + ?Sized,
    {
        let required = required.resolve(&self.graph)?;
        let name = self.graph.name(required).unwrap_or_default();

        let Some(identity) = identity else {
            info!(capability = name, "denied anonymous request");
            return Err(AuthError::Unauthenticated);
        };

        let held = self.effective(Some(identity))?;
        if held.contains(required) {
            debug!(%identity, capability = name, "capability granted");
            Ok(identity.clone())
        } else {
            info!(%identity, capability = name, held = %held, "capability denied");
            Err(AuthError::Forbidden {
                required: name.to_owned(),
                held: held.to_string(),
            })
        }
    }

    /// Whether `identity` may manage other identities' assignments.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if the snapshot lock is poisoned.
    pub fn is_manager(&self, identity: &Identity) -> AuthResult<bool> {
        match self.manage {
            Some(manage) => Ok(self.effective(Some(identity))?.contains(manage)),
            None => Ok(false),
        }
    }

    fn ensure_manager<'a>(&self, caller: Option<&'a Identity>) -> AuthResult<&'a Identity> {
        let caller = caller.ok_or(AuthError::Unauthenticated)?;
        if self.is_manager(caller)? {
            Ok(caller)
        } else {
            info!(%caller, management = %self.management, "management denied");
            Err(AuthError::PermissionDenied {
                required: self.management.clone(),
            })
        }
    }

    fn report(&self, identity: &Identity) -> AuthResult<CapabilityReport> {
        Ok(CapabilityReport::ok(
            identity.clone(),
            self.list_effective(Some(identity))?,
        ))
    }

    /// Apply `mutation` on behalf of `caller` and persist it.
    ///
    /// The report lists the target's effective capabilities afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] without a caller,
    /// [`AuthError::PermissionDenied`] if the caller cannot manage
    /// assignments, [`AuthError::UnknownCapability`] for names outside the
    /// graph, and a storage error if the save fails.
    pub async fn mutate(
        &self,
        caller: Option<&Identity>,
        mutation: CapabilityMutation,
    ) -> AuthResult<CapabilityReport> {
        let caller = self.ensure_manager(caller)?;
        for name in mutation.capability_names() {
            name.resolve(&self.graph)?;
        }

        let _writer = self.writer.lock().await;
        let current = self.snapshot()?;
        let next = mutation::apply(&mutation, self.store.as_ref(), &current).await?;
        *self
            .assigned
            .write()
            .map_err(|e| AuthError::Internal(e.to_string()))? = next;

        info!(
            %caller,
            target = %mutation.target(),
            op = mutation.kind(),
            capabilities = ?mutation.capability_names(),
            "capability assignment changed"
        );
        self.report(mutation.target())
    }

    /// Grant `capability` to `email`.
    ///
    /// # Errors
    ///
    /// See [`mutate`](Self::mutate).
    pub async fn add(
        &self,
        caller: Option<&Identity>,
        email: &Identity,
        capability: &str,
    ) -> AuthResult<CapabilityReport> {
        self.mutate(
            caller,
            CapabilityMutation::AddCapability {
                email: email.clone(),
                capability: capability.to_owned(),
            },
        )
        .await
    }

    /// Withdraw a stored `capability` from `email`. Overrides are unaffected.
    ///
    /// # Errors
    ///
    /// See [`mutate`](Self::mutate).
    pub async fn remove(
        &self,
        caller: Option<&Identity>,
        email: &Identity,
        capability: &str,
    ) -> AuthResult<CapabilityReport> {
        self.mutate(
            caller,
            CapabilityMutation::RemoveCapability {
                email: email.clone(),
                capability: capability.to_owned(),
            },
        )
        .await
    }

    /// Replace every stored capability of `email`.
    ///
    /// # Errors
    ///
    /// See [`mutate`](Self::mutate).
    pub async fn set<I, S>(
        &self,
        caller: Option<&Identity>,
        email: &Identity,
        capabilities: I,
    ) -> AuthResult<CapabilityReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mutate(
            caller,
            CapabilityMutation::SetCapabilities {
                email: email.clone(),
                capabilities: capabilities.into_iter().map(Into::into).collect(),
            },
        )
        .await
    }

    /// Effective capabilities of `email`, or of the caller when `None`.
    ///
    /// Listing oneself is always allowed; listing someone else requires the
    /// management capability.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] without a caller and
    /// [`AuthError::PermissionDenied`] when listing another identity without
    /// management rights.
    pub fn list(
        &self,
        caller: Option<&Identity>,
        email: Option<&Identity>,
    ) -> AuthResult<CapabilityReport> {
        let caller = caller.ok_or(AuthError::Unauthenticated)?;
        let target = email.unwrap_or(caller);
        if target != caller {
            self.ensure_manager(Some(caller))?;
        }
        self.report(target)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use warden_storage::{MemoryAssignmentStore, StorageError, StorageResult};

    use super::*;

    fn village_graph() -> Arc<CapabilityGraph> {
        let adjacency: BTreeMap<String, Vec<String>> = [
            ("villager", vec![]),
            ("mafia", vec!["villager"]),
            ("police", vec!["villager"]),
            ("mayor", vec!["villager", "police"]),
            ("baker", vec!["villager"]),
            ("user_management", vec![]),
        ]
        .into_iter()
        .map(|(name, implies)| {
            (
                name.to_owned(),
                implies.into_iter().map(str::to_owned).collect(),
            )
        })
        .collect();
        Arc::new(CapabilityGraph::from_adjacency(&adjacency, Some("admin")).unwrap())
    }

    fn admin() -> Identity {
        Identity::new("admin@admin.admin")
    }

    fn boss() -> Identity {
        Identity::new("boss@corleone.com")
    }

    async fn authorizer(store: Arc<dyn AssignmentStore>, policy: &Policy) -> Authorizer {
        Authorizer::load(village_graph(), store, policy).await.unwrap()
    }

    fn admin_policy() -> Policy {
        Policy::new().with_override("admin@admin.admin", "admin")
    }

    struct ReadOnlyStore(Assignments);

    #[async_trait]
    impl AssignmentStore for ReadOnlyStore {
        async fn load(&self) -> StorageResult<Assignments> {
            Ok(self.0.clone())
        }

        async fn save(&self, _assignments: &Assignments) -> StorageResult<()> {
            Err(StorageError::Internal("read-only".into()))
        }
    }

    #[tokio::test]
    async fn test_assigned_capability_implies() {
        let store = Arc::new(MemoryAssignmentStore::with_assignments(
            Assignments::from_iter([("boss@corleone.com", ["mafia"])]),
        ));
        let auth = authorizer(store, &Policy::new()).await;

        assert!(auth.check(Some(&boss()), "mafia").unwrap());
        assert!(auth.check(Some(&boss()), "villager").unwrap());
        assert!(!auth.check(Some(&boss()), "mayor").unwrap());
        assert!(!auth.check(Some(&boss()), "police").unwrap());
    }

    #[tokio::test]
    async fn test_check_by_handle() {
        let store = Arc::new(MemoryAssignmentStore::with_assignments(
            Assignments::from_iter([("boss@corleone.com", ["mafia"])]),
        ));
        let auth = authorizer(store, &Policy::new()).await;
        let villager = auth.graph().lookup("villager").unwrap();

        assert!(auth.check(Some(&boss()), &villager).unwrap());
    }

    #[tokio::test]
    async fn test_guest_and_defaults() {
        let policy = Policy::new().with_default("villager").with_guest("baker");
        let auth = authorizer(Arc::new(MemoryAssignmentStore::new()), &policy).await;

        assert!(auth.check(None, "baker").unwrap());
        assert!(!auth.check(None, "villager").unwrap());
        assert_eq!(
            auth.list_effective(None).unwrap(),
            BTreeSet::from(["baker".to_owned(), "villager".to_owned()])
        );

        let stranger = Identity::new("stranger@nowhere");
        assert!(auth.check(Some(&stranger), "villager").unwrap());
        assert!(!auth.check(Some(&stranger), "baker").unwrap());
    }

    #[tokio::test]
    async fn test_guest_ignores_assignments_and_overrides() {
        let store = Arc::new(MemoryAssignmentStore::with_assignments(
            Assignments::from_iter([("boss@corleone.com", ["mafia"])]),
        ));
        let auth = authorizer(store, &admin_policy().with_guest("baker")).await;

        assert!(auth.check(Some(&boss()), "mafia").unwrap());
        assert!(!auth.check(None, "mafia").unwrap());
        assert!(!auth.check(None, "admin").unwrap());
        assert!(!auth.check(None, "mayor").unwrap());
        assert_eq!(
            auth.list_effective(None).unwrap(),
            BTreeSet::from(["baker".to_owned(), "villager".to_owned()])
        );
    }

    #[tokio::test]
    async fn test_unknown_capability() {
        let auth = authorizer(Arc::new(MemoryAssignmentStore::new()), &Policy::new()).await;
        assert!(matches!(
            auth.check(Some(&boss()), "ghost"),
            Err(AuthError::UnknownCapability { name }) if name == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_policy_with_unknown_name_fails() {
        let result = Authorizer::load(
            village_graph(),
            Arc::new(MemoryAssignmentStore::new()),
            &Policy::new().with_default("ghost"),
        )
        .await;
        assert!(matches!(result, Err(AuthError::UnknownCapability { .. })));
    }

    #[tokio::test]
    async fn test_unknown_stored_name_grants_nothing() {
        let store = Arc::new(MemoryAssignmentStore::with_assignments(
            Assignments::from_iter([("boss@corleone.com", ["retired", "mafia"])]),
        ));
        let auth = authorizer(store, &Policy::new()).await;

        assert!(auth.check(Some(&boss()), "mafia").unwrap());
        assert!(!auth.list_effective(Some(&boss())).unwrap().contains("retired"));
        assert!(auth.assigned(&boss()).unwrap().contains("retired"));
    }

    #[tokio::test]
    async fn test_require() {
        let store = Arc::new(MemoryAssignmentStore::with_assignments(
            Assignments::from_iter([("boss@corleone.com", ["mafia"])]),
        ));
        let auth = authorizer(store, &Policy::new().with_guest("villager")).await;

        assert_eq!(auth.require(Some(&boss()), "villager").unwrap(), boss());
        assert!(matches!(
            auth.require(None, "villager"),
            Err(AuthError::Unauthenticated)
        ));
        match auth.require(Some(&boss()), "mayor") {
            Err(AuthError::Forbidden { required, held }) => {
                assert_eq!(required, "mayor");
                assert_eq!(held, "mafia");
            },
            other => panic!("expected forbidden, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_override_survives_removal() {
        let store = Arc::new(MemoryAssignmentStore::with_assignments(
            Assignments::from_iter([("admin@admin.admin", ["admin"])]),
        ));
        let auth = authorizer(Arc::clone(&store) as Arc<dyn AssignmentStore>, &admin_policy()).await;

        auth.remove(Some(&admin()), &admin(), "admin").await.unwrap();

        assert!(!store.snapshot().unwrap().has("admin@admin.admin", "admin"));
        assert!(auth.check(Some(&admin()), "admin").unwrap());
        assert!(auth.list_effective(Some(&admin())).unwrap().contains("admin"));
    }

    #[tokio::test]
    async fn test_set_replaces_and_reports_effective() {
        let store = Arc::new(MemoryAssignmentStore::with_assignments(
            Assignments::from_iter([("paul.baguette@corleone.com", ["mafia"])]),
        ));
        let auth = authorizer(Arc::clone(&store) as Arc<dyn AssignmentStore>, &admin_policy()).await;
        let paul = Identity::new("paul.baguette@corleone.com");

        let report = auth.set(Some(&admin()), &paul, ["baker"]).await.unwrap();

        assert_eq!(report.status, "ok");
        assert_eq!(report.email, paul);
        assert_eq!(
            report.capabilities,
            BTreeSet::from(["baker".to_owned(), "villager".to_owned()])
        );
        assert!(!auth.check(Some(&paul), "mafia").unwrap());
        assert_eq!(
            store.snapshot().unwrap().get("paul.baguette@corleone.com"),
            Some(&BTreeSet::from(["baker".to_owned()]))
        );
    }

    #[tokio::test]
    async fn test_mutation_requires_management() {
        let auth = authorizer(Arc::new(MemoryAssignmentStore::new()), &admin_policy()).await;

        assert!(matches!(
            auth.add(None, &boss(), "mafia").await,
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            auth.add(Some(&boss()), &boss(), "mayor").await,
            Err(AuthError::PermissionDenied { required }) if required == "user_management"
        ));
        assert!(auth.assigned(&boss()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_management_capability_locks_assignments() {
        let policy = admin_policy().with_management("nonexistent");
        let auth = authorizer(Arc::new(MemoryAssignmentStore::new()), &policy).await;

        assert!(auth.management_capability().is_none());
        assert!(!auth.is_manager(&admin()).unwrap());
        assert!(matches!(
            auth.add(Some(&admin()), &boss(), "mafia").await,
            Err(AuthError::PermissionDenied { .. })
        ));
    }

    #[tokio::test]
    async fn test_mutation_rejects_unknown_capability() {
        let auth = authorizer(Arc::new(MemoryAssignmentStore::new()), &admin_policy()).await;
        assert!(matches!(
            auth.set(Some(&admin()), &boss(), ["mafia", "ghost"]).await,
            Err(AuthError::UnknownCapability { name }) if name == "ghost"
        ));
        assert!(auth.assigned(&boss()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_state_unchanged() {
        let store = Arc::new(ReadOnlyStore(Assignments::from_iter([(
            "boss@corleone.com",
            ["mafia"],
        )])));
        let auth = authorizer(store, &admin_policy()).await;

        let result = auth.add(Some(&admin()), &boss(), "mayor").await;
        assert!(matches!(result, Err(AuthError::Storage(_))));
        assert!(!auth.check(Some(&boss()), "mayor").unwrap());
        assert!(auth.check(Some(&boss()), "mafia").unwrap());
    }

    #[tokio::test]
    async fn test_list_self_service() {
        let store = Arc::new(MemoryAssignmentStore::with_assignments(
            Assignments::from_iter([("boss@corleone.com", ["mafia"])]),
        ));
        let auth = authorizer(store, &admin_policy()).await;

        let own = auth.list(Some(&boss()), None).unwrap();
        assert_eq!(own.email, boss());
        assert!(own.capabilities.contains("villager"));

        assert!(auth.list(Some(&boss()), Some(&boss())).is_ok());
        assert!(matches!(
            auth.list(Some(&boss()), Some(&admin())),
            Err(AuthError::PermissionDenied { .. })
        ));
        assert!(matches!(auth.list(None, None), Err(AuthError::Unauthenticated)));

        let other = auth.list(Some(&admin()), Some(&boss())).unwrap();
        assert_eq!(other.email, boss());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_are_not_lost() {
        let store = Arc::new(MemoryAssignmentStore::new());
        let auth = Arc::new(
            authorizer(Arc::clone(&store) as Arc<dyn AssignmentStore>, &admin_policy()).await,
        );

        let capabilities = ["villager", "mafia", "police", "mayor", "baker"];
        let tasks = capabilities.map(|capability| {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move {
                auth.add(Some(&admin()), &boss(), capability).await.unwrap();
            })
        });
        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }

        let stored = store.snapshot().unwrap();
        for capability in capabilities {
            assert!(stored.has("boss@corleone.com", capability));
        }
        assert_eq!(auth.assigned(&boss()).unwrap().len(), capabilities.len());
    }
}

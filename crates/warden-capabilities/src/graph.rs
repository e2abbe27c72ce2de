//! Capability registry and implication graph.
//!
//! Capabilities live in an arena owned by [`CapabilityGraph`]. A
//! [`CapabilityId`] is a stable index into that arena, so two capabilities
//! are the same exactly when their ids are equal. Names are only used to
//! find a node, never to compare two of them.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{CapabilityError, CapabilityResult};
use crate::union::CapabilityUnion;

/// Name given to the synthesized super-capability unless configured otherwise.
pub const DEFAULT_ADMIN_NAME: &str = "admin";

/// Handle to a capability registered in a [`CapabilityGraph`].
///
/// Handles are only meaningful for the graph that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CapabilityId(usize);

impl CapabilityId {
    /// Position of the capability in its graph's arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A registered capability node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    name: String,
    implies: Vec<CapabilityId>,
}

impl Capability {
    /// The capability's registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capabilities directly implied by this one.
    #[must_use]
    pub fn implies(&self) -> &[CapabilityId] {
        &self.implies
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Registry of named capabilities and the implications between them.
///
/// Built once at startup and then only read. The graph is handed to whoever
/// needs it; there is no process-wide registry.
#[derive(Debug, Clone, Default)]
pub struct CapabilityGraph {
    nodes: Vec<Capability>,
    by_name: HashMap<String, CapabilityId>,
    admin: Option<CapabilityId>,
}

impl CapabilityGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from an adjacency list of `name -> implied names`.
    ///
    /// All names are registered first, then edges are wired, so the order of
    /// entries does not matter. An implied name that has no entry of its own
    /// is a configuration error. When `admin` is set, a super-capability with
    /// that name is synthesized last and implies every other node.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::UnknownImplication`] for dangling edges,
    /// [`CapabilityError::InvalidName`] for unusable names, and
    /// [`CapabilityError::DuplicateName`] if `admin` collides with a
    /// configured capability.
    pub fn from_adjacency(
        adjacency: &BTreeMap<String, Vec<String>>,
        admin: Option<&str>,
    ) -> CapabilityResult<Self> {
        let mut graph = Self::new();

        for name in adjacency.keys() {
            graph.insert_node(name)?;
        }

        for (name, implied) in adjacency {
            let id = graph.lookup(name)?;
            let targets = graph.resolve_implied(name, implied)?;
            graph.link(id, targets);
        }

        if let Some(admin_name) = admin {
            graph.synthesize_admin(admin_name)?;
        }

        debug!(
            capabilities = graph.len(),
            admin = admin.unwrap_or("<none>"),
            "built capability graph"
        );
        Ok(graph)
    }

    /// Register a capability implying already-registered capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::DuplicateName`] if `name` is taken and
    /// [`CapabilityError::UnknownImplication`] if any implied name has not
    /// been registered yet.
    pub fn register<I, S>(&mut self, name: &str, implies: I) -> CapabilityResult<CapabilityId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        validate_name(name)?;
        if self.by_name.contains_key(name) {
            return Err(CapabilityError::DuplicateName {
                name: name.to_owned(),
            });
        }

        let targets = self.resolve_implied(name, implies)?;
        let id = self.insert_node(name)?;
        self.link(id, targets);
        Ok(id)
    }

    /// Register a capability implying every capability registered so far.
    ///
    /// Capabilities registered afterwards are not implied by it, so this
    /// must run after the domain capabilities are in place.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::DuplicateName`] if `name` is already taken.
    pub fn synthesize_admin(&mut self, name: &str) -> CapabilityResult<CapabilityId> {
        let everything: Vec<CapabilityId> = self.ids().collect();
        let id = self.insert_node(name)?;
        self.link(id, everything);
        self.admin = Some(id);
        debug!(admin = name, implies = self.len().saturating_sub(1), "synthesized admin capability");
        Ok(id)
    }

    /// Find a capability by name.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::NotFound`] if no capability has that name.
    pub fn lookup(&self, name: &str) -> CapabilityResult<CapabilityId> {
        self.get(name).ok_or_else(|| CapabilityError::NotFound {
            name: name.to_owned(),
        })
    }

    /// Find a capability by name, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<CapabilityId> {
        self.by_name.get(name).copied()
    }

    /// The node behind a handle.
    #[must_use]
    pub fn capability(&self, id: CapabilityId) -> Option<&Capability> {
        self.nodes.get(id.0)
    }

    /// Name of the capability behind a handle.
    #[must_use]
    pub fn name(&self, id: CapabilityId) -> Option<&str> {
        self.capability(id).map(Capability::name)
    }

    /// The synthesized admin capability, if one was created.
    #[must_use]
    pub fn admin(&self) -> Option<CapabilityId> {
        self.admin
    }

    /// Whether `holder` contains `required`: either they are the same node,
    /// or `required` is reachable through implications from `holder`.
    #[must_use]
    pub fn contains(&self, holder: CapabilityId, required: CapabilityId) -> bool {
        self.reaches([holder], required)
    }

    /// An anonymous capability implying every member of `members`.
    #[must_use]
    pub fn union<I>(&self, members: I) -> CapabilityUnion<'_>
    where
        I: IntoIterator<Item = CapabilityId>,
    {
        CapabilityUnion::new(self, members)
    }

    /// Every capability reachable from `starts`, the starts included.
    #[must_use]
    pub fn closure<I>(&self, starts: I) -> BTreeSet<CapabilityId>
    where
        I: IntoIterator<Item = CapabilityId>,
    {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack: Vec<CapabilityId> = starts.into_iter().collect();
        let mut reached = BTreeSet::new();

        while let Some(id) = stack.pop() {
            let Some(seen) = visited.get_mut(id.0) else {
                continue;
            };
            if *seen {
                continue;
            }
            *seen = true;
            reached.insert(id);
            stack.extend_from_slice(&self.nodes[id.0].implies);
        }

        reached
    }

    /// Depth-first search from `starts` for `target`.
    ///
    /// Visited nodes are tracked, so cyclic graphs terminate.
    pub(crate) fn reaches<I>(&self, starts: I, target: CapabilityId) -> bool
    where
        I: IntoIterator<Item = CapabilityId>,
    {
        if target.0 >= self.nodes.len() {
            return false;
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut stack: Vec<CapabilityId> = starts.into_iter().collect();

        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            let Some(seen) = visited.get_mut(id.0) else {
                continue;
            };
            if *seen {
                continue;
            }
            *seen = true;
            stack.extend_from_slice(&self.nodes[id.0].implies);
        }

        false
    }

    /// Number of registered capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no capability is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Handles of all registered capabilities, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = CapabilityId> + '_ {
        (0..self.nodes.len()).map(CapabilityId)
    }

    /// Registered capabilities with their handles, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (CapabilityId, &Capability)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (CapabilityId(index), node))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> BTreeSet<&str> {
        self.nodes.iter().map(Capability::name).collect()
    }

    fn insert_node(&mut self, name: &str) -> CapabilityResult<CapabilityId> {
        validate_name(name)?;
        if self.by_name.contains_key(name) {
            return Err(CapabilityError::DuplicateName {
                name: name.to_owned(),
            });
        }

        let id = CapabilityId(self.nodes.len());
        self.nodes.push(Capability {
            name: name.to_owned(),
            implies: Vec::new(),
        });
        self.by_name.insert(name.to_owned(), id);
        trace!(capability = name, index = id.0, "registered capability");
        Ok(id)
    }

    fn resolve_implied<I, S>(&self, name: &str, implied: I) -> CapabilityResult<Vec<CapabilityId>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        implied
            .into_iter()
            .map(|target| {
                let target = target.as_ref();
                self.get(target)
                    .ok_or_else(|| CapabilityError::UnknownImplication {
                        name: name.to_owned(),
                        implied: target.to_owned(),
                    })
            })
            .collect()
    }

    fn link(&mut self, id: CapabilityId, targets: Vec<CapabilityId>) {
        let node = &mut self.nodes[id.0];
        for target in targets {
            if !node.implies.contains(&target) {
                node.implies.push(target);
            }
        }
    }
}

/// Reject names that cannot round-trip through configuration or descriptions.
fn validate_name(name: &str) -> CapabilityResult<()> {
    if name.trim().is_empty() || name.contains('&') {
        return Err(CapabilityError::InvalidName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

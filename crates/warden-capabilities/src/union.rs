//! Anonymous union capabilities.

use std::collections::BTreeSet;

use crate::graph::{CapabilityGraph, CapabilityId};

/// A throwaway, unnamed capability implying a set of registered ones.
///
/// Effective capability sets are checked by building one of these over every
/// capability a user holds and asking whether it contains the required one.
#[derive(Debug, Clone)]
pub struct CapabilityUnion<'g> {
    graph: &'g CapabilityGraph,
    members: BTreeSet<CapabilityId>,
}

impl<'g> CapabilityUnion<'g> {
    pub(crate) fn new<I>(graph: &'g CapabilityGraph, members: I) -> Self
    where
        I: IntoIterator<Item = CapabilityId>,
    {
        Self {
            graph,
            members: members.into_iter().collect(),
        }
    }

    /// Whether some member contains `required`.
    #[must_use]
    pub fn contains(&self, required: CapabilityId) -> bool {
        self.graph.reaches(self.members.iter().copied(), required)
    }

    /// Directly implied members.
    #[must_use]
    pub fn members(&self) -> &BTreeSet<CapabilityId> {
        &self.members
    }

    /// Whether the union implies nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Every capability the union contains.
    #[must_use]
    pub fn closure(&self) -> BTreeSet<CapabilityId> {
        self.graph.closure(self.members.iter().copied())
    }

    /// Names of every capability the union contains, sorted.
    #[must_use]
    pub fn closure_names(&self) -> BTreeSet<String> {
        self.closure()
            .into_iter()
            .filter_map(|id| self.graph.name(id))
            .map(str::to_owned)
            .collect()
    }
}

impl std::fmt::Display for CapabilityUnion<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.members.is_empty() {
            return f.write_str("none");
        }

        let mut first = true;
        for name in self.members.iter().filter_map(|id| self.graph.name(*id)) {
            if !first {
                f.write_str("&")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

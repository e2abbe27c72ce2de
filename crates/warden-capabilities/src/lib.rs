//! Warden Capabilities - named, composable permissions.
//!
//! This crate provides:
//! - An arena-backed [`CapabilityGraph`] of named capabilities
//! - Implication edges built from a declarative adjacency list
//! - An optional synthesized admin capability implying everything else
//! - Cycle-safe membership testing through [`CapabilityUnion`]
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use warden_capabilities::CapabilityGraph;
//!
//! let mut adjacency = BTreeMap::new();
//! adjacency.insert("villager".to_owned(), vec![]);
//! adjacency.insert("mafia".to_owned(), vec!["villager".to_owned()]);
//!
//! let graph = CapabilityGraph::from_adjacency(&adjacency, Some("admin")).unwrap();
//! let mafia = graph.lookup("mafia").unwrap();
//! let villager = graph.lookup("villager").unwrap();
//!
//! assert!(graph.contains(mafia, villager));
//! assert!(graph.contains(graph.admin().unwrap(), mafia));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod graph;
mod union;

pub use error::{CapabilityError, CapabilityResult};
pub use graph::{Capability, CapabilityGraph, CapabilityId, DEFAULT_ADMIN_NAME};
pub use union::CapabilityUnion;

//! Warden Storage - persistence for capability assignments.
//!
//! Assignments are a single document mapping each identity to the capability
//! names granted to it. The [`AssignmentStore`] trait loads and saves that
//! document as a whole. Implementations:
//!
//! - [`MemoryAssignmentStore`]: in-memory, for tests and ephemeral setups
//! - [`YamlFileStore`]: a YAML file, rewritten atomically on every save

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;

mod document;
mod file;
mod store;

pub use document::Assignments;
pub use error::{StorageError, StorageResult};
pub use file::YamlFileStore;
pub use store::{AssignmentStore, MemoryAssignmentStore};

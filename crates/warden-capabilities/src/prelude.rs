//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_capabilities::prelude::*;` to import all essential types.

// Errors
pub use crate::{CapabilityError, CapabilityResult};

// Graph
pub use crate::{Capability, CapabilityGraph, CapabilityId, CapabilityUnion};

//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_auth::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuthError, AuthResult};

// Identities
pub use crate::{Identity, UserInfo};

// Authorization
pub use crate::{Authorizer, CapabilityMutation, CapabilityRef, CapabilityReport, Policy};

// Tokens
pub use crate::{
    Gatekeeper, RefreshGrantExchange, TokenCache, TokenExchange, TokenGrant, TokenSealer,
};

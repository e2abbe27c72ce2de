//! Warden Auth - who may do what.
//!
//! This crate provides:
//! - [`Authorizer`]: effective capability sets built from stored
//!   assignments, overrides, defaults and guest grants, plus the management
//!   operations that change stored assignments
//! - [`TokenCache`]: refresh token to user resolution with expiry-driven
//!   refresh through a [`TokenExchange`]
//! - [`RefreshGrantExchange`]: the OAuth 2.0 refresh-token grant over HTTP
//! - [`TokenSealer`]: signs refresh tokens into the bearer tokens clients hold
//! - [`Gatekeeper`]: bearer/session identification and `require` checks
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use warden_auth::{Authorizer, Identity, Policy};
//! use warden_capabilities::CapabilityGraph;
//! use warden_storage::{Assignments, MemoryAssignmentStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let adjacency = BTreeMap::from([
//!     ("villager".to_owned(), vec![]),
//!     ("mafia".to_owned(), vec!["villager".to_owned()]),
//! ]);
//! let graph = Arc::new(CapabilityGraph::from_adjacency(&adjacency, Some("admin")).unwrap());
//! let store = Arc::new(MemoryAssignmentStore::with_assignments(
//!     Assignments::from_iter([("boss@corleone.com", ["mafia"])]),
//! ));
//!
//! let auth = Authorizer::load(graph, store, &Policy::new()).await.unwrap();
//! let boss = Identity::new("boss@corleone.com");
//! assert!(auth.check(Some(&boss), "villager").unwrap());
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod authorizer;
mod cache;
mod error;
mod exchange;
mod gatekeeper;
mod identity;
pub mod mutation;
mod policy;
mod seal;

pub use authorizer::{Authorizer, CapabilityRef};
pub use cache::{DEFAULT_EXCHANGE_TIMEOUT, MAX_TOKEN_LIFETIME, TokenCache, fingerprint};
pub use error::{AuthError, AuthResult};
pub use exchange::{
    DEFAULT_EXPIRES_IN, ExchangeError, ExchangeResult, RefreshGrantExchange, TokenExchange,
    TokenGrant, decode_id_token,
};
pub use gatekeeper::{Gatekeeper, parse_bearer};
pub use identity::{Identity, UserInfo};
pub use mutation::{CapabilityMutation, CapabilityReport};
pub use policy::{DEFAULT_MANAGEMENT_CAPABILITY, Policy};
pub use seal::TokenSealer;

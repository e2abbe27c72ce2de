//! Warden Test - shared test utilities.
//!
//! Mocks and fixtures used as a dev-dependency by the Warden crates and the
//! integration tests.
//!
//! ```rust,ignore
//! use warden_test::{MockTokenExchange, test_authorizer, test_village_assignments};
//!
//! #[tokio::test]
//! async fn test_mafia_is_villager() {
//!     let auth = test_authorizer(test_village_assignments()).await;
//!     let boss = warden_auth::Identity::new("boss@corleone.com");
//!     assert!(auth.check(Some(&boss), "villager").unwrap());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

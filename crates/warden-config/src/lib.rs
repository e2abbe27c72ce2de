//! Configuration for the Warden authorization service.
//!
//! A single `warden.toml` describes the capability graph, baseline grants,
//! admin overrides, where assignments are stored, the token endpoint used to
//! refresh bearer tokens, and logging.
//!
//! # Usage
//!
//! ```rust,no_run
//! use warden_config::Config;
//!
//! let loaded = Config::load(None).unwrap();
//! println!("{} capabilities", loaded.config.capabilities.graph.len());
//! ```
//!
//! # Design
//!
//! This crate has no dependencies on other Warden crates. Turning these
//! types into a capability graph or a logging setup happens in the binary.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Environment variable fallbacks.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::LoadedConfig;
pub use types::*;

impl Config {
    /// Discover and load the configuration. See [`loader::load`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a file is malformed or the configuration
    /// fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<LoadedConfig> {
        loader::load(explicit)
    }

    /// Load one file without discovery or environment fallbacks.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}

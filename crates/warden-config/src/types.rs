//! Configuration types for Warden.
//!
//! These types mirror the domain types of the other Warden crates without
//! depending on them. Conversion happens at the binary boundary. Every
//! section implements [`Default`] so that an empty file is a working
//! configuration that grants nothing to anyone.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration loaded from `warden.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capability graph and baseline grants.
    pub capabilities: CapabilitiesSection,
    /// Read-only per-identity grants that survive assignment removal.
    pub overrides: BTreeMap<String, Vec<String>>,
    /// Where the mutable assignment document lives.
    pub assignments: AssignmentsSection,
    /// Token endpoint used to refresh bearer tokens.
    pub oauth: OAuthSection,
    /// Logging output.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// CapabilitiesSection
// ---------------------------------------------------------------------------

/// `[capabilities]`: the implication graph and who gets what by default.
///
/// ```toml
/// [capabilities]
/// default = ["villager"]
/// guest = []
///
/// [capabilities.graph]
/// villager = []
/// mafia = ["villager"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitiesSection {
    /// Adjacency list: capability name to the names it implies.
    pub graph: BTreeMap<String, Vec<String>>,
    /// Synthesize a super-capability implying every configured one.
    pub auto_admin: bool,
    /// Name of the synthesized super-capability.
    pub admin_name: String,
    /// Capability required to change other identities' assignments.
    pub management: String,
    /// Granted to every authenticated identity.
    pub default: Vec<String>,
    /// Granted to requests without an identity.
    pub guest: Vec<String>,
}

impl Default for CapabilitiesSection {
    fn default() -> Self {
        Self {
            graph: BTreeMap::new(),
            auto_admin: true,
            admin_name: "admin".to_owned(),
            management: "user_management".to_owned(),
            default: Vec::new(),
            guest: Vec::new(),
        }
    }
}

impl CapabilitiesSection {
    /// The admin name to synthesize, if synthesis is enabled.
    #[must_use]
    pub fn admin(&self) -> Option<&str> {
        self.auto_admin.then_some(self.admin_name.as_str())
    }

    /// Whether `name` will exist once the graph is built.
    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        self.graph.contains_key(name) || self.admin() == Some(name)
    }
}

// ---------------------------------------------------------------------------
// AssignmentsSection
// ---------------------------------------------------------------------------

/// `[assignments]`: the persisted, mutable identity to capability map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentsSection {
    /// YAML document path. Relative paths resolve against the working
    /// directory.
    pub path: PathBuf,
}

impl Default for AssignmentsSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("capabilities.yaml"),
        }
    }
}

// ---------------------------------------------------------------------------
// OAuthSection
// ---------------------------------------------------------------------------

/// `[oauth]`: refresh-token grant settings.
///
/// `client_secret` and `secret_key` are never printed by `Debug` nor written
/// by `Serialize`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct OAuthSection {
    /// Token endpoint URL of the identity provider.
    pub token_endpoint: Option<String>,
    /// OAuth client id.
    pub client_id: Option<String>,
    /// OAuth client secret.
    pub client_secret: Option<String>,
    /// Key that signs the bearer tokens handed to clients.
    pub secret_key: Option<String>,
    /// Upper bound on one refresh request, in seconds.
    pub timeout_secs: u64,
    /// Access-token lifetime assumed when the provider omits `expires_in`.
    pub default_expires_in_secs: u64,
}

impl Default for OAuthSection {
    fn default() -> Self {
        Self {
            token_endpoint: None,
            client_id: None,
            client_secret: None,
            secret_key: None,
            timeout_secs: 10,
            default_expires_in_secs: 3600,
        }
    }
}

impl OAuthSection {
    /// Whether enough is configured to perform a refresh grant.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.token_endpoint.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }
}

impl std::fmt::Debug for OAuthSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSection")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("has_client_secret", &self.client_secret.is_some())
            .field("has_secret_key", &self.secret_key.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .field("default_expires_in_secs", &self.default_expires_in_secs)
            .finish()
    }
}

impl Serialize for OAuthSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("OAuthSection", 4)?;
        state.serialize_field("token_endpoint", &self.token_endpoint)?;
        state.serialize_field("client_id", &self.client_id)?;
        state.serialize_field("timeout_secs", &self.timeout_secs)?;
        state.serialize_field("default_expires_in_secs", &self.default_expires_in_secs)?;
        state.end()
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// `[logging]`: level, format and optional rolling-file directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level: trace, debug, info, warn or error.
    pub level: String,
    /// Output format: pretty, compact, json or full.
    pub format: String,
    /// Per-module directives such as `warden_auth=debug`.
    pub directives: Vec<String>,
    /// Write daily-rotated log files here instead of stderr.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            directory: None,
        }
    }
}

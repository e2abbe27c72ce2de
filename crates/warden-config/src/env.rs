//! Environment variable fallbacks.
//!
//! Variables only fill fields the config file left unset. They never
//! override a value written in `warden.toml`.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::types::Config;

/// Environment variable naming the config file to load.
pub const CONFIG_PATH_VAR: &str = "WARDEN_CONFIG";

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    slot: fn(&mut Config) -> &mut Option<String>,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "WARDEN_OAUTH_TOKEN_ENDPOINT",
        field_path: "oauth.token_endpoint",
        slot: |c| &mut c.oauth.token_endpoint,
    },
    EnvMapping {
        var_name: "WARDEN_OAUTH_CLIENT_ID",
        field_path: "oauth.client_id",
        slot: |c| &mut c.oauth.client_id,
    },
    EnvMapping {
        var_name: "WARDEN_OAUTH_CLIENT_SECRET",
        field_path: "oauth.client_secret",
        slot: |c| &mut c.oauth.client_secret,
    },
    EnvMapping {
        var_name: "WARDEN_OAUTH_SECRET_KEY",
        field_path: "oauth.secret_key",
        slot: |c| &mut c.oauth.secret_key,
    },
];

/// Snapshot of the process's `WARDEN_*` variables.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("WARDEN_"))
        .collect()
}

/// Fill unset fields of `config` from `env_vars`.
///
/// Returns the number of fields filled. Empty variables are ignored.
pub fn apply_env_fallbacks<S: BuildHasher>(
    config: &mut Config,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let Some(value) = env_vars.get(mapping.var_name).filter(|v| !v.is_empty()) else {
            continue;
        };

        let slot = (mapping.slot)(config);
        if slot.is_some() {
            continue;
        }

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        *slot = Some(value.clone());
        count = count.saturating_add(1);
    }

    count
}

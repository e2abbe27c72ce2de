//! Configuration validation.
//!
//! Checks value ranges and the cross references between the capability
//! graph and everything that names a capability.

use tracing::warn;

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound for `oauth.timeout_secs`.
const MAX_TIMEOUT_SECS: u64 = 300;

/// Upper bound for `oauth.default_expires_in_secs` (one day).
const MAX_EXPIRES_IN_SECS: u64 = 86_400;

/// Shortest accepted `oauth.secret_key`, in bytes.
const MIN_SECRET_KEY_LEN: usize = 16;

/// Validate a deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_graph(config)?;
    validate_grants(config)?;
    validate_oauth(config)?;
    validate_assignments(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_capability_name(field: &str, name: &str) -> ConfigResult<()> {
    if name.trim().is_empty() {
        return Err(ConfigError::validation(field, "capability names must not be empty"));
    }
    if name.contains('&') {
        return Err(ConfigError::validation(
            field,
            format!("capability name '{name}' must not contain '&'"),
        ));
    }
    Ok(())
}

fn validate_graph(config: &Config) -> ConfigResult<()> {
    let caps = &config.capabilities;

    for (name, implied) in &caps.graph {
        let field = format!("capabilities.graph.{name}");
        validate_capability_name(&field, name)?;

        for target in implied {
            if !caps.graph.contains_key(target) {
                return Err(ConfigError::validation(
                    field,
                    format!("implies '{target}', which is not defined in the graph"),
                ));
            }
        }
    }

    if caps.auto_admin {
        validate_capability_name("capabilities.admin_name", &caps.admin_name)?;
        if caps.graph.contains_key(&caps.admin_name) {
            return Err(ConfigError::validation(
                "capabilities.admin_name",
                format!(
                    "'{}' is synthesized automatically and must not appear in the graph",
                    caps.admin_name
                ),
            ));
        }
    }

    Ok(())
}

fn validate_grants(config: &Config) -> ConfigResult<()> {
    let caps = &config.capabilities;

    let lists = [
        ("capabilities.default", &caps.default),
        ("capabilities.guest", &caps.guest),
    ];
    for (field, names) in lists {
        for name in names {
            if !caps.is_known(name) {
                return Err(ConfigError::validation(
                    field,
                    format!("unknown capability '{name}'"),
                ));
            }
        }
    }

    for (identity, names) in &config.overrides {
        if identity.trim().is_empty() {
            return Err(ConfigError::validation("overrides", "identity must not be empty"));
        }
        for name in names {
            if !caps.is_known(name) {
                return Err(ConfigError::validation(
                    format!("overrides.{identity}"),
                    format!("unknown capability '{name}'"),
                ));
            }
        }
    }

    if !caps.is_known(&caps.management) {
        warn!(
            management = %caps.management,
            "management capability is not in the graph, assignment changes will be refused"
        );
    }

    Ok(())
}

fn validate_oauth(config: &Config) -> ConfigResult<()> {
    let oauth = &config.oauth;

    if oauth.timeout_secs == 0 || oauth.timeout_secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::validation(
            "oauth.timeout_secs",
            format!(
                "timeout {} is out of range; must be between 1 and {MAX_TIMEOUT_SECS}",
                oauth.timeout_secs
            ),
        ));
    }

    if oauth.default_expires_in_secs == 0 || oauth.default_expires_in_secs > MAX_EXPIRES_IN_SECS {
        return Err(ConfigError::validation(
            "oauth.default_expires_in_secs",
            format!(
                "lifetime {} is out of range; must be between 1 and {MAX_EXPIRES_IN_SECS}",
                oauth.default_expires_in_secs
            ),
        ));
    }

    if oauth
        .secret_key
        .as_ref()
        .is_some_and(|key| key.len() < MIN_SECRET_KEY_LEN)
    {
        return Err(ConfigError::validation(
            "oauth.secret_key",
            format!("key must be at least {MIN_SECRET_KEY_LEN} bytes"),
        ));
    }

    if let Some(endpoint) = &oauth.token_endpoint {
        let url = url::Url::parse(endpoint).map_err(|e| {
            ConfigError::validation("oauth.token_endpoint", format!("invalid URL '{endpoint}': {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::validation(
                "oauth.token_endpoint",
                format!("unsupported scheme '{}'; expected http or https", url.scheme()),
            ));
        }
    }

    Ok(())
}

fn validate_assignments(config: &Config) -> ConfigResult<()> {
    if config.assignments.path.as_os_str().is_empty() {
        return Err(ConfigError::validation("assignments.path", "path must not be empty"));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::validation(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::validation(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }

    Ok(())
}

//! Configuration file discovery and loading.
//!
//! The first existing file wins, searched in this order:
//!
//! 1. An explicit path (command line)
//! 2. `$WARDEN_CONFIG`
//! 3. `./warden.toml`
//! 4. `warden.toml` in the platform config directory
//!
//! An explicit or `$WARDEN_CONFIG` path that does not exist is an error.
//! When no implicit location exists the built-in defaults are used.
//! Environment fallbacks are applied before validation.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{self, CONFIG_PATH_VAR};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// File name looked up in the working and config directories.
pub const CONFIG_FILE_NAME: &str = "warden.toml";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A validated configuration and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The configuration.
    pub config: Config,
    /// The file it was read from, `None` for built-in defaults.
    pub path: Option<PathBuf>,
    /// Number of fields filled from environment variables.
    pub env_applied: usize,
}

/// Discover, read and validate the configuration using the process
/// environment.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a required file is missing, a file cannot be
/// parsed, or the result fails validation.
pub fn load(explicit: Option<&Path>) -> ConfigResult<LoadedConfig> {
    load_with_env(explicit, &env::collect_env_vars())
}

/// Like [`load`], with the environment supplied by the caller.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: BuildHasher>(
    explicit: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<LoadedConfig> {
    let required = explicit
        .map(Path::to_path_buf)
        .or_else(|| env_vars.get(CONFIG_PATH_VAR).map(PathBuf::from));

    let (mut config, path) = if let Some(path) = required {
        (read_file(&path)?, Some(path))
    } else {
        let mut found = None;
        for candidate in implicit_locations() {
            if let Some(config) = try_read_file(&candidate)? {
                found = Some((config, candidate));
                break;
            }
        }
        match found {
            Some((config, path)) => (config, Some(path)),
            None => {
                debug!("no config file found, using defaults");
                (Config::default(), None)
            },
        }
    };

    let env_applied = env::apply_env_fallbacks(&mut config, env_vars);
    validate::validate(&config)?;

    info!(
        path = path.as_ref().map_or_else(|| "<defaults>".to_owned(), |p| p.display().to_string()),
        capabilities = config.capabilities.graph.len(),
        env_applied,
        "loaded configuration"
    );

    Ok(LoadedConfig {
        config,
        path,
        env_applied,
    })
}

/// Read and validate one file. No environment fallbacks are applied.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, is too
/// large, or fails validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let config = read_file(path)?;
    validate::validate(&config)?;
    Ok(config)
}

fn implicit_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dirs) = directories::ProjectDirs::from("", "", "warden") {
        locations.push(dirs.config_dir().join(CONFIG_FILE_NAME));
    }
    locations
}

fn read_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(path, &content)
}

/// Read a file, returning `None` if it does not exist.
fn try_read_file(path: &Path) -> ConfigResult<Option<Config>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };
    parse(path, &content).map(Some)
}

fn parse(path: &Path, content: &str) -> ConfigResult<Config> {
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

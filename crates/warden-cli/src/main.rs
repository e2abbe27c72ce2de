//! Warden CLI - capability management from the command line.
//!
//! Loads `warden.toml`, builds the capability graph and the assignment
//! store it describes, and runs one query or mutation against them.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use warden_auth::{CapabilityMutation, Identity};

mod commands;
mod config_bridge;
mod output;
mod theme;

use commands::{check, manage, token, validate};
use output::OutputFormat;
use theme::Theme;

/// Warden - capability-based authorization
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to warden.toml (defaults to $WARDEN_CONFIG, ./warden.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration, the capability graph and the assignment file
    Validate,

    /// Check whether an identity holds a capability (exit code 1 if not)
    Check {
        /// Capability name
        capability: String,

        /// Identity to check; a guest when omitted
        #[arg(long = "as", value_name = "EMAIL")]
        identity: Option<String>,
    },

    /// List effective capabilities
    List {
        /// Identity to list; the caller when omitted
        email: Option<String>,

        /// Identity performing the listing
        #[arg(long = "as", value_name = "EMAIL")]
        caller: String,
    },

    /// Grant a capability
    Add {
        /// Identity receiving the capability
        email: String,

        /// Capability name
        capability: String,

        /// Identity performing the change
        #[arg(long = "as", value_name = "EMAIL")]
        caller: String,
    },

    /// Revoke a directly assigned capability
    Remove {
        /// Identity losing the capability
        email: String,

        /// Capability name
        capability: String,

        /// Identity performing the change
        #[arg(long = "as", value_name = "EMAIL")]
        caller: String,
    },

    /// Replace an identity's assigned capabilities
    Set {
        /// Identity whose assignments are replaced
        email: String,

        /// New capability names (none clears the assignments)
        capabilities: Vec<String>,

        /// Identity performing the change
        #[arg(long = "as", value_name = "EMAIL")]
        caller: String,
    },

    /// Seal a refresh token into the bearer token clients present
    Issue {
        /// Refresh token obtained from the identity provider
        #[arg(env = "WARDEN_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,
    },

    /// Resolve a bearer token through the configured token endpoint
    Token {
        /// Bearer token issued by `warden issue`
        #[arg(env = "WARDEN_BEARER_TOKEN", hide_env_values = true)]
        bearer_token: String,

        /// Also check this capability (exit code 1 if not held)
        #[arg(long)]
        require: Option<String>,
    },
}

fn exit_code(granted: bool) -> ExitCode {
    if granted {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

async fn run(cli: Cli, loaded: warden_config::LoadedConfig) -> Result<ExitCode> {
    let cfg = &loaded.config;
    let format = cli.format;

    match cli.command {
        Commands::Validate => {
            validate::run_validate(&loaded).await?;
        },
        Commands::Check {
            capability,
            identity,
        } => {
            let authorizer = config_bridge::build_authorizer(cfg).await?;
            let identity = identity.map(Identity::from);
            let granted = check::run_check(&authorizer, identity.as_ref(), &capability, format)?;
            return Ok(exit_code(granted));
        },
        Commands::List { email, caller } => {
            let authorizer = config_bridge::build_authorizer(cfg).await?;
            let email = email.map(Identity::from);
            check::run_list(&authorizer, &Identity::from(caller), email.as_ref(), format)?;
        },
        Commands::Add {
            email,
            capability,
            caller,
        } => {
            let authorizer = config_bridge::build_authorizer(cfg).await?;
            let mutation = CapabilityMutation::AddCapability {
                email: Identity::from(email),
                capability,
            };
            manage::run_mutation(&authorizer, &Identity::from(caller), mutation, format).await?;
        },
        Commands::Remove {
            email,
            capability,
            caller,
        } => {
            let authorizer = config_bridge::build_authorizer(cfg).await?;
            let mutation = CapabilityMutation::RemoveCapability {
                email: Identity::from(email),
                capability,
            };
            manage::run_mutation(&authorizer, &Identity::from(caller), mutation, format).await?;
        },
        Commands::Set {
            email,
            capabilities,
            caller,
        } => {
            let authorizer = config_bridge::build_authorizer(cfg).await?;
            let mutation = CapabilityMutation::SetCapabilities {
                email: Identity::from(email),
                capabilities: capabilities.into_iter().collect(),
            };
            manage::run_mutation(&authorizer, &Identity::from(caller), mutation, format).await?;
        },
        Commands::Issue { refresh_token } => {
            let sealer = config_bridge::build_sealer(&cfg.oauth)?;
            token::run_issue(&sealer, &refresh_token, format)?;
        },
        Commands::Token {
            bearer_token,
            require,
        } => {
            let authorizer = config_bridge::build_authorizer(cfg).await?;
            let gatekeeper = config_bridge::build_gatekeeper(cfg, authorizer)?;
            let granted =
                token::run_token(&gatekeeper, &bearer_token, require.as_deref(), format).await?;
            return Ok(exit_code(granted));
        },
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = warden_config::Config::load(cli.config.as_deref());

    // Set up logging from config, with --verbose override.
    let logging = match &loaded {
        Ok(loaded) => {
            let mut lc = config_bridge::to_log_config(&loaded.config);
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            warden_telemetry::setup_logging(&lc)
        },
        Err(_) if cli.verbose => {
            warden_telemetry::setup_logging(&warden_telemetry::LogConfig::new("debug"))
        },
        Err(_) => warden_telemetry::setup_default_logging(),
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {e}");
    }

    let loaded = loaded.context("failed to load configuration")?;

    match run(cli, loaded).await {
        Ok(code) => Ok(code),
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("{e:#}")));
            Ok(ExitCode::from(2))
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_management_command() {
        let cli = Cli::try_parse_from([
            "warden",
            "--format",
            "json",
            "set",
            "boss@corleone.com",
            "mafia",
            "baker",
            "--as",
            "admin@admin.admin",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Set {
                email,
                capabilities,
                caller,
            } => {
                assert_eq!(email, "boss@corleone.com");
                assert_eq!(capabilities, vec!["mafia", "baker"]);
                assert_eq!(caller, "admin@admin.admin");
            },
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn test_parse_guest_check() {
        let cli = Cli::try_parse_from(["warden", "check", "villager"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Check { identity: None, .. }
        ));
        assert!(Cli::try_parse_from(["warden", "add", "boss@corleone.com", "mafia"]).is_err());
    }
}

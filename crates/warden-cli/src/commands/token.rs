//! Bearer token issue and resolution.

use anyhow::Result;
use tracing::{Instrument, info};
use warden_auth::{Gatekeeper, TokenSealer, fingerprint};
use warden_telemetry::RequestContext;

use crate::output::{CheckOutcome, OutputFormat};
use crate::theme::Theme;

/// Seal `refresh_token` into the bearer token a client should present.
pub(crate) fn run_issue(
    sealer: &TokenSealer,
    refresh_token: &str,
    format: OutputFormat,
) -> Result<String> {
    let bearer_token = sealer.seal(refresh_token);
    info!(token = %fingerprint(refresh_token), "issued bearer token");

    match format {
        OutputFormat::Json => OutputFormat::print_json(&serde_json::json!({
            "bearer_token": bearer_token,
        }))?,
        OutputFormat::Pretty => println!("{bearer_token}"),
    }
    Ok(bearer_token)
}

/// Resolve `bearer_token` to an identity the way a request carrying it
/// would be, optionally checking a capability as well.
///
/// Returns whether the identity holds `require` (always `true` without
/// one).
pub(crate) async fn run_token(
    gatekeeper: &Gatekeeper,
    bearer_token: &str,
    require: Option<&str>,
    format: OutputFormat,
) -> Result<bool> {
    let span = RequestContext::new("cli")
        .with_operation("token")
        .span();
    let header = format!("Bearer {bearer_token}");

    let identity = gatekeeper
        .require_identity(None, Some(&header))
        .instrument(span)
        .await?;

    let Some(capability) = require else {
        let capabilities = gatekeeper.authorizer().list_effective(Some(&identity))?;
        match format {
            OutputFormat::Json => OutputFormat::print_json(&serde_json::json!({
                "identity": identity,
                "token": fingerprint(bearer_token),
                "capabilities": capabilities,
            }))?,
            OutputFormat::Pretty => {
                println!(
                    "{}",
                    Theme::success(&format!(
                        "token {} belongs to {identity}",
                        fingerprint(bearer_token)
                    ))
                );
                for name in &capabilities {
                    println!("  {}", Theme::capability(name));
                }
            },
        }
        return Ok(true);
    };

    let granted = gatekeeper.authorizer().check(Some(&identity), capability)?;
    format.check(&CheckOutcome {
        identity: Some(identity.as_str()),
        capability,
        granted,
    })?;
    Ok(granted)
}

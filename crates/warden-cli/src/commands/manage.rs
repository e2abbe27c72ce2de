//! Assignment management: add, remove and set.

use anyhow::Result;
use tracing::Instrument;
use warden_auth::{Authorizer, CapabilityMutation, Identity};
use warden_telemetry::RequestContext;

use crate::output::OutputFormat;

/// Apply `mutation` on behalf of `caller`, persist it and print the
/// target's capabilities afterwards.
pub(crate) async fn run_mutation(
    authorizer: &Authorizer,
    caller: &Identity,
    mutation: CapabilityMutation,
    format: OutputFormat,
) -> Result<()> {
    let span = RequestContext::new("cli")
        .with_identity(caller.as_str())
        .with_operation(mutation.kind())
        .span();

    let report = authorizer
        .mutate(Some(caller), mutation)
        .instrument(span)
        .await?;
    format.report(&report)
}

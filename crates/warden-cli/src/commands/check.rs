//! Read-only capability queries.

use anyhow::Result;
use warden_auth::{Authorizer, Identity};
use warden_telemetry::{RequestContext, RequestGuard};

use crate::output::{CheckOutcome, OutputFormat};

fn context(operation: &str, caller: Option<&Identity>) -> RequestContext {
    let ctx = RequestContext::new("cli").with_operation(operation);
    match caller {
        Some(caller) => ctx.with_identity(caller.as_str()),
        None => ctx,
    }
}

/// Whether `identity` (or a guest, when `None`) holds `capability`.
///
/// Returns the decision so the caller can pick an exit code.
pub(crate) fn run_check(
    authorizer: &Authorizer,
    identity: Option<&Identity>,
    capability: &str,
    format: OutputFormat,
) -> Result<bool> {
    let _guard = RequestGuard::new(context("check", identity));

    let granted = authorizer.check(identity, capability)?;
    format.check(&CheckOutcome {
        identity: identity.map(Identity::as_str),
        capability,
        granted,
    })?;
    Ok(granted)
}

/// Effective capabilities of `email` as seen by `caller`.
///
/// Without `email` the caller lists itself.
pub(crate) fn run_list(
    authorizer: &Authorizer,
    caller: &Identity,
    email: Option<&Identity>,
    format: OutputFormat,
) -> Result<()> {
    let _guard = RequestGuard::new(context("list", Some(caller)));

    let report = authorizer.list(Some(caller), email)?;
    format.report(&report)
}

#[cfg(test)]
mod tests {
    use warden_auth::AuthError;
    use warden_test::{test_admin, test_authorizer, test_identity, test_village_assignments};

    use super::*;

    #[tokio::test]
    async fn test_run_check() {
        let auth = test_authorizer(test_village_assignments()).await;
        let boss = test_identity("boss@corleone.com");

        assert!(run_check(&auth, Some(&boss), "villager", OutputFormat::Json).unwrap());
        assert!(!run_check(&auth, Some(&boss), "police", OutputFormat::Pretty).unwrap());
        assert!(!run_check(&auth, None, "villager", OutputFormat::Json).unwrap());

        let err = run_check(&auth, Some(&boss), "astronaut", OutputFormat::Json).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthError>(),
            Some(AuthError::UnknownCapability { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_list() {
        let auth = test_authorizer(test_village_assignments()).await;
        let boss = test_identity("boss@corleone.com");
        let wiggum = test_identity("wiggum@springfield.us");

        run_list(&auth, &boss, None, OutputFormat::Json).unwrap();
        run_list(&auth, &test_admin(), Some(&wiggum), OutputFormat::Pretty).unwrap();

        let err = run_list(&auth, &boss, Some(&wiggum), OutputFormat::Json).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthError>(),
            Some(AuthError::PermissionDenied { .. })
        ));
    }
}

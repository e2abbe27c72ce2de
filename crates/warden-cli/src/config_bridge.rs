//! Bridge from `warden_config::Config` to domain types.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use warden_auth::{
    Authorizer, Gatekeeper, Policy, RefreshGrantExchange, TokenCache, TokenSealer,
};
use warden_capabilities::{CapabilityGraph, CapabilityResult};
use warden_config::{Config, OAuthSection};
use warden_storage::YamlFileStore;
use warden_telemetry::{FileRotation, LogConfig, LogFormat};

/// Convert the `[logging]` section to a [`LogConfig`].
pub(crate) fn to_log_config(cfg: &Config) -> LogConfig {
    let format = match cfg.logging.format.as_str() {
        "pretty" => LogFormat::Pretty,
        "json" => LogFormat::Json,
        "full" => LogFormat::Full,
        _ => LogFormat::Compact,
    };

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    if let Some(dir) = &cfg.logging.directory {
        log_config = log_config.with_file_logging(dir, "warden", FileRotation::Daily);
    }

    log_config
}

/// Build the capability graph from `[capabilities]`.
pub(crate) fn build_graph(cfg: &Config) -> CapabilityResult<CapabilityGraph> {
    CapabilityGraph::from_adjacency(&cfg.capabilities.graph, cfg.capabilities.admin())
}

/// Collect defaults, guest grants, overrides and the management name.
pub(crate) fn to_policy(cfg: &Config) -> Policy {
    Policy {
        defaults: cfg.capabilities.default.clone(),
        guest: cfg.capabilities.guest.clone(),
        overrides: cfg.overrides.clone(),
        management: cfg.capabilities.management.clone(),
    }
}

/// Build an [`Authorizer`] over the configured YAML assignment file.
pub(crate) async fn build_authorizer(cfg: &Config) -> Result<Authorizer> {
    let graph = build_graph(cfg).context("invalid capability graph")?;
    let store = YamlFileStore::new(&cfg.assignments.path);
    Authorizer::load(Arc::new(graph), Arc::new(store), &to_policy(cfg))
        .await
        .with_context(|| {
            format!(
                "failed to load assignments from {}",
                cfg.assignments.path.display()
            )
        })
}

/// Build the refresh-token grant client from `[oauth]`.
pub(crate) fn build_exchange(oauth: &OAuthSection) -> Result<RefreshGrantExchange> {
    let (Some(endpoint), Some(client_id), Some(client_secret)) = (
        &oauth.token_endpoint,
        &oauth.client_id,
        &oauth.client_secret,
    ) else {
        bail!(
            "oauth.token_endpoint, oauth.client_id and oauth.client_secret must be set \
             (or WARDEN_OAUTH_TOKEN_ENDPOINT, WARDEN_OAUTH_CLIENT_ID, WARDEN_OAUTH_CLIENT_SECRET)"
        );
    };

    let exchange = RefreshGrantExchange::new(
        endpoint.as_str(),
        client_id.as_str(),
        client_secret.as_str(),
        Duration::from_secs(oauth.timeout_secs),
    )
    .context("failed to build HTTP client")?
    .with_default_expires_in(Duration::from_secs(oauth.default_expires_in_secs));
    Ok(exchange)
}

/// Build the bearer token sealer from `oauth.secret_key`.
pub(crate) fn build_sealer(oauth: &OAuthSection) -> Result<TokenSealer> {
    let Some(secret_key) = &oauth.secret_key else {
        bail!("oauth.secret_key must be set (or WARDEN_OAUTH_SECRET_KEY)");
    };
    Ok(TokenSealer::new(secret_key))
}

/// Build a [`Gatekeeper`] resolving bearer tokens through `[oauth]`.
pub(crate) fn build_gatekeeper(cfg: &Config, authorizer: Authorizer) -> Result<Gatekeeper> {
    let sealer = build_sealer(&cfg.oauth)?;
    let exchange = build_exchange(&cfg.oauth)?;
    let tokens = TokenCache::with_timeout(
        Arc::new(exchange),
        Duration::from_secs(cfg.oauth.timeout_secs),
    );
    Ok(Gatekeeper::new(Arc::new(authorizer), tokens, sealer))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use warden_auth::Identity;
    use warden_telemetry::LogTarget;
    use warden_test::VILLAGE_CONFIG_TOML;

    use super::*;

    fn village_config(dir: &Path) -> Config {
        let path = dir.join("warden.toml");
        let toml = format!(
            "{VILLAGE_CONFIG_TOML}\n[assignments]\npath = {:?}\n",
            dir.join("caps.yaml").display().to_string()
        );
        std::fs::write(&path, toml).unwrap();
        Config::load_file(&path).unwrap()
    }

    #[test]
    fn test_to_log_config() {
        let mut cfg = Config::default();
        cfg.logging.level = "debug".to_owned();
        cfg.logging.format = "json".to_owned();
        cfg.logging.directives = vec!["warden_auth=trace".to_owned()];

        let log = to_log_config(&cfg);
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.directives, vec!["warden_auth=trace"]);
        assert_eq!(log.target, LogTarget::Stderr);
    }

    #[test]
    fn test_to_log_config_directory() {
        let mut cfg = Config::default();
        cfg.logging.directory = Some("/var/log/warden".into());

        let log = to_log_config(&cfg);
        assert_eq!(log.format, LogFormat::Compact);
        assert_eq!(log.target, LogTarget::File("/var/log/warden".into()));
        assert!(!log.ansi);
    }

    #[test]
    fn test_build_graph() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = village_config(dir.path());

        let graph = build_graph(&cfg).unwrap();
        assert_eq!(graph.len(), 7);
        assert!(graph.admin().is_some());

        let mut cfg = cfg;
        cfg.capabilities.auto_admin = false;
        assert!(build_graph(&cfg).unwrap().admin().is_none());
    }

    #[tokio::test]
    async fn test_build_authorizer() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = village_config(dir.path());

        let auth = build_authorizer(&cfg).await.unwrap();
        let admin = Identity::new("admin@admin.admin");
        let boss = Identity::new("boss@corleone.com");

        auth.add(Some(&admin), &boss, "mafia").await.unwrap();

        let reopened = build_authorizer(&cfg).await.unwrap();
        assert!(reopened.check(Some(&boss), "villager").unwrap());
        assert!(dir.path().join("caps.yaml").exists());
    }

    #[test]
    fn test_build_exchange_requires_credentials() {
        let mut oauth = OAuthSection::default();
        assert!(build_exchange(&oauth).is_err());

        oauth.token_endpoint = Some("https://oauth2.googleapis.com/token".to_owned());
        oauth.client_id = Some("id".to_owned());
        oauth.client_secret = Some("secret".to_owned());
        let exchange = build_exchange(&oauth).unwrap();
        assert_eq!(exchange.token_endpoint(), "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_build_sealer_requires_key() {
        let mut oauth = OAuthSection::default();
        assert!(build_sealer(&oauth).is_err());

        oauth.secret_key = Some("an-unguessable-key".to_owned());
        let sealer = build_sealer(&oauth).unwrap();
        let sealed = sealer.seal("rt-boss");
        assert_eq!(TokenSealer::new("an-unguessable-key").open(&sealed).unwrap(), "rt-boss");
    }
}

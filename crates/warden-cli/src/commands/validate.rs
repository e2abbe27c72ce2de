//! Configuration and assignment file validation.

use anyhow::Result;
use colored::Colorize;
use warden_config::LoadedConfig;

use crate::config_bridge;
use crate::theme::Theme;

/// Check the loaded configuration, the capability graph it describes and
/// the assignment file it points to.
pub(crate) async fn run_validate(loaded: &LoadedConfig) -> Result<()> {
    let cfg = &loaded.config;

    println!("{}", Theme::header("Warden configuration"));
    match &loaded.path {
        Some(path) => println!("  File: {}", path.display()),
        None => println!("  File: {}", "(none, using defaults)".dimmed()),
    }
    if loaded.env_applied > 0 {
        println!("  Environment fallbacks applied: {}", loaded.env_applied);
    }
    println!();

    let graph = config_bridge::build_graph(cfg)?;
    println!(
        "{}",
        Theme::success(&format!("capability graph: {} capabilities", graph.len()))
    );
    for (id, capability) in graph.iter() {
        let implied: Vec<&str> = capability
            .implies()
            .iter()
            .filter_map(|&implied| graph.name(implied))
            .collect();
        let marker = if graph.admin() == Some(id) { " (admin)" } else { "" };
        if implied.is_empty() {
            println!("  {}{marker}", Theme::capability(capability.name()));
        } else {
            println!(
                "  {}{marker} -> {}",
                Theme::capability(capability.name()),
                implied.join(", ")
            );
        }
    }

    if graph.get(&cfg.capabilities.management).is_none() {
        println!(
            "{}",
            Theme::warning(&format!(
                "management capability {:?} is not in the graph; nobody can manage assignments",
                cfg.capabilities.management
            ))
        );
    }

    let authorizer = config_bridge::build_authorizer(cfg).await?;
    let snapshot = authorizer.snapshot()?;
    println!(
        "{}",
        Theme::success(&format!(
            "assignments: {} identities in {}",
            snapshot.len(),
            cfg.assignments.path.display()
        ))
    );
    for (identity, names) in snapshot.iter() {
        for name in names.iter().filter(|name| graph.get(name).is_none()) {
            println!(
                "{}",
                Theme::warning(&format!("{identity} holds unknown capability {name:?}"))
            );
        }
    }

    if cfg.oauth.is_configured() && cfg.oauth.secret_key.is_none() {
        println!(
            "{}",
            Theme::warning("oauth: secret_key not set; bearer tokens cannot be issued or opened")
        );
    } else if cfg.oauth.is_configured() {
        println!("{}", Theme::success("oauth: token endpoint configured"));
    } else {
        println!(
            "{}",
            Theme::info("oauth: not configured; bearer tokens are unavailable")
        );
    }

    Ok(())
}

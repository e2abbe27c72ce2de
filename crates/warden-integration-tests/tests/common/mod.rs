//! Shared test harness for integration tests.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use warden_auth::{Authorizer, Policy};
use warden_capabilities::CapabilityGraph;
use warden_config::Config;
use warden_storage::YamlFileStore;
use warden_test::VILLAGE_CONFIG_TOML;

/// A village deployment living in a temporary directory: `warden.toml`
/// next to the YAML assignment file it points at.
#[allow(dead_code)]
pub struct VillageHarness {
    /// Parsed and validated configuration.
    pub config: Config,
    /// The assignment file.
    pub assignments_path: PathBuf,
    dir: TempDir,
}

#[allow(dead_code)]
impl VillageHarness {
    /// Write `toml` as `warden.toml`, pointing `[assignments]` at a file
    /// in the same directory.
    pub fn from_toml(toml: &str) -> Self {
        warden_test::init_test_logging();
        let dir = tempfile::tempdir().unwrap();
        let assignments_path = dir.path().join("capabilities.yaml");
        let config_path = dir.path().join("warden.toml");

        std::fs::write(
            &config_path,
            format!(
                "{toml}\n[assignments]\npath = {:?}\n",
                assignments_path.display().to_string()
            ),
        )
        .unwrap();

        let config = Config::load_file(&config_path).unwrap();
        Self {
            config,
            assignments_path,
            dir,
        }
    }

    /// The plain village.
    pub fn new() -> Self {
        Self::from_toml(VILLAGE_CONFIG_TOML)
    }

    /// Seed the assignment file with raw YAML.
    pub fn write_assignments(&self, yaml: &str) {
        std::fs::write(&self.assignments_path, yaml).unwrap();
    }

    /// Read the assignment file back as raw YAML.
    pub fn read_assignments(&self) -> String {
        std::fs::read_to_string(&self.assignments_path).unwrap()
    }

    /// The graph the configuration describes.
    pub fn graph(&self) -> Arc<CapabilityGraph> {
        Arc::new(
            CapabilityGraph::from_adjacency(
                &self.config.capabilities.graph,
                self.config.capabilities.admin(),
            )
            .unwrap(),
        )
    }

    /// The policy the configuration describes.
    pub fn policy(&self) -> Policy {
        Policy {
            defaults: self.config.capabilities.default.clone(),
            guest: self.config.capabilities.guest.clone(),
            overrides: self.config.overrides.clone(),
            management: self.config.capabilities.management.clone(),
        }
    }

    /// A fresh authorizer reading the assignment file from disk, as a
    /// restarted process would.
    pub async fn open(&self) -> Authorizer {
        Authorizer::load(
            self.graph(),
            Arc::new(YamlFileStore::new(&self.assignments_path)),
            &self.policy(),
        )
        .await
        .unwrap()
    }

    /// The temporary directory holding everything.
    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }
}

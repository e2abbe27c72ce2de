//! YAML file backed assignment store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::document::Assignments;
use crate::error::{StorageError, StorageResult};
use crate::store::AssignmentStore;

/// Stores the assignment document as a YAML mapping of identity to
/// capability names.
///
/// A missing file reads as an empty document. Saves write a sibling
/// temporary file, sync it to disk and rename it over the target, so readers
/// never observe a half-written document.
#[derive(Debug, Clone)]
pub struct YamlFileStore {
    path: PathBuf,
}

impl YamlFileStore {
    /// Create a store for `path`. Nothing is read until [`load`](AssignmentStore::load).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "assignments".into(), |n| n.to_string_lossy().into_owned());
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl AssignmentStore for YamlFileStore {
    async fn load(&self) -> StorageResult<Assignments> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "assignment file not found, starting empty");
                return Ok(Assignments::new());
            },
            Err(e) => return Err(self.io_error(e)),
        };

        if content.trim().is_empty() {
            return Ok(Assignments::new());
        }

        serde_yaml::from_str(&content).map_err(|e| {
            StorageError::Serialization(format!("{}: {e}", self.path.display()))
        })
    }

    async fn save(&self, assignments: &Assignments) -> StorageResult<()> {
        let yaml = serde_yaml::to_string(assignments)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let temp = self.temp_path();
        let mut file = tokio::fs::File::create(&temp)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(yaml.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.sync_all().await.map_err(|e| self.io_error(e))?;
        drop(file);

        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(
            path = %self.path.display(),
            identities = assignments.len(),
            "saved capability assignments"
        );
        Ok(())
    }
}

//! Assignment store trait and the in-memory implementation.

use async_trait::async_trait;

use crate::document::Assignments;
use crate::error::{StorageError, StorageResult};

/// Persistence for the capability assignment document.
///
/// The document is loaded once and saved explicitly after every change;
/// stores are not expected to provide transactions. Callers serialize their
/// own read-modify-write cycles.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Load the full document. A store that has never been written returns
    /// an empty document.
    async fn load(&self) -> StorageResult<Assignments>;

    /// Durably replace the full document.
    async fn save(&self, assignments: &Assignments) -> StorageResult<()>;
}

/// In-memory assignment store for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryAssignmentStore {
    data: std::sync::RwLock<Assignments>,
}

impl MemoryAssignmentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `assignments`.
    #[must_use]
    pub fn with_assignments(assignments: Assignments) -> Self {
        Self {
            data: std::sync::RwLock::new(assignments),
        }
    }

    /// Copy of the currently stored document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the lock is poisoned.
    pub fn snapshot(&self) -> StorageResult<Assignments> {
        self.data
            .read()
            .map(|data| data.clone())
            .map_err(|e| StorageError::Internal(e.to_string()))
    }
}

#[async_trait]
impl AssignmentStore for MemoryAssignmentStore {
    async fn load(&self) -> StorageResult<Assignments> {
        self.snapshot()
    }

    async fn save(&self, assignments: &Assignments) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        data.clone_from(assignments);
        Ok(())
    }
}

use std::sync::{Mutex, MutexGuard};

use crate::dig::backend::{ChangeSet, LedgerBackend, LedgerFile};
use crate::dig::errors::LedgerError;
use crate::dig::types::{ArtifactRecord, UserRecord};

/// Process-local backend. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<LedgerFile>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerFile>, LedgerError> {
        self.inner
            .lock()
            .map_err(|_| LedgerError::Internal("memory backend lock poisoned".into()))
    }
}

impl LedgerBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn load_user(&self, user_id: &str) -> Result<Option<UserRecord>, LedgerError> {
        Ok(self.lock()?.users.get(user_id).cloned())
    }

    fn load_artifact(&self, artifact_id: &str) -> Result<Option<ArtifactRecord>, LedgerError> {
        Ok(self.lock()?.artifacts.get(artifact_id).cloned())
    }

    fn load_users(&self) -> Result<Vec<UserRecord>, LedgerError> {
        Ok(self.lock()?.users.values().cloned().collect())
    }

    fn load_artifacts(&self, ids: &[String]) -> Result<Vec<Option<ArtifactRecord>>, LedgerError> {
        let guard = self.lock()?;
        Ok(ids.iter().map(|id| guard.artifacts.get(id).cloned()).collect())
    }

    fn commit(&self, changes: &ChangeSet) -> Result<(), LedgerError> {
        let mut guard = self.lock()?;
        changes.apply_to(&mut guard);
        Ok(())
    }
}

//! Persistence backends for the excavation ledger.
//!
//! A backend stores two collections, users and artifacts, keyed by id. All
//! writes go through [`LedgerBackend::commit`] with a [`ChangeSet`] that the
//! backend must apply atomically: after a failed commit no part of the change
//! set may be visible to readers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{StorageBackend, StorageConfig};
use crate::dig::errors::LedgerError;
use crate::dig::types::{
    ArtifactRecord, UserRecord, ARTIFACT_SCHEMA_VERSION, USER_SCHEMA_VERSION,
};

mod json;
mod memory;
mod sled_store;

pub use json::JsonFileBackend;
pub use memory::MemoryBackend;
pub use sled_store::SledBackend;

/// Whole-ledger document. This is the on-disk layout of the JSON backend.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerFile {
    #[serde(default)]
    pub users: BTreeMap<String, UserRecord>,
    #[serde(default)]
    pub artifacts: BTreeMap<String, ArtifactRecord>,
}

/// Writes produced by one store operation.
#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
    pub users: Vec<UserRecord>,
    pub artifacts: Vec<ArtifactRecord>,
    pub removed_artifacts: Vec<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_user(mut self, user: UserRecord) -> Self {
        self.users.push(user);
        self
    }

    pub fn put_artifact(mut self, artifact: ArtifactRecord) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn remove_artifact(mut self, artifact_id: &str) -> Self {
        self.removed_artifacts.push(artifact_id.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.artifacts.is_empty() && self.removed_artifacts.is_empty()
    }

    /// Apply to an in-memory document. Removals run after upserts.
    pub fn apply_to(&self, file: &mut LedgerFile) {
        for user in &self.users {
            file.users.insert(user.user_id.clone(), user.clone());
        }
        for artifact in &self.artifacts {
            file.artifacts
                .insert(artifact.artifact_id.clone(), artifact.clone());
        }
        for id in &self.removed_artifacts {
            file.artifacts.remove(id);
        }
    }
}

/// Key-value persistence used by [`crate::dig::EconomyStore`].
pub trait LedgerBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn load_user(&self, user_id: &str) -> Result<Option<UserRecord>, LedgerError>;

    fn load_artifact(&self, artifact_id: &str) -> Result<Option<ArtifactRecord>, LedgerError>;

    /// Every stored user, in no particular order.
    fn load_users(&self) -> Result<Vec<UserRecord>, LedgerError>;

    /// Look up several artifacts at once, preserving the order of `ids`.
    fn load_artifacts(&self, ids: &[String]) -> Result<Vec<Option<ArtifactRecord>>, LedgerError> {
        ids.iter().map(|id| self.load_artifact(id)).collect()
    }

    /// Apply every write in `changes` atomically.
    fn commit(&self, changes: &ChangeSet) -> Result<(), LedgerError>;
}

pub(crate) fn check_user(record: UserRecord) -> Result<UserRecord, LedgerError> {
    if record.schema_version != USER_SCHEMA_VERSION {
        return Err(LedgerError::SchemaMismatch {
            entity: "user",
            expected: USER_SCHEMA_VERSION,
            found: record.schema_version,
        });
    }
    Ok(record)
}

pub(crate) fn check_artifact(record: ArtifactRecord) -> Result<ArtifactRecord, LedgerError> {
    if record.schema_version != ARTIFACT_SCHEMA_VERSION {
        return Err(LedgerError::SchemaMismatch {
            entity: "artifact",
            expected: ARTIFACT_SCHEMA_VERSION,
            found: record.schema_version,
        });
    }
    Ok(record)
}

/// Open the backend selected in `config`.
pub fn open_backend(config: &StorageConfig) -> Result<Box<dyn LedgerBackend>, LedgerError> {
    let data_dir = Path::new(&config.data_dir);
    let backend: Box<dyn LedgerBackend> = match config.backend {
        StorageBackend::Memory => Box::new(MemoryBackend::new()),
        StorageBackend::Json => Box::new(JsonFileBackend::open(data_dir.join(&config.json_file))?),
        StorageBackend::Sled => Box::new(SledBackend::open(data_dir.join(&config.sled_dir))?),
    };
    log::info!(
        "ledger: opened {} backend under {}",
        backend.name(),
        config.data_dir
    );
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dig::types::RarityTier;

    #[test]
    fn change_set_applies_upserts_then_removals() {
        let mut file = LedgerFile::default();
        let artifact = ArtifactRecord::new("Lost Crown", RarityTier::Epic, "", 500, "u1");
        let id = artifact.artifact_id.clone();
        let mut user = UserRecord::new("u1", "indy", "basic");
        user.add_artifact(&id);

        ChangeSet::new()
            .put_user(user.clone())
            .put_artifact(artifact)
            .apply_to(&mut file);
        assert_eq!(file.users.get("u1"), Some(&user));
        assert!(file.artifacts.contains_key(&id));

        ChangeSet::new().remove_artifact(&id).apply_to(&mut file);
        assert!(file.artifacts.is_empty());
        assert!(ChangeSet::new().is_empty());
    }

    #[test]
    fn schema_check_rejects_other_versions() {
        let mut user = UserRecord::new("u1", "indy", "basic");
        user.schema_version = 7;
        assert!(matches!(
            check_user(user),
            Err(LedgerError::SchemaMismatch { found: 7, .. })
        ));
    }
}

use std::path::Path;

use sled::IVec;

use crate::dig::backend::{check_artifact, check_user, ChangeSet, LedgerBackend};
use crate::dig::errors::LedgerError;
use crate::dig::types::{ArtifactRecord, UserRecord};

const TREE_LEDGER: &str = "ledger";
const USER_PREFIX: &str = "users:";
const ARTIFACT_PREFIX: &str = "artifacts:";

/// Sled-backed ledger. Both collections share one tree so that a change set
/// can be applied as a single atomic batch.
pub struct SledBackend {
    _db: sled::Db,
    ledger: sled::Tree,
}

impl SledBackend {
    /// Open (or create) the database rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let ledger = db.open_tree(TREE_LEDGER)?;
        Ok(Self { _db: db, ledger })
    }

    fn user_key(user_id: &str) -> Vec<u8> {
        format!("{}{}", USER_PREFIX, user_id).into_bytes()
    }

    fn artifact_key(artifact_id: &str) -> Vec<u8> {
        format!("{}{}", ARTIFACT_PREFIX, artifact_id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, LedgerError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, LedgerError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }
}

impl LedgerBackend for SledBackend {
    fn name(&self) -> &'static str {
        "sled"
    }

    fn load_user(&self, user_id: &str) -> Result<Option<UserRecord>, LedgerError> {
        let Some(bytes) = self.ledger.get(Self::user_key(user_id))? else {
            return Ok(None);
        };
        check_user(Self::deserialize(bytes)?).map(Some)
    }

    fn load_artifact(&self, artifact_id: &str) -> Result<Option<ArtifactRecord>, LedgerError> {
        let Some(bytes) = self.ledger.get(Self::artifact_key(artifact_id))? else {
            return Ok(None);
        };
        check_artifact(Self::deserialize(bytes)?).map(Some)
    }

    fn load_users(&self) -> Result<Vec<UserRecord>, LedgerError> {
        let mut users = Vec::new();
        for entry in self.ledger.scan_prefix(USER_PREFIX.as_bytes()) {
            let (_, bytes) = entry?;
            users.push(check_user(Self::deserialize(bytes)?)?);
        }
        Ok(users)
    }

    fn commit(&self, changes: &ChangeSet) -> Result<(), LedgerError> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut batch = sled::Batch::default();
        for user in &changes.users {
            batch.insert(Self::user_key(&user.user_id), Self::serialize(user)?);
        }
        for artifact in &changes.artifacts {
            batch.insert(
                Self::artifact_key(&artifact.artifact_id),
                Self::serialize(artifact)?,
            );
        }
        for id in &changes.removed_artifacts {
            batch.remove(Self::artifact_key(id));
        }
        self.ledger.apply_batch(batch)?;
        self.ledger.flush()?;
        Ok(())
    }
}

//! Single JSON document backend: `{"users": {...}, "artifacts": {...}}`.
//!
//! Every read parses the whole file and every commit rewrites it. Access is
//! coordinated through an fs2 lock on a sidecar `<file>.lock` (shared for
//! reads, exclusive for commits) so several processes can share one ledger.
//! Commits write a temp file and rename it over the original, so a crash
//! mid-write leaves the previous document intact.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::dig::backend::{check_artifact, check_user, ChangeSet, LedgerBackend, LedgerFile};
use crate::dig::errors::LedgerError;
use crate::dig::types::{ArtifactRecord, UserRecord};

#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileBackend {
    /// Open the ledger at `path`, creating its directory. The file itself is
    /// created on first commit; a missing file reads as an empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Ok(Self { path, lock_path })
    }

    fn open_lock_file(&self) -> Result<File, LedgerError> {
        Ok(OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?)
    }

    /// Read the whole document under a shared lock.
    pub fn read_document(&self) -> Result<LedgerFile, LedgerError> {
        let lock = self.open_lock_file()?;
        FileExt::lock_shared(&lock)?;
        let result = self.read_unlocked();
        let _ = FileExt::unlock(&lock);
        result
    }

    fn read_unlocked(&self) -> Result<LedgerFile, LedgerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LedgerFile::default()),
            Err(e) => return Err(e.into()),
        };
        let cleaned = content.trim_start_matches('\0');
        if cleaned.trim().is_empty() {
            return Ok(LedgerFile::default());
        }
        serde_json::from_str(cleaned).map_err(|e| {
            log::warn!("ledger: unreadable JSON at {:?}: {}", self.path, e);
            LedgerError::Json(e)
        })
    }

    fn write_unlocked(&self, file: &LedgerFile) -> Result<(), LedgerError> {
        let data = serde_json::to_string_pretty(file)?;
        let dir = self
            .path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let base = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("database.json");
        let mut counter = 0u32;
        let tmp_path = loop {
            let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut tmp) => {
                    let written = tmp
                        .write_all(data.as_bytes())
                        .and_then(|_| tmp.flush())
                        .and_then(|_| tmp.sync_all());
                    if let Err(e) = written {
                        let _ = fs::remove_file(&candidate);
                        return Err(e.into());
                    }
                    break candidate;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    counter = counter.saturating_add(1);
                }
                Err(e) => return Err(e.into()),
            }
        };
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        // Persist the rename (best-effort)
        if let Ok(dir_file) = File::open(dir) {
            let _ = dir_file.sync_all();
        }
        Ok(())
    }
}

impl LedgerBackend for JsonFileBackend {
    fn name(&self) -> &'static str {
        "json"
    }

    fn load_user(&self, user_id: &str) -> Result<Option<UserRecord>, LedgerError> {
        let mut doc = self.read_document()?;
        doc.users.remove(user_id).map(check_user).transpose()
    }

    fn load_artifact(&self, artifact_id: &str) -> Result<Option<ArtifactRecord>, LedgerError> {
        let mut doc = self.read_document()?;
        doc.artifacts.remove(artifact_id).map(check_artifact).transpose()
    }

    fn load_users(&self) -> Result<Vec<UserRecord>, LedgerError> {
        let doc = self.read_document()?;
        doc.users.into_values().map(check_user).collect()
    }

    fn load_artifacts(&self, ids: &[String]) -> Result<Vec<Option<ArtifactRecord>>, LedgerError> {
        let mut doc = self.read_document()?;
        ids.iter()
            .map(|id| doc.artifacts.remove(id).map(check_artifact).transpose())
            .collect()
    }

    fn commit(&self, changes: &ChangeSet) -> Result<(), LedgerError> {
        if changes.is_empty() {
            return Ok(());
        }
        let lock = self.open_lock_file()?;
        FileExt::lock_exclusive(&lock)?;
        let result = self.read_unlocked().and_then(|mut doc| {
            changes.apply_to(&mut doc);
            self.write_unlocked(&doc)
        });
        let _ = FileExt::unlock(&lock);
        if let Err(ref e) = result {
            log::warn!("ledger: commit to {:?} failed: {}", self.path, e);
        }
        result
    }
}

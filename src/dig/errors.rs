use thiserror::Error;

/// Errors that can arise while reading or mutating the excavation ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Returned when a referenced user or artifact is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Input that does not name a known tier or rarity, or a malformed identifier.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Wrapper around IO errors (ledger file, lock file, directory creation).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around JSON encoding errors for the file backend.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Internal error (poisoned lock, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// True for every failure that originates in the persistence backend.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            LedgerError::Io(_)
                | LedgerError::Json(_)
                | LedgerError::Sled(_)
                | LedgerError::Bincode(_)
                | LedgerError::SchemaMismatch { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_classification() {
        let io = LedgerError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(io.is_storage());
        assert!(LedgerError::SchemaMismatch {
            entity: "user",
            expected: 1,
            found: 9
        }
        .is_storage());
        assert!(!LedgerError::NotFound("user: 1".into()).is_storage());
        assert!(!LedgerError::Validation("tier".into()).is_storage());
        assert!(LedgerError::NotFound("user: 1".into()).is_not_found());
    }
}

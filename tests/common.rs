//! Test utilities & fixtures.
//! Ledger contents are written straight through a backend so that tests can
//! start from an exact state (coins, levels, owned artifacts).

use archeolobot::dig::{
    ArtifactRecord, ChangeSet, EconomyStore, LedgerBackend, RarityTier, UserRecord,
};

/// Commit a user with the given coins, level and artifacts (in that order).
#[allow(dead_code)] // not every test binary seeds artifacts
pub fn seed_user(
    backend: &dyn LedgerBackend,
    user_id: &str,
    coins: u64,
    level: u32,
    artifacts: &[(&str, RarityTier, u64)],
) -> (UserRecord, Vec<ArtifactRecord>) {
    let mut user = UserRecord::new(user_id, &format!("user-{}", user_id), "basic");
    user.coins = coins;
    user.level = level;
    let mut changes = ChangeSet::new();
    let mut records = Vec::new();
    for (name, rarity, value) in artifacts {
        let artifact = ArtifactRecord::new(name, *rarity, "fixture", *value, user_id);
        user.add_artifact(&artifact.artifact_id);
        changes = changes.put_artifact(artifact.clone());
        records.push(artifact);
    }
    backend
        .commit(&changes.put_user(user.clone()))
        .expect("seed commit");
    (user, records)
}

/// Store with default game tables and a fixed seed.
#[allow(dead_code)]
pub fn seeded_store(backend: Box<dyn LedgerBackend>) -> EconomyStore {
    EconomyStore::builder(backend)
        .seed(0xA5C)
        .build()
        .expect("store")
}

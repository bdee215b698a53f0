//! Integration tests for ledger persistence across store restarts.

mod common;

use archeolobot::config::{StorageBackend, StorageConfig};
use archeolobot::dig::{
    open_backend, JsonFileBackend, LedgerBackend, LedgerFile, RarityTier, SledBackend, UserRecord,
};
use common::{seed_user, seeded_store};
use tempfile::tempdir;

/// Dig, sell and buy through one store, then return the resulting user.
fn play_a_little(backend: Box<dyn LedgerBackend>) -> UserRecord {
    let store = seeded_store(backend);
    store.get_or_create_user("42", "Dr. Jönes").unwrap();
    for _ in 0..6 {
        store.record_excavation("42").unwrap();
    }
    let first = store.get_user_artifacts("42").unwrap()[0].clone();
    store.sell_by_name("42", &first.name).unwrap();
    store.get_user("42").unwrap()
}

fn assert_reload_matches(before: &UserRecord, backend: Box<dyn LedgerBackend>) {
    let store = seeded_store(backend);
    let after = store.get_user("42").unwrap();
    assert_eq!(&after, before);
    let artifacts = store.get_user_artifacts("42").unwrap();
    let ids: Vec<_> = artifacts.iter().map(|a| a.artifact_id.clone()).collect();
    assert_eq!(ids, before.artifact_ids);
    assert!(artifacts.iter().all(|a| a.discovered_by == "42"));
}

#[test]
fn json_backend_round_trips_every_field() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("database.json");

    let before = play_a_little(Box::new(JsonFileBackend::open(&path).unwrap()));
    assert_eq!(before.total_excavations, 6);
    assert_eq!(before.artifact_ids.len(), 5);

    assert_reload_matches(&before, Box::new(JsonFileBackend::open(&path).unwrap()));
}

#[test]
fn sled_backend_round_trips_every_field() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("ledger.sled");

    let before = play_a_little(Box::new(SledBackend::open(&path).unwrap()));
    assert_eq!(before.artifact_ids.len(), 5);

    assert_reload_matches(&before, Box::new(SledBackend::open(&path).unwrap()));
}

#[test]
fn json_document_uses_users_and_artifacts_maps() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("database.json");
    let backend = JsonFileBackend::open(&path).unwrap();
    let (user, artifacts) = seed_user(
        &backend,
        "7",
        120,
        2,
        &[("Ancient Crown", RarityTier::Epic, 480)],
    );

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["users"]["7"]["coins"], serde_json::json!(120));
    assert_eq!(raw["users"]["7"]["tool_tier"], serde_json::json!("basic"));
    let artifact_id = &artifacts[0].artifact_id;
    assert_eq!(raw["artifacts"][artifact_id]["rarity"], serde_json::json!("epic"));

    let parsed: LedgerFile = serde_json::from_value(raw).unwrap();
    assert_eq!(parsed.users["7"], user);
}

#[test]
fn open_backend_follows_storage_config() {
    let tmp = tempdir().unwrap();
    let mut config = StorageConfig {
        backend: StorageBackend::Json,
        data_dir: tmp.path().join("data").to_string_lossy().into_owned(),
        json_file: "ledger.json".into(),
        sled_dir: "ledger.sled".into(),
    };
    let json = open_backend(&config).unwrap();
    assert_eq!(json.name(), "json");
    seed_user(json.as_ref(), "1", 0, 1, &[]);
    assert!(tmp.path().join("data").join("ledger.json").exists());

    config.backend = StorageBackend::Sled;
    let sled = open_backend(&config).unwrap();
    assert_eq!(sled.name(), "sled");
    assert!(sled.load_user("1").unwrap().is_none());

    config.backend = StorageBackend::Memory;
    assert_eq!(open_backend(&config).unwrap().name(), "memory");
}

#[test]
fn corrupt_json_file_is_a_storage_error_and_is_left_alone() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("database.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = seeded_store(Box::new(JsonFileBackend::open(&path).unwrap()));
    let err = store.get_or_create_user("1", "indy").unwrap_err();
    assert!(err.is_storage(), "{:?}", err);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
}

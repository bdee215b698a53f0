//! Excavation progression engine: reward sampling, leveling, and the
//! economy store that owns every user and artifact record.
//!
//! Callers (a chat command layer, the operator CLI) talk to
//! [`EconomyStore`] only. It holds the per-user locks and is the single
//! writer of the ledger; [`backend`] decides where the ledger lives.

pub mod backend;
pub mod content;
pub mod errors;
pub mod leveling;
pub mod reward;
pub mod stats;
pub mod store;
pub mod types;

pub use backend::{
    open_backend, ChangeSet, JsonFileBackend, LedgerBackend, LedgerFile, MemoryBackend, SledBackend,
};
pub use content::{ContentGenerator, FixedContent, RandomContent};
pub use errors::LedgerError;
pub use leveling::LevelCurve;
pub use reward::{Reward, RewardConfig, RewardModel};
pub use stats::{export_statistics, LedgerStats, StatisticsExport};
pub use store::{EconomyStore, EconomyStoreBuilder, Excavation, LeaderboardEntry, Purchase};
pub use types::*;

//! Read-only aggregates over the ledger: totals, rarity histogram, level
//! distribution and recent joiners. Nothing here takes a user lock; the
//! figures are a best-effort snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::dig::errors::LedgerError;
use crate::dig::store::{sort_for_leaderboard, EconomyStore, LeaderboardEntry};
use crate::dig::types::RarityTier;

/// Rows in the exported leaderboard.
pub const EXPORT_LEADERBOARD_LIMIT: usize = 50;
const RECENT_JOINERS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct RecentJoiner {
    pub username: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerStats {
    pub generated_at: DateTime<Utc>,
    pub user_count: usize,
    pub total_excavations: u64,
    /// Artifacts currently held (sold ones are gone).
    pub total_artifacts: usize,
    pub coins_in_circulation: u64,
    pub average_level: f64,
    pub top: Vec<LeaderboardEntry>,
    pub rarity_counts: BTreeMap<RarityTier, usize>,
    pub level_distribution: BTreeMap<u32, usize>,
    pub recent: Vec<RecentJoiner>,
}

/// Compute aggregates. `top_n` bounds the embedded leaderboard.
pub fn collect(store: &EconomyStore, top_n: usize) -> Result<LedgerStats, LedgerError> {
    let mut users = store.get_all_users()?;

    let total_excavations: u64 = users.iter().map(|u| u.total_excavations).sum();
    let total_artifacts: usize = users.iter().map(|u| u.artifact_count()).sum();
    let coins_in_circulation: u64 = users.iter().map(|u| u.coins).sum();
    let average_level = if users.is_empty() {
        0.0
    } else {
        users.iter().map(|u| f64::from(u.level)).sum::<f64>() / users.len() as f64
    };

    let mut rarity_counts: BTreeMap<RarityTier, usize> = BTreeMap::new();
    let mut level_distribution: BTreeMap<u32, usize> = BTreeMap::new();
    for user in &users {
        *level_distribution.entry(user.level).or_insert(0) += 1;
        for artifact_id in &user.artifact_ids {
            match store.get_artifact(artifact_id) {
                Ok(artifact) => *rarity_counts.entry(artifact.rarity).or_insert(0) += 1,
                Err(e) if e.is_not_found() => {
                    log::warn!("stats: {} lists missing artifact {}", user.user_id, artifact_id)
                }
                Err(e) => return Err(e),
            }
        }
    }

    let mut by_join = users.clone();
    by_join.sort_by(|a, b| b.joined_at.cmp(&a.joined_at));
    let recent = by_join
        .into_iter()
        .take(RECENT_JOINERS)
        .map(|u| RecentJoiner {
            username: u.username,
            joined_at: u.joined_at,
        })
        .collect();

    let user_count = users.len();
    sort_for_leaderboard(&mut users);
    let top = users
        .into_iter()
        .take(top_n)
        .map(|u| LeaderboardEntry {
            artifact_count: u.artifact_count(),
            user_id: u.user_id,
            username: u.username,
            level: u.level,
            experience: u.experience,
            coins: u.coins,
        })
        .collect();

    Ok(LedgerStats {
        generated_at: Utc::now(),
        user_count,
        total_excavations,
        total_artifacts,
        coins_in_circulation,
        average_level,
        top,
        rarity_counts,
        level_distribution,
        recent,
    })
}

/// Plain-text report for terminals.
pub fn render(stats: &LedgerStats) -> String {
    let rule = "=".repeat(60);
    let thin = "-".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{}\nARCHEOLOBOT STATISTICS\n{}", rule, rule);
    if stats.user_count == 0 {
        let _ = writeln!(out, "\nNo data yet.\n{}", rule);
        return out;
    }

    let _ = writeln!(out, "\nTOTALS\n{}", thin);
    let _ = writeln!(out, "Archaeologists:      {}", stats.user_count);
    let _ = writeln!(out, "Excavations:         {}", stats.total_excavations);
    let _ = writeln!(out, "Artifacts held:      {}", stats.total_artifacts);
    let _ = writeln!(out, "Coins in circulation: {}", stats.coins_in_circulation);
    let _ = writeln!(out, "Average level:       {:.1}", stats.average_level);

    let _ = writeln!(out, "\nTOP ARCHAEOLOGISTS\n{}", thin);
    for (rank, entry) in stats.top.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {:20} | Lv {:2} | {:5} XP | {} artifacts",
            rank + 1,
            entry.username,
            entry.level,
            entry.experience,
            entry.artifact_count
        );
    }

    let _ = writeln!(out, "\nARTIFACTS BY RARITY\n{}", thin);
    for rarity in RarityTier::ALL {
        if let Some(count) = stats.rarity_counts.get(&rarity).filter(|c| **c > 0) {
            let _ = writeln!(out, "  {:12} {:3}", rarity.as_str(), count);
        }
    }

    let _ = writeln!(out, "\nLEVEL DISTRIBUTION\n{}", thin);
    for (level, count) in &stats.level_distribution {
        let _ = writeln!(out, "  Level {:2}: {} ({})", level, "#".repeat(*count), count);
    }

    let _ = writeln!(out, "\nRECENT ARRIVALS\n{}", thin);
    for joiner in &stats.recent {
        let _ = writeln!(
            out,
            "  - {:20} joined {}",
            joiner.username,
            joiner.joined_at.format("%Y-%m-%d")
        );
    }
    let _ = writeln!(out, "\n{}", rule);
    out
}

/// Document written by [`export_statistics`].
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsExport {
    pub timestamp: DateTime<Utc>,
    pub total_archaeologists: usize,
    pub total_excavations: u64,
    pub total_artifacts: usize,
    pub rarity_counts: BTreeMap<RarityTier, usize>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl From<LedgerStats> for StatisticsExport {
    fn from(stats: LedgerStats) -> Self {
        Self {
            timestamp: stats.generated_at,
            total_archaeologists: stats.user_count,
            total_excavations: stats.total_excavations,
            total_artifacts: stats.total_artifacts,
            rarity_counts: stats.rarity_counts,
            leaderboard: stats.top,
        }
    }
}

/// Write a pretty JSON statistics export to `path`.
pub fn export_statistics(
    store: &EconomyStore,
    path: &Path,
) -> Result<StatisticsExport, LedgerError> {
    let export = StatisticsExport::from(collect(store, EXPORT_LEADERBOARD_LIMIT)?);
    let data = serde_json::to_string_pretty(&export)?;
    std::fs::write(path, data)?;
    log::info!("stats: exported statistics to {:?}", path);
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dig::backend::MemoryBackend;

    fn seeded_store() -> EconomyStore {
        let store = EconomyStore::builder(Box::new(MemoryBackend::new()))
            .seed(77)
            .build()
            .unwrap();
        for (id, name, digs) in [("1", "indy", 3), ("2", "lara", 1), ("3", "nathan", 0)] {
            store.get_or_create_user(id, name).unwrap();
            for _ in 0..digs {
                store.record_excavation(id).unwrap();
            }
        }
        store
    }

    #[test]
    fn empty_ledger_renders_placeholder() {
        let store = EconomyStore::new(Box::new(MemoryBackend::new())).unwrap();
        let stats = collect(&store, 5).unwrap();
        assert_eq!(stats.user_count, 0);
        assert_eq!(stats.average_level, 0.0);
        assert!(render(&stats).contains("No data yet."));
    }

    #[test]
    fn totals_match_ledger() {
        let store = seeded_store();
        let stats = collect(&store, 2).unwrap();
        assert_eq!(stats.user_count, 3);
        assert_eq!(stats.total_excavations, 4);
        assert_eq!(stats.total_artifacts, 4);
        assert_eq!(stats.rarity_counts.values().sum::<usize>(), 4);
        assert_eq!(stats.level_distribution.values().sum::<usize>(), 3);
        assert_eq!(stats.top.len(), 2);
        assert_eq!(stats.recent.len(), 3);
        let text = render(&stats);
        assert!(text.contains("Excavations:         4"));
    }

    #[test]
    fn export_writes_json() {
        let store = seeded_store();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("statistics.json");
        let export = export_statistics(&store, &path).unwrap();
        assert_eq!(export.total_archaeologists, 3);
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total_excavations"], serde_json::json!(4));
        assert_eq!(value["leaderboard"].as_array().unwrap().len(), 3);
    }
}

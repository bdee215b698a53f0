//! Reward sampling for a single excavation.
//!
//! Rarity is a weighted draw over the five tiers; the coin value is then drawn
//! uniformly from ±20% around the rarity's base value. Better pickaxes move
//! weight out of `common` and into `legendary`. The starter pickaxe can never
//! find a legendary artifact.
//!
//! Everything here is pure. Callers pass the random source so tests can seed it.

use log::warn;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dig::types::{RarityTable, RarityTier, ToolCatalog};

/// Weight and value tables for reward sampling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardConfig {
    /// Epic weight used for the starter pickaxe (whose legendary weight is 0).
    #[serde(default = "default_starter_epic_weight")]
    pub starter_epic_weight: u32,
    /// Relative weights; only their ratios matter.
    pub weights: RarityTable<u32>,
    /// Base coin value per rarity.
    pub values: RarityTable<u64>,
}

fn default_starter_epic_weight() -> u32 {
    10
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            weights: RarityTable {
                common: 50,
                uncommon: 25,
                rare: 15,
                epic: 7,
                legendary: 3,
            },
            values: RarityTable {
                common: 50,
                uncommon: 150,
                rare: 300,
                epic: 500,
                legendary: 1000,
            },
            starter_epic_weight: default_starter_epic_weight(),
        }
    }
}

/// Outcome of one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reward {
    pub coins: u64,
    pub rarity: RarityTier,
}

/// Inclusive coin bounds for a base value: `[0.8 * base, 1.2 * base]`, truncated.
pub fn value_bounds(base: u64) -> (u64, u64) {
    (base.saturating_mul(4) / 5, base.saturating_mul(6) / 5)
}

#[derive(Debug, Clone)]
pub struct RewardModel {
    config: RewardConfig,
    catalog: ToolCatalog,
}

impl RewardModel {
    pub fn new(config: RewardConfig, catalog: ToolCatalog) -> Self {
        Self { config, catalog }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Effective rarity weights when digging with `tool_key`.
    ///
    /// Unknown keys (a tier removed from the config after users bought it)
    /// fall back to the starter weights.
    pub fn weights_for(&self, tool_key: &str) -> RarityTable<u32> {
        let mut weights = self.config.weights;
        let tool = match self.catalog.get(tool_key) {
            Some(tool) if !self.catalog.is_starter(&tool.key) => tool,
            Some(_) => return self.starter_weights(),
            None => {
                warn!("reward: unknown tool tier '{}', using starter odds", tool_key);
                return self.starter_weights();
            }
        };
        let shift = i64::from(tool.legendary_chance) - i64::from(self.config.weights.legendary);
        let common = (i64::from(weights.common) - shift).max(0);
        weights.common = u32::try_from(common).unwrap_or(u32::MAX);
        weights.legendary = tool.legendary_chance;
        weights
    }

    fn starter_weights(&self) -> RarityTable<u32> {
        let mut weights = self.config.weights;
        weights.legendary = 0;
        weights.epic = self.config.starter_epic_weight;
        weights
    }

    /// Draw a rarity for `tool_key`. An all-zero weight table yields `Common`.
    pub fn sample_rarity<R: Rng + ?Sized>(&self, tool_key: &str, rng: &mut R) -> RarityTier {
        let weights = self.weights_for(tool_key).to_array();
        match WeightedIndex::new(weights) {
            Ok(dist) => RarityTier::ALL[dist.sample(rng)],
            Err(e) => {
                warn!("reward: invalid weight table {:?}: {}", weights, e);
                RarityTier::Common
            }
        }
    }

    /// Draw a coin value for an already chosen rarity.
    pub fn sample_value<R: Rng + ?Sized>(&self, rarity: RarityTier, rng: &mut R) -> u64 {
        let (low, high) = value_bounds(self.config.values.get(rarity));
        rng.gen_range(low..=high)
    }

    /// Full reward for one excavation with `tool_key`.
    pub fn sample<R: Rng + ?Sized>(&self, tool_key: &str, rng: &mut R) -> Reward {
        let rarity = self.sample_rarity(tool_key, rng);
        let coins = self.sample_value(rarity, rng);
        Reward { coins, rarity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dig::types::ToolTier;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn model() -> RewardModel {
        let catalog = ToolCatalog::new(vec![
            ToolTier::new("basic", "Basic Pickaxe", 0, 3),
            ToolTier::new("bronze", "Bronze Pickaxe", 500, 5),
            ToolTier::new("diamond", "Diamond Pickaxe", 15000, 50),
        ])
        .unwrap();
        RewardModel::new(RewardConfig::default(), catalog)
    }

    #[test]
    fn starter_weights_remove_legendary() {
        let w = model().weights_for("basic");
        assert_eq!(w.to_array(), [50, 25, 15, 10, 0]);
    }

    #[test]
    fn better_tools_shift_common_into_legendary() {
        let m = model();
        assert_eq!(m.weights_for("bronze").to_array(), [48, 25, 15, 7, 5]);
        assert_eq!(m.weights_for("diamond").to_array(), [3, 25, 15, 7, 50]);
    }

    #[test]
    fn common_weight_floors_at_zero() {
        let catalog = ToolCatalog::new(vec![
            ToolTier::new("basic", "Basic", 0, 3),
            ToolTier::new("cursed", "Cursed", 10, 50),
        ])
        .unwrap();
        let mut config = RewardConfig::default();
        config.weights.common = 20;
        let m = RewardModel::new(config, catalog);
        assert_eq!(m.weights_for("cursed").common, 0);
    }

    #[test]
    fn unknown_tool_uses_starter_weights() {
        let m = model();
        assert_eq!(m.weights_for("adamantium"), m.weights_for("basic"));
    }

    #[test]
    fn value_bounds_are_twenty_percent() {
        assert_eq!(value_bounds(50), (40, 60));
        assert_eq!(value_bounds(1000), (800, 1200));
        assert_eq!(value_bounds(0), (0, 0));
    }

    #[test]
    fn sampled_values_stay_in_bounds_for_every_tier() {
        let m = model();
        let mut rng = StdRng::seed_from_u64(7);
        for tool in ["basic", "bronze", "diamond"] {
            for _ in 0..2_000 {
                let reward = m.sample(tool, &mut rng);
                let (low, high) = value_bounds(m.config().values.get(reward.rarity));
                assert!(
                    reward.coins >= low && reward.coins <= high,
                    "{:?} out of [{}, {}] with {}",
                    reward,
                    low,
                    high,
                    tool
                );
            }
        }
    }

    #[test]
    fn starter_never_finds_legendary() {
        let m = model();
        let mut rng = StdRng::seed_from_u64(0xD16);
        for _ in 0..20_000 {
            assert_ne!(m.sample_rarity("basic", &mut rng), RarityTier::Legendary);
        }
    }

    #[test]
    fn diamond_finds_legendary_often() {
        let m = model();
        let mut rng = StdRng::seed_from_u64(99);
        let legendary = (0..5_000)
            .filter(|_| m.sample_rarity("diamond", &mut rng) == RarityTier::Legendary)
            .count();
        // weight 50 of 100 total
        assert!(legendary > 2_000 && legendary < 3_000, "got {}", legendary);
    }

    #[test]
    fn all_zero_weights_fall_back_to_common() {
        let catalog = ToolCatalog::new(vec![ToolTier::new("basic", "Basic", 0, 3)]).unwrap();
        let config = RewardConfig {
            weights: RarityTable {
                common: 0,
                uncommon: 0,
                rare: 0,
                epic: 0,
                legendary: 0,
            },
            values: RewardConfig::default().values,
            starter_epic_weight: 0,
        };
        let m = RewardModel::new(config, catalog);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(m.sample_rarity("basic", &mut rng), RarityTier::Common);
    }
}

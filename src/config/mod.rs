//! # Configuration Management Module
//!
//! Centralized, TOML-backed configuration for the excavation engine.
//!
//! ## Configuration Structure
//!
//! - [`GameConfig`] - reward tables, pickaxe catalog, experience curve
//! - [`StorageConfig`] - which persistence backend to use and where it lives
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use archeolobot::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("archeolobot.toml").await?;
//!     println!("Backend: {:?}", config.storage.backend);
//!     Config::create_default("archeolobot.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [game]
//! xp_min = 25
//! xp_max = 75
//! xp_per_level = 100
//! leaderboard_limit = 10
//!
//! [[game.tools]]
//! key = "basic"
//! name = "Basic Pickaxe"
//! cost = 0
//! legendary_chance = 3
//!
//! [storage]
//! backend = "json"
//! data_dir = "./data"
//! ```
//!
//! The first `[[game.tools]]` entry is the starter pickaxe every new user gets.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::fs;

use crate::dig::reward::RewardConfig;
use crate::dig::types::{ToolCatalog, ToolTier};

/// Highest `legendary_chance` a pickaxe may carry.
pub const MAX_LEGENDARY_CHANCE: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    /// Inclusive experience range granted per excavation.
    #[serde(default = "default_xp_min")]
    pub xp_min: u64,
    #[serde(default = "default_xp_max")]
    pub xp_max: u64,
    /// Experience needed per level (`level * xp_per_level`).
    #[serde(default = "default_xp_per_level")]
    pub xp_per_level: u64,
    /// Default number of rows for leaderboards.
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: usize,
    #[serde(default)]
    pub rewards: RewardConfig,
    /// Pickaxe catalog, cheapest first. The first entry is the starter tool.
    #[serde(default = "default_tools")]
    pub tools: Vec<ToolTier>,
}

fn default_xp_min() -> u64 {
    25
}

fn default_xp_max() -> u64 {
    75
}

fn default_xp_per_level() -> u64 {
    crate::dig::leveling::DEFAULT_XP_PER_LEVEL
}

fn default_leaderboard_limit() -> usize {
    10
}

fn default_tools() -> Vec<ToolTier> {
    vec![
        ToolTier::new("basic", "Basic Pickaxe", 0, 3),
        ToolTier::new("bronze", "Bronze Pickaxe", 500, 5),
        ToolTier::new("iron", "Iron Pickaxe", 1500, 8),
        ToolTier::new("gold", "Golden Pickaxe", 5000, 15),
        ToolTier::new("diamond", "Diamond Pickaxe", 15000, 25),
    ]
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            xp_min: default_xp_min(),
            xp_max: default_xp_max(),
            xp_per_level: default_xp_per_level(),
            leaderboard_limit: default_leaderboard_limit(),
            rewards: RewardConfig::default(),
            tools: default_tools(),
        }
    }
}

impl GameConfig {
    /// Check the tables for values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.tools.is_empty() {
            bail!("game.tools must list at least the starter pickaxe");
        }
        let mut seen = HashSet::new();
        for tool in &self.tools {
            let key = tool.key.trim().to_ascii_lowercase();
            if key.is_empty() {
                bail!("game.tools entry '{}' has an empty key", tool.name);
            }
            if !seen.insert(key) {
                bail!("duplicate pickaxe key '{}'", tool.key);
            }
            if tool.legendary_chance > MAX_LEGENDARY_CHANCE {
                bail!(
                    "pickaxe '{}' legendary_chance {} exceeds {}",
                    tool.key,
                    tool.legendary_chance,
                    MAX_LEGENDARY_CHANCE
                );
            }
        }
        if self.xp_min > self.xp_max {
            bail!("game.xp_min ({}) exceeds game.xp_max ({})", self.xp_min, self.xp_max);
        }
        if self.xp_per_level == 0 {
            bail!("game.xp_per_level must be positive");
        }
        if self.rewards.weights.to_array().iter().all(|w| *w == 0) {
            bail!("game.rewards.weights cannot all be zero");
        }
        Ok(())
    }

    pub fn catalog(&self) -> Result<ToolCatalog> {
        ToolCatalog::new(self.tools.clone())
            .ok_or_else(|| anyhow!("game.tools must list at least the starter pickaxe"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Single JSON document, rewritten on every mutation.
    #[default]
    Json,
    /// Embedded sled database with per-key writes.
    Sled,
    /// Nothing persisted; for dry runs.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    pub data_dir: String,
    /// File name of the JSON ledger inside `data_dir`.
    #[serde(default = "default_json_file")]
    pub json_file: String,
    /// Directory name of the sled database inside `data_dir`.
    #[serde(default = "default_sled_dir")]
    pub sled_dir: String,
}

fn default_json_file() -> String {
    "database.json".to_string()
}

fn default_sled_dir() -> String {
    "ledger.sled".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file and validate the game tables.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config
            .game
            .validate()
            .map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            game: GameConfig::default(),
            storage: StorageConfig {
                backend: StorageBackend::Json,
                data_dir: "./data".to_string(),
                json_file: default_json_file(),
                sled_dir: default_sled_dir(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("archeolobot.log".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dig::types::RarityTable;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        config.game.validate().unwrap();
        assert_eq!(config.game.catalog().unwrap().starter().key, "basic");
        let bronze = config.game.tools.iter().find(|t| t.key == "bronze").unwrap();
        assert_eq!(bronze.cost, 500);
    }

    #[test]
    fn rejects_excessive_legendary_chance() {
        let mut game = GameConfig::default();
        game.tools.push(ToolTier::new("mythril", "Mythril Pickaxe", 90000, 51));
        assert!(game.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_keys_case_insensitively() {
        let mut game = GameConfig::default();
        game.tools.push(ToolTier::new("Bronze", "Other Bronze", 1, 4));
        let err = game.validate().unwrap_err().to_string();
        assert!(err.contains("duplicate"), "{}", err);
    }

    #[test]
    fn rejects_inverted_xp_range_and_empty_catalog() {
        let mut game = GameConfig::default();
        game.xp_min = 80;
        assert!(game.validate().is_err());

        let mut game = GameConfig::default();
        game.tools.clear();
        assert!(game.validate().is_err());
        assert!(game.catalog().is_err());
    }

    #[test]
    fn rejects_all_zero_weights() {
        let mut game = GameConfig::default();
        game.rewards.weights = RarityTable {
            common: 0,
            uncommon: 0,
            rare: 0,
            epic: 0,
            legendary: 0,
        };
        let err = game.validate().unwrap_err().to_string();
        assert!(err.contains("weights"), "{}", err);

        // one non-zero weight is enough
        game.rewards.weights.rare = 1;
        game.validate().unwrap();
    }

    #[test]
    fn toml_round_trip_keeps_tables() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("[[game.tools]]"));
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_fills_game_defaults() {
        let text = r#"
            [storage]
            backend = "sled"
            data_dir = "/var/lib/archeolobot"

            [logging]
            level = "debug"
        "#;
        let parsed: Config = toml::from_str(text).unwrap();
        assert_eq!(parsed.storage.backend, StorageBackend::Sled);
        assert_eq!(parsed.storage.sled_dir, "ledger.sled");
        assert_eq!(parsed.game, GameConfig::default());
        assert!(parsed.logging.file.is_none());
    }

    #[tokio::test]
    async fn load_reports_invalid_tables() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.toml");
        let mut config = Config::default();
        config.game.xp_per_level = 0;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        let err = Config::load(path.to_str().unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("xp_per_level"));
    }
}

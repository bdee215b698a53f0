use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::dig::errors::LedgerError;

pub const USER_SCHEMA_VERSION: u8 = 1;
pub const ARTIFACT_SCHEMA_VERSION: u8 = 1;

fn user_schema_version() -> u8 {
    USER_SCHEMA_VERSION
}

fn artifact_schema_version() -> u8 {
    ARTIFACT_SCHEMA_VERSION
}

/// Scarcity class of an artifact. Declaration order is the value order,
/// so the derived `Ord` gives common < uncommon < rare < epic < legendary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RarityTier {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl RarityTier {
    pub const ALL: [RarityTier; 5] = [
        RarityTier::Common,
        RarityTier::Uncommon,
        RarityTier::Rare,
        RarityTier::Epic,
        RarityTier::Legendary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RarityTier::Common => "common",
            RarityTier::Uncommon => "uncommon",
            RarityTier::Rare => "rare",
            RarityTier::Epic => "epic",
            RarityTier::Legendary => "legendary",
        }
    }

    /// Lenient lookup used by the soft-failing sell path.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RarityTier {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| LedgerError::Validation(format!("unknown rarity: {}", s)))
    }
}

/// One value per rarity tier. Used for weight and base value tables so that
/// they read naturally in TOML.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RarityTable<T> {
    pub common: T,
    pub uncommon: T,
    pub rare: T,
    pub epic: T,
    pub legendary: T,
}

impl<T: Copy> RarityTable<T> {
    pub fn get(&self, rarity: RarityTier) -> T {
        match rarity {
            RarityTier::Common => self.common,
            RarityTier::Uncommon => self.uncommon,
            RarityTier::Rare => self.rare,
            RarityTier::Epic => self.epic,
            RarityTier::Legendary => self.legendary,
        }
    }

    /// Values in rarity order.
    pub fn to_array(&self) -> [T; 5] {
        [
            self.common,
            self.uncommon,
            self.rare,
            self.epic,
            self.legendary,
        ]
    }
}

/// A purchasable pickaxe. The first entry of the catalog is the starter tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolTier {
    pub key: String,
    pub name: String,
    pub cost: u64,
    /// Replacement legendary weight for non-starter tools (0-50).
    pub legendary_chance: u32,
}

impl ToolTier {
    pub fn new(key: &str, name: &str, cost: u64, legendary_chance: u32) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            cost,
            legendary_chance,
        }
    }
}

/// Ordered, immutable list of tool tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCatalog {
    tiers: Vec<ToolTier>,
}

impl ToolCatalog {
    /// Build a catalog. Returns `None` when `tiers` is empty since every user
    /// needs a starter tool.
    pub fn new(tiers: Vec<ToolTier>) -> Option<Self> {
        if tiers.is_empty() {
            None
        } else {
            Some(Self { tiers })
        }
    }

    pub fn starter(&self) -> &ToolTier {
        &self.tiers[0]
    }

    pub fn is_starter(&self, key: &str) -> bool {
        self.starter().key.eq_ignore_ascii_case(key.trim())
    }

    pub fn get(&self, key: &str) -> Option<&ToolTier> {
        let key = key.trim();
        self.tiers.iter().find(|t| t.key.eq_ignore_ascii_case(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolTier> {
        self.tiers.iter()
    }
}

/// Persistent progression state for one player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: String,
    pub username: String,
    pub level: u32,
    pub experience: u64,
    pub coins: u64,
    /// Owned artifacts in discovery order.
    #[serde(default)]
    pub artifact_ids: Vec<String>,
    #[serde(default)]
    pub total_excavations: u64,
    pub tool_tier: String,
    pub joined_at: DateTime<Utc>,
    #[serde(default = "user_schema_version")]
    pub schema_version: u8,
}

impl UserRecord {
    pub fn new(user_id: &str, username: &str, tool_tier: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            username: username.to_string(),
            level: 1,
            experience: 0,
            coins: 0,
            artifact_ids: Vec::new(),
            total_excavations: 0,
            tool_tier: tool_tier.to_string(),
            joined_at: Utc::now(),
            schema_version: USER_SCHEMA_VERSION,
        }
    }

    /// Append an artifact id unless it is already owned.
    pub fn add_artifact(&mut self, artifact_id: &str) {
        if !self.owns(artifact_id) {
            self.artifact_ids.push(artifact_id.to_string());
        }
    }

    pub fn owns(&self, artifact_id: &str) -> bool {
        self.artifact_ids.iter().any(|id| id == artifact_id)
    }

    pub fn add_coins(&mut self, amount: u64) {
        self.coins = self.coins.saturating_add(amount);
    }

    pub fn artifact_count(&self) -> usize {
        self.artifact_ids.len()
    }
}

/// A discovered artifact. Deleted outright when sold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub artifact_id: String,
    pub name: String,
    pub rarity: RarityTier,
    pub description: String,
    pub value: u64,
    pub discovered_by: String,
    pub discovered_at: DateTime<Utc>,
    #[serde(default = "artifact_schema_version")]
    pub schema_version: u8,
}

impl ArtifactRecord {
    /// Create a record with a fresh v4 id.
    pub fn new(
        name: &str,
        rarity: RarityTier,
        description: &str,
        value: u64,
        discovered_by: &str,
    ) -> Self {
        Self {
            artifact_id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            rarity,
            description: description.to_string(),
            value,
            discovered_by: discovered_by.to_string(),
            discovered_at: Utc::now(),
            schema_version: ARTIFACT_SCHEMA_VERSION,
        }
    }

    /// Case-insensitive exact name comparison used by sell-by-name.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

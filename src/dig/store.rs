//! The economy store: sole owner and mutator of user and artifact records.
//!
//! Every public mutation runs as read → validate → mutate → commit while
//! holding a per-user mutex, and hands the backend one [`ChangeSet`] so that
//! no half-applied state is ever visible. Different users do not contend.
//! Artifact flavor text is generated before the lock is taken.
//!
//! Soft failures (unknown pickaxe or rarity key, nothing to sell, not enough
//! coins) are reported through the return value, not as errors. A missing
//! user is always [`LedgerError::NotFound`]; only
//! [`EconomyStore::get_or_create_user`] creates records.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::GameConfig;
use crate::dig::backend::{ChangeSet, LedgerBackend};
use crate::dig::content::{ContentGenerator, RandomContent};
use crate::dig::errors::LedgerError;
use crate::dig::leveling::LevelCurve;
use crate::dig::reward::RewardModel;
use crate::dig::types::{ArtifactRecord, RarityTier, ToolCatalog, UserRecord};
use crate::logutil::escape_log;
use crate::validation::{validate_display_name, validate_user_id};

/// Result of one excavation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Excavation {
    pub artifact: ArtifactRecord,
    pub xp_gained: u64,
    pub leveled_up: bool,
    /// User level after the excavation.
    pub level: u32,
}

/// Result of a pickaxe purchase attempt. The message is for display only;
/// `success` is what callers should branch on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub success: bool,
    pub message: String,
}

impl Purchase {
    fn succeeded(message: String) -> Self {
        Self {
            success: true,
            message,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
        }
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub username: String,
    pub level: u32,
    pub experience: u64,
    pub coins: u64,
    pub artifact_count: usize,
}

/// Mutex per user id, created on demand and dropped once nobody holds or
/// waits for it.
#[derive(Debug, Default)]
struct UserLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    fn table(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>>, LedgerError> {
        self.table
            .lock()
            .map_err(|_| LedgerError::Internal("user lock table poisoned".into()))
    }

    fn handle(&self, user_id: &str) -> Result<Arc<Mutex<()>>, LedgerError> {
        Ok(self
            .table()?
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Forget `user_id` when `handle` is the last reference outside the table.
    fn release(&self, user_id: &str, handle: Arc<Mutex<()>>) {
        let Ok(mut table) = self.table() else {
            return;
        };
        // one count for the table entry, one for `handle`
        if Arc::strong_count(&handle) == 2 {
            table.remove(user_id);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.table().map(|t| t.len()).unwrap_or(0)
    }
}

/// Builder so tests can inject a seed, flavor text, or custom tables.
pub struct EconomyStoreBuilder {
    backend: Box<dyn LedgerBackend>,
    game: GameConfig,
    content: Box<dyn ContentGenerator>,
    seed: Option<u64>,
}

impl EconomyStoreBuilder {
    pub fn new(backend: Box<dyn LedgerBackend>) -> Self {
        Self {
            backend,
            game: GameConfig::default(),
            content: Box::new(RandomContent),
            seed: None,
        }
    }

    pub fn game(mut self, game: GameConfig) -> Self {
        self.game = game;
        self
    }

    pub fn content(mut self, content: Box<dyn ContentGenerator>) -> Self {
        self.content = content;
        self
    }

    /// Seed the store's random source for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<EconomyStore, LedgerError> {
        self.game
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;
        let catalog = self
            .game
            .catalog()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(EconomyStore {
            backend: self.backend,
            rewards: RewardModel::new(self.game.rewards.clone(), catalog.clone()),
            curve: LevelCurve::new(self.game.xp_per_level),
            catalog,
            xp_range: (self.game.xp_min, self.game.xp_max),
            content: self.content,
            rng: Mutex::new(rng),
            locks: UserLocks::default(),
        })
    }
}

pub struct EconomyStore {
    backend: Box<dyn LedgerBackend>,
    rewards: RewardModel,
    curve: LevelCurve,
    catalog: ToolCatalog,
    xp_range: (u64, u64),
    content: Box<dyn ContentGenerator>,
    rng: Mutex<StdRng>,
    locks: UserLocks,
}

impl EconomyStore {
    /// Store with default game tables and an entropy-seeded random source.
    pub fn new(backend: Box<dyn LedgerBackend>) -> Result<Self, LedgerError> {
        EconomyStoreBuilder::new(backend).build()
    }

    pub fn builder(backend: Box<dyn LedgerBackend>) -> EconomyStoreBuilder {
        EconomyStoreBuilder::new(backend)
    }

    pub fn tool_catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn reward_model(&self) -> &RewardModel {
        &self.rewards
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Experience total at which `user` reaches the next level.
    pub fn xp_to_next_level(&self, user: &UserRecord) -> u64 {
        self.curve.xp_to_next_level(user)
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> Result<T, LedgerError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| LedgerError::Internal("rng lock poisoned".into()))?;
        Ok(f(&mut rng))
    }

    /// Run `op` while holding the lock for `user_id`.
    fn with_user_lock<T>(
        &self,
        user_id: &str,
        op: impl FnOnce() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let handle = self.locks.handle(user_id)?;
        let result = match handle.lock() {
            Ok(_guard) => op(),
            Err(_) => Err(LedgerError::Internal("user lock poisoned".into())),
        };
        self.locks.release(user_id, handle);
        result
    }

    fn require_user(&self, user_id: &str) -> Result<UserRecord, LedgerError> {
        self.backend
            .load_user(user_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("user: {}", user_id)))
    }

    /// Owned artifacts paired with their ids, in ownership order. Ids whose
    /// record is missing come back as `None`.
    fn owned_artifacts(
        &self,
        user: &UserRecord,
    ) -> Result<Vec<(String, Option<ArtifactRecord>)>, LedgerError> {
        let records = self.backend.load_artifacts(&user.artifact_ids)?;
        Ok(user.artifact_ids.iter().cloned().zip(records).collect())
    }

    /// Fetch a user, creating a fresh record with the starter pickaxe if none exists.
    pub fn get_or_create_user(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> Result<UserRecord, LedgerError> {
        let user_id = normalize_user_id(user_id)?;
        self.with_user_lock(&user_id, || {
            if let Some(existing) = self.backend.load_user(&user_id)? {
                return Ok(existing);
            }
            let display_name = validate_display_name(display_name)
                .map_err(|e| LedgerError::Validation(e.to_string()))?;
            let user = UserRecord::new(&user_id, &display_name, &self.catalog.starter().key);
            self.backend.commit(&ChangeSet::new().put_user(user.clone()))?;
            info!(
                "ledger: new user {} ({})",
                escape_log(&user_id),
                escape_log(&display_name)
            );
            Ok(user)
        })
    }

    /// Dig once: sample a reward with the user's pickaxe, create the artifact,
    /// grant experience, and persist both records together.
    pub fn record_excavation(&self, user_id: &str) -> Result<Excavation, LedgerError> {
        let user_id = normalize_user_id(user_id)?;
        let (name, description) =
            self.with_rng(|rng| (self.content.name(rng), self.content.description(rng)))?;
        self.with_user_lock(&user_id, || self.excavate_locked(&user_id, name, description))
    }

    fn excavate_locked(
        &self,
        user_id: &str,
        name: String,
        description: String,
    ) -> Result<Excavation, LedgerError> {
        let mut user = self.require_user(user_id)?;
        let (low, high) = self.xp_range;
        let (reward, xp_gained) = self.with_rng(|rng| {
            let reward = self.rewards.sample(&user.tool_tier, rng);
            (reward, rng.gen_range(low..=high))
        })?;

        let artifact = ArtifactRecord::new(
            &name,
            reward.rarity,
            &description,
            reward.coins,
            &user.user_id,
        );
        user.add_artifact(&artifact.artifact_id);
        let leveled_up = self.curve.add_experience(&mut user, xp_gained);
        user.total_excavations = user.total_excavations.saturating_add(1);

        self.backend.commit(
            &ChangeSet::new()
                .put_user(user.clone())
                .put_artifact(artifact.clone()),
        )?;
        info!(
            "ledger: {} dug up {} '{}' worth {} (+{} xp{})",
            escape_log(user_id),
            artifact.rarity,
            escape_log(&artifact.name),
            artifact.value,
            xp_gained,
            if leveled_up { ", level up" } else { "" }
        );
        Ok(Excavation {
            artifact,
            xp_gained,
            leveled_up,
            level: user.level,
        })
    }

    /// Sell the earliest owned artifact whose name matches `artifact_name`
    /// (case-insensitive, exact). Returns `(coins_gained, sold_id)`;
    /// `(0, None)` with no write when nothing matches.
    pub fn sell_by_name(
        &self,
        user_id: &str,
        artifact_name: &str,
    ) -> Result<(u64, Option<String>), LedgerError> {
        let user_id = normalize_user_id(user_id)?;
        self.with_user_lock(&user_id, || self.sell_by_name_locked(&user_id, artifact_name))
    }

    fn sell_by_name_locked(
        &self,
        user_id: &str,
        artifact_name: &str,
    ) -> Result<(u64, Option<String>), LedgerError> {
        let mut user = self.require_user(user_id)?;
        let found = self
            .owned_artifacts(&user)?
            .into_iter()
            .find_map(|(_, record)| record.filter(|a| a.name_matches(artifact_name)));
        let Some(artifact) = found else {
            debug!(
                "ledger: {} has no artifact named '{}'",
                escape_log(user_id),
                escape_log(artifact_name)
            );
            return Ok((0, None));
        };

        user.artifact_ids.retain(|id| id != &artifact.artifact_id);
        user.add_coins(artifact.value);
        self.backend.commit(
            &ChangeSet::new()
                .put_user(user)
                .remove_artifact(&artifact.artifact_id),
        )?;
        info!(
            "ledger: {} sold '{}' for {}",
            escape_log(user_id),
            escape_log(&artifact.name),
            artifact.value
        );
        Ok((artifact.value, Some(artifact.artifact_id)))
    }

    /// Sell every owned artifact at or below `max_rarity`. Returns
    /// `(coins_gained, sold_count)`; `(0, 0)` with no write when the key is
    /// not a rarity or nothing qualifies.
    pub fn sell_by_max_rarity(
        &self,
        user_id: &str,
        max_rarity: &str,
    ) -> Result<(u64, usize), LedgerError> {
        let user_id = normalize_user_id(user_id)?;
        self.with_user_lock(&user_id, || self.sell_by_max_rarity_locked(&user_id, max_rarity))
    }

    fn sell_by_max_rarity_locked(
        &self,
        user_id: &str,
        max_rarity: &str,
    ) -> Result<(u64, usize), LedgerError> {
        let mut user = self.require_user(user_id)?;
        let Some(max) = RarityTier::from_key(max_rarity) else {
            warn!("ledger: unknown rarity '{}' in sell request", escape_log(max_rarity));
            return Ok((0, 0));
        };

        let mut changes = ChangeSet::new();
        let mut coins = 0u64;
        let mut remaining = Vec::with_capacity(user.artifact_ids.len());
        for (id, record) in self.owned_artifacts(&user)? {
            match record {
                Some(artifact) if artifact.rarity <= max => {
                    coins = coins.saturating_add(artifact.value);
                    changes = changes.remove_artifact(&id);
                }
                _ => remaining.push(id),
            }
        }
        let sold = changes.removed_artifacts.len();
        if sold == 0 {
            debug!(
                "ledger: {} has nothing at or below {}",
                escape_log(user_id),
                max
            );
            return Ok((0, 0));
        }

        user.artifact_ids = remaining;
        user.add_coins(coins);
        self.backend.commit(&changes.put_user(user))?;
        info!(
            "ledger: {} sold {} artifact(s) up to {} for {}",
            escape_log(user_id),
            sold,
            max,
            coins
        );
        Ok((coins, sold))
    }

    /// Buy the pickaxe `tier_key`. Buying the pickaxe already held is allowed
    /// and charged again.
    pub fn buy_tool(&self, user_id: &str, tier_key: &str) -> Result<Purchase, LedgerError> {
        let user_id = normalize_user_id(user_id)?;
        self.with_user_lock(&user_id, || self.buy_tool_locked(&user_id, tier_key))
    }

    fn buy_tool_locked(&self, user_id: &str, tier_key: &str) -> Result<Purchase, LedgerError> {
        let mut user = self.require_user(user_id)?;
        let Some(tool) = self.catalog.get(tier_key) else {
            warn!("ledger: unknown pickaxe '{}'", escape_log(tier_key));
            return Ok(Purchase::failed(format!(
                "Unknown pickaxe '{}'.",
                tier_key.trim()
            )));
        };
        if user.coins < tool.cost {
            debug!(
                "ledger: {} cannot afford {} ({} < {})",
                escape_log(user_id),
                tool.key,
                user.coins,
                tool.cost
            );
            return Ok(Purchase::failed(format!(
                "Not enough coins: the {} costs {} and you have {}.",
                tool.name, tool.cost, user.coins
            )));
        }

        user.coins -= tool.cost;
        user.tool_tier = tool.key.clone();
        let balance = user.coins;
        self.backend.commit(&ChangeSet::new().put_user(user))?;
        info!(
            "ledger: {} bought {} for {}",
            escape_log(user_id),
            tool.key,
            tool.cost
        );
        Ok(Purchase::succeeded(format!(
            "You bought the {}! {} coins left.",
            tool.name, balance
        )))
    }

    /// Top `limit` users by level, then experience, then coins (all
    /// descending). Full ties go to the lower user id.
    pub fn get_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        let mut users = self.backend.load_users()?;
        sort_for_leaderboard(&mut users);
        Ok(users
            .into_iter()
            .take(limit)
            .map(|u| LeaderboardEntry {
                artifact_count: u.artifact_count(),
                user_id: u.user_id,
                username: u.username,
                level: u.level,
                experience: u.experience,
                coins: u.coins,
            })
            .collect())
    }

    pub fn get_user(&self, user_id: &str) -> Result<UserRecord, LedgerError> {
        self.require_user(&normalize_user_id(user_id)?)
    }

    pub fn get_artifact(&self, artifact_id: &str) -> Result<ArtifactRecord, LedgerError> {
        self.backend
            .load_artifact(artifact_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("artifact: {}", artifact_id)))
    }

    /// Artifacts owned by `user_id`, in discovery order.
    pub fn get_user_artifacts(&self, user_id: &str) -> Result<Vec<ArtifactRecord>, LedgerError> {
        let user = self.require_user(&normalize_user_id(user_id)?)?;
        Ok(self
            .owned_artifacts(&user)?
            .into_iter()
            .filter_map(|(_, record)| record)
            .collect())
    }

    /// Every user, ordered by user id.
    pub fn get_all_users(&self) -> Result<Vec<UserRecord>, LedgerError> {
        let mut users = self.backend.load_users()?;
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(users)
    }
}

/// Every public operation keys the ledger by the trimmed, validated id.
fn normalize_user_id(user_id: &str) -> Result<String, LedgerError> {
    validate_user_id(user_id).map_err(|e| LedgerError::Validation(e.to_string()))
}

pub(crate) fn sort_for_leaderboard(users: &mut [UserRecord]) {
    users.sort_by(|a, b| {
        b.level
            .cmp(&a.level)
            .then_with(|| b.experience.cmp(&a.experience))
            .then_with(|| b.coins.cmp(&a.coins))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
}

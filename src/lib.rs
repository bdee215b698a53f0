//! # Archeolobot - excavation progression engine
//!
//! Users dig for artifacts of five rarity tiers, earn experience and levels,
//! sell their finds for coins, and spend coins on better pickaxes that
//! improve the odds of rare discoveries.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use archeolobot::config::Config;
//! use archeolobot::dig::{open_backend, EconomyStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("archeolobot.toml").await?;
//!     let backend = open_backend(&config.storage)?;
//!     let store = EconomyStore::builder(backend).game(config.game).build()?;
//!
//!     store.get_or_create_user("42", "indy")?;
//!     let dig = store.record_excavation("42")?;
//!     println!("found {} ({})", dig.artifact.name, dig.artifact.rarity);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`dig`] - reward model, level curve, economy store and persistence backends
//! - [`config`] - configuration loading and validation
//! - [`validation`] - identity validation for platform-supplied ids and names
//! - [`logutil`] - single-line escaping for user strings in logs
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ Command layer   │ ← chat bot or operator CLI
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Economy store   │ ← per-user locks, reward + level rules
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Ledger backend  │ ← JSON file, sled, or memory
//! └─────────────────┘
//! ```

pub mod config;
pub mod dig;
pub mod logutil;
pub mod validation;

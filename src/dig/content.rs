//! Flavor text for discovered artifacts.
//!
//! Name and description are chosen independently of rarity. Generation runs
//! before the store takes any lock.

use rand::Rng;

const PREFIXES: [&str; 6] = ["Ancient", "Mystical", "Golden", "Sacred", "Lost", "Hidden"];

const ITEMS: [&str; 7] = [
    "Amulet", "Scroll", "Sword", "Crown", "Chalice", "Tome", "Statue",
];

const DESCRIPTIONS: [&str; 6] = [
    "An enigmatic object whose origins are lost.",
    "Engraved with ancient, undeciphered symbols.",
    "It gives off a mysterious aura.",
    "Exceedingly rare and of great historical value.",
    "Keeper of the secrets of a forgotten civilization.",
    "Of exceptional beauty and craftsmanship.",
];

/// Source of artifact names and descriptions.
pub trait ContentGenerator: Send + Sync {
    fn name(&self, rng: &mut dyn rand::RngCore) -> String;
    fn description(&self, rng: &mut dyn rand::RngCore) -> String;
}

/// "<Prefix> <Item>" names with one of a handful of fixed descriptions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomContent;

impl ContentGenerator for RandomContent {
    fn name(&self, rng: &mut dyn rand::RngCore) -> String {
        let prefix = PREFIXES[rng.gen_range(0..PREFIXES.len())];
        let item = ITEMS[rng.gen_range(0..ITEMS.len())];
        format!("{} {}", prefix, item)
    }

    fn description(&self, rng: &mut dyn rand::RngCore) -> String {
        DESCRIPTIONS[rng.gen_range(0..DESCRIPTIONS.len())].to_string()
    }
}

/// Always returns the same name and description. Handy for tests that need
/// duplicate artifact names.
#[derive(Debug, Clone)]
pub struct FixedContent {
    pub name: String,
    pub description: String,
}

impl FixedContent {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

impl ContentGenerator for FixedContent {
    fn name(&self, _rng: &mut dyn rand::RngCore) -> String {
        self.name.clone()
    }

    fn description(&self, _rng: &mut dyn rand::RngCore) -> String {
        self.description.clone()
    }
}

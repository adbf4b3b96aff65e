//! Randomizable loadout items.

use std::collections::{BTreeSet, HashSet};

use protocol::packets::{Loadout, LOADOUT_EMOTE_SLOTS};
use rand::Rng;
use thiserror::Error;

use crate::defs::{Category, GameDefs};

/// Heal item every bot carries.
pub const DEFAULT_HEAL: &str = "heal_basic";
/// Boost item every bot carries.
pub const DEFAULT_BOOST: &str = "boost_basic";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no unlocked {0} items: the unlock list shares nothing with the {0} table")]
    EmptyCategory(Category),
}

/// Items a bot may pick, built once at startup and shared by every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadoutCatalog {
    outfits: Vec<String>,
    emotes: Vec<String>,
    melees: Vec<String>,
}

impl LoadoutCatalog {
    /// Keep, per category, the declared items that are also unlocked.
    ///
    /// Each category ends up sorted and de-duplicated. A category with no
    /// items left is an error since nothing could be drawn from it.
    pub fn build(defs: &GameDefs, unlocked: &[String]) -> Result<Self, CatalogError> {
        let unlocked: HashSet<&str> = unlocked.iter().map(String::as_str).collect();
        let pick = |category: Category| -> Result<Vec<String>, CatalogError> {
            let items: BTreeSet<&String> = defs
                .items(category)
                .iter()
                .filter(|item| unlocked.contains(item.as_str()))
                .collect();
            if items.is_empty() {
                return Err(CatalogError::EmptyCategory(category));
            }
            Ok(items.into_iter().cloned().collect())
        };

        Ok(Self {
            outfits: pick(Category::Outfit)?,
            emotes: pick(Category::Emote)?,
            melees: pick(Category::Melee)?,
        })
    }

    pub fn items(&self, category: Category) -> &[String] {
        match category {
            Category::Outfit => &self.outfits,
            Category::Emote => &self.emotes,
            Category::Melee => &self.melees,
        }
    }

    /// A random emote.
    pub fn random_emote<R: Rng>(&self, rng: &mut R) -> String {
        choose(&self.emotes, rng)
    }

    /// A full set of random emote slots.
    pub fn random_emotes<R: Rng>(&self, rng: &mut R) -> Vec<String> {
        (0..LOADOUT_EMOTE_SLOTS).map(|_| self.random_emote(rng)).collect()
    }

    /// A random melee and outfit with the default heal and boost.
    pub fn random_loadout<R: Rng>(&self, rng: &mut R, emotes: Vec<String>) -> Loadout {
        Loadout {
            melee: choose(&self.melees, rng),
            outfit: choose(&self.outfits, rng),
            heal: DEFAULT_HEAL.to_string(),
            boost: DEFAULT_BOOST.to_string(),
            emotes,
        }
    }
}

/// Uniform pick. Catalog categories are never empty.
fn choose<R: Rng>(items: &[String], rng: &mut R) -> String {
    items[rng.random_range(0..items.len())].clone()
}

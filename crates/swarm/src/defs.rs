//! Built-in item definition tables.
//!
//! Only the identifiers matter to the swarm; the game server owns the real
//! item stats.

use std::fmt;

/// Item categories a loadout draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Outfit,
    Emote,
    Melee,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Outfit, Category::Emote, Category::Melee];

    pub fn name(self) -> &'static str {
        match self {
            Category::Outfit => "outfit",
            Category::Emote => "emote",
            Category::Melee => "melee",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const OUTFITS: &[&str] = &[
    "outfitBase",
    "outfitTurkey",
    "outfitDev",
    "outfitMod",
    "outfitWheat",
    "outfitNoir",
    "outfitRedLeaderAged",
    "outfitBlueLeaderAged",
    "outfitSpetsnaz",
    "outfitLumber",
    "outfitVerde",
    "outfitWoodland",
    "outfitRoyalFortune",
    "outfitKeyLime",
    "outfitCobaltShell",
    "outfitCarbonFiber",
    "outfitDarkGloves",
    "outfitDarkShirt",
    "outfitGhillie",
    "outfitCamo",
];

const EMOTES: &[&str] = &[
    "emote_happyface",
    "emote_thumbsup",
    "emote_surviv",
    "emote_sadface",
    "emote_question",
    "emote_angryface",
    "emote_cooldude",
    "emote_doge",
    "emote_picassoface",
    "emote_rainbow",
    "emote_flagus",
    "emote_flagca",
    "emote_ok",
    "emote_pooface",
    "emote_teabag",
    "emote_ping_danger",
];

const MELEES: &[&str] = &[
    "fists",
    "knuckles",
    "karambit",
    "bayonet",
    "huntsman",
    "bowie",
    "machete",
    "woodaxe",
    "fireaxe",
    "hook",
    "pan",
    "spade",
    "crowbar",
];

const DEFAULT_UNLOCKS: &[&str] = &[
    "outfitBase",
    "outfitWheat",
    "outfitNoir",
    "outfitKeyLime",
    "outfitCarbonFiber",
    "outfitDarkShirt",
    "fists",
    "knuckles",
    "karambit",
    "bayonet",
    "woodaxe",
    "emote_happyface",
    "emote_thumbsup",
    "emote_surviv",
    "emote_sadface",
    "emote_question",
    "emote_angryface",
    "emote_cooldude",
    "emote_doge",
    "emote_picassoface",
    "emote_rainbow",
    "heal_basic",
    "boost_basic",
    "player_icon_default",
    "crosshair_default",
];

/// Declared item identifiers per category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDefs {
    outfits: Vec<String>,
    emotes: Vec<String>,
    melees: Vec<String>,
}

impl GameDefs {
    pub fn new(outfits: Vec<String>, emotes: Vec<String>, melees: Vec<String>) -> Self {
        Self {
            outfits,
            emotes,
            melees,
        }
    }

    pub fn items(&self, category: Category) -> &[String] {
        match category {
            Category::Outfit => &self.outfits,
            Category::Emote => &self.emotes,
            Category::Melee => &self.melees,
        }
    }

    /// Replace the table of one category.
    pub fn set(&mut self, category: Category, items: Vec<String>) {
        match category {
            Category::Outfit => self.outfits = items,
            Category::Emote => self.emotes = items,
            Category::Melee => self.melees = items,
        }
    }
}

impl Default for GameDefs {
    fn default() -> Self {
        Self::new(owned(OUTFITS), owned(EMOTES), owned(MELEES))
    }
}

/// Items every account starts with.
pub fn default_unlocks() -> Vec<String> {
    owned(DEFAULT_UNLOCKS)
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

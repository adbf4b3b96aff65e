//! Swarm configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::defs::{Category, GameDefs};

/// Config file used when neither `--config` nor `SWARM_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "swarm.toml";

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tick_interval_ms must be greater than zero")]
    ZeroTickInterval,

    #[error("{name} must be within [0, 1], got {value}")]
    ChanceOutOfRange { name: &'static str, value: f64 },

    #[error("max_angular_speed must be finite and non-negative, got {0}")]
    InvalidAngularSpeed(f32),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub matchmaking: MatchmakingConfig,
    #[serde(default)]
    pub swarm: SwarmConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl Config {
    /// Path of the config file: `SWARM_CONFIG` if set, else `swarm.toml`.
    pub fn default_path() -> PathBuf {
        std::env::var("SWARM_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from the default path or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path`, writing the defaults there if the file
    /// does not exist yet.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        Self::validate(&config)?;
        Ok(config)
    }

    /// Reject values the swarm cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.swarm.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        let chances = [
            ("refresh_chance", self.input.refresh_chance),
            ("shoot_chance", self.input.shoot_chance),
            ("interact_chance", self.input.interact_chance),
            ("emote_chance", self.input.emote_chance),
        ];
        for (name, value) in chances {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ChanceOutOfRange { name, value });
            }
        }
        let speed = self.input.max_angular_speed;
        if !speed.is_finite() || speed < 0.0 {
            return Err(ConfigError::InvalidAngularSpeed(speed));
        }
        Ok(())
    }
}

/// Where and what to ask the matchmaker for.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchmakingConfig {
    /// Base address of the game's HTTP API.
    #[serde(default = "default_address")]
    pub address: String,
    /// Region tag sent with every find-game request.
    #[serde(default = "default_region")]
    pub region: String,
    /// Index of the game mode to join.
    #[serde(default)]
    pub game_mode_idx: u8,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            region: default_region(),
            game_mode_idx: 0,
        }
    }
}

fn default_address() -> String {
    "http://127.0.0.1:8001".to_string()
}
fn default_region() -> String {
    "local".to_string()
}

/// Spawn schedule and tick settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwarmConfig {
    /// Number of bots to spawn.
    #[serde(default = "default_bot_count")]
    pub bot_count: u32,
    /// Delay between consecutive spawns in milliseconds.
    #[serde(default = "default_join_delay")]
    pub join_delay_ms: u64,
    /// Input tick interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Retire sessions the server never acknowledged after this many
    /// milliseconds (0 = wait forever).
    #[serde(default)]
    pub join_timeout_ms: u64,
}

impl SwarmConfig {
    pub fn join_delay(&self) -> Duration {
        Duration::from_millis(self.join_delay_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn join_timeout(&self) -> Option<Duration> {
        (self.join_timeout_ms > 0).then(|| Duration::from_millis(self.join_timeout_ms))
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            bot_count: default_bot_count(),
            join_delay_ms: default_join_delay(),
            tick_interval_ms: default_tick_interval(),
            join_timeout_ms: 0,
        }
    }
}

fn default_bot_count() -> u32 {
    79
}
fn default_join_delay() -> u64 {
    100
}
fn default_tick_interval() -> u64 {
    30
}

/// Randomized input behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// Chance per tick that a bot picks a new intent.
    #[serde(default = "default_refresh_chance")]
    pub refresh_chance: f64,
    #[serde(default = "default_half")]
    pub shoot_chance: f64,
    #[serde(default = "default_half")]
    pub interact_chance: f64,
    #[serde(default = "default_half")]
    pub emote_chance: f64,
    /// Aim distance sent with every input.
    #[serde(default = "default_to_mouse_len")]
    pub to_mouse_len: f32,
    /// Upper bound (radians per tick) of each bot's aim rotation speed.
    #[serde(default = "default_max_angular_speed")]
    pub max_angular_speed: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            refresh_chance: default_refresh_chance(),
            shoot_chance: default_half(),
            interact_chance: default_half(),
            emote_chance: default_half(),
            to_mouse_len: default_to_mouse_len(),
            max_angular_speed: default_max_angular_speed(),
        }
    }
}

fn default_refresh_chance() -> f64 {
    0.02
}
fn default_half() -> f64 {
    0.5
}
fn default_to_mouse_len() -> f32 {
    50.0
}
fn default_max_angular_speed() -> f32 {
    0.1
}

/// Overrides for the built-in item tables. Missing entries keep the
/// built-in values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outfits: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub melees: Option<Vec<String>>,
    /// Items every bot owns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocks: Option<Vec<String>>,
}

impl CatalogConfig {
    /// Built-in definition tables with this section's overrides applied.
    pub fn defs(&self) -> GameDefs {
        let mut defs = GameDefs::default();
        for (category, items) in [
            (Category::Outfit, &self.outfits),
            (Category::Emote, &self.emotes),
            (Category::Melee, &self.melees),
        ] {
            if let Some(items) = items {
                defs.set(category, items.clone());
            }
        }
        defs
    }

    /// The unlock list, falling back to the built-in default unlocks.
    pub fn unlocks(&self) -> Vec<String> {
        self.unlocks.clone().unwrap_or_else(crate::defs::default_unlocks)
    }
}

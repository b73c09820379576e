//! Unified configuration schema.
//!
//! One YAML file drives the engine, the bot pacing, the lobby and logging. Every
//! section has defaults, so a partial (or empty) document is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Dice source.
    #[serde(default)]
    pub chance: ChanceConfig,
    /// Computer-player pacing.
    #[serde(default)]
    pub bot: BotConfig,
    /// Lobby / session store settings.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Event log settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChanceKind {
    /// Seeded (or entropy-seeded) PRNG.
    #[default]
    Rng,
    /// Event-keyed stream; requires nothing but a seed and replays exactly.
    Deterministic,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ChanceConfig {
    #[serde(default)]
    pub mode: ChanceKind,
    /// If None in `rng` mode, the PRNG is seeded from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Delays before a computer player acts, in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BotConfig {
    #[serde(default = "default_roll_delay_ms")]
    pub roll_delay_ms: u64,
    #[serde(default = "default_move_delay_ms")]
    pub move_delay_ms: u64,
    #[serde(default = "default_defense_delay_ms")]
    pub defense_delay_ms: u64,
}

fn default_roll_delay_ms() -> u64 {
    1500
}

fn default_move_delay_ms() -> u64 {
    1500
}

fn default_defense_delay_ms() -> u64 {
    1000
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            roll_delay_ms: default_roll_delay_ms(),
            move_delay_ms: default_move_delay_ms(),
            defense_delay_ms: default_defense_delay_ms(),
        }
    }
}

impl BotConfig {
    /// No pacing at all; used for simulations.
    pub fn instant() -> Self {
        Self {
            roll_delay_ms: 0,
            move_delay_ms: 0,
            defense_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Length of generated session codes.
    #[serde(default = "default_code_len")]
    pub code_len: usize,
    /// Upper bound on waiting for avatar generation before starting anyway.
    #[serde(default = "default_avatar_timeout_ms")]
    pub avatar_timeout_ms: u64,
}

fn default_code_len() -> usize {
    6
}

fn default_avatar_timeout_ms() -> u64 {
    3000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            code_len: default_code_len(),
            avatar_timeout_ms: default_avatar_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// NDJSON game event log; disabled if None.
    #[serde(default)]
    pub events_path: Option<String>,
    /// `0` disables periodic flushing.
    #[serde(default)]
    pub flush_every_lines: u64,
    /// Same effect as `LUDO_DEBUG_LOG=1`.
    #[serde(default)]
    pub debug_log: bool,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }
}

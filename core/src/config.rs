use serde::{Deserialize, Serialize};

use crate::memory::MemoryConfig;
use crate::minefield::MinefieldConfig;
use crate::snake::SnakeConfig;
use crate::ConfigError;
use minigames_protocol::LEADERBOARD_LIMIT;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Period of the elapsed-time refresh.
    pub clock_tick_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            clock_tick_ms: 1000,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    pub limit: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            limit: LEADERBOARD_LIMIT,
        }
    }
}

/// Settings for all three games, every key is optional in TOML.
///
/// ```toml
/// [minefield]
/// size = [16, 16]
/// mines = 40
///
/// [snake]
/// base_interval_ms = 250
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcadeConfig {
    pub memory: MemoryConfig,
    pub minefield: MinefieldConfig,
    pub snake: SnakeConfig,
    pub session: SessionConfig,
    pub leaderboard: LeaderboardConfig,
}

impl ArcadeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.memory.validate()?;
        self.minefield.validate()?;
        self.snake.validate()?;
        Ok(())
    }
}

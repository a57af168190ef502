//! Rule constants and the runtime configuration loaded at startup.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::common::ConfigError;

pub const BOARD_ROWS: usize = 5;
pub const BOARD_COLS: usize = 10;
pub const NUM_CELLS: usize = BOARD_ROWS * BOARD_COLS;
pub const NUM_SHIPS: usize = 5;
pub const SHIP_SIZES: [usize; NUM_SHIPS] = [5, 4, 3, 3, 2];

/// Total number of ship segments in a complete fleet.
pub const TOTAL_SHIP_CELLS: usize = 5 + 4 + 3 + 3 + 2;

/// Bonus awarded once for each enemy ship sunk, unless overridden in config.
pub const DEFAULT_SUNK_BONUS: i64 = 50;

/// Everything a team client needs to reach the bus and speak the protocol.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Broker address, `host:port`.
    pub broker: String,
    pub client_id: String,
    pub topics: Topics,
    pub keywords: Keywords,
    pub scores: Scores,
    #[serde(default)]
    pub timing: Timing,
}

/// Topic names used by this team.
#[derive(Debug, Clone, Deserialize)]
pub struct Topics {
    pub liveness: String,
    pub play_flow: String,
    /// Topic our game-data traffic arrives on.
    pub game_data: String,
    pub enemy_team: String,
    pub enemy_team_tablet: String,
    pub led: String,
}

/// Literal keyword strings for lifecycle and puzzle messages.
#[derive(Debug, Clone, Deserialize)]
pub struct Keywords {
    pub reset: String,
    pub start_intro: String,
    pub skip: String,
    pub game_start: String,
    pub shield_puzzle: String,
    pub strategic_puzzle: String,
    pub fix_parts_puzzle: String,
    pub ship_placed: String,
    pub team_ready: String,
    pub alive: String,
    #[serde(default = "default_win")]
    pub win: String,
    #[serde(default = "default_lose")]
    pub lose: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Scores {
    /// Points reported to the attacker for each destroyed ship part.
    pub attack: i64,
    #[serde(default = "default_sunk_bonus")]
    pub sunk_bonus: i64,
}

/// Timer settings, all in milliseconds on the wire.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub placement_window_ms: u64,
    pub match_duration_ticks: u32,
    pub clock_tick_ms: u64,
    pub liveness_interval_ms: u64,
    pub liveness_retry_ms: u64,
    pub reveal_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            placement_window_ms: 25_000,
            match_duration_ticks: 300,
            clock_tick_ms: 1_000,
            liveness_interval_ms: 10_000,
            liveness_retry_ms: 5_000,
            reveal_ms: 3_000,
        }
    }
}

impl Timing {
    pub fn placement_window(&self) -> Duration {
        Duration::from_millis(self.placement_window_ms)
    }

    pub fn clock_tick(&self) -> Duration {
        Duration::from_millis(self.clock_tick_ms)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_interval_ms)
    }

    pub fn liveness_retry(&self) -> Duration {
        Duration::from_millis(self.liveness_retry_ms)
    }

    pub fn reveal(&self) -> Duration {
        Duration::from_millis(self.reveal_ms)
    }
}

fn default_win() -> String {
    "Win".to_string()
}

fn default_lose() -> String {
    "Lose".to_string()
}

fn default_sunk_bonus() -> i64 {
    DEFAULT_SUNK_BONUS
}

impl AppConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs that would make inbound routing ambiguous or silent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.trim().is_empty() {
            return Err(ConfigError::Invalid("broker address is empty".into()));
        }
        let topics = [
            ("liveness", &self.topics.liveness),
            ("play_flow", &self.topics.play_flow),
            ("game_data", &self.topics.game_data),
            ("enemy_team", &self.topics.enemy_team),
            ("enemy_team_tablet", &self.topics.enemy_team_tablet),
            ("led", &self.topics.led),
        ];
        for (name, value) in topics {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("topic `{name}` is empty")));
            }
        }
        if self.topics.play_flow == self.topics.game_data {
            return Err(ConfigError::Invalid(
                "play_flow and game_data topics must differ".into(),
            ));
        }
        let k = &self.keywords;
        let keywords = [
            ("reset", &k.reset),
            ("start_intro", &k.start_intro),
            ("skip", &k.skip),
            ("game_start", &k.game_start),
            ("shield_puzzle", &k.shield_puzzle),
            ("strategic_puzzle", &k.strategic_puzzle),
            ("fix_parts_puzzle", &k.fix_parts_puzzle),
            ("ship_placed", &k.ship_placed),
            ("team_ready", &k.team_ready),
            ("alive", &k.alive),
            ("win", &k.win),
            ("lose", &k.lose),
        ];
        for (name, value) in keywords {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("keyword `{name}` is empty")));
            }
        }
        let t = &self.timing;
        if t.placement_window_ms == 0
            || t.clock_tick_ms == 0
            || t.liveness_interval_ms == 0
            || t.liveness_retry_ms == 0
        {
            return Err(ConfigError::Invalid("timer periods must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        broker: "127.0.0.1:1883".into(),
        client_id: "blue".into(),
        topics: Topics {
            liveness: "blue/alive".into(),
            play_flow: "blue/flow".into(),
            game_data: "blue/data".into(),
            enemy_team: "red/data".into(),
            enemy_team_tablet: "red/tablet".into(),
            led: "blue/led".into(),
        },
        keywords: Keywords {
            reset: "ACTION,reset@".into(),
            start_intro: "run".into(),
            skip: "skip".into(),
            game_start: "start".into(),
            shield_puzzle: "shield".into(),
            strategic_puzzle: "spy".into(),
            fix_parts_puzzle: "fix".into(),
            ship_placed: "placed".into(),
            team_ready: "ready".into(),
            alive: "alive".into(),
            win: "Win".into(),
            lose: "Lose".into(),
        },
        scores: Scores {
            attack: 10,
            sunk_bonus: DEFAULT_SUNK_BONUS,
        },
        timing: Timing::default(),
    }
}

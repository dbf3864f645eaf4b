//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/tactician/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/tactician/` (~/.config/tactician/)
//! - Data: `$XDG_DATA_HOME/tactician/` (~/.local/share/tactician/)
//! - State/Logs: `$XDG_STATE_HOME/tactician/` (~/.local/state/tactician/)

use crate::error::{Error, Result};
use crate::progress::SuccessMode;
use crate::types::PuzzleType;
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// File locations (all optional, XDG defaults otherwise)
    #[serde(default)]
    pub paths: PathsConfig,

    /// Puzzle trainer behavior
    #[serde(default)]
    pub trainer: TrainerConfig,

    /// Which catalog puzzles are eligible for random selection
    #[serde(default)]
    pub filter: FilterConfig,

    /// Endgame backend configuration
    #[serde(default)]
    pub endgame: EndgameConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Path overrides
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PathsConfig {
    /// Gathered puzzle catalog (JSON)
    pub catalog: Option<PathBuf>,
    /// Directory of puzzle PGN files used by `gather`
    pub puzzles: Option<PathBuf>,
    /// Key-value store database
    pub store: Option<PathBuf>,
}

/// Puzzle trainer configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TrainerConfig {
    /// Show the setup move instantly instead of animating it after a delay
    #[serde(default = "default_true")]
    pub hide_first_move: bool,

    /// Load another puzzle automatically after solving one
    #[serde(default = "default_true")]
    pub keep_playing: bool,

    /// Feedback delay in milliseconds
    #[serde(default = "default_trainer_delay")]
    pub delay_ms: u64,

    /// Score success rate by moves instead of whole puzzles
    #[serde(default)]
    pub count_moves_instead_of_puzzles: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            hide_first_move: true,
            keep_playing: true,
            delay_ms: default_trainer_delay(),
            count_moves_instead_of_puzzles: false,
        }
    }
}

impl TrainerConfig {
    /// Success-rate scoring mode selected by this configuration
    pub fn success_mode(&self) -> SuccessMode {
        if self.count_moves_instead_of_puzzles {
            SuccessMode::Moves
        } else {
            SuccessMode::Puzzles
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_trainer_delay() -> u64 {
    1000
}

/// Catalog filter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    /// Enabled puzzle themes
    #[serde(default = "default_themes")]
    pub themes: Vec<PuzzleType>,

    /// Skip puzzles that already have a progress entry
    #[serde(default)]
    pub only_unsolved: bool,

    #[serde(default = "default_min_moves")]
    pub min_moves: u32,

    #[serde(default = "default_max_moves")]
    pub max_moves: u32,

    #[serde(default)]
    pub min_hardness: f64,

    #[serde(default = "default_max_hardness")]
    pub max_hardness: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            themes: default_themes(),
            only_unsolved: false,
            min_moves: default_min_moves(),
            max_moves: default_max_moves(),
            min_hardness: 0.0,
            max_hardness: default_max_hardness(),
        }
    }
}

fn default_themes() -> Vec<PuzzleType> {
    PuzzleType::THEMES.to_vec()
}

fn default_min_moves() -> u32 {
    1
}

fn default_max_moves() -> u32 {
    99
}

fn default_max_hardness() -> f64 {
    1.0
}

/// Endgame backend configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EndgameConfig {
    /// Move service URL (e.g., `http://localhost:5000`)
    pub server_url: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_endgame_timeout")]
    pub timeout_secs: u64,

    /// Delay before the opponent's reply is shown, in milliseconds
    #[serde(default = "default_endgame_delay")]
    pub delay_ms: u64,

    /// Opponent strength in `[0, 1]`; 1 plays perfectly
    #[serde(default = "default_difficulty")]
    pub difficulty: f64,
}

impl Default for EndgameConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            timeout_secs: default_endgame_timeout(),
            delay_ms: default_endgame_delay(),
            difficulty: default_difficulty(),
        }
    }
}

impl EndgameConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_none() {
            return Err(Error::Config(
                "endgame.server_url is required to play endgames".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.difficulty) {
            return Err(Error::Config(
                "endgame.difficulty must be between 0 and 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "endgame.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_endgame_timeout() -> u64 {
    30
}

fn default_endgame_delay() -> u64 {
    500
}

fn default_difficulty() -> f64 {
    1.0
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/tactician/config.toml` (~/.config/tactician/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("tactician").join("config.toml")
    }

    /// Returns the data directory path (store and gathered catalog)
    ///
    /// `$XDG_DATA_HOME/tactician/` (~/.local/share/tactician/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("tactician")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/tactician/` (~/.local/state/tactician/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("tactician")
    }

    /// Returns the key-value store path, honoring `paths.store`
    ///
    /// `$XDG_DATA_HOME/tactician/store.db` by default
    pub fn store_path(&self) -> PathBuf {
        self.paths
            .store
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("store.db"))
    }

    /// Returns the gathered catalog path, honoring `paths.catalog`
    ///
    /// `$XDG_DATA_HOME/tactician/puzzles.json` by default
    pub fn catalog_path(&self) -> PathBuf {
        self.paths
            .catalog
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("puzzles.json"))
    }

    /// Returns the puzzle PGN directory, honoring `paths.puzzles`
    ///
    /// `$XDG_DATA_HOME/tactician/puzzles/` by default
    pub fn puzzles_dir(&self) -> PathBuf {
        self.paths
            .puzzles
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("puzzles"))
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/tactician/tactician.log` (~/.local/state/tactician/tactician.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("tactician.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.trainer.hide_first_move);
        assert!(config.trainer.keep_playing);
        assert_eq!(config.trainer.delay_ms, 1000);
        assert_eq!(config.trainer.success_mode(), SuccessMode::Puzzles);
        assert_eq!(config.filter.themes.len(), PuzzleType::THEMES.len());
        assert!(config.endgame.server_url.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[trainer]
hide_first_move = false
delay_ms = 250
count_moves_instead_of_puzzles = true

[filter]
themes = ["checkmate", "mating net"]
only_unsolved = true
max_moves = 4
min_hardness = 0.5

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert!(!config.trainer.hide_first_move);
        assert!(config.trainer.keep_playing);
        assert_eq!(config.trainer.delay_ms, 250);
        assert_eq!(config.trainer.success_mode(), SuccessMode::Moves);
        assert_eq!(
            config.filter.themes,
            vec![PuzzleType::Checkmate, PuzzleType::MatingNet]
        );
        assert!(config.filter.only_unsolved);
        assert_eq!(config.filter.min_moves, 1);
        assert_eq!(config.filter.max_moves, 4);
        assert_eq!(config.filter.min_hardness, 0.5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_endgame_config_validation() {
        // Missing server is invalid
        let config = EndgameConfig::default();
        assert!(config.validate().is_err());

        let config = EndgameConfig {
            server_url: Some("http://localhost:5000".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = EndgameConfig {
            server_url: Some("http://localhost:5000".to_string()),
            difficulty: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_paths_override() {
        let toml = r#"
[paths]
catalog = "/tmp/catalog.json"
store = "/tmp/store.db"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.catalog_path(), PathBuf::from("/tmp/catalog.json"));
        assert_eq!(config.store_path(), PathBuf::from("/tmp/store.db"));
        assert!(config.puzzles_dir().ends_with("tactician/puzzles"));
    }
}

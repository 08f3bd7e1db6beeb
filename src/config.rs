//! CLI configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via MEALY_CONFIG or --config)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Execution defaults.
    pub run: RunConfig,
    /// Interactive shell settings.
    pub repl: ReplConfig,
}

impl Config {
    /// Loads configuration from `path` (or MEALY_CONFIG), then applies
    /// environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match std::env::var("MEALY_CONFIG") {
                Ok(path) => Self::from_file(&path)?,
                Err(_) => Self::default(),
            },
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.run.apply_env_overrides();
        self.repl.apply_env_overrides();
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Execution defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Record the traceback of visited states.
    pub history: bool,
    /// Skip unparseable lines instead of failing.
    pub lenient: bool,
    /// Maximum steps shown by the `step` command (0 = unlimited).
    pub max_steps: usize,
}

impl RunConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(history) = std::env::var("MEALY_HISTORY") {
            self.history = parse_flag(&history);
        }

        if let Ok(lenient) = std::env::var("MEALY_LENIENT") {
            self.lenient = parse_flag(&lenient);
        }

        if let Ok(max) = std::env::var("MEALY_MAX_STEPS") {
            if let Ok(n) = max.parse() {
                self.max_steps = n;
            }
        }
    }

    /// Returns true if `steps` has reached the configured cap.
    pub fn step_limit_reached(&self, steps: usize) -> bool {
        self.max_steps != 0 && steps >= self.max_steps
    }
}

/// Interactive shell settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplConfig {
    /// Line-editor history file.
    pub history_file: PathBuf,
    /// Colorize output.
    pub color: bool,
}

impl Default for ReplConfig {
    fn default() -> Self {
        let history_file = home::home_dir()
            .map(|h| h.join(".mealy_history"))
            .unwrap_or_else(|| PathBuf::from(".mealy_history"));
        Self {
            history_file,
            color: true,
        }
    }
}

impl ReplConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("MEALY_REPL_HISTORY") {
            self.history_file = PathBuf::from(path);
        }

        if let Ok(color) = std::env::var("MEALY_COLOR") {
            self.color = parse_flag(&color);
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.to_lowercase() == "true"
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.run.history);
        assert!(!config.run.lenient);
        assert_eq!(config.run.max_steps, 0);
        assert!(config.repl.color);
        assert!(config.repl.history_file.ends_with(".mealy_history"));
    }

    #[test]
    fn test_step_limit() {
        let mut run = RunConfig::default();
        assert!(!run.step_limit_reached(1_000_000));

        run.max_steps = 3;
        assert!(!run.step_limit_reached(2));
        assert!(run.step_limit_reached(3));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("yes"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mealy.yaml");
        std::fs::write(&path, "run:\n  history: true\n  max_steps: 10\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(config.run.history);
        assert!(!config.run.lenient);
        assert_eq!(config.run.max_steps, 10);
        assert_eq!(config.repl, ReplConfig::default());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mealy.yaml");

        let mut config = Config::default();
        config.run.lenient = true;
        config.repl.color = false;
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = Config::from_file(dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(ConfigError::IoError(..))));
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "run: [not, a, map]\n").unwrap();

        let result = Config::from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(..))));
    }
}

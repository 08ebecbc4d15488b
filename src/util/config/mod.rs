//! Tickflow configuration
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Environment variables (TICKFLOW_LOG)
//! 3. Explicit config file (--config)
//! 4. User-level (~/.config/tickflow/config.toml)
//! 5. Default values
//! ```
//!
//! # Example
//!
//! ```toml
//! [scheduler]
//! max_frame_depth = 256
//! failure_policy = "abort_tree"
//! time_scale = 1.5
//!
//! [host]
//! tick_interval_ms = 16
//! max_ticks = 600
//! phases = ["late_update", "end_of_frame"]
//!
//! [log]
//! level = "debug"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::runtime::{PhaseId, SchedulerConfig};
use crate::util::logger::LogLevel;

/// Environment variable overriding the log level.
pub const LOG_ENV: &str = "TICKFLOW_LOG";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TickflowConfig {
    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Host loop settings
    #[serde(default)]
    pub host: HostConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Host loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Wall-clock time between ticks
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Give up after this many ticks
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Alternate phases stepped after every ordinary step, in order
    #[serde(default = "default_phases")]
    pub phases: Vec<String>,
}

fn default_tick_interval_ms() -> u64 {
    16
}

fn default_max_ticks() -> u64 {
    10_000
}

fn default_phases() -> Vec<String> {
    vec![
        PhaseId::LATE_UPDATE.as_str().to_string(),
        PhaseId::END_OF_FRAME.as_str().to_string(),
    ]
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: default_max_ticks(),
            phases: default_phases(),
        }
    }
}

impl HostConfig {
    #[inline]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Phase names as ids. Names must be non-empty and not repeated.
    pub fn phase_ids(&self) -> Result<Vec<PhaseId>, ConfigError> {
        let mut ids: Vec<PhaseId> = Vec::with_capacity(self.phases.len());
        for name in &self.phases {
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::InvalidPhase(name.to_string()));
            }
            let id = PhaseId::new(name);
            if ids.contains(&id) {
                return Err(ConfigError::InvalidPhase(name.to_string()));
            }
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LogConfig {
    /// Minimum level printed
    #[serde(default)]
    pub level: LogLevel,
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("tickflow"));
    }

    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("tickflow"));
    }

    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join("tickflow"));
    }

    None
}

/// Get the user config file path (~/.config/tickflow/config.toml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Parse configuration from TOML text.
pub fn from_toml_str(content: &str) -> Result<TickflowConfig, ConfigError> {
    let config: TickflowConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from an explicit file.
pub fn load_config(path: &Path) -> Result<TickflowConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_toml_str(&content)
}

/// Load user-level configuration.
/// Returns default config if the file doesn't exist.
pub fn load_user_config() -> Result<TickflowConfig, ConfigError> {
    match get_config_path() {
        Some(path) if path.exists() => load_config(&path),
        _ => Ok(TickflowConfig::default()),
    }
}

impl TickflowConfig {
    /// Apply environment overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(level) = std::env::var(LOG_ENV) {
            self.log.level = level
                .parse()
                .map_err(|_| ConfigError::InvalidEnv(LOG_ENV, level))?;
        }
        Ok(())
    }

    /// Check values that deserialization alone cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.max_frame_depth == 0 {
            return Err(ConfigError::InvalidValue(
                "scheduler.max_frame_depth must be at least 1".to_string(),
            ));
        }
        let scale = self.scheduler.time_scale;
        if !scale.is_finite() || scale < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "scheduler.time_scale must be finite and >= 0, got {}",
                scale
            )));
        }
        self.host.phase_ids()?;
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("Invalid phase name in host.phases: {0:?}")]
    InvalidPhase(String),

    #[error("Invalid value for {0}: {1:?}")]
    InvalidEnv(&'static str, String),
}

//! Engine configuration.
//!
//! Typed settings for the controller gateway, emulator gateway, topology
//! bounds, and the stats monitor, loaded from a YAML file with sensible
//! defaults for a local controller + emulator deployment.

use color_eyre::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use crate::topology::{SizeBounds, TopologyKind};

/// Controller gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Base URL of the controller's REST API
    pub base_url: String,
    /// Bound on every controller request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Emulator gateway settings.
///
/// `command` is the argv prefix of the emulator worker process; the
/// topology spec file path is appended when a session starts.
/// `cleanup_command` runs after every teardown, best effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub command: Vec<String>,
    pub cleanup_command: Vec<String>,
    /// Bound on the worker reporting READY after a build
    #[serde(with = "humantime_serde")]
    pub startup_timeout: Duration,
    /// Bound on a single connectivity probe
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
    /// Directory for per-session topology spec files
    pub scratch_dir: String,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            command: vec!["mn-session".to_string()],
            cleanup_command: vec!["mn".to_string(), "-c".to_string()],
            startup_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(60),
            scratch_dir: "/tmp/sdnviz".to_string(),
        }
    }
}

/// Topology request bounds and defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub min_size: u32,
    pub max_size: u32,
    pub default_kind: TopologyKind,
    pub default_size: u32,
    /// Grace period after emulator start for switches to register with
    /// the controller
    #[serde(with = "humantime_serde")]
    pub settle_wait: Duration,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            min_size: 2,
            max_size: 20,
            default_kind: TopologyKind::Star,
            default_size: 4,
            settle_wait: Duration::from_secs(3),
        }
    }
}

impl TopologyConfig {
    pub fn bounds(&self) -> SizeBounds {
        SizeBounds {
            min: self.min_size,
            max: self.max_size,
        }
    }
}

/// Stats monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Interval between stat polls while a network is running
    #[serde(with = "humantime_serde")]
    pub update_interval: Duration,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(2),
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub controller: ControllerConfig,
    pub emulator: EmulatorConfig,
    pub topology: TopologyConfig,
    pub stats: StatsConfig,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid controller configuration: {0}")]
    InvalidController(String),
    #[error("Invalid emulator configuration: {0}")]
    InvalidEmulator(String),
    #[error("Invalid topology configuration: {0}")]
    InvalidTopology(String),
    #[error("Invalid stats configuration: {0}")]
    InvalidStats(String),
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.controller.base_url.is_empty() {
            return Err(ValidationError::InvalidController(
                "base_url cannot be empty".to_string(),
            ));
        }
        if self.controller.request_timeout.is_zero() {
            return Err(ValidationError::InvalidController(
                "request_timeout must be positive".to_string(),
            ));
        }

        if self.emulator.command.is_empty() {
            return Err(ValidationError::InvalidEmulator(
                "command cannot be empty".to_string(),
            ));
        }
        if self.emulator.startup_timeout.is_zero() || self.emulator.probe_timeout.is_zero() {
            return Err(ValidationError::InvalidEmulator(
                "timeouts must be positive".to_string(),
            ));
        }

        if self.topology.min_size == 0 {
            return Err(ValidationError::InvalidTopology(
                "min_size must be a positive integer".to_string(),
            ));
        }
        if self.topology.min_size > self.topology.max_size {
            return Err(ValidationError::InvalidTopology(format!(
                "min_size {} exceeds max_size {}",
                self.topology.min_size, self.topology.max_size
            )));
        }
        if self.topology.default_size < self.topology.min_size
            || self.topology.default_size > self.topology.max_size
        {
            return Err(ValidationError::InvalidTopology(format!(
                "default_size {} outside bounds {}-{}",
                self.topology.default_size, self.topology.min_size, self.topology.max_size
            )));
        }

        if self.stats.update_interval.is_zero() {
            return Err(ValidationError::InvalidStats(
                "update_interval must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)?;
    let config: Config = serde_yaml::from_reader(file)?;

    config.validate()?;

    Ok(config)
}

//! Configuration module for the relay firmware
//!
//! Device configuration is a TOML file with one table per concern:
//!
//! ```toml
//! [sampling]
//! sample_delay_us = 1000
//! batch_capacity = 64
//! init_backoff_ms = 2000
//!
//! [stimulation]
//! enabled = true
//! interval_ms = 1000
//! magnitude = 128
//! channels = [0, 1]
//!
//! [queues]
//! inbound_capacity = 16
//! outbound_capacity = 16
//!
//! [logging]
//! filter = "info,rhs_relay=debug"
//! file = "/var/log/rhs-relay.log"
//! ```
//!
//! Every field has a default, so an empty file (or no file) is valid.
//! Channel count, auxiliary slot count and pipeline depth are properties
//! of the chip and are not configurable.
//!
//! # Location
//!
//! Without an explicit path the binary looks in the platform config dir:
//!
//! - **Linux**: `~/.config/rhs-relay/device.toml`
//! - **macOS**: `~/Library/Application Support/rhs-relay/device.toml`
//! - **Windows**: `%APPDATA%\rhs-relay\device.toml`

use crate::chip::CHANNEL_COUNT;
use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "rhs-relay";

/// Config filename
pub const CONFIG_FILE: &str = "device.toml";

/// Default delay between sampling cycles in microseconds (1 kHz cycle rate)
pub const DEFAULT_SAMPLE_DELAY_US: u64 = 1000;

/// Default number of samples held before a flush
pub const DEFAULT_BATCH_CAPACITY: usize = 64;

/// Default sleep while waiting for the chip to become ready
pub const DEFAULT_INIT_BACKOFF_MS: u64 = 2000;

/// Default time between stimulation sequencer ticks
pub const DEFAULT_STIM_INTERVAL_MS: u64 = 1000;

/// Default positive current magnitude programmed every tick
pub const DEFAULT_STIM_MAGNITUDE: u8 = 128;

/// Auxiliary slots available for stimulation magnitude writes
pub const MAX_STIM_CHANNELS: usize = 2;

/// Default capacity of both thread-boundary queues
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Default log filter when neither the config nor `RUST_LOG` sets one
pub const DEFAULT_LOG_FILTER: &str = "info,rhs_relay=debug";

/// Path of the default config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

// ==================== Device Config ====================

/// Complete device configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Sampling loop settings
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Stimulation sequencer settings
    #[serde(default)]
    pub stimulation: StimulationConfig,

    /// Thread-boundary queue sizes
    #[serde(default)]
    pub queues: QueueConfig,

    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DeviceConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        let config = Self::from_toml(&content)
            .map_err(|e| e.with_context(format!("Config file {:?}", path)))?;
        Ok(config)
    }

    /// Load a config file, returning defaults if any error occurs
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| RelayError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RelayError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| RelayError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            RelayError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Check values the firmware cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sampling.batch_capacity <= CHANNEL_COUNT {
            return Err(RelayError::Config(format!(
                "batch_capacity must exceed {} so one full cycle fits after the flush threshold (got {})",
                CHANNEL_COUNT, self.sampling.batch_capacity
            )));
        }
        if self.stimulation.interval_ms == 0 {
            return Err(RelayError::Config(
                "stimulation.interval_ms must be at least 1".to_string(),
            ));
        }
        if self.stimulation.channels.len() > MAX_STIM_CHANNELS {
            return Err(RelayError::Config(format!(
                "at most {} stimulation channels are supported (got {})",
                MAX_STIM_CHANNELS,
                self.stimulation.channels.len()
            )));
        }
        if let Some(&ch) = self
            .stimulation
            .channels
            .iter()
            .find(|&&c| c as usize >= CHANNEL_COUNT)
        {
            return Err(RelayError::Config(format!(
                "stimulation channel {} out of range (0..{})",
                ch, CHANNEL_COUNT
            )));
        }
        if self.queues.inbound_capacity == 0 || self.queues.outbound_capacity == 0 {
            return Err(RelayError::Config(
                "queue capacities must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Sampling Config ====================

/// Sampling loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Sleep after each sampling cycle, in microseconds
    pub sample_delay_us: u64,

    /// Maximum samples buffered before a flush is forced
    pub batch_capacity: usize,

    /// Sleep while the chip is not ready, in milliseconds
    pub init_backoff_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_delay_us: DEFAULT_SAMPLE_DELAY_US,
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            init_backoff_ms: DEFAULT_INIT_BACKOFF_MS,
        }
    }
}

impl SamplingConfig {
    /// Sleep after each sampling cycle
    pub fn sample_delay(&self) -> Duration {
        Duration::from_micros(self.sample_delay_us)
    }

    /// Sleep while the chip is not ready
    pub fn init_backoff(&self) -> Duration {
        Duration::from_millis(self.init_backoff_ms)
    }

    /// Fill level that triggers a flush, leaving room for one more cycle
    pub fn flush_threshold(&self) -> usize {
        self.batch_capacity.saturating_sub(CHANNEL_COUNT)
    }
}

// ==================== Stimulation Config ====================

/// Stimulation sequencer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulationConfig {
    /// Whether the sequencer runs at all
    pub enabled: bool,

    /// Minimum time between ticks in milliseconds
    pub interval_ms: u64,

    /// Positive current magnitude reprogrammed every tick
    pub magnitude: u8,

    /// Channels whose magnitude is reprogrammed (at most [`MAX_STIM_CHANNELS`])
    pub channels: Vec<u8>,
}

impl Default for StimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: DEFAULT_STIM_INTERVAL_MS,
            magnitude: DEFAULT_STIM_MAGNITUDE,
            channels: vec![0, 1],
        }
    }
}

impl StimulationConfig {
    /// Minimum time between ticks
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ==================== Queue Config ====================

/// Capacities of the thread-boundary queues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Pending host requests (excess is dropped)
    pub inbound_capacity: usize,

    /// Batches awaiting transmission (excess is dropped)
    pub outbound_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: DEFAULT_QUEUE_CAPACITY,
            outbound_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

// ==================== Logging Config ====================

/// Logging output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub filter: Option<String>,

    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Filter directive to use when `RUST_LOG` is unset
    pub fn filter_or_default(&self) -> &str {
        self.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.sampling.sample_delay_us, 1000);
        assert_eq!(config.sampling.batch_capacity, 64);
        assert_eq!(config.sampling.flush_threshold(), 48);
        assert_eq!(config.stimulation.interval(), Duration::from_secs(1));
        assert_eq!(config.stimulation.magnitude, 128);
        assert_eq!(config.stimulation.channels, vec![0, 1]);
        assert_eq!(config.queues.inbound_capacity, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = DeviceConfig::from_toml("").unwrap();
        assert_eq!(config, DeviceConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = DeviceConfig::from_toml(
            r#"
            [sampling]
            sample_delay_us = 250

            [stimulation]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.sampling.sample_delay_us, 250);
        assert_eq!(config.sampling.batch_capacity, DEFAULT_BATCH_CAPACITY);
        assert!(!config.stimulation.enabled);
        assert_eq!(config.stimulation.interval_ms, DEFAULT_STIM_INTERVAL_MS);
    }

    #[test]
    fn test_rejects_small_batch() {
        let err = DeviceConfig::from_toml("[sampling]\nbatch_capacity = 16\n").unwrap_err();
        assert!(err.to_string().contains("batch_capacity"));
    }

    #[test]
    fn test_rejects_out_of_range_stim_channel() {
        let err = DeviceConfig::from_toml("[stimulation]\nchannels = [0, 16]\n").unwrap_err();
        assert!(err.to_string().contains("16"));
    }

    #[test]
    fn test_rejects_too_many_stim_channels() {
        let err = DeviceConfig::from_toml("[stimulation]\nchannels = [0, 1, 2]\n").unwrap_err();
        assert!(err.to_string().contains("at most 2"));
    }

    #[test]
    fn test_rejects_unparseable() {
        assert!(DeviceConfig::from_toml("[sampling\n").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = DeviceConfig::default();
        config.sampling.batch_capacity = 128;
        config.logging.filter = Some("debug".to_string());
        config.save(&path).unwrap();

        let loaded = DeviceConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeviceConfig::load_or_default(dir.path().join("missing.toml"));
        assert_eq!(config, DeviceConfig::default());
    }

    #[test]
    fn test_log_filter_default() {
        assert_eq!(LoggingConfig::default().filter_or_default(), DEFAULT_LOG_FILTER);
    }
}

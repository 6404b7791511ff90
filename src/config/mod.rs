//! Configuration management for surface-rt
//!
//! Handles loading, parsing, and hot-reloading of YAML configuration files.

pub mod watcher;

use crate::devices::DeviceKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SurfaceConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub device: DeviceKind,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub bank: BankConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// MIDI port configuration
///
/// Ports are matched by case-insensitive substring; when unset the device
/// profile's own port pattern is used.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MidiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_port: Option<String>,
}

/// Timing of the flush loop and of time-based input handling (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimingConfig {
    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,
    /// Unchanged output is re-sent once per window
    #[serde(default = "default_keep_alive")]
    pub keep_alive_ms: u64,
    #[serde(default = "default_debounce_recheck")]
    pub debounce_recheck_ms: u64,
    #[serde(default = "default_debounce_timeout")]
    pub debounce_timeout_ms: u64,
    #[serde(default = "default_long_press")]
    pub long_press_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_flush_interval(),
            keep_alive_ms: default_keep_alive(),
            debounce_recheck_ms: default_debounce_recheck(),
            debounce_timeout_ms: default_debounce_timeout(),
            long_press_ms: default_long_press(),
        }
    }
}

/// Parameter paging
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BankConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Normalized change per encoder step
    #[serde(default = "default_knob_step")]
    pub knob_step: f64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            knob_step: default_knob_step(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log filter used when neither `--log-level` nor `RUST_LOG` is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Daily rolling log file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl SurfaceConfig {
    /// Load configuration from file with validation
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: SurfaceConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        for (name, port) in [
            ("input_port", &self.midi.input_port),
            ("output_port", &self.midi.output_port),
        ] {
            if port.as_deref().is_some_and(|p| p.trim().is_empty()) {
                anyhow::bail!("MIDI {} cannot be empty", name);
            }
        }

        let timing = &self.timing;
        if !(1..=1000).contains(&timing.flush_interval_ms) {
            anyhow::bail!(
                "timing.flush_interval_ms must be between 1 and 1000 (got {})",
                timing.flush_interval_ms
            );
        }
        if timing.debounce_recheck_ms == 0 {
            anyhow::bail!("timing.debounce_recheck_ms must be greater than 0");
        }
        if timing.debounce_timeout_ms < timing.debounce_recheck_ms {
            anyhow::bail!(
                "timing.debounce_timeout_ms ({}) must not be shorter than debounce_recheck_ms ({})",
                timing.debounce_timeout_ms,
                timing.debounce_recheck_ms
            );
        }
        if timing.long_press_ms == 0 {
            anyhow::bail!("timing.long_press_ms must be greater than 0");
        }

        if !(1..=64).contains(&self.bank.page_size) {
            anyhow::bail!("bank.page_size must be between 1 and 64 (got {})", self.bank.page_size);
        }
        if !(self.bank.knob_step > 0.0 && self.bank.knob_step <= 1.0) {
            anyhow::bail!("bank.knob_step must be in (0, 1] (got {})", self.bank.knob_step);
        }

        Ok(())
    }

    /// Input port pattern, falling back to the device's own
    pub fn input_pattern(&self) -> String {
        self.midi
            .input_port
            .clone()
            .unwrap_or_else(|| self.device.protocol().port_pattern().to_string())
    }

    /// Output port pattern, falling back to the device's own
    pub fn output_pattern(&self) -> String {
        self.midi
            .output_port
            .clone()
            .unwrap_or_else(|| self.device.protocol().port_pattern().to_string())
    }
}

fn default_flush_interval() -> u64 { 30 }
fn default_keep_alive() -> u64 { crate::control::cache::DEFAULT_KEEP_ALIVE_MS }
fn default_debounce_recheck() -> u64 { crate::debounce::DEFAULT_RECHECK_MS }
fn default_debounce_timeout() -> u64 { crate::debounce::DEFAULT_TIMEOUT_MS }
fn default_long_press() -> u64 { crate::control::buttons::DEFAULT_LONG_PRESS_MS }
fn default_page_size() -> usize { 8 }
fn default_knob_step() -> f64 { 0.01 }

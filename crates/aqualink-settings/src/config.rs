//! Configuration and settings management for AquaLink
//!
//! Provides configuration file handling, defaults and validation.
//! Supports JSON and TOML file formats stored in platform-specific directories.
//!
//! Configuration is organized into logical sections:
//! - Connection timing (startup, connect and reconnect delays)
//! - Telemetry (sampling period, history retention)
//! - Commands (acknowledgment delay)
//! - Device preferences (name, temperature unit)
//! - Alert thresholds per sensor channel

use aqualink_core::{AlertThresholds, CommandParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

/// Directory name under the platform config directory
const APP_DIR: &str = "aqualink";

/// Shortest sampling period the device firmware accepts, in seconds
pub const MIN_SAMPLING_SECS: u64 = 5;
/// Longest sampling period the device firmware accepts, in seconds
pub const MAX_SAMPLING_SECS: u64 = 300;

/// Connection timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Delay before the automatic first connect
    pub startup_delay_ms: u64,
    /// Link-establishment latency
    pub connect_delay_ms: u64,
    /// Backoff before reconnecting
    pub reconnect_delay_ms: u64,
    /// Connect automatically when the service starts
    pub auto_connect: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            startup_delay_ms: 1500,
            connect_delay_ms: 1000,
            reconnect_delay_ms: 2000,
            auto_connect: true,
        }
    }
}

/// Telemetry sampling and retention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Sampling period in milliseconds
    pub interval_ms: u64,
    /// Samples kept per channel in the rolling history
    pub history_capacity: usize,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            history_capacity: 60,
        }
    }
}

/// Command channel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    /// Delay before a command is acknowledged
    pub ack_delay_ms: u64,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self { ack_delay_ms: 500 }
    }
}

/// Temperature display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a reading in °C to this unit
    pub fn convert(&self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    /// Unit symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    /// Lowercase name as sent to the device
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Celsius => "celsius",
            Self::Fahrenheit => "fahrenheit",
        }
    }
}

impl std::fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Celsius => write!(f, "Celsius"),
            Self::Fahrenheit => write!(f, "Fahrenheit"),
        }
    }
}

/// Device preferences pushed with `saveConfig`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Device name
    pub name: String,
    /// Unit used when displaying temperature
    pub temperature_unit: TemperatureUnit,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: "ESP32-ECO-1".to_string(),
            temperature_unit: TemperatureUnit::default(),
        }
    }
}

/// Complete service configuration
///
/// Aggregates all settings sections and provides file I/O operations.
/// Missing sections and keys fall back to their defaults when loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Connection timing
    pub connection: ConnectionSettings,
    /// Telemetry sampling and retention
    pub telemetry: TelemetrySettings,
    /// Command channel
    pub commands: CommandSettings,
    /// Device preferences
    pub device: DeviceSettings,
    /// Alert thresholds
    pub alerts: AlertThresholds,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::of(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load config from file if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    ///
    /// Parent directories are created as needed.
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("connection.startup_delay_ms", self.connection.startup_delay_ms),
            ("connection.connect_delay_ms", self.connection.connect_delay_ms),
            ("connection.reconnect_delay_ms", self.connection.reconnect_delay_ms),
            ("telemetry.interval_ms", self.telemetry.interval_ms),
            ("commands.ack_delay_ms", self.commands.ack_delay_ms),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::ValueOutOfRange {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }

        if self.telemetry.history_capacity == 0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "telemetry.history_capacity".to_string(),
                value: "0".to_string(),
            });
        }

        if self.device.name.trim().is_empty() {
            return Err(ConfigError::MissingValue("device.name".to_string()));
        }

        self.alerts.validate()?;
        Ok(())
    }

    /// Sampling period in whole seconds, as the device expects it
    ///
    /// Clamped to the range the firmware accepts.
    pub fn sampling_interval_secs(&self) -> u64 {
        (self.telemetry.interval_ms / 1000).clamp(MIN_SAMPLING_SECS, MAX_SAMPLING_SECS)
    }

    /// Parameters of the `saveConfig` device command
    pub fn save_command_params(&self) -> CommandParams {
        let mut params = CommandParams::new();
        params.insert(
            "samplingInterval".to_string(),
            Value::from(self.sampling_interval_secs()),
        );
        params.insert(
            "temperatureUnit".to_string(),
            Value::from(self.device.temperature_unit.as_str()),
        );
        params.insert("deviceName".to_string(), Value::from(self.device.name.clone()));
        params
    }
}

/// Platform config file location: `<config dir>/aqualink/config.toml`
pub fn default_config_path() -> SettingsResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join("config.toml"))
        .ok_or_else(|| {
            SettingsError::ConfigDirectory("no configuration directory on this platform".into())
        })
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

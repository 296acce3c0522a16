//! AquaLink Settings Crate
//!
//! Handles the service configuration file: timing, telemetry retention,
//! device preferences and alert thresholds.

pub mod config;
pub mod error;

pub use config::{
    default_config_path, CommandSettings, Config, ConnectionSettings, DeviceSettings,
    TelemetrySettings, TemperatureUnit,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

//! # AquaLink
//!
//! Connectivity and telemetry streaming for AquaLink water-quality sensor
//! devices (temperature, turbidity, pH).
//!
//! ## Architecture
//!
//! AquaLink is organized as a workspace with multiple crates:
//!
//! 1. **aqualink-core** - Errors, typed event bus, data model, telemetry
//!    generator, history window, alerts
//! 2. **aqualink-communication** - Device links and the connectivity service
//! 3. **aqualink-settings** - Configuration file handling and validation
//! 4. **aqualink** - Logging setup, wiring, and the `aqualink` binary
//!
//! A [`Monitor`] is the usual entry point: it builds a
//! [`ConnectivityService`] from a [`Config`] and attaches a rolling
//! [`TelemetryHistory`] and an [`AlertLog`] to its event bus.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use aqualink_communication::{
    ConnectivityConfig, ConnectivityService, DeviceLink, SimulatedLink,
};
pub use aqualink_core::{
    Alert, AlertFilter, AlertLevel, AlertLog, AlertThresholds, Command, CommandParams,
    CommandResult, CommandStatus, ConnectionStatus, DeviceEvent, Error, EventBus, EventKind,
    Result, SensorChannel, SubscriptionId, TelemetryHistory, TelemetrySample, ThreadSafe,
};
pub use aqualink_settings::{default_config_path, Config, SettingsError, TemperatureUnit};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - `RUST_LOG` environment variable support, `info` otherwise
/// - Pretty console output, or one JSON object per line when `json` is set
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(false),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .pretty(),
            )
            .try_init()
    };

    result.map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}

/// Translate the settings file into service timings
pub fn connectivity_config(config: &Config) -> ConnectivityConfig {
    ConnectivityConfig {
        startup_delay: Duration::from_millis(config.connection.startup_delay_ms),
        connect_delay: Duration::from_millis(config.connection.connect_delay_ms),
        reconnect_delay: Duration::from_millis(config.connection.reconnect_delay_ms),
        telemetry_interval: Duration::from_millis(config.telemetry.interval_ms),
        command_ack_delay: Duration::from_millis(config.commands.ack_delay_ms),
        auto_connect: config.connection.auto_connect,
    }
}

/// A connectivity service with history and alerting attached
#[derive(Debug)]
pub struct Monitor {
    service: ConnectivityService,
    history: ThreadSafe<TelemetryHistory>,
    alerts: ThreadSafe<AlertLog>,
}

impl Monitor {
    /// Build a monitor for the given link
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: &Config, link: Arc<dyn DeviceLink>) -> Result<Self> {
        let service = ConnectivityService::new(connectivity_config(config), link)?;
        let (history, _) =
            TelemetryHistory::attach(service.bus(), config.telemetry.history_capacity)?;
        let (alerts, _) = AlertLog::attach(service.bus(), config.alerts);
        Ok(Self {
            service,
            history,
            alerts,
        })
    }

    /// Build a monitor backed by a simulated device named after the config
    pub fn simulated(config: &Config) -> Result<Self> {
        Self::new(config, Arc::new(SimulatedLink::named(config.device.name.clone())))
    }

    /// The underlying service
    pub fn service(&self) -> &ConnectivityService {
        &self.service
    }

    /// Rolling telemetry history
    pub fn history(&self) -> &ThreadSafe<TelemetryHistory> {
        &self.history
    }

    /// Alert log
    pub fn alerts(&self) -> &ThreadSafe<AlertLog> {
        &self.alerts
    }

    /// Snapshot of the session so far
    pub fn summary(&self) -> MonitorSummary {
        let history = self.history.lock();
        let alerts = self.alerts.lock();
        MonitorSummary {
            device: self.service.device_name().to_string(),
            status: self.service.status(),
            samples: history.len(),
            latest: history.latest(),
            alerts: alerts.alerts(AlertFilter::All).len(),
            unacknowledged: alerts.unacknowledged_count(),
        }
    }
}

/// Session totals printed when the binary exits
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSummary {
    /// Device name reported by the link
    pub device: String,
    /// Connection status at the time of the snapshot
    pub status: ConnectionStatus,
    /// Samples currently held per channel
    pub samples: usize,
    /// Most recent sample in the history window
    pub latest: Option<TelemetrySample>,
    /// Alerts raised and not yet removed
    pub alerts: usize,
    /// Alerts still awaiting acknowledgment
    pub unacknowledged: usize,
}

impl fmt::Display for MonitorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device:  {} ({})", self.device, self.status)?;
        writeln!(f, "Samples: {}", self.samples)?;
        match &self.latest {
            Some(sample) => writeln!(f, "Latest:  {}", sample)?,
            None => writeln!(f, "Latest:  none")?,
        }
        write!(
            f,
            "Alerts:  {} ({} unacknowledged)",
            self.alerts, self.unacknowledged
        )
    }
}

//! Timing configuration for the connectivity service

use std::time::Duration;

use aqualink_core::TelemetryError;

/// Delays and periods driving the connection state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityConfig {
    /// Delay between `start()` and the automatic first connect
    pub startup_delay: Duration,
    /// Link-establishment latency of `connect()`
    pub connect_delay: Duration,
    /// Backoff between `reconnect()` and the follow-up connect
    pub reconnect_delay: Duration,
    /// Period of the telemetry stream while connected
    pub telemetry_interval: Duration,
    /// Delay before a command acknowledgment is emitted
    pub command_ack_delay: Duration,
    /// Whether `start()` connects automatically
    pub auto_connect: bool,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_millis(1500),
            connect_delay: Duration::from_millis(1000),
            reconnect_delay: Duration::from_millis(2000),
            telemetry_interval: Duration::from_secs(30),
            command_ack_delay: Duration::from_millis(500),
            auto_connect: true,
        }
    }
}

impl ConnectivityConfig {
    /// Set the telemetry period
    pub fn with_telemetry_interval(mut self, interval: Duration) -> Self {
        self.telemetry_interval = interval;
        self
    }

    /// Enable or disable auto-connect on `start()`
    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    /// Check the configuration can drive a periodic schedule
    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.telemetry_interval.is_zero() {
            return Err(TelemetryError::InvalidInterval);
        }
        Ok(())
    }
}

//! Data models for device connectivity and telemetry
//!
//! Provides:
//! - Connection status of the device link
//! - Telemetry samples and per-channel sensor specifications
//! - Commands and command results

pub mod command;
pub mod telemetry;

pub use command::{Command, CommandParams, CommandResult, CommandStatus};
pub use telemetry::{ReadingStatus, SensorChannel, SensorSpec, SeriesPoint, TelemetrySample};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current epoch time in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// State of the device link
///
/// Exactly one value is current at a time. `Connecting` is tracked internally
/// while the link-establishment delay runs but is never broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Link not established or closed
    #[default]
    Disconnected,
    /// Waiting for the link-establishment delay to elapse
    Connecting,
    /// Link active, telemetry streaming
    Connected,
    /// Waiting for the reconnect backoff before connecting again
    Reconnecting,
}

impl ConnectionStatus {
    /// Check if this status allows commands and telemetry
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if this status is broadcast to subscribers when entered
    pub fn is_observable(&self) -> bool {
        !matches!(self, Self::Connecting)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting => write!(f, "Reconnecting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_status_default() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_connection_status_predicates() {
        assert!(ConnectionStatus::Connected.is_connected());
        assert!(!ConnectionStatus::Reconnecting.is_connected());
        assert!(!ConnectionStatus::Connecting.is_observable());
        assert!(ConnectionStatus::Disconnected.is_observable());
    }

    #[test]
    fn test_connection_status_serde() {
        let json = serde_json::to_string(&ConnectionStatus::Reconnecting).unwrap();
        assert_eq!(json, "\"reconnecting\"");
        let status: ConnectionStatus = serde_json::from_str("\"connected\"").unwrap();
        assert_eq!(status, ConnectionStatus::Connected);
    }
}

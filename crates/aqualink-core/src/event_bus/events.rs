//! Event type definitions for the event bus.
//!
//! Every event belongs to exactly one [`EventKind`]; subscribers register per
//! kind and receive the typed payload. Events serialize as the device message
//! envelope `{ "type": ..., "data": ... }`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data::{CommandResult, ConnectionStatus, TelemetrySample};

/// Root event enum for all device events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum DeviceEvent {
    /// Connection status changed (or was re-asserted).
    Connection {
        /// The status just entered.
        status: ConnectionStatus,
    },
    /// A telemetry reading arrived.
    Data(TelemetrySample),
    /// A command was acknowledged.
    CommandResponse(CommandResult),
    /// Link establishment failed.
    ConnectFailed {
        /// Reason reported by the link.
        reason: String,
    },
}

impl DeviceEvent {
    /// Connection status event
    pub fn connection(status: ConnectionStatus) -> Self {
        DeviceEvent::Connection { status }
    }

    /// Get the kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            DeviceEvent::Connection { .. } => EventKind::Connection,
            DeviceEvent::Data(_) => EventKind::Data,
            DeviceEvent::CommandResponse(_) => EventKind::CommandResponse,
            DeviceEvent::ConnectFailed { .. } => EventKind::Error,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            DeviceEvent::Connection { status } => format!("Connection: {}", status),
            DeviceEvent::Data(sample) => format!("Data: {}", sample),
            DeviceEvent::CommandResponse(result) => {
                format!("Command {} {}: {}", result.command, result.status, result.message)
            }
            DeviceEvent::ConnectFailed { reason } => format!("Connect failed: {}", reason),
        }
    }
}

/// Event kind for subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// Connection status events.
    Connection,
    /// Telemetry events.
    Data,
    /// Command acknowledgment events.
    CommandResponse,
    /// Link failure events.
    Error,
}

impl EventKind {
    /// All kinds
    pub const ALL: [EventKind; 4] = [
        EventKind::Connection,
        EventKind::Data,
        EventKind::CommandResponse,
        EventKind::Error,
    ];

    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connection => "connection",
            EventKind::Data => "data",
            EventKind::CommandResponse => "commandResponse",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown event kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CommandStatus;

    #[test]
    fn test_event_kinds() {
        assert_eq!(
            DeviceEvent::connection(ConnectionStatus::Connected).kind(),
            EventKind::Connection
        );
        assert_eq!(
            DeviceEvent::Data(TelemetrySample::new(25.0, 1.0, 7.0, 0)).kind(),
            EventKind::Data
        );
        assert_eq!(
            DeviceEvent::ConnectFailed {
                reason: "x".to_string()
            }
            .kind(),
            EventKind::Error
        );
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("telemetry".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_envelope_serialization() {
        let event = DeviceEvent::connection(ConnectionStatus::Connected);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "connection");
        assert_eq!(json["data"]["status"], "connected");

        let event = DeviceEvent::CommandResponse(CommandResult {
            command: "saveConfig".to_string(),
            status: CommandStatus::Success,
            message: "ok".to_string(),
            timestamp: 5,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "commandResponse");
        assert_eq!(json["data"]["status"], "success");
    }
}

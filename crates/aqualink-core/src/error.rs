//! Error handling for AquaLink
//!
//! Provides error types for all layers of the service:
//! - Device errors (command channel, lifecycle)
//! - Connection errors (link establishment and transport)
//! - Telemetry errors (generator arguments)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::data::SensorChannel;

/// Device error type
///
/// Represents errors surfaced synchronously to callers of the connectivity
/// service, such as issuing a command while the link is down.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Device is not connected
    #[error("Device not connected")]
    NotConnected,

    /// Command failed on the device
    #[error("Command '{command}' failed: {reason}")]
    CommandFailed {
        /// The name of the failed command.
        command: String,
        /// The reason reported by the link.
        reason: String,
    },
}

/// Connection error type
///
/// Represents errors related to establishing or using the device link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Link could not be established
    #[error("Failed to connect to {device}: {reason}")]
    ConnectFailed {
        /// The device the link was opened against.
        device: String,
        /// The reason the link failed to open.
        reason: String,
    },

    /// Link is not open
    #[error("Link to {device} is closed")]
    LinkClosed {
        /// The device whose link is closed.
        device: String,
    },

    /// Reading from the link failed
    #[error("Read from {device} failed: {reason}")]
    ReadFailed {
        /// The device that was read from.
        device: String,
        /// The reason the read failed.
        reason: String,
    },

    /// No async runtime is available to drive timers
    #[error("No tokio runtime available: {reason}")]
    NoRuntime {
        /// Details from the runtime lookup.
        reason: String,
    },
}

/// Telemetry error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// Series interval must be positive so timestamps strictly increase
    #[error("Series interval must be greater than zero")]
    InvalidInterval,

    /// Window capacity must be positive
    #[error("History capacity must be greater than zero")]
    InvalidCapacity,

    /// Unknown sensor channel name
    #[error("Unknown sensor channel: {name}")]
    UnknownChannel {
        /// The unrecognised channel name.
        name: String,
    },

    /// Alert limits are unusable
    #[error("Invalid {channel} threshold: {reason}")]
    InvalidThreshold {
        /// The channel whose limits are invalid.
        channel: SensorChannel,
        /// Why the limits were rejected.
        reason: String,
    },
}

/// Main error type for AquaLink
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Device error
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Telemetry error
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

impl Error {
    /// Check if this is the synchronous "not connected" rejection
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Error::Device(DeviceError::NotConnected))
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a device error
    pub fn is_device_error(&self) -> bool {
        matches!(self, Error::Device(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

//! Device transport abstraction
//!
//! The connectivity service never talks to hardware directly. It opens,
//! reads from and sends commands through a [`DeviceLink`], so the backing
//! transport (simulation, serial, network) can be swapped without touching
//! the connection state machine.

pub mod simulated;

pub use simulated::{SimulatedLink, DEFAULT_DEVICE_NAME};

use aqualink_core::{Command, CommandResult, ConnectionError, DeviceError, TelemetrySample};

/// Transport to a single sensor device
///
/// Methods take `&self` because the link is shared between the service and
/// its timer tasks; implementations keep their own interior mutability.
/// Calls are made from timer callbacks and must not block for long.
pub trait DeviceLink: Send + Sync {
    /// Human-readable device name used in logs and errors
    fn name(&self) -> &str;

    /// Establish the link
    ///
    /// Fails with [`ConnectionError::ConnectFailed`].
    fn open(&self) -> Result<(), ConnectionError>;

    /// Tear the link down. Closing a closed link is a no-op.
    fn close(&self);

    /// Check if the link is currently open
    fn is_open(&self) -> bool;

    /// Read one telemetry sample from the device
    ///
    /// Fails with [`ConnectionError::LinkClosed`] or [`ConnectionError::ReadFailed`].
    fn read_sample(&self) -> Result<TelemetrySample, ConnectionError>;

    /// Execute a command on the device and return its outcome
    ///
    /// Fails with [`DeviceError::NotConnected`] or [`DeviceError::CommandFailed`].
    fn execute(&self, command: &Command) -> Result<CommandResult, DeviceError>;
}

impl std::fmt::Debug for dyn DeviceLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLink")
            .field("name", &self.name())
            .field("open", &self.is_open())
            .finish()
    }
}

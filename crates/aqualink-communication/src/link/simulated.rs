//! In-process simulated device
//!
//! Stands in for the ESP32 sensor board: it always opens, produces readings
//! from the telemetry generator and acknowledges every command. Failure
//! knobs let tests exercise the error paths of the connectivity service.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use aqualink_core::telemetry::generator;
use aqualink_core::{
    now_millis, Command, CommandResult, ConnectionError, DeviceError, TelemetrySample,
};

use super::DeviceLink;

/// Name reported by the default simulated device
pub const DEFAULT_DEVICE_NAME: &str = "ESP32-ECO-1";

/// Simulated sensor device
#[derive(Debug)]
pub struct SimulatedLink {
    name: String,
    open: AtomicBool,
    failing_opens: AtomicU32,
    failing_reads: AtomicBool,
    failing_commands: AtomicBool,
    opens: AtomicU64,
    commands: AtomicU64,
}

impl SimulatedLink {
    /// Create a simulated device with the default name
    pub fn new() -> Self {
        Self::named(DEFAULT_DEVICE_NAME)
    }

    /// Create a simulated device with a custom name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            open: AtomicBool::new(false),
            failing_opens: AtomicU32::new(0),
            failing_reads: AtomicBool::new(false),
            failing_commands: AtomicBool::new(false),
            opens: AtomicU64::new(0),
            commands: AtomicU64::new(0),
        }
    }

    /// Make the next `count` calls to `open` fail
    pub fn fail_next_opens(&self, count: u32) {
        self.failing_opens.store(count, Ordering::SeqCst);
    }

    /// Make every `read_sample` fail until reset
    pub fn set_failing_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    /// Make every `execute` fail until reset
    pub fn set_failing_commands(&self, failing: bool) {
        self.failing_commands.store(failing, Ordering::SeqCst);
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of commands executed so far, failed ones included
    pub fn command_count(&self) -> u64 {
        self.commands.load(Ordering::SeqCst)
    }
}

impl Default for SimulatedLink {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceLink for SimulatedLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<(), ConnectionError> {
        let remaining = self.failing_opens.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_opens.store(remaining - 1, Ordering::SeqCst);
            return Err(ConnectionError::ConnectFailed {
                device: self.name.clone(),
                reason: "device did not answer".to_string(),
            });
        }
        self.open.store(true, Ordering::SeqCst);
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn read_sample(&self) -> Result<TelemetrySample, ConnectionError> {
        if !self.is_open() {
            return Err(ConnectionError::LinkClosed {
                device: self.name.clone(),
            });
        }
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(ConnectionError::ReadFailed {
                device: self.name.clone(),
                reason: "sensor read timed out".to_string(),
            });
        }
        Ok(generator::sample())
    }

    fn execute(&self, command: &Command) -> Result<CommandResult, DeviceError> {
        if !self.is_open() {
            return Err(DeviceError::NotConnected);
        }
        self.commands.fetch_add(1, Ordering::SeqCst);
        if self.failing_commands.load(Ordering::SeqCst) {
            return Err(DeviceError::CommandFailed {
                command: command.name.clone(),
                reason: "device returned an error".to_string(),
            });
        }
        Ok(CommandResult::success(&command.name, now_millis()))
    }
}

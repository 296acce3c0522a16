//! Commands sent to the device and their results
//!
//! A command exists only while its acknowledgment is pending. Results carry
//! the command name and nothing else for correlation, so two concurrent
//! commands with the same name produce indistinguishable results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque key/value parameters of a command
pub type CommandParams = serde_json::Map<String, serde_json::Value>;

/// A caller-initiated request to the device
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Command name, e.g. `saveConfig`.
    pub name: String,
    /// Parameters, passed through without validation.
    pub parameters: CommandParams,
    /// When the command was accepted.
    pub issued_at: DateTime<Utc>,
}

impl Command {
    /// Create a command stamped with the current time
    pub fn new(name: impl Into<String>, parameters: CommandParams) -> Self {
        Self {
            name: name.into(),
            parameters,
            issued_at: Utc::now(),
        }
    }
}

/// Outcome of an executed command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    /// The device executed the command.
    Success,
    /// The link reported an execution failure.
    Failed,
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandStatus::Success => write!(f, "success"),
            CommandStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Acknowledgment emitted once per accepted command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Name of the command this result answers.
    pub command: String,
    /// Execution outcome.
    pub status: CommandStatus,
    /// Human-readable message.
    pub message: String,
    /// Epoch milliseconds when the result was produced.
    pub timestamp: i64,
}

impl CommandResult {
    /// Successful result with the standard message
    pub fn success(command: &str, timestamp: i64) -> Self {
        Self {
            command: command.to_string(),
            status: CommandStatus::Success,
            message: format!("Command {} executed successfully", command),
            timestamp,
        }
    }

    /// Failed result carrying the link's reason
    pub fn failed(command: &str, reason: impl Into<String>, timestamp: i64) -> Self {
        Self {
            command: command.to_string(),
            status: CommandStatus::Failed,
            message: reason.into(),
            timestamp,
        }
    }

    /// Check if the command succeeded
    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Success
    }
}

//! # AquaLink Core
//!
//! Core types, events, and telemetry model for AquaLink.
//! Provides the fundamental abstractions for device connectivity,
//! event delivery, and water-quality telemetry.

pub mod data;
pub mod error;
pub mod event_bus;
pub mod telemetry;
pub mod types;

pub use data::{
    now_millis, Command, CommandParams, CommandResult, CommandStatus, ConnectionStatus,
    ReadingStatus, SensorChannel, SensorSpec, SeriesPoint, TelemetrySample,
};

pub use error::{ConnectionError, DeviceError, Error, Result, TelemetryError};

// Re-export event bus for convenience
pub use event_bus::{DeviceEvent, EventBus, EventBusConfig, EventKind, SubscriptionId};

pub use telemetry::{
    Alert, AlertFilter, AlertLevel, AlertLog, AlertThresholds, ChannelThresholds,
    TelemetryHistory, TimeRange, ValueTween,
};

// Re-export type aliases for convenience
pub use types::{thread_safe, thread_safe_vec, ThreadSafe, ThreadSafeVec};

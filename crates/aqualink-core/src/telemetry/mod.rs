//! Telemetry generation, history, alerting and display helpers
//!
//! - [`generator`]: simulated readings and historical random walks
//! - [`history`]: fixed-capacity rolling window per channel
//! - [`alerts`]: edge-triggered threshold alerts
//! - [`tween`]: interpolation of displayed values over elapsed time

pub mod alerts;
pub mod generator;
pub mod history;
pub mod tween;

pub use alerts::{
    Alert, AlertFilter, AlertLevel, AlertLog, AlertThresholds, ChannelThresholds, MAX_ALERTS,
};
pub use generator::{current_value, sample, sample_with, series, series_with, TimeRange};
pub use history::{TelemetryHistory, DEFAULT_HISTORY_CAPACITY};
pub use tween::{interpolate, ValueTween, DEFAULT_TWEEN_DURATION};

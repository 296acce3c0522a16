//! Threshold alerts over incoming telemetry
//!
//! Alerts are edge-triggered per channel: a new alert is raised only when a
//! channel moves between normal, warning and critical, so a reading that
//! stays out of range does not flood the log.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::data::{ReadingStatus, SensorChannel, TelemetrySample};
use crate::error::TelemetryError;
use crate::event_bus::{EventBus, SubscriptionId};
use crate::types::{thread_safe, ThreadSafe};

/// Alerts kept before the oldest are discarded
pub const MAX_ALERTS: usize = 200;

/// Fraction of the threshold span treated as the warning margin
const WARNING_MARGIN: f64 = 0.1;

/// Optional lower and upper limit for one channel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelThresholds {
    /// Lower limit, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper limit, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ChannelThresholds {
    /// Thresholds with both limits
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Threshold with only an upper limit
    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    /// Classify a value against these limits
    pub fn status(&self, channel: SensorChannel, value: f64) -> ReadingStatus {
        let span = match (self.min, self.max) {
            (Some(min), Some(max)) => max - min,
            _ => channel.spec().span(),
        };
        let margin = span * WARNING_MARGIN;

        if self.min.is_some_and(|min| value < min) || self.max.is_some_and(|max| value > max) {
            ReadingStatus::Critical
        } else if self.min.is_some_and(|min| value < min + margin)
            || self.max.is_some_and(|max| value > max - margin)
        {
            ReadingStatus::Warning
        } else {
            ReadingStatus::Normal
        }
    }
}

/// Alert limits for every channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Temperature limits in °C.
    pub temperature: ChannelThresholds,
    /// Turbidity limits in NTU.
    pub turbidity: ChannelThresholds,
    /// pH limits.
    pub ph: ChannelThresholds,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            temperature: ChannelThresholds::between(20.0, 30.0),
            turbidity: ChannelThresholds::at_most(7.0),
            ph: ChannelThresholds::between(6.5, 8.5),
        }
    }
}

impl AlertThresholds {
    /// Limits for one channel
    pub fn channel(&self, channel: SensorChannel) -> &ChannelThresholds {
        match channel {
            SensorChannel::Temperature => &self.temperature,
            SensorChannel::Turbidity => &self.turbidity,
            SensorChannel::Ph => &self.ph,
        }
    }

    /// Reject inverted or non-finite limits
    pub fn validate(&self) -> Result<(), TelemetryError> {
        for channel in SensorChannel::ALL {
            let limits = self.channel(channel);
            let finite =
                limits.min.is_none_or(f64::is_finite) && limits.max.is_none_or(f64::is_finite);
            if !finite {
                return Err(TelemetryError::InvalidThreshold {
                    channel,
                    reason: "limits must be finite".to_string(),
                });
            }
            if let (Some(min), Some(max)) = (limits.min, limits.max) {
                if min >= max {
                    return Err(TelemetryError::InvalidThreshold {
                        channel,
                        reason: format!("minimum {} must be below maximum {}", min, max),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Severity of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Channel returned to its normal range.
    Info,
    /// Channel is approaching a limit.
    Warning,
    /// Channel is beyond a limit.
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "info"),
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

/// A raised alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert id.
    pub id: Uuid,
    /// Epoch milliseconds of the reading that raised the alert.
    pub timestamp: i64,
    /// Severity.
    pub level: AlertLevel,
    /// Channel the alert concerns.
    pub channel: SensorChannel,
    /// Human-readable message.
    pub message: String,
    /// Reading value.
    pub value: f64,
    /// Whether an operator has acknowledged it.
    pub acknowledged: bool,
}

impl Alert {
    fn new(channel: SensorChannel, level: AlertLevel, value: f64, timestamp: i64) -> Self {
        let detail = match level {
            AlertLevel::Critical => "exceeded critical threshold",
            AlertLevel::Warning => "approaching warning threshold",
            AlertLevel::Info => "returned to normal range",
        };
        Self {
            id: Uuid::new_v4(),
            timestamp,
            level,
            channel,
            message: format!("{} {}", channel, detail),
            value,
            acknowledged: false,
        }
    }
}

/// Which alerts to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertFilter {
    /// Every alert.
    #[default]
    All,
    /// Only alerts not yet acknowledged.
    Unacknowledged,
}

/// Log of alerts raised from telemetry
#[derive(Debug, Clone, Default)]
pub struct AlertLog {
    thresholds: AlertThresholds,
    /// Newest first.
    alerts: Vec<Alert>,
    state: HashMap<SensorChannel, ReadingStatus>,
}

impl AlertLog {
    /// Create an empty log using the given thresholds
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self {
            thresholds,
            alerts: Vec::new(),
            state: HashMap::new(),
        }
    }

    /// Subscribe a shared log to `data` events on the bus
    pub fn attach(
        bus: &EventBus,
        thresholds: AlertThresholds,
    ) -> (ThreadSafe<AlertLog>, SubscriptionId) {
        let log = thread_safe(Self::new(thresholds));
        let sink = log.clone();
        let id = bus.on_data(move |sample| {
            let raised = sink.lock().evaluate(sample);
            for alert in raised {
                tracing::warn!(level = %alert.level, value = alert.value, "{}", alert.message);
            }
        });
        (log, id)
    }

    /// Current thresholds
    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Replace thresholds; channel states are re-evaluated on the next sample
    pub fn set_thresholds(&mut self, thresholds: AlertThresholds) {
        self.thresholds = thresholds;
    }

    /// Evaluate a sample and return any alerts it raised
    pub fn evaluate(&mut self, sample: &TelemetrySample) -> Vec<Alert> {
        let mut raised = Vec::new();

        for channel in SensorChannel::ALL {
            let value = sample.value(channel);
            let status = self.thresholds.channel(channel).status(channel, value);
            let previous = self
                .state
                .insert(channel, status)
                .unwrap_or(ReadingStatus::Normal);
            if status == previous {
                continue;
            }

            let level = match status {
                ReadingStatus::Critical => AlertLevel::Critical,
                ReadingStatus::Warning => AlertLevel::Warning,
                ReadingStatus::Normal => AlertLevel::Info,
            };
            raised.push(Alert::new(channel, level, value, sample.timestamp));
        }

        for alert in &raised {
            self.alerts.insert(0, alert.clone());
        }
        self.alerts.truncate(MAX_ALERTS);
        raised
    }

    /// List alerts, newest first
    pub fn alerts(&self, filter: AlertFilter) -> Vec<&Alert> {
        self.alerts
            .iter()
            .filter(|a| filter == AlertFilter::All || !a.acknowledged)
            .collect()
    }

    /// Number of alerts awaiting acknowledgment
    pub fn unacknowledged_count(&self) -> usize {
        self.alerts.iter().filter(|a| !a.acknowledged).count()
    }

    /// Acknowledge one alert; returns false if it is unknown
    pub fn acknowledge(&mut self, id: Uuid) -> bool {
        match self.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    /// Acknowledge every alert
    pub fn acknowledge_all(&mut self) {
        for alert in &mut self.alerts {
            alert.acknowledged = true;
        }
    }

    /// Delete one alert; returns false if it is unknown
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.id != id);
        self.alerts.len() != before
    }

    /// Delete every alert
    pub fn clear(&mut self) {
        self.alerts.clear();
    }
}

//! Telemetry data model
//!
//! A water-quality probe reports three channels: temperature, turbidity and pH.
//! Each channel has a fixed reporting range used both for generating readings
//! and for classifying them on the dashboard.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TelemetryError;

/// Sensor channel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorChannel {
    /// Water temperature in °C.
    Temperature,
    /// Turbidity in NTU.
    Turbidity,
    /// pH (unitless).
    Ph,
}

impl SensorChannel {
    /// All channels in reporting order
    pub const ALL: [SensorChannel; 3] = [
        SensorChannel::Temperature,
        SensorChannel::Turbidity,
        SensorChannel::Ph,
    ];

    /// Reporting range and random-walk step for this channel
    pub fn spec(&self) -> &'static SensorSpec {
        match self {
            SensorChannel::Temperature => &TEMPERATURE,
            SensorChannel::Turbidity => &TURBIDITY,
            SensorChannel::Ph => &PH,
        }
    }

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorChannel::Temperature => "temperature",
            SensorChannel::Turbidity => "turbidity",
            SensorChannel::Ph => "ph",
        }
    }
}

impl fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorChannel::Temperature => write!(f, "Temperature"),
            SensorChannel::Turbidity => write!(f, "Turbidity"),
            SensorChannel::Ph => write!(f, "pH"),
        }
    }
}

impl FromStr for SensorChannel {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "temperature" | "temp" => Ok(SensorChannel::Temperature),
            "turbidity" => Ok(SensorChannel::Turbidity),
            "ph" => Ok(SensorChannel::Ph),
            _ => Err(TelemetryError::UnknownChannel {
                name: s.to_string(),
            }),
        }
    }
}

/// Fixed reporting range of a sensor channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSpec {
    /// Lowest reportable value (inclusive).
    pub min: f64,
    /// Highest reportable value (inclusive).
    pub max: f64,
    /// Display unit.
    pub unit: &'static str,
    /// Largest step between consecutive random-walk points.
    pub fluctuation: f64,
}

const TEMPERATURE: SensorSpec = SensorSpec {
    min: 20.0,
    max: 30.0,
    unit: "°C",
    fluctuation: 0.5,
};

const TURBIDITY: SensorSpec = SensorSpec {
    min: 0.0,
    max: 10.0,
    unit: "NTU",
    fluctuation: 0.2,
};

const PH: SensorSpec = SensorSpec {
    min: 6.5,
    max: 8.5,
    unit: "",
    fluctuation: 0.1,
};

impl SensorSpec {
    /// Width of the reporting range
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Check if a value lies within the closed range
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp a value into the closed range
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Classify a reading by its distance from the range edges
    ///
    /// Critical within 10% of the span from either bound, Warning within 20%.
    pub fn classify(&self, value: f64) -> ReadingStatus {
        let span = self.span();
        let critical = span * 0.1;
        let warning = span * 0.2;

        if value <= self.min + critical || value >= self.max - critical {
            ReadingStatus::Critical
        } else if value <= self.min + warning || value >= self.max - warning {
            ReadingStatus::Warning
        } else {
            ReadingStatus::Normal
        }
    }
}

/// Dashboard status of a single reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    /// Comfortably inside the range.
    Normal,
    /// Near a range edge.
    Warning,
    /// At or beyond a range edge.
    Critical,
}

/// One multi-channel reading from the probe
///
/// Immutable once constructed; subscribers receive it by reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Water temperature in °C.
    pub temperature: f64,
    /// Turbidity in NTU.
    pub turbidity: f64,
    /// pH value.
    pub ph: f64,
    /// Epoch milliseconds when the reading was taken.
    pub timestamp: i64,
}

impl TelemetrySample {
    /// Create a new sample
    pub fn new(temperature: f64, turbidity: f64, ph: f64, timestamp: i64) -> Self {
        Self {
            temperature,
            turbidity,
            ph,
            timestamp,
        }
    }

    /// Value of a single channel
    pub fn value(&self, channel: SensorChannel) -> f64 {
        match channel {
            SensorChannel::Temperature => self.temperature,
            SensorChannel::Turbidity => self.turbidity,
            SensorChannel::Ph => self.ph,
        }
    }

    /// Single-channel point for history series
    pub fn point(&self, channel: SensorChannel) -> SeriesPoint {
        SeriesPoint {
            timestamp: self.timestamp,
            value: self.value(channel),
        }
    }
}

impl fmt::Display for TelemetrySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "T={:.2}°C turbidity={:.2}NTU pH={:.2} @{}",
            self.temperature, self.turbidity, self.ph, self.timestamp
        )
    }
}

/// A single timestamped value of one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Channel value.
    pub value: f64,
}

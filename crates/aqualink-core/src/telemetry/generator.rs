//! Simulated telemetry source
//!
//! Readings are drawn uniformly within each channel's range. Historical series
//! are bounded random walks ending at the current time. The `_with` variants
//! accept any [`Rng`] so callers can seed them.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::data::{now_millis, SensorChannel, SeriesPoint, TelemetrySample};
use crate::error::TelemetryError;

/// Draw one reading for every channel, stamped with the current time
pub fn sample() -> TelemetrySample {
    sample_with(&mut rand::thread_rng(), now_millis())
}

/// Draw one reading for every channel using the given RNG and timestamp
pub fn sample_with<R: Rng + ?Sized>(rng: &mut R, timestamp: i64) -> TelemetrySample {
    TelemetrySample {
        temperature: current_value_with(rng, SensorChannel::Temperature),
        turbidity: current_value_with(rng, SensorChannel::Turbidity),
        ph: current_value_with(rng, SensorChannel::Ph),
        timestamp,
    }
}

/// Draw a single uniform value for one channel
pub fn current_value(channel: SensorChannel) -> f64 {
    current_value_with(&mut rand::thread_rng(), channel)
}

fn current_value_with<R: Rng + ?Sized>(rng: &mut R, channel: SensorChannel) -> f64 {
    let spec = channel.spec();
    rng.gen_range(spec.min..=spec.max)
}

/// Generate a bounded random walk of `count` points ending now
///
/// Timestamps are `now - (count - 1 - i) * interval`, so they strictly
/// increase and the last one is the current time.
pub fn series(
    channel: SensorChannel,
    count: usize,
    interval: Duration,
) -> Result<Vec<SeriesPoint>, TelemetryError> {
    series_with(&mut rand::thread_rng(), channel, count, interval, now_millis())
}

/// Random walk with an explicit RNG and end timestamp
pub fn series_with<R: Rng + ?Sized>(
    rng: &mut R,
    channel: SensorChannel,
    count: usize,
    interval: Duration,
    end: i64,
) -> Result<Vec<SeriesPoint>, TelemetryError> {
    let step = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX);
    if step == 0 {
        return Err(TelemetryError::InvalidInterval);
    }

    let spec = channel.spec();
    let mut points = Vec::with_capacity(count);
    let mut value = rng.gen_range(spec.min..=spec.max);

    for i in 0..count {
        if i > 0 {
            let delta = rng.gen_range(-spec.fluctuation..=spec.fluctuation);
            value = spec.clamp(value + delta);
        }
        let offset = (count - 1 - i) as i64;
        points.push(SeriesPoint {
            timestamp: end.saturating_sub(offset.saturating_mul(step)),
            value,
        });
    }

    Ok(points)
}

/// Window of historical data shown on the history view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    /// Last 24 hours.
    #[serde(rename = "1d")]
    Day,
    /// Last 7 days.
    #[serde(rename = "7d")]
    Week,
    /// Last 30 days.
    #[serde(rename = "30d")]
    Month,
}

impl TimeRange {
    /// Length of the range in days
    pub fn days(&self) -> u64 {
        match self {
            TimeRange::Day => 1,
            TimeRange::Week => 7,
            TimeRange::Month => 30,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::Day => "Last 24 Hours",
            TimeRange::Week => "Last 7 Days",
            TimeRange::Month => "Last 30 Days",
        }
    }

    /// Total duration of the range
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.days() * 24 * 60 * 60)
    }

    /// Point spacing that spreads `points` samples across the range
    pub fn interval_for(&self, points: u32) -> Duration {
        self.duration() / points.max(1)
    }
}

//! Rolling in-memory telemetry history.
//!
//! One fixed-capacity window per channel; when full, the oldest point is
//! evicted first.

use std::collections::VecDeque;

use crate::data::{SensorChannel, SeriesPoint, TelemetrySample};
use crate::error::TelemetryError;
use crate::event_bus::{EventBus, SubscriptionId};
use crate::types::{thread_safe, ThreadSafe};

/// Default number of samples kept per channel (30 minutes at 30 s intervals)
pub const DEFAULT_HISTORY_CAPACITY: usize = 60;

/// Sliding-window store of recent telemetry
#[derive(Debug, Clone)]
pub struct TelemetryHistory {
    capacity: usize,
    temperature: VecDeque<SeriesPoint>,
    turbidity: VecDeque<SeriesPoint>,
    ph: VecDeque<SeriesPoint>,
    latest: Option<TelemetrySample>,
}

impl TelemetryHistory {
    /// Create an empty history holding at most `capacity` points per channel
    pub fn new(capacity: usize) -> Result<Self, TelemetryError> {
        if capacity == 0 {
            return Err(TelemetryError::InvalidCapacity);
        }
        Ok(Self {
            capacity,
            temperature: VecDeque::with_capacity(capacity),
            turbidity: VecDeque::with_capacity(capacity),
            ph: VecDeque::with_capacity(capacity),
            latest: None,
        })
    }

    /// Subscribe a shared history to `data` events on the bus
    pub fn attach(
        bus: &EventBus,
        capacity: usize,
    ) -> Result<(ThreadSafe<TelemetryHistory>, SubscriptionId), TelemetryError> {
        let history = thread_safe(Self::new(capacity)?);
        let sink = history.clone();
        let id = bus.on_data(move |sample| sink.lock().record(sample));
        Ok((history, id))
    }

    /// Append a sample to every channel window
    pub fn record(&mut self, sample: &TelemetrySample) {
        for channel in SensorChannel::ALL {
            let capacity = self.capacity;
            let window = self.window_mut(channel);
            if window.len() == capacity {
                window.pop_front();
            }
            window.push_back(sample.point(channel));
        }
        self.latest = Some(*sample);
    }

    /// Points for one channel, oldest first
    pub fn series(&self, channel: SensorChannel) -> Vec<SeriesPoint> {
        self.window(channel).iter().copied().collect()
    }

    /// Most recently recorded sample
    pub fn latest(&self) -> Option<TelemetrySample> {
        self.latest
    }

    /// Number of points currently held per channel
    pub fn len(&self) -> usize {
        self.temperature.len()
    }

    /// Check if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.temperature.is_empty()
    }

    /// Maximum points per channel
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all recorded points
    pub fn clear(&mut self) {
        self.temperature.clear();
        self.turbidity.clear();
        self.ph.clear();
        self.latest = None;
    }

    fn window(&self, channel: SensorChannel) -> &VecDeque<SeriesPoint> {
        match channel {
            SensorChannel::Temperature => &self.temperature,
            SensorChannel::Turbidity => &self.turbidity,
            SensorChannel::Ph => &self.ph,
        }
    }

    fn window_mut(&mut self, channel: SensorChannel) -> &mut VecDeque<SeriesPoint> {
        match channel {
            SensorChannel::Temperature => &mut self.temperature,
            SensorChannel::Turbidity => &mut self.turbidity,
            SensorChannel::Ph => &mut self.ph,
        }
    }
}

impl Default for TelemetryHistory {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            temperature: VecDeque::with_capacity(DEFAULT_HISTORY_CAPACITY),
            turbidity: VecDeque::with_capacity(DEFAULT_HISTORY_CAPACITY),
            ph: VecDeque::with_capacity(DEFAULT_HISTORY_CAPACITY),
            latest: None,
        }
    }
}

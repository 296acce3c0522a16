//! Linear interpolation of displayed values
//!
//! A gauge moving from one reading to the next is a pure function of elapsed
//! time; callers sample it at whatever rate they redraw.

use std::time::Duration;

/// Default animation length for a reading change
pub const DEFAULT_TWEEN_DURATION: Duration = Duration::from_millis(1000);

/// Interpolate from `start` to `end`, clamping once `duration` has elapsed
pub fn interpolate(start: f64, end: f64, elapsed: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return end;
    }
    let progress = (elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0);
    start + (end - start) * progress
}

/// A value animating toward a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueTween {
    start: f64,
    end: f64,
    duration: Duration,
}

impl ValueTween {
    /// Create a tween from `start` to `end`
    pub fn new(start: f64, end: f64, duration: Duration) -> Self {
        Self {
            start,
            end,
            duration,
        }
    }

    /// Value after `elapsed` time
    pub fn value_at(&self, elapsed: Duration) -> f64 {
        interpolate(self.start, self.end, elapsed, self.duration)
    }

    /// Check if the tween has reached its target
    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }

    /// Start a new tween toward `target` from wherever this one is at `elapsed`
    pub fn retarget(&self, elapsed: Duration, target: f64) -> Self {
        Self::new(self.value_at(elapsed), target, self.duration)
    }

    /// Target value
    pub fn target(&self) -> f64 {
        self.end
    }
}

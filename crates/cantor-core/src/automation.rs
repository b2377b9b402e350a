//! Schedulable parameter timelines.
//!
//! An [`AutomationParam`] stores a sorted list of automation events against
//! absolute clock time and answers "what is the value at time `t`?" without
//! any per-frame state. Envelopes are programmed once at note-on and once at
//! note-off; evaluation is sample-accurate regardless of when the caller got
//! around to scheduling them.
//!
//! ## Curve semantics
//!
//! | Event | Value between previous event `(t0, v0)` and this event `(t1, v1)` |
//! |-------|-------------------------------------------------------------------|
//! | `SetValue` | holds `v0`, jumps to `v1` at `t1` |
//! | `LinearRamp` | `v0 + (v1 - v0) * (t - t0) / (t1 - t0)` |
//! | `ExponentialRamp` | `v0 * (v1 / v0) ^ ((t - t0) / (t1 - t0))` |
//!
//! An exponential ramp is undefined when either endpoint is zero or the
//! endpoints differ in sign; in that case the start value is held until `t1`.
//! After the last event the last value holds forever.

use libm::powf;

/// A single automation event.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum AutomationEvent {
    /// Step to `value` at `time`.
    SetValue {
        /// Event time in seconds.
        time: f64,
        /// Target value.
        value: f32,
    },
    /// Linear ramp from the previous event, reaching `value` at `time`.
    LinearRamp {
        /// Ramp end time in seconds.
        time: f64,
        /// Value reached at `time`.
        value: f32,
    },
    /// Exponential ramp from the previous event, reaching `value` at `time`.
    ExponentialRamp {
        /// Ramp end time in seconds.
        time: f64,
        /// Value reached at `time`.
        value: f32,
    },
}

impl AutomationEvent {
    /// Time at which the event's value is reached.
    #[inline]
    pub fn time(&self) -> f64 {
        match *self {
            Self::SetValue { time, .. }
            | Self::LinearRamp { time, .. }
            | Self::ExponentialRamp { time, .. } => time,
        }
    }

    /// Value reached at [`time`](Self::time).
    #[inline]
    pub fn value(&self) -> f32 {
        match *self {
            Self::SetValue { value, .. }
            | Self::LinearRamp { value, .. }
            | Self::ExponentialRamp { value, .. } => value,
        }
    }
}

/// A parameter driven by an absolute-time automation timeline.
///
/// # Example
///
/// ```rust
/// use cantor_core::AutomationParam;
///
/// let mut gain = AutomationParam::new(0.0);
/// gain.set_value_at_time(0.0, 0.0)
///     .linear_ramp_to_value_at_time(1.0, 0.5)
///     .exponential_ramp_to_value_at_time(0.25, 1.5);
///
/// assert_eq!(gain.value_at(0.0), 0.0);
/// assert!((gain.value_at(0.25) - 0.5).abs() < 1e-6);
/// assert!((gain.value_at(1.0) - 0.5).abs() < 1e-6); // geometric midpoint
/// assert!((gain.value_at(9.0) - 0.25).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct AutomationParam {
    default_value: f32,
    events: Vec<AutomationEvent>,
}

impl AutomationParam {
    /// Create a parameter with no events that evaluates to `default_value`.
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    /// Value used before the first event.
    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    /// Scheduled events in time order.
    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Time of the last scheduled event, if any.
    pub fn end_time(&self) -> Option<f64> {
        self.events.last().map(AutomationEvent::time)
    }

    /// Step to `value` at `time`.
    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> &mut Self {
        self.insert(AutomationEvent::SetValue { time, value });
        self
    }

    /// Ramp linearly from the previous event to `value`, arriving at `end_time`.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) -> &mut Self {
        self.insert(AutomationEvent::LinearRamp {
            time: end_time,
            value,
        });
        self
    }

    /// Ramp exponentially from the previous event to `value`, arriving at `end_time`.
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) -> &mut Self {
        self.insert(AutomationEvent::ExponentialRamp {
            time: end_time,
            value,
        });
        self
    }

    /// Remove every event scheduled at or after `cancel_time`.
    ///
    /// A ramp that was in progress at `cancel_time` is removed with its end
    /// event, so the value falls back to the previous event's value. Use
    /// [`cancel_and_hold_at_time`](Self::cancel_and_hold_at_time) to freeze
    /// the in-progress value instead.
    pub fn cancel_scheduled_values(&mut self, cancel_time: f64) -> &mut Self {
        let keep = self.events.partition_point(|e| e.time() < cancel_time);
        self.events.truncate(keep);
        self
    }

    /// Snapshot the value at `time`, cancel everything from `time` on, and
    /// hold the snapshot from `time`.
    ///
    /// Returns the held value. Subsequent ramps start from it, which keeps
    /// the curve continuous when a release interrupts an attack or decay.
    pub fn cancel_and_hold_at_time(&mut self, time: f64) -> f32 {
        let held = self.value_at(time);
        self.cancel_scheduled_values(time);
        self.set_value_at_time(held, time);
        held
    }

    /// Evaluate the timeline at `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        let next = self.events.partition_point(|e| e.time() <= time);
        let (start_time, start_value) = match next.checked_sub(1) {
            Some(prev) => (self.events[prev].time(), self.events[prev].value()),
            None => (0.0, self.default_value),
        };

        match self.events.get(next) {
            Some(&AutomationEvent::LinearRamp { time: end, value }) => {
                linear_segment(start_time, start_value, end, value, time)
            }
            Some(&AutomationEvent::ExponentialRamp { time: end, value }) => {
                exponential_segment(start_time, start_value, end, value, time)
            }
            _ => start_value,
        }
    }

    /// Fill `out` with values at `start_time + i * period`.
    pub fn fill(&self, start_time: f64, period: f64, out: &mut [f32]) {
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.value_at(start_time + i as f64 * period);
        }
    }

    /// Whether any event lies strictly after `time`.
    pub fn has_events_after(&self, time: f64) -> bool {
        self.end_time().is_some_and(|end| end > time)
    }

    /// Drop history that can no longer influence values at or after `time`.
    ///
    /// The last event at or before `time` is kept as the anchor for any ramp
    /// that follows it.
    pub fn prune_before(&mut self, time: f64) {
        let reached = self.events.partition_point(|e| e.time() <= time);
        if reached > 1 {
            self.events.drain(..reached - 1);
        }
    }

    /// Remove all events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn insert(&mut self, event: AutomationEvent) {
        // Events at equal times keep insertion order.
        let at = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(at, event);
    }
}

impl Default for AutomationParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[inline]
fn segment_progress(t0: f64, t1: f64, t: f64) -> f32 {
    (((t - t0) / (t1 - t0)) as f32).clamp(0.0, 1.0)
}

#[inline]
fn linear_segment(t0: f64, v0: f32, t1: f64, v1: f32, t: f64) -> f32 {
    if t1 <= t0 {
        return v1;
    }
    v0 + (v1 - v0) * segment_progress(t0, t1, t)
}

#[inline]
fn exponential_segment(t0: f64, v0: f32, t1: f64, v1: f32, t: f64) -> f32 {
    if t1 <= t0 {
        return v1;
    }
    if v0 == 0.0 || v1 == 0.0 || (v0 < 0.0) != (v1 < 0.0) {
        return v0;
    }
    v0 * powf(v1 / v0, segment_progress(t0, t1, t))
}

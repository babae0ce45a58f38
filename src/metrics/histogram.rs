//! A reservoir-backed distribution of recorded values, plus an advisory "last observed" value.

use parking_lot::Mutex;

use crate::reservoir::Reservoir;
use crate::value::HistogramValue;

/// A histogram of recorded `i64` values, sampled through one of the four [`Reservoir`] kinds.
///
/// Also tracks the most recently observed `{value, user_value}` pair, non-atomically: two
/// concurrent `update`s may race on which one "wins" as `last`, which is fine since `last` is
/// advisory (an exporter's "latest value" display field, not anything load-bearing for the
/// distribution itself).
pub struct Histogram {
    reservoir: Reservoir,
    last: Mutex<Option<(i64, Option<String>)>>,
}

impl Histogram {
    /// Creates a histogram backed by the given reservoir.
    pub fn new(reservoir: Reservoir) -> Self {
        Self { reservoir, last: Mutex::new(None) }
    }

    /// Records a value, with an optional user-supplied tag, forwarding it to the reservoir and
    /// publishing it as the new `last` observation.
    pub fn update(&self, value: i64, user_value: Option<String>) {
        self.reservoir.update(value, user_value.clone());
        *self.last.lock() = Some((value, user_value));
    }

    /// Takes a point-in-time read of the histogram's distribution and its last observed value,
    /// optionally resetting both.
    pub fn get_value(&self, reset: bool) -> HistogramValue {
        let snapshot = self.reservoir.snapshot(reset);

        let last = if reset { self.last.lock().take() } else { self.last.lock().clone() };
        let (last_value, last_user_value) = match last {
            Some((value, user_value)) => (Some(value), user_value),
            None => (None, None),
        };

        HistogramValue { last_value, last_user_value, snapshot }
    }

    /// Resets the reservoir and clears the last observed value.
    pub fn reset(&self) {
        self.reservoir.reset();
        *self.last.lock() = None;
    }
}

//! A ring buffer retaining only the most recent `N` observations.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{MetricsError, Result};
use crate::reservoir::{Snapshot, DEFAULT_RESERVOIR_SIZE};
use crate::sample::WeightedSample;

/// A reservoir that remembers only the last `N` values it was given, in recency order.
///
/// Unlike [`UniformReservoir`](super::UniformReservoir), a value recorded long ago has zero
/// chance of surviving once `N` more updates have landed: the window is exact, not probabilistic.
pub struct SlidingWindowReservoir {
    slots: Box<[Mutex<Option<WeightedSample>>]>,
    count: AtomicU64,
}

impl SlidingWindowReservoir {
    /// Creates a reservoir with the default window size (1028).
    pub fn new() -> Self {
        Self::with_size(DEFAULT_RESERVOIR_SIZE).expect("default window size is always positive")
    }

    /// Creates a reservoir with the given window size.
    ///
    /// Returns [`MetricsError::InvalidCapacity`] if `size` is zero.
    pub fn with_size(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(MetricsError::InvalidCapacity);
        }

        let slots = (0..size).map(|_| Mutex::new(None)).collect();
        Ok(Self { slots, count: AtomicU64::new(0) })
    }

    /// Records a value, with an optional user-supplied tag.
    pub fn update(&self, value: i64, user_value: Option<String>) {
        let k = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        let idx = ((k - 1) as usize) % self.slots.len();
        *self.slots[idx].lock() = Some(WeightedSample::unweighted(value, user_value));
    }

    /// Takes a consistent snapshot of the current window, optionally resetting afterwards.
    pub fn snapshot(&self, reset: bool) -> Snapshot {
        let count = self.count.load(Ordering::Relaxed);
        let samples: Vec<WeightedSample> =
            self.slots.iter().filter_map(|slot| slot.lock().clone()).collect();

        if reset {
            self.reset();
        }

        Snapshot::from_samples(count, samples)
    }

    /// Clears the window and the observation counter.
    pub fn reset(&self) {
        for slot in self.slots.iter() {
            *slot.lock() = None;
        }
        self.count.store(0, Ordering::Relaxed);
    }
}

impl Default for SlidingWindowReservoir {
    fn default() -> Self {
        Self::new()
    }
}

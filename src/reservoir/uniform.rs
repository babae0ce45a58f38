//! Vitter's Algorithm R over a fixed-size array.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{MetricsError, Result};
use crate::reservoir::{Snapshot, DEFAULT_RESERVOIR_SIZE};
use crate::rng;
use crate::sample::WeightedSample;

/// A reservoir retaining a uniform random sample of every value it has ever seen.
///
/// Every observation has an equal probability of surviving into the final sample, regardless of
/// when it arrived — unlike [`SlidingWindowReservoir`](super::SlidingWindowReservoir), a value
/// recorded at the very start of the process can still be present after ten million later
/// updates.
pub struct UniformReservoir {
    slots: Box<[Mutex<Option<WeightedSample>>]>,
    count: AtomicU64,
}

impl UniformReservoir {
    /// Creates a reservoir with the default capacity (1028).
    pub fn new() -> Self {
        Self::with_size(DEFAULT_RESERVOIR_SIZE).expect("default reservoir size is always positive")
    }

    /// Creates a reservoir with the given capacity.
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
        // 1-indexed, per Vitter's Algorithm R.
        let k = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        let sample = WeightedSample::unweighted(value, user_value);

        if k <= self.slots.len() as u64 {
            *self.slots[(k - 1) as usize].lock() = Some(sample);
        } else {
            let r = rng::below(k as usize);
            if r < self.slots.len() {
                *self.slots[r].lock() = Some(sample);
            }
        }
    }

    /// Takes a consistent snapshot of the current contents, optionally resetting afterwards.
    ///
    /// The returned snapshot copies the populated slots into private memory before sorting, so a
    /// concurrent writer can never produce a torn/partially-sorted view.
    pub fn snapshot(&self, reset: bool) -> Snapshot {
        let count = self.count.load(Ordering::Relaxed);
        let samples: Vec<WeightedSample> =
            self.slots.iter().filter_map(|slot| slot.lock().clone()).collect();

        if reset {
            self.reset();
        }

        Snapshot::from_samples(count, samples)
    }

    /// Clears the observation count.
    ///
    /// Faithful to the historical behavior this is modeled on: only the counter is cleared, not
    /// the backing slots. A snapshot taken immediately after `reset` while another thread is
    /// mid-`update` may therefore observe a handful of stale or freshly-written values rather
    /// than a guaranteed-empty reservoir.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

impl Default for UniformReservoir {
    fn default() -> Self {
        Self::new()
    }
}

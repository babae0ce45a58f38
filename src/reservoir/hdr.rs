//! A high-dynamic-range, logarithmic-bucket histogram with a bounded relative error.
//!
//! Every recorded value maps to exactly one bucket; buckets near the origin have unit
//! resolution, and resolution halves (in absolute terms) each time the tracked range doubles, so
//! the relative error of any bucket's representative value is bounded by the configured
//! significant-digit precision regardless of how large the recorded values get.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{MetricsError, Result};
use crate::reservoir::Snapshot;
use crate::sample::WeightedSample;

/// Tracks the exact min/max value plus whichever user value was attached to it, since the
/// bucketed counts array only preserves an approximate representative value.
struct Extreme {
    value: AtomicI64,
    user_value: Mutex<Option<String>>,
}

impl Extreme {
    fn new(initial: i64) -> Self {
        Self { value: AtomicI64::new(initial), user_value: Mutex::new(None) }
    }

    fn observe_min(&self, value: i64, user_value: &Option<String>) {
        loop {
            let current = self.value.load(Ordering::Relaxed);
            if value >= current {
                return;
            }
            if self
                .value
                .compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                *self.user_value.lock() = user_value.clone();
                return;
            }
        }
    }

    fn observe_max(&self, value: i64, user_value: &Option<String>) {
        loop {
            let current = self.value.load(Ordering::Relaxed);
            if value <= current {
                return;
            }
            if self
                .value
                .compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                *self.user_value.lock() = user_value.clone();
                return;
            }
        }
    }

    fn reset(&self, initial: i64) {
        self.value.store(initial, Ordering::Relaxed);
        *self.user_value.lock() = None;
    }
}

/// A histogram covering `[1, highest_trackable]` with a relative error of roughly `10^-precision`
/// anywhere in that range.
pub struct HdrReservoir {
    counts: Box<[AtomicU64]>,
    highest_trackable: i64,
    sub_bucket_count: u64,
    sub_bucket_half_count: u64,
    min: Extreme,
    max: Extreme,
    last: Mutex<Option<(i64, Option<String>)>>,
}

impl HdrReservoir {
    /// Creates a histogram tracking `[1, highest_trackable]` at the given significant-digit
    /// precision (0 to 5 inclusive).
    pub fn new(highest_trackable: i64, precision: u8) -> Result<Self> {
        if precision > 5 {
            return Err(MetricsError::InvalidPrecision(precision));
        }

        let largest_value_with_single_unit_resolution = 2.0 * 10f64.powi(precision as i32);
        let sub_bucket_count_magnitude =
            (largest_value_with_single_unit_resolution.log2()).ceil().max(1.0) as u32;
        let sub_bucket_count = 1u64 << sub_bucket_count_magnitude;
        let sub_bucket_half_count = sub_bucket_count / 2;

        let mut bucket_count = 0u32;
        let mut smallest_untrackable = sub_bucket_count as i64;
        while smallest_untrackable <= highest_trackable {
            smallest_untrackable = smallest_untrackable.saturating_mul(2);
            bucket_count += 1;
        }

        let counts_len =
            sub_bucket_count as usize + bucket_count as usize * sub_bucket_half_count as usize;
        let counts = (0..counts_len).map(|_| AtomicU64::new(0)).collect();

        Ok(Self {
            counts,
            highest_trackable,
            sub_bucket_count,
            sub_bucket_half_count,
            min: Extreme::new(i64::MAX),
            max: Extreme::new(0),
            last: Mutex::new(None),
        })
    }

    fn counts_index(&self, value: i64) -> usize {
        let value = value.clamp(1, self.highest_trackable) as u64;
        if value < self.sub_bucket_count {
            value as usize
        } else {
            let mut bucket_index = 0u32;
            let mut shifted = value;
            while shifted >= self.sub_bucket_count {
                shifted >>= 1;
                bucket_index += 1;
            }
            let offset = (bucket_index - 1) as usize * self.sub_bucket_half_count as usize
                + (shifted - self.sub_bucket_half_count) as usize;
            self.sub_bucket_count as usize + offset
        }
    }

    fn value_from_index(&self, index: usize) -> i64 {
        if (index as u64) < self.sub_bucket_count {
            index as i64
        } else {
            let shc = self.sub_bucket_half_count as usize;
            let offset = index - self.sub_bucket_count as usize;
            let bucket_index = (offset / shc) as u32 + 1;
            let sub_bucket_index = (offset % shc) + shc;
            (sub_bucket_index as i64) << bucket_index
        }
    }

    /// Records a value, with an optional user-supplied tag.
    ///
    /// Incrementing a bucket is lock-free; only updating the tracked min/max user value (when
    /// this observation turns out to be a new extreme) takes a lock.
    pub fn update(&self, value: i64, user_value: Option<String>) {
        let index = self.counts_index(value);
        self.counts[index].fetch_add(1, Ordering::Relaxed);

        self.min.observe_min(value, &user_value);
        self.max.observe_max(value, &user_value);
        *self.last.lock() = Some((value, user_value));
    }

    /// Takes a consistent snapshot of the current contents, optionally resetting afterwards.
    ///
    /// Each populated bucket contributes one [`WeightedSample`] whose weight is its count and
    /// whose value is the bucket's representative (lowest-equivalent) value; the exact recorded
    /// min and max, and their user values, are then patched back in so boundary queries are exact
    /// rather than bucket-approximated.
    pub fn snapshot(&self, reset: bool) -> Snapshot {
        let mut total: u64 = 0;
        let mut samples = Vec::new();
        for (index, cell) in self.counts.iter().enumerate() {
            let count = if reset { cell.swap(0, Ordering::AcqRel) } else { cell.load(Ordering::Relaxed) };
            if count > 0 {
                total += count;
                samples.push(WeightedSample::new(self.value_from_index(index), None, count as f64));
            }
        }

        let mut snapshot = Snapshot::from_samples(total, samples);

        let min_value = self.min.value.load(Ordering::Relaxed);
        let max_value = self.max.value.load(Ordering::Relaxed);
        if max_value > 0 {
            let min_user_value = self.min.user_value.lock().clone();
            let max_user_value = self.max.user_value.lock().clone();
            snapshot.override_extremes(
                Some((min_value, min_user_value)),
                Some((max_value, max_user_value)),
            );
        }

        if reset {
            self.min.reset(i64::MAX);
            self.max.reset(0);
            *self.last.lock() = None;
        }

        snapshot
    }

    /// Clears every bucket and the tracked min/max.
    pub fn reset(&self) {
        for cell in self.counts.iter() {
            cell.store(0, Ordering::Relaxed);
        }
        self.min.reset(i64::MAX);
        self.max.reset(0);
        *self.last.lock() = None;
    }

    /// The most recently recorded value and its user value, if any observation has landed yet.
    pub fn last(&self) -> Option<(i64, Option<String>)> {
        self.last.lock().clone()
    }
}

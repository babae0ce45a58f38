//! Reservoir sampling strategies and their shared snapshot representation.
//!
//! All four reservoir kinds ultimately reduce to the same thing: a bounded set of
//! [`WeightedSample`]s (unweighted reservoirs just use a uniform weight of 1.0), aggregated into
//! one [`Snapshot`] type that mirrors Dropwizard-style metrics libraries' `WeightedSnapshot`
//! (see the pack's `witchcraft-metrics::reservoir` for the `Reservoir`/`Snapshot` trait split this
//! module follows in spirit, collapsed here into one concrete `Snapshot` type since every
//! reservoir kind needs the exact same aggregate math).

mod decaying;
mod hdr;
mod sliding_window;
mod uniform;

pub use decaying::ExponentiallyDecayingReservoir;
pub use hdr::HdrReservoir;
pub use sliding_window::SlidingWindowReservoir;
pub use uniform::UniformReservoir;

use crate::error::{MetricsError, Result};
use crate::sample::WeightedSample;

/// The default reservoir capacity, matching Dropwizard Metrics' historical default.
pub const DEFAULT_RESERVOIR_SIZE: usize = 1028;

/// An immutable, point-in-time view of a reservoir's contents.
///
/// Every aggregate (`mean`, `std_dev`, any percentile) is a deterministic function of the sampled
/// data captured at construction time; nothing here re-reads the live reservoir.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    count: u64,
    values: Vec<i64>,
    // Exclusive-prefix-sum of normalized weights, aligned with `values`: cumulative[i] is the
    // total normalized weight of every sample strictly before index i.
    cumulative: Vec<f64>,
    min_user_value: Option<String>,
    max_user_value: Option<String>,
    mean: f64,
    std_dev: f64,
}

impl Snapshot {
    /// Builds a snapshot from the total observation count and the (possibly down-sampled) stored
    /// samples. `samples` need not be sorted; this sorts them by value.
    pub fn from_samples(count: u64, mut samples: Vec<WeightedSample>) -> Self {
        samples.sort_by_key(|s| s.value);

        if samples.is_empty() {
            return Snapshot {
                count,
                values: Vec::new(),
                cumulative: Vec::new(),
                min_user_value: None,
                max_user_value: None,
                mean: 0.0,
                std_dev: 0.0,
            };
        }

        let min_user_value = samples.first().and_then(|s| s.user_value.clone());
        let max_user_value = samples.last().and_then(|s| s.user_value.clone());

        let total_weight: f64 = samples.iter().map(|s| s.weight).sum();
        let norm_weights: Vec<f64> = if total_weight > 0.0 {
            samples.iter().map(|s| s.weight / total_weight).collect()
        } else {
            // All-zero weights (degenerate, but guard against division by zero): fall back to a
            // uniform distribution across the stored samples.
            vec![1.0 / samples.len() as f64; samples.len()]
        };

        let mut cumulative = Vec::with_capacity(norm_weights.len());
        let mut running = 0.0;
        for w in &norm_weights {
            cumulative.push(running);
            running += w;
        }

        let values: Vec<i64> = samples.iter().map(|s| s.value).collect();

        let mean: f64 =
            values.iter().zip(&norm_weights).map(|(v, w)| *v as f64 * w).sum();
        let std_dev = if values.len() < 2 {
            0.0
        } else {
            let variance: f64 = values
                .iter()
                .zip(&norm_weights)
                .map(|(v, w)| w * (*v as f64 - mean).powi(2))
                .sum();
            variance.sqrt()
        };

        Snapshot { count, values, cumulative, min_user_value, max_user_value, mean, std_dev }
    }

    /// The total number of observations that have ever reached the reservoir, including ones
    /// that were sampled out.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The number of samples actually held in this snapshot (`<=` the reservoir's capacity).
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// The smallest recorded value, or 0 if empty.
    pub fn min(&self) -> i64 {
        self.values.first().copied().unwrap_or(0)
    }

    /// The largest recorded value, or 0 if empty.
    pub fn max(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    /// The user value tagged on the minimum-valued sample, if any.
    pub fn min_user_value(&self) -> Option<&str> {
        self.min_user_value.as_deref()
    }

    /// The user value tagged on the maximum-valued sample, if any.
    pub fn max_user_value(&self) -> Option<&str> {
        self.max_user_value.as_deref()
    }

    /// The weighted mean of the sampled values.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// The weighted population standard deviation of the sampled values.
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// The sampled values, sorted ascending.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// The 50th percentile.
    pub fn median(&self) -> f64 {
        self.get_value(0.5).expect("0.5 is always a valid quantile")
    }

    /// The 75th percentile.
    pub fn p75(&self) -> f64 {
        self.get_value(0.75).expect("0.75 is always a valid quantile")
    }

    /// The 95th percentile.
    pub fn p95(&self) -> f64 {
        self.get_value(0.95).expect("0.95 is always a valid quantile")
    }

    /// The 98th percentile.
    pub fn p98(&self) -> f64 {
        self.get_value(0.98).expect("0.98 is always a valid quantile")
    }

    /// The 99th percentile.
    pub fn p99(&self) -> f64 {
        self.get_value(0.99).expect("0.99 is always a valid quantile")
    }

    /// The 99.9th percentile.
    pub fn p999(&self) -> f64 {
        self.get_value(0.999).expect("0.999 is always a valid quantile")
    }

    /// Overrides the reported min/max with an exact tracked value and its user value.
    ///
    /// The HDR reservoir's buckets only preserve an approximate representative value, so it
    /// tracks the true min/max separately and patches them in here after `from_samples` has
    /// already built the rest of the snapshot from bucket counts.
    pub(crate) fn override_extremes(
        &mut self,
        min: Option<(i64, Option<String>)>,
        max: Option<(i64, Option<String>)>,
    ) {
        if let Some((value, user_value)) = min {
            if let Some(first) = self.values.first_mut() {
                *first = value;
            }
            self.min_user_value = user_value;
        }
        if let Some((value, user_value)) = max {
            if let Some(last) = self.values.last_mut() {
                *last = value;
            }
            self.max_user_value = user_value;
        }
    }

    /// Returns a new snapshot with every sampled value multiplied by `factor`, as used by
    /// [`TimerValue::scale`](crate::value::TimerValue::scale) to convert a histogram of
    /// nanosecond durations into another [`TimeUnit`](crate::time_unit::TimeUnit).
    ///
    /// The normalized cumulative weights are invariant under a uniform rescaling of the
    /// underlying values, so only `values`, `mean`, and `std_dev` need to change.
    pub(crate) fn scale(&self, factor: f64) -> Snapshot {
        Snapshot {
            count: self.count,
            values: self.values.iter().map(|v| (*v as f64 * factor).round() as i64).collect(),
            cumulative: self.cumulative.clone(),
            min_user_value: self.min_user_value.clone(),
            max_user_value: self.max_user_value.clone(),
            mean: self.mean * factor,
            std_dev: self.std_dev * factor,
        }
    }

    /// Returns the value at an arbitrary quantile `q` in `[0.0, 1.0]`.
    ///
    /// `get_value(0.0)` is always the minimum and `get_value(1.0)` is always the maximum;
    /// `get_value` is monotonic non-decreasing in `q`.
    pub fn get_value(&self, q: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&q) || q.is_nan() {
            return Err(MetricsError::InvalidQuantile(q));
        }

        if self.values.is_empty() {
            return Ok(0.0);
        }

        let pos: i64 = match self.cumulative.binary_search_by(|c| c.partial_cmp(&q).unwrap()) {
            Ok(pos) => pos as i64,
            Err(insertion) => insertion as i64 - 1,
        };

        if pos < 1 {
            Ok(self.values[0] as f64)
        } else if pos as usize >= self.values.len() {
            Ok(*self.values.last().unwrap() as f64)
        } else {
            Ok(self.values[pos as usize] as f64)
        }
    }
}

/// A statistically representative, bounded-memory sample of an unbounded stream of values.
///
/// The four concrete strategies differ only in *which* samples survive; the aggregate math over
/// whatever they keep is identical and lives in [`Snapshot`].
pub enum Reservoir {
    /// Vitter's Algorithm R over a fixed-size array.
    Uniform(UniformReservoir),
    /// A ring buffer retaining only the most recent `N` observations.
    SlidingWindow(SlidingWindowReservoir),
    /// A forward-decay priority sample favoring recent observations.
    ExponentiallyDecaying(ExponentiallyDecayingReservoir),
    /// A logarithmic-bucket histogram with a bounded relative error.
    Hdr(HdrReservoir),
}

impl Reservoir {
    /// Records a value, with an optional user-supplied tag.
    pub fn update(&self, value: i64, user_value: Option<String>) {
        match self {
            Reservoir::Uniform(r) => r.update(value, user_value),
            Reservoir::SlidingWindow(r) => r.update(value, user_value),
            Reservoir::ExponentiallyDecaying(r) => r.update(value, user_value),
            Reservoir::Hdr(r) => r.update(value, user_value),
        }
    }

    /// Takes a consistent snapshot of the current contents, optionally resetting afterwards.
    pub fn snapshot(&self, reset: bool) -> Snapshot {
        match self {
            Reservoir::Uniform(r) => r.snapshot(reset),
            Reservoir::SlidingWindow(r) => r.snapshot(reset),
            Reservoir::ExponentiallyDecaying(r) => r.snapshot(reset),
            Reservoir::Hdr(r) => r.snapshot(reset),
        }
    }

    /// Resets the reservoir to its initial, empty state.
    pub fn reset(&self) {
        match self {
            Reservoir::Uniform(r) => r.reset(),
            Reservoir::SlidingWindow(r) => r.reset(),
            Reservoir::ExponentiallyDecaying(r) => r.reset(),
            Reservoir::Hdr(r) => r.reset(),
        }
    }
}

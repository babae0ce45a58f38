//! A forward-decay priority sample favoring recent observations.
//!
//! Grounded on the Cormode/Shkapenyuk/Srivastava/Xu forward-decay algorithm as implemented by
//! Dropwizard Metrics' `ExponentiallyDecayingReservoir`, and structurally on the pack's
//! `witchcraft-metrics::reservoir::ExponentiallyDecayingReservoir`, which likewise wraps its
//! entire sampled state in one `parking_lot::Mutex` guarded by an injected [`Clock`]. Rescaling is
//! driven by an owned [`scheduler::Handle`] rather than checked lazily on the update/snapshot
//! path, matching the lifecycle rule this crate applies to every primitive that owns a periodic
//! tick (see [`Meter`](crate::metrics::Meter)'s identical shape).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::clock::Clock;
use crate::error::{MetricsError, Result};
use crate::reservoir::{Snapshot, DEFAULT_RESERVOIR_SIZE};
use crate::rng;
use crate::sample::WeightedSample;
use crate::scheduler::{self, Handle};

/// Default decay factor, matching Dropwizard Metrics' historical default.
pub const DEFAULT_ALPHA: f64 = 0.015;

/// Default interval between landmark rescales.
pub const DEFAULT_RESCALE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// A totally-ordered wrapper around `f64` priorities, so they can key a `BTreeMap`.
///
/// Priorities are never NaN (they are `exp(..)` divided by a strictly-positive random draw), so
/// `total_cmp` gives a consistent ordering without the partial-order pitfalls of raw `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PriorityKey(f64);

impl Eq for PriorityKey {}

impl PartialOrd for PriorityKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

struct Inner {
    table: BTreeMap<PriorityKey, WeightedSample>,
    count: u64,
    landmark: u64,
}

/// The state a scheduled rescale actually needs to touch. Split out from
/// [`ExponentiallyDecayingReservoir`] so the tick closure can hold an `Arc` to just this, rather
/// than a reference to the reservoir itself (which would be a self-referential struct once the
/// reservoir also owns the [`Handle`] that runs that closure) — the same shape
/// [`Meter`](crate::metrics::Meter) uses for its own tick state.
struct State {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
    size: usize,
    alpha: f64,
}

impl State {
    fn weight(&self, elapsed_since_landmark: f64) -> f64 {
        (self.alpha * elapsed_since_landmark).exp()
    }

    fn update(&self, value: i64, user_value: Option<String>) {
        let now = self.clock.seconds();
        let mut inner = self.inner.lock();

        let elapsed = now.saturating_sub(inner.landmark) as f64;
        let w = self.weight(elapsed);
        let u = rng::unit_interval_exclusive_zero();
        let priority = w / u;

        inner.count += 1;
        let sample = WeightedSample::new(value, user_value, w);

        if inner.table.len() < self.size {
            inner.table.insert(PriorityKey(priority), sample);
        } else if let Some((&min_key, _)) = inner.table.iter().next() {
            if priority > min_key.0 {
                // Loop guards against the vanishingly unlikely case of a priority collision with
                // an existing key; a fresh random draw breaks the tie.
                let mut key = PriorityKey(priority);
                while inner.table.contains_key(&key) {
                    let u = rng::unit_interval_exclusive_zero();
                    key = PriorityKey(w / u);
                }
                inner.table.insert(key, sample);
                inner.table.remove(&min_key);
            }
        }
    }

    /// Re-anchors the landmark to now, rescaling every stored sample's priority and weight by the
    /// decay that elapsed since the previous landmark. Driven by the owning reservoir's
    /// `scheduler::Handle`, not by the update/snapshot path.
    fn rescale(&self) {
        let mut inner = self.inner.lock();
        let now = self.clock.seconds();
        let factor = (-self.alpha * now.saturating_sub(inner.landmark) as f64).exp();

        let rescaled: BTreeMap<PriorityKey, WeightedSample> = inner
            .table
            .iter()
            .map(|(key, sample)| {
                let mut rescaled_sample = sample.clone();
                rescaled_sample.weight *= factor;
                (PriorityKey(key.0 * factor), rescaled_sample)
            })
            .collect();

        inner.table = rescaled;
        inner.landmark = now;
    }

    fn snapshot(&self, reset: bool) -> Snapshot {
        let mut inner = self.inner.lock();
        let count = inner.count;
        let samples: Vec<WeightedSample> = inner.table.values().cloned().collect();

        if reset {
            inner.table.clear();
            inner.count = 0;
            inner.landmark = self.clock.seconds();
        }

        Snapshot::from_samples(count, samples)
    }

    fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.table.clear();
        inner.count = 0;
        inner.landmark = self.clock.seconds();
    }
}

/// A reservoir whose stored samples are weighted towards recent observations via exponential
/// forward-decay, so that a snapshot reflects "what's been happening lately" rather than the
/// entire lifetime of the process.
///
/// Owns a [`Handle`] driving `rescale()` at `rescale_interval` (one hour by default); the handle
/// is started at construction and stopped when the reservoir is dropped, mirroring the lifecycle
/// rule [`Meter`](crate::metrics::Meter) follows for its own tick handle.
pub struct ExponentiallyDecayingReservoir {
    state: Arc<State>,
    tick_handle: Mutex<Option<Handle>>,
}

impl ExponentiallyDecayingReservoir {
    /// Creates a reservoir with the default capacity, decay factor, and rescale interval, using
    /// the given clock as its time source.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_params(clock, DEFAULT_RESERVOIR_SIZE, DEFAULT_ALPHA, DEFAULT_RESCALE_INTERVAL)
            .expect("default reservoir parameters are always valid")
    }

    /// Creates a reservoir with explicit capacity, decay factor, and rescale interval.
    ///
    /// Returns [`MetricsError::InvalidCapacity`] if `size` is zero, or
    /// [`MetricsError::InvalidTickInterval`] if `rescale_interval` is zero.
    pub fn with_params(
        clock: Arc<dyn Clock>,
        size: usize,
        alpha: f64,
        rescale_interval: Duration,
    ) -> Result<Self> {
        if size == 0 {
            return Err(MetricsError::InvalidCapacity);
        }

        let landmark = clock.seconds();
        let inner = Inner { table: BTreeMap::new(), count: 0, landmark };
        let state = Arc::new(State { inner: Mutex::new(inner), clock, size, alpha });

        let tick_state = state.clone();
        let handle = scheduler::start(rescale_interval, move || tick_state.rescale())?;

        Ok(Self { state, tick_handle: Mutex::new(Some(handle)) })
    }

    /// Records a value, with an optional user-supplied tag.
    pub fn update(&self, value: i64, user_value: Option<String>) {
        self.state.update(value, user_value);
    }

    /// Takes a consistent snapshot of the current contents, optionally resetting afterwards.
    pub fn snapshot(&self, reset: bool) -> Snapshot {
        self.state.snapshot(reset)
    }

    /// Clears the stored samples, the observation count, and re-anchors the landmark to now.
    pub fn reset(&self) {
        self.state.reset();
    }
}

impl Drop for ExponentiallyDecayingReservoir {
    fn drop(&mut self) {
        if let Some(mut handle) = self.tick_handle.lock().take() {
            handle.stop();
        }
    }
}

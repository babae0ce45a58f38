//! Time sources injectable into the primitives that need one.
//!
//! The exponentially-decaying reservoir needs a landmark time, and the meter rate engine needs
//! wall-clock-adjacent timestamps to compute `mean_rate`. Both accept any [`Clock`] implementation,
//! which keeps this crate decoupled from any particular notion of "now" — callers embedding this
//! crate into a deterministic test harness can swap in [`quanta::Clock::mock`] the same way
//! `metrics-util`'s `recency` module and the historical `metrics::data::histogram` tests do.

use std::time::{SystemTime, UNIX_EPOCH};

/// A source of monotonic time.
///
/// Implementations must be cheap to clone (most are a handful of words or an `Arc`) since every
/// reservoir and meter holds one.
pub trait Clock: Send + Sync {
    /// Returns the current time, in nanoseconds, from an arbitrary but fixed epoch.
    ///
    /// The value is only meaningful relative to other calls against the same `Clock` instance;
    /// it is not wall-clock time and may not be comparable across processes.
    fn nanoseconds(&self) -> u64;

    /// Returns the current time, in whole seconds, truncating any fractional part.
    fn seconds(&self) -> u64 {
        self.nanoseconds() / 1_000_000_000
    }

    /// Returns the current wall-clock time, for display/export purposes only.
    fn utc_datetime(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// The default, high-resolution monotonic clock.
///
/// Backed by [`quanta::Clock`], which prefers the platform's TSC (falling back to a coarser
/// monotonic source where unavailable) and supports a deterministic mock mode for tests.
#[derive(Clone)]
pub struct MonotonicClock {
    inner: quanta::Clock,
}

impl MonotonicClock {
    /// Creates a new monotonic clock.
    pub fn new() -> Self {
        Self { inner: quanta::Clock::new() }
    }

    /// Creates a mock clock pair for deterministic tests.
    ///
    /// The returned [`quanta::Mock`] lets a test advance time explicitly; see `quanta`'s docs.
    pub fn mock() -> (Self, std::sync::Arc<quanta::Mock>) {
        let (inner, mock) = quanta::Clock::mock();
        (Self { inner }, mock)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn nanoseconds(&self) -> u64 {
        self.inner.now().as_u64()
    }
}

/// A wall-clock-derived time source, for platforms without a usable monotonic/TSC source.
///
/// Unlike [`MonotonicClock`], successive readings are not guaranteed to be non-decreasing if the
/// system clock is stepped backwards (e.g. by NTP). Prefer [`MonotonicClock`] unless there is a
/// specific reason to avoid it.
#[derive(Clone, Copy, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn nanoseconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

//! The exponentially-weighted moving average rate engine shared by every [`Meter`](crate::metrics::Meter).
//!
//! Grounded on Dropwizard Metrics' `EWMA`/`Meter` pair, structurally mirrored by the pack's
//! `witchcraft-metrics::meter::SimpleMeter`: a tick-driven EWMA over 1/5/15-minute windows plus a
//! lifetime total, so `mean_rate` (computed from the lifetime total) and the windowed rates
//! (computed from periodic ticks) can diverge exactly the way Dropwizard's do for a bursty
//! workload.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::adder::StripedAdder;
use crate::atomics::{AtomicDouble, AtomicLong};

/// The scheduler tick interval a [`SimpleMeter`] assumes unless told otherwise.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// A point-in-time read of a [`SimpleMeter`], already converted to a per-second basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSnapshot {
    /// Total observations across the meter's lifetime (or since its last reset).
    pub count: i64,
    /// `count / elapsed`, expressed as events per second.
    pub mean_rate: f64,
    /// The 1-minute exponentially-weighted moving average, in events per second.
    pub m1: f64,
    /// The 5-minute exponentially-weighted moving average, in events per second.
    pub m5: f64,
    /// The 15-minute exponentially-weighted moving average, in events per second.
    pub m15: f64,
}

/// A tick-driven EWMA rate engine over 1/5/15-minute windows, plus a lifetime count.
///
/// `mark` is lock-free and only ever touches a [`StripedAdder`]; all of the EWMA math happens in
/// `tick`, which a [`Meter`](crate::metrics::Meter) drives from its own scheduler handle.
pub struct SimpleMeter {
    uncounted: StripedAdder,
    total: AtomicLong,
    m1: AtomicDouble,
    m5: AtomicDouble,
    m15: AtomicDouble,
    initialized: AtomicBool,
    tick_interval_nanos: f64,
    alpha_1: f64,
    alpha_5: f64,
    alpha_15: f64,
}

fn alpha_for(tick_interval: Duration, window_minutes: f64) -> f64 {
    1.0 - (-tick_interval.as_secs_f64() / (60.0 * window_minutes)).exp()
}

impl SimpleMeter {
    /// Creates a meter assuming the default 5-second tick interval.
    pub fn new() -> Self {
        Self::with_tick_interval(DEFAULT_TICK_INTERVAL)
    }

    /// Creates a meter whose EWMA smoothing constants are derived from `tick_interval`.
    ///
    /// The caller is responsible for actually driving `tick()` at this interval (typically via
    /// [`crate::scheduler`]); this constructor only computes the alphas that interval implies.
    pub fn with_tick_interval(tick_interval: Duration) -> Self {
        Self {
            uncounted: StripedAdder::new(),
            total: AtomicLong::new(0),
            m1: AtomicDouble::new(0.0),
            m5: AtomicDouble::new(0.0),
            m15: AtomicDouble::new(0.0),
            initialized: AtomicBool::new(false),
            tick_interval_nanos: tick_interval.as_nanos() as f64,
            alpha_1: alpha_for(tick_interval, 1.0),
            alpha_5: alpha_for(tick_interval, 5.0),
            alpha_15: alpha_for(tick_interval, 15.0),
        }
    }

    /// Records `n` observations since the last tick.
    pub fn mark(&self, n: u64) {
        self.uncounted.add(n);
    }

    /// Advances the EWMAs by one tick's worth of whatever was marked since the previous tick.
    ///
    /// The instantaneous rate used to update the EWMAs is `count / tick_interval_nanos`, matching
    /// the historical `SimpleMeter.Tick` behavior this is grounded on: the rate is per-nanosecond
    /// internally and is only scaled to per-second when read back out via [`RateSnapshot`].
    pub fn tick(&self) {
        let count = self.uncounted.get_and_reset();
        self.total.add(count);

        let instant = count as f64 / self.tick_interval_nanos;

        if self.initialized.load(Ordering::Acquire) {
            self.m1.set(self.m1.get() + self.alpha_1 * (instant - self.m1.get()));
            self.m5.set(self.m5.get() + self.alpha_5 * (instant - self.m5.get()));
            self.m15.set(self.m15.get() + self.alpha_15 * (instant - self.m15.get()));
        } else {
            self.m1.set(instant);
            self.m5.set(instant);
            self.m15.set(instant);
            self.initialized.store(true, Ordering::Release);
        }
    }

    /// Produces a per-second snapshot of the meter's current state, given the number of
    /// nanoseconds elapsed since the meter (or its owning [`Meter`](crate::metrics::Meter)) started.
    pub fn snapshot(&self, elapsed_nanos: u64) -> RateSnapshot {
        let count = self.total.get() + self.uncounted.get_value();
        let mean_rate = if elapsed_nanos == 0 { 0.0 } else { count as f64 / elapsed_nanos as f64 * 1e9 };

        RateSnapshot {
            count,
            mean_rate,
            m1: self.m1.get() * 1e9,
            m5: self.m5.get() * 1e9,
            m15: self.m15.get() * 1e9,
        }
    }

    /// Clears the lifetime count and every EWMA, as if the meter were freshly constructed.
    pub fn reset(&self) {
        self.uncounted.reset();
        self.total.set(0);
        self.m1.set(0.0);
        self.m5.set(0.0);
        self.m15.set(0.0);
        self.initialized.store(false, Ordering::Release);
    }
}

impl Default for SimpleMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_are_zero_before_the_first_tick() {
        let meter = SimpleMeter::new();
        meter.mark(5);
        let snapshot = meter.snapshot(1_000_000_000);
        assert_eq!(snapshot.m1, 0.0);
        assert_eq!(snapshot.m5, 0.0);
        assert_eq!(snapshot.m15, 0.0);
        assert_eq!(snapshot.count, 5);
    }

    #[test]
    fn mean_rate_tracks_count_over_elapsed_time() {
        let meter = SimpleMeter::new();
        for _ in 0..10 {
            meter.mark(1);
        }
        let snapshot = meter.snapshot(10_000_000_000);
        assert!((snapshot.mean_rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn warm_up_then_decay_matches_the_worked_example() {
        let meter = SimpleMeter::with_tick_interval(Duration::from_secs(5));
        meter.mark(1);
        meter.tick();

        let snapshot = meter.snapshot(5_000_000_000);
        assert!((snapshot.m1 - 0.2).abs() < 1e-9);

        let m1_after_first = snapshot.m1;
        let m5_after_first = snapshot.m5;

        for _ in 0..4 {
            meter.tick();
        }

        let later = meter.snapshot(25_000_000_000);
        assert!(later.m1 < m1_after_first);
        assert!(later.m5 < m5_after_first);
        // The 5-minute window decays more slowly than the 1-minute window towards zero.
        assert!(later.m5 > later.m1);
    }

    #[test]
    fn reset_clears_counts_and_rates() {
        let meter = SimpleMeter::new();
        meter.mark(100);
        meter.tick();
        meter.reset();

        let snapshot = meter.snapshot(1_000_000_000);
        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.m1, 0.0);
    }
}

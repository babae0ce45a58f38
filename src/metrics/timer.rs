//! Duration recording: a [`Histogram`] of elapsed nanoseconds plus a [`Meter`] of completions,
//! with in-flight session tracking and a scoped, guaranteed-release recording context.

use std::sync::Arc;
use std::time::Duration;

use crate::adder::StripedAdder;
use crate::clock::Clock;
use crate::metrics::{Histogram, Meter};
use crate::reservoir::Reservoir;
use crate::time_unit::TimeUnit;
use crate::value::TimerValue;

/// The start marker returned by [`Timer::start_recording`], to be handed back to
/// [`Timer::end_recording`].
///
/// Opaque on purpose: the only valid operation on one is passing it to the `Timer` that produced
/// it.
#[derive(Debug, Clone, Copy)]
pub struct TimerStart(u64);

/// A composite primitive measuring how often something happens and how long each occurrence
/// takes: a [`Histogram`] of durations (in nanoseconds), a [`Meter`] of completion counts, and two
/// striped counters tracking currently in-flight sessions and the lifetime total recorded time.
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
    active_sessions: StripedAdder,
    total_recorded_nanos: StripedAdder,
    clock: Arc<dyn Clock>,
}

impl Timer {
    /// Creates a timer backed by the given reservoir and clock.
    pub fn new(clock: Arc<dyn Clock>, reservoir: Reservoir) -> Self {
        Self {
            histogram: Histogram::new(reservoir),
            meter: Meter::new(clock.clone()),
            active_sessions: StripedAdder::new(),
            total_recorded_nanos: StripedAdder::new(),
            clock,
        }
    }

    /// Records a pre-measured duration, with an optional user-supplied tag.
    ///
    /// A negative duration (which, per the crate's error-handling policy, can only arise from a
    /// clock read race on the caller's side) is silently dropped rather than poisoning the
    /// histogram.
    pub fn record(&self, duration: Duration, user_value: Option<String>) {
        self.record_nanos(duration.as_nanos() as i64, user_value);
    }

    /// Records a pre-measured duration expressed in an arbitrary [`TimeUnit`], with an optional
    /// user-supplied tag.
    pub fn record_value(&self, value: i64, unit: TimeUnit, user_value: Option<String>) {
        let nanos = (value as f64 * unit.scaling_factor_to(TimeUnit::Nanoseconds)).round() as i64;
        self.record_nanos(nanos, user_value);
    }

    fn record_nanos(&self, nanos: i64, user_value: Option<String>) {
        if nanos < 0 {
            return;
        }

        self.histogram.update(nanos, user_value);
        self.meter.mark(1);
        self.total_recorded_nanos.add(nanos as u64);
    }

    /// Runs `action`, recording its wall-clock duration regardless of whether it returns normally
    /// or panics, and bumping `active_sessions` for its duration.
    pub fn time<R>(&self, user_value: Option<String>, action: impl FnOnce() -> R) -> R {
        let _ctx = self.new_context(user_value);
        action()
    }

    /// Begins a recording session: bumps `active_sessions` and returns a marker to later pass to
    /// [`Timer::end_recording`].
    ///
    /// Prefer [`Timer::new_context`] unless you specifically need the start/end split (e.g.
    /// because the start and end happen in different callback invocations where an RAII guard
    /// can't span the gap).
    pub fn start_recording(&self) -> TimerStart {
        self.active_sessions.increment();
        TimerStart(self.clock.nanoseconds())
    }

    /// Ends a recording session started with `start`: decrements `active_sessions` and returns the
    /// elapsed nanoseconds. Does not itself record into the histogram/meter — call
    /// [`Timer::record_value`] (or [`Timer::record`]) with the result if that's wanted.
    pub fn end_recording(&self, start: TimerStart) -> i64 {
        self.active_sessions.decrement();
        (self.clock.nanoseconds() as i64).saturating_sub(start.0 as i64)
    }

    /// Begins a scoped recording session: bumps `active_sessions` immediately, and returns a
    /// guard that records the elapsed duration and decrements `active_sessions` when dropped,
    /// regardless of how the scope is exited (normal return, early return, or panic).
    ///
    /// The guard is intentionally not `Clone`: exactly one release must run per acquisition.
    pub fn new_context(&self, user_value: Option<String>) -> TimerContext<'_> {
        self.active_sessions.increment();
        TimerContext { timer: self, start_nanos: self.clock.nanoseconds(), user_value }
    }

    /// Takes a point-in-time read of the timer: its rate, its latency distribution, the number of
    /// currently in-flight sessions, and the lifetime total recorded time (all duration fields in
    /// nanoseconds; use [`TimerValue::scale`] to convert). Optionally resets the rate, the
    /// histogram, and the lifetime total.
    pub fn get_value(&self, reset: bool) -> TimerValue {
        let rate = self.meter.get_value(reset);
        let histogram = self.histogram.get_value(reset);
        let active_sessions = self.active_sessions.get_value();
        let total_time =
            if reset { self.total_recorded_nanos.get_and_reset() } else { self.total_recorded_nanos.get_value() };

        TimerValue { rate, histogram, active_sessions, total_time, duration_unit: TimeUnit::Nanoseconds }
    }

    /// Resets the rate, the histogram, and the lifetime total recorded time. Does not affect
    /// `active_sessions`, which reflects live in-flight work rather than historical data.
    pub fn reset(&self) {
        self.meter.reset();
        self.histogram.reset();
        let _ = self.total_recorded_nanos.get_and_reset();
    }
}

/// A scoped, guaranteed-release recording session returned by [`Timer::new_context`].
///
/// On drop, decrements the owning timer's `active_sessions` and records the elapsed duration —
/// on every exit path, including an unwinding panic. Not `Clone`: copying the handle would let
/// more than one release run for a single acquisition.
pub struct TimerContext<'a> {
    timer: &'a Timer,
    start_nanos: u64,
    user_value: Option<String>,
}

impl Drop for TimerContext<'_> {
    fn drop(&mut self) {
        self.timer.active_sessions.decrement();
        let elapsed = self.timer.clock.nanoseconds().saturating_sub(self.start_nanos) as i64;
        self.timer.record_nanos(elapsed, self.user_value.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MonotonicClock;
    use crate::reservoir::UniformReservoir;

    fn fresh() -> (Timer, Arc<quanta::Mock>) {
        let (clock, mock) = MonotonicClock::mock();
        let clock: Arc<dyn Clock> = Arc::new(clock);
        let timer = Timer::new(clock, Reservoir::Uniform(UniformReservoir::with_size(100).unwrap()));
        (timer, mock)
    }

    #[test]
    fn recording_a_duration_updates_histogram_and_meter() {
        let (timer, _mock) = fresh();
        timer.record(Duration::from_millis(50), Some("id-42".to_owned()));

        let value = timer.get_value(false);
        assert_eq!(value.histogram.last_value, Some(50_000_000));
        assert_eq!(value.histogram.last_user_value, Some("id-42".to_owned()));
        assert_eq!(value.rate.count, 1);
        assert_eq!(value.total_time, 50_000_000);
    }

    #[test]
    fn negative_duration_is_silently_dropped() {
        let (timer, _mock) = fresh();
        timer.record_nanos(-1, None);
        assert_eq!(timer.get_value(false).rate.count, 0);
    }

    #[test]
    fn scoped_context_records_on_drop_and_releases_active_sessions() {
        let (timer, mock) = fresh();
        {
            let _ctx = timer.new_context(Some("id-42".to_owned()));
            assert_eq!(timer.get_value(false).active_sessions, 1);
            mock.increment(Duration::from_millis(50));
        }

        let value = timer.get_value(false);
        assert_eq!(value.active_sessions, 0);
        assert_eq!(value.histogram.last_user_value, Some("id-42".to_owned()));
        assert!(value.histogram.last_value.unwrap() >= 40_000_000);
    }

    #[test]
    fn scoped_context_releases_even_when_the_scope_unwinds() {
        let (timer, _mock) = fresh();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ctx = timer.new_context(None);
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(timer.get_value(false).active_sessions, 0);
    }

    #[test]
    fn start_end_recording_pair_computes_elapsed_and_active_sessions() {
        let (timer, mock) = fresh();
        let start = timer.start_recording();
        assert_eq!(timer.get_value(false).active_sessions, 1);

        mock.increment(Duration::from_millis(10));
        let elapsed = timer.end_recording(start);
        assert!(elapsed >= 10_000_000);
        assert_eq!(timer.get_value(false).active_sessions, 0);
    }

    #[test]
    fn time_runs_the_action_and_records_its_duration() {
        let (timer, mock) = fresh();
        let result = timer.time(None, || {
            mock.increment(Duration::from_millis(5));
            42
        });
        assert_eq!(result, 42);
        assert_eq!(timer.get_value(false).rate.count, 1);
    }
}

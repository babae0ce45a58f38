//! The concurrent metric-primitive and sampling/aggregation engine underneath the metrics
//! ecosystem.
//!
//! This crate is the kernel a metrics registry embeds: [`metrics::Counter`], [`metrics::Meter`],
//! [`metrics::Histogram`], [`metrics::Timer`], and [`metrics::Gauge`] primitives, the four
//! [`reservoir`] sampling strategies that feed histograms, and the [`value`] objects an exporter
//! reads back out. It does not know about metric names, tags, a registry tree, or any particular
//! wire format — an embedding application owns that layer and calls down into this one.
//!
//! # Layout
//!
//! - [`adder`] / [`atomics`] — wait-free-on-the-happy-path counters and single-word atomic cells.
//! - [`clock`] / [`scheduler`] — the injectable time source and periodic tick scheduler every
//!   rate-driven primitive is built on.
//! - [`reservoir`] — the four sampling strategies ([`reservoir::UniformReservoir`],
//!   [`reservoir::SlidingWindowReservoir`], [`reservoir::ExponentiallyDecayingReservoir`],
//!   [`reservoir::HdrReservoir`]) and their shared [`reservoir::Snapshot`] aggregate.
//! - [`rate`] — [`rate::SimpleMeter`], the tick-driven 1/5/15-minute EWMA engine.
//! - [`metrics`] — the five primitives applications actually construct and update.
//! - [`value`] — the immutable, unit-scalable value objects `get_value` returns.
//! - [`error`] / [`sink`] — the read-path error type and the injected background-failure sink.

pub mod adder;
pub mod atomics;
pub mod clock;
pub mod error;
mod items;
pub mod metrics;
pub mod rate;
pub mod reservoir;
pub mod rng;
pub mod sample;
pub mod scheduler;
pub mod sink;
pub mod time_unit;
pub mod value;

pub use error::{MetricsError, Result};
pub use metrics::{Counter, Gauge, Histogram, Meter, Timer, TimerContext, TimerStart};
pub use reservoir::{
    ExponentiallyDecayingReservoir, HdrReservoir, Reservoir, SlidingWindowReservoir, Snapshot,
    UniformReservoir,
};
pub use sample::WeightedSample;
pub use time_unit::TimeUnit;
pub use value::{CounterItemValue, CounterValue, HistogramValue, MeterSetItem, MeterValue, MetricValue, TimerValue};

#[cfg(test)]
mod tests {
    //! End-to-end scenarios spanning more than one module, exercising primitives the way an
    //! embedding registry would: construct, drive concurrently, read back a value object.

    use std::sync::Arc;
    use std::time::Duration;

    use crate::clock::MonotonicClock;
    use crate::metrics::{Counter, Histogram, Timer};
    use crate::reservoir::{Reservoir, SlidingWindowReservoir, UniformReservoir};

    #[test]
    fn counter_items_percent_end_to_end() {
        let counter = Counter::new();
        counter.increment_item("a", 3);
        counter.increment_item("b", 1);

        let value = counter.get_value(false);
        assert_eq!(value.count, 4);
        assert_eq!(value.items[0].key, "a");
        assert!((value.items[0].percent - 75.0).abs() < 1e-9);
        assert_eq!(value.items[1].key, "b");
        assert!((value.items[1].percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn sliding_window_wraps_as_specified() {
        let histogram =
            Histogram::new(Reservoir::SlidingWindow(SlidingWindowReservoir::with_size(4).unwrap()));
        for v in [1, 2, 3, 4, 5, 6] {
            histogram.update(v, None);
        }

        let value = histogram.get_value(false);
        assert_eq!(value.snapshot.size(), 4);
        assert_eq!(value.snapshot.values(), &[3, 4, 5, 6]);
        assert_eq!(value.snapshot.min(), 3);
        assert_eq!(value.snapshot.max(), 6);
    }

    #[test]
    fn uniform_reservoir_stays_bounded_under_heavy_load() {
        let histogram = Histogram::new(Reservoir::Uniform(UniformReservoir::with_size(10).unwrap()));
        for v in 0..10_000 {
            histogram.update(v, None);
        }

        let value = histogram.get_value(false);
        assert_eq!(value.snapshot.size(), 10);
        assert_eq!(value.snapshot.count(), 10_000);
    }

    #[test]
    fn timer_scoped_context_releases_session_and_records_duration() {
        let (clock, mock) = MonotonicClock::mock();
        let clock: Arc<dyn crate::clock::Clock> = Arc::new(clock);
        let timer = Timer::new(clock, Reservoir::Uniform(UniformReservoir::with_size(100).unwrap()));

        {
            let _ctx = timer.new_context(Some("id-42".to_owned()));
            mock.increment(Duration::from_millis(50));
        }

        let value = timer.get_value(false);
        assert_eq!(value.active_sessions, 0);
        assert_eq!(value.histogram.last_user_value, Some("id-42".to_owned()));
        let last_value_ns = value.histogram.last_value.unwrap();
        assert!((40_000_000..=80_000_000).contains(&last_value_ns));
    }

    #[test]
    fn snapshot_after_reset_reports_all_zero_until_updated_again() {
        let counter = Counter::new();
        counter.increment_by(10);
        counter.reset();

        let value = counter.get_value(false);
        assert_eq!(value.count, 0);

        let histogram = Histogram::new(Reservoir::Uniform(UniformReservoir::with_size(10).unwrap()));
        histogram.update(5, None);
        let reset_value = histogram.get_value(true);
        assert_eq!(reset_value.snapshot.count(), 5);

        let after_reset = histogram.get_value(false);
        assert_eq!(after_reset.snapshot.count(), 0);
    }
}

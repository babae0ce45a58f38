//! The value objects exporters consume: immutable snapshots of a primitive's current state, plus
//! the pure unit-scaling transforms that convert them between [`TimeUnit`]s.
//!
//! Grounded on the historical `metrics::data` module's `Counter`/`Histogram`/`Meter`/`Gauge`
//! value types (see `metrics/src/data/*.rs` in the pack), generalized here to the dynamic-dispatch
//! shape called for in the design notes: a small closed set of tagged variants
//! ([`MetricValue`]) rather than open polymorphism, since every consumer (exporter, filter) ends
//! up pattern-matching on "what kind of metric is this" anyway.

use crate::reservoir::Snapshot;
use crate::time_unit::TimeUnit;

/// A single per-item row of a [`CounterValue`].
#[derive(Debug, Clone, PartialEq)]
pub struct CounterItemValue {
    /// The item's tag.
    pub key: String,
    /// The item's own count.
    pub count: i64,
    /// `count / total_count * 100`, or `0.0` if the counter's total is zero.
    pub percent: f64,
}

/// A point-in-time read of a [`Counter`](crate::metrics::Counter).
#[derive(Debug, Clone, PartialEq)]
pub struct CounterValue {
    /// The counter's total.
    pub count: i64,
    /// Per-item breakdowns, sorted by `percent` descending, ties broken by `key` ascending.
    pub items: Vec<CounterItemValue>,
}

/// One entry in a [`MeterValue`]'s per-item breakdown: a share of the total plus that item's own
/// full rate value (count, mean rate, and windowed EWMAs), nested rather than flattened.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterSetItem {
    /// The item's tag.
    pub key: String,
    /// `item.count / total.count * 100`, or `0.0` if the meter's total is zero.
    pub percent_of_total: f64,
    /// The item's own rate value.
    pub value: MeterValue,
}

/// A point-in-time read of a [`Meter`](crate::metrics::Meter) (or the rate-engine half of a
/// [`Timer`](crate::metrics::Timer)).
#[derive(Debug, Clone, PartialEq)]
pub struct MeterValue {
    /// Total observations across the meter's lifetime (or since its last reset).
    pub count: i64,
    /// `count / elapsed`, in units of `rate_unit`.
    pub mean_rate: f64,
    /// The 1-minute EWMA, in units of `rate_unit`.
    pub m1: f64,
    /// The 5-minute EWMA, in units of `rate_unit`.
    pub m5: f64,
    /// The 15-minute EWMA, in units of `rate_unit`.
    pub m15: f64,
    /// The time unit every rate field above is expressed "per".
    pub rate_unit: TimeUnit,
    /// Per-item breakdowns, sorted by `percent_of_total` descending, ties broken by `key` ascending.
    pub items: Vec<MeterSetItem>,
}

impl MeterValue {
    /// Returns a new value with every rate field (and every nested item's) converted from
    /// `self.rate_unit` to `target`.
    ///
    /// Pure: allocates and returns a new `MeterValue`, leaving `self` untouched.
    pub fn scale(&self, target: TimeUnit) -> MeterValue {
        let factor = self.rate_unit.rate_scaling_factor_to(target);
        MeterValue {
            count: self.count,
            mean_rate: self.mean_rate * factor,
            m1: self.m1 * factor,
            m5: self.m5 * factor,
            m15: self.m15 * factor,
            rate_unit: target,
            items: self
                .items
                .iter()
                .map(|item| MeterSetItem {
                    key: item.key.clone(),
                    percent_of_total: item.percent_of_total,
                    value: item.value.scale(target),
                })
                .collect(),
        }
    }
}

/// A point-in-time read of a [`Histogram`](crate::metrics::Histogram).
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramValue {
    /// The most recently recorded value, if any observation has ever landed.
    pub last_value: Option<i64>,
    /// The user value attached to the most recent observation, if any.
    pub last_user_value: Option<String>,
    /// The reservoir's sampled distribution.
    pub snapshot: Snapshot,
}

/// A point-in-time read of a [`Timer`](crate::metrics::Timer).
#[derive(Debug, Clone, PartialEq)]
pub struct TimerValue {
    /// The timer's rate half: how often `record`/`time`/a scoped context completed.
    pub rate: MeterValue,
    /// The timer's latency distribution.
    pub histogram: HistogramValue,
    /// The number of in-flight scoped recording sessions right now.
    pub active_sessions: i64,
    /// The sum of every recorded duration, in units of `duration_unit`.
    pub total_time: i64,
    /// The time unit `histogram`'s values and `total_time` are expressed in.
    pub duration_unit: TimeUnit,
}

impl TimerValue {
    /// Returns a new value with the rate half converted to `rate_unit` and every duration-valued
    /// field (the histogram's samples, `last_value`, and `total_time`) converted to
    /// `duration_unit`.
    ///
    /// Pure: allocates and returns a new `TimerValue`, leaving `self` untouched.
    pub fn scale(&self, rate_unit: TimeUnit, duration_unit: TimeUnit) -> TimerValue {
        let duration_factor = self.duration_unit.scaling_factor_to(duration_unit);
        TimerValue {
            rate: self.rate.scale(rate_unit),
            histogram: HistogramValue {
                last_value: self
                    .histogram
                    .last_value
                    .map(|v| (v as f64 * duration_factor).round() as i64),
                last_user_value: self.histogram.last_user_value.clone(),
                snapshot: self.histogram.snapshot.scale(duration_factor),
            },
            active_sessions: self.active_sessions,
            total_time: (self.total_time as f64 * duration_factor).round() as i64,
            duration_unit,
        }
    }
}

/// The dynamic-dispatch value type every primitive's `get_value` ultimately feeds into when a
/// caller needs to hold "some metric's current value" without knowing which kind it is ahead of
/// time (an exporter walking a registry, for instance).
///
/// A closed set of tagged variants rather than open polymorphism, per the design notes: every
/// consumer needs to pattern-match on "what kind of metric is this" anyway, so a `dyn Trait`
/// would only add an indirection with no matching benefit.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// A gauge's instantaneous reading.
    Gauge(f64),
    /// A counter's current value.
    Counter(CounterValue),
    /// A meter's current rate value.
    Meter(MeterValue),
    /// A histogram's current distribution value.
    Histogram(HistogramValue),
    /// A timer's current combined value.
    Timer(TimerValue),
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_meter_value() -> MeterValue {
        MeterValue {
            count: 120,
            mean_rate: 2.0,
            m1: 1.5,
            m5: 1.2,
            m15: 1.0,
            rate_unit: TimeUnit::Seconds,
            items: vec![MeterSetItem {
                key: "a".to_owned(),
                percent_of_total: 100.0,
                value: MeterValue {
                    count: 120,
                    mean_rate: 2.0,
                    m1: 1.5,
                    m5: 1.2,
                    m15: 1.0,
                    rate_unit: TimeUnit::Seconds,
                    items: Vec::new(),
                },
            }],
        }
    }

    #[test]
    fn meter_scale_converts_per_second_to_per_minute() {
        let value = sample_meter_value();
        let scaled = value.scale(TimeUnit::Minutes);
        assert_relative_eq!(scaled.mean_rate, 120.0);
        assert_relative_eq!(scaled.m1, 90.0);
        assert_eq!(scaled.rate_unit, TimeUnit::Minutes);
        assert_relative_eq!(scaled.items[0].value.mean_rate, 120.0);
    }

    #[test]
    fn meter_scale_round_trips() {
        let value = sample_meter_value();
        let round_tripped = value.scale(TimeUnit::Hours).scale(TimeUnit::Seconds);
        assert_relative_eq!(round_tripped.mean_rate, value.mean_rate, epsilon = 1e-9);
        assert_relative_eq!(round_tripped.m1, value.m1, epsilon = 1e-9);
        assert_relative_eq!(round_tripped.m5, value.m5, epsilon = 1e-9);
    }

    #[test]
    fn timer_scale_converts_nanos_to_millis() {
        let snapshot = Snapshot::from_samples(
            1,
            vec![crate::sample::WeightedSample::unweighted(5_000_000, None)],
        );
        let value = TimerValue {
            rate: sample_meter_value(),
            histogram: HistogramValue {
                last_value: Some(5_000_000),
                last_user_value: None,
                snapshot,
            },
            active_sessions: 2,
            total_time: 10_000_000,
            duration_unit: TimeUnit::Nanoseconds,
        };

        let scaled = value.scale(TimeUnit::Seconds, TimeUnit::Milliseconds);
        assert_eq!(scaled.duration_unit, TimeUnit::Milliseconds);
        assert_eq!(scaled.total_time, 10);
        assert_eq!(scaled.histogram.last_value, Some(5));
        assert_eq!(scaled.histogram.snapshot.values(), &[5]);
        assert_eq!(scaled.active_sessions, 2);
    }
}

//! A tick-driven rate, optionally broken down by item, that owns its own scheduler handle.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::atomics::AtomicLong;
use crate::clock::Clock;
use crate::items::ItemMap;
use crate::rate::{SimpleMeter, DEFAULT_TICK_INTERVAL};
use crate::scheduler::{self, Handle};
use crate::time_unit::TimeUnit;
use crate::value::{MeterSetItem, MeterValue};

/// The state a scheduled tick actually needs to touch: the global rate engine and the per-item
/// map. Split out from [`Meter`] so the tick closure can hold an `Arc` to just this, rather than
/// a reference to `Meter` itself (which would be a self-referential struct once `Meter` also owns
/// the [`Handle`] that runs that closure).
struct State {
    start_time_nanos: AtomicLong,
    global: SimpleMeter,
    items: ItemMap<SimpleMeter>,
    tick_interval: Duration,
}

impl State {
    fn tick(&self) {
        self.global.tick();
        self.items.for_each(|_, meter| meter.tick());
    }

    fn reset(&self, clock: &dyn Clock) {
        self.start_time_nanos.set(clock.nanoseconds() as i64);
        self.global.reset();
        self.items.for_each(|_, meter| meter.reset());
    }
}

/// A rate, broken down into 1/5/15-minute EWMAs plus a lifetime mean, optionally split out by
/// item (e.g. per status code, per endpoint).
///
/// Owns a [`Handle`] driving `tick()` at `tick_interval` (5 seconds by default); the handle is
/// started at construction and stopped when the `Meter` is dropped, per the crate's lifecycle
/// rules for primitives that own a scheduled action.
pub struct Meter {
    state: Arc<State>,
    clock: Arc<dyn Clock>,
    tick_handle: Mutex<Option<Handle>>,
}

impl Meter {
    /// Creates a meter driven by the default 5-second tick interval.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_tick_interval(clock, DEFAULT_TICK_INTERVAL)
    }

    /// Creates a meter driven by an explicit tick interval.
    pub fn with_tick_interval(clock: Arc<dyn Clock>, tick_interval: Duration) -> Self {
        let state = Arc::new(State {
            start_time_nanos: AtomicLong::new(clock.nanoseconds() as i64),
            global: SimpleMeter::with_tick_interval(tick_interval),
            items: ItemMap::new(),
            tick_interval,
        });

        let tick_state = state.clone();
        let handle = scheduler::start(tick_interval, move || tick_state.tick())
            .expect("tick_interval is always positive for a Meter");

        Self { state, clock, tick_handle: Mutex::new(Some(handle)) }
    }

    /// Records `n` observations against the global rate.
    pub fn mark(&self, n: u64) {
        self.state.global.mark(n);
    }

    /// Records `n` observations against both the global rate and the per-item rate for `key`.
    pub fn mark_item(&self, key: &str, n: u64) {
        self.state.global.mark(n);
        let tick_interval = self.state.tick_interval;
        self.state
            .items
            .get_or_insert_with(key, move || SimpleMeter::with_tick_interval(tick_interval))
            .mark(n);
    }

    fn elapsed_nanos(&self) -> u64 {
        self.clock.nanoseconds().saturating_sub(self.state.start_time_nanos.get() as u64)
    }

    /// Takes a point-in-time read of the meter, expressed as a per-second [`MeterValue`],
    /// optionally resetting the start time, the global rate, and every item's rate afterwards.
    ///
    /// Per-item entries are sorted by `percent_of_total` descending, ties broken by key
    /// ascending; every item that has ever received a tagged mark is included (no early-exit
    /// truncation — see the crate's resolved open question on this).
    pub fn get_value(&self, reset: bool) -> MeterValue {
        let elapsed = self.elapsed_nanos();
        let base = self.state.global.snapshot(elapsed);

        let mut raw_items = Vec::new();
        self.state.items.for_each(|key, meter| {
            raw_items.push((key.to_owned(), meter.snapshot(elapsed)));
        });

        let total = base.count as f64;
        let mut items: Vec<MeterSetItem> = raw_items
            .into_iter()
            .map(|(key, item)| {
                let percent = if total > 0.0 { item.count as f64 / total * 100.0 } else { 0.0 };
                MeterSetItem {
                    key,
                    percent_of_total: percent,
                    value: MeterValue {
                        count: item.count,
                        mean_rate: item.mean_rate,
                        m1: item.m1,
                        m5: item.m5,
                        m15: item.m15,
                        rate_unit: TimeUnit::Seconds,
                        items: Vec::new(),
                    },
                }
            })
            .collect();

        items.sort_by(|a, b| {
            b.percent_of_total.partial_cmp(&a.percent_of_total).unwrap().then_with(|| a.key.cmp(&b.key))
        });

        let value = MeterValue {
            count: base.count,
            mean_rate: base.mean_rate,
            m1: base.m1,
            m5: base.m5,
            m15: base.m15,
            rate_unit: TimeUnit::Seconds,
            items,
        };

        if reset {
            self.state.reset(self.clock.as_ref());
        }

        value
    }

    /// Resets the start time, the global rate, and every item's rate. The item map itself is
    /// never dropped, so an exporter that already discovered a given item's key keeps seeing it
    /// (now reporting zero) rather than having it silently disappear.
    pub fn reset(&self) {
        self.state.reset(self.clock.as_ref());
    }
}

impl Drop for Meter {
    fn drop(&mut self) {
        if let Some(mut handle) = self.tick_handle.lock().take() {
            handle.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MonotonicClock;
    use std::time::Duration as StdDuration;

    fn fresh() -> (Meter, Arc<quanta::Mock>) {
        let (clock, mock) = MonotonicClock::mock();
        let clock: Arc<dyn Clock> = Arc::new(clock);
        (Meter::with_tick_interval(clock, StdDuration::from_millis(20)), mock)
    }

    #[test]
    fn rates_are_zero_before_any_tick_fires() {
        let (meter, _mock) = fresh();
        meter.mark(10);
        let value = meter.get_value(false);
        assert_eq!(value.m1, 0.0);
        assert_eq!(value.m5, 0.0);
        assert_eq!(value.m15, 0.0);
    }

    #[test]
    fn item_breakdown_sums_to_the_total_and_sorts_by_percent() {
        let (meter, mock) = fresh();
        meter.mark_item("a", 3);
        meter.mark_item("b", 1);

        std::thread::sleep(StdDuration::from_millis(100));
        mock.increment(StdDuration::from_secs(1));

        let value = meter.get_value(false);
        assert_eq!(value.count, 4);
        assert_eq!(value.items.len(), 2);
        assert_eq!(value.items[0].key, "a");
        assert!((value.items[0].percent_of_total - 75.0).abs() < 1e-9);
    }

    #[test]
    fn reset_zeroes_count_and_keeps_item_keys_around() {
        let (meter, _mock) = fresh();
        meter.mark_item("a", 5);
        meter.reset();

        let value = meter.get_value(false);
        assert_eq!(value.count, 0);
        assert_eq!(value.items.len(), 1);
        assert_eq!(value.items[0].value.count, 0);
    }

    #[test]
    fn dropping_the_meter_stops_its_tick_thread() {
        let (meter, _mock) = fresh();
        meter.mark(1);
        drop(meter);
    }
}

//! A monotonic-ish running total with an optional per-item breakdown.

use crate::adder::StripedAdder;
use crate::items::ItemMap;
use crate::value::{CounterItemValue, CounterValue};

/// A count that can be incremented or decremented, optionally tagged by item.
///
/// `increment`/`decrement` touch only the global [`StripedAdder`]; `increment_item` additionally
/// updates a per-item adder in a lazily-materialized map (see [`ItemMap`]), so a `Counter` that
/// never receives a tagged update pays no allocation for the map at all.
pub struct Counter {
    total: StripedAdder,
    items: ItemMap<StripedAdder>,
}

impl Counter {
    /// Creates a new counter at zero.
    pub fn new() -> Self {
        Self { total: StripedAdder::new(), items: ItemMap::new() }
    }

    /// Increments the counter by one.
    pub fn increment(&self) {
        self.increment_by(1);
    }

    /// Decrements the counter by one.
    pub fn decrement(&self) {
        self.increment_by(-1);
    }

    /// Adds `n` (which may be negative) to the counter's total.
    pub fn increment_by(&self, n: i64) {
        self.total.add(n as u64);
    }

    /// Subtracts `n` (which may be negative) from the counter's total.
    pub fn decrement_by(&self, n: i64) {
        self.increment_by(-n);
    }

    /// Adds `n` to both the counter's total and the per-item adder for `key`, materializing the
    /// item map on first use.
    pub fn increment_item(&self, key: &str, n: i64) {
        self.increment_by(n);
        self.items.get_or_insert_with(key, StripedAdder::new).add(n as u64);
    }

    /// Takes a point-in-time read of the counter, optionally resetting the global total and
    /// every per-item adder atomically enough that no update is double-counted or lost across the
    /// reset boundary.
    pub fn get_value(&self, reset: bool) -> CounterValue {
        let count = if reset { self.total.get_and_reset() } else { self.total.get_value() };

        let mut raw_items = Vec::new();
        self.items.for_each(|key, adder| {
            let item_count = if reset { adder.get_and_reset() } else { adder.get_value() };
            raw_items.push((key.to_owned(), item_count));
        });

        let total = count as f64;
        let mut items: Vec<CounterItemValue> = raw_items
            .into_iter()
            .map(|(key, item_count)| {
                let percent = if total > 0.0 { item_count as f64 / total * 100.0 } else { 0.0 };
                CounterItemValue { key, count: item_count, percent }
            })
            .collect();

        items.sort_by(|a, b| b.percent.partial_cmp(&a.percent).unwrap().then_with(|| a.key.cmp(&b.key)));

        CounterValue { count, items }
    }

    /// Resets the counter's total and every per-item adder to zero.
    pub fn reset(&self) {
        let _ = self.get_value(true);
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn plain_increment_and_decrement() {
        let counter = Counter::new();
        counter.increment();
        counter.increment();
        counter.decrement();
        assert_eq!(counter.get_value(false).count, 1);
    }

    #[test]
    fn item_breakdown_matches_the_worked_example() {
        let counter = Counter::new();
        counter.increment_item("a", 3);
        counter.increment_item("b", 1);

        let value = counter.get_value(false);
        assert_eq!(value.count, 4);
        assert_eq!(value.items.len(), 2);
        assert_eq!(value.items[0].key, "a");
        assert_eq!(value.items[0].count, 3);
        assert!((value.items[0].percent - 75.0).abs() < 1e-9);
        assert_eq!(value.items[1].key, "b");
        assert!((value.items[1].percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn ties_in_percent_break_by_key_ascending() {
        let counter = Counter::new();
        counter.increment_item("z", 1);
        counter.increment_item("a", 1);

        let value = counter.get_value(false);
        assert_eq!(value.items[0].key, "a");
        assert_eq!(value.items[1].key, "z");
    }

    #[test]
    fn reset_zeroes_total_and_every_item() {
        let counter = Counter::new();
        counter.increment_item("a", 5);
        counter.reset();

        let value = counter.get_value(false);
        assert_eq!(value.count, 0);
        assert_eq!(value.items[0].count, 0);
    }

    #[test]
    fn percent_is_zero_when_total_is_zero() {
        let counter = Counter::new();
        counter.increment_item("a", 0);
        let value = counter.get_value(false);
        assert_eq!(value.items[0].percent, 0.0);
    }

    #[test]
    fn concurrent_increments_sum_correctly() {
        let counter = Arc::new(Counter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        counter.increment();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.get_value(false).count, 80_000);
    }
}

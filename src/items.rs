//! A lazily-materialized per-item container shared by [`Counter`](crate::metrics::Counter) and
//! [`Meter`](crate::metrics::Meter)'s `increment(item, n)` / `mark(item, n)` family.
//!
//! Grounded on `scc::HashMap` as used by the teacher's
//! `metrics-exporter-opentelemetry::metadata::MetricMetadata` for its descriptions/bounds maps,
//! and on the design note calling for "a single compare-and-set to materialize a container,
//! absent reads treated as empty": here that's a `std::sync::OnceLock<scc::HashMap<..>>`, so a
//! primitive that never receives a tagged update never allocates the map at all.

use std::sync::{Arc, OnceLock};

use scc::HashMap;

/// A map from item key to some per-item state `V`, created on first use.
pub struct ItemMap<V> {
    inner: OnceLock<HashMap<String, Arc<V>>>,
}

impl<V> ItemMap<V> {
    /// Creates an empty, not-yet-materialized map.
    pub const fn new() -> Self {
        Self { inner: OnceLock::new() }
    }

    /// Returns the per-item state for `key`, creating both the backing map (if this is the first
    /// tagged update the owning primitive has ever seen) and the item's entry (via `make`) as
    /// needed.
    pub fn get_or_insert_with(&self, key: &str, make: impl FnOnce() -> V) -> Arc<V> {
        let map = self.inner.get_or_init(HashMap::new);
        if let Some(existing) = map.read(key, |_, v| v.clone()) {
            return existing;
        }

        // Lost the race against another writer inserting the same key between our `read` above
        // and the `insert` below: fall back to reading whatever they inserted rather than the
        // value we built (only one of the two should ever be observed by later callers).
        let value = Arc::new(make());
        match map.insert(key.to_owned(), value.clone()) {
            Ok(()) => value,
            Err(_) => map.read(key, |_, v| v.clone()).expect("entry just raced into existence"),
        }
    }

    /// Runs `f` against every `(key, value)` pair currently stored.
    ///
    /// A map that was never materialized (no tagged update has ever landed) behaves as empty.
    pub fn for_each(&self, mut f: impl FnMut(&str, &Arc<V>)) {
        if let Some(map) = self.inner.get() {
            map.scan(|k, v| f(k, v));
        }
    }

    /// Returns `true` if the map has never been materialized, i.e. no tagged update has landed.
    pub fn is_empty(&self) -> bool {
        match self.inner.get() {
            None => true,
            Some(map) => map.is_empty(),
        }
    }
}

impl<V> Default for ItemMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn absent_map_reports_empty_and_iterates_nothing() {
        let map: ItemMap<AtomicU64> = ItemMap::new();
        assert!(map.is_empty());

        let mut seen = 0;
        map.for_each(|_, _| seen += 1);
        assert_eq!(seen, 0);
    }

    #[test]
    fn get_or_insert_with_materializes_once_per_key() {
        let map: ItemMap<AtomicU64> = ItemMap::new();

        let a = map.get_or_insert_with("a", || AtomicU64::new(0));
        a.fetch_add(3, Ordering::SeqCst);

        let a_again = map.get_or_insert_with("a", || AtomicU64::new(99));
        assert_eq!(a_again.load(Ordering::SeqCst), 3);

        let b = map.get_or_insert_with("b", || AtomicU64::new(7));
        assert_eq!(b.load(Ordering::SeqCst), 7);

        let mut keys: Vec<String> = Vec::new();
        map.for_each(|k, _| keys.push(k.to_owned()));
        keys.sort();
        assert_eq!(keys, vec!["a".to_owned(), "b".to_owned()]);
        assert!(!map.is_empty());
    }
}

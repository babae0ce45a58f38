//! A striped, wait-free-on-the-happy-path 64-bit adder.
//!
//! Modeled on Java's `LongAdder`/`Striped64`: each thread is steered towards one of a small
//! number of independently-cached-line-padded cells, so that concurrent writers from different
//! cores don't thrash the same cache line the way a single `AtomicU64::fetch_add` would. This is
//! the same contention-spreading idea behind `metrics-util::storage::reservoir`'s per-cell
//! `AtomicU64` array, just applied to a running sum instead of a reservoir slot.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

/// Number of cells to stripe across. A fixed, modest count (rather than `num_cpus::get()`) keeps
/// memory bounded for the common case of many short-lived counters; contention beyond this many
/// concurrent writers is rare for the granularity this crate targets (process-embedded metrics,
/// not a distributed adder).
fn cell_count() -> usize {
    num_cpus::get().clamp(1, 16)
}

/// Hands out a distinct starting cell index to each thread that touches a `StripedAdder`, so
/// sibling threads don't all start out contending for cell zero.
static NEXT_CELL_HINT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CELL_HINT: Cell<usize> = Cell::new(NEXT_CELL_HINT.fetch_add(1, Ordering::Relaxed));
}

/// A striped 64-bit counter that stays correct under heavy concurrent writing.
pub struct StripedAdder {
    cells: Box<[CachePadded<AtomicU64>]>,
}

impl StripedAdder {
    /// Creates a new adder, initialized to zero.
    pub fn new() -> Self {
        let cells = (0..cell_count()).map(|_| CachePadded::new(AtomicU64::new(0))).collect();
        Self { cells }
    }

    /// Adds `value` to the counter.
    ///
    /// Lock-free: on contention for a given cell (the value changed between our load and our
    /// CAS), we move to the next cell and retry rather than spinning on the same one.
    pub fn add(&self, value: u64) {
        if value == 0 {
            return;
        }

        let mut idx = CELL_HINT.with(|hint| hint.get()) % self.cells.len();
        loop {
            let cell = &self.cells[idx];
            let current = cell.load(Ordering::Relaxed);
            let next = current.wrapping_add(value);
            if cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed).is_ok() {
                CELL_HINT.with(|hint| hint.set(idx));
                return;
            }

            idx = (idx + 1) % self.cells.len();
        }
    }

    /// Increments the counter by one.
    pub fn increment(&self) {
        self.add(1);
    }

    /// Decrements the counter by one.
    ///
    /// Implemented as wrapping addition of `u64::MAX`, matching the two's-complement trick used
    /// throughout this crate for representing signed deltas atomically.
    pub fn decrement(&self) {
        self.add(u64::MAX);
    }

    /// Returns the sum of all cells.
    ///
    /// This is an eventually-consistent read: it does not observe a single atomic instant across
    /// all cells, which is acceptable since every caller in this crate only needs a
    /// point-in-time approximation (see the crate's ordering guarantees).
    pub fn get_value(&self) -> i64 {
        self.cells.iter().fold(0u64, |acc, cell| acc.wrapping_add(cell.load(Ordering::Relaxed))) as i64
    }

    /// Atomically takes the current sum and resets every cell to zero.
    ///
    /// Concurrent `add`s that race with this call land in a freshly-zeroed cell (or a cell we
    /// haven't reset yet, in which case they're captured in *this* reset) — either way, no update
    /// is lost or double-counted.
    pub fn get_and_reset(&self) -> i64 {
        let mut total: u64 = 0;
        for cell in self.cells.iter() {
            total = total.wrapping_add(cell.swap(0, Ordering::AcqRel));
        }
        total as i64
    }

    /// Resets every cell to zero, discarding the prior value.
    pub fn reset(&self) {
        for cell in self.cells.iter() {
            cell.store(0, Ordering::SeqCst);
        }
    }
}

impl Default for StripedAdder {
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
    fn single_threaded_add_and_get() {
        let adder = StripedAdder::new();
        adder.add(5);
        adder.increment();
        adder.decrement();
        assert_eq!(adder.get_value(), 5);
    }

    #[test]
    fn get_and_reset_is_atomic_wrt_no_concurrent_writers() {
        let adder = StripedAdder::new();
        adder.add(42);
        assert_eq!(adder.get_and_reset(), 42);
        assert_eq!(adder.get_value(), 0);
    }

    #[test]
    fn concurrent_adds_are_all_counted() {
        let adder = Arc::new(StripedAdder::new());
        let threads_count = 8;
        let per_thread = 10_000u64;

        let handles: Vec<_> = (0..threads_count)
            .map(|_| {
                let adder = adder.clone();
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        adder.increment();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(adder.get_value() as u64, threads_count * per_thread);
    }

    #[test]
    fn concurrent_reset_never_loses_or_double_counts_updates() {
        let adder = Arc::new(StripedAdder::new());
        let writer_adder = adder.clone();
        let per_writer = 50_000u64;

        let writer = thread::spawn(move || {
            for _ in 0..per_writer {
                writer_adder.increment();
            }
        });

        let mut observed_total = 0i64;
        loop {
            observed_total += adder.get_and_reset();
            if writer.is_finished() {
                observed_total += adder.get_and_reset();
                break;
            }
        }

        writer.join().unwrap();
        assert_eq!(observed_total as u64, per_writer);
    }
}

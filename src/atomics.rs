//! Single-word atomic cells used where a striped adder would be overkill: a plain integer or
//! floating-point value that only ever needs one writer's update visible at a time.
//!
//! Grounded on the teacher's `metrics::atomics` module, which implements `GaugeFn` for
//! `AtomicU64` via a bit-pattern `fetch_update` loop so that a `f64` gauge can live behind a
//! native atomic. This module generalizes that trick into two small standalone cells (an atomic
//! `i64` and an atomic `f64`) used by the meter rate engine and the gauge primitive, neither of
//! which need the full `CounterFn`/`GaugeFn` trait split since there is no registry here to
//! dispatch through.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// An atomic 64-bit signed integer cell.
#[derive(Debug, Default)]
pub struct AtomicLong(AtomicI64);

impl AtomicLong {
    /// Creates a cell initialized to `value`.
    pub fn new(value: i64) -> Self {
        Self(AtomicI64::new(value))
    }

    /// Reads the current value.
    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Acquire)
    }

    /// Sets the value unconditionally.
    pub fn set(&self, value: i64) {
        self.0.store(value, Ordering::Release);
    }

    /// Adds `delta` and returns the new value.
    pub fn add(&self, delta: i64) -> i64 {
        self.0.fetch_add(delta, Ordering::AcqRel).wrapping_add(delta)
    }

    /// Atomically replaces the value with `new` if it currently equals `current`, returning the
    /// value actually observed (equal to `current` on success).
    pub fn compare_and_swap(&self, current: i64, new: i64) -> i64 {
        match self.0.compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire) {
            Ok(previous) => previous,
            Err(previous) => previous,
        }
    }

    /// Atomically takes the current value and resets the cell to zero.
    pub fn get_and_reset(&self) -> i64 {
        self.0.swap(0, Ordering::AcqRel)
    }
}

/// An atomic 64-bit floating-point cell, implemented as bit-pattern CAS over an `AtomicU64`.
///
/// Because the bit pattern (not the numeric value) is what's compared and swapped, a stored NaN
/// round-trips exactly: `get()` after `set(f64::NAN)` returns a NaN with the same bit pattern,
/// which plain floating-point comparison could never guarantee (`NaN != NaN`).
#[derive(Debug)]
pub struct AtomicDouble(AtomicU64);

impl AtomicDouble {
    /// Creates a cell initialized to `value`.
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    /// Reads the current value.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    /// Sets the value unconditionally.
    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    /// Atomically replaces the value with `new` if it currently bit-equals `current`, returning
    /// the value actually observed (bit-equal to `current` on success).
    ///
    /// Compares bit patterns rather than numeric equality, so this is well-defined even when
    /// `current` or `new` is NaN.
    pub fn compare_and_swap(&self, current: f64, new: f64) -> f64 {
        match self.0.compare_exchange(
            current.to_bits(),
            new.to_bits(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(previous) => f64::from_bits(previous),
            Err(previous) => f64::from_bits(previous),
        }
    }

    /// Adds `delta` to the current value, retrying on concurrent writers, and returns the new
    /// value.
    pub fn add(&self, delta: f64) -> f64 {
        loop {
            let current_bits = self.0.load(Ordering::Acquire);
            let current = f64::from_bits(current_bits);
            let next = current + delta;
            if self
                .0
                .compare_exchange_weak(current_bits, next.to_bits(), Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return next;
            }
        }
    }
}

impl Default for AtomicDouble {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_long_basic_ops() {
        let cell = AtomicLong::new(10);
        assert_eq!(cell.get(), 10);
        cell.set(20);
        assert_eq!(cell.get(), 20);
        assert_eq!(cell.add(5), 25);
        assert_eq!(cell.compare_and_swap(25, 100), 25);
        assert_eq!(cell.get(), 100);
        assert_eq!(cell.get_and_reset(), 100);
        assert_eq!(cell.get(), 0);
    }

    #[test]
    fn atomic_double_basic_ops() {
        let cell = AtomicDouble::new(1.5);
        assert_eq!(cell.get(), 1.5);
        cell.set(2.5);
        assert_eq!(cell.get(), 2.5);
        assert_eq!(cell.add(1.0), 3.5);
    }

    #[test]
    fn atomic_double_survives_nan_round_trip() {
        let cell = AtomicDouble::new(f64::NAN);
        assert!(cell.get().is_nan());

        cell.set(f64::NAN);
        assert!(cell.get().is_nan());
    }

    #[test]
    fn atomic_double_cas_compares_bit_patterns() {
        let cell = AtomicDouble::new(f64::NAN);
        // A literal NaN compares unequal to itself, but the CAS must still succeed since it
        // compares bit patterns, not `PartialEq`.
        let observed = cell.compare_and_swap(f64::NAN, 7.0);
        assert!(observed.is_nan());
        assert_eq!(cell.get(), 7.0);
    }
}

//! A fast, thread-local PRNG shared by every reservoir that needs one.
//!
//! Grounded directly on `metrics-util::storage::reservoir`'s `fastrand` helper: a thread-local
//! [`Xoshiro256StarStar`] seeded once from the OS RNG, reused across calls to avoid reseeding
//! overhead on a hot update path.

use std::cell::UnsafeCell;

use rand::{rngs::OsRng, Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

thread_local! {
    static FAST_RNG: UnsafeCell<Xoshiro256StarStar> =
        UnsafeCell::new(Xoshiro256StarStar::try_from_rng(&mut OsRng).unwrap());
}

/// Returns a random index in `[0, upper)`.
///
/// Panics if `upper == 0`.
pub fn below(upper: usize) -> usize {
    FAST_RNG.with(|rng| {
        // SAFETY: the pointer never escapes this closure, and thread-local storage means no
        // other thread can observe or mutate this instance concurrently.
        let rng = unsafe { &mut *rng.get() };
        rng.random_range(0..upper)
    })
}

/// Returns a random `f64` in `(0.0, 1.0]`, retrying if the draw lands on exactly 0.0.
///
/// Used by the exponentially-decaying reservoir's priority computation, which divides by this
/// value and would produce infinities on a literal zero.
pub fn unit_interval_exclusive_zero() -> f64 {
    FAST_RNG.with(|rng| {
        let rng = unsafe { &mut *rng.get() };
        loop {
            let u: f64 = rng.random();
            if u > 0.0 {
                return u;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_stays_in_range() {
        for _ in 0..10_000 {
            let value = below(7);
            assert!(value < 7);
        }
    }

    #[test]
    fn unit_interval_is_never_zero() {
        for _ in 0..10_000 {
            let value = unit_interval_exclusive_zero();
            assert!(value > 0.0 && value <= 1.0);
        }
    }
}

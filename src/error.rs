//! Error types surfaced on the read path.
//!
//! Per the crate's propagation policy, the update path (`increment`, `mark`, `record`, ...)
//! never returns an error — a bad input there is either clamped or silently ignored (see
//! [`Timer::record`](crate::metrics::Timer::record) for the canonical example: a negative
//! duration, which can arise from a clock read race, is dropped rather than poisoning the
//! histogram). Only read-path validation, namely quantile and configuration arguments, produces
//! a typed failure.

use thiserror::Error;

/// Errors produced by the read path of this crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricsError {
    /// A quantile was requested outside of the valid `[0.0, 1.0]` range.
    #[error("quantile {0} is outside of the valid range [0.0, 1.0]")]
    InvalidQuantile(f64),

    /// A scheduler was asked to run on a non-positive interval.
    #[error("tick interval must be greater than zero")]
    InvalidTickInterval,

    /// A reservoir was constructed with a non-positive capacity.
    #[error("reservoir capacity must be greater than zero")]
    InvalidCapacity,

    /// The HDR reservoir was configured with an out-of-range significant-digits precision.
    #[error("significant digits precision {0} is outside of the valid range [0, 5]")]
    InvalidPrecision(u8),
}

/// Convenience alias for fallible read-path operations.
pub type Result<T> = std::result::Result<T, MetricsError>;

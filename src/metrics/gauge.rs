//! A value-producing primitive: either a pre-set number or a closure sampled on read.

use std::sync::Arc;

use crate::atomics::AtomicDouble;
use crate::sink::{default_sink, panic_message, ErrorSink};

enum Source {
    /// A plain value, settable by the producer.
    Value(AtomicDouble),
    /// A closure sampled on every read (e.g. "current queue depth").
    Closure(Arc<dyn Fn() -> f64 + Send + Sync>),
}

/// A point-in-time value, either pushed by the producer or pulled from a closure on read.
///
/// Unlike the other primitives, a `Gauge` has no `reset()`: it's a stateless observer of external
/// state (or a plain settable cell), not an accumulator.
pub struct Gauge {
    source: Source,
    sink: Arc<dyn ErrorSink>,
}

impl Gauge {
    /// Creates a gauge backed by a plain, producer-settable value, initialized to `initial`.
    pub fn from_value(initial: f64) -> Self {
        Self { source: Source::Value(AtomicDouble::new(initial)), sink: default_sink() }
    }

    /// Creates a gauge sampled from `f` on every read, reporting failures to the default sink.
    pub fn from_fn(f: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        Self::from_fn_with_sink(f, default_sink())
    }

    /// As [`Gauge::from_fn`], but reporting closure failures to an explicitly supplied sink.
    pub fn from_fn_with_sink(f: impl Fn() -> f64 + Send + Sync + 'static, sink: Arc<dyn ErrorSink>) -> Self {
        Self { source: Source::Closure(Arc::new(f)), sink }
    }

    /// Overwrites the gauge's value. Only meaningful for a value-backed gauge; a no-op on a
    /// closure-backed one (the closure remains the source of truth).
    pub fn set(&self, value: f64) {
        if let Source::Value(cell) = &self.source {
            cell.set(value);
        }
    }

    /// Reads the gauge's current value.
    ///
    /// For a closure-backed gauge, invokes the closure under `catch_unwind`: a panic is reported
    /// to the error sink and this call returns `NaN` rather than propagating, per the crate's
    /// error-handling policy for gauge function failures.
    pub fn get_value(&self) -> f64 {
        match &self.source {
            Source::Value(cell) => cell.get(),
            Source::Closure(f) => match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f())) {
                Ok(value) => value,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    self.sink.report("gauge closure panicked", &message);
                    f64::NAN
                }
            },
        }
    }
}

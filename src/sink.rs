//! The injected error sink.
//!
//! The historical `metrics` crate routed scheduler/gauge failures through process-wide mutable
//! state (a registered global handler). This crate instead takes an injected sink, matching the
//! rest of the ecosystem's preference for explicit dependency passing over globals (see
//! `metrics-util::recency::Recency`, which is handed its clock rather than reaching for one).

use std::fmt;
use std::sync::Arc;

/// Receives best-effort reports of background failures.
///
/// Implementations must not panic and should not block for long, since they may be called from
/// inside a scheduler's tick thread.
pub trait ErrorSink: Send + Sync {
    /// Reports a failure observed on a background path (a scheduled action, a gauge closure).
    fn report(&self, context: &str, message: &dyn fmt::Display);
}

/// The default sink: logs via [`tracing::error!`].
///
/// Applications that install a `tracing` subscriber will see these as ordinary error-level
/// events; applications that don't will simply drop them, same as an unconfigured logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, context: &str, message: &dyn fmt::Display) {
        tracing::error!(context, %message, "metrics background task failed");
    }
}

/// Returns the default, process-wide error sink.
///
/// This is a plain constructor rather than a `lazy_static`/`OnceLock`-backed singleton: the sink
/// is stateless, so there is no shared state to coordinate and every primitive can hold its own
/// cheap `Arc` to one.
pub fn default_sink() -> Arc<dyn ErrorSink> {
    Arc::new(TracingErrorSink)
}

/// Renders a caught panic payload as a human-readable string, for handing to an [`ErrorSink`].
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink(AtomicUsize);

    impl ErrorSink for CountingSink {
        fn report(&self, _context: &str, _message: &dyn fmt::Display) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn counting_sink_counts() {
        let sink = CountingSink(AtomicUsize::new(0));
        sink.report("test", &"boom");
        sink.report("test", &"boom again");
        assert_eq!(sink.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn default_sink_does_not_panic() {
        let sink = default_sink();
        sink.report("test", &"a harmless message");
    }
}

//! The periodic tick scheduler driving meter rate updates and reservoir rescales.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{MetricsError, Result};
use crate::sink::{default_sink, panic_message, ErrorSink};

/// A handle to a running periodic action.
///
/// Dropping a `Handle` does *not* stop the action — call [`Handle::stop`] explicitly (or have the
/// owning primitive do so in its own `Drop` impl, per the lifecycle rules in the spec). This
/// mirrors the historical `metrics` crate's `Control`-style handles, which are plain join-able
/// values rather than RAII guards, since a primitive often needs to stop its scheduler *before*
/// tearing down the state the action closes over.
pub struct Handle {
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Handle {
    /// Requests cancellation and blocks until the background thread has observed it.
    ///
    /// Idempotent: calling `stop` more than once (or after the thread has already exited on its
    /// own, e.g. after an action failure) is a no-op on the second call.
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs `action` approximately every `interval`, on a dedicated background thread.
///
/// Because a single thread owns both the sleep and the action invocation, overlapping
/// invocations are structurally impossible: a slow action simply delays the next tick rather
/// than firing concurrently with itself. If `action` panics, the panic is caught, reported to
/// `sink`, and the schedule is cancelled (the thread exits without being run again).
///
/// Returns [`MetricsError::InvalidTickInterval`] if `interval` is zero.
pub fn start<F>(interval: Duration, action: F) -> Result<Handle>
where
    F: FnMut() + Send + 'static,
{
    start_with_sink(interval, action, default_sink())
}

/// As [`start`], but reporting action failures to an explicitly supplied sink.
pub fn start_with_sink<F>(interval: Duration, mut action: F, sink: Arc<dyn ErrorSink>) -> Result<Handle>
where
    F: FnMut() + Send + 'static,
{
    if interval.is_zero() {
        return Err(MetricsError::InvalidTickInterval);
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let thread_cancel = cancel.clone();

    let thread = std::thread::Builder::new()
        .name("metrics-kernel-tick".to_owned())
        .spawn(move || {
            while !thread_cancel.load(Ordering::SeqCst) {
                std::thread::sleep(interval);
                if thread_cancel.load(Ordering::SeqCst) {
                    break;
                }

                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(&mut action));
                if let Err(payload) = result {
                    let message = panic_message(payload.as_ref());
                    sink.report("scheduled tick action panicked", &message);
                    break;
                }
            }
        })
        .expect("failed to spawn metrics-kernel tick thread");

    Ok(Handle { cancel, thread: Some(thread) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn ticks_fire_repeatedly() {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        let mut handle = start(Duration::from_millis(10), move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(120));
        handle.stop();

        let observed = count.load(Ordering::SeqCst);
        assert!(observed >= 3, "expected several ticks, saw {observed}");
    }

    #[test]
    fn stop_is_idempotent_and_blocks_until_quiescent() {
        let mut handle = start(Duration::from_millis(5), || {}).unwrap();
        handle.stop();
        handle.stop();
    }

    #[test]
    fn zero_interval_is_rejected() {
        let result = start(Duration::ZERO, || {});
        assert!(matches!(result, Err(MetricsError::InvalidTickInterval)));
    }

    #[test]
    fn panicking_action_cancels_the_schedule_and_reports_it() {
        struct Flag(std::sync::atomic::AtomicBool);
        impl ErrorSink for Flag {
            fn report(&self, _context: &str, _message: &dyn std::fmt::Display) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let flag = Arc::new(Flag(std::sync::atomic::AtomicBool::new(false)));
        let mut handle =
            start_with_sink(Duration::from_millis(5), || panic!("boom"), flag.clone()).unwrap();

        std::thread::sleep(Duration::from_millis(100));
        handle.stop();

        assert!(flag.0.load(Ordering::SeqCst));
    }
}

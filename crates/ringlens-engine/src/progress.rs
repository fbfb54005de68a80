//! Stage progress reporting.
//!
//! The callback is invoked synchronously and serially at named milestones.
//! It observes, never mutates: it receives a human-readable message and a
//! percentage and has no channel back into the engine.

/// Callback invoked at stage milestones with a message and a percentage.
pub type ProgressCallback = Box<dyn Fn(&str, u8) + Send + Sync>;

/// Internal helper that forwards milestones to an optional callback.
pub(crate) struct ProgressReporter<'a> {
    callback: Option<&'a ProgressCallback>,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(callback: Option<&'a ProgressCallback>) -> Self {
        Self { callback }
    }

    /// Emits a milestone if a callback is attached.
    pub(crate) fn milestone(&self, message: &str, percent: u8) {
        if let Some(cb) = self.callback {
            cb(message, percent.min(100));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_milestones_forwarded() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        let cb: ProgressCallback = Box::new(move |_msg, pct| {
            assert!(pct <= 100);
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        let reporter = ProgressReporter::new(Some(&cb));
        reporter.milestone("stage one", 10);
        reporter.milestone("stage two", 120);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_no_callback_is_a_noop() {
        let reporter = ProgressReporter::new(None);
        reporter.milestone("silent", 50);
    }
}

//! Failure reporting for flushes.
//!
//! A buffer never propagates batch or recovery failures to its caller. They
//! are handed to a [`FailureReporter`] instead, which is injected at build
//! time. [`TracingReporter`] is the default.

use std::error::Error;
use std::fmt::Debug;
use std::sync::Arc;

use tracing::error;

/// Sink for failures that happen during a flush.
pub trait FailureReporter: Send {
    /// A batch failed and neither its kind nor any ancestor has a recovery action.
    fn unhandled(&self, kind: &dyn Debug, error: &(dyn Error + 'static));

    /// The recovery action registered for `original` failed itself.
    fn recovery_failed(&self, original: &(dyn Error + 'static), failure: &(dyn Error + 'static));
}

impl<R: FailureReporter + Sync + ?Sized> FailureReporter for Arc<R> {
    fn unhandled(&self, kind: &dyn Debug, error: &(dyn Error + 'static)) {
        (**self).unhandled(kind, error)
    }

    fn recovery_failed(&self, original: &(dyn Error + 'static), failure: &(dyn Error + 'static)) {
        (**self).recovery_failed(original, failure)
    }
}

/// Reports failures as `tracing` error events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn unhandled(&self, kind: &dyn Debug, error: &(dyn Error + 'static)) {
        error!(
            kind = ?kind,
            error = %error,
            cause = ?error.source().map(|s| s.to_string()),
            "unhandled batch failure, discarding batch"
        );
    }

    fn recovery_failed(&self, original: &(dyn Error + 'static), failure: &(dyn Error + 'static)) {
        error!(
            original = %original,
            error = %failure,
            "recovery action failed"
        );
    }
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl FailureReporter for NoopReporter {
    fn unhandled(&self, _kind: &dyn Debug, _error: &(dyn Error + 'static)) {}

    fn recovery_failed(&self, _original: &(dyn Error + 'static), _failure: &(dyn Error + 'static)) {}
}

//! Size-triggered auto-flushing buffer.

use std::collections::{HashMap, VecDeque};
use std::error::Error;
use std::fmt;
use std::num::NonZeroUsize;

use tracing::debug;

use crate::builder::BufferBuilder;
use crate::error::{BatchError, BoxError, RecoveryError};
use crate::hierarchy::{Classify, Hierarchy};
use crate::report::FailureReporter;
use crate::Buffer;

/// Batch function with its return value already discarded.
pub(crate) type BatchFn<T, E> = Box<dyn FnMut(Vec<T>) -> Result<(), E> + Send>;

/// Zero-argument recovery action.
pub(crate) type RecoveryAction = Box<dyn FnMut() -> Result<(), BoxError> + Send>;

pub(crate) type RecoveryMap<K> = HashMap<K, RecoveryAction>;

/// A buffer that hands its items to a batch function once a threshold is reached.
///
/// Items are kept in arrival order. After every [`add`](Self::add), if the
/// number of pending items is at or above the threshold, all of them are
/// removed and passed to the batch function in one call.
///
/// If the batch function fails, the error kind and then each of its ancestors
/// are looked up in the recovery map, and the first registered action runs.
/// Failures never reach the caller of `add` or `drain`: unmatched errors and
/// failing recovery actions go to the injected [`FailureReporter`]. Items of a
/// failed batch are not re-queued.
///
/// The buffer is not synchronized. Use
/// [`SyncAutoFlushBuffer`](crate::SyncAutoFlushBuffer) to share it between threads.
///
/// # Example
///
/// ```
/// use giztoy_autoflush::{AutoFlushBuffer, BatchError, ErrorKind};
/// use std::sync::{Arc, Mutex};
///
/// let saved = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&saved);
///
/// let mut buf = AutoFlushBuffer::<i32, BatchError>::execute(move |batch| {
///     sink.lock().unwrap().push(batch);
///     Ok::<_, BatchError>(())
/// })
/// .when_size_is(3)
/// .handling(ErrorKind::Any)
/// .run(|| eprintln!("batch lost"))
/// .build()
/// .unwrap();
///
/// for i in 0..7 {
///     buf.add(i);
/// }
/// assert_eq!(*saved.lock().unwrap(), vec![vec![0, 1, 2], vec![3, 4, 5]]);
/// assert_eq!(buf.len(), 1);
/// ```
pub struct AutoFlushBuffer<T, E: Classify = BatchError> {
    threshold: NonZeroUsize,
    pending: VecDeque<T>,
    execution: BatchFn<T, E>,
    handlers: RecoveryMap<E::Kind>,
    reporter: Box<dyn FailureReporter>,
}

impl<T, E> AutoFlushBuffer<T, E>
where
    E: Classify + Error + 'static,
{
    /// Starts building a buffer around the given batch function.
    ///
    /// The value returned by `execution` on success is ignored.
    pub fn execute<F, R>(execution: F) -> BufferBuilder<T, E>
    where
        F: FnMut(Vec<T>) -> Result<R, E> + Send + 'static,
    {
        BufferBuilder::execute(execution)
    }

    pub(crate) fn from_parts(
        threshold: NonZeroUsize,
        execution: BatchFn<T, E>,
        handlers: RecoveryMap<E::Kind>,
        reporter: Box<dyn FailureReporter>,
    ) -> Self {
        Self {
            threshold,
            pending: VecDeque::with_capacity(threshold.get()),
            execution,
            handlers,
            reporter,
        }
    }

    /// Appends an item and flushes if the threshold is reached.
    pub fn add(&mut self, item: T) {
        self.pending.push_back(item);
        self.check_size();
    }

    /// Removes and returns all pending items without running the batch function.
    pub fn retrieve_data(&mut self) -> Vec<T> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        self.pending.drain(..).collect()
    }

    /// Flushes all pending items through the batch function.
    ///
    /// Does nothing when the buffer is empty.
    pub fn drain(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.trigger_execution();
    }

    /// Returns the number of pending items.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if no items are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the flush threshold.
    pub fn threshold(&self) -> usize {
        self.threshold.get()
    }

    /// Returns true if a failure of `kind` would run a recovery action.
    pub fn handles(&self, kind: E::Kind) -> bool {
        self.find_handler(kind).is_some()
    }

    fn check_size(&mut self) {
        if self.pending.len() < self.threshold.get() {
            return;
        }
        self.trigger_execution();
    }

    fn trigger_execution(&mut self) {
        let batch = self.retrieve_data();
        debug!(items = batch.len(), "flushing batch");

        if let Err(err) = (self.execution)(batch) {
            self.recover(err);
        }
    }

    fn find_handler(&self, kind: E::Kind) -> Option<E::Kind> {
        kind.ancestry().find(|k| self.handlers.contains_key(k))
    }

    fn recover(&mut self, err: E) {
        let kind = err.kind();
        let Some(matched) = self.find_handler(kind) else {
            self.reporter.unhandled(&kind, &err);
            return;
        };

        debug!(kind = ?kind, matched = ?matched, "running recovery action");
        if let Some(action) = self.handlers.get_mut(&matched) {
            if let Err(failure) = action() {
                self.reporter.recovery_failed(&err, &RecoveryError(failure));
            }
        }
    }
}

impl<T, E> Buffer<T> for AutoFlushBuffer<T, E>
where
    E: Classify + Error + 'static,
{
    fn add(&mut self, item: T) {
        AutoFlushBuffer::add(self, item)
    }

    fn retrieve_data(&mut self) -> Vec<T> {
        AutoFlushBuffer::retrieve_data(self)
    }

    fn drain(&mut self) {
        AutoFlushBuffer::drain(self)
    }

    fn len(&self) -> usize {
        AutoFlushBuffer::len(self)
    }

    fn threshold(&self) -> usize {
        AutoFlushBuffer::threshold(self)
    }
}

impl<T, E: Classify> fmt::Debug for AutoFlushBuffer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoFlushBuffer")
            .field("threshold", &self.threshold)
            .field("pending", &self.pending.len())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::ErrorKind;
    use crate::report::testing::{RecordingReporter, Report};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn collecting(threshold: usize) -> (AutoFlushBuffer<i32>, Arc<Mutex<Vec<Vec<i32>>>>) {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&batches);
        let buf = AutoFlushBuffer::execute(move |batch: Vec<i32>| {
            sink.lock().unwrap().push(batch);
            Ok::<_, BatchError>(())
        })
        .when_size_is(threshold)
        .build()
        .unwrap();
        (buf, batches)
    }

    #[test]
    fn test_flush_at_threshold() {
        let (mut buf, batches) = collecting(3);
        buf.add(1);
        buf.add(2);
        assert!(batches.lock().unwrap().is_empty());
        assert_eq!(buf.len(), 2);

        buf.add(3);
        assert_eq!(*batches.lock().unwrap(), vec![vec![1, 2, 3]]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_threshold_one_flushes_every_add() {
        let (mut buf, batches) = collecting(1);
        buf.add(7);
        buf.add(8);
        assert_eq!(*batches.lock().unwrap(), vec![vec![7], vec![8]]);
    }

    #[test]
    fn test_retrieve_data_is_destructive() {
        let (mut buf, batches) = collecting(10);
        buf.add(1);
        buf.add(2);

        assert_eq!(buf.retrieve_data(), vec![1, 2]);
        assert!(buf.retrieve_data().is_empty());
        assert!(batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_retrieve_data_empty() {
        let (mut buf, batches) = collecting(2);
        assert!(buf.retrieve_data().is_empty());
        assert!(batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drain_below_threshold() {
        let (mut buf, batches) = collecting(5);
        buf.add(1);
        buf.add(2);
        buf.drain();

        assert_eq!(*batches.lock().unwrap(), vec![vec![1, 2]]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_drain_empty_is_noop() {
        let (mut buf, batches) = collecting(5);
        buf.drain();
        assert!(batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_return_value_is_ignored() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut buf = AutoFlushBuffer::<&str>::execute(move |batch| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BatchError>(batch)
        })
        .when_size_is(2)
        .build()
        .unwrap();

        buf.add("a");
        buf.add("b");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_failed_batch_is_not_requeued() {
        let reporter = RecordingReporter::new();
        let mut buf = AutoFlushBuffer::<i32>::execute(|_| Err::<(), _>(BatchError::runtime("nope")))
            .when_size_is(2)
            .reporter(Arc::clone(&reporter))
            .build()
            .unwrap();

        buf.add(1);
        buf.add(2);
        assert!(buf.is_empty());
        assert_eq!(
            reporter.reports(),
            vec![Report::Unhandled {
                kind: "Runtime".to_string(),
                error: "Runtime: nope".to_string(),
            }]
        );
    }

    #[test]
    fn test_recovery_failure_is_reported() {
        let reporter = RecordingReporter::new();
        let mut buf =
            AutoFlushBuffer::<i32>::execute(|_| Err::<(), _>(BatchError::invalid_state("closed")))
                .when_size_is(1)
                .handling(ErrorKind::InvalidState)
                .with(|| Err::<(), _>("reopen failed"))
                .reporter(Arc::clone(&reporter))
                .build()
                .unwrap();

        buf.add(1);
        assert_eq!(
            reporter.reports(),
            vec![Report::RecoveryFailed {
                original: "InvalidState: closed".to_string(),
                failure: "recovery failed: reopen failed".to_string(),
            }]
        );

        // Still usable afterwards.
        buf.add(2);
        assert_eq!(reporter.reports().len(), 2);
    }

    #[test]
    fn test_handles() {
        let buf = AutoFlushBuffer::<i32>::execute(|_| Ok::<_, BatchError>(()))
            .when_size_is(1)
            .handling(ErrorKind::Runtime)
            .run(|| {})
            .build()
            .unwrap();

        assert!(buf.handles(ErrorKind::Runtime));
        assert!(buf.handles(ErrorKind::InvalidArgument));
        assert!(!buf.handles(ErrorKind::Io));
        assert!(!buf.handles(ErrorKind::Any));
    }

    #[test]
    fn test_debug_output() {
        let (mut buf, _) = collecting(4);
        buf.add(1);
        let out = format!("{:?}", buf);
        assert!(out.contains("threshold: 4"));
        assert!(out.contains("pending: 1"));
    }
}

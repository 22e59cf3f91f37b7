//! Mutex-guarded buffer for concurrent producers.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::AutoFlushBuffer;
use crate::error::BatchError;
use crate::hierarchy::Classify;
use crate::Buffer;

/// A cloneable, thread-safe handle to an [`AutoFlushBuffer`].
///
/// A single mutex guards the pending items together with the flush, so the
/// batch function and recovery actions run while the lock is held. Calling
/// back into the same handle from inside the batch function deadlocks.
///
/// ```
/// use giztoy_autoflush::{AutoFlushBuffer, BatchError};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::thread;
///
/// let flushed = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&flushed);
/// let buf = AutoFlushBuffer::<u32, BatchError>::execute(move |batch| {
///     counter.fetch_add(batch.len(), Ordering::SeqCst);
///     Ok::<_, BatchError>(())
/// })
/// .when_size_is(10)
/// .build_sync()
/// .unwrap();
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let buf = buf.clone();
///         thread::spawn(move || (0..25).for_each(|i| buf.add(i)))
///     })
///     .collect();
/// handles.into_iter().for_each(|h| h.join().unwrap());
///
/// assert_eq!(flushed.load(Ordering::SeqCst), 100);
/// assert!(buf.is_empty());
/// ```
pub struct SyncAutoFlushBuffer<T, E: Classify = BatchError> {
    inner: Arc<Mutex<AutoFlushBuffer<T, E>>>,
}

impl<T, E: Classify> Clone for SyncAutoFlushBuffer<T, E> {
    fn clone(&self) -> Self {
        SyncAutoFlushBuffer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> SyncAutoFlushBuffer<T, E>
where
    E: Classify + Error + 'static,
{
    /// Wraps an existing buffer.
    pub fn new(buffer: AutoFlushBuffer<T, E>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(buffer)),
        }
    }

    /// Appends an item and flushes if the threshold is reached.
    pub fn add(&self, item: T) {
        self.inner.lock().add(item);
    }

    /// Removes and returns all pending items without running the batch function.
    pub fn retrieve_data(&self) -> Vec<T> {
        self.inner.lock().retrieve_data()
    }

    /// Flushes all pending items through the batch function.
    pub fn drain(&self) {
        self.inner.lock().drain();
    }

    /// Returns the number of pending items.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if no items are pending.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns the flush threshold.
    pub fn threshold(&self) -> usize {
        self.inner.lock().threshold()
    }
}

impl<T, E> From<AutoFlushBuffer<T, E>> for SyncAutoFlushBuffer<T, E>
where
    E: Classify + Error + 'static,
{
    fn from(buffer: AutoFlushBuffer<T, E>) -> Self {
        Self::new(buffer)
    }
}

impl<T, E> Buffer<T> for SyncAutoFlushBuffer<T, E>
where
    E: Classify + Error + 'static,
{
    fn add(&mut self, item: T) {
        SyncAutoFlushBuffer::add(self, item)
    }

    fn retrieve_data(&mut self) -> Vec<T> {
        SyncAutoFlushBuffer::retrieve_data(self)
    }

    fn drain(&mut self) {
        SyncAutoFlushBuffer::drain(self)
    }

    fn len(&self) -> usize {
        SyncAutoFlushBuffer::len(self)
    }

    fn threshold(&self) -> usize {
        SyncAutoFlushBuffer::threshold(self)
    }
}

impl<T, E: Classify> fmt::Debug for SyncAutoFlushBuffer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SyncAutoFlushBuffer").field(&*self.inner.lock()).finish()
    }
}

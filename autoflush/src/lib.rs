//! Size-bounded, auto-flushing buffers.
//!
//! Items are pushed one at a time. Once the number of pending items reaches a
//! configured threshold, a batch function is called with all of them and the
//! buffer is cleared. Pending items can also be flushed on demand with
//! [`drain`](Buffer::drain), or taken out unprocessed with
//! [`retrieve_data`](Buffer::retrieve_data).
//!
//! - [`AutoFlushBuffer<T, E>`]: single-owner buffer, not synchronized
//! - [`SyncAutoFlushBuffer<T, E>`]: cloneable handle guarded by a mutex
//!
//! # Building
//!
//! Buffers are assembled in stages: bind the batch function, set the size,
//! register recovery actions per error kind, then build.
//!
//! ```
//! use giztoy_autoflush::{AutoFlushBuffer, BatchError, ErrorKind};
//!
//! let mut buf = AutoFlushBuffer::<String, BatchError>::execute(|batch| {
//!     if batch.iter().any(|s| s.is_empty()) {
//!         return Err(BatchError::invalid_argument("empty line"));
//!     }
//!     Ok(batch.len())
//! })
//! .when_size_is(2)
//! .handling(ErrorKind::Runtime)
//! .run(|| eprintln!("dropping batch with empty line"))
//! .build()
//! .unwrap();
//!
//! buf.add("a".to_string());
//! buf.add(String::new()); // flushes, fails, recovery runs
//! assert!(buf.is_empty());
//! ```
//!
//! # Failure handling
//!
//! Batch errors implement [`Classify`], which maps them to a kind in a
//! [`Hierarchy`]. On failure, the kind and then its ancestors are looked up
//! and the first registered recovery action runs. If none matches, or the
//! action itself fails, the event goes to the [`FailureReporter`] (by default
//! [`TracingReporter`], which logs through `tracing`). Nothing is returned to
//! the caller of `add` or `drain`, and the failed batch is not re-queued.
//!
//! [`ErrorKind`] and [`BatchError`] cover the common cases. Implement
//! [`Hierarchy`] and [`Classify`] to use your own error types.

mod buffer;
mod builder;
mod config;
mod error;
mod hierarchy;
mod report;
mod sync;

pub use buffer::AutoFlushBuffer;
pub use builder::{BufferBuilder, HandlerBuilder, SizedBufferBuilder};
pub use config::BufferConfig;
pub use error::{BatchError, BoxError, ConfigError, RecoveryError};
pub use hierarchy::{Ancestry, Classify, ErrorKind, Hierarchy, MAX_DEPTH};
pub use report::{FailureReporter, NoopReporter, TracingReporter};
pub use sync::SyncAutoFlushBuffer;

/// Common contract of the buffers in this crate.
pub trait Buffer<T> {
    /// Appends an item. May flush.
    fn add(&mut self, item: T);

    /// Gets the data and clears the buffer.
    ///
    /// The buffer is empty after this returns. The batch function is not called.
    fn retrieve_data(&mut self) -> Vec<T>;

    /// Drains the buffer through the batch function.
    fn drain(&mut self);

    /// Number of pending items.
    fn len(&self) -> usize;

    /// Returns true if no items are pending.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pending count that triggers a flush.
    fn threshold(&self) -> usize;
}

//! Staged builder for [`AutoFlushBuffer`].
//!
//! The stages are encoded in types:
//!
//! 1. [`BufferBuilder`] holds only the batch function.
//! 2. [`SizedBufferBuilder`] adds the threshold and the recovery map. Handlers
//!    can only be registered here, so a recovery map always exists.
//! 3. [`HandlerBuilder`] binds one recovery action to an error kind and
//!    returns to the sized stage.

use std::collections::HashMap;
use std::error::Error;
use std::num::NonZeroUsize;

use crate::buffer::{AutoFlushBuffer, BatchFn, RecoveryAction, RecoveryMap};
use crate::config::BufferConfig;
use crate::error::{BatchError, BoxError, ConfigError};
use crate::hierarchy::Classify;
use crate::report::{FailureReporter, TracingReporter};
use crate::sync::SyncAutoFlushBuffer;

/// Builder holding the batch function. Call [`when_size_is`](Self::when_size_is) next.
pub struct BufferBuilder<T, E: Classify = BatchError> {
    execution: BatchFn<T, E>,
}

impl<T, E> BufferBuilder<T, E>
where
    E: Classify + Error + 'static,
{
    /// Binds the batch function. It cannot be changed afterwards.
    pub fn execute<F, R>(mut execution: F) -> Self
    where
        F: FnMut(Vec<T>) -> Result<R, E> + Send + 'static,
    {
        Self {
            execution: Box::new(move |batch: Vec<T>| execution(batch).map(|_| ())),
        }
    }

    /// Sets the flush threshold and starts an empty recovery map.
    pub fn when_size_is(self, size: usize) -> SizedBufferBuilder<T, E> {
        SizedBufferBuilder {
            execution: self.execution,
            size,
            handlers: HashMap::new(),
            reporter: Box::new(TracingReporter),
        }
    }

    /// Sets the flush threshold from a config, failing if it is missing or zero.
    pub fn when_configured(
        self,
        config: &BufferConfig,
    ) -> Result<SizedBufferBuilder<T, E>, ConfigError> {
        let threshold = config.validate()?;
        Ok(self.when_size_is(threshold.get()))
    }
}

/// Builder with a threshold set. Register handlers, then [`build`](Self::build).
pub struct SizedBufferBuilder<T, E: Classify = BatchError> {
    execution: BatchFn<T, E>,
    size: usize,
    handlers: RecoveryMap<E::Kind>,
    reporter: Box<dyn FailureReporter>,
}

impl<T, E> SizedBufferBuilder<T, E>
where
    E: Classify + Error + 'static,
{
    /// Replaces the threshold and clears every registered handler.
    pub fn when_size_is(mut self, size: usize) -> Self {
        self.size = size;
        self.handlers = HashMap::new();
        self
    }

    /// Starts registering a recovery action for `kind` and its descendants.
    pub fn handling(self, kind: E::Kind) -> HandlerBuilder<T, E> {
        HandlerBuilder {
            kind,
            builder: self,
        }
    }

    /// Sets where unhandled and recovery failures are reported.
    ///
    /// Defaults to [`TracingReporter`].
    pub fn reporter<R: FailureReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// Builds the buffer.
    ///
    /// Returns [`ConfigError::InvalidThreshold`] if the size is zero.
    pub fn build(self) -> Result<AutoFlushBuffer<T, E>, ConfigError> {
        let threshold =
            NonZeroUsize::new(self.size).ok_or(ConfigError::InvalidThreshold(self.size))?;
        Ok(AutoFlushBuffer::from_parts(
            threshold,
            self.execution,
            self.handlers,
            self.reporter,
        ))
    }

    /// Builds a mutex-guarded buffer that can be shared between threads.
    pub fn build_sync(self) -> Result<SyncAutoFlushBuffer<T, E>, ConfigError> {
        self.build().map(SyncAutoFlushBuffer::new)
    }

    fn register(mut self, kind: E::Kind, action: RecoveryAction) -> Self {
        self.handlers.insert(kind, action);
        self
    }
}

/// Binds a recovery action to one error kind.
pub struct HandlerBuilder<T, E: Classify = BatchError> {
    kind: E::Kind,
    builder: SizedBufferBuilder<T, E>,
}

impl<T, E> HandlerBuilder<T, E>
where
    E: Classify + Error + 'static,
{
    /// Registers a fallible action. A later registration for the same kind replaces it.
    pub fn with<F, R, X>(self, mut action: F) -> SizedBufferBuilder<T, E>
    where
        F: FnMut() -> Result<R, X> + Send + 'static,
        X: Into<BoxError>,
    {
        let kind = self.kind;
        self.builder.register(
            kind,
            Box::new(move || -> Result<(), BoxError> {
                action().map(|_| ()).map_err(Into::into)
            }),
        )
    }

    /// Registers a procedure that cannot fail.
    pub fn run<F>(self, mut procedure: F) -> SizedBufferBuilder<T, E>
    where
        F: FnMut() + Send + 'static,
    {
        let kind = self.kind;
        self.builder.register(
            kind,
            Box::new(move || -> Result<(), BoxError> {
                procedure();
                Ok(())
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::ErrorKind;
    use crate::report::NoopReporter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn failing() -> BufferBuilder<i32> {
        BufferBuilder::execute(|_| Err::<(), _>(BatchError::invalid_argument("bad")))
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_build_zero_threshold() {
        let err = failing().when_size_is(0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidThreshold(0));
    }

    #[test]
    fn test_when_configured() {
        let buf = failing()
            .when_configured(&BufferConfig::new(8))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(buf.threshold(), 8);

        let err = failing().when_configured(&BufferConfig::default()).err();
        assert_eq!(err, Some(ConfigError::MissingThreshold));

        let err = failing().when_configured(&BufferConfig::new(0)).err();
        assert_eq!(err, Some(ConfigError::InvalidThreshold(0)));
    }

    #[test]
    fn test_resize_resets_handlers() {
        let (count, handler) = counter();
        let mut buf = failing()
            .when_size_is(1)
            .handling(ErrorKind::InvalidArgument)
            .run(handler)
            .when_size_is(2)
            .reporter(NoopReporter)
            .build()
            .unwrap();

        assert!(!buf.handles(ErrorKind::InvalidArgument));
        assert_eq!(buf.threshold(), 2);

        buf.add(1);
        buf.add(2);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_last_registration_wins() {
        let (first, first_handler) = counter();
        let (second, second_handler) = counter();
        let mut buf = failing()
            .when_size_is(1)
            .handling(ErrorKind::InvalidArgument)
            .run(first_handler)
            .handling(ErrorKind::InvalidArgument)
            .run(second_handler)
            .build()
            .unwrap();

        buf.add(1);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_with_discards_return_value() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let mut buf = failing()
            .when_size_is(1)
            .handling(ErrorKind::Runtime)
            .with(move || Ok::<_, BoxError>(c.fetch_add(1, Ordering::SeqCst)))
            .build()
            .unwrap();

        buf.add(1);
        buf.add(2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_build_sync() {
        let buf = failing()
            .when_size_is(3)
            .reporter(NoopReporter)
            .build_sync()
            .unwrap();
        assert_eq!(buf.threshold(), 3);
    }
}

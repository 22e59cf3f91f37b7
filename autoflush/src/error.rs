//! Error types for auto-flushing buffers.

use std::error::Error;

use crate::hierarchy::{Classify, ErrorKind};

/// Boxed error used for recovery action failures and error sources.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Configuration error returned when a buffer cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No threshold was configured.
    #[error("autoflush: threshold is not set")]
    MissingThreshold,

    /// The threshold must be at least one item.
    #[error("autoflush: invalid threshold {0}, must be >= 1")]
    InvalidThreshold(usize),
}

/// Error returned by a batch function.
///
/// Carries an [`ErrorKind`] so that recovery actions can be matched against
/// the kind or any of its ancestors.
#[derive(Debug, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct BatchError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl BatchError {
    /// Creates a new batch error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches an underlying cause.
    pub fn with_source<S>(mut self, source: S) -> Self
    where
        S: Into<BoxError>,
    {
        self.source = Some(source.into());
        self
    }

    /// Shorthand for [`ErrorKind::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Shorthand for [`ErrorKind::InvalidState`].
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    /// Shorthand for [`ErrorKind::Runtime`].
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    /// Returns the message without the kind prefix.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Classify for BatchError {
    type Kind = ErrorKind;

    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<std::io::Error> for BatchError {
    fn from(e: std::io::Error) -> Self {
        let kind = match e.kind() {
            std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::InvalidInput => ErrorKind::InvalidArgument,
            _ => ErrorKind::Io,
        };
        BatchError::new(kind, e.to_string()).with_source(e)
    }
}

/// Failure raised by a recovery action.
#[derive(Debug, thiserror::Error)]
#[error("recovery failed: {0}")]
pub struct RecoveryError(#[source] pub BoxError);

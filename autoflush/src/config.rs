//! Serializable buffer configuration.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Buffer configuration, typically loaded from a config file.
///
/// ```
/// use giztoy_autoflush::BufferConfig;
///
/// let config: BufferConfig = serde_json::from_str(r#"{"threshold": 100}"#).unwrap();
/// assert_eq!(config.validate().unwrap().get(), 100);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Number of pending items that triggers a flush.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<usize>,
}

impl BufferConfig {
    /// Creates a config with the given threshold.
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: Some(threshold),
        }
    }

    /// Returns the validated threshold.
    pub fn validate(&self) -> Result<NonZeroUsize, ConfigError> {
        let threshold = self.threshold.ok_or(ConfigError::MissingThreshold)?;
        NonZeroUsize::new(threshold).ok_or(ConfigError::InvalidThreshold(threshold))
    }
}

//! Run configuration
//!
//! A [`ConfigFile`] is the partial form read from disk or assembled from the
//! command line. Layers are merged with [`ConfigFile::merge`] and turned into
//! a validated [`SyncConfig`] once, before any request is made.

use crate::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, RetryPolicy};
use crate::{Result, SyncError};
use prmd_text::normalize;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Validated configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// The markdown block to keep in the document.
    pub block: String,
    /// Attempts for fetches and for writes, each.
    pub max_retries: u32,
    /// Base of the exponential backoff, in milliseconds.
    pub backoff_base_ms: u64,
}

impl SyncConfig {
    /// Configuration with default retry settings.
    pub fn new(block: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            max_retries: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: millis(DEFAULT_BASE_DELAY),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_base_ms(mut self, backoff_base_ms: u64) -> Self {
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Check the configuration.
    ///
    /// # Errors
    /// Returns [`SyncError::Configuration`] if the block is empty after
    /// normalization or the retry budget is zero.
    pub fn validate(&self) -> Result<()> {
        if normalize(&self.block).is_empty() {
            return Err(SyncError::configuration(
                "the markdown block is empty; set `block` (or the `add_markdown` input)",
            ));
        }
        if self.max_retries == 0 {
            return Err(SyncError::configuration("`max_retries` must be at least 1"));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.backoff_base_ms),
        )
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Partial configuration as found in a file or on the command line.
///
/// Keys accept snake_case and the camelCase spelling of the action inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, alias = "add_markdown", skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,

    #[serde(default, alias = "maxRetries", skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    #[serde(default, alias = "backoffBaseMs", skip_serializing_if = "Option::is_none")]
    pub backoff_base_ms: Option<u64>,
}

impl ConfigFile {
    /// Load configuration from a file.
    ///
    /// Format is detected from file extension:
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(|e| SyncError::ConfigParse {
                path: path.to_path_buf(),
                format: "TOML".into(),
                message: e.to_string(),
            }),
            "json" => serde_json::from_str(&content).map_err(|e| SyncError::ConfigParse {
                path: path.to_path_buf(),
                format: "JSON".into(),
                message: e.to_string(),
            }),
            _ => Err(SyncError::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: ConfigFile) -> ConfigFile {
        ConfigFile {
            block: overrides.block.or(self.block),
            max_retries: overrides.max_retries.or(self.max_retries),
            backoff_base_ms: overrides.backoff_base_ms.or(self.backoff_base_ms),
        }
    }

    /// Fill in defaults and validate.
    pub fn into_config(self) -> Result<SyncConfig> {
        let block = self.block.ok_or_else(|| {
            SyncError::configuration(
                "no markdown block configured; set `block` (or the `add_markdown` input)",
            )
        })?;

        let mut config = SyncConfig::new(block);
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(backoff_base_ms) = self.backoff_base_ms {
            config.backoff_base_ms = backoff_base_ms;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::new("block");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_base_ms, 1000);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_whitespace_block_is_rejected() {
        let err = SyncConfig::new(" \r\n\t").validate().unwrap_err();
        assert!(matches!(err, SyncError::Configuration { .. }));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let err = SyncConfig::new("x").with_max_retries(0).validate().unwrap_err();
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let file = ConfigFile {
            block: Some("from file".into()),
            max_retries: Some(5),
            backoff_base_ms: None,
        };
        let cli = ConfigFile {
            block: Some("from cli".into()),
            ..Default::default()
        };

        let config = file.merge(cli).into_config().unwrap();
        assert_eq!(config.block, "from cli");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.backoff_base_ms, 1000);
    }

    #[test]
    fn test_missing_block_is_configuration_error() {
        let err = ConfigFile::default().into_config().unwrap_err();
        assert!(matches!(err, SyncError::Configuration { .. }));
    }

    #[test]
    fn test_camel_case_aliases() {
        let file: ConfigFile =
            serde_json::from_str(r#"{"add_markdown": "b", "maxRetries": 2, "backoffBaseMs": 10}"#)
                .unwrap();
        assert_eq!(file.block.as_deref(), Some("b"));
        assert_eq!(file.max_retries, Some(2));
        assert_eq!(file.backoff_base_ms, Some(10));
    }
}

//! Tap configuration loaded from a JSON file.
//!
//! # Example
//!
//! ```
//! use tap_googleplay::config::TapConfig;
//!
//! let config = TapConfig::from_value(serde_json::json!({
//!     "key_file": "/secrets/service-account.json",
//!     "start_date": "2019-06-01T00:00:00Z",
//!     "bucket_name": "pubsite_prod_rev_0123456789",
//!     "package_name": "com.example.app"
//! }))
//! .unwrap();
//! assert_eq!(config.dimension, "os_version");
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dates::parse_timestamp;
use crate::error::{Result, TapError};

/// Keys that must be present in every config file.
pub const REQUIRED_CONFIG_KEYS: [&str; 4] = ["key_file", "start_date", "bucket_name", "package_name"];

/// Dimension reported on when the config does not name one.
pub const DEFAULT_DIMENSION: &str = "os_version";

/// Configuration for a tap run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Path to the service-account key file used to reach the bucket
    pub key_file: String,

    /// Fallback cursor when no bookmark exists (ISO-8601, UTC)
    pub start_date: String,

    /// Bucket holding the Play Console report exports
    pub bucket_name: String,

    /// Application package whose reports are extracted
    pub package_name: String,

    /// Report dimension (default: `os_version`)
    #[serde(default = "default_dimension")]
    pub dimension: String,
}

fn default_dimension() -> String {
    DEFAULT_DIMENSION.to_string()
}

impl TapConfig {
    /// Loads and validates a config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TapError::configuration(format!("Cannot read config file '{}': {e}", path.display()))
        })?;
        let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            TapError::configuration(format!("Config file '{}' is not valid JSON: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_value(value)
    }

    /// Validates required keys and builds the config from a JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| TapError::configuration("Config must be a JSON object"))?;

        let missing: Vec<&str> = REQUIRED_CONFIG_KEYS
            .iter()
            .copied()
            .filter(|key| object.get(*key).map_or(true, |v| v.is_null()))
            .collect();
        if !missing.is_empty() {
            return Err(TapError::configuration(format!(
                "Config is missing required keys: {missing:?}"
            )));
        }

        let config: Self = serde_json::from_value(value)
            .map_err(|e| TapError::configuration(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks field contents beyond presence.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("key_file", &self.key_file),
            ("bucket_name", &self.bucket_name),
            ("package_name", &self.package_name),
            ("dimension", &self.dimension),
        ] {
            if value.trim().is_empty() {
                return Err(TapError::configuration(format!("'{name}' must not be empty")));
            }
        }
        self.start_date()?;
        Ok(())
    }

    /// The fallback cursor as an instant.
    pub fn start_date(&self) -> Result<DateTime<Utc>> {
        parse_timestamp(&self.start_date).map_err(|e| {
            TapError::configuration(format!("Invalid 'start_date': {e}"))
        })
    }
}

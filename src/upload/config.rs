use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BATCH_VOLUME: usize = 8 * 1024;
pub const DEFAULT_VOLUME_THRESHOLD: usize = 8 * 1024;
pub const DEFAULT_MAXIMUM_ALLOWED_VOLUME: usize = 1024 * 1024;
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
/// Longest accepted upload timeout. Deadlines are clamped to it as well.
pub const MAX_UPLOAD_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadConfigError {
    #[error("Invalid upload configuration: {0}")]
    Invalid(String),
}

/// Which in-flight blocks a detected delivery timeout takes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutScope {
    /// One overdue block is treated as a transport stall: every tracked block is failed.
    #[default]
    AllInFlight,
    /// Only blocks whose own deadline has passed are failed.
    OverdueOnly,
}

/// Thresholds driving upload and cleanup decisions. Replaced wholesale, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogUploadConfig {
    /// Maximum bytes drained into one block.
    pub batch_volume: usize,
    /// Pending bytes at or above which an upload is requested.
    pub volume_threshold: usize,
    /// Pending bytes at or above which oldest records are evicted.
    pub maximum_allowed_volume: usize,
    /// How long a block may stay unacknowledged before it is declared lost.
    #[serde(rename = "upload_timeout_secs", with = "duration_secs")]
    pub upload_timeout: Duration,
    pub timeout_scope: TimeoutScope,
}

impl Default for LogUploadConfig {
    fn default() -> Self {
        Self {
            batch_volume: DEFAULT_BATCH_VOLUME,
            volume_threshold: DEFAULT_VOLUME_THRESHOLD,
            maximum_allowed_volume: DEFAULT_MAXIMUM_ALLOWED_VOLUME,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            timeout_scope: TimeoutScope::default(),
        }
    }
}

impl LogUploadConfig {
    pub fn validate(&self) -> Result<(), UploadConfigError> {
        if self.batch_volume == 0 {
            return Err(UploadConfigError::Invalid(
                "Batch volume must be greater than 0".to_string(),
            ));
        }

        if self.maximum_allowed_volume == 0 {
            return Err(UploadConfigError::Invalid(
                "Maximum allowed volume must be greater than 0".to_string(),
            ));
        }

        if self.volume_threshold > self.maximum_allowed_volume {
            return Err(UploadConfigError::Invalid(format!(
                "Volume threshold ({}) must not exceed maximum allowed volume ({})",
                self.volume_threshold, self.maximum_allowed_volume
            )));
        }

        if self.upload_timeout.is_zero() {
            return Err(UploadConfigError::Invalid(
                "Upload timeout must be greater than 0".to_string(),
            ));
        }

        if self.upload_timeout > MAX_UPLOAD_TIMEOUT {
            return Err(UploadConfigError::Invalid(format!(
                "Upload timeout ({}s) must not exceed {}s",
                self.upload_timeout.as_secs(),
                MAX_UPLOAD_TIMEOUT.as_secs()
            )));
        }

        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

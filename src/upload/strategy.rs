use super::config::LogUploadConfig;
use crate::storage::LogStorageStatus;

/// What the collector should do after the buffer changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadDecision {
    Upload,
    Cleanup,
    Noop,
}

/// Pure policy deciding whether enough data is buffered to upload.
///
/// Implementations must not mutate anything; the collector acts on the result.
pub trait LogUploadStrategy: Send + Sync {
    fn decide(&self, config: &LogUploadConfig, status: &dyn LogStorageStatus) -> UploadDecision;
}

/// Volume-based default: cleanup at the hard cap, upload at the threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeUploadStrategy;

impl LogUploadStrategy for VolumeUploadStrategy {
    fn decide(&self, config: &LogUploadConfig, status: &dyn LogStorageStatus) -> UploadDecision {
        let consumed = status.consumed_volume();

        // An oversized buffer must shed data before another upload makes sense.
        if consumed >= config.maximum_allowed_volume {
            UploadDecision::Cleanup
        } else if consumed >= config.volume_threshold {
            UploadDecision::Upload
        } else {
            UploadDecision::Noop
        }
    }
}

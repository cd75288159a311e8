//! Upload policy: configuration, decision strategy, failover and in-flight deadlines.

pub mod clock;
pub mod config;
pub mod failover;
pub mod strategy;
pub mod timeout;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LogUploadConfig, MAX_UPLOAD_TIMEOUT, TimeoutScope, UploadConfigError};
pub use failover::{
    BackoffFailoverStrategy, FailoverConfig, LogUploadFailoverStrategy, RetryStrategy,
};
#[cfg(test)]
pub use failover::MockLogUploadFailoverStrategy;
pub use strategy::{LogUploadStrategy, UploadDecision, VolumeUploadStrategy};
pub use timeout::TimeoutTracker;

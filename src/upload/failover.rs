use super::clock::{Clock, SystemClock};
use crate::domain::LogDeliveryErrorCode;
use crate::transport::ChannelManager;
use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[cfg(test)]
use mockall::automock;

/// Policy reacting to delivery errors and gating new sync cycles.
///
/// Kept apart from [`LogUploadStrategy`](super::LogUploadStrategy) so "is there
/// enough to send" and "is it sane to send right now" can be swapped independently.
#[cfg_attr(test, automock)]
pub trait LogUploadFailoverStrategy: Send + Sync {
    fn on_failure(&mut self, error_code: LogDeliveryErrorCode);

    fn on_timeout(&mut self);

    /// A block was acknowledged.
    fn on_success(&mut self) {}

    fn is_upload_approved(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    ExponentialBackoff,
    LinearBackoff,
    FixedDelay,
}

#[derive(Debug, Clone)]
pub struct FailoverConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub strategy: RetryStrategy,
    pub jitter: bool,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
            strategy: RetryStrategy::ExponentialBackoff,
            jitter: true,
        }
    }
}

/// Default failover: every failure or timeout closes the upload gate for a
/// backoff period that grows with consecutive failures.
pub struct BackoffFailoverStrategy {
    config: FailoverConfig,
    consecutive_failures: u32,
    blocked_until: Option<Instant>,
    last_error: Option<LogDeliveryErrorCode>,
    channel_manager: Option<Arc<dyn ChannelManager>>,
    clock: Arc<dyn Clock>,
}

impl Default for BackoffFailoverStrategy {
    fn default() -> Self {
        Self::new(FailoverConfig::default())
    }
}

impl BackoffFailoverStrategy {
    pub fn new(config: FailoverConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
            blocked_until: None,
            last_error: None,
            channel_manager: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Notified on delivery timeouts so the transport can move to another endpoint.
    pub fn with_channel_manager(mut self, manager: Arc<dyn ChannelManager>) -> Self {
        self.channel_manager = Some(manager);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_error(&self) -> Option<LogDeliveryErrorCode> {
        self.last_error
    }

    /// Remaining time the upload gate stays closed.
    pub fn remaining_backoff(&self) -> Duration {
        self.blocked_until
            .map(|until| until.saturating_duration_since(self.clock.now()))
            .unwrap_or_default()
    }

    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_millis = self.config.base_delay.as_millis() as u64;
        let base_delay = match self.config.strategy {
            RetryStrategy::ExponentialBackoff => {
                let multiplier = 2_u64.saturating_pow(attempt);
                Duration::from_millis(base_millis.saturating_mul(multiplier))
            }
            RetryStrategy::LinearBackoff => {
                Duration::from_millis(base_millis.saturating_mul(attempt as u64 + 1))
            }
            RetryStrategy::FixedDelay => self.config.base_delay,
        };

        // Apply maximum delay cap
        let capped_delay = std::cmp::min(base_delay, self.config.max_delay);

        if self.config.jitter {
            apply_jitter(capped_delay)
        } else {
            capped_delay
        }
    }

    fn back_off(&mut self, delay: Duration) {
        self.blocked_until = Some(self.clock.now() + delay);
    }

    fn record_failure(&mut self) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let delay = self.calculate_delay(self.consecutive_failures - 1);
        self.back_off(delay);
        delay
    }
}

impl LogUploadFailoverStrategy for BackoffFailoverStrategy {
    fn on_failure(&mut self, error_code: LogDeliveryErrorCode) {
        self.last_error = Some(error_code);

        let delay = match error_code {
            // Nothing on the server side will accept logs until it is reconfigured.
            LogDeliveryErrorCode::NoAppendersConfigured => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.back_off(self.config.max_delay);
                self.config.max_delay
            }
            LogDeliveryErrorCode::AppenderInternalError
            | LogDeliveryErrorCode::RemoteConnectionError
            | LogDeliveryErrorCode::RemoteInternalError => self.record_failure(),
        };

        warn!(
            ?error_code,
            consecutive_failures = self.consecutive_failures,
            backoff_ms = delay.as_millis() as u64,
            "Log delivery failed, delaying next upload"
        );
    }

    fn on_timeout(&mut self) {
        let delay = self.record_failure();

        info!(
            consecutive_failures = self.consecutive_failures,
            backoff_ms = delay.as_millis() as u64,
            "Log delivery timed out, delaying next upload"
        );

        if let Some(manager) = &self.channel_manager {
            manager.on_server_failed();
        }
    }

    fn on_success(&mut self) {
        if self.consecutive_failures > 0 {
            info!(
                consecutive_failures = self.consecutive_failures,
                "Log delivery recovered"
            );
        }
        self.consecutive_failures = 0;
        self.blocked_until = None;
        self.last_error = None;
    }

    fn is_upload_approved(&self) -> bool {
        self.blocked_until
            .is_none_or(|until| self.clock.now() >= until)
    }
}

fn apply_jitter(delay: Duration) -> Duration {
    let mut rng = rand::rng();
    let jitter_factor = rng.random_range(0.5..1.5); // ±50% jitter
    let jittered_millis = (delay.as_millis() as f64 * jitter_factor) as u64;
    Duration::from_millis(jittered_millis)
}

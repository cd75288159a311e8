//! The log collector: ingestion entry point and transport hooks.
//!
//! `LogCollector` owns storage, the upload and failover strategies and the
//! timeout tracker behind a single lock. Producers call [`LogCollector::add_record`];
//! the transport calls [`LogCollector::fill_sync_request`] when it is ready to
//! send and [`LogCollector::on_response`] once the collector answered.

pub mod builder;
pub mod stats;
pub mod sweeper;

pub use builder::LogCollectorBuilder;
pub use stats::{CollectorStats, CollectorStatsSnapshot};
pub use sweeper::spawn_timeout_sweeper;

use crate::domain::{
    BlockId, CollectorError, LogDeliveryErrorCode, LogRecord, LogSyncRequest, LogSyncResponse,
};
use crate::storage::{LogStorage, LogStorageStatus};
use crate::transport::LogTransport;
use crate::upload::{
    Clock, LogUploadConfig, LogUploadFailoverStrategy, LogUploadStrategy, MAX_UPLOAD_TIMEOUT,
    TimeoutTracker, UploadDecision,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Whether a sync cycle has been requested and not yet serviced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectorState {
    Idle,
    Uploading,
}

/// Point-in-time occupancy as seen by the upload strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageSnapshot {
    pub consumed_volume: usize,
    pub record_count: usize,
    pub in_flight_volume: usize,
}

pub struct LogCollector {
    inner: Mutex<CollectorInner>,
    transport: Arc<dyn LogTransport>,
    clock: Arc<dyn Clock>,
    stats: Arc<CollectorStats>,
}

struct CollectorInner {
    config: LogUploadConfig,
    storage: Box<dyn LogStorage>,
    storage_status: Option<Arc<dyn LogStorageStatus>>,
    upload_strategy: Box<dyn LogUploadStrategy>,
    failover_strategy: Box<dyn LogUploadFailoverStrategy>,
    timeouts: TimeoutTracker,
    uploading: bool,
}

impl CollectorInner {
    fn status(&self) -> &dyn LogStorageStatus {
        match &self.storage_status {
            Some(status) => status.as_ref(),
            None => self.storage.as_ref(),
        }
    }

    fn decide(&self) -> UploadDecision {
        self.upload_strategy.decide(&self.config, self.status())
    }
}

impl LogCollector {
    /// Collector with default storage, strategies and configuration.
    pub fn new(transport: Arc<dyn LogTransport>) -> Self {
        Self::builder(transport).build()
    }

    pub fn builder(transport: Arc<dyn LogTransport>) -> LogCollectorBuilder {
        LogCollectorBuilder::new(transport)
    }

    pub(crate) fn from_parts(
        transport: Arc<dyn LogTransport>,
        clock: Arc<dyn Clock>,
        config: LogUploadConfig,
        storage: Box<dyn LogStorage>,
        storage_status: Option<Arc<dyn LogStorageStatus>>,
        upload_strategy: Box<dyn LogUploadStrategy>,
        failover_strategy: Box<dyn LogUploadFailoverStrategy>,
    ) -> Self {
        Self {
            inner: Mutex::new(CollectorInner {
                config,
                storage,
                storage_status,
                upload_strategy,
                failover_strategy,
                timeouts: TimeoutTracker::new(),
                uploading: false,
            }),
            transport,
            clock,
            stats: Arc::new(CollectorStats::new()),
        }
    }

    /// Buffers one serialized record and reacts to the new buffer occupancy.
    ///
    /// Fails only when storage refuses the record; the record is then not buffered.
    pub fn add_record(&self, record: impl Into<LogRecord>) -> Result<(), CollectorError> {
        let record = record.into();
        let size = record.size();

        let should_sync = {
            let mut inner = self.inner.lock();

            if let Err(e) = inner.storage.append(record) {
                self.stats.record_rejected();
                warn!(error = %e, bytes = size, "Log record rejected by storage");
                return Err(e.into());
            }
            self.stats.record_added(size);

            // A detected timeout already notified failover; skip the upload check this time.
            if self.sweep_timeouts(&mut inner) {
                false
            } else {
                let decision = inner.decide();
                self.apply_decision(&mut inner, decision)
            }
        };

        if should_sync {
            self.request_sync();
        }
        Ok(())
    }

    /// Serializes `entry` as JSON and buffers it.
    pub fn add_entry<T: Serialize>(&self, entry: &T) -> Result<(), CollectorError> {
        let record = LogRecord::from_entry(entry).inspect_err(|e| {
            self.stats.record_rejected();
            warn!(error = %e, "Failed to serialize log entry");
        })?;
        self.add_record(record)
    }

    /// Drains one block into `request`. Called by the transport when it is ready to send.
    ///
    /// The uploading flag is cleared here, before the outcome is known, so the
    /// next ingestion may request another cycle while this block is still in flight.
    pub fn fill_sync_request(&self, request: &mut LogSyncRequest) {
        let mut inner = self.inner.lock();

        // Computed before draining so a drained block is always tracked.
        let deadline = self.clock.now() + inner.config.upload_timeout.min(MAX_UPLOAD_TIMEOUT);
        let batch_volume = inner.config.batch_volume;
        let block = inner.storage.drain_block(batch_volume);
        inner.uploading = false;

        let Some(block) = block else {
            warn!("Log block is empty: storage is empty or block volume is too small");
            return;
        };

        if block.is_empty() {
            // Nothing to send, so nothing to track either.
            inner.storage.confirm(block.block_id());
            warn!(block_id = block.block_id(), "Storage returned an empty log block");
            return;
        }

        inner.timeouts.track(block.block_id(), deadline);
        self.stats.record_block_sent(block.len());

        trace!(
            block_id = block.block_id(),
            records = block.len(),
            bytes = block.volume(),
            "Sending log records"
        );

        request.fill_from(block);
    }

    /// Applies per-block delivery outcomes reported by the transport.
    pub fn on_response(&self, response: LogSyncResponse) {
        let should_sync = {
            let mut inner = self.inner.lock();

            for status in &response.delivery_statuses {
                let block_id = status.request_id;
                let tracked = inner.timeouts.remove(block_id);
                if !tracked {
                    debug!(block_id, "Delivery status for a block that is no longer tracked");
                }

                if status.is_success() {
                    inner.storage.confirm(block_id);
                    inner.failover_strategy.on_success();
                    if tracked {
                        self.stats.record_block_acknowledged();
                    }
                } else {
                    let error_code = status
                        .error_code
                        .unwrap_or(LogDeliveryErrorCode::RemoteInternalError);
                    warn!(block_id, ?error_code, "Log block delivery failed");
                    inner.storage.fail(block_id);
                    inner.failover_strategy.on_failure(error_code);
                    if tracked {
                        self.stats.record_block_failed();
                    }
                }
            }

            let decision = inner.decide();
            self.apply_decision(&mut inner, decision)
        };

        if should_sync {
            self.request_sync();
        }
    }

    /// Runs the delivery timeout sweep outside of ingestion.
    ///
    /// Returns true when a timeout was detected.
    pub fn check_delivery_timeout(&self) -> bool {
        let mut inner = self.inner.lock();
        self.sweep_timeouts(&mut inner)
    }

    pub fn set_upload_strategy(&self, strategy: Box<dyn LogUploadStrategy>) {
        self.inner.lock().upload_strategy = strategy;
        info!("New log upload strategy was set");
    }

    pub fn set_failover_strategy(&self, strategy: Box<dyn LogUploadFailoverStrategy>) {
        self.inner.lock().failover_strategy = strategy;
        info!("New failover strategy was set");
    }

    /// Replaces the storage backend.
    ///
    /// Records buffered in the previous backend are not migrated. Blocks it
    /// still had in flight stop being tracked, and the status view falls back
    /// to the new storage.
    pub fn set_storage(&self, storage: Box<dyn LogStorage>) {
        let mut inner = self.inner.lock();
        let orphaned = inner.timeouts.len();
        inner.storage = storage;
        inner.storage_status = None;
        inner.timeouts = TimeoutTracker::new();
        info!(orphaned_blocks = orphaned, "New log storage was set");
    }

    pub fn set_storage_status(&self, status: Arc<dyn LogStorageStatus>) {
        self.inner.lock().storage_status = Some(status);
        info!("New log storage status was set");
    }

    /// Replaces the configuration and re-evaluates the upload decision.
    ///
    /// An invalid configuration is ignored and the current one stays in effect.
    pub fn set_configuration(&self, config: LogUploadConfig) {
        let should_sync = {
            let mut inner = self.inner.lock();

            if let Err(e) = config.validate() {
                warn!(error = %e, "Ignoring invalid log upload configuration");
                return;
            }

            inner.config = config;
            info!(
                batch_volume = inner.config.batch_volume,
                volume_threshold = inner.config.volume_threshold,
                maximum_allowed_volume = inner.config.maximum_allowed_volume,
                upload_timeout_secs = inner.config.upload_timeout.as_secs(),
                "New log configuration was set"
            );

            let decision = inner.decide();
            self.apply_decision(&mut inner, decision)
        };

        if should_sync {
            self.request_sync();
        }
    }

    pub fn configuration(&self) -> LogUploadConfig {
        self.inner.lock().config.clone()
    }

    pub fn state(&self) -> CollectorState {
        if self.inner.lock().uploading {
            CollectorState::Uploading
        } else {
            CollectorState::Idle
        }
    }

    /// Blocks handed to the transport and awaiting an outcome, earliest deadline first.
    pub fn in_flight_blocks(&self) -> Vec<BlockId> {
        self.inner.lock().timeouts.block_ids()
    }

    pub fn storage_snapshot(&self) -> StorageSnapshot {
        let inner = self.inner.lock();
        let status = inner.status();
        StorageSnapshot {
            consumed_volume: status.consumed_volume(),
            record_count: status.record_count(),
            in_flight_volume: status.in_flight_volume(),
        }
    }

    pub fn stats(&self) -> Arc<CollectorStats> {
        Arc::clone(&self.stats)
    }

    fn request_sync(&self) {
        self.stats.record_sync_request();
        debug!("Requesting log sync from transport");
        self.transport.sync();
    }

    /// Acts on a strategy decision. Returns true when the transport must be asked to sync.
    fn apply_decision(&self, inner: &mut CollectorInner, decision: UploadDecision) -> bool {
        match decision {
            UploadDecision::Upload => Self::approve_upload(inner),
            UploadDecision::Cleanup => {
                let max_allowed_volume = inner.config.maximum_allowed_volume;
                let evicted = inner.storage.evict_oldest(max_allowed_volume);
                self.stats.record_cleanup(evicted);

                // What survived the cleanup may still be worth uploading. Decided once, no loop.
                match inner.decide() {
                    UploadDecision::Upload => Self::approve_upload(inner),
                    UploadDecision::Cleanup | UploadDecision::Noop => false,
                }
            }
            UploadDecision::Noop => false,
        }
    }

    fn approve_upload(inner: &mut CollectorInner) -> bool {
        if inner.uploading {
            trace!("Upload already requested");
            false
        } else if !inner.failover_strategy.is_upload_approved() {
            debug!("Upload postponed by failover strategy");
            false
        } else {
            inner.uploading = true;
            true
        }
    }

    /// Fails timed-out blocks and notifies failover once. Returns true on timeout.
    fn sweep_timeouts(&self, inner: &mut CollectorInner) -> bool {
        let scope = inner.config.timeout_scope;
        let expired = inner.timeouts.sweep(self.clock.now(), scope);
        if expired.is_empty() {
            return false;
        }

        info!(blocks = ?expired, ?scope, "Log delivery timeout detected");

        for block_id in &expired {
            inner.storage.fail(*block_id);
        }
        self.stats.record_timeout(expired.len());
        inner.failover_strategy.on_timeout();

        true
    }
}

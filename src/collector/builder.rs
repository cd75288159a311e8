use super::LogCollector;
use crate::storage::{LogStorage, LogStorageStatus, MemoryLogStorage};
use crate::transport::{ChannelManager, LogTransport};
use crate::upload::{
    BackoffFailoverStrategy, Clock, FailoverConfig, LogUploadConfig, LogUploadFailoverStrategy,
    LogUploadStrategy, SystemClock, VolumeUploadStrategy,
};
use std::sync::Arc;

/// Assembles a [`LogCollector`]. Every collaborator except the transport has a default.
pub struct LogCollectorBuilder {
    transport: Arc<dyn LogTransport>,
    config: LogUploadConfig,
    storage: Option<Box<dyn LogStorage>>,
    storage_status: Option<Arc<dyn LogStorageStatus>>,
    upload_strategy: Option<Box<dyn LogUploadStrategy>>,
    failover_strategy: Option<Box<dyn LogUploadFailoverStrategy>>,
    failover_config: FailoverConfig,
    channel_manager: Option<Arc<dyn ChannelManager>>,
    clock: Arc<dyn Clock>,
}

impl LogCollectorBuilder {
    pub fn new(transport: Arc<dyn LogTransport>) -> Self {
        Self {
            transport,
            config: LogUploadConfig::default(),
            storage: None,
            storage_status: None,
            upload_strategy: None,
            failover_strategy: None,
            failover_config: FailoverConfig::default(),
            channel_manager: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn config(mut self, config: LogUploadConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(mut self, storage: Box<dyn LogStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Status view consulted by the upload strategy instead of the storage itself.
    pub fn storage_status(mut self, status: Arc<dyn LogStorageStatus>) -> Self {
        self.storage_status = Some(status);
        self
    }

    pub fn upload_strategy(mut self, strategy: Box<dyn LogUploadStrategy>) -> Self {
        self.upload_strategy = Some(strategy);
        self
    }

    /// Overrides the default backoff failover. `failover_config` and
    /// `channel_manager` only apply to the default.
    pub fn failover_strategy(mut self, strategy: Box<dyn LogUploadFailoverStrategy>) -> Self {
        self.failover_strategy = Some(strategy);
        self
    }

    pub fn failover_config(mut self, config: FailoverConfig) -> Self {
        self.failover_config = config;
        self
    }

    pub fn channel_manager(mut self, manager: Arc<dyn ChannelManager>) -> Self {
        self.channel_manager = Some(manager);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> LogCollector {
        let failover_strategy = self.failover_strategy.unwrap_or_else(|| {
            let mut failover =
                BackoffFailoverStrategy::new(self.failover_config).with_clock(self.clock.clone());
            if let Some(manager) = self.channel_manager {
                failover = failover.with_channel_manager(manager);
            }
            Box::new(failover)
        });

        LogCollector::from_parts(
            self.transport,
            self.clock,
            self.config,
            self.storage
                .unwrap_or_else(|| Box::new(MemoryLogStorage::new())),
            self.storage_status,
            self.upload_strategy
                .unwrap_or_else(|| Box::new(VolumeUploadStrategy)),
            failover_strategy,
        )
    }
}

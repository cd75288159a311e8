//! Buffered record storage.
//!
//! `LogStorage` is the pluggable backend the collector drains blocks from;
//! `LogStorageStatus` is the read-only occupancy view consumed by upload
//! strategies. A backend may serve both, or expose a separate status facade.

pub mod memory;

pub use memory::{FailurePolicy, MemoryLogStorage, StorageCounters};

use crate::domain::{BlockId, LogBlock, LogRecord};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Record too large: {size} bytes exceeds limit of {limit} bytes")]
    RecordTooLarge { size: usize, limit: usize },
}

/// Read-only view of storage occupancy.
pub trait LogStorageStatus: Send + Sync {
    /// Bytes held by pending (not yet drained) records.
    fn consumed_volume(&self) -> usize;

    /// Number of pending records.
    fn record_count(&self) -> usize;

    /// Bytes bound to drained blocks that are not yet confirmed or failed.
    fn in_flight_volume(&self) -> usize {
        0
    }
}

/// Storage backend owned by the collector.
///
/// Every method is called with the collector lock held, so implementations
/// need no internal synchronisation of their own.
pub trait LogStorage: LogStorageStatus {
    /// Buffers a record. On error the record is not considered stored.
    fn append(&mut self, record: LogRecord) -> Result<(), StorageError>;

    /// Moves up to `max_bytes` of pending records into a new in-flight block.
    ///
    /// Returns `None` when nothing is pending. The block id must not collide
    /// with any block that is still in flight.
    fn drain_block(&mut self, max_bytes: usize) -> Option<LogBlock>;

    /// Discards an in-flight block after a successful delivery. Unknown ids are ignored.
    fn confirm(&mut self, block_id: BlockId);

    /// Marks an in-flight block as undelivered. Unknown ids are ignored.
    fn fail(&mut self, block_id: BlockId);

    /// Evicts oldest pending records until the pending volume is strictly below
    /// `max_allowed_volume`, so the next decision is no longer a cleanup.
    /// Returns the number of records evicted.
    fn evict_oldest(&mut self, max_allowed_volume: usize) -> usize;
}

use super::{LogStorage, LogStorageStatus, StorageError};
use crate::domain::{BlockId, LogBlock, LogRecord};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, warn};

/// What happens to the records of a block whose delivery failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Records are discarded.
    #[default]
    Drop,
    /// Records go back to the front of the pending queue, in their original order.
    Requeue,
}

/// Lock-free occupancy counters shared between the storage and any status readers.
#[derive(Debug, Default)]
pub struct StorageCounters {
    consumed_volume: AtomicUsize,
    record_count: AtomicUsize,
    in_flight_volume: AtomicUsize,
    evicted_records: AtomicU64,
    dropped_records: AtomicU64,
}

impl StorageCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records discarded by capacity cleanup.
    pub fn evicted_records(&self) -> u64 {
        self.evicted_records.load(Ordering::Relaxed)
    }

    /// Records discarded because their block failed under `FailurePolicy::Drop`.
    pub fn dropped_records(&self) -> u64 {
        self.dropped_records.load(Ordering::Relaxed)
    }

    fn add_pending(&self, records: usize, volume: usize) {
        self.record_count.fetch_add(records, Ordering::Relaxed);
        self.consumed_volume.fetch_add(volume, Ordering::Relaxed);
    }

    fn remove_pending(&self, records: usize, volume: usize) {
        self.record_count.fetch_sub(records, Ordering::Relaxed);
        self.consumed_volume.fetch_sub(volume, Ordering::Relaxed);
    }
}

impl LogStorageStatus for StorageCounters {
    fn consumed_volume(&self) -> usize {
        self.consumed_volume.load(Ordering::Relaxed)
    }

    fn record_count(&self) -> usize {
        self.record_count.load(Ordering::Relaxed)
    }

    fn in_flight_volume(&self) -> usize {
        self.in_flight_volume.load(Ordering::Relaxed)
    }
}

/// In-memory FIFO storage.
pub struct MemoryLogStorage {
    pending: VecDeque<LogRecord>,
    in_flight: HashMap<BlockId, Vec<LogRecord>>,
    next_block_id: BlockId,
    failure_policy: FailurePolicy,
    max_record_size: Option<usize>,
    counters: Arc<StorageCounters>,
}

impl Default for MemoryLogStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLogStorage {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
            next_block_id: 1,
            failure_policy: FailurePolicy::default(),
            max_record_size: None,
            counters: Arc::new(StorageCounters::new()),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Rejects records larger than `limit` bytes at append time.
    pub fn with_max_record_size(mut self, limit: usize) -> Self {
        self.max_record_size = Some(limit);
        self
    }

    /// Handle that can be installed as a separate storage status view.
    pub fn status_handle(&self) -> Arc<StorageCounters> {
        Arc::clone(&self.counters)
    }

    pub fn in_flight_blocks(&self) -> usize {
        self.in_flight.len()
    }

    fn allocate_block_id(&mut self) -> BlockId {
        loop {
            let id = self.next_block_id;
            self.next_block_id = self.next_block_id.wrapping_add(1);
            if !self.in_flight.contains_key(&id) {
                return id;
            }
        }
    }

    fn release_in_flight(&mut self, block_id: BlockId) -> Option<Vec<LogRecord>> {
        let records = self.in_flight.remove(&block_id)?;
        let volume: usize = records.iter().map(LogRecord::size).sum();
        self.counters
            .in_flight_volume
            .fetch_sub(volume, Ordering::Relaxed);
        Some(records)
    }
}

impl LogStorageStatus for MemoryLogStorage {
    fn consumed_volume(&self) -> usize {
        self.counters.consumed_volume()
    }

    fn record_count(&self) -> usize {
        self.counters.record_count()
    }

    fn in_flight_volume(&self) -> usize {
        self.counters.in_flight_volume()
    }
}

impl LogStorage for MemoryLogStorage {
    fn append(&mut self, record: LogRecord) -> Result<(), StorageError> {
        let size = record.size();
        if let Some(limit) = self.max_record_size
            && size > limit
        {
            return Err(StorageError::RecordTooLarge { size, limit });
        }

        self.pending.push_back(record);
        self.counters.add_pending(1, size);
        Ok(())
    }

    fn drain_block(&mut self, max_bytes: usize) -> Option<LogBlock> {
        if self.pending.is_empty() {
            return None;
        }

        let mut records = Vec::new();
        let mut volume = 0usize;

        // An oversized head record still goes out alone rather than blocking the queue.
        loop {
            let Some(size) = self.pending.front().map(LogRecord::size) else {
                break;
            };
            if !records.is_empty() && volume + size > max_bytes {
                break;
            }
            let Some(record) = self.pending.pop_front() else {
                break;
            };
            volume += size;
            records.push(record);
        }

        self.counters.remove_pending(records.len(), volume);
        self.counters
            .in_flight_volume
            .fetch_add(volume, Ordering::Relaxed);

        let block_id = self.allocate_block_id();
        self.in_flight.insert(block_id, records.clone());

        debug!(
            block_id,
            records = records.len(),
            bytes = volume,
            "Drained log block"
        );

        Some(LogBlock::new(block_id, records))
    }

    fn confirm(&mut self, block_id: BlockId) {
        if self.release_in_flight(block_id).is_none() {
            debug!(block_id, "Confirmation for unknown block ignored");
        }
    }

    fn fail(&mut self, block_id: BlockId) {
        let Some(records) = self.release_in_flight(block_id) else {
            debug!(block_id, "Failure for unknown block ignored");
            return;
        };

        match self.failure_policy {
            FailurePolicy::Drop => {
                self.counters
                    .dropped_records
                    .fetch_add(records.len() as u64, Ordering::Relaxed);
                warn!(
                    block_id,
                    records = records.len(),
                    "Dropping records of undelivered block"
                );
            }
            FailurePolicy::Requeue => {
                let count = records.len();
                let volume: usize = records.iter().map(LogRecord::size).sum();
                for record in records.into_iter().rev() {
                    self.pending.push_front(record);
                }
                self.counters.add_pending(count, volume);
                debug!(block_id, records = count, "Requeued records of undelivered block");
            }
        }
    }

    fn evict_oldest(&mut self, max_allowed_volume: usize) -> usize {
        let mut evicted = 0usize;
        let mut evicted_volume = 0usize;

        // Stop strictly below the cap: a buffer sitting exactly at it would be cleaned again forever.
        while self.counters.consumed_volume() - evicted_volume >= max_allowed_volume {
            let Some(record) = self.pending.pop_front() else {
                break;
            };
            evicted += 1;
            evicted_volume += record.size();
        }

        if evicted > 0 {
            self.counters.remove_pending(evicted, evicted_volume);
            self.counters
                .evicted_records
                .fetch_add(evicted as u64, Ordering::Relaxed);
            warn!(
                records = evicted,
                bytes = evicted_volume,
                max_allowed_volume,
                "Evicted oldest records to respect storage cap"
            );
        }

        evicted
    }
}

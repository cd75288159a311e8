// Lock-free collector statistics using atomic operations

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct CollectorStats {
    records_added: AtomicU64,
    bytes_added: AtomicU64,
    records_rejected: AtomicU64,
    sync_requests: AtomicU64,
    blocks_sent: AtomicU64,
    records_sent: AtomicU64,
    blocks_acknowledged: AtomicU64,
    blocks_failed: AtomicU64,
    timeouts: AtomicU64,
    timed_out_blocks: AtomicU64,
    cleanups: AtomicU64,
    records_evicted: AtomicU64,
}

impl CollectorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_added(&self, bytes: usize) {
        self.records_added.fetch_add(1, Ordering::Relaxed);
        self.bytes_added.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sync_request(&self) {
        self.sync_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_block_sent(&self, records: usize) {
        self.blocks_sent.fetch_add(1, Ordering::Relaxed);
        self.records_sent.fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn record_block_acknowledged(&self) {
        self.blocks_acknowledged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_block_failed(&self) {
        self.blocks_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// One timeout event, covering `blocks` in-flight blocks.
    pub fn record_timeout(&self, blocks: usize) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        self.timed_out_blocks
            .fetch_add(blocks as u64, Ordering::Relaxed);
    }

    pub fn record_cleanup(&self, evicted: usize) {
        self.cleanups.fetch_add(1, Ordering::Relaxed);
        self.records_evicted
            .fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub fn sync_requests(&self) -> u64 {
        self.sync_requests.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Get a snapshot of current statistics (lock-free)
    pub fn snapshot(&self) -> CollectorStatsSnapshot {
        CollectorStatsSnapshot {
            records_added: self.records_added.load(Ordering::Relaxed),
            bytes_added: self.bytes_added.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            sync_requests: self.sync_requests.load(Ordering::Relaxed),
            blocks_sent: self.blocks_sent.load(Ordering::Relaxed),
            records_sent: self.records_sent.load(Ordering::Relaxed),
            blocks_acknowledged: self.blocks_acknowledged.load(Ordering::Relaxed),
            blocks_failed: self.blocks_failed.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            timed_out_blocks: self.timed_out_blocks.load(Ordering::Relaxed),
            cleanups: self.cleanups.load(Ordering::Relaxed),
            records_evicted: self.records_evicted.load(Ordering::Relaxed),
            taken_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorStatsSnapshot {
    pub records_added: u64,
    pub bytes_added: u64,
    pub records_rejected: u64,
    pub sync_requests: u64,
    pub blocks_sent: u64,
    pub records_sent: u64,
    pub blocks_acknowledged: u64,
    pub blocks_failed: u64,
    pub timeouts: u64,
    pub timed_out_blocks: u64,
    pub cleanups: u64,
    pub records_evicted: u64,
    pub taken_at: String,
}

impl CollectorStatsSnapshot {
    /// Share of resolved blocks that were acknowledged (0.0 to 1.0).
    pub fn delivery_rate(&self) -> f64 {
        let resolved = self.blocks_acknowledged + self.blocks_failed + self.timed_out_blocks;
        if resolved == 0 {
            return 1.0;
        }
        self.blocks_acknowledged as f64 / resolved as f64
    }
}

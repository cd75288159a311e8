#![allow(dead_code)]

use logsync_client::upload::ManualClock;
use logsync_client::{
    LogCollector, LogDeliveryErrorCode, LogTransport, LogUploadConfig, LogUploadFailoverStrategy,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Counts sync requests instead of sending anything.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    syncs: AtomicUsize,
}

impl RecordingTransport {
    pub fn syncs(&self) -> usize {
        self.syncs.load(Ordering::SeqCst)
    }
}

impl LogTransport for RecordingTransport {
    fn sync(&self) {
        self.syncs.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shared log of failover callbacks; the collector owns the strategy, the test keeps this.
#[derive(Debug)]
pub struct FailoverLog {
    pub failures: Mutex<Vec<LogDeliveryErrorCode>>,
    pub timeouts: AtomicUsize,
    pub successes: AtomicUsize,
    pub approved: AtomicBool,
}

impl Default for FailoverLog {
    fn default() -> Self {
        Self {
            failures: Mutex::new(Vec::new()),
            timeouts: AtomicUsize::new(0),
            successes: AtomicUsize::new(0),
            approved: AtomicBool::new(true),
        }
    }
}

impl FailoverLog {
    pub fn timeouts(&self) -> usize {
        self.timeouts.load(Ordering::SeqCst)
    }

    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn set_approved(&self, approved: bool) {
        self.approved.store(approved, Ordering::SeqCst);
    }
}

pub struct RecordingFailover(pub Arc<FailoverLog>);

impl LogUploadFailoverStrategy for RecordingFailover {
    fn on_failure(&mut self, error_code: LogDeliveryErrorCode) {
        self.0.failures.lock().push(error_code);
    }

    fn on_timeout(&mut self) {
        self.0.timeouts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&mut self) {
        self.0.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn is_upload_approved(&self) -> bool {
        self.0.approved.load(Ordering::SeqCst)
    }
}

pub fn small_config() -> LogUploadConfig {
    LogUploadConfig {
        batch_volume: 100,
        volume_threshold: 50,
        maximum_allowed_volume: 200,
        upload_timeout: Duration::from_secs(30),
        ..Default::default()
    }
}

pub struct Harness {
    pub collector: Arc<LogCollector>,
    pub transport: Arc<RecordingTransport>,
    pub failover: Arc<FailoverLog>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(config: LogUploadConfig) -> Harness {
    let transport = Arc::new(RecordingTransport::default());
    let failover = Arc::new(FailoverLog::default());
    let clock = Arc::new(ManualClock::new());

    let collector = LogCollector::builder(transport.clone())
        .config(config)
        .clock(clock.clone())
        .failover_strategy(Box::new(RecordingFailover(failover.clone())))
        .build();

    Harness {
        collector: Arc::new(collector),
        transport,
        failover,
        clock,
    }
}

pub fn record(size: usize) -> Vec<u8> {
    vec![b'x'; size]
}

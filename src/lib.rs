// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_lossless,            // Infallible casts are clear enough with `as`
    clippy::cast_possible_truncation, // Safe within realistic value bounds (durations, sizes)
    clippy::cast_precision_loss,      // Acceptable for stats/display
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. StorageError in storage module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod collector;
pub mod domain;
pub mod storage;
pub mod transport;
pub mod upload;

// Re-export main types for easy access
pub use collector::{
    CollectorState, CollectorStats, CollectorStatsSnapshot, LogCollector, LogCollectorBuilder,
    StorageSnapshot, spawn_timeout_sweeper,
};
pub use domain::{
    BlockId, CollectorError, LogBlock, LogDeliveryErrorCode, LogDeliveryStatus, LogRecord,
    LogSyncRequest, LogSyncResponse, SyncResponseResult,
};
pub use storage::{FailurePolicy, LogStorage, LogStorageStatus, MemoryLogStorage, StorageError};
pub use transport::{
    ChannelManager, EndpointError, EndpointRotation, HttpEndpointConfig, HttpLogEndpoint,
    LogEndpoint, LogTransport, SignalTransport, SyncDriver,
};
pub use upload::{
    BackoffFailoverStrategy, FailoverConfig, LogUploadConfig, LogUploadFailoverStrategy,
    LogUploadStrategy, RetryStrategy, TimeoutScope, UploadDecision, VolumeUploadStrategy,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

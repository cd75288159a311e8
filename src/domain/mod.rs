//! Domain layer for logsync-client.
//!
//! Contains the canonical types shared across all modules:
//! - `LogRecord` / `LogBlock`: buffered payloads and the drained groups sent upstream
//! - `LogSyncRequest` / `LogSyncResponse`: the request/response pair exchanged with the transport
//! - `CollectorError`: Top-level error type

pub mod delivery;
pub mod error;
pub mod record;

pub use delivery::{
    LogDeliveryErrorCode, LogDeliveryStatus, LogSyncRequest, LogSyncResponse, SyncResponseResult,
};
pub use error::CollectorError;
pub use record::{BlockId, LogBlock, LogRecord};

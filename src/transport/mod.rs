//! Transport-side collaborators of the collector.
//!
//! The collector only needs two narrow capabilities from the outside world:
//! [`LogTransport`] to request a sync cycle and [`ChannelManager`] to route
//! around a stalled endpoint. The rest of this module is a reference
//! transport built on tokio and reqwest.

pub mod driver;
pub mod endpoint;
pub mod http;
pub mod rotation;
pub mod signal;

pub use driver::SyncDriver;
pub use endpoint::{EndpointError, LogEndpoint};
pub use http::{HttpEndpointConfig, HttpLogEndpoint};
pub use rotation::{EndpointRotation, RotationError};
pub use signal::SignalTransport;

#[cfg(test)]
use mockall::automock;

/// Fire-and-forget trigger for one request/response cycle.
///
/// During that cycle the transport is expected to call
/// [`LogCollector::fill_sync_request`](crate::LogCollector::fill_sync_request)
/// and later [`LogCollector::on_response`](crate::LogCollector::on_response).
#[cfg_attr(test, automock)]
pub trait LogTransport: Send + Sync {
    fn sync(&self);
}

/// Endpoint bookkeeping consulted on failover.
#[cfg_attr(test, automock)]
pub trait ChannelManager: Send + Sync {
    /// The current endpoint stopped answering; switch to another one if possible.
    fn on_server_failed(&self);
}

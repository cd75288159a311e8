use crate::domain::{LogDeliveryErrorCode, LogSyncRequest, LogSyncResponse};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: {status}")]
    Http { status: u16 },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Payload encoding failed: {0}")]
    Encoding(#[from] std::io::Error),
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(String),
}

impl EndpointError {
    /// Delivery error reported to the collector for blocks lost to this error.
    pub fn delivery_error_code(&self) -> LogDeliveryErrorCode {
        match self {
            EndpointError::Network(_) => LogDeliveryErrorCode::RemoteConnectionError,
            EndpointError::Http { .. } | EndpointError::InvalidResponse(_) => {
                LogDeliveryErrorCode::RemoteInternalError
            }
            EndpointError::Encoding(_) | EndpointError::InvalidHeaderValue(_) => {
                LogDeliveryErrorCode::AppenderInternalError
            }
        }
    }
}

/// Remote side of a sync cycle: ships one request and returns its outcomes.
pub trait LogEndpoint: Send + Sync {
    fn send(
        &self,
        request: &LogSyncRequest,
    ) -> impl Future<Output = Result<LogSyncResponse, EndpointError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(
            EndpointError::Http { status: 503 }.delivery_error_code(),
            LogDeliveryErrorCode::RemoteInternalError
        );
        assert_eq!(
            EndpointError::Encoding(std::io::Error::other("boom")).delivery_error_code(),
            LogDeliveryErrorCode::AppenderInternalError
        );
    }
}

use super::record::{BlockId, LogBlock};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Reason a collector refused or lost a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogDeliveryErrorCode {
    NoAppendersConfigured,
    AppenderInternalError,
    RemoteConnectionError,
    RemoteInternalError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncResponseResult {
    Success,
    Failure,
}

/// Outcome for a single block, keyed by the request id the block was sent under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogDeliveryStatus {
    pub request_id: BlockId,
    pub result: SyncResponseResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<LogDeliveryErrorCode>,
}

impl LogDeliveryStatus {
    pub fn success(request_id: BlockId) -> Self {
        Self {
            request_id,
            result: SyncResponseResult::Success,
            error_code: None,
        }
    }

    pub fn failure(request_id: BlockId, error_code: LogDeliveryErrorCode) -> Self {
        Self {
            request_id,
            result: SyncResponseResult::Failure,
            error_code: Some(error_code),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == SyncResponseResult::Success
    }
}

/// Outbound payload filled in by the collector when the transport is ready to send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSyncRequest {
    pub request_id: Option<BlockId>,
    pub log_entries: Vec<Bytes>,
}

impl LogSyncRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the collector had nothing to hand over.
    pub fn is_empty(&self) -> bool {
        self.request_id.is_none() || self.log_entries.is_empty()
    }

    pub fn volume(&self) -> usize {
        self.log_entries.iter().map(Bytes::len).sum()
    }

    pub(crate) fn fill_from(&mut self, block: LogBlock) {
        self.request_id = Some(block.block_id());
        self.log_entries = block
            .into_records()
            .into_iter()
            .map(|record| record.into_data())
            .collect();
    }
}

/// Batch of per-block outcomes pushed back by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSyncResponse {
    #[serde(default)]
    pub delivery_statuses: Vec<LogDeliveryStatus>,
}

impl LogSyncResponse {
    pub fn new(delivery_statuses: Vec<LogDeliveryStatus>) -> Self {
        Self { delivery_statuses }
    }

    pub fn success(request_id: BlockId) -> Self {
        Self::new(vec![LogDeliveryStatus::success(request_id)])
    }

    pub fn failure(request_id: BlockId, error_code: LogDeliveryErrorCode) -> Self {
        Self::new(vec![LogDeliveryStatus::failure(request_id, error_code)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LogRecord;

    #[test]
    fn test_response_wire_format() {
        let json = r#"{"deliveryStatuses":[
            {"requestId":3,"result":"SUCCESS"},
            {"requestId":4,"result":"FAILURE","errorCode":"REMOTE_INTERNAL_ERROR"}
        ]}"#;

        let response: LogSyncResponse = serde_json::from_str(json).unwrap();

        assert_eq!(
            response.delivery_statuses,
            vec![
                LogDeliveryStatus::success(3),
                LogDeliveryStatus::failure(4, LogDeliveryErrorCode::RemoteInternalError),
            ]
        );
    }

    #[test]
    fn test_response_without_statuses_is_empty() {
        let response: LogSyncResponse = serde_json::from_str("{}").unwrap();
        assert!(response.delivery_statuses.is_empty());
    }

    #[test]
    fn test_request_fill_keeps_record_order() {
        let block = LogBlock::new(
            9,
            vec![
                LogRecord::from("first"),
                LogRecord::from("second"),
                LogRecord::from("third"),
            ],
        );

        let mut request = LogSyncRequest::new();
        assert!(request.is_empty());

        request.fill_from(block);

        assert_eq!(request.request_id, Some(9));
        assert_eq!(
            request.log_entries,
            vec![
                Bytes::from("first"),
                Bytes::from("second"),
                Bytes::from("third")
            ]
        );
        assert_eq!(request.volume(), 16);
        assert!(!request.is_empty());
    }
}

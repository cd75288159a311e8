use super::endpoint::LogEndpoint;
use super::signal::SignalTransport;
use crate::collector::LogCollector;
use crate::domain::{LogSyncRequest, LogSyncResponse};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Async loop turning sync signals into request/response cycles against an endpoint.
pub struct SyncDriver<E> {
    endpoint: E,
}

impl<E: LogEndpoint> SyncDriver<E> {
    pub fn new(endpoint: E) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Runs until `shutdown` is cancelled.
    pub async fn run(
        &self,
        collector: Arc<LogCollector>,
        signal: SignalTransport,
        shutdown: CancellationToken,
    ) {
        info!("Sync driver started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Sync driver stopped");
                    break;
                }
                _ = signal.notified() => {
                    self.run_cycle(&collector).await;
                }
            }
        }
    }

    /// One cycle: drain a block, send it, report the outcome.
    ///
    /// Returns false when the collector had nothing to send.
    pub async fn run_cycle(&self, collector: &LogCollector) -> bool {
        let mut request = LogSyncRequest::new();
        collector.fill_sync_request(&mut request);

        let Some(request_id) = request.request_id else {
            debug!("Sync requested but no log block was available");
            return false;
        };
        if request.is_empty() {
            return false;
        }

        let response = match self.endpoint.send(&request).await {
            Ok(response) => response,
            Err(e) => {
                let error_code = e.delivery_error_code();
                warn!(request_id, error = %e, ?error_code, "Log sync request failed");
                LogSyncResponse::failure(request_id, error_code)
            }
        };

        collector.on_response(response);
        true
    }

    /// Sends whatever is still buffered, one block at a time, stopping at the
    /// first failed block. Used on shutdown.
    pub async fn flush(&self, collector: &LogCollector) -> usize {
        let mut delivered = 0;

        loop {
            let mut request = LogSyncRequest::new();
            collector.fill_sync_request(&mut request);

            let Some(request_id) = request.request_id else {
                break;
            };
            if request.is_empty() {
                break;
            }

            match self.endpoint.send(&request).await {
                Ok(response) => {
                    let all_succeeded = response.delivery_statuses.iter().all(|s| s.is_success());
                    collector.on_response(response);
                    if !all_succeeded {
                        break;
                    }
                    delivered += 1;
                }
                Err(e) => {
                    warn!(request_id, error = %e, "Final log flush failed");
                    collector.on_response(LogSyncResponse::failure(
                        request_id,
                        e.delivery_error_code(),
                    ));
                    break;
                }
            }
        }

        info!(blocks = delivered, "Flushed buffered log blocks");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LogDeliveryErrorCode;
    use crate::transport::EndpointError;
    use crate::upload::LogUploadConfig;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedEndpoint {
        sent: Mutex<Vec<LogSyncRequest>>,
        fail_with_status: Option<u16>,
    }

    impl LogEndpoint for ScriptedEndpoint {
        async fn send(&self, request: &LogSyncRequest) -> Result<LogSyncResponse, EndpointError> {
            self.sent.lock().push(request.clone());
            match (self.fail_with_status, request.request_id) {
                (Some(status), _) => Err(EndpointError::Http { status }),
                (None, Some(id)) => Ok(LogSyncResponse::success(id)),
                (None, None) => Ok(LogSyncResponse::default()),
            }
        }
    }

    fn collector(signal: &SignalTransport) -> Arc<LogCollector> {
        Arc::new(
            LogCollector::builder(Arc::new(signal.clone()))
                .config(LogUploadConfig {
                    batch_volume: 8,
                    volume_threshold: 4,
                    maximum_allowed_volume: 1024,
                    upload_timeout: Duration::from_secs(10),
                    ..Default::default()
                })
                .build(),
        )
    }

    #[tokio::test]
    async fn test_cycle_acknowledges_block() {
        let signal = SignalTransport::new();
        let collector = collector(&signal);
        let driver = SyncDriver::new(ScriptedEndpoint::default());

        collector.add_record("abcd").unwrap();
        assert!(driver.run_cycle(&collector).await);

        assert_eq!(driver.endpoint().sent.lock().len(), 1);
        assert!(collector.in_flight_blocks().is_empty());
        assert_eq!(collector.stats().snapshot().blocks_acknowledged, 1);
    }

    #[tokio::test]
    async fn test_cycle_without_data_sends_nothing() {
        let signal = SignalTransport::new();
        let collector = collector(&signal);
        let driver = SyncDriver::new(ScriptedEndpoint::default());

        assert!(!driver.run_cycle(&collector).await);
        assert!(driver.endpoint().sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_endpoint_error_becomes_failure() {
        let signal = SignalTransport::new();
        let collector = collector(&signal);
        let driver = SyncDriver::new(ScriptedEndpoint {
            fail_with_status: Some(500),
            ..Default::default()
        });

        collector.add_record("abcd").unwrap();
        driver.run_cycle(&collector).await;

        let snapshot = collector.stats().snapshot();
        assert_eq!(snapshot.blocks_failed, 1);
        assert!(collector.in_flight_blocks().is_empty());
        assert_eq!(
            EndpointError::Http { status: 500 }.delivery_error_code(),
            LogDeliveryErrorCode::RemoteInternalError
        );
    }

    #[tokio::test]
    async fn test_flush_drains_everything() {
        let signal = SignalTransport::new();
        let collector = collector(&signal);
        let driver = SyncDriver::new(ScriptedEndpoint::default());

        for _ in 0..5 {
            collector.add_record("abcd").unwrap();
        }
        // Other cycles may have been requested; flush ignores the signal.
        let delivered = driver.flush(&collector).await;

        assert_eq!(delivered, 3);
        assert_eq!(collector.storage_snapshot().record_count, 0);
    }

    #[tokio::test]
    async fn test_run_services_signal_until_cancelled() {
        let signal = SignalTransport::new();
        let collector = collector(&signal);
        let driver = Arc::new(SyncDriver::new(ScriptedEndpoint::default()));
        let shutdown = CancellationToken::new();

        let task = {
            let driver = driver.clone();
            let collector = collector.clone();
            let signal = signal.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { driver.run(collector, signal, shutdown).await })
        };

        collector.add_record("abcd").unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while collector.stats().snapshot().blocks_acknowledged == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("driver should deliver the block");

        shutdown.cancel();
        task.await.unwrap();
    }
}

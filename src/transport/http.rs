use super::endpoint::{EndpointError, LogEndpoint};
use super::rotation::EndpointRotation;
use crate::domain::{LogSyncRequest, LogSyncResponse};
use flate2::{Compression, write::GzEncoder};
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const REQUEST_ID_HEADER: &str = "x-request-id";
const RECORD_COUNT_HEADER: &str = "x-record-count";
const CLIENT_ID_HEADER: &str = "x-client-id";

/// Payloads below this size are sent uncompressed.
const MIN_COMPRESSION_BYTES: usize = 512;

#[derive(Debug, Clone)]
pub struct HttpEndpointConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub enable_compression: bool,
    pub client_id: String,
}

impl Default for HttpEndpointConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("logsync-client/{}", crate::VERSION),
            enable_compression: true,
            client_id: default_client_id(),
        }
    }
}

/// Host name when available, otherwise a random id for this process.
pub fn default_client_id() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[derive(Debug, Default)]
pub struct EndpointStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    bytes_sent: AtomicU64,
    total_response_time_ms: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointStatsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub bytes_sent: u64,
    pub average_response_time_ms: u64,
}

impl EndpointStats {
    fn record_request(&self, success: bool, bytes: usize, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        self.total_response_time_ms
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> EndpointStatsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_ms = self.total_response_time_ms.load(Ordering::Relaxed);

        EndpointStatsSnapshot {
            total_requests,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            average_response_time_ms: total_ms.checked_div(total_requests).unwrap_or(0),
        }
    }
}

/// Ships blocks to the current endpoint of an [`EndpointRotation`] as NDJSON.
#[derive(Debug, Clone)]
pub struct HttpLogEndpoint {
    client: Client,
    config: HttpEndpointConfig,
    rotation: Arc<EndpointRotation>,
    stats: Arc<EndpointStats>,
}

impl HttpLogEndpoint {
    pub fn new(
        config: HttpEndpointConfig,
        rotation: Arc<EndpointRotation>,
    ) -> Result<Self, EndpointError> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        info!(
            endpoint = %rotation.current(),
            endpoints = rotation.len(),
            client_id = %config.client_id,
            "HTTP log endpoint initialized"
        );

        Ok(Self {
            client,
            config,
            rotation,
            stats: Arc::new(EndpointStats::default()),
        })
    }

    pub fn stats(&self) -> Arc<EndpointStats> {
        Arc::clone(&self.stats)
    }

    pub fn rotation(&self) -> &Arc<EndpointRotation> {
        &self.rotation
    }

    /// One record per line, each terminated by a newline.
    pub fn prepare_payload(
        &self,
        request: &LogSyncRequest,
        compress: bool,
    ) -> Result<Vec<u8>, EndpointError> {
        let mut ndjson = Vec::with_capacity(request.volume() + request.log_entries.len());
        for entry in &request.log_entries {
            ndjson.extend_from_slice(entry);
            ndjson.push(b'\n');
        }

        if !compress {
            return Ok(ndjson);
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&ndjson)?;
        Ok(encoder.finish()?)
    }

    fn build_headers(
        &self,
        request: &LogSyncRequest,
        compressed: bool,
    ) -> Result<HeaderMap, EndpointError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-ndjson"),
        );

        if compressed {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        }

        if let Some(request_id) = request.request_id {
            headers.insert(
                HeaderName::from_static(REQUEST_ID_HEADER),
                HeaderValue::from(request_id),
            );
        }

        headers.insert(
            HeaderName::from_static(RECORD_COUNT_HEADER),
            HeaderValue::from(request.log_entries.len()),
        );

        headers.insert(
            HeaderName::from_static(CLIENT_ID_HEADER),
            HeaderValue::from_str(&self.config.client_id).map_err(|e| {
                EndpointError::InvalidHeaderValue(format!("Invalid client id: {e}"))
            })?,
        );

        Ok(headers)
    }

    fn parse_response(
        request: &LogSyncRequest,
        body: &[u8],
    ) -> Result<LogSyncResponse, EndpointError> {
        let request_id = request.request_id;

        if body.iter().all(u8::is_ascii_whitespace) {
            return request_id
                .map(LogSyncResponse::success)
                .ok_or_else(|| EndpointError::InvalidResponse("empty body for unnamed request".into()));
        }

        let response: LogSyncResponse = serde_json::from_slice(body)
            .map_err(|e| EndpointError::InvalidResponse(e.to_string()))?;

        // An acknowledgement without statuses covers the block that was sent.
        match (response.delivery_statuses.is_empty(), request_id) {
            (true, Some(request_id)) => Ok(LogSyncResponse::success(request_id)),
            _ => Ok(response),
        }
    }
}

impl LogEndpoint for HttpLogEndpoint {
    async fn send(&self, request: &LogSyncRequest) -> Result<LogSyncResponse, EndpointError> {
        let start = Instant::now();
        let url = self.rotation.current().clone();

        let use_compression =
            self.config.enable_compression && request.volume() >= MIN_COMPRESSION_BYTES;
        let payload = self.prepare_payload(request, use_compression)?;
        let bytes_sent = payload.len();
        let headers = self.build_headers(request, use_compression)?;

        debug!(
            request_id = ?request.request_id,
            records = request.log_entries.len(),
            bytes = bytes_sent,
            compressed = use_compression,
            endpoint = %url,
            "Sending log block"
        );

        let response = match self
            .client
            .post(url.clone())
            .headers(headers)
            .body(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_request(false, bytes_sent, start.elapsed());
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            self.stats.record_request(false, bytes_sent, start.elapsed());
            warn!(
                request_id = ?request.request_id,
                status = status.as_u16(),
                endpoint = %url,
                "Collector rejected log block"
            );
            return Err(EndpointError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let latency = start.elapsed();
        self.stats.record_request(true, bytes_sent, latency);

        debug!(
            request_id = ?request.request_id,
            latency_ms = latency.as_millis() as u64,
            "Log block delivered"
        );

        Self::parse_response(request, &body)
    }
}

use bytes::Bytes;
use logsync_client::{
    ChannelManager, EndpointError, EndpointRotation, HttpEndpointConfig, HttpLogEndpoint,
    LogDeliveryErrorCode, LogDeliveryStatus, LogEndpoint, LogSyncRequest, LogSyncResponse,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(id: u32) -> LogSyncRequest {
    LogSyncRequest {
        request_id: Some(id),
        log_entries: vec![
            Bytes::from_static(br#"{"msg":"one"}"#),
            Bytes::from_static(br#"{"msg":"two"}"#),
        ],
    }
}

fn endpoint_for(urls: &[String]) -> HttpLogEndpoint {
    let rotation = Arc::new(EndpointRotation::parse(urls).unwrap());
    HttpLogEndpoint::new(
        HttpEndpointConfig {
            timeout: Duration::from_secs(2),
            enable_compression: false,
            client_id: "edge-7".to_string(),
            ..Default::default()
        },
        rotation,
    )
    .unwrap()
}

#[tokio::test]
async fn test_empty_2xx_acknowledges_block() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/logs"))
        .and(header("content-type", "application/x-ndjson"))
        .and(header("x-request-id", "11"))
        .and(header("x-record-count", "2"))
        .and(header("x-client-id", "edge-7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = endpoint_for(&[format!("{}/v1/logs", server.uri())]);
    let response = endpoint.send(&request(11)).await.unwrap();

    assert_eq!(response, LogSyncResponse::success(11));

    let received = server.received_requests().await.unwrap();
    assert_eq!(
        received[0].body,
        b"{\"msg\":\"one\"}\n{\"msg\":\"two\"}\n".to_vec()
    );
}

#[tokio::test]
async fn test_json_body_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "deliveryStatuses": [
                {"requestId": 4, "result": "FAILURE", "errorCode": "NO_APPENDERS_CONFIGURED"}
            ]
        })))
        .mount(&server)
        .await;

    let endpoint = endpoint_for(&[server.uri()]);
    let response = endpoint.send(&request(4)).await.unwrap();

    assert_eq!(
        response.delivery_statuses,
        vec![LogDeliveryStatus::failure(
            4,
            LogDeliveryErrorCode::NoAppendersConfigured
        )]
    );
}

#[tokio::test]
async fn test_server_error_maps_to_remote_internal_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let endpoint = endpoint_for(&[server.uri()]);
    let error = endpoint.send(&request(1)).await.unwrap_err();

    assert!(matches!(error, EndpointError::Http { status: 503 }));
    assert_eq!(
        error.delivery_error_code(),
        LogDeliveryErrorCode::RemoteInternalError
    );
    assert_eq!(endpoint.stats().snapshot().failed_requests, 1);
}

#[tokio::test]
async fn test_connection_refused_maps_to_connection_error() {
    let endpoint = endpoint_for(&["http://127.0.0.1:9/v1/logs".to_string()]);

    let error = endpoint.send(&request(1)).await.unwrap_err();

    assert!(matches!(error, EndpointError::Network(_)));
    assert_eq!(
        error.delivery_error_code(),
        LogDeliveryErrorCode::RemoteConnectionError
    );
}

#[tokio::test]
async fn test_compressed_body_is_gzip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("content-encoding", "gzip"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let rotation = Arc::new(EndpointRotation::parse([server.uri()]).unwrap());
    let endpoint = HttpLogEndpoint::new(
        HttpEndpointConfig {
            enable_compression: true,
            ..Default::default()
        },
        rotation,
    )
    .unwrap();

    let large = LogSyncRequest {
        request_id: Some(2),
        log_entries: vec![Bytes::from(vec![b'a'; 4096])],
    };
    let response = endpoint.send(&large).await.unwrap();

    assert_eq!(response, LogSyncResponse::success(2));
}

#[tokio::test]
async fn test_rotation_moves_to_next_endpoint() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&secondary)
        .await;

    let endpoint = endpoint_for(&[primary.uri(), secondary.uri()]);
    endpoint.rotation().on_server_failed();

    let response = endpoint.send(&request(3)).await.unwrap();

    assert_eq!(response, LogSyncResponse::success(3));
    assert_eq!(endpoint.rotation().failovers(), 1);
    assert!(primary.received_requests().await.unwrap().is_empty());
}

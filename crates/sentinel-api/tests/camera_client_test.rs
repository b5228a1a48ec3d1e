#![allow(clippy::unwrap_used)]
// Integration tests for `CameraClient` using wiremock.

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sentinel_api::{CameraClient, Error, TransportConfig};

const MJPEG: &str = "multipart/x-mixed-replace; boundary=frame";

async fn setup() -> (MockServer, CameraClient) {
    let server = MockServer::start().await;
    let url = format!("{}/stream", server.uri());
    let client = CameraClient::new(&url, &TransportConfig::streaming(Duration::from_secs(2))).unwrap();
    (server, client)
}

fn frame(n: u8) -> Vec<u8> {
    let mut part = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
    part.extend_from_slice(&[0xFF, 0xD8, n, 0xFF, 0xD9]);
    part.extend_from_slice(b"\r\n");
    part
}

#[tokio::test]
async fn test_open_reads_whole_body_in_order() {
    let (server, client) = setup().await;

    let body: Vec<u8> = (0..5).flat_map(frame).collect();

    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.clone(), MJPEG))
        .mount(&server)
        .await;

    let mut stream = client.open(None).await.unwrap();
    assert_eq!(stream.content_type(), Some(MJPEG));

    let mut received = Vec::new();
    while let Some(chunk) = stream.next_chunk().await.unwrap() {
        received.extend_from_slice(&chunk);
    }
    assert_eq!(received, body);
}

#[tokio::test]
async fn test_cache_bust_token_is_sent() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/stream"))
        .and(query_param("cb", "17"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(frame(1), MJPEG))
        .expect(1)
        .mount(&server)
        .await;

    client.open(Some(17)).await.unwrap();
}

#[tokio::test]
async fn test_non_success_status_is_upstream_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = client.open(None).await.unwrap_err();
    match err {
        Error::UpstreamStatus { status, ref reason } => {
            assert_eq!(status, 503);
            assert_eq!(reason, "Service Unavailable");
        }
        ref other => panic!("expected UpstreamStatus, got: {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unreachable_camera_is_transport_error() {
    // Bind then drop a listener so the port is known to be closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = CameraClient::new(
        &format!("http://{addr}/stream"),
        &TransportConfig::streaming(Duration::from_secs(1)),
    )
    .unwrap();

    let err = client.open(None).await.unwrap_err();
    assert!(err.is_unreachable(), "expected unreachable, got: {err:?}");
}

#[tokio::test]
async fn test_silent_camera_times_out_waiting_for_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(frame(1), MJPEG)
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let transport = TransportConfig::streaming(Duration::from_secs(2))
        .with_response_timeout(Duration::from_millis(200));
    let client = CameraClient::new(&format!("{}/stream", server.uri()), &transport).unwrap();

    let err = tokio::time::timeout(Duration::from_secs(5), client.open(None))
        .await
        .expect("open must give up on its own")
        .unwrap_err();
    assert!(
        matches!(err, Error::ResponseTimeout { .. }),
        "expected ResponseTimeout, got: {err:?}"
    );
    assert!(err.is_unreachable());
    assert!(err.is_transient());
}

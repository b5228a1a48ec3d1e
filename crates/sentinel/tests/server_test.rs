#![allow(clippy::unwrap_used)]
// End-to-end tests for the HTTP surface: a wiremock camera and store behind
// a real listener.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sentinel::AppState;
use sentinel_api::{CameraClient, StoreClient, TransportConfig};
use sentinel_core::{RecordService, StreamRelay};

const FRAME: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n\xff\xd8jpeg\xff\xd9\r\n";

// ── Helpers ─────────────────────────────────────────────────────────

struct Relay {
    base: String,
    shutdown: CancellationToken,
    http: reqwest::Client,
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn start(camera_url: &str, store: Option<&MockServer>) -> Relay {
    let camera =
        CameraClient::new(camera_url, &TransportConfig::streaming(Duration::from_secs(2))).unwrap();
    let records = store.map(|server| {
        let key = secrecy::SecretString::from("anon-key".to_owned());
        RecordService::new(
            StoreClient::from_key(&server.uri(), &key, &TransportConfig::default()).unwrap(),
        )
    });

    let shutdown = CancellationToken::new();
    let relay = StreamRelay::new(camera, shutdown.clone());
    let state = Arc::new(AppState::new(relay, records, "frame"));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(sentinel::serve(listener, state, shutdown.clone()));

    Relay {
        base: format!("http://{addr}"),
        shutdown,
        http: reqwest::Client::new(),
    }
}

async fn camera(status: u16, body: &'static [u8]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(body))
        .mount(&server)
        .await;
    server
}

fn soldier_row(id: u64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "rank": "Sergeant",
        "unit": "Alpha",
        "status": "active",
        "created_at": "2026-10-01T12:00:00+00:00"
    })
}

// ── Relay ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_relay_forwards_bytes_with_stream_headers() {
    let cam = camera(200, FRAME).await;
    let relay = start(&format!("{}/stream", cam.uri()), None).await;

    for route in ["/proxy-stream", "/api/proxy-stream"] {
        let resp = relay
            .http
            .get(format!("{}{route}", relay.base))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let headers = resp.headers();
        assert_eq!(
            headers["content-type"],
            "multipart/x-mixed-replace; boundary=frame"
        );
        assert_eq!(headers["cache-control"], "no-cache, no-store, must-revalidate");
        assert_eq!(headers["pragma"], "no-cache");
        assert_eq!(headers["expires"], "0");
        assert_eq!(resp.bytes().await.unwrap().as_ref(), FRAME);
    }
}

#[tokio::test]
async fn test_camera_error_status_is_passed_through() {
    let cam = camera(503, b"camera busy").await;
    let relay = start(&format!("{}/stream", cam.uri()), None).await;

    let resp = relay
        .http
        .get(format!("{}/proxy-stream", relay.base))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 503);
    assert_eq!(
        resp.text().await.unwrap(),
        "Camera stream error: Service Unavailable"
    );
}

#[tokio::test]
async fn test_unreachable_camera_answers_500() {
    // Bind and drop to get a port nobody listens on.
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let relay = start(&format!("http://127.0.0.1:{port}/stream"), None).await;

    let resp = relay
        .http
        .get(format!("{}/proxy-stream", relay.base))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    assert!(
        resp.text()
            .await
            .unwrap()
            .starts_with("Failed to connect to camera stream: ")
    );
}

#[tokio::test]
async fn test_silent_camera_answers_500() {
    // Accept connections and never write a response.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    let relay = start(&format!("http://{addr}/stream"), None).await;

    let resp = tokio::time::timeout(
        Duration::from_secs(10),
        relay.http.get(format!("{}/proxy-stream", relay.base)).send(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(resp.status(), 500);
    let body = resp.text().await.unwrap();
    assert!(
        body.starts_with("Failed to connect to camera stream: "),
        "got {body}"
    );
    assert!(body.contains("no response within"), "got {body}");
}

#[tokio::test]
async fn test_status_counts_relays() {
    let cam = camera(200, FRAME).await;
    let relay = start(&format!("{}/stream", cam.uri()), None).await;

    relay
        .http
        .get(format!("{}/proxy-stream", relay.base))
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    let status: serde_json::Value = relay
        .http
        .get(format!("{}/api/status", relay.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(status["relays_started"], 1);
    assert_eq!(status["store_configured"], false);
}

// ── Records ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_record_routes_without_store_answer_503() {
    let cam = camera(200, FRAME).await;
    let relay = start(&format!("{}/stream", cam.uri()), None).await;

    let resp = relay
        .http
        .get(format!("{}/api/soldiers", relay.base))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 503);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "record store is not configured" }));
}

#[tokio::test]
async fn test_soldier_routes() {
    let cam = camera(200, FRAME).await;
    let store = MockServer::start().await;
    let relay = start(&format!("{}/stream", cam.uri()), Some(&store)).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/soldiers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([soldier_row(1, "Reyes")])))
        .mount(&store)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/soldiers"))
        .respond_with(ResponseTemplate::new(201).set_body_json(soldier_row(2, "Okafor")))
        .mount(&store)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/soldiers"))
        .and(query_param("id", "eq.2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&store)
        .await;

    let listed: serde_json::Value = relay
        .http
        .get(format!("{}/api/soldiers", relay.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed[0]["name"], "Reyes");

    let created = relay
        .http
        .post(format!("{}/api/soldiers", relay.base))
        .json(&json!({ "name": "Okafor", "rank": "Sergeant" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let created: serde_json::Value = created.json().await.unwrap();
    assert_eq!(created["id"], 2);

    let deleted = relay
        .http
        .delete(format!("{}/api/soldiers/2", relay.base))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);
    let deleted: serde_json::Value = deleted.json().await.unwrap();
    assert_eq!(deleted, json!({ "ok": true }));
}

#[tokio::test]
async fn test_invalid_soldier_answers_422_without_store_call() {
    let cam = camera(200, FRAME).await;
    let store = MockServer::start().await;
    let relay = start(&format!("{}/stream", cam.uri()), Some(&store)).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/soldiers"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&store)
        .await;

    let resp = relay
        .http
        .post(format!("{}/api/soldiers", relay.base))
        .json(&json!({ "name": "  ", "rank": "Private" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Validation failed"));
}

#[tokio::test]
async fn test_update_missing_soldier_answers_404() {
    let cam = camera(200, FRAME).await;
    let store = MockServer::start().await;
    let relay = start(&format!("{}/stream", cam.uri()), Some(&store)).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/soldiers"))
        .respond_with(ResponseTemplate::new(406).set_body_json(json!({
            "code": "PGRST116",
            "message": "JSON object requested, multiple (or no) rows returned"
        })))
        .mount(&store)
        .await;

    let resp = relay
        .http
        .put(format!("{}/api/soldiers/999", relay.base))
        .json(&json!({ "name": "Reyes", "rank": "Sergeant" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Soldier '999' not found" }));
}

#[tokio::test]
async fn test_missing_table_answers_500_not_404() {
    let cam = camera(200, FRAME).await;
    let store = MockServer::start().await;
    let relay = start(&format!("{}/stream", cam.uri()), Some(&store)).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/soldiers"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "PGRST205",
            "message": "Could not find the table 'public.soldiers' in the schema cache"
        })))
        .mount(&store)
        .await;

    let resp = relay
        .http
        .put(format!("{}/api/soldiers/7", relay.base))
        .json(&json!({ "name": "Reyes", "rank": "Sergeant" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("Could not find the table")
    );
}

#[tokio::test]
async fn test_store_failure_answers_500_with_message() {
    let cam = camera(200, FRAME).await;
    let store = MockServer::start().await;
    let relay = start(&format!("{}/stream", cam.uri()), Some(&store)).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/threats"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": "XX000",
            "message": "database is on fire"
        })))
        .mount(&store)
        .await;

    let resp = relay
        .http
        .get(format!("{}/api/threats", relay.base))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("database is on fire")
    );
}

#[tokio::test]
async fn test_create_system_log_defaults_level() {
    let cam = camera(200, FRAME).await;
    let store = MockServer::start().await;
    let relay = start(&format!("{}/stream", cam.uri()), Some(&store)).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/system_logs"))
        .and(wiremock::matchers::body_partial_json(
            json!({ "level": "INFO", "message": "camera online" }),
        ))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 11,
            "level": "INFO",
            "tag": null,
            "message": "camera online",
            "context": {},
            "created_at": "2026-10-01T12:00:00+00:00"
        })))
        .expect(1)
        .mount(&store)
        .await;

    let resp = relay
        .http
        .post(format!("{}/api/system-logs", relay.base))
        .json(&json!({ "message": "camera online" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["id"], 11);
}

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, Stream, StreamExt};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use trackpad_math_lib::client::{ApiClient, SettingsSource};
use trackpad_math_lib::config::{AppConfig, ClientConfig};
use trackpad_math_lib::models::Point;
use trackpad_math_lib::pointer::RecordingPointer;
use trackpad_math_lib::{server, AppState};

struct TestServer {
    _dir: TempDir,
    addr: SocketAddr,
    pointer: Arc<RecordingPointer>,
    shutdown: CancellationToken,
}

impl TestServer {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pointer = Arc::new(RecordingPointer::new());
        let state = AppState::open(&AppConfig::for_data_dir(dir.path()), pointer.clone())
            .await
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        tokio::spawn(server::serve(listener, state, shutdown.clone()));

        Self {
            _dir: dir,
            addr,
            pointer,
            shutdown,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn ws_url(&self) -> String {
        format!("ws://{}/ws/record", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn slash() -> Value {
    let points: Vec<Value> = (0..8)
        .map(|i| json!({ "x": i * 5, "y": 40 - i * 5, "t": i * 16 }))
        .collect();
    Value::Array(points)
}

fn circle() -> Value {
    let points: Vec<Value> = (0..16)
        .map(|i| {
            let angle = i as f64 / 15.0 * std::f64::consts::TAU;
            json!({ "x": 20.0 * angle.cos(), "y": 20.0 * angle.sin(), "t": i * 16 })
        })
        .collect();
    Value::Array(points)
}

async fn teach(server: &TestServer, label: &str, points: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(server.url("/api/teach"))
        .json(&json!({ "label": label, "points": points }))
        .send()
        .await
        .unwrap()
}

async fn next_json<S>(stream: &mut S) -> Value
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("socket ended: {other:?}"),
        }
    }
}

#[tokio::test]
async fn teach_then_classify_over_websocket() {
    let server = TestServer::start().await;

    let response = teach(&server, "/", slash()).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "saved");
    assert_eq!(body["model_updated"], true);
    assert!(body["id"].as_str().is_some());

    assert_eq!(teach(&server, "o", circle()).await.status(), 200);

    let (socket, _) = connect_async(server.ws_url()).await.unwrap();
    let (mut sink, mut stream) = socket.split();
    sink.send(Message::Text(
        json!({ "action": "classify", "points": slash() }).to_string(),
    ))
    .await
    .unwrap();

    assert_eq!(next_json(&mut stream).await["status"], "classifying");
    let finished = next_json(&mut stream).await;
    assert_eq!(finished["status"], "finished");
    assert_eq!(finished["symbol"], "/");
    let candidates = finished["candidates"].as_array().unwrap();
    assert_eq!(candidates[0]["symbol"], "/");
}

#[tokio::test]
async fn set_cursor_is_acknowledged() {
    let server = TestServer::start().await;

    let (socket, _) = connect_async(server.ws_url()).await.unwrap();
    let (mut sink, mut stream) = socket.split();
    sink.send(Message::Text(
        json!({ "action": "set_cursor", "x": 640, "y": 400 }).to_string(),
    ))
    .await
    .unwrap();

    assert_eq!(next_json(&mut stream).await["status"], "cursor_reset");
    assert_eq!(server.pointer.moves(), vec![(640.0, 400.0)]);

    sink.send(Message::Text("garbage".into())).await.unwrap();
    assert_eq!(next_json(&mut stream).await["status"], "error");
}

#[tokio::test]
async fn teach_validation_errors_are_400_with_detail() {
    let server = TestServer::start().await;

    let empty = teach(&server, "x", json!([])).await;
    assert_eq!(empty.status(), 400);
    let body: Value = empty.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("no points"));

    let unlabeled = teach(&server, "  ", slash()).await;
    assert_eq!(unlabeled.status(), 400);

    let malformed = reqwest::Client::new()
        .post(server.url("/api/teach"))
        .header("content-type", "application/json")
        .body("{")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), 400);
    let body: Value = malformed.json().await.unwrap();
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn settings_round_trip() {
    let server = TestServer::start().await;
    let http = reqwest::Client::new();

    let api = ApiClient::new(ClientConfig::new(server.url(""))).unwrap();
    let defaults = api.fetch_settings().await.unwrap();
    assert!(defaults.auto_mode);
    assert_eq!(defaults.pause_threshold, 1000);

    let response = http
        .post(server.url("/api/settings"))
        .json(&json!({ "auto_mode": false, "pause_threshold": 800 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "updated");

    let current = api.fetch_settings().await.unwrap();
    assert!(!current.auto_mode);
    assert_eq!(current.pause_threshold, 800);
    assert_eq!(current.equation_scroll_x_sensitivity, 20);

    let rejected = http
        .post(server.url("/api/settings"))
        .json(&json!({ "pause_threshold": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), 400);
}

#[tokio::test]
async fn drawings_can_be_listed_fetched_and_deleted() {
    let server = TestServer::start().await;
    let http = reqwest::Client::new();

    let receipt = ApiClient::new(ClientConfig::new(server.url("")))
        .unwrap()
        .teach_points("x", &serde_json::from_value::<Vec<Point>>(slash()).unwrap())
        .await
        .unwrap();
    assert_eq!(receipt.status, "saved");

    let labels: Value = http
        .get(server.url("/api/labels"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entry = labels
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["label"] == "x")
        .unwrap();
    assert_eq!(entry["count"], 1);
    assert_eq!(labels[0]["label"], "0");

    let listed: Value = http
        .get(server.url("/api/drawings?label=x"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], receipt.id.as_str());

    let fetched = http
        .get(server.url(&format!("/api/drawings/{}", receipt.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(fetched.status(), 200);

    let deleted = http
        .delete(server.url(&format!("/api/drawings/{}", receipt.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);

    let missing = http
        .get(server.url(&format!("/api/drawings/{}", receipt.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    let status: Value = http
        .get(server.url("/api/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["exemplar_count"], 0);
    assert_eq!(status["model_loaded"], false);
}

#[tokio::test]
async fn stored_drawings_are_reloaded_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::for_data_dir(dir.path());

    {
        let state = AppState::open(&config, Arc::new(RecordingPointer::new()))
            .await
            .unwrap();
        state
            .teacher
            .teach(serde_json::from_value(json!({ "label": "o", "points": circle() })).unwrap())
            .await
            .unwrap();
    }

    let reopened = AppState::open(&config, Arc::new(RecordingPointer::new()))
        .await
        .unwrap();
    let stats = reopened.classifier.stats().unwrap();
    assert_eq!(stats.exemplar_count, 1);
    assert_eq!(stats.label_count, 1);
}

#[tokio::test]
async fn reset_forgets_every_taught_symbol() {
    let server = TestServer::start().await;
    let http = reqwest::Client::new();
    assert_eq!(teach(&server, "/", slash()).await.status(), 200);
    assert_eq!(teach(&server, "o", circle()).await.status(), 200);

    let response = http
        .delete(server.url("/api/data/reset"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "reset");
    assert_eq!(body["deleted"], 2);

    let listed: Value = http
        .get(server.url("/api/drawings"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.as_array().unwrap().is_empty());

    let (socket, _) = connect_async(server.ws_url()).await.unwrap();
    let (mut sink, mut stream) = socket.split();
    sink.send(Message::Text(
        json!({ "action": "classify", "points": slash() }).to_string(),
    ))
    .await
    .unwrap();

    assert_eq!(next_json(&mut stream).await["status"], "classifying");
    let reply = next_json(&mut stream).await;
    assert_eq!(reply["status"], "error");
    assert!(reply["message"].as_str().unwrap().contains("Teach a symbol"));
}

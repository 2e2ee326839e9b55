//! Shared fixtures for furni-ai integration tests
//!
//! Each test gets its own temp root folder (database + blob directory) and,
//! when needed, a stand-in Flowise server on an ephemeral port.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    routing::post,
    Json, Router,
};
use base64::Engine as _;
use furni_ai::services::{FlowiseClient, PollSettings};
use furni_ai::{AppState, ServiceConfig};
use furni_common::events::EventBus;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt;

/// PNG signature plus the start of an IHDR chunk; enough for type sniffing
pub const PNG_HEADER: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R',
];

pub fn png_base64() -> String {
    base64::engine::general_purpose::STANDARD.encode(PNG_HEADER)
}

pub fn fast_polling() -> PollSettings {
    PollSettings {
        initial_delay: Duration::from_millis(10),
        interval: Duration::from_millis(10),
        max_attempts: 300,
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub pool: SqlitePool,
    pub root: TempDir,
}

/// App backed by a fresh database; `flowise_url` of `None` selects the fallback
pub async fn test_app(flowise_url: Option<String>) -> TestApp {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let pool = furni_ai::db::init_database_pool(&root.path().join("furnicraft.db"))
        .await
        .expect("Failed to initialize database");

    let flowise = flowise_url.map(|url| {
        FlowiseClient::new(url, None, Duration::from_secs(5)).expect("Failed to build client")
    });

    let images_root = root.path().join("furniture-images");
    std::fs::create_dir_all(&images_root).expect("Failed to create images dir");

    let state = AppState::new(
        pool.clone(),
        EventBus::new(100),
        flowise,
        ServiceConfig {
            images_root,
            public_base_url: "http://localhost:5740/storage".to_string(),
            poll: fast_polling(),
            question: None,
        },
    );
    let app = furni_ai::build_router(state.clone());

    TestApp {
        app,
        state,
        pool,
        root,
    }
}

/// Send a request; the body is parsed as JSON (`Null` when empty)
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("Request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// POST /designs with a small PNG; returns the design JSON
pub async fn upload_design(app: &Router, title: &str) -> Value {
    let body = serde_json::json!({
        "title": title,
        "file_name": "design.png",
        "content_type": "image/png",
        "data": png_base64(),
    });
    let (status, design) = send(app, post_json("/designs", &body)).await;
    assert_eq!(status, StatusCode::ACCEPTED, "upload failed: {}", design);
    design
}

/// Poll GET /designs/:id until the status is terminal
pub async fn wait_for_terminal(app: &Router, design_id: &str) -> String {
    for _ in 0..500 {
        let (_, design) = send(app, get(&format!("/designs/{}", design_id))).await;
        let status = design["status"].as_str().unwrap_or_default().to_string();
        if status == "completed" || status == "failed" {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("design {} never reached a terminal status", design_id);
}

/// Stand-in Flowise endpoint replying with a fixed status and body
pub struct MockFlowise {
    pub url: String,
    pub requests: Arc<Mutex<Vec<Value>>>,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn mock_predict(State(state): State<MockState>, Json(request): Json<Value>) -> (StatusCode, String) {
    state.requests.lock().unwrap().push(request);
    (state.status, state.body.clone())
}

pub async fn spawn_mock_flowise(status: StatusCode, body: impl Into<String>) -> MockFlowise {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/v1/prediction/test-flow", post(mock_predict))
        .with_state(MockState {
            status,
            body: body.into(),
            requests: requests.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock Flowise");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    MockFlowise {
        url: format!("http://{}/api/v1/prediction/test-flow", addr),
        requests,
    }
}

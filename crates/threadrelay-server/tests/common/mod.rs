//! Stub assistant API and relay app builders shared by integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tower::ServiceExt;

use threadrelay_server::assistant::{AssistantClient, AssistantConfig};
use threadrelay_server::routes::{AppState, build_router};
use threadrelay_server::{Relay, RelayConfig};

pub const API_KEY: &str = "sk-test-key";
pub const ASSISTANT_ID: &str = "asst_test";

/// One request received by the stub.
#[derive(Debug, Clone)]
pub struct Call {
    pub op: &'static str,
    pub path: String,
    pub authorization: Option<String>,
    pub beta: Option<String>,
    pub body: Value,
}

/// Canned responses, one per endpoint. `statuses` is consumed one entry per
/// poll; the last entry repeats once the list is exhausted.
#[derive(Debug, Clone)]
pub struct Script {
    pub create_thread: Value,
    pub add_message: Value,
    pub create_run: Value,
    pub statuses: Vec<Value>,
    pub list_messages: Value,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            create_thread: json!({"id": "t1", "object": "thread"}),
            add_message: json!({"id": "msg_user", "object": "thread.message", "role": "user"}),
            create_run: json!({"id": "r1", "object": "thread.run", "status": "queued"}),
            statuses: vec![
                json!({"id": "r1", "status": "queued"}),
                json!({"id": "r1", "status": "completed"}),
            ],
            list_messages: assistant_reply("Hi there【1:0†source】!"),
        }
    }
}

impl Script {
    pub fn with_statuses(mut self, statuses: &[&str]) -> Self {
        self.statuses = statuses
            .iter()
            .map(|s| json!({"id": "r1", "status": s}))
            .collect();
        self
    }
}

/// A newest-first message list whose first assistant entry says `text`.
pub fn assistant_reply(text: &str) -> Value {
    json!({
        "object": "list",
        "data": [
            {"id": "msg_2", "role": "assistant", "content": [
                {"type": "text", "text": {"value": text, "annotations": []}}
            ]},
            {"id": "msg_1", "role": "user", "content": [
                {"type": "text", "text": {"value": "Hello", "annotations": []}}
            ]}
        ]
    })
}

pub fn api_error(message: &str) -> Value {
    json!({"error": {"message": message, "type": "invalid_request_error"}})
}

pub struct StubUpstream {
    script: Script,
    calls: Mutex<Vec<Call>>,
}

impl StubUpstream {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ops(&self) -> Vec<&'static str> {
        self.calls().into_iter().map(|c| c.op).collect()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.op == op).count()
    }
}

async fn dispatch(
    State(stub): State<Arc<StubUpstream>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let segments: Vec<&str> = uri.path().split('/').filter(|s| !s.is_empty()).collect();
    let op = match (method.as_str(), segments.as_slice()) {
        ("POST", ["v1", "threads"]) => "create_thread",
        ("POST", ["v1", "threads", _, "messages"]) => "add_message",
        ("GET", ["v1", "threads", _, "messages"]) => "list_messages",
        ("POST", ["v1", "threads", _, "runs"]) => "create_run",
        ("GET", ["v1", "threads", _, "runs", _]) => "get_run",
        _ => return (StatusCode::NOT_FOUND, Json(json!({"error": {"message": "no route"}}))).into_response(),
    };

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let call = Call {
        op,
        path: uri.path().to_string(),
        authorization: header("authorization"),
        beta: header("openai-beta"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };

    let polls_so_far = {
        let mut calls = stub.calls.lock().unwrap();
        let polls = calls.iter().filter(|c| c.op == "get_run").count();
        calls.push(call);
        polls
    };

    let script = &stub.script;
    let reply = match op {
        "create_thread" => script.create_thread.clone(),
        "add_message" => script.add_message.clone(),
        "create_run" => script.create_run.clone(),
        "get_run" => script
            .statuses
            .get(polls_so_far)
            .or_else(|| script.statuses.last())
            .cloned()
            .unwrap_or_else(|| json!({})),
        _ => script.list_messages.clone(),
    };
    let status = if reply.get("error").is_some() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    (status, Json(reply)).into_response()
}

/// Serve `script` on an ephemeral local port. Returns the API base URL.
pub async fn start_upstream(script: Script) -> (String, Arc<StubUpstream>) {
    let stub = Arc::new(StubUpstream {
        script,
        calls: Mutex::new(Vec::new()),
    });
    let app = axum::Router::new()
        .fallback(dispatch)
        .with_state(Arc::clone(&stub));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1"), stub)
}

/// Relay app pointed at `base_url`, polling every 10ms up to `max_attempts` times.
pub fn relay_app(base_url: &str, max_attempts: u32) -> axum::Router {
    relay_app_with_strip_patterns(base_url, max_attempts, &[])
}

/// Like [`relay_app`], with extra reply strip patterns.
pub fn relay_app_with_strip_patterns(
    base_url: &str,
    max_attempts: u32,
    strip_patterns: &[&str],
) -> axum::Router {
    let assistant = AssistantConfig {
        base_url: base_url.to_string(),
        api_key: API_KEY.into(),
        assistant_id: ASSISTANT_ID.into(),
        request_timeout: Duration::from_secs(5),
    };
    let config = RelayConfig::new("127.0.0.1:0".parse().unwrap(), assistant)
        .unwrap()
        .with_poll(Duration::from_millis(10), max_attempts)
        .unwrap()
        .with_strip_patterns(strip_patterns)
        .unwrap();
    let client = AssistantClient::new(&config.assistant).unwrap();
    let relay = Relay::new(client, config.poll).with_sanitizer(config.sanitizer.clone());
    build_router(
        AppState {
            relay: Arc::new(relay),
        },
        config.cors_layer(),
    )
}

/// POST `body` to `/sendMessage` and return (status, JSON body).
pub async fn send_message(app: axum::Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/sendMessage")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

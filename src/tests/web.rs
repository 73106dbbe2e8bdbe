// Endpoint tests for the relay router, driven through a scripted
// assistant backend.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tower::ServiceExt; // for .oneshot()

use crate::app_state::AppState;
use crate::assistant_client::{AssistantBackend, AssistantError, AssistantReply};
use crate::chat_log::ChatLog;
use crate::relay_web::{build_router, RELAY_ROLE};

struct ScriptedBackend {
    reply: AssistantReply,
}

#[async_trait::async_trait]
impl AssistantBackend for ScriptedBackend {
    async fn ask(&self, _content: &str) -> Result<AssistantReply, AssistantError> {
        Ok(self.reply.clone())
    }
}

struct FailingBackend;

#[async_trait::async_trait]
impl AssistantBackend for FailingBackend {
    async fn ask(&self, _content: &str) -> Result<AssistantReply, AssistantError> {
        Err(AssistantError::MissingReply)
    }
}

fn router_with(backend: Arc<dyn AssistantBackend>, dir: &tempfile::TempDir) -> Router {
    let log = ChatLog::new(dir.path().join("chatlog.json"));
    let state = Arc::new(AppState::new(backend, log));
    build_router(state, &["http://localhost".to_string()])
}

fn ask_request(content: &str) -> Request<Body> {
    Request::builder()
        .uri("/ask")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(
            serde_json::json!({ "content": content }).to_string(),
        ))
        .expect("request should build")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

#[tokio::test]
async fn ask_returns_parsed_draw_on_completed_run() {
    let dir = tempfile::tempdir().expect("temp dir");
    let reply = AssistantReply::Completed {
        text: "```json\n{\"keyinfo\": [\"alice\"], \"connections\": [[\"alice\", \"bob\"]], \"message\": \"drawn\"}\n```".to_string(),
    };
    let app = router_with(Arc::new(ScriptedBackend { reply }), &dir);

    let response = app.oneshot(ask_request("draw my network")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(
        body["generator_draw"]["keyinfo"],
        serde_json::json!(["alice"])
    );
    assert_eq!(
        body["generator_draw"]["connections"],
        serde_json::json!([["alice", "bob"]])
    );
    assert_eq!(body["generator_chat"], "drawn");
}

#[tokio::test]
async fn ask_reports_remote_status_on_unfinished_run() {
    let dir = tempfile::tempdir().expect("temp dir");
    let reply = AssistantReply::Unfinished {
        status: "failed".to_string(),
    };
    let app = router_with(Arc::new(ScriptedBackend { reply }), &dir);

    let response = app.oneshot(ask_request("hello")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn ask_recovers_extraction_failure_as_http_ok() {
    let dir = tempfile::tempdir().expect("temp dir");
    let reply = AssistantReply::Completed {
        text: "sorry, I could not produce a map today".to_string(),
    };
    let app = router_with(Arc::new(ScriptedBackend { reply }), &dir);

    let response = app.oneshot(ask_request("hello")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["generator_draw"].is_null());
    let chat = body["generator_chat"].as_str().expect("chat string");
    assert!(chat.starts_with("Invalid JSON string: "));
}

#[tokio::test]
async fn ask_surfaces_backend_errors_as_bad_gateway() {
    let dir = tempfile::tempdir().expect("temp dir");
    let app = router_with(Arc::new(FailingBackend), &dir);

    let response = app.oneshot(ask_request("hello")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert!(!body["error"].as_str().expect("error string").is_empty());
}

#[tokio::test]
async fn ask_logs_both_directions_of_the_exchange() {
    let dir = tempfile::tempdir().expect("temp dir");
    let reply = AssistantReply::Completed {
        text: r#"{"keyinfo": [], "connections": [], "message": "ok"}"#.to_string(),
    };
    let log_path = dir.path().join("chatlog.json");
    let log = ChatLog::new(&log_path);
    let state = Arc::new(AppState::new(Arc::new(ScriptedBackend { reply }), log));
    let app = build_router(state, &["http://localhost".to_string()]);

    let response = app.oneshot(ask_request("draw it")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries = ChatLog::new(&log_path).read_entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].role, "user");
    assert_eq!(entries[0].content, "draw it");
    assert_eq!(entries[1].role, RELAY_ROLE);
    assert!(entries[1].content.contains("generator_draw"));
}

#[tokio::test]
async fn healthz_answers_ok() {
    let dir = tempfile::tempdir().expect("temp dir");
    let reply = AssistantReply::Unfinished {
        status: "expired".to_string(),
    };
    let app = router_with(Arc::new(ScriptedBackend { reply }), &dir);

    let request = Request::builder()
        .uri("/healthz")
        .method("GET")
        .body(Body::empty())
        .expect("request should build");
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

//! HTTP surface of the assistant relay.

use axum::{
    extract::Extension,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::assistant_client::AssistantReply;
use crate::reply_extractor::{split_reply, DrawPayload};

/// Role tag identifying relay-produced log entries for later audit.
pub const RELAY_ROLE: &str = "relayResponse";

#[derive(Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub generator_draw: Option<DrawPayload>,
    pub generator_chat: String,
}

pub fn build_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/ask", post(ask))
        .route("/healthz", get(healthz))
        .layer(cors_layer(allowed_origins))
        .layer(Extension(state))
}

// Credentialed CORS forbids wildcard methods/headers, so both mirror the
// request instead; origins stay an explicit allowlist.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[axum::debug_handler]
async fn ask(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Response {
    let request_id = Uuid::new_v4();
    info!(%request_id, "relay request received");
    log_exchange(&state, "user", &request.content).await;

    match state.backend.ask(&request.content).await {
        Ok(AssistantReply::Completed { text }) => {
            let (generator_draw, generator_chat) = split_reply(&text);
            let response = AskResponse {
                generator_draw,
                generator_chat,
            };
            let rendered = serde_json::to_string(&response).unwrap_or_default();
            log_exchange(&state, RELAY_ROLE, &rendered).await;
            Json(response).into_response()
        }
        Ok(AssistantReply::Unfinished { status }) => {
            warn!(%request_id, %status, "assistant run ended without completing");
            log_exchange(&state, RELAY_ROLE, &format!("run status: {status}")).await;
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": status })),
            )
                .into_response()
        }
        Err(err) => {
            warn!(%request_id, error = %err, "assistant backend call failed");
            log_exchange(&state, RELAY_ROLE, &format!("backend error: {err}")).await;
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// Log failures must never fail the request path.
async fn log_exchange(state: &AppState, role: &str, content: &str) {
    let log = state.chat_log.lock().await;
    if let Err(err) = log.append(role, content) {
        warn!(%role, error = %err, "failed to append chat log entry");
    }
}

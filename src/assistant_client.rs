//! Outbound client for the hosted assistants API.
//!
//! One relay request maps to one remote conversation: create a thread,
//! post the user message, start a run, poll until the run reaches a
//! terminal status, then read back the first assistant-authored text
//! segment. Polling is wall-clock bounded; an unresponsive remote surfaces
//! as an error instead of stalling the request forever.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config_loader::AssistantConfig;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("request to assistant API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("assistant API returned {status} for {operation}")]
    Api {
        operation: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("run {run_id} did not reach a terminal status within {timeout_secs}s")]
    PollTimeout { run_id: String, timeout_secs: u64 },

    #[error("run completed but no assistant reply was found")]
    MissingReply,
}

/// Outcome of driving one message through the remote assistant.
#[derive(Debug, Clone)]
pub enum AssistantReply {
    /// Terminal `completed` status; carries the raw reply text.
    Completed { text: String },
    /// Any other terminal status, echoed back to the caller.
    Unfinished { status: String },
}

/// Seam between the HTTP handler and the remote service. The handler only
/// ever sees this trait, so tests drive it with a scripted stub.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn ask(&self, content: &str) -> Result<AssistantReply, AssistantError>;
}

/// Remote run states. Terminal means no further transition will occur;
/// `requires_action` is terminal here because the relay submits no tool
/// outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ThreadObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    status: RunStatus,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<MessageObject>,
}

#[derive(Debug, Deserialize)]
struct MessageObject {
    role: String,
    #[serde(default)]
    content: Vec<MessageSegment>,
}

// Only text segments matter to the relay; image segments deserialize with
// `text: None` and are skipped.
#[derive(Debug, Deserialize)]
struct MessageSegment {
    #[serde(default)]
    text: Option<TextSegment>,
}

#[derive(Debug, Deserialize)]
struct TextSegment {
    value: String,
}

pub struct AssistantClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    assistant_id: String,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl AssistantClient {
    pub fn new(config: &AssistantConfig, api_key: String) -> Result<Self, AssistantError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            assistant_id: config.assistant_id.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
        })
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, AssistantError> {
        let response = self
            .http
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .json(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AssistantError::Api {
                operation,
                status: response.status(),
            });
        }
        Ok(response.json().await?)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
    ) -> Result<T, AssistantError> {
        let response = self
            .http
            .get(format!("{}{path}", self.api_base))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AssistantError::Api {
                operation,
                status: response.status(),
            });
        }
        Ok(response.json().await?)
    }

    async fn create_thread(&self) -> Result<ThreadObject, AssistantError> {
        self.post("create thread", "/threads", &json!({})).await
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), AssistantError> {
        let _: serde_json::Value = self
            .post(
                "add message",
                &format!("/threads/{thread_id}/messages"),
                &json!({ "role": "user", "content": content }),
            )
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str) -> Result<RunObject, AssistantError> {
        self.post(
            "create run",
            &format!("/threads/{thread_id}/runs"),
            &json!({ "assistant_id": self.assistant_id, "instructions": "" }),
        )
        .await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunObject, AssistantError> {
        self.get("get run", &format!("/threads/{thread_id}/runs/{run_id}"))
            .await
    }

    /// Poll the run at the configured interval until it reaches a terminal
    /// status or the wall-clock bound expires.
    async fn run_to_terminal(
        &self,
        thread_id: &str,
        run: RunObject,
    ) -> Result<RunStatus, AssistantError> {
        let deadline = Instant::now() + self.poll_timeout;
        let mut status = run.status;
        while !status.is_terminal() {
            if Instant::now() >= deadline {
                return Err(AssistantError::PollTimeout {
                    run_id: run.id,
                    timeout_secs: self.poll_timeout.as_secs(),
                });
            }
            sleep(self.poll_interval).await;
            status = self.get_run(thread_id, &run.id).await?.status;
            debug!(run_id = %run.id, status = status.as_str(), "polled run");
        }
        Ok(status)
    }

    async fn first_assistant_text(&self, thread_id: &str) -> Result<String, AssistantError> {
        let messages: MessageList = self
            .get("list messages", &format!("/threads/{thread_id}/messages"))
            .await?;
        first_assistant_text_of(&messages).ok_or(AssistantError::MissingReply)
    }
}

/// First text segment of the first assistant-authored message, newest
/// first as the API lists them.
fn first_assistant_text_of(messages: &MessageList) -> Option<String> {
    messages
        .data
        .iter()
        .find(|message| message.role == "assistant")
        .and_then(|message| {
            message
                .content
                .iter()
                .find_map(|segment| segment.text.as_ref())
        })
        .map(|text| text.value.clone())
}

#[async_trait]
impl AssistantBackend for AssistantClient {
    async fn ask(&self, content: &str) -> Result<AssistantReply, AssistantError> {
        let thread = self.create_thread().await?;
        self.add_message(&thread.id, content).await?;
        let run = self.create_run(&thread.id).await?;
        let status = self.run_to_terminal(&thread.id, run).await?;
        if status != RunStatus::Completed {
            return Ok(AssistantReply::Unfinished {
                status: status.as_str().to_string(),
            });
        }
        let text = self.first_assistant_text(&thread.id).await?;
        Ok(AssistantReply::Completed { text })
    }
}

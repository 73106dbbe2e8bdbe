//! Shared state for the relay service.
//!
//! The assistant backend and the chat log are explicit dependencies built
//! at process start and injected into the handlers, never ambient globals.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::assistant_client::AssistantBackend;
use crate::chat_log::ChatLog;

pub struct AppState {
    pub backend: Arc<dyn AssistantBackend>,
    // Appends are read-modify-write over the whole file; the mutex keeps
    // concurrent requests from losing each other's entries.
    pub chat_log: Mutex<ChatLog>,
}

impl AppState {
    pub fn new(backend: Arc<dyn AssistantBackend>, chat_log: ChatLog) -> Self {
        Self {
            backend,
            chat_log: Mutex::new(chat_log),
        }
    }
}

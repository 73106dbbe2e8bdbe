//! Library root for the `studyboard` crate.
//!
//! Backend pair for a canvas-assistant user study: an HTTP relay that
//! forwards chat messages to a hosted assistant and extracts the drawable
//! JSON payload from its reply, and an offline questionnaire-analysis
//! pipeline (reverse coding, sub-scale scores, SUS, box-plot figures).

// Core error handling
pub mod errors;

// Assistant relay
pub mod app_state;
pub mod assistant_client;
pub mod chat_log;
pub mod relay_web;
pub mod reply_extractor;

// Survey analysis
pub mod survey;

// Configuration & CLI
pub mod cli;
pub mod config_loader;

#[cfg(test)]
mod tests {
    pub mod web;
}

pub use reply_extractor::{split_reply, DrawPayload};

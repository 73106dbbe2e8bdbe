//! Layered runtime configuration: serialized defaults, then
//! `studyboard.toml`, then `STUDYBOARD_`-prefixed environment variables
//! (double underscore separates sections, e.g.
//! `STUDYBOARD_RELAY__PORT=3001`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::errors::StudyError;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StudyConfig {
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub chat_log_path: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            allowed_origins: vec![
                "http://localhost".to_string(),
                "http://localhost:3000".to_string(),
            ],
            chat_log_path: "chatlog.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantConfig {
    pub api_base: String,
    pub assistant_id: String,
    pub poll_interval_ms: u64,
    pub poll_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            assistant_id: String::new(),
            poll_interval_ms: 750,
            poll_timeout_secs: 120,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    pub out_dir: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            out_dir: ".".to_string(),
        }
    }
}

pub fn load_config() -> Result<StudyConfig, figment::Error> {
    let figment = Figment::from(Serialized::defaults(StudyConfig::default()))
        .merge(Toml::file("studyboard.toml"))
        .merge(Env::prefixed("STUDYBOARD_").split("__"));
    figment.extract()
}

/// The API key only ever comes from the environment, never from a config
/// file on disk.
pub fn resolve_api_key() -> Result<String, StudyError> {
    let key = std::env::var("STUDYBOARD_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .unwrap_or_default();
    if key.trim().is_empty() {
        return Err(StudyError::config(
            "assistant API key must be set (STUDYBOARD_API_KEY or OPENAI_API_KEY)",
        ));
    }
    Ok(key)
}

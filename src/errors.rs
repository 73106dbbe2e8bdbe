//! Structured error types for the studyboard backend.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::assistant_client::AssistantError;

/// Main error type for both the relay service and the analysis pipeline.
#[derive(Error, Debug)]
pub enum StudyError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV read failed: {context}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("Missing column {column:?}")]
    MissingColumn { column: String },

    #[error("Non-numeric value {value:?} in column {column:?}, row {row}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Assistant request failed: {source}")]
    Assistant {
        #[source]
        source: AssistantError,
    },

    #[error("Figure rendering failed: {message}")]
    Plot { message: String },
}

impl StudyError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a CSV error
    pub fn csv(context: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            context: context.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Create a figure-rendering error
    pub fn plot(message: impl Into<String>) -> Self {
        Self::Plot {
            message: message.into(),
        }
    }
}

impl From<AssistantError> for StudyError {
    fn from(source: AssistantError) -> Self {
        Self::Assistant { source }
    }
}

#[derive(Serialize)]
struct ErrBody {
    error: String,
}

impl IntoResponse for StudyError {
    fn into_response(self) -> Response {
        let code = match &self {
            StudyError::Assistant { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            code,
            Json(ErrBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

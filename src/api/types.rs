//! API request and response types

use crate::llm::ChatMessage;
use serde::{Deserialize, Serialize};

/// Submit a question to the router
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Per-request override of the configured verbosity
    #[serde(default)]
    pub verbose: Option<bool>,
    /// Return the run's transcript alongside the answer
    #[serde(default)]
    pub include_transcript: bool,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub rounds: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Vec<ChatMessage>>,
}

#[derive(Debug, Serialize)]
pub struct CitiesResponse {
    pub cities: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SamplesResponse {
    pub samples: Vec<&'static str>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

//! Workflow error types

use super::routes::RouteTableError;
use crate::llm::LlmError;
use crate::tools::RegistryError;
use std::time::Duration;
use thiserror::Error;

/// Why a run ended without an answer.
///
/// Tool failures never appear here; they are fed back to the model as
/// tool messages.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request was rejected before any step ran
    #[error("Validation error: {0}")]
    Validation(String),

    /// The reasoning service failed; runs are not retried
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// The deadline passed before an answer was produced
    #[error("Workflow timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Nothing queued, nothing in flight, and no answer
    #[error("Workflow stalled with no pending events or running tool calls")]
    Stalled,

    #[error("Exceeded the limit of {0} tool-call rounds")]
    MaxRoundsExceeded(usize),

    /// An event arrived that the current state cannot accept
    #[error("Workflow protocol violation: {0}")]
    Protocol(String),
}

impl EngineError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Failure constructing a workflow
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Routes(#[from] RouteTableError),
}

//! Tools the router can call on behalf of the model
//!
//! Tools are stateless singletons shared by every concurrent invocation;
//! per-call context arrives through [`ToolContext`].

mod document_search;
mod sql_query;

pub use document_search::{Document, DocumentIndex, DocumentSearchTool};
pub use sql_query::{QueryRows, SqlDatabase, SqlQueryTool};

use crate::llm::{ChatMessage, ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a tool invocation failed.
///
/// These never abort a run; the workflow turns them into tool messages
/// so the model can react on its next turn.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvocationError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Downstream(String),
    #[error("Invocation cancelled")]
    Cancelled,
    #[error("Tool task failed: {0}")]
    Panicked(String),
}

/// Per-call context handed to a tool
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Fires when the run is abandoned (deadline or shutdown)
    pub cancel: CancellationToken,
    pub call_id: String,
}

impl ToolContext {
    pub fn new(cancel: CancellationToken, call_id: impl Into<String>) -> Self {
        Self {
            cancel,
            call_id: call_id.into(),
        }
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, unique within a registry
    fn name(&self) -> &str;

    /// Tool description for the model
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Run the tool. May take arbitrarily long; long-running tools
    /// should watch `ctx.cancel`.
    async fn invoke(&self, arguments: Value, ctx: ToolContext) -> Result<String, InvocationError>;
}

/// Output of one tool call, before it becomes a transcript entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub call_id: String,
    pub tool_name: String,
    pub output: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(call: &ToolCall, output: impl Into<String>) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            output: output.into(),
            is_error: false,
        }
    }

    pub fn failure(call: &ToolCall, error: &InvocationError) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            output: format!("Error: {error}"),
            is_error: true,
        }
    }

    pub fn into_message(self) -> ChatMessage {
        ChatMessage::tool(self.call_id, self.tool_name, self.output)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),
}

/// The set of tools available to one workflow.
///
/// Built once from the supplied tool list and read-only afterwards, so
/// it can be shared across concurrent invocation tasks behind an `Arc`.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self, RegistryError> {
        let mut by_name = HashMap::with_capacity(tools.len());
        for (idx, tool) in tools.iter().enumerate() {
            if by_name.insert(tool.name().to_string(), idx).is_some() {
                return Err(RegistryError::DuplicateTool(tool.name().to_string()));
            }
        }
        Ok(Self { tools, by_name })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&idx| &self.tools[idx])
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool definitions for the model, in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Look up and run the tool named by `call`
    pub async fn invoke(
        &self,
        call: &ToolCall,
        ctx: ToolContext,
    ) -> Result<String, InvocationError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| InvocationError::UnknownTool(call.name.clone()))?;
        tool.invoke(call.arguments.clone(), ctx).await
    }
}

/// Schema shared by the question-answering tools: one free-text `input`
pub(crate) fn query_input_schema(what: &str) -> Value {
    json!({
        "type": "object",
        "required": ["input"],
        "properties": {
            "input": {
                "type": "string",
                "description": what
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct QueryInput {
    input: String,
}

/// Extract a non-empty `input` string from tool arguments
pub(crate) fn parse_query_input(arguments: Value) -> Result<String, InvocationError> {
    let parsed: QueryInput = serde_json::from_value(arguments)
        .map_err(|e| InvocationError::InvalidArguments(e.to_string()))?;
    let input = parsed.input.trim();
    if input.is_empty() {
        return Err(InvocationError::InvalidArguments(
            "input must not be empty".to_string(),
        ));
    }
    Ok(input.to_string())
}

//! Mock implementations for testing
//!
//! These mocks let the engine run end to end without a real model or
//! real data sources.

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use crate::tools::{query_input_schema, InvocationError, Tool, ToolContext};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

// ============================================================================
// Mock LLM Clients
// ============================================================================

/// Mock LLM client that returns queued responses
#[allow(dead_code)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

#[allow(dead_code)]
impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a plain text answer
    pub fn queue_text(&self, text: &str) {
        self.queue_response(LlmResponse::text(text));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

type Script = dyn Fn(&LlmRequest) -> Result<LlmResponse, LlmError> + Send + Sync;

/// LLM whose replies are computed from the request, for tests that
/// need the answer to depend on tool output
pub struct ScriptedLlm {
    script: Box<Script>,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(
        script: impl Fn(&LlmRequest) -> Result<LlmResponse, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for ScriptedLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.script)(request)
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Mock Tools
// ============================================================================

/// Tool returning a fixed output, optionally after a delay
pub struct StaticTool {
    name: String,
    output: String,
    delay: Option<Duration>,
    /// Arguments of every invocation, in call order
    pub calls: Mutex<Vec<Value>>,
}

impl StaticTool {
    pub fn new(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Mock {}", self.name)
    }

    fn input_schema(&self) -> Value {
        query_input_schema("anything")
    }

    async fn invoke(&self, arguments: Value, _ctx: ToolContext) -> Result<String, InvocationError> {
        self.calls.lock().unwrap().push(arguments);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.output.clone())
    }
}

/// Tool that always fails downstream
pub struct FailingTool {
    name: String,
    reason: String,
}

impl FailingTool {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Failing {}", self.name)
    }

    fn input_schema(&self) -> Value {
        query_input_schema("anything")
    }

    async fn invoke(
        &self,
        _arguments: Value,
        _ctx: ToolContext,
    ) -> Result<String, InvocationError> {
        Err(InvocationError::Downstream(self.reason.clone()))
    }
}

/// Tool that panics when invoked
pub struct PanickingTool {
    name: String,
}

impl PanickingTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Panicking {}", self.name)
    }

    fn input_schema(&self) -> Value {
        query_input_schema("anything")
    }

    async fn invoke(
        &self,
        _arguments: Value,
        _ctx: ToolContext,
    ) -> Result<String, InvocationError> {
        panic!("mock tool exploded");
    }
}

/// Sets its flag when dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Tool that never completes on its own.
///
/// Records whether its future was dropped, so tests can check the run
/// released it.
pub struct PendingTool {
    name: String,
    pub started: Arc<AtomicBool>,
    pub dropped: Arc<AtomicBool>,
}

impl PendingTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl Tool for PendingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Pending {}", self.name)
    }

    fn input_schema(&self) -> Value {
        query_input_schema("anything")
    }

    async fn invoke(&self, _arguments: Value, ctx: ToolContext) -> Result<String, InvocationError> {
        let _guard = DropFlag(self.dropped.clone());
        self.started.store(true, Ordering::SeqCst);
        ctx.cancel.cancelled().await;
        std::future::pending::<Result<String, InvocationError>>().await
    }
}

/// Tool that completes only once `n` invocations are in flight together
pub struct RendezvousTool {
    name: String,
    barrier: Arc<Barrier>,
}

impl RendezvousTool {
    pub fn new(name: impl Into<String>, barrier: Arc<Barrier>) -> Self {
        Self {
            name: name.into(),
            barrier,
        }
    }
}

#[async_trait]
impl Tool for RendezvousTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Rendezvous {}", self.name)
    }

    fn input_schema(&self) -> Value {
        query_input_schema("anything")
    }

    async fn invoke(
        &self,
        _arguments: Value,
        _ctx: ToolContext,
    ) -> Result<String, InvocationError> {
        self.barrier.wait().await;
        Ok(format!("{} done", self.name))
    }
}

//! The four workflow steps
//!
//! `converse` and `invoke` suspend (model call, tool call); `dispatch`
//! and `gather` are plain transformations of the run's context.

use super::context::WorkflowContext;
use super::error::EngineError;
use super::event::Event;
use crate::llm::{ChatMessage, LlmError, LlmRequest, LlmService, ToolCall, ToolDefinition};
use crate::tools::{InvocationError, ToolContext, ToolRegistry, ToolResult};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Read-only inputs of the conversational step
pub(crate) struct ChatEnv<'a> {
    pub llm: &'a dyn LlmService,
    pub tools: &'a [ToolDefinition],
    pub system: Option<&'a str>,
    pub verbose: bool,
}

fn unexpected(step: &str, event: &Event) -> EngineError {
    EngineError::Protocol(format!("{step} step cannot handle {:?}", event.kind()))
}

/// Conversational step: `Start`/`InputReady` → `Stopped` or `CallsGathered`
pub(crate) async fn converse(
    ctx: &mut WorkflowContext,
    event: Event,
    env: &ChatEnv<'_>,
) -> Result<Vec<Event>, EngineError> {
    match event {
        Event::Start { query } => ctx.append(ChatMessage::user(query)),
        Event::InputReady => {}
        other => return Err(unexpected("chat", &other)),
    }

    let request = LlmRequest {
        system: env.system.map(String::from),
        messages: ctx.transcript().to_vec(),
        tools: env.tools.to_vec(),
        max_tokens: None,
    };
    let response = env.llm.complete(&request).await?;
    let message = response.message;

    if env.verbose {
        tracing::info!(
            run_id = %ctx.run_id(),
            tool_calls = message.tool_calls.len(),
            "Chat message: {}",
            message.content
        );
    } else {
        tracing::debug!(
            run_id = %ctx.run_id(),
            tool_calls = message.tool_calls.len(),
            "Chat message: {}",
            message.content
        );
    }

    let calls = message.tool_calls.clone();
    let answer = message.content.clone();
    ctx.append(message);

    if !calls.is_empty() {
        return Ok(vec![Event::CallsGathered { calls }]);
    }
    if answer.trim().is_empty() {
        return Err(LlmError::invalid_response(
            "Model returned neither an answer nor tool calls",
        )
        .into());
    }
    Ok(vec![Event::Stopped { result: answer }])
}

/// Dispatch step: arm the barrier for `N` results and emit `N` requests
pub(crate) fn dispatch(
    ctx: &mut WorkflowContext,
    event: Event,
) -> Result<Vec<Event>, EngineError> {
    let Event::CallsGathered { calls } = event else {
        return Err(unexpected("dispatch", &event));
    };
    if calls.is_empty() {
        return Err(EngineError::Protocol("dispatch of an empty call list".to_string()));
    }
    if ctx.barrier_armed() {
        return Err(EngineError::Protocol(format!(
            "new round dispatched while {} of {} results are still outstanding",
            ctx.counters()
                .expected_results
                .unwrap_or_default()
                .saturating_sub(ctx.counters().received_results),
            ctx.counters().expected_results.unwrap_or_default()
        )));
    }

    ctx.arm_barrier(calls.len());
    tracing::debug!(
        run_id = %ctx.run_id(),
        round = ctx.counters().rounds,
        expected = calls.len(),
        "Dispatching tool calls"
    );
    Ok(calls
        .into_iter()
        .map(|call| Event::CallRequested { call })
        .collect())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tool panicked".to_string())
}

/// Invocation step: run one call and turn the outcome into a tool message.
///
/// Runs as its own task. Failures, including a panicking tool, become
/// error messages so the barrier still receives exactly one result per call.
pub(crate) async fn invoke(
    tools: Arc<ToolRegistry>,
    call: ToolCall,
    cancel: CancellationToken,
    verbose: bool,
) -> Event {
    if verbose {
        tracing::info!(
            call_id = %call.id,
            tool = %call.name,
            "Calling function {} with msg {}",
            call.name,
            call.arguments
        );
    } else {
        tracing::debug!(
            call_id = %call.id,
            tool = %call.name,
            "Calling function {} with msg {}",
            call.name,
            call.arguments
        );
    }

    let start = Instant::now();
    let ctx = ToolContext::new(cancel, call.id.clone());
    let outcome = AssertUnwindSafe(tools.invoke(&call, ctx)).catch_unwind().await;

    let result = match outcome {
        Ok(Ok(output)) => ToolResult::success(&call, output),
        Ok(Err(e)) => {
            tracing::warn!(call_id = %call.id, tool = %call.name, error = %e, "Tool call failed");
            ToolResult::failure(&call, &e)
        }
        Err(payload) => {
            let e = InvocationError::Panicked(panic_message(payload.as_ref()));
            tracing::error!(
                call_id = %call.id,
                tool = %call.name,
                error = %e,
                "Tool call panicked"
            );
            ToolResult::failure(&call, &e)
        }
    };

    tracing::debug!(
        call_id = %call.id,
        tool = %call.name,
        duration_ms = %start.elapsed().as_millis(),
        is_error = result.is_error,
        "Tool call finished"
    );
    Event::CallCompleted {
        message: result.into_message(),
    }
}

/// Gather step: buffer results until all `N` arrived, then release them
pub(crate) fn gather(
    ctx: &mut WorkflowContext,
    event: Event,
) -> Result<Vec<Event>, EngineError> {
    let Event::CallCompleted { message } = event else {
        return Err(unexpected("gather", &event));
    };
    let Some(expected) = ctx.counters().expected_results else {
        return Err(EngineError::Protocol(
            "tool result arrived with no round in progress".to_string(),
        ));
    };

    let received = ctx.record_result(message);
    if received < expected {
        tracing::debug!(run_id = %ctx.run_id(), received, expected, "Waiting for tool results");
        return Ok(Vec::new());
    }

    let released = ctx.release_barrier();
    tracing::debug!(run_id = %ctx.run_id(), released, "All tool results gathered");
    Ok(vec![Event::InputReady])
}

//! The router engine: event queue, step dispatch, deadline
//!
//! Each run owns a fresh [`WorkflowContext`] and an event queue seeded
//! with `Start`. Steps run one at a time on the run's task, except
//! invocations, which are spawned onto a `JoinSet` so calls within a
//! round proceed concurrently. Their completions re-enter the queue in
//! arrival order and are funneled through the gather step.

use super::context::WorkflowContext;
use super::error::{BuildError, EngineError};
use super::event::Event;
use super::routes::{Route, RouteTable, StepKind};
use super::steps::{self, ChatEnv};
use crate::llm::{ChatMessage, LlmService, ToolDefinition};
use crate::tools::{Tool, ToolRegistry};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Engine-wide settings, fixed at construction
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Deadline for a whole run
    pub timeout: Duration,
    /// Log every assistant message and tool call at `info`
    pub verbose: bool,
    pub system_prompt: Option<String>,
    /// Upper bound on tool-call rounds per run
    pub max_rounds: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            verbose: false,
            system_prompt: None,
            max_rounds: 10,
        }
    }
}

/// Per-run overrides of [`WorkflowConfig`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub timeout: Option<Duration>,
    pub verbose: Option<bool>,
}

impl RunOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }
}

/// A finished run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub answer: String,
    /// Seed history followed by everything this run appended
    pub transcript: Vec<ChatMessage>,
    pub rounds: usize,
}

/// Agent-routing workflow over a fixed set of tools.
///
/// Immutable after construction; any number of runs may execute
/// concurrently against one instance, each with its own context.
pub struct RouterWorkflow {
    llm: Arc<dyn LlmService>,
    tools: Arc<ToolRegistry>,
    definitions: Vec<ToolDefinition>,
    routes: RouteTable,
    config: WorkflowConfig,
    history: Vec<ChatMessage>,
}

impl RouterWorkflow {
    pub fn new(
        tools: Vec<Arc<dyn Tool>>,
        llm: Arc<dyn LlmService>,
        config: WorkflowConfig,
    ) -> Result<Self, BuildError> {
        let tools = ToolRegistry::new(tools)?;
        let definitions = tools.definitions();
        let routes = RouteTable::new()?;
        tracing::debug!(
            tools = ?definitions.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            model = %llm.model_id(),
            "Router workflow built"
        );
        Ok(Self {
            llm,
            tools: Arc::new(tools),
            definitions,
            routes,
            config,
            history: Vec::new(),
        })
    }

    /// Prefix copied into every run's transcript
    #[must_use]
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Answer `query`, consulting tools as the model sees fit
    pub async fn run(&self, query: &str, options: RunOptions) -> Result<String, EngineError> {
        self.run_with_transcript(query, options)
            .await
            .map(|out| out.answer)
    }

    pub async fn run_with_transcript(
        &self,
        query: &str,
        options: RunOptions,
    ) -> Result<RunOutput, EngineError> {
        if query.trim().is_empty() {
            return Err(EngineError::Validation("query must not be empty".to_string()));
        }

        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let verbose = options.verbose.unwrap_or(self.config.verbose);
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("run", run_id = %run_id);
        let cancel = CancellationToken::new();

        let ctx = WorkflowContext::new(run_id, self.history.clone());
        let driven = tokio::time::timeout(
            timeout,
            self.drive(ctx, query.to_string(), &cancel, verbose),
        )
        .instrument(span.clone())
        .await;

        match driven {
            Ok(Ok(output)) => {
                span.in_scope(|| {
                    tracing::info!(rounds = output.rounds, "Run finished");
                });
                Ok(output)
            }
            Ok(Err(e)) => {
                cancel.cancel();
                span.in_scope(|| tracing::warn!(error = %e, "Run failed"));
                Err(e)
            }
            Err(_) => {
                cancel.cancel();
                span.in_scope(|| {
                    tracing::warn!(timeout_ms = %timeout.as_millis(), "Run timed out");
                });
                Err(EngineError::Timeout(timeout))
            }
        }
    }

    /// Event loop for one run. Dropping this future aborts any
    /// invocation tasks still in flight.
    async fn drive(
        &self,
        mut ctx: WorkflowContext,
        query: String,
        cancel: &CancellationToken,
        verbose: bool,
    ) -> Result<RunOutput, EngineError> {
        let env = ChatEnv {
            llm: self.llm.as_ref(),
            tools: &self.definitions,
            system: self.config.system_prompt.as_deref(),
            verbose,
        };
        let mut queue = VecDeque::from([Event::Start { query }]);
        let mut in_flight: JoinSet<Event> = JoinSet::new();

        loop {
            let event = match queue.pop_front() {
                Some(event) => event,
                None => match in_flight.join_next().await {
                    Some(Ok(event)) => event,
                    Some(Err(e)) => {
                        return Err(EngineError::Protocol(format!("Invocation task failed: {e}")))
                    }
                    None => return Err(EngineError::Stalled),
                },
            };

            let kind = event.kind();
            if verbose {
                tracing::info!(event = ?kind, "Routing event");
            } else {
                tracing::trace!(event = ?kind, "Routing event");
            }

            let emitted = match self.routes.route(kind) {
                Route::Terminal => {
                    let Event::Stopped { result } = event else {
                        return Err(EngineError::Protocol(format!("{kind:?} routed as terminal")));
                    };
                    let rounds = ctx.counters().rounds;
                    return Ok(RunOutput {
                        answer: result,
                        transcript: ctx.into_transcript(),
                        rounds,
                    });
                }
                Route::Step(StepKind::Chat) => steps::converse(&mut ctx, event, &env).await?,
                Route::Step(StepKind::Dispatch) => {
                    if ctx.counters().rounds >= self.config.max_rounds {
                        return Err(EngineError::MaxRoundsExceeded(self.config.max_rounds));
                    }
                    steps::dispatch(&mut ctx, event)?
                }
                Route::Step(StepKind::Invoke) => {
                    let Event::CallRequested { call } = event else {
                        return Err(EngineError::Protocol(format!("{kind:?} routed to invoke")));
                    };
                    in_flight.spawn(
                        steps::invoke(self.tools.clone(), call, cancel.child_token(), verbose)
                            .in_current_span(),
                    );
                    Vec::new()
                }
                Route::Step(StepKind::Gather) => steps::gather(&mut ctx, event)?,
            };
            queue.extend(emitted);
        }
    }
}

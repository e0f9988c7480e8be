//! Agent-routing workflow
//!
//! A question enters as `Start`; the chat step asks the model what to
//! do, dispatch fans tool calls out, invocations run concurrently, and
//! gather holds results behind a barrier until the round is complete.
//! The loop ends when the model answers without requesting tools.

mod context;
mod engine;
mod error;
pub mod event;
pub mod routes;
mod steps;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

pub use context::{Counters, WorkflowContext};
pub use engine::{RouterWorkflow, RunOptions, RunOutput, WorkflowConfig};
pub use error::{BuildError, EngineError};
pub use event::{Event, EventKind};
pub use routes::{Route, RouteTable, RouteTableError, StepKind};

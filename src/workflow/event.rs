//! Events passed between workflow steps

use crate::llm::{ChatMessage, ToolCall};

/// Events routed by the engine.
///
/// Each event is consumed by exactly one step and carries everything
/// that step needs; shared state lives in the run's context.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A run begins with the user's query
    Start { query: String },
    /// The transcript was extended and the model should reason again
    InputReady,
    /// The model asked for one or more tool calls
    CallsGathered { calls: Vec<ToolCall> },
    /// One tool call to execute
    CallRequested { call: ToolCall },
    /// A tool call finished (successfully or not)
    CallCompleted { message: ChatMessage },
    /// Terminal: the run's answer
    Stopped { result: String },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Start { .. } => EventKind::Start,
            Event::InputReady => EventKind::InputReady,
            Event::CallsGathered { .. } => EventKind::CallsGathered,
            Event::CallRequested { .. } => EventKind::CallRequested,
            Event::CallCompleted { .. } => EventKind::CallCompleted,
            Event::Stopped { .. } => EventKind::Stopped,
        }
    }
}

/// Payload-free tag of an [`Event`], used as the routing key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    InputReady,
    CallsGathered,
    CallRequested,
    CallCompleted,
    Stopped,
}

impl EventKind {
    pub const COUNT: usize = 6;

    pub const ALL: [EventKind; Self::COUNT] = [
        EventKind::Start,
        EventKind::InputReady,
        EventKind::CallsGathered,
        EventKind::CallRequested,
        EventKind::CallCompleted,
        EventKind::Stopped,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            EventKind::Start => 0,
            EventKind::InputReady => 1,
            EventKind::CallsGathered => 2,
            EventKind::CallRequested => 3,
            EventKind::CallCompleted => 4,
            EventKind::Stopped => 5,
        }
    }
}

//! Per-run mutable state

use crate::llm::ChatMessage;

/// Small counters bag for the active round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Results the armed barrier waits for; `None` when no round is open
    pub expected_results: Option<usize>,
    /// Results received so far in the open round
    pub received_results: usize,
    /// Rounds dispatched during this run
    pub rounds: usize,
}

/// State owned by exactly one run.
///
/// Only the engine's step handlers mutate it, one at a time. Tool
/// results wait in `pending` until the barrier releases them, so the
/// transcript only ever grows by whole rounds.
#[derive(Debug)]
pub struct WorkflowContext {
    run_id: String,
    transcript: Vec<ChatMessage>,
    counters: Counters,
    pending: Vec<ChatMessage>,
}

impl WorkflowContext {
    pub fn new(run_id: impl Into<String>, history: Vec<ChatMessage>) -> Self {
        Self {
            run_id: run_id.into(),
            transcript: history,
            counters: Counters::default(),
            pending: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn pending_results(&self) -> usize {
        self.pending.len()
    }

    pub fn into_transcript(self) -> Vec<ChatMessage> {
        self.transcript
    }

    pub(super) fn append(&mut self, message: ChatMessage) {
        self.transcript.push(message);
    }

    pub(super) fn barrier_armed(&self) -> bool {
        self.counters.expected_results.is_some()
    }

    /// Open a round expecting `expected` results
    pub(super) fn arm_barrier(&mut self, expected: usize) {
        self.counters.expected_results = Some(expected);
        self.counters.received_results = 0;
        self.counters.rounds += 1;
        self.pending.clear();
    }

    /// Buffer one result; returns how many have arrived this round
    pub(super) fn record_result(&mut self, message: ChatMessage) -> usize {
        self.pending.push(message);
        self.counters.received_results += 1;
        self.counters.received_results
    }

    /// Close the round: move buffered results into the transcript in arrival order
    pub(super) fn release_barrier(&mut self) -> usize {
        let released = self.pending.len();
        self.transcript.append(&mut self.pending);
        self.counters.expected_results = None;
        self.counters.received_results = 0;
        released
    }
}

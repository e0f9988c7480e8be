//! Property-based tests for the dispatch/gather barrier
//!
//! For any round size and any arrival order, the gather step emits
//! nothing until the last result, then exactly one `InputReady` with all
//! results appended in arrival order.

use super::context::WorkflowContext;
use super::event::Event;
use super::steps::{dispatch, gather};
use crate::llm::{ChatMessage, ToolCall};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Generators
// ============================================================================

/// A round size together with a permutation of its call indices
fn arb_round() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (1usize..12).prop_flat_map(|n| (Just(n), Just((0..n).collect::<Vec<_>>()).prop_shuffle()))
}

fn arb_history() -> impl Strategy<Value = Vec<ChatMessage>> {
    proptest::collection::vec("[a-z ]{1,20}".prop_map(ChatMessage::user), 0..4)
}

fn result_for(idx: usize) -> Event {
    Event::CallCompleted {
        message: ChatMessage::tool(format!("call-{idx}"), "t", format!("output {idx}")),
    }
}

fn armed_context(history: Vec<ChatMessage>, n: usize) -> WorkflowContext {
    let mut ctx = WorkflowContext::new("prop", history);
    let calls = (0..n)
        .map(|i| ToolCall::new(format!("call-{i}"), "t", json!({"input": "x"})))
        .collect();
    let requested = dispatch(&mut ctx, Event::CallsGathered { calls }).unwrap();
    assert_eq!(requested.len(), n);
    ctx
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // The barrier releases exactly once, after the Nth result
    #[test]
    fn prop_gather_releases_once_after_all_results(
        (n, order) in arb_round(),
        history in arb_history()
    ) {
        let prefix = history.len();
        let mut ctx = armed_context(history, n);

        for (k, &idx) in order.iter().enumerate() {
            let emitted = gather(&mut ctx, result_for(idx)).unwrap();
            if k + 1 < n {
                prop_assert!(emitted.is_empty());
                prop_assert_eq!(ctx.transcript().len(), prefix);
                prop_assert_eq!(ctx.pending_results(), k + 1);
            } else {
                prop_assert_eq!(emitted, vec![Event::InputReady]);
            }
        }

        prop_assert_eq!(ctx.transcript().len(), prefix + n);
        prop_assert_eq!(ctx.counters().expected_results, None);
        prop_assert_eq!(ctx.pending_results(), 0);

        let arrived: Vec<String> = ctx.transcript()[prefix..]
            .iter()
            .filter_map(|m| m.call_id.clone())
            .collect();
        let expected: Vec<String> = order.iter().map(|i| format!("call-{i}")).collect();
        prop_assert_eq!(arrived, expected);
    }

    // A result after release is rejected rather than silently appended
    #[test]
    fn prop_late_result_is_protocol_error((n, order) in arb_round()) {
        let mut ctx = armed_context(Vec::new(), n);
        for &idx in &order {
            gather(&mut ctx, result_for(idx)).unwrap();
        }
        prop_assert!(gather(&mut ctx, result_for(0)).is_err());
        prop_assert_eq!(ctx.transcript().len(), n);
    }

    // Consecutive rounds each wait for their own count
    #[test]
    fn prop_rounds_are_independent(sizes in proptest::collection::vec(1usize..6, 1..5)) {
        let mut ctx = WorkflowContext::new("prop", Vec::new());
        let mut total = 0;
        for (round, &n) in sizes.iter().enumerate() {
            let calls = (0..n)
                .map(|i| ToolCall::new(format!("r{round}-{i}"), "t", json!({})))
                .collect();
            dispatch(&mut ctx, Event::CallsGathered { calls }).unwrap();
            prop_assert_eq!(ctx.counters().expected_results, Some(n));
            for i in 0..n {
                let emitted = gather(&mut ctx, result_for(i)).unwrap();
                prop_assert_eq!(emitted.is_empty(), i + 1 < n);
            }
            total += n;
            prop_assert_eq!(ctx.transcript().len(), total);
        }
        prop_assert_eq!(ctx.counters().rounds, sizes.len());
    }
}

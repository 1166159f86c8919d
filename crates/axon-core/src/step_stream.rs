// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0

//! The ordered event sequence one action step produces. A caller observing
//! `step_stream` sees every tool call as it's dispatched and every output as
//! it completes, with exactly one [`StepEvent::ActionOutput`] as the last
//! event of the step — the same shape whether the step is a single
//! `final_answer` call or several ordinary tool calls followed by one.

use serde_json::Value;

use crate::memory::ToolCallRecord;

/// One event produced while executing a single action step.
#[derive(Debug, Clone)]
pub enum StepEvent {
    /// A tool call has been dispatched (arguments parsed and validated).
    ToolCall { id: String, name: String, arguments: Value },
    /// A tool call has completed.
    ToolOutput { id: String, observation: String, is_error: bool },
    /// The step's output value, and whether it ends the run. Always the
    /// last event; exactly one per step.
    ActionOutput { output: Option<Value>, is_final_answer: bool },
}

/// Build the canonical event sequence for a completed set of tool calls:
/// a `ToolCall`/`ToolOutput` pair per call in dispatch order, followed by a
/// single terminal `ActionOutput`.
pub fn events_for_step(calls: &[ToolCallRecord], output: Option<Value>, is_final_answer: bool) -> Vec<StepEvent> {
    let mut events = Vec::with_capacity(calls.len() * 2 + 1);
    for call in calls {
        events.push(StepEvent::ToolCall { id: call.id.clone(), name: call.name.clone(), arguments: call.arguments.clone() });
        events.push(StepEvent::ToolOutput {
            id: call.id.clone(),
            observation: call.result.clone().unwrap_or_default(),
            is_error: call.is_error,
        });
    }
    events.push(StepEvent::ActionOutput { output, is_final_answer });
    events
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0

//! Reduces a [`ResponseStream`] of incremental [`ResponseEvent`]s into a
//! single assistant [`Message`] plus the turn's [`Usage`].
//!
//! This is the non-streaming half of the same reconciliation the streaming
//! consumer performs event-by-event: tool calls are bucketed by the
//! provider-assigned `index`, `id`/`name` are taken on first sighting, and
//! `arguments` fragments are concatenated in arrival order. Callers that
//! want to observe deltas as they arrive should consume the stream
//! directly instead of going through this helper.

use std::collections::HashMap;

use futures::StreamExt;

use crate::provider::ResponseStream;
use crate::types::{FunctionCall, Message, MessageContent, ResponseEvent, Usage};

#[derive(Default)]
struct PendingToolCall {
    id: String,
    name: String,
    args_buf: String,
}

/// A turn reduced from a [`ResponseStream`]: any text content the model
/// produced alongside zero or more ordered, fully-reassembled tool calls,
/// plus the turn's summed usage. Unlike [`agglomerate`], nothing here is
/// discarded — a turn that mixes prose with several tool calls keeps both,
/// which is what the multi-step driver needs to build the next memory step.
pub struct AgglomeratedTurn {
    pub text: String,
    pub tool_calls: Vec<FunctionCall>,
    pub tool_call_ids: Vec<String>,
    pub usage: Usage,
}

/// Drains `stream`, bucketing tool-call deltas by their provider-assigned
/// `index`. `id` is taken on first sighting (a call keeps the id its first
/// delta carried); `name` and `arguments` fragments are both concatenated in
/// arrival order, since providers may split a function name across chunks
/// the same way they split its arguments. Returns tool calls ordered by
/// index, not arrival order, so a provider that streams index 1 before index
/// 0 still reconstructs in declaration order.
pub async fn agglomerate_turn(mut stream: ResponseStream) -> anyhow::Result<AgglomeratedTurn> {
    let mut text = String::new();
    let mut pending_tcs: HashMap<u32, PendingToolCall> = HashMap::new();
    let mut usage = Usage::default();

    while let Some(event) = stream.next().await {
        match event? {
            ResponseEvent::TextDelta(delta) => text.push_str(&delta),
            ResponseEvent::ToolCall { index, id, name, arguments } => {
                let ptc = pending_tcs.entry(index).or_default();
                if ptc.id.is_empty() {
                    ptc.id = id;
                }
                ptc.name.push_str(&name);
                ptc.args_buf.push_str(&arguments);
            }
            ResponseEvent::Usage { input_tokens, output_tokens, cache_read_tokens, cache_write_tokens } => {
                usage.input_tokens += input_tokens;
                usage.output_tokens += output_tokens;
                usage.cache_read_tokens += cache_read_tokens;
                usage.cache_write_tokens += cache_write_tokens;
            }
            ResponseEvent::ThinkingDelta(_) | ResponseEvent::MaxTokens => {}
            ResponseEvent::Done => break,
            ResponseEvent::Error(e) => return Err(anyhow::anyhow!(e)),
        }
    }

    let mut indices: Vec<u32> = pending_tcs.keys().copied().collect();
    indices.sort_unstable();

    let mut tool_calls = Vec::with_capacity(indices.len());
    let mut tool_call_ids = Vec::with_capacity(indices.len());
    for idx in indices {
        let ptc = pending_tcs.remove(&idx).expect("index came from the same map");
        tool_call_ids.push(ptc.id);
        tool_calls.push(FunctionCall { name: ptc.name, arguments: ptc.args_buf });
    }

    Ok(AgglomeratedTurn { text, tool_calls, tool_call_ids, usage })
}

/// Drains `stream` and reduces it to the assistant's final message plus
/// usage, for callers (tests, one-shot scripts) that only want the end
/// result of a turn and don't need per-call fidelity. If the model emitted
/// one or more tool calls, the returned message carries the *first*
/// completed call as its content; callers that need every call in a turn
/// should use [`agglomerate_turn`] instead.
pub async fn agglomerate(stream: ResponseStream) -> anyhow::Result<(Message, Usage)> {
    let mut turn = agglomerate_turn(stream).await?;

    if turn.tool_calls.is_empty() {
        return Ok((Message::assistant(turn.text), turn.usage));
    }

    let function = turn.tool_calls.remove(0);
    let tool_call_id = turn.tool_call_ids.remove(0);
    let message = Message {
        role: crate::types::Role::Assistant,
        content: MessageContent::ToolCall { tool_call_id, function },
    };
    Ok((message, turn.usage))
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT

//! The tool-calling agent: each step sends the conversation plus the tool
//! registry's schemas to the model, dispatches whatever calls come back
//! through native tool-calling, and falls back to a textual
//! `{"name":...,"arguments":{...}}` protocol for providers that don't
//! stream structured tool calls.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use axon_model::{agglomerate_turn, CompletionRequest, ModelProvider, ToolSchema as ModelToolSchema};
use axon_tools::{ToolCall, ToolRegistry};

use crate::driver::StepAgent;
use crate::error::AgentError;
use crate::memory::{ActionStep, Memory, ToolCallRecord};

pub struct ToolCallingAgent {
    model: Box<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
    planning_prompt: Option<String>,
    dynamic_suffix: Option<String>,
    max_tool_threads: usize,
}

impl ToolCallingAgent {
    pub fn new(model: Box<dyn ModelProvider>, tools: Arc<ToolRegistry>) -> Self {
        let system_prompt = crate::prompts::tool_calling_system_prompt(&tools);
        Self { model, tools, system_prompt, planning_prompt: None, dynamic_suffix: None, max_tool_threads: 1 }
    }

    pub fn with_planning_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.planning_prompt = Some(prompt.into());
        self
    }

    /// When `> 1`, tool calls within one step are dispatched onto a bounded
    /// pool of spawned tasks and joined before the step yields, instead of
    /// running one after another. Results are always merged back in call
    /// order regardless of completion order.
    pub fn with_max_tool_threads(mut self, n: usize) -> Self {
        self.max_tool_threads = n.max(1);
        self
    }

    /// Appends project/git/CI notes (or any other caller-detected context)
    /// after the system prompt on every request, via
    /// [`axon_model::CompletionRequest::system_dynamic_suffix`].
    pub fn with_dynamic_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.dynamic_suffix = Some(suffix.into());
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[async_trait]
impl StepAgent for ToolCallingAgent {
    async fn step(&self, memory: &Memory, step_number: u32) -> Result<ActionStep, AgentError> {
        let started = Instant::now();
        let messages = memory.to_messages();
        let model_schemas: Vec<ModelToolSchema> = self
            .tools
            .schemas()
            .into_iter()
            .map(|s| ModelToolSchema { name: s.name, description: s.description, parameters: s.parameters })
            .collect();

        let req = CompletionRequest {
            messages,
            tools: model_schemas,
            stream: true,
            system_dynamic_suffix: self.dynamic_suffix.clone(),
        };
        let stream = self.model.generate_stream(req).await.map_err(|e| AgentError::Generation(e.to_string()))?;
        let turn = agglomerate_turn(stream).await.map_err(|e| AgentError::Generation(e.to_string()))?;

        let mut calls: Vec<(String, String, Value)> = Vec::new();
        if !turn.tool_calls.is_empty() {
            for (id, call) in turn.tool_call_ids.iter().zip(turn.tool_calls.iter()) {
                let args: Value = serde_json::from_str(&call.arguments)
                    .map_err(|e| AgentError::Parsing(format!("malformed arguments for '{}': {e}", call.name)))?;
                calls.push((id.clone(), call.name.clone(), args));
            }
        } else if let Some(fallback) = parse_fallback_tool_call(&turn.text) {
            calls.push(fallback);
        }

        if calls.is_empty() {
            return Err(AgentError::Parsing(
                "model produced neither a tool call nor a final_answer call".into(),
            ));
        }

        let has_final_answer = calls.iter().any(|(_, name, _)| name == "final_answer");
        if has_final_answer && calls.len() > 1 {
            return Err(AgentError::Execution(
                "final_answer must be the only tool call in its step".into(),
            ));
        }

        let outputs = self.dispatch_calls(&calls).await;

        let mut records = Vec::with_capacity(calls.len());
        let mut observation_lines = Vec::with_capacity(calls.len());
        let mut final_output = None;

        for ((id, name, args), output) in calls.into_iter().zip(outputs.into_iter()) {
            observation_lines.push(format!("{name} -> {}", output.content));
            if name == "final_answer" {
                final_output = Some(args.get("answer").cloned().unwrap_or(Value::String(output.content.clone())));
            }
            records.push(ToolCallRecord { id, name, arguments: args, result: Some(output.content), is_error: output.is_error });
        }

        Ok(ActionStep {
            step_number,
            model_output_text: if turn.text.is_empty() { None } else { Some(turn.text) },
            tool_calls: records,
            observations: Some(observation_lines.join("\n")),
            error: None,
            is_final_answer: has_final_answer,
            final_output,
            usage: Some(turn.usage),
            duration: Some(started.elapsed()),
        })
    }

    fn planning_prompt(&self) -> Option<&str> {
        self.planning_prompt.as_deref()
    }

    fn model(&self) -> &dyn ModelProvider {
        self.model.as_ref()
    }
}

impl ToolCallingAgent {
    /// Runs `calls` sequentially when `max_tool_threads <= 1`, or fanned out
    /// onto spawned tasks (one per call, joined before returning) otherwise.
    /// Either way the returned outputs line up with `calls` by position, not
    /// by completion time — the ordering invariant is by call id, not race.
    async fn dispatch_calls(&self, calls: &[(String, String, Value)]) -> Vec<axon_tools::ToolOutput> {
        if self.max_tool_threads <= 1 || calls.len() <= 1 {
            let mut outputs = Vec::with_capacity(calls.len());
            for (id, name, args) in calls {
                let call = ToolCall { id: id.clone(), name: name.clone(), args: args.clone() };
                outputs.push(self.tools.execute(&call).await);
            }
            return outputs;
        }

        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.max_tool_threads));
        let mut handles = Vec::with_capacity(calls.len());
        for (id, name, args) in calls {
            let tools = self.tools.clone();
            let permit = semaphore.clone();
            let call = ToolCall { id: id.clone(), name: name.clone(), args: args.clone() };
            handles.push(tokio::spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore never closed");
                tools.execute(&call).await
            }));
        }

        let mut outputs = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(output) => outputs.push(output),
                Err(e) => outputs.push(axon_tools::ToolOutput::err("unknown", format!("tool task panicked: {e}"))),
            }
        }
        outputs
    }
}

/// Fallback protocol for providers without native tool-calling: a JSON
/// object `{"name": "...", "arguments": {...}}` embedded anywhere in the
/// model's text response.
fn parse_fallback_tool_call(text: &str) -> Option<(String, String, Value)> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let candidate = &text[start..=end];
    let value: Value = serde_json::from_str(candidate).ok()?;
    let name = value.get("name")?.as_str()?.to_string();
    let args = value.get("arguments").cloned().unwrap_or_else(|| Value::Object(Default::default()));
    Some((format!("fallback-{name}"), name, args))
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT

//! The code agent: each step asks the model for one snippet of sandboxed
//! code, executes it, and treats a call to the sandbox's reserved
//! `final_answer` function as the run's terminal output.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use axon_exec::{extract_code, format_observation, CodeTags, ExecutionOutcome, Executor, ExecutorConfig};
use axon_model::{CompletionRequest, ModelProvider};
use axon_tools::{ToolCall, ToolRegistry};

use crate::driver::StepAgent;
use crate::error::AgentError;
use crate::memory::{ActionStep, Memory, ToolCallRecord};

const MAX_OBSERVATION_CHARS: usize = 8_000;

pub struct CodeAgent {
    model: Box<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    executor: Executor,
    tags: CodeTags,
    system_prompt: String,
    planning_prompt: Option<String>,
    dynamic_suffix: Option<String>,
}

impl CodeAgent {
    pub fn new(model: Box<dyn ModelProvider>, tools: Arc<ToolRegistry>, config: ExecutorConfig) -> Self {
        let mut executor = Executor::new(config);
        for name in tools.names() {
            if name == "final_answer" {
                // `final_answer` is a sandbox primitive, not a registered callable.
                continue;
            }
            let tools = tools.clone();
            let tool_name = name.clone();
            executor.register_tool(
                name,
                Arc::new(move |args: Value| {
                    let call = ToolCall { id: format!("code-{tool_name}"), name: tool_name.clone(), args };
                    let tools = tools.clone();
                    let output = tokio::task::block_in_place(|| {
                        tokio::runtime::Handle::current().block_on(tools.execute(&call))
                    });
                    if output.is_error {
                        Err(output.content)
                    } else {
                        Ok(Value::String(output.content))
                    }
                }),
            );
        }

        let system_prompt = crate::prompts::code_agent_system_prompt(&tools);
        Self {
            model,
            tools,
            executor,
            tags: CodeTags::sentinel(),
            system_prompt,
            planning_prompt: None,
            dynamic_suffix: None,
        }
    }

    pub fn with_planning_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.planning_prompt = Some(prompt.into());
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
impl StepAgent for CodeAgent {
    async fn step(&self, memory: &Memory, step_number: u32) -> Result<ActionStep, AgentError> {
        let started = Instant::now();
        let messages = memory.to_messages();
        let req = CompletionRequest {
            messages,
            tools: vec![],
            stream: true,
            system_dynamic_suffix: self.dynamic_suffix.clone(),
        };
        let (message, usage) = self.model.generate(req).await.map_err(|e| AgentError::Generation(e.to_string()))?;
        let raw_text = message.as_text().unwrap_or_default().to_string();

        let code = extract_code(&raw_text, &self.tags)?;
        let outcome: ExecutionOutcome = self.executor.call(&code)?;

        let record = ToolCallRecord {
            id: format!("step-{step_number}"),
            name: "code".into(),
            arguments: Value::String(code),
            result: Some(format_observation(&outcome, MAX_OBSERVATION_CHARS)),
            is_error: false,
        };
        let observations = record.result.clone();

        Ok(ActionStep {
            step_number,
            model_output_text: Some(raw_text),
            tool_calls: vec![record],
            observations,
            error: None,
            is_final_answer: outcome.is_final_answer,
            final_output: if outcome.is_final_answer { outcome.output.clone() } else { None },
            usage: Some(usage),
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

#[cfg(test)]
mod tests {
    use super::*;
    use axon_model::ScriptedMockProvider;
    use axon_tools::FinalAnswerTool;

    fn registry() -> Arc<ToolRegistry> {
        let mut reg = ToolRegistry::new();
        reg.register(FinalAnswerTool);
        Arc::new(reg)
    }

    #[tokio::test]
    async fn step_executes_code_and_returns_final_answer() {
        let model = ScriptedMockProvider::always_text("<code>\nfinal_answer(2 + 2)\n</code>");
        let agent = CodeAgent::new(Box::new(model), registry(), ExecutorConfig::default());
        let memory = Memory::new();
        let step = agent.step(&memory, 1).await.unwrap();
        assert!(step.is_final_answer);
        assert_eq!(step.final_output, Some(Value::from(4)));
    }

    #[tokio::test]
    async fn step_without_final_answer_keeps_run_open() {
        let model = ScriptedMockProvider::always_text("<code>\nlet x = 1 + 1;\nx\n</code>");
        let agent = CodeAgent::new(Box::new(model), registry(), ExecutorConfig::default());
        let memory = Memory::new();
        let step = agent.step(&memory, 1).await.unwrap();
        assert!(!step.is_final_answer);
        assert!(step.observations.unwrap().contains('2'));
    }

    #[tokio::test]
    async fn malformed_snippet_is_a_parsing_error() {
        let model = ScriptedMockProvider::always_text("I'm not sure, maybe 4?");
        let agent = CodeAgent::new(Box::new(model), registry(), ExecutorConfig::default());
        let memory = Memory::new();
        let err = agent.step(&memory, 1).await.unwrap_err();
        assert!(matches!(err, AgentError::Parsing(_)));
    }
}

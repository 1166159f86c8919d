// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! TaskTool — spawns a managed sub-agent to complete a focused sub-task.
//!
//! Lives in `axon-bootstrap` rather than `axon-core` so it can depend on
//! `build_tool_registry` without a circular dependency (`axon-core` stays
//! ignorant of `axon-tools`'s concrete built-ins; `axon-bootstrap` depends
//! on both).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use axon_config::{Config, ModelConfig};
use axon_core::Driver;
use axon_tools::{
    policy::ApprovalPolicy,
    tool::{Tool, ToolCall, ToolOutput},
};

use crate::context::{RuntimeContext, ToolSetProfile};
use crate::registry::build_tool_registry;

const MAX_DEPTH: usize = 3;

/// Spawns a sub-agent to complete a focused task and returns its final
/// answer as plain text. A fresh [`axon_model::ModelProvider`] is
/// constructed per call from `model_cfg` rather than sharing one instance,
/// since the trait isn't `Clone` and each sub-agent owns its own driver.
pub struct TaskTool {
    model_cfg: ModelConfig,
    config: Arc<Config>,
    depth: Arc<AtomicUsize>,
    /// Runtime context passed to each sub-agent (project root, CI/git notes,
    /// AGENTS.md content) so it knows where to operate.
    runtime: RuntimeContext,
}

impl TaskTool {
    pub fn new(model_cfg: ModelConfig, config: Arc<Config>, depth: Arc<AtomicUsize>, runtime: RuntimeContext) -> Self {
        Self { model_cfg, config, depth, runtime }
    }
}

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> &str {
        "task"
    }

    fn description(&self) -> &str {
        "Spawn a sub-agent to complete a focused task and return its final text output. \
         Useful for delegating isolated sub-tasks. The sub-agent has access to all standard \
         tools except `task` itself. Maximum nesting depth is 3."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The task description for the sub-agent"
                }
            },
            "required": ["prompt"],
            "additionalProperties": false
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let prompt = match call.args.get("prompt").and_then(|v| v.as_str()) {
            Some(p) => p.to_string(),
            None => return ToolOutput::err(&call.id, "missing 'prompt'"),
        };

        let current_depth = self.depth.load(Ordering::Relaxed);
        if current_depth >= MAX_DEPTH {
            return ToolOutput::err(&call.id, format!("maximum sub-agent depth ({MAX_DEPTH}) reached"));
        }

        let model = match axon_model::from_config(&self.model_cfg) {
            Ok(m) => m,
            Err(e) => return ToolOutput::err(&call.id, format!("building sub-agent model: {e}")),
        };

        let tools = Arc::new(build_tool_registry(
            &self.config,
            self.model_cfg.clone(),
            ToolSetProfile::SubAgent,
            self.runtime.clone(),
            None,
        ));

        self.depth.fetch_add(1, Ordering::Relaxed);
        debug!(prompt = %prompt, depth = current_depth + 1, "task: spawning sub-agent");

        let mut agent = axon_core::ToolCallingAgent::new(model, tools)
            .with_max_tool_threads(self.config.agent.max_tool_threads);
        if let Some(suffix) = self.runtime.to_prompt_section() {
            agent = agent.with_dynamic_suffix(suffix);
        }
        let driver = Driver::new(agent, self.config.agent.clone());
        let result = driver.run(prompt).await;

        self.depth.fetch_sub(1, Ordering::Relaxed);

        match result.state {
            axon_core::RunState::Success | axon_core::RunState::MaxStepsError => {
                let text = match result.output {
                    Some(Value::String(s)) => s,
                    Some(v) => v.to_string(),
                    None => "(sub-agent produced no output)".to_string(),
                };
                ToolOutput::ok(&call.id, text)
            }
            axon_core::RunState::GenerationError => {
                ToolOutput::err(&call.id, "sub-agent model generation failed")
            }
            axon_core::RunState::Interrupted => ToolOutput::err(&call.id, "sub-agent run was interrupted"),
        }
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use axon_exec::{Executor, ExecutorConfig};

use crate::policy::ApprovalPolicy;
use crate::tool::{Tool, ToolCall, ToolOutput};

/// Exposes the restricted evaluator to a tool-calling agent as an ordinary
/// tool, distinct from the code agent's own embedded sandbox (which a code
/// agent drives directly through the driver, never through this tool).
/// Each call gets a fresh `Executor` with no injected tool callables or
/// carried-over state; it is a scratch calculator, not a way for the model
/// to reach the rest of the tool registry.
pub struct CodeInterpreterTool {
    config: ExecutorConfig,
}

impl CodeInterpreterTool {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }
}

impl Default for CodeInterpreterTool {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

#[async_trait]
impl Tool for CodeInterpreterTool {
    fn name(&self) -> &str {
        "code_interpreter"
    }

    fn description(&self) -> &str {
        "Execute a snippet of sandboxed script code and return its logs and final value. \
         No filesystem, process, or network access is available unless explicitly authorized."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "The code to execute"
                }
            },
            "required": ["code"]
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Ask
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let code = match call.args.get("code").and_then(|v| v.as_str()) {
            Some(c) => c.to_string(),
            None => return ToolOutput::err(&call.id, "missing required parameter 'code'"),
        };

        debug!(len = code.len(), "code_interpreter tool");

        let executor = Executor::new(self.config.clone());
        match executor.call(&code) {
            Ok(outcome) => {
                let text = axon_exec::format_observation(&outcome, self.config.max_print_outputs_length);
                ToolOutput::ok(&call.id, text)
            }
            Err(e) => ToolOutput::err(&call.id, format!("{e}")),
        }
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::policy::ApprovalPolicy;
use crate::tool::{Tool, ToolCall, ToolOutput};

/// The reserved sentinel tool that terminates an action step with a value.
///
/// The driver recognizes calls to this tool by name and short-circuits the
/// rest of the step: it is never dispatched concurrently with other tool
/// calls (a step carrying both `final_answer` and another call is a fatal
/// `ExecutionError`, enforced by the tool-calling agent, not here). This
/// tool's own `execute` only needs to echo the answer back as the
/// observation text for the `sanitize_io` / output-wrapping path.
pub struct FinalAnswerTool;

#[async_trait]
impl Tool for FinalAnswerTool {
    fn name(&self) -> &str {
        "final_answer"
    }

    fn description(&self) -> &str {
        "Provide the final answer to the task. Call this exactly once, as the only tool \
         call in its step, when you are done."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "answer": {
                    "description": "The final answer to the task. Any JSON type is accepted."
                }
            },
            "required": ["answer"]
        })
    }

    fn default_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::Auto
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let answer = call.args.get("answer").cloned().unwrap_or(Value::Null);
        let text = match &answer {
            Value::String(s) => s.clone(),
            other => serde_json::to_string(other).unwrap_or_else(|_| "null".to_string()),
        };
        ToolOutput::ok(&call.id, text)
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0

//! The error taxonomy a running agent can produce.
//!
//! Most variants are *recoverable*: the driver records them on the current
//! [`crate::memory::ActionStep`]'s `error` field and the loop continues,
//! giving the model a chance to correct itself on the next turn. Only
//! [`AgentError::Generation`] (after retry exhaustion) and
//! [`AgentError::Interrupted`] are fatal and end the run immediately.
//! [`AgentError::MaxSteps`] is terminal but not fatal — it ends the run
//! with a synthesized final-answer step rather than propagating as `Err`.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum AgentError {
    /// The model's output couldn't be parsed into the shape this agent
    /// expects (malformed tool-call JSON, missing code fence, ...).
    #[error("parsing error: {0}")]
    Parsing(String),

    /// A tool call's arguments failed schema validation.
    #[error("tool call error: {0}")]
    ToolCall(String),

    /// A tool's own execution failed (the tool ran but returned an error).
    #[error("tool execution error: {0}")]
    ToolExec(String),

    /// The step violated an agent-level invariant (e.g. `final_answer`
    /// called alongside another tool in the same step).
    #[error("execution error: {0}")]
    Execution(String),

    /// The model provider failed to produce a response after exhausting
    /// its retry budget. Fatal.
    #[error("generation error: {0}")]
    Generation(String),

    /// The run reached its step budget without a final answer. Terminal:
    /// the driver synthesizes a final-answer step instead of propagating
    /// this as an error.
    #[error("maximum steps exceeded")]
    MaxSteps,

    /// The code agent's sandbox raised an error evaluating a step's code.
    #[error("interpreter error: {0}")]
    Interpreter(String),

    /// The run was interrupted (cancellation requested externally). Fatal.
    #[error("agent interrupted")]
    Interrupted,
}

impl AgentError {
    /// Fatal errors end the run immediately; everything else is recorded on
    /// the current step and the loop continues.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AgentError::Generation(_) | AgentError::Interrupted)
    }
}

impl From<axon_tools::ToolCallError> for AgentError {
    fn from(e: axon_tools::ToolCallError) -> Self {
        AgentError::ToolCall(e.to_string())
    }
}

impl From<axon_exec::InterpreterError> for AgentError {
    fn from(e: axon_exec::InterpreterError) -> Self {
        AgentError::Interpreter(e.to_string())
    }
}

impl From<axon_exec::ParseError> for AgentError {
    fn from(e: axon_exec::ParseError) -> Self {
        AgentError::Parsing(e.to_string())
    }
}

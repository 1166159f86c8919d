// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT

//! The agent runtime's core: episodic memory, the error taxonomy, the
//! shared multi-step driver, and the two concrete step strategies
//! (tool-calling and code) built on top of it. Everything else — CLI
//! front-ends, provider clients, concrete tools — depends on this crate
//! through [`Memory`], [`Driver`], and [`StepAgent`] only.

mod callbacks;
mod code_agent;
mod driver;
mod error;
mod memory;
mod prompts;
mod run_result;
mod step_stream;
mod tool_calling_agent;

pub use callbacks::{CallbackRegistry, StepCallback};
pub use code_agent::CodeAgent;
pub use driver::{Driver, StepAgent};
pub use error::AgentError;
pub use memory::{
    ActionStep, FinalAnswerStep, Memory, MemoryStep, PlanningStep, SystemPromptStep, TaskStep,
    ToolCallRecord,
};
pub use prompts::{code_agent_system_prompt, tool_calling_system_prompt};
pub use run_result::{RunResult, RunState, Timing};
pub use step_stream::{events_for_step, StepEvent};
pub use tool_calling_agent::ToolCallingAgent;

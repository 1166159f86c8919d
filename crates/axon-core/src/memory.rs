// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0

//! Episodic memory: the append-only log of everything that happened in a
//! run, and the sole source the model's next prompt is built from. Nothing
//! about a turn exists anywhere else — the driver doesn't keep a separate
//! "conversation so far" string, it asks [`Memory::to_messages`] every time.

use serde_json::Value;

use axon_model::{ContentPart, FunctionCall, Message, MessageContent, Usage};

use crate::error::AgentError;

/// The system prompt a run started with. Always the first step, at most once.
#[derive(Debug, Clone)]
pub struct SystemPromptStep {
    pub system_prompt: String,
}

/// The task the user handed the agent, plus any images attached to it.
#[derive(Debug, Clone)]
pub struct TaskStep {
    pub task: String,
    pub images: Vec<String>,
}

/// A planning step: the model's restated understanding of the task and its
/// intended approach, inserted on the configured cadence.
#[derive(Debug, Clone)]
pub struct PlanningStep {
    pub plan: String,
}

/// One recorded tool invocation within an action step, plus its result once
/// the call has been dispatched.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    pub result: Option<String>,
    pub is_error: bool,
}

/// One iteration of the driver loop: what the model said, which tools it
/// called (and what they returned), and whether this step produced the run's
/// final answer.
#[derive(Debug, Clone, Default)]
pub struct ActionStep {
    pub step_number: u32,
    pub model_output_text: Option<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Combined observation text surfaced back to the model (tool outputs,
    /// or code-execution logs for a code agent).
    pub observations: Option<String>,
    /// Set when this step failed in a recoverable way; the driver still
    /// appends the step and lets the model see the error on its next turn.
    pub error: Option<String>,
    pub is_final_answer: bool,
    /// The value passed to `final_answer`, present only when
    /// `is_final_answer` is true.
    pub final_output: Option<Value>,
    pub usage: Option<Usage>,
    pub duration: Option<std::time::Duration>,
}

/// The run's last step: the value the agent (or the driver's max-steps
/// synthesis) settled on.
#[derive(Debug, Clone)]
pub struct FinalAnswerStep {
    pub answer: Value,
}

/// A single entry in the memory log.
#[derive(Debug, Clone)]
pub enum MemoryStep {
    SystemPrompt(SystemPromptStep),
    Task(TaskStep),
    Planning(PlanningStep),
    Action(ActionStep),
    FinalAnswer(FinalAnswerStep),
}

/// The append-only step log for one run, and the deterministic projection
/// from that log to the message list sent to the model.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    pub steps: Vec<MemoryStep>,
}

impl Memory {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step, enforcing the invariants that make replay and
    /// `to_messages` well-defined:
    /// - `ActionStep.step_number` strictly increases across the log.
    /// - At most one `FinalAnswerStep` per run.
    /// - A `FinalAnswerStep` is always the last step in the log.
    pub fn push(&mut self, step: MemoryStep) -> Result<(), AgentError> {
        if self.final_answer().is_some() {
            return Err(AgentError::Execution(
                "cannot append to memory after a final-answer step".into(),
            ));
        }
        if let MemoryStep::Action(a) = &step {
            if let Some(last) = self.last_action_step_number() {
                if a.step_number <= last {
                    return Err(AgentError::Execution(format!(
                        "action step numbers must strictly increase (last {last}, got {})",
                        a.step_number
                    )));
                }
            }
        }
        self.steps.push(step);
        Ok(())
    }

    pub fn last_action_step_number(&self) -> Option<u32> {
        self.steps.iter().rev().find_map(|s| match s {
            MemoryStep::Action(a) => Some(a.step_number),
            _ => None,
        })
    }

    /// The step number the next action step must use.
    pub fn next_action_step_number(&self) -> u32 {
        self.last_action_step_number().map(|n| n + 1).unwrap_or(1)
    }

    pub fn action_steps(&self) -> impl Iterator<Item = &ActionStep> {
        self.steps.iter().filter_map(|s| match s {
            MemoryStep::Action(a) => Some(a),
            _ => None,
        })
    }

    pub fn final_answer(&self) -> Option<&Value> {
        self.steps.iter().find_map(|s| match s {
            MemoryStep::FinalAnswer(f) => Some(&f.answer),
            _ => None,
        })
    }

    /// Full projection: every step's contribution to the conversation,
    /// including tool-call/tool-result message pairs and recoverable-error
    /// feedback. This is what the model actually sees each turn.
    pub fn to_messages(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        for step in &self.steps {
            match step {
                MemoryStep::SystemPrompt(s) => messages.push(Message::system(s.system_prompt.clone())),
                MemoryStep::Task(t) => messages.push(task_message(t)),
                MemoryStep::Planning(p) => push_planning_messages(&mut messages, p),
                MemoryStep::Action(a) => push_action_messages(&mut messages, a),
                MemoryStep::FinalAnswer(_) => {}
            }
        }
        messages
    }

    /// [`Self::to_messages`] with the leading system message stripped, for
    /// callers that supply their own system prompt around the same history
    /// (the max-steps synthesis call uses a different system prompt than
    /// the one the run started with).
    pub fn to_messages_without_system(&self) -> Vec<Message> {
        self.to_messages()
            .into_iter()
            .filter(|m| m.role != axon_model::Role::System)
            .collect()
    }

    /// A condensed projection for context-budget-constrained callers: tool
    /// call arguments and observations are summarized to their first line
    /// rather than reproduced in full. Model-authored text and errors are
    /// kept verbatim since they carry the reasoning the model needs.
    pub fn succinct_messages(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        for step in &self.steps {
            match step {
                MemoryStep::SystemPrompt(s) => messages.push(Message::system(s.system_prompt.clone())),
                MemoryStep::Task(t) => messages.push(task_message(t)),
                MemoryStep::Planning(p) => push_planning_messages(&mut messages, p),
                MemoryStep::Action(a) => {
                    let mut succinct = a.clone();
                    for call in &mut succinct.tool_calls {
                        call.result = call.result.as_ref().map(|r| first_line(r));
                    }
                    succinct.observations = succinct.observations.as_ref().map(|o| first_line(o));
                    push_action_messages(&mut messages, &succinct);
                }
                MemoryStep::FinalAnswer(_) => {}
            }
        }
        messages
    }

    /// Render the run as a Markdown transcript, for CLI replay / JSONL
    /// export rather than for re-feeding to a model.
    pub fn replay(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            match step {
                MemoryStep::SystemPrompt(s) => {
                    out.push_str(&format!("## System\n\n{}\n\n", s.system_prompt))
                }
                MemoryStep::Task(t) => out.push_str(&format!("## Task\n\n{}\n\n", t.task)),
                MemoryStep::Planning(p) => out.push_str(&format!("## Plan\n\n{}\n\n", p.plan)),
                MemoryStep::Action(a) => {
                    out.push_str(&format!("## Step {}\n\n", a.step_number));
                    if let Some(text) = &a.model_output_text {
                        out.push_str(&format!("{text}\n\n"));
                    }
                    for call in &a.tool_calls {
                        out.push_str(&format!(
                            "- `{}({})` -> {}\n",
                            call.name,
                            call.arguments,
                            call.result.as_deref().unwrap_or("(no result)")
                        ));
                    }
                    if let Some(err) = &a.error {
                        out.push_str(&format!("\n**Error:** {err}\n"));
                    }
                    out.push('\n');
                }
                MemoryStep::FinalAnswer(f) => {
                    out.push_str(&format!("## Final answer\n\n{}\n\n", f.answer))
                }
            }
        }
        out
    }
}

fn first_line(s: &str) -> String {
    s.lines().next().unwrap_or("").to_string()
}

/// Projects a [`TaskStep`] into the user message the model sees: the
/// `"New task:\n"` prefix followed by the task text, plus one content part
/// per attached image.
fn task_message(t: &TaskStep) -> Message {
    if t.images.is_empty() {
        return Message::user(format!("New task:\n{}", t.task));
    }
    let mut parts = vec![ContentPart::Text { text: format!("New task:\n{}", t.task) }];
    parts.extend(t.images.iter().map(|url| ContentPart::Image { image_url: url.clone(), detail: None }));
    Message::user_with_parts(parts)
}

/// Projects a [`PlanningStep`] into the plan itself plus the instruction
/// that tells the model to act on it.
fn push_planning_messages(messages: &mut Vec<Message>, p: &PlanningStep) {
    messages.push(Message::assistant(p.plan.clone()));
    messages.push(Message::user("Now proceed and carry out this plan."));
}

fn push_action_messages(messages: &mut Vec<Message>, a: &ActionStep) {
    if let Some(text) = &a.model_output_text {
        if !text.is_empty() {
            messages.push(Message::assistant(text.clone()));
        }
    }
    for call in &a.tool_calls {
        messages.push(Message {
            role: axon_model::Role::Assistant,
            content: MessageContent::ToolCall {
                tool_call_id: call.id.clone(),
                function: FunctionCall {
                    name: call.name.clone(),
                    arguments: call.arguments.to_string(),
                },
            },
        });
    }
    for call in &a.tool_calls {
        messages.push(Message::tool_result(
            call.id.clone(),
            call.result.clone().unwrap_or_default(),
        ));
    }
    if let Some(err) = &a.error {
        messages.push(Message::user(format!("Error: {err}\nPlease correct your approach and try again.")));
    }
}

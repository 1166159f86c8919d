// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0

//! The multi-step loop shared by every agent strategy. A concrete agent
//! (tool-calling or code) only needs to implement [`StepAgent::step`] —
//! everything about interrupt handling, planning cadence, max-steps
//! synthesis, and usage accounting lives here exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use axon_config::AgentConfig;
use axon_model::{CompletionRequest, ModelProvider, Usage};

use crate::callbacks::CallbackRegistry;
use crate::error::AgentError;
use crate::memory::{ActionStep, FinalAnswerStep, Memory, MemoryStep, PlanningStep};
use crate::run_result::{RunResult, RunState, Timing};

/// Implemented once per agent strategy (tool-calling, code). `step` reads
/// `memory` to build its prompt and returns the single [`ActionStep`] that
/// resulted — it never mutates `memory` itself; the driver owns appending.
#[async_trait]
pub trait StepAgent: Send + Sync {
    async fn step(&self, memory: &Memory, step_number: u32) -> Result<ActionStep, AgentError>;

    /// Prompt used to request a planning step; `None` disables planning
    /// even if `planning_interval` is configured.
    fn planning_prompt(&self) -> Option<&str> {
        None
    }

    fn model(&self) -> &dyn ModelProvider;
}

/// A gate run against a proposed final answer before the driver commits to
/// ending the run: `(value, memory, agent) -> accept?`. A check that returns
/// `false` rejects the answer; the step is then recorded as a recoverable
/// error instead of a terminal one, and the loop continues so the model gets
/// a chance to produce something that passes.
pub type FinalAnswerCheck<A> = Box<dyn Fn(&Value, &Memory, &A) -> bool + Send + Sync>;

/// Drives a [`StepAgent`] through the shared step loop described in the
/// agent runtime's design: interrupt check, optional planning step on
/// cadence, one action step, max-steps synthesis.
pub struct Driver<A: StepAgent> {
    agent: A,
    config: AgentConfig,
    callbacks: CallbackRegistry,
    interrupted: Arc<AtomicBool>,
    final_answer_checks: Vec<FinalAnswerCheck<A>>,
}

impl<A: StepAgent> Driver<A> {
    pub fn new(agent: A, config: AgentConfig) -> Self {
        Self {
            agent,
            config,
            callbacks: CallbackRegistry::new(),
            interrupted: Arc::new(AtomicBool::new(false)),
            final_answer_checks: Vec::new(),
        }
    }

    pub fn with_callbacks(mut self, callbacks: CallbackRegistry) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Registers a gate run against every proposed final answer, in
    /// registration order. A rejected answer turns that step's
    /// `is_final_answer` back off and records a recoverable error instead,
    /// so the run continues rather than ending on an answer the caller
    /// doesn't trust.
    pub fn with_final_answer_check(mut self, check: FinalAnswerCheck<A>) -> Self {
        self.final_answer_checks.push(check);
        self
    }

    /// A cloneable handle that, once set, causes the in-flight (or next)
    /// `run` call to end with [`RunState::Interrupted`] at the next loop
    /// check.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    pub async fn run(&self, task: impl Into<String>) -> RunResult {
        let mut memory = Memory::new();
        self.run_with_memory(task, &mut memory).await
    }

    /// Like [`Self::run`] but against caller-owned memory, so a managed
    /// agent's history (or a replay seeded from a prior run) can be
    /// inspected afterward.
    pub async fn run_with_memory(&self, task: impl Into<String>, memory: &mut Memory) -> RunResult {
        memory
            .push(MemoryStep::Task(crate::memory::TaskStep { task: task.into(), images: vec![] }))
            .expect("fresh task step never violates memory invariants");

        let mut timing = Timing::start();
        let mut total_usage = Usage::default();
        let mut step_number = memory.next_action_step_number();

        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                timing.stop();
                return RunResult {
                    output: None,
                    state: RunState::Interrupted,
                    steps: (step_number - 1) as usize,
                    token_usage: total_usage,
                    duration: timing.elapsed(),
                };
            }

            if self.should_plan(step_number) {
                if let Some(prompt) = self.agent.planning_prompt() {
                    match self.run_planning_step(memory, prompt).await {
                        Ok(plan) => {
                            memory
                                .push(MemoryStep::Planning(PlanningStep { plan }))
                                .expect("planning step never violates memory invariants");
                        }
                        Err(e) if e.is_fatal() => {
                            timing.stop();
                            return RunResult {
                                output: None,
                                state: RunState::GenerationError,
                                steps: (step_number - 1) as usize,
                                token_usage: total_usage,
                                duration: timing.elapsed(),
                            };
                        }
                        Err(_) => {} // recoverable: skip this round's plan
                    }
                }
            }

            match self.agent.step(memory, step_number).await {
                Ok(mut action_step) => {
                    if let Some(usage) = &action_step.usage {
                        total_usage.input_tokens += usage.input_tokens;
                        total_usage.output_tokens += usage.output_tokens;
                        total_usage.cache_read_tokens += usage.cache_read_tokens;
                        total_usage.cache_write_tokens += usage.cache_write_tokens;
                    }

                    if action_step.is_final_answer {
                        let candidate = action_step.final_output.clone().unwrap_or(Value::Null);
                        if let Some(rejection) = self.run_final_answer_checks(&candidate, memory) {
                            action_step.is_final_answer = false;
                            action_step.final_output = None;
                            action_step.error = Some(rejection);
                        }
                    }

                    let is_final = action_step.is_final_answer;
                    let output = action_step.final_output.clone();
                    memory.push(MemoryStep::Action(action_step)).expect("driver-assigned step numbers strictly increase");
                    if let Some(last) = memory.steps.last() {
                        self.callbacks.fire(last);
                    }

                    if is_final {
                        timing.stop();
                        let answer = output.clone().unwrap_or(Value::Null);
                        memory
                            .push(MemoryStep::FinalAnswer(FinalAnswerStep { answer }))
                            .expect("first final-answer step never violates memory invariants");
                        return RunResult {
                            output,
                            state: RunState::Success,
                            steps: step_number as usize,
                            token_usage: total_usage,
                            duration: timing.elapsed(),
                        };
                    }
                }
                Err(e) if e.is_fatal() => {
                    timing.stop();
                    return RunResult {
                        output: None,
                        state: RunState::GenerationError,
                        steps: (step_number - 1) as usize,
                        token_usage: total_usage,
                        duration: timing.elapsed(),
                    };
                }
                Err(e) => {
                    let failed = ActionStep { step_number, error: Some(e.to_string()), ..Default::default() };
                    memory.push(MemoryStep::Action(failed)).expect("driver-assigned step numbers strictly increase");
                    if let Some(last) = memory.steps.last() {
                        self.callbacks.fire(last);
                    }
                }
            }

            step_number += 1;

            if step_number > self.config.max_steps {
                let answer = self.synthesize_max_steps_answer(memory).await;
                timing.stop();
                let synthesized = ActionStep {
                    step_number,
                    error: Some(AgentError::MaxSteps.to_string()),
                    duration: Some(timing.elapsed()),
                    ..Default::default()
                };
                memory
                    .push(MemoryStep::Action(synthesized))
                    .expect("driver-assigned step numbers strictly increase");
                if let Some(last) = memory.steps.last() {
                    self.callbacks.fire(last);
                }
                memory
                    .push(MemoryStep::FinalAnswer(FinalAnswerStep { answer: answer.clone() }))
                    .expect("first final-answer step never violates memory invariants");
                return RunResult {
                    output: Some(answer),
                    state: RunState::MaxStepsError,
                    steps: (step_number - 1) as usize,
                    token_usage: total_usage,
                    duration: timing.elapsed(),
                };
            }
        }
    }

    /// One last model call made after the step budget is exhausted: a
    /// dedicated "pre-messages" system prompt, the run's history with its
    /// original system prompt swapped out, and a "post-messages" user
    /// prompt asking for a best-effort answer. Never fatal — a failure here
    /// still yields a `MaxStepsError` run, just with a synthesized fallback
    /// answer instead of a model-authored one.
    async fn synthesize_max_steps_answer(&self, memory: &Memory) -> Value {
        let mut messages = vec![axon_model::Message::system(crate::prompts::max_steps_pre_message())];
        messages.extend(memory.to_messages_without_system());
        messages.push(axon_model::Message::user(crate::prompts::max_steps_post_message()));

        let req = CompletionRequest { messages, tools: vec![], stream: true, system_dynamic_suffix: None };
        match self.agent.model().generate(req).await {
            Ok((message, _usage)) => {
                let text = message.as_text().unwrap_or_default();
                if text.is_empty() {
                    self.fallback_max_steps_answer(memory)
                } else {
                    Value::String(text.to_string())
                }
            }
            Err(_) => self.fallback_max_steps_answer(memory),
        }
    }

    fn fallback_max_steps_answer(&self, memory: &Memory) -> Value {
        Value::String(format!(
            "Stopped after {} steps without a final answer. Last observations:\n{}",
            self.config.max_steps,
            memory.action_steps().last().and_then(|s| s.observations.clone()).unwrap_or_default()
        ))
    }

    /// Runs every registered final-answer check against `candidate`.
    /// Returns `Some(reason)` naming the first check to reject it (or panic,
    /// caught via `catch_unwind`), `None` if every check accepts.
    fn run_final_answer_checks(&self, candidate: &Value, memory: &Memory) -> Option<String> {
        for (i, check) in self.final_answer_checks.iter().enumerate() {
            let accepted = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                check(candidate, memory, &self.agent)
            }));
            match accepted {
                Ok(true) => continue,
                Ok(false) => return Some(format!("final-answer check #{i} rejected this answer")),
                Err(_) => return Some(format!("final-answer check #{i} panicked")),
            }
        }
        None
    }

    fn should_plan(&self, step_number: u32) -> bool {
        match self.config.planning_interval {
            Some(interval) if interval > 0 => (step_number - 1) % interval == 0,
            _ => false,
        }
    }

    async fn run_planning_step(&self, memory: &Memory, prompt: &str) -> Result<String, AgentError> {
        let mut messages = memory.to_messages();
        messages.push(axon_model::Message::user(prompt));
        let req = CompletionRequest { messages, tools: vec![], stream: true, system_dynamic_suffix: None };
        let (message, _usage) = self
            .agent
            .model()
            .generate(req)
            .await
            .map_err(|e| AgentError::Generation(e.to_string()))?;
        Ok(message.as_text().unwrap_or_default().to_string())
    }
}

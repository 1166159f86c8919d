// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0

//! Run-level timing and the aggregate result a [`crate::driver::Driver`]
//! returns once a run ends, however it ends.

use std::time::{Duration, Instant};

use serde_json::Value;

use axon_model::Usage;

/// Wall-clock timing for a run. `Instant` isn't serializable, so timing is
/// reported to callers as a plain `Duration` via [`Timing::elapsed`] rather
/// than exposed directly.
#[derive(Debug, Clone)]
pub struct Timing {
    start: Instant,
    end: Option<Instant>,
}

impl Timing {
    pub fn start() -> Self {
        Self { start: Instant::now(), end: None }
    }

    pub fn stop(&mut self) {
        if self.end.is_none() {
            self.end = Some(Instant::now());
        }
    }

    /// Elapsed duration; if the run hasn't been stopped yet, measures up to
    /// now rather than panicking or returning a stale value.
    pub fn elapsed(&self) -> Duration {
        self.end.unwrap_or_else(Instant::now).duration_since(self.start)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// A `final_answer` call (or equivalent) ended the run normally.
    Success,
    /// The step budget was exhausted; `output` carries a synthesized answer.
    MaxStepsError,
    /// The run was interrupted externally before completion.
    Interrupted,
    /// The model provider failed after exhausting its retry budget.
    GenerationError,
}

/// The aggregate result of one run: the final value (if any), how the run
/// ended, how many steps it took, total token usage, and timing.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub output: Option<Value>,
    pub state: RunState,
    pub steps: usize,
    pub token_usage: Usage,
    pub duration: Duration,
}

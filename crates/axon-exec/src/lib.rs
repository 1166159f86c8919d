// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0

//! Restricted in-process evaluator used by the code agent.
//!
//! The code agent asks the model for one executable snippet per step; this
//! crate extracts it from the raw response ([`parsing`]) and runs it inside
//! a sandboxed [`rhai`] engine ([`executor`]) whose scope exposes the
//! agent's tools as ordinary callables and a reserved `final_answer`
//! function. Nothing here runs the model or owns agent memory — both are
//! the driver's responsibility.

mod error;
mod executor;
mod parsing;

pub use error::{InterpreterError, ParseError};
pub use executor::{format_observation, ExecutionOutcome, Executor, ExecutorConfig, ToolFn};
pub use parsing::{extract_code, extract_code_from_json, CodeTags};

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Centralised tool-registry builder.
//!
//! Every caller (the CLI, [`crate::TaskTool`] sub-agents) uses
//! `build_tool_registry` with the appropriate [`ToolSetProfile`] instead of
//! each inlining its own registration loop.

use std::sync::Arc;

use axon_config::Config;
use axon_tools::{
    AskQuestionTool, CodeInterpreterTool, FinalAnswerTool, ReadFileTool, ReadImageTool,
    ToolRegistry, WebFetchTool, WebSearchTool, WriteTool,
};

use crate::context::{RuntimeContext, ToolSetProfile};
use crate::task_tool::TaskTool;

/// Build a [`ToolRegistry`] populated according to the given `profile`.
///
/// This is the single canonical place where tools are wired up. Adding a
/// new tool to axon means registering it here once.
///
/// `allowed`, when `Some`, restricts registration to tool names it
/// contains (`--tools` on the CLI); `final_answer` is always registered
/// regardless, since a tool-calling agent has no other way to terminate a
/// run. `runtime` is inherited by [`TaskTool`] sub-agents so they see the
/// same project/git/CI notes as their parent; unused for `SubAgent`.
pub fn build_tool_registry(
    cfg: &Config,
    model_cfg: axon_config::ModelConfig,
    profile: ToolSetProfile,
    runtime: RuntimeContext,
    allowed: Option<&[String]>,
) -> ToolRegistry {
    let wants = |name: &str| name == "final_answer" || allowed.map(|a| a.iter().any(|n| n == name)).unwrap_or(true);

    let mut reg = ToolRegistry::new();
    if wants("final_answer") {
        reg.register(FinalAnswerTool);
    }
    if wants("read_file") {
        reg.register(ReadFileTool);
    }
    if wants("read_image") {
        reg.register(ReadImageTool);
    }
    if wants("write") {
        reg.register(WriteTool);
    }
    if wants("web_fetch") {
        reg.register(WebFetchTool);
    }
    if wants("web_search") {
        reg.register(WebSearchTool { api_key: cfg.tools.web.search.api_key.clone() });
    }
    if wants("code_interpreter") {
        reg.register(CodeInterpreterTool::new(axon_exec::ExecutorConfig {
            max_print_outputs_length: cfg.tools.max_print_outputs_length,
            additional_authorized_imports: cfg.tools.additional_authorized_imports.clone(),
        }));
    }
    if wants("user_input") {
        reg.register(AskQuestionTool::new_headless());
    }

    if let ToolSetProfile::Full { task_depth } = profile {
        if wants("task") {
            reg.register(TaskTool::new(model_cfg, Arc::new(cfg.clone()), task_depth, runtime));
        }
    }

    reg
}

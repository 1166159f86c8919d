// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Runtime context types for agent construction.
//!
//! [`RuntimeContext`] holds environment-detected information (project root,
//! git state, CI environment) that is not part of the config file schema. It
//! is folded into the system prompt as an appended section rather than
//! threaded through the driver, which knows nothing about project layout.
//!
//! [`ToolSetProfile`] selects which tools a call to [`crate::build_tool_registry`]
//! registers.

use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use axon_runtime::{CiContext, GitContext};

/// Environment-detected context for an agent session.
///
/// Separate from [`axon_config::AgentConfig`] (which holds only config-file
/// fields) so that "what the user configured" and "what we found at
/// runtime" stay cleanly apart.
#[derive(Default, Clone)]
pub struct RuntimeContext {
    /// Absolute path to the project root (detected from a `.git` walk-up).
    pub project_root: Option<PathBuf>,
    /// Live git metadata (branch, commit, dirty state).
    pub git_context: Option<GitContext>,
    /// CI environment metadata.
    pub ci_context: Option<CiContext>,
    /// Contents of `.axon/context.md`, `AGENTS.md`, or `CLAUDE.md`.
    pub project_context_file: Option<String>,
    /// Text appended after the default system prompt.
    pub append_system_prompt: Option<String>,
    /// Full system prompt override (from `--system-prompt-file`).
    pub system_prompt_override: Option<String>,
}

impl RuntimeContext {
    /// Create with auto-detected project, git, and CI context.
    pub fn auto_detect() -> Self {
        let project_root = axon_runtime::find_project_root().ok();
        let git_context = project_root.as_ref().map(axon_runtime::collect_git_context);
        let ci_context = Some(axon_runtime::detect_ci_context());
        let project_context_file =
            project_root.as_ref().and_then(|r| axon_runtime::load_project_context_file(r));

        Self {
            project_root,
            git_context,
            ci_context,
            project_context_file,
            append_system_prompt: None,
            system_prompt_override: None,
        }
    }

    /// Create an empty context (no project/git/CI detection).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Render the notes this context contributes to a system prompt, or
    /// `None` when there is nothing to append.
    pub fn to_prompt_section(&self) -> Option<String> {
        let mut section = String::new();
        if let Some(git) = &self.git_context {
            if !git.is_empty() {
                section.push_str(&git.to_prompt_section());
                section.push('\n');
            }
        }
        if let Some(ci) = &self.ci_context {
            if ci.is_ci() {
                section.push_str(&ci.to_prompt_section());
                section.push('\n');
            }
        }
        if let Some(file) = &self.project_context_file {
            section.push_str("## Project notes\n");
            section.push_str(file);
            section.push('\n');
        }
        if let Some(extra) = &self.append_system_prompt {
            section.push_str(extra);
            section.push('\n');
        }
        if section.is_empty() {
            None
        } else {
            Some(section)
        }
    }
}

/// Selects which tool set [`crate::build_tool_registry`] assembles.
///
/// Both profiles register the same built-in tools; only `Full` also
/// registers [`crate::TaskTool`], and carries the shared nesting-depth
/// counter it needs. `SubAgent` omits it so a sub-agent cannot itself spawn
/// further sub-agents without bound.
pub enum ToolSetProfile {
    /// Top-level agent: every built-in tool, plus managed sub-agent dispatch.
    Full { task_depth: Arc<AtomicUsize> },
    /// A sub-agent spawned by [`crate::TaskTool`]: every built-in tool except `task`.
    SubAgent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_has_no_prompt_section() {
        assert!(RuntimeContext::empty().to_prompt_section().is_none());
    }

    #[test]
    fn append_system_prompt_surfaces_in_section() {
        let ctx = RuntimeContext { append_system_prompt: Some("extra notes".into()), ..Default::default() };
        assert_eq!(ctx.to_prompt_section(), Some("extra notes\n".into()));
    }
}

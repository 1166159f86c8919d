// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Transcript export: the ambient "collaborator" that dumps a completed
//! run's memory to JSONL for offline inspection or fine-tuning datasets.

mod jsonl_export;

pub use jsonl_export::{write_jsonl_trace, write_memory_trace, JsonlFormat};
// Re-exported for callers that only need runtime detection and don't want
// a direct dependency on axon-runtime.
pub use axon_runtime::{
    ci_template_vars, collect_git_context, detect_ci_context, find_project_root, load_project_context_file,
    GitContext,
};

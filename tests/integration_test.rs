// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! End-to-end tests driving the real [`Driver`] loop over a [`MockProvider`],
//! plus focused checks of the tool policy engine and built-in tools.
use std::sync::Arc;

use axon_config::{AgentConfig, Config, ToolsConfig};
use axon_core::{Driver, RunState, ToolCallingAgent};
use axon_model::MockProvider;
use axon_tools::{ApprovalPolicy, ReadFileTool, Tool, ToolCall, ToolPolicy, ToolRegistry, WriteTool};

#[tokio::test]
async fn driver_runs_tool_calling_agent_to_completion() {
    let model = Box::new(MockProvider);
    let tools = Arc::new(ToolRegistry::new());
    let agent = ToolCallingAgent::new(model, tools);
    let driver = Driver::new(agent, AgentConfig::default());

    let result = driver.run("say hello").await;

    // MockProvider never emits a structured tool call, so the agent runs
    // out of action steps and the driver synthesizes a final answer.
    assert_eq!(result.state, RunState::MaxStepsError);
    assert!(result.output.is_some());
}

#[tokio::test]
async fn driver_reports_interrupted_state() {
    let model = Box::new(MockProvider);
    let tools = Arc::new(ToolRegistry::new());
    let agent = ToolCallingAgent::new(model, tools);
    let driver = Driver::new(agent, AgentConfig::default());

    let handle = driver.interrupt_handle();
    handle.store(true, std::sync::atomic::Ordering::SeqCst);

    let result = driver.run("say hello").await;
    assert_eq!(result.state, RunState::Interrupted);
    assert_eq!(result.steps, 0);
}

#[test]
fn config_defaults_are_valid() {
    let cfg = Config::default();
    assert_eq!(cfg.model.provider, "openai");
    assert!(cfg.agent.max_steps > 0);
    assert!(cfg.agent.compaction_threshold > 0.0);
}

#[test]
fn tool_policy_auto_approve_matches_glob() {
    let cfg = ToolsConfig::default();
    let policy = ToolPolicy::from_config(&cfg);
    assert_eq!(policy.decide("read_file /etc/hosts"), ApprovalPolicy::Auto);
}

#[test]
fn tool_policy_deny_overrides_auto_approve() {
    let cfg = ToolsConfig {
        auto_approve_patterns: vec!["read_file *".into()],
        deny_patterns: vec!["read_file /etc/*".into()],
        ..ToolsConfig::default()
    };
    let policy = ToolPolicy::from_config(&cfg);
    assert_eq!(policy.decide("read_file /etc/shadow"), ApprovalPolicy::Deny);
    assert_eq!(policy.decide("read_file /tmp/notes.txt"), ApprovalPolicy::Auto);
}

#[test]
fn tool_policy_unmatched_command_asks() {
    let cfg = ToolsConfig::default();
    let policy = ToolPolicy::from_config(&cfg);
    assert_eq!(policy.decide("write /tmp/x"), ApprovalPolicy::Ask);
}

#[tokio::test]
async fn write_then_read_file_roundtrip() {
    let path = std::env::temp_dir().join(format!("axon_test_{}.txt", std::process::id()));
    let path_str = path.to_string_lossy().to_string();

    let write_call = ToolCall {
        id: "w1".into(),
        name: "write".into(),
        args: serde_json::json!({ "path": path_str, "content": "roundtrip", "append": false }),
    };
    let wo = WriteTool.execute(&write_call).await;
    assert!(!wo.is_error, "write failed: {}", wo.content);

    let read_call = ToolCall {
        id: "r1".into(),
        name: "read_file".into(),
        args: serde_json::json!({ "path": path_str }),
    };
    let ro = ReadFileTool.execute(&read_call).await;
    assert!(!ro.is_error);
    assert!(ro.content.contains("roundtrip"));

    let _ = std::fs::remove_file(&path);
}

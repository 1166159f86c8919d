// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Command-line surface: a positional task, flags selecting model and agent
//! strategy, and a handful of read-only diagnostic subcommands.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;

use axon_config::AgentKind;

#[derive(Parser, Debug)]
#[command(
    name = "axon",
    about = "A multi-step tool-and-code-calling LLM agent runtime",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// The task to give the agent.
    #[arg(value_name = "TASK")]
    pub task: Option<String>,

    /// Model to use, e.g. "gpt-4o" or "anthropic/claude-opus-4-5".
    #[arg(long, short = 'M', env = "AXON_MODEL")]
    pub model: Option<String>,

    /// Override the model provider (e.g. "openai", "anthropic", "mock").
    #[arg(long)]
    pub provider: Option<String>,

    /// Override the provider's base URL (local proxies, self-hosted endpoints).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Explicit API key; prefer the provider's default environment variable.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Which agent strategy drives the step loop.
    #[arg(long, value_enum, default_value = "tool_calling")]
    pub action_type: AgentKind,

    /// Additional module the code agent's sandbox may `import`. Repeatable.
    #[arg(long = "authorized-import", value_name = "MODULE")]
    pub authorized_imports: Vec<String>,

    /// Restrict the tool registry to these names. Omit to register every
    /// built-in tool. Repeatable: --tool read_file --tool write
    #[arg(long = "tool", value_name = "NAME")]
    pub tools: Vec<String>,

    /// Maximum action steps before the run is forced to a synthesized
    /// final answer.
    #[arg(long)]
    pub max_steps: Option<u32>,

    /// Path to config file (overrides auto-discovery).
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Write the run's transcript (one JSON message per line) to this path.
    #[arg(long, value_name = "PATH")]
    pub output_jsonl: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace).
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Print the effective configuration and exit.
    ShowConfig,
    /// List available models for the configured provider(s).
    ListModels {
        /// Filter by provider name (e.g. "openai", "anthropic", "groq").
        #[arg(long, short = 'p')]
        provider: Option<String>,
        /// Output as JSON instead of a formatted table.
        #[arg(long)]
        json: bool,
    },
    /// List all supported model providers.
    ListProviders {
        /// Show detailed information for each provider.
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "axon", &mut std::io::stdout());
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use axon_bootstrap::{build_tool_registry, RuntimeContext, ToolSetProfile};
use axon_core::{CodeAgent, Driver, Memory, RunState, ToolCallingAgent};
use axon_model::catalog::ModelCatalogEntry;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(cmd) = &cli.command {
        return match cmd {
            Commands::Completions { shell } => {
                cli::print_completions(*shell);
                Ok(())
            }
            Commands::ShowConfig => {
                let config = axon_config::load(cli.config.as_deref())?;
                println!("{}", serde_yaml::to_string(&config)?);
                Ok(())
            }
            Commands::ListModels { provider, json } => {
                let config = axon_config::load(cli.config.as_deref())?;
                list_models_cmd(&config, provider.as_deref(), *json)
            }
            Commands::ListProviders { verbose, json } => list_providers_cmd(*verbose, *json),
        };
    }

    let task = cli.task.clone().context("a TASK argument is required unless a subcommand is given")?;
    let exit_code = run_agent(&cli, task).await?;
    std::process::exit(exit_code);
}

/// Resolve config/model, build the registry and driver for the requested
/// `--action-type`, run the task, print the answer, and optionally dump the
/// transcript. Returns the process exit code.
async fn run_agent(cli: &Cli, task: String) -> anyhow::Result<i32> {
    let mut config = axon_config::load(cli.config.as_deref())?;

    if !cli.authorized_imports.is_empty() {
        config.tools.additional_authorized_imports.extend(cli.authorized_imports.iter().cloned());
    }

    let mut model_cfg = match &cli.model {
        Some(m) => axon_model::resolve_model_from_config(&config, m),
        None => config.model.clone(),
    };
    if let Some(provider) = &cli.provider {
        model_cfg.provider = provider.clone();
    }
    if let Some(base_url) = &cli.base_url {
        model_cfg.base_url = Some(base_url.clone());
    }
    if let Some(api_key) = &cli.api_key {
        model_cfg.api_key = Some(api_key.clone());
    }
    if let Some(max_steps) = cli.max_steps {
        config.agent.max_steps = max_steps;
    }

    let model = axon_model::from_config(&model_cfg).context("constructing model provider")?;
    let runtime = RuntimeContext::auto_detect();
    let allowed: Option<Vec<String>> = if cli.tools.is_empty() { None } else { Some(cli.tools.clone()) };

    let tools = Arc::new(build_tool_registry(
        &config,
        model_cfg.clone(),
        ToolSetProfile::Full { task_depth: Arc::new(AtomicUsize::new(0)) },
        runtime.clone(),
        allowed.as_deref(),
    ));

    let prompt_suffix = runtime.to_prompt_section();
    let mut memory = Memory::new();

    let result = match cli.action_type {
        axon_config::AgentKind::ToolCalling => {
            let mut agent = ToolCallingAgent::new(model, tools).with_max_tool_threads(config.agent.max_tool_threads);
            if let Some(suffix) = prompt_suffix {
                agent = agent.with_dynamic_suffix(suffix);
            }
            let driver = Driver::new(agent, config.agent.clone());
            driver.run_with_memory(task, &mut memory).await
        }
        axon_config::AgentKind::Code => {
            let executor_cfg = axon_exec::ExecutorConfig {
                max_print_outputs_length: config.tools.max_print_outputs_length,
                additional_authorized_imports: config.tools.additional_authorized_imports.clone(),
            };
            let mut agent = CodeAgent::new(model, tools, executor_cfg);
            if let Some(suffix) = prompt_suffix {
                agent = agent.with_dynamic_suffix(suffix);
            }
            let driver = Driver::new(agent, config.agent.clone());
            driver.run_with_memory(task, &mut memory).await
        }
    };

    if let Some(path) = &cli.output_jsonl {
        axon_ci::write_memory_trace(path, &memory, axon_ci::JsonlFormat::Raw)
            .with_context(|| format!("writing transcript to {}", path.display()))?;
    }

    match &result.state {
        RunState::Success => {
            print_answer(&result.output);
            Ok(0)
        }
        RunState::MaxStepsError => {
            tracing::warn!(steps = result.steps, "run ended without a final answer; step budget exhausted");
            print_answer(&result.output);
            Ok(0)
        }
        RunState::Interrupted => {
            tracing::error!("run interrupted before completion");
            Ok(130)
        }
        RunState::GenerationError => {
            tracing::error!("model generation failed after exhausting retries");
            Ok(1)
        }
    }
}

fn print_answer(output: &Option<serde_json::Value>) {
    match output {
        Some(serde_json::Value::String(s)) => println!("{s}"),
        Some(v) => println!("{v}"),
        None => {}
    }
}

fn list_models_cmd(config: &axon_config::Config, provider_filter: Option<&str>, as_json: bool) -> anyhow::Result<()> {
    if let Some(prov) = provider_filter {
        if axon_model::get_driver(prov).is_none() {
            eprintln!("Unknown provider: {prov:?}");
            eprintln!("\nAvailable providers (run `axon list-providers` for details):");
            for d in axon_model::list_drivers() {
                eprintln!("  {:20} {}", d.id, d.name);
            }
            anyhow::bail!("Invalid provider: {prov}");
        }
    }

    let _ = config;
    let mut entries: Vec<ModelCatalogEntry> = axon_model::catalog::static_catalog();
    if let Some(prov) = provider_filter {
        entries.retain(|e| e.provider == prov);
    }
    entries.sort_by(|a, b| a.provider.cmp(&b.provider).then(a.id.cmp(&b.id)));

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No models found.");
        return Ok(());
    }

    let id_w = entries.iter().map(|e| e.id.len()).max().unwrap_or(10).max(10);
    let prov_w = entries.iter().map(|e| e.provider.len()).max().unwrap_or(8).max(8);

    println!(
        "{:<id_w$}  {:<prov_w$}  {:>12}  {:>16}  DESCRIPTION",
        "ID",
        "PROVIDER",
        "CTX WINDOW",
        "MAX OUT TOKENS",
        id_w = id_w,
        prov_w = prov_w,
    );
    println!("{}", "-".repeat(id_w + prov_w + 50));

    for e in &entries {
        let ctx = if e.context_window == 0 { "  -".to_string() } else { format!("{:>12}", e.context_window) };
        let max_out = if e.max_output_tokens == 0 { "  -".to_string() } else { format!("{:>16}", e.max_output_tokens) };
        println!(
            "{:<id_w$}  {:<prov_w$}  {}  {}  {}",
            e.id,
            e.provider,
            ctx,
            max_out,
            e.description,
            id_w = id_w,
            prov_w = prov_w,
        );
    }
    println!("\nTotal: {} model(s)", entries.len());
    Ok(())
}

fn list_providers_cmd(verbose: bool, as_json: bool) -> anyhow::Result<()> {
    let drivers = axon_model::list_drivers();

    if as_json {
        #[derive(serde::Serialize)]
        struct ProviderJson {
            id: &'static str,
            name: &'static str,
            description: &'static str,
            default_api_key_env: Option<&'static str>,
            default_base_url: Option<&'static str>,
            requires_api_key: bool,
        }
        let rows: Vec<ProviderJson> = drivers
            .iter()
            .map(|d| ProviderJson {
                id: d.id,
                name: d.name,
                description: d.description,
                default_api_key_env: d.default_api_key_env,
                default_base_url: d.default_base_url,
                requires_api_key: d.requires_api_key,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Supported Model Providers ({} total)\n", drivers.len());

    if verbose {
        for d in drivers {
            println!("  {} — {}", d.id, d.name);
            println!("    {}", d.description);
            if let Some(env) = d.default_api_key_env {
                println!("    API key env : {env}");
            }
            if let Some(url) = d.default_base_url {
                println!("    Default URL : {url}");
            }
            if !d.requires_api_key {
                println!("    No API key required");
            }
            println!();
        }
    } else {
        for d in drivers {
            println!("  {:16} {}", d.id, d.name);
        }
    }
    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rhai::{Dynamic, Engine, Scope};
use serde_json::Value;

use crate::error::InterpreterError;

/// A tool exposed to the sandbox as a callable. Implementations accept a
/// single JSON object of keyword arguments and return a JSON value.
pub type ToolFn = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// `print`/`debug` output captured per call is truncated to this many
    /// characters before being surfaced in the observation.
    pub max_print_outputs_length: usize,
    /// Extra modules the agent is permitted to `import`, beyond the base
    /// whitelist. The base engine never registers filesystem, process, or
    /// networking primitives, so this only gates the `import` statement.
    pub additional_authorized_imports: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { max_print_outputs_length: 10_000, additional_authorized_imports: Vec::new() }
    }
}

/// Outcome of one `Executor::call`.
pub struct ExecutionOutcome {
    pub output: Option<Value>,
    pub logs: String,
    pub is_final_answer: bool,
}

/// Restricted, in-process evaluator backing the code agent.
///
/// Each call builds a fresh [`rhai::Engine`] scoped to this invocation: the
/// registered tools and whitelisted state variables are injected, `print`
/// output is captured, and the reserved `final_answer` function records its
/// argument into a private slot rather than relying on the script's return
/// value alone.
pub struct Executor {
    tools: HashMap<String, ToolFn>,
    state: Mutex<HashMap<String, Value>>,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { tools: HashMap::new(), state: Mutex::new(HashMap::new()), config }
    }

    /// Register a tool as a callable in the sandbox namespace.
    pub fn register_tool(&mut self, name: impl Into<String>, f: ToolFn) {
        self.tools.insert(name.into(), f);
    }

    /// Set or overwrite a whitelisted state variable visible to every
    /// subsequent `call`.
    pub fn set_state(&self, key: impl Into<String>, value: Value) {
        self.state.lock().unwrap().insert(key.into(), value);
    }

    pub fn state_snapshot(&self) -> HashMap<String, Value> {
        self.state.lock().unwrap().clone()
    }

    /// Run one snippet of code to completion.
    pub fn call(&self, code: &str) -> Result<ExecutionOutcome, InterpreterError> {
        if let Some(module) = self.first_unauthorized_import(code) {
            return Err(InterpreterError(format!(
                "import of `{module}` is not authorized; add it to additional_authorized_imports"
            )));
        }

        let mut engine = Engine::new();
        engine.set_max_expr_depths(64, 32);
        engine.set_max_operations(2_000_000);

        let logs = Arc::new(Mutex::new(String::new()));
        let max_logs = self.config.max_print_outputs_length;
        {
            let logs = logs.clone();
            engine.on_print(move |s| {
                let mut buf = logs.lock().unwrap();
                if buf.len() < max_logs {
                    buf.push_str(s);
                    buf.push('\n');
                }
            });
        }
        {
            let logs = logs.clone();
            engine.on_debug(move |s, _src, _pos| {
                let mut buf = logs.lock().unwrap();
                if buf.len() < max_logs {
                    buf.push_str(s);
                    buf.push('\n');
                }
            });
        }

        let final_slot: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        {
            let slot = final_slot.clone();
            engine.register_fn("final_answer", move |value: Dynamic| -> Dynamic {
                if let Ok(json) = rhai::serde::from_dynamic::<Value>(&value) {
                    *slot.lock().unwrap() = Some(json);
                }
                value
            });
        }

        for (name, func) in &self.tools {
            let func = func.clone();
            engine.register_fn(name.as_str(), move |args: rhai::Map| -> Result<Dynamic, Box<rhai::EvalAltResult>> {
                let json: Value = rhai::serde::from_dynamic(&Dynamic::from_map(args))
                    .map_err(|e| format!("invalid arguments: {e}"))?;
                match func(json) {
                    Ok(result) => rhai::serde::to_dynamic(&result)
                        .map_err(|e| format!("could not convert tool result: {e}").into()),
                    Err(e) => Err(e.into()),
                }
            });
        }

        let mut scope = Scope::new();
        for (key, value) in self.state.lock().unwrap().iter() {
            if let Ok(dyn_value) = rhai::serde::to_dynamic(value) {
                scope.push_dynamic(key.clone(), dyn_value);
            }
        }

        let result = engine.eval_with_scope::<Dynamic>(&mut scope, code);

        let mut logs = logs.lock().unwrap().clone();
        if logs.len() > max_logs {
            logs.truncate(max_logs);
            logs.push_str("\n... [logs truncated]");
        }

        match result {
            Ok(value) => {
                let recorded = final_slot.lock().unwrap().take();
                if let Some(answer) = recorded {
                    Ok(ExecutionOutcome { output: Some(answer), logs, is_final_answer: true })
                } else {
                    let output = if value.is_unit() {
                        None
                    } else {
                        rhai::serde::from_dynamic::<Value>(&value).ok()
                    };
                    Ok(ExecutionOutcome { output, logs, is_final_answer: false })
                }
            }
            Err(err) => Err(InterpreterError(format!("{err}\n{logs}"))),
        }
    }

    /// Cheap lexical check for an `import "module"` whose module is not on
    /// the authorized list; real denial of the `import` keyword itself
    /// happens implicitly because no module resolver is registered.
    fn first_unauthorized_import(&self, code: &str) -> Option<String> {
        for line in code.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("import ") {
                let module = rest.trim().trim_matches(|c| c == '"' || c == '\'' || c == ';');
                let module = module.split_whitespace().next().unwrap_or(module);
                if !self
                    .config
                    .additional_authorized_imports
                    .iter()
                    .any(|m| m == module)
                {
                    return Some(module.to_string());
                }
            }
        }
        None
    }
}

/// Renders the observation text the driver appends to memory after a step.
pub fn format_observation(outcome: &ExecutionOutcome, max_output_chars: usize) -> String {
    let output_text = match &outcome.output {
        Some(v) => serde_json::to_string(v).unwrap_or_else(|_| "null".to_string()),
        None => "None".to_string(),
    };
    let truncated = if output_text.chars().count() > max_output_chars {
        let head: String = output_text.chars().take(max_output_chars).collect();
        format!("{head}... [truncated]")
    } else {
        output_text
    };
    format!("Execution logs:\n{}\nLast output from code snippet:\n{}", outcome.logs, truncated)
}

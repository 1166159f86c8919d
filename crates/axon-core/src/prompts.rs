// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT

//! System-prompt templates for the two agent strategies. Each builds a
//! stable instruction block from the registered tools; nothing here reaches
//! into project state — a run's task and history are appended separately as
//! [`crate::memory::TaskStep`]/[`crate::memory::ActionStep`] entries.

use axon_tools::{Tool, ToolRegistry};

/// System prompt for a tool-calling agent: tools are exposed through the
/// model's native function-calling interface, so the prompt only needs to
/// describe the loop and the `final_answer` convention.
pub fn tool_calling_system_prompt(tools: &ToolRegistry) -> String {
    let tool_list = describe_tools(tools);
    format!(
        "You are an agent that solves tasks by calling tools.\n\
         At each step, call one or more of the tools below. When you have the \
         final answer, call `final_answer` with the answer as its only argument, \
         and make it the only call in that step.\n\n\
         Available tools:\n{tool_list}\n\n\
         Rules:\n\
         - Call tools to gather information and take actions; don't guess.\n\
         - If a tool call fails, read the error and adjust your next call.\n\
         - Call `final_answer` exactly once, alone, when you are done."
    )
}

/// System prompt for a code agent: tools are exposed as callable functions
/// inside a single code block per step, using the sandbox's code-fence
/// convention.
pub fn code_agent_system_prompt(tools: &ToolRegistry) -> String {
    let signatures = tools
        .schemas()
        .into_iter()
        .map(|s| format!("- {}", s.name))
        .collect::<Vec<_>>()
        .join("\n");
    let call_signatures = code_signatures(tools);
    format!(
        "You are an agent that solves tasks by writing and executing code.\n\
         At each step, write one code block between `<code>` and `</code>` tags. \
         The code may call any of the functions below; the value of the last \
         expression (or a call to `final_answer(value)`) becomes the step's \
         observation. Call `final_answer(value)` when you have the answer — it \
         ends the run immediately.\n\n\
         Available tools:\n{signatures}\n\n\
         Call signatures:\n{call_signatures}\n\n\
         Rules:\n\
         - Exactly one code block per step.\n\
         - Only the authorized imports configured for this run are available.\n\
         - Use `print(...)` to leave notes for yourself in the next step's logs.\n\
         - Call `final_answer(value)` exactly once, as the last statement, when done."
    )
}

/// System prompt for the max-steps synthesis call: the driver's last resort
/// when the step budget is exhausted without a `final_answer`. Asks the
/// model to commit to its best answer from whatever the transcript shows so
/// far instead of continuing to reason.
pub fn max_steps_pre_message() -> &'static str {
    "You have been working on a task but have used your maximum number of \
     steps without reaching a final answer. Below is a transcript of what \
     you have tried so far."
}

/// User-turn prompt appended after the transcript in the max-steps
/// synthesis call, asking for a best-effort answer instead of more action.
pub fn max_steps_post_message() -> &'static str {
    "Based on everything above, give your best final answer to the \
     original task now. Do not call any more tools or write any more code — \
     just answer directly with the most complete and correct answer you can \
     produce from what you have already learned."
}

fn describe_tools(tools: &ToolRegistry) -> String {
    tools
        .schemas()
        .into_iter()
        .map(|s| format!("- {}: {}", s.name, s.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn code_signatures(tools: &ToolRegistry) -> String {
    tools
        .names()
        .into_iter()
        .filter_map(|name| tools.get(&name))
        .map(|t| format!("- {}", t.to_code_signature()))
        .collect::<Vec<_>>()
        .join("\n")
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
pub mod builtin;
pub mod error;
pub mod events;
pub mod policy;
pub mod registry;
pub mod tool;
pub mod types;
pub mod validate;

pub use error::ToolCallError;
pub use events::{TodoItem, ToolEvent};
pub use policy::{ApprovalPolicy, ToolPolicy};
pub use registry::{ToolRegistry, ToolSchema};
pub use tool::{OutputCategory, Tool, ToolCall, ToolOutput, ToolOutputPart};
pub use types::{AgentValue, MediaValue};

pub use builtin::ask_question::{AskQuestionTool, Question, QuestionRequest};
pub use builtin::code_interpreter::CodeInterpreterTool;
pub use builtin::final_answer::FinalAnswerTool;
pub use builtin::read_file::ReadFileTool;
pub use builtin::read_image::ReadImageTool;
pub use builtin::web_fetch::WebFetchTool;
pub use builtin::web_search::WebSearchTool;
pub use builtin::write::WriteTool;

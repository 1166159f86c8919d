// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use rhai::Engine;

use crate::error::ParseError;

/// The (opening, closing) tag pair the model is instructed to wrap code in.
///
/// `sentinel()` is the default, compact, non-Markdown form. `markdown()`
/// matches a fenced code block naming the scripting language explicitly,
/// for models that have been trained mostly on Markdown-formatted output.
#[derive(Debug, Clone)]
pub struct CodeTags {
    pub opening: String,
    pub closing: String,
}

impl CodeTags {
    pub fn sentinel() -> Self {
        Self { opening: "<code>".into(), closing: "</code>".into() }
    }

    pub fn markdown() -> Self {
        Self { opening: "```rhai".into(), closing: "```".into() }
    }

    /// The stop sequence to pass to the model, or `None` when the closing
    /// tag is a substring of the opening tag (appending it as a stop
    /// sequence would truncate the snippet before it even starts).
    pub fn stop_sequence(&self) -> Option<&str> {
        if self.opening.contains(&self.closing) {
            None
        } else {
            Some(&self.closing)
        }
    }
}

impl Default for CodeTags {
    fn default() -> Self {
        Self::sentinel()
    }
}

/// Extract the code snippet from one model response.
///
/// Appends the closing tag if the model forgot it, takes the substring
/// between the first opening tag and the last closing tag, and falls back
/// to treating the entire response as a bare snippet when no tags are
/// present but the content itself parses as valid code.
pub fn extract_code(content: &str, tags: &CodeTags) -> Result<String, ParseError> {
    let mut content = content.to_string();
    if !content.trim_end().ends_with(tags.closing.as_str()) {
        content.push_str(&tags.closing);
    }

    if let Some(start) = content.find(tags.opening.as_str()) {
        let after_open = &content[start + tags.opening.len()..];
        if let Some(end) = after_open.rfind(tags.closing.as_str()) {
            let snippet = after_open[..end].trim();
            if !snippet.is_empty() {
                return Ok(snippet.to_string());
            }
        }
    }

    let trimmed = content.trim_end_matches(tags.closing.as_str()).trim();
    if !trimmed.is_empty() && is_syntactically_valid(trimmed) {
        return Ok(trimmed.to_string());
    }

    Err(ParseError::no_code_found(content, &tags.opening, &tags.closing))
}

/// Structured-output mode: the model emits a JSON object `{"code": "..."}`
/// instead of a tagged snippet.
pub fn extract_code_from_json(content: &str) -> Result<String, ParseError> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|_| ParseError::no_code_found(content, "{\"code\":", "}"))?;
    value
        .get("code")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| ParseError::no_code_found(content, "{\"code\":", "}"))
}

fn is_syntactically_valid(snippet: &str) -> bool {
    Engine::new().compile(snippet).is_ok()
}

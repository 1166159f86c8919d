// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0

/// Raised when the model output does not contain an extractable code snippet.
#[derive(Debug, thiserror::Error)]
#[error("could not find a valid code snippet in the model output.\nHint: {hint}\nRaw output:\n{raw}")]
pub struct ParseError {
    pub raw: String,
    pub hint: String,
}

impl ParseError {
    pub fn no_code_found(raw: impl Into<String>, opening: &str, closing: &str) -> Self {
        Self {
            raw: raw.into(),
            hint: format!(
                "wrap the code between `{opening}` and `{closing}`, or emit a single \
                 syntactically valid snippet with nothing else around it"
            ),
        }
    }

    pub fn unauthorized_import(raw: impl Into<String>, module: &str) -> Self {
        Self {
            raw: raw.into(),
            hint: format!(
                "`{module}` is not in the authorized imports list; add it to \
                 `additional_authorized_imports` if this agent genuinely needs it"
            ),
        }
    }
}

/// Raised when a syntactically valid snippet fails during evaluation.
#[derive(Debug, thiserror::Error)]
#[error("interpreter error: {0}")]
pub struct InterpreterError(pub String);

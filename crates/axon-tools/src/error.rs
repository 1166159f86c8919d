// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT

//! Argument-validation errors raised before a tool's `execute` is ever
//! called, so a malformed call produces a message the model can act on
//! ("missing required argument 'path'") instead of a panic or a generic
//! JSON-decode failure surfacing three layers up.

use thiserror::Error;

/// Raised by [`crate::tool::Tool::validate_args`] when a call's arguments
/// don't match the tool's declared [`crate::tool::Tool::parameters_schema`].
/// Recoverable: the driver records this on the current step's error field
/// and lets the model try again next turn.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolCallError {
    #[error("tool '{tool}' received unknown argument '{arg}'")]
    UnknownArgument { tool: String, arg: String },

    #[error("tool '{tool}' is missing required argument '{arg}'")]
    MissingArgument { tool: String, arg: String },

    #[error("tool '{tool}' argument '{arg}' expected type {expected}, got {actual}")]
    TypeMismatch { tool: String, arg: String, expected: String, actual: String },

    #[error("tool '{tool}' called with non-object arguments")]
    NotAnObject { tool: String },
}

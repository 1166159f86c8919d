// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT

//! Type wrappers created at the tool-output boundary and consumed at the
//! tool-input boundary. A tool whose declared `output_type` is `"image"` or
//! `"audio"` doesn't return raw bytes to the model — the model only ever
//! sees text — but the *driver* (and a code agent's sandbox scope) needs to
//! carry the actual payload between steps. [`AgentValue`] is that carrier:
//! it behaves like its underlying type (`raw()` for the native payload,
//! `string()` for what the model actually reads) and is unwrapped again
//! before the next tool call that consumes it.

use base64::Engine;
use serde_json::Value;

/// A media payload produced by a tool, tagged with its MIME type.
#[derive(Debug, Clone)]
pub struct MediaValue {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaValue {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { mime_type: mime_type.into(), bytes }
    }

    /// Native payload: the raw bytes.
    pub fn raw(&self) -> &[u8] {
        &self.bytes
    }

    /// Serialized form the model reads: a `data:` URL.
    pub fn string(&self) -> String {
        let b64 = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.mime_type, b64)
    }
}

/// A value that has crossed a tool boundary, tagged by the tool's declared
/// `output_type` so the driver knows how to present and re-hydrate it.
#[derive(Debug, Clone)]
pub enum AgentValue {
    /// `output_type` in {"string", "text"}. Both `raw()` and `string()` are
    /// the text itself.
    Text(String),
    /// `output_type == "image"`.
    Image(MediaValue),
    /// `output_type == "audio"`.
    Audio(MediaValue),
    /// Every other declared type (`integer`, `number`, `boolean`, `array`,
    /// `object`, `any`, `null`) passes through unwrapped as plain JSON.
    Raw(Value),
}

impl AgentValue {
    /// Wrap `value` according to a tool's declared `output_type`. Only
    /// `"string"`/`"text"`, `"image"`, and `"audio"` are wrapped; anything
    /// else passes through as [`AgentValue::Raw`].
    ///
    /// Image/audio values are expected as `data:` URLs (what a tool
    /// producing them returns as its textual payload) and are decoded back
    /// into bytes here so `raw()` yields the native payload.
    pub fn wrap(output_type: &str, value: Value) -> Self {
        match output_type {
            "string" | "text" => match value {
                Value::String(s) => AgentValue::Text(s),
                other => AgentValue::Text(other.to_string()),
            },
            "image" | "audio" => {
                let data_url = match &value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                match parse_data_url(&data_url) {
                    Some(media) if output_type == "image" => AgentValue::Image(media),
                    Some(media) => AgentValue::Audio(media),
                    None => AgentValue::Raw(value),
                }
            }
            _ => AgentValue::Raw(value),
        }
    }

    /// Native payload. Text yields itself; image/audio yield the decoded
    /// bytes re-encoded as a data URL (the closest stand-in for "raw" that
    /// still round-trips through JSON); everything else yields the JSON
    /// value untouched.
    pub fn raw(&self) -> Value {
        match self {
            AgentValue::Text(s) => Value::String(s.clone()),
            AgentValue::Image(m) | AgentValue::Audio(m) => Value::String(m.string()),
            AgentValue::Raw(v) => v.clone(),
        }
    }

    /// What the model reads: always a string for text/image/audio, the bare
    /// JSON value serialized otherwise.
    pub fn string(&self) -> String {
        match self {
            AgentValue::Text(s) => s.clone(),
            AgentValue::Image(m) | AgentValue::Audio(m) => m.string(),
            AgentValue::Raw(v) => match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }
}

fn parse_data_url(data_url: &str) -> Option<MediaValue> {
    let rest = data_url.strip_prefix("data:")?;
    let (header, b64) = rest.split_once(",")?;
    let mime_type = header.trim_end_matches(";base64").to_string();
    let bytes = base64::engine::general_purpose::STANDARD.decode(b64).ok()?;
    Some(MediaValue::new(mime_type, bytes))
}

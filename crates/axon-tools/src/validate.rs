// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT

//! A small, purpose-built subset of JSON Schema validation: enough to check
//! a tool call's arguments against a `{"type":"object","properties":...}`
//! schema and report exactly which argument is wrong. Not a general JSON
//! Schema validator — tools only ever declare flat object schemas with
//! primitive/array/object leaf types, so there's no need for `$ref`,
//! `oneOf`, or recursive schema composition here.

use serde_json::Value;

use crate::error::ToolCallError;

/// Declared JSON types a schema leaf may name. `"any"` (or an omitted
/// `"type"` key) accepts every value, matching how `final_answer` and
/// similar catch-all tools declare their payload.
fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Does `value` satisfy the declared `expected` type name? Integers widen to
/// `"number"`, and a schema that declares no `"type"` (or `"type": "any"`)
/// accepts anything — matching `final_answer`'s "any JSON type" contract.
fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "any" => true,
        "number" => matches!(value, Value::Number(_)),
        "integer" => matches!(value, Value::Number(n) if n.is_i64() || n.is_u64()),
        other => type_name(value) == other,
    }
}

/// Validate `args` (the tool call's parsed JSON arguments) against a tool's
/// declared `{"type":"object","properties":{...},"required":[...]}` schema.
///
/// `additionalProperties: false` is enforced when present; schemas that omit
/// it (or set it `true`) permit unknown keys, matching how most of the
/// built-in tools declare themselves today.
pub fn validate_against_schema(tool: &str, schema: &Value, args: &Value) -> Result<(), ToolCallError> {
    let Some(obj) = args.as_object() else {
        return Err(ToolCallError::NotAnObject { tool: tool.to_string() });
    };

    let properties = schema.get("properties").and_then(|p| p.as_object());
    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();
    let additional_allowed = schema
        .get("additionalProperties")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);

    for name in &required {
        if !obj.contains_key(*name) {
            return Err(ToolCallError::MissingArgument { tool: tool.to_string(), arg: name.to_string() });
        }
    }

    if let Some(properties) = properties {
        for (key, value) in obj {
            match properties.get(key) {
                Some(spec) => {
                    let nullable = spec.get("nullable").and_then(|v| v.as_bool()).unwrap_or(false);
                    if nullable && value.is_null() {
                        continue;
                    }
                    if let Some(expected) = spec.get("type").and_then(|t| t.as_str()) {
                        if !matches_type(expected, value) {
                            return Err(ToolCallError::TypeMismatch {
                                tool: tool.to_string(),
                                arg: key.clone(),
                                expected: expected.to_string(),
                                actual: type_name(value).to_string(),
                            });
                        }
                    }
                }
                None if !additional_allowed => {
                    return Err(ToolCallError::UnknownArgument { tool: tool.to_string(), arg: key.clone() });
                }
                None => {}
            }
        }
    } else if !additional_allowed {
        for key in obj.keys() {
            return Err(ToolCallError::UnknownArgument { tool: tool.to_string(), arg: key.clone() });
        }
    }

    Ok(())
}

/// JSON-schema type name as it would read in a code signature (`string`,
/// `integer`, ...), falling back to `any` for an untyped leaf.
pub fn schema_type_name(spec: &Value) -> String {
    spec.get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("any")
        .to_string()
}

//! JSON schema validation for tool inputs and structured model outputs.
//!
//! Supports the subset of JSON Schema used by tool definitions: `type`
//! (single or list), `properties`, `required`, `additionalProperties`,
//! `items`, `enum`, `const`, `anyOf`, `minLength`, `maxLength`, `minimum`,
//! `maximum`, `minItems`, and `maxItems`. Unknown keywords are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A JSON schema document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonSchema(Value);

impl JsonSchema {
    /// Wraps a schema document.
    #[must_use]
    pub const fn new(schema: Value) -> Self {
        Self(schema)
    }

    /// Returns a schema accepting any object.
    #[must_use]
    pub fn any_object() -> Self {
        Self(serde_json::json!({ "type": "object" }))
    }

    /// Returns the raw schema document.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the wrapper and returns the raw schema document.
    #[must_use]
    pub fn into_inner(self) -> Value {
        self.0
    }

    /// Returns `true` when the schema declares `"type": "object"`.
    #[must_use]
    pub fn is_object_schema(&self) -> bool {
        self.0.get("type").and_then(Value::as_str) == Some("object")
    }

    /// Validates a value against the schema.
    ///
    /// Every violation is collected; validation does not stop at the first
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaViolations`] listing each failing location.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use switchboard::router::domain::JsonSchema;
    ///
    /// let schema = JsonSchema::new(json!({
    ///     "type": "object",
    ///     "properties": { "topic": { "type": "string" } },
    ///     "required": ["topic"]
    /// }));
    /// assert!(schema.validate(&json!({ "topic": "rust" })).is_ok());
    /// assert!(schema.validate(&json!({})).is_err());
    /// ```
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolations> {
        let mut violations = Vec::new();
        check(&self.0, value, "", &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolations(violations))
        }
    }
}

impl From<Value> for JsonSchema {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    /// JSON-pointer-like location of the failing value; empty for the root.
    pub path: String,
    /// Description of the failure.
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Non-empty list of violations produced by [`JsonSchema::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaViolations(Vec<SchemaViolation>);

impl SchemaViolations {
    /// Returns the individual violations.
    #[must_use]
    pub fn as_slice(&self) -> &[SchemaViolation] {
        &self.0
    }

    /// Returns the number of violations.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when there are no violations.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if any violation is reported at `path`.
    #[must_use]
    pub fn has_path(&self, path: &str) -> bool {
        self.0.iter().any(|violation| violation.path == path)
    }
}

impl fmt::Display for SchemaViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

fn check(schema: &Value, value: &Value, path: &str, out: &mut Vec<SchemaViolation>) {
    let Some(rules) = schema.as_object() else {
        if schema == &Value::Bool(false) {
            push(out, path, "no value is allowed here");
        }
        return;
    };

    if let Some(expected) = rules.get("type") {
        if !type_allowed(expected, value) {
            push(
                out,
                path,
                format!("expected {}, found {}", describe_type(expected), kind(value)),
            );
            return;
        }
    }

    if let Some(Value::Array(options)) = rules.get("enum") {
        if !options.contains(value) {
            push(out, path, format!("value {value} is not one of the allowed values"));
        }
    }

    if let Some(expected) = rules.get("const") {
        if expected != value {
            push(out, path, format!("expected constant {expected}"));
        }
    }

    if let Some(Value::Array(branches)) = rules.get("anyOf") {
        let any_passes = branches.iter().any(|branch| {
            let mut scratch = Vec::new();
            check(branch, value, path, &mut scratch);
            scratch.is_empty()
        });
        if !any_passes {
            push(out, path, "value does not match any allowed schema");
        }
    }

    match value {
        Value::String(text) => check_string(rules, text, path, out),
        Value::Number(_) => check_number(rules, value, path, out),
        Value::Array(items) => check_array(rules, items, path, out),
        Value::Object(fields) => check_object(rules, fields, path, out),
        Value::Null | Value::Bool(_) => {}
    }
}

fn check_string(
    rules: &Map<String, Value>,
    text: &str,
    path: &str,
    out: &mut Vec<SchemaViolation>,
) {
    let length = text.chars().count();
    if let Some(min) = rules.get("minLength").and_then(Value::as_u64) {
        if (length as u64) < min {
            push(out, path, format!("string is shorter than {min} characters"));
        }
    }
    if let Some(max) = rules.get("maxLength").and_then(Value::as_u64) {
        if (length as u64) > max {
            push(out, path, format!("string is longer than {max} characters"));
        }
    }
}

fn check_number(
    rules: &Map<String, Value>,
    value: &Value,
    path: &str,
    out: &mut Vec<SchemaViolation>,
) {
    let Some(number) = value.as_f64() else {
        return;
    };
    if let Some(min) = rules.get("minimum").and_then(Value::as_f64) {
        if number < min {
            push(out, path, format!("value must be at least {min}"));
        }
    }
    if let Some(max) = rules.get("maximum").and_then(Value::as_f64) {
        if number > max {
            push(out, path, format!("value must be at most {max}"));
        }
    }
}

fn check_array(
    rules: &Map<String, Value>,
    items: &[Value],
    path: &str,
    out: &mut Vec<SchemaViolation>,
) {
    let count = items.len() as u64;
    if let Some(min) = rules.get("minItems").and_then(Value::as_u64) {
        if count < min {
            push(out, path, format!("array must contain at least {min} items"));
        }
    }
    if let Some(max) = rules.get("maxItems").and_then(Value::as_u64) {
        if count > max {
            push(out, path, format!("array must contain at most {max} items"));
        }
    }
    if let Some(item_schema) = rules.get("items") {
        for (index, item) in items.iter().enumerate() {
            check(item_schema, item, &format!("{path}/{index}"), out);
        }
    }
}

fn check_object(
    rules: &Map<String, Value>,
    fields: &Map<String, Value>,
    path: &str,
    out: &mut Vec<SchemaViolation>,
) {
    if let Some(Value::Array(required)) = rules.get("required") {
        for key in required.iter().filter_map(Value::as_str) {
            if !fields.contains_key(key) {
                push(out, &format!("{path}/{key}"), "required property is missing");
            }
        }
    }

    let properties = rules.get("properties").and_then(Value::as_object);
    for (key, field_value) in fields {
        let field_path = format!("{path}/{key}");
        match properties.and_then(|props| props.get(key)) {
            Some(property_schema) => check(property_schema, field_value, &field_path, out),
            None => match rules.get("additionalProperties") {
                Some(Value::Bool(false)) => {
                    push(out, &field_path, "additional property is not allowed");
                }
                Some(extra_schema @ Value::Object(_)) => {
                    check(extra_schema, field_value, &field_path, out);
                }
                _ => {}
            },
        }
    }
}

fn type_allowed(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => type_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| type_matches(name, value)),
        _ => true,
    }
}

fn type_matches(name: &str, value: &Value) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::String(name) => name.clone(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn push(out: &mut Vec<SchemaViolation>, path: &str, message: impl Into<String>) {
    out.push(SchemaViolation {
        path: path.to_owned(),
        message: message.into(),
    });
}

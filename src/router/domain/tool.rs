//! Tool metadata attached to agents and tool routes.

use super::{JsonSchema, RouterDomainError, split_path};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Definition exposing a route as a callable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    description: String,
    input_schema: JsonSchema,
}

impl ToolSpec {
    /// Creates a tool definition.
    ///
    /// # Errors
    ///
    /// Returns [`RouterDomainError::EmptyToolDescription`] when the
    /// description is blank and [`RouterDomainError::InvalidInputSchema`] when
    /// the schema does not describe an object.
    pub fn new(
        description: impl Into<String>,
        input_schema: impl Into<JsonSchema>,
    ) -> Result<Self, RouterDomainError> {
        let normalized_description = description.into().trim().to_owned();
        if normalized_description.is_empty() {
            return Err(RouterDomainError::EmptyToolDescription);
        }

        let schema = input_schema.into();
        if !schema.is_object_schema() {
            return Err(RouterDomainError::InvalidInputSchema(
                schema.as_value().to_string(),
            ));
        }

        Ok(Self {
            description: normalized_description,
            input_schema: schema,
        })
    }

    /// Returns the tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the input schema.
    #[must_use]
    pub const fn input_schema(&self) -> &JsonSchema {
        &self.input_schema
    }

    /// Builds the LLM-facing descriptor for the tool registered at `path`.
    #[must_use]
    pub fn descriptor_for(&self, path: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: tool_name_for_path(path),
            description: self.description.clone(),
            input_schema: self.input_schema.as_value().clone(),
        }
    }
}

/// Tool description handed to language models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Function-safe tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema for the tool arguments.
    pub input_schema: Value,
}

/// Derives a function-safe tool name from a route path.
///
/// # Examples
///
/// ```
/// use switchboard::router::domain::tool_name_for_path;
///
/// assert_eq!(tool_name_for_path("/research/web-search"), "research_web_search");
/// assert_eq!(tool_name_for_path("/"), "root");
/// ```
#[must_use]
pub fn tool_name_for_path(path: &str) -> String {
    let segments = split_path(path);
    if segments.is_empty() {
        return "root".to_owned();
    }
    segments
        .join("_")
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}

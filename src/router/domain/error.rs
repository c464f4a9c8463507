//! Error types for agent routing.

use super::SchemaViolations;
use thiserror::Error;

/// Errors raised while building router definitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterDomainError {
    /// The tool description is empty after trimming.
    #[error("tool description must not be empty")]
    EmptyToolDescription,

    /// The tool input schema is not an object schema.
    #[error("tool input schema must describe an object: {0}")]
    InvalidInputSchema(String),
}

/// Errors raised while dispatching a request through the router.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterError {
    /// No terminal handler matches the path.
    #[error("no agent or tool is registered for path: {0}")]
    NotFound(String),

    /// Input parameters failed schema validation.
    #[error("invalid input for {path}: {errors}")]
    Validation {
        /// Path whose schema rejected the input.
        path: String,
        /// Every violation found.
        errors: SchemaViolations,
    },

    /// The target agent has no tool definition.
    #[error("no tool definition is registered for agent at path: {0}")]
    ToolDefinitionMissing(String),

    /// The agent sub-call chain is too deep.
    #[error("maximum call depth of {0} exceeded")]
    MaxCallDepthExceeded(usize),

    /// A handler reported a failure.
    #[error("handler failed: {0}")]
    Handler(String),
}

impl RouterError {
    /// Creates a handler failure from any displayable error.
    pub fn handler(err: impl std::fmt::Display) -> Self {
        Self::Handler(err.to_string())
    }
}

/// Result type for router handlers and sub-calls.
pub type AgentResult<T> = Result<T, RouterError>;

//! Domain types for agent routing.
//!
//! Pure value types: route patterns and matching, JSON schema validation,
//! tool definitions, and routing errors.

mod error;
mod path;
mod schema;
mod tool;

pub use error::{AgentResult, RouterDomainError, RouterError};
pub use path::{
    RouteMatch, RoutePattern, Specificity, WILDCARD_PARAM, join_paths, normalize_path,
    resolve_path, split_path,
};
pub use schema::{JsonSchema, SchemaViolation, SchemaViolations};
pub use tool::{ToolDescriptor, ToolSpec, tool_name_for_path};

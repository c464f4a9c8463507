//! Port contracts for task orchestration.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod classifier;
pub mod model;
pub mod store;
pub mod tool_executor;
pub mod tool_selector;

pub use classifier::{ClassificationError, ClassificationRequest, TaskClassifier};
pub use model::{ModelError, StructuredModel, StructuredRequest};
pub use store::{
    ActivityRepository, EventRepository, EventWatcherRepository, StoreError, StoreResult,
    TaskRepository, TaskStore,
};
pub use tool_executor::{ToolExecutionError, ToolExecutor};
pub use tool_selector::ToolSelector;

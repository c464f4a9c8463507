//! Error types for task domain validation and parsing.

use super::{EventId, EventStatus, TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing or mutating domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// A workspace identifier is blank.
    #[error("workspace identifier must not be empty")]
    EmptyWorkspaceId,

    /// A task name is blank.
    #[error("task name must not be empty")]
    EmptyTaskName,

    /// An event type is blank.
    #[error("event type must not be empty")]
    EmptyEventType,

    /// An event was recorded without any workspace.
    #[error("event must belong to at least one workspace")]
    NoWorkspaces,

    /// A sequence number is out of range.
    #[error("invalid sequence number {0}, expected a positive integer")]
    InvalidSequenceNumber(u64),

    /// A watcher match query is not a JSON object.
    #[error("match query must be a JSON object, got {0}")]
    InvalidMatchQuery(String),

    /// The task status change is not permitted.
    #[error("task {task_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        /// Task being changed.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// The triggering event was already recorded.
    #[error("task {0} already has a triggering event")]
    TriggeringEventAlreadySet(TaskId),

    /// The event has already left the unclassified state.
    #[error("event {event_id} was already processed with status {status}")]
    EventAlreadyProcessed {
        /// Event being changed.
        event_id: EventId,
        /// Current status.
        status: EventStatus,
    },
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing task types from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task type: {0}")]
pub struct ParseTaskTypeError(pub String);

/// Error returned while parsing task priorities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task priority: {0}")]
pub struct ParseTaskPriorityError(pub String);

/// Error returned while parsing event statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown event status: {0}")]
pub struct ParseEventStatusError(pub String);

/// Errors raised while validating an activity draft.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActivityValidationError {
    /// The activity type is blank.
    #[error("activity type must not be empty")]
    EmptyActivityType,

    /// A field required for the activity type is absent.
    #[error("field `{field}` is required for `{activity_type}` activities")]
    MissingField {
        /// Activity type being validated.
        activity_type: String,
        /// Name of the missing field.
        field: &'static str,
    },

    /// Multiple validation errors occurred.
    #[error("multiple validation errors: {}", format_errors(.0))]
    Multiple(Vec<Self>),
}

fn format_errors(errors: &[ActivityValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ActivityValidationError {
    /// Combines validation errors into one.
    ///
    /// A single error is returned unwrapped.
    #[must_use]
    pub fn multiple(errors: Vec<Self>) -> Self {
        if errors.len() == 1 {
            if let Some(only) = errors.first() {
                return only.clone();
            }
        }
        Self::Multiple(errors)
    }

    /// Returns the names of every missing field.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        match self {
            Self::MissingField { field, .. } => vec![*field],
            Self::Multiple(errors) => errors.iter().flat_map(Self::missing_fields).collect(),
            Self::EmptyActivityType => Vec::new(),
        }
    }
}

//! Domain model for tasks, events, watchers, and activities.
//!
//! Pure value types and aggregates. Time is supplied by an injected
//! [`mockable::Clock`]; persistence and model calls live behind ports.

mod activity;
mod classification;
mod error;
mod event;
mod ids;
mod task;
mod watcher;

pub use activity::{
    Activity, ActivityBody, ActivityDraft, ActivityLinks, MESSAGE_ACTIVITY, MessageMetadata,
    NewActivity, PersistedActivityData, SYSTEM_UPDATE_ACTIVITY, TOOL_CALL_ACTIVITY,
    TOOL_RESULT_ACTIVITY,
};
pub use classification::{
    ClassificationResult, NewTaskPlan, ToolCall, ToolSelection, Triage, TriageDecision,
    WatcherPlan,
};
pub use error::{
    ActivityValidationError, ParseEventStatusError, ParseTaskPriorityError, ParseTaskStatusError,
    ParseTaskTypeError, TaskDomainError,
};
pub use event::{CanonicalEvent, Event, EventStatus, PersistedEventData, ProviderEventKey};
pub use ids::{ActivityId, EventId, EventWatcherId, SequenceNumber, TaskId, WorkspaceId};
pub use task::{
    NewTask, PersistedTaskData, Task, TaskPriority, TaskStatus, TaskSummary, TaskType,
};
pub use watcher::{EventWatcher, MatchQuery, NewEventWatcher, PersistedEventWatcherData};

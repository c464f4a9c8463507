//! Activity log entries recorded against tasks.

use super::{ActivityId, ActivityValidationError, SequenceNumber, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Activity type of conversational messages.
pub const MESSAGE_ACTIVITY: &str = "message";
/// Activity type of lifecycle notes written by the system.
pub const SYSTEM_UPDATE_ACTIVITY: &str = "system_update";
/// Activity type of tool selections.
pub const TOOL_CALL_ACTIVITY: &str = "tool_call";
/// Activity type of executed tool results.
pub const TOOL_RESULT_ACTIVITY: &str = "tool_result";

/// Chat message metadata attached to message-style activities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    /// Message identifier.
    pub id: Uuid,
    /// Author role, for example `user` or `assistant`.
    pub role: String,
    /// Text content.
    pub content: String,
    /// Structured content parts.
    #[serde(default)]
    pub parts: Vec<Value>,
    /// Attachments.
    #[serde(default)]
    pub attachments: Vec<Value>,
    /// Annotations.
    #[serde(default)]
    pub annotations: Vec<Value>,
    /// Identifier of the client request that produced the message.
    pub origin_client_request_id: String,
    /// Tool invocations requested by the message.
    #[serde(default)]
    pub tool_invocations: Vec<Value>,
    /// Free-form context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Agent identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minion_id: Option<String>,
    /// Agent type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minion_type: Option<String>,
    /// Agent flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minion_flow: Option<String>,
    /// Sending user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Revision identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl MessageMetadata {
    /// Creates metadata for a message with empty collections.
    #[must_use]
    pub fn new(
        role: impl Into<String>,
        content: impl Into<String>,
        origin_client_request_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: role.into(),
            content: content.into(),
            parts: Vec::new(),
            attachments: Vec::new(),
            annotations: Vec::new(),
            origin_client_request_id: origin_client_request_id.into(),
            tool_invocations: Vec::new(),
            context: None,
            minion_id: None,
            minion_type: None,
            minion_flow: None,
            user_id: None,
            revision_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the tool invocations.
    #[must_use]
    pub fn with_tool_invocations(mut self, invocations: Vec<Value>) -> Self {
        self.tool_invocations = invocations;
        self
    }
}

/// Validated activity body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityBody {
    /// A conversational message; every message field is present.
    Message {
        /// Message identifier.
        message_id: Uuid,
        /// Message text.
        message_content: String,
        /// Full message metadata.
        message_metadata: MessageMetadata,
    },
    /// Any other activity type.
    Entry {
        /// Activity type, for example `system_update`.
        activity_type: String,
        /// Optional message metadata.
        message_metadata: Option<MessageMetadata>,
    },
}

impl ActivityBody {
    /// Returns the activity type string.
    #[must_use]
    pub fn activity_type(&self) -> &str {
        match self {
            Self::Message { .. } => MESSAGE_ACTIVITY,
            Self::Entry { activity_type, .. } => activity_type,
        }
    }

    /// Returns the message metadata, if any.
    #[must_use]
    pub const fn message_metadata(&self) -> Option<&MessageMetadata> {
        match self {
            Self::Message {
                message_metadata, ..
            } => Some(message_metadata),
            Self::Entry {
                message_metadata, ..
            } => message_metadata.as_ref(),
        }
    }
}

/// Links between activities of the same task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLinks {
    /// Parent activity for threaded sub-actions.
    pub parent_activity_id: Option<ActivityId>,
    /// Preceding activity.
    pub prev_activity_id: Option<ActivityId>,
    /// Following activity.
    pub next_activity_id: Option<ActivityId>,
}

/// Loosely structured activity input awaiting validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityDraft {
    /// Activity type.
    pub activity_type: String,
    /// Message identifier; required for messages.
    pub message_id: Option<Uuid>,
    /// Message text; required for messages.
    pub message_content: Option<String>,
    /// Message metadata; required for messages.
    pub message_metadata: Option<MessageMetadata>,
    /// Generic metadata.
    pub metadata: Map<String, Value>,
    /// Data produced by or for AI processes.
    pub ai_generated_data: Option<Map<String, Value>>,
    /// Links to related activities.
    pub links: ActivityLinks,
}

impl ActivityDraft {
    /// Creates a draft of the given type.
    #[must_use]
    pub fn new(activity_type: impl Into<String>) -> Self {
        Self {
            activity_type: activity_type.into(),
            ..Self::default()
        }
    }

    /// Creates a `system_update` draft carrying `note` in its metadata.
    #[must_use]
    pub fn system_update(note: impl Into<String>) -> Self {
        Self::new(SYSTEM_UPDATE_ACTIVITY).with_metadata_entry("note", Value::String(note.into()))
    }

    /// Creates a complete message draft from metadata.
    #[must_use]
    pub fn message(message_metadata: MessageMetadata) -> Self {
        Self {
            activity_type: MESSAGE_ACTIVITY.to_owned(),
            message_id: Some(message_metadata.id),
            message_content: Some(message_metadata.content.clone()),
            message_metadata: Some(message_metadata),
            ..Self::default()
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Sets the message metadata.
    #[must_use]
    pub fn with_message_metadata(mut self, message_metadata: MessageMetadata) -> Self {
        self.message_metadata = Some(message_metadata);
        self
    }

    /// Sets the AI-generated data.
    #[must_use]
    pub fn with_ai_generated_data(mut self, data: Map<String, Value>) -> Self {
        self.ai_generated_data = Some(data);
        self
    }

    /// Sets the parent activity.
    #[must_use]
    pub const fn with_parent(mut self, parent: ActivityId) -> Self {
        self.links.parent_activity_id = Some(parent);
        self
    }

    /// Validates the draft and returns its typed body.
    ///
    /// # Errors
    ///
    /// Returns [`ActivityValidationError`] listing every missing field when
    /// a `message` draft is incomplete, or when the type is blank.
    pub fn validate(&self) -> Result<ActivityBody, ActivityValidationError> {
        let activity_type = self.activity_type.trim();
        if activity_type.is_empty() {
            return Err(ActivityValidationError::EmptyActivityType);
        }
        if activity_type != MESSAGE_ACTIVITY {
            return Ok(ActivityBody::Entry {
                activity_type: activity_type.to_owned(),
                message_metadata: self.message_metadata.clone(),
            });
        }

        match (
            self.message_id,
            self.message_content.as_ref(),
            self.message_metadata.as_ref(),
        ) {
            (Some(message_id), Some(content), Some(metadata)) => Ok(ActivityBody::Message {
                message_id,
                message_content: content.clone(),
                message_metadata: metadata.clone(),
            }),
            (message_id, content, metadata) => {
                let missing = |field| ActivityValidationError::MissingField {
                    activity_type: MESSAGE_ACTIVITY.to_owned(),
                    field,
                };
                let mut errors = Vec::new();
                if message_id.is_none() {
                    errors.push(missing("message_id"));
                }
                if content.is_none() {
                    errors.push(missing("message_content"));
                }
                if metadata.is_none() {
                    errors.push(missing("message_metadata"));
                }
                Err(ActivityValidationError::multiple(errors))
            }
        }
    }
}

/// Validated activity awaiting a sequence number from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    body: ActivityBody,
    links: ActivityLinks,
    timestamp: DateTime<Utc>,
    metadata: Map<String, Value>,
    ai_generated_data: Option<Map<String, Value>>,
}

impl NewActivity {
    /// Validates `draft` and stamps it with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ActivityValidationError`] when the draft is invalid.
    pub fn from_draft(
        draft: ActivityDraft,
        clock: &impl Clock,
    ) -> Result<Self, ActivityValidationError> {
        let body = draft.validate()?;
        Ok(Self {
            body,
            links: draft.links,
            timestamp: clock.utc(),
            metadata: draft.metadata,
            ai_generated_data: draft.ai_generated_data,
        })
    }

    /// Returns the validated body.
    #[must_use]
    pub const fn body(&self) -> &ActivityBody {
        &self.body
    }

    /// Returns the activity timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Immutable record of something that happened within a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    id: ActivityId,
    task_id: TaskId,
    sequence_number: SequenceNumber,
    links: ActivityLinks,
    timestamp: DateTime<Utc>,
    body: ActivityBody,
    metadata: Map<String, Value>,
    ai_generated_data: Option<Map<String, Value>>,
}

/// Parameter object for reconstructing a persisted activity.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedActivityData {
    /// Activity identifier.
    pub id: ActivityId,
    /// Owning task.
    pub task_id: TaskId,
    /// Position within the task.
    pub sequence_number: SequenceNumber,
    /// Links to related activities.
    pub links: ActivityLinks,
    /// Time the activity occurred.
    pub timestamp: DateTime<Utc>,
    /// Validated body.
    pub body: ActivityBody,
    /// Generic metadata.
    pub metadata: Map<String, Value>,
    /// AI-generated data, if any.
    pub ai_generated_data: Option<Map<String, Value>>,
}

impl Activity {
    /// Builds the stored activity once the store has assigned a sequence
    /// number.
    #[must_use]
    pub fn sequenced(
        new_activity: NewActivity,
        task_id: TaskId,
        sequence_number: SequenceNumber,
    ) -> Self {
        Self {
            id: ActivityId::new(),
            task_id,
            sequence_number,
            links: new_activity.links,
            timestamp: new_activity.timestamp,
            body: new_activity.body,
            metadata: new_activity.metadata,
            ai_generated_data: new_activity.ai_generated_data,
        }
    }

    /// Reconstructs an activity from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedActivityData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            sequence_number: data.sequence_number,
            links: data.links,
            timestamp: data.timestamp,
            body: data.body,
            metadata: data.metadata,
            ai_generated_data: data.ai_generated_data,
        }
    }

    /// Returns the activity identifier.
    #[must_use]
    pub const fn id(&self) -> ActivityId {
        self.id
    }

    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the position within the task.
    #[must_use]
    pub const fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }

    /// Returns the links to related activities.
    #[must_use]
    pub const fn links(&self) -> &ActivityLinks {
        &self.links
    }

    /// Returns the time the activity occurred.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the validated body.
    #[must_use]
    pub const fn body(&self) -> &ActivityBody {
        &self.body
    }

    /// Returns the activity type string.
    #[must_use]
    pub fn activity_type(&self) -> &str {
        self.body.activity_type()
    }

    /// Returns the generic metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Returns the AI-generated data, if any.
    #[must_use]
    pub const fn ai_generated_data(&self) -> Option<&Map<String, Value>> {
        self.ai_generated_data.as_ref()
    }
}

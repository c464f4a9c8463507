//! Ingested events and the canonical inbound event shape.

use super::{EventId, ParseEventStatusError, TaskDomainError, TaskId, WorkspaceId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Processing status of an ingested event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Not yet processed.
    Unclassified,
    /// Processed successfully.
    Classified,
    /// Processing failed.
    Failed,
}

impl EventStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::Classified => "classified",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for EventStatus {
    type Error = ParseEventStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "unclassified" => Ok(Self::Unclassified),
            "classified" => Ok(Self::Classified),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseEventStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-agnostic inbound event produced by webhook adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// Provider-native event identifier used for de-duplication.
    pub event_id: String,
    /// Event type, for example `message` or `payment.succeeded`.
    pub event_type: String,
    /// Time the provider emitted the event.
    pub timestamp: DateTime<Utc>,
    /// Originating provider, for example `slack`.
    pub provider: String,
    /// Sender details, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Value>,
    /// Channel the event arrived on, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Text content, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Provider-specific event body.
    #[serde(default)]
    pub event: Value,
    /// Raw provider payload used for watcher matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_payload: Option<Value>,
}

impl CanonicalEvent {
    /// Creates an event with the required fields.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        event_type: impl Into<String>,
        event_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            timestamp,
            provider: provider.into(),
            sender: None,
            channel: None,
            text: None,
            event: Value::Null,
            original_payload: None,
        }
    }

    /// Sets the text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the channel.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Sets the sender.
    #[must_use]
    pub fn with_sender(mut self, sender: Value) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Sets the provider-specific event body.
    #[must_use]
    pub fn with_event(mut self, event: Value) -> Self {
        self.event = event;
        self
    }

    /// Sets the raw provider payload.
    #[must_use]
    pub fn with_original_payload(mut self, payload: Value) -> Self {
        self.original_payload = Some(payload);
        self
    }

    /// Returns the task this event explicitly refers to, if the event body
    /// carries a parseable `task_id`.
    #[must_use]
    pub fn context_task_id(&self) -> Option<TaskId> {
        self.event
            .get("task_id")
            .and_then(Value::as_str)
            .and_then(|raw| uuid::Uuid::parse_str(raw).ok())
            .map(TaskId::from_uuid)
    }
}

/// Ingested event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    workspace_ids: Vec<WorkspaceId>,
    created_at: DateTime<Utc>,
    provider_name: Option<String>,
    provider_event_id: Option<String>,
    event_type: String,
    status: EventStatus,
    content: Option<String>,
    metadata: Option<Value>,
    classification_notes: Option<String>,
}

/// Parameter object for reconstructing a persisted event.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedEventData {
    /// Persisted event identifier.
    pub id: EventId,
    /// Workspaces the event belongs to.
    pub workspace_ids: Vec<WorkspaceId>,
    /// Ingestion timestamp.
    pub created_at: DateTime<Utc>,
    /// Originating provider, if known.
    pub provider_name: Option<String>,
    /// Provider-native identifier, if known.
    pub provider_event_id: Option<String>,
    /// Event type.
    pub event_type: String,
    /// Processing status.
    pub status: EventStatus,
    /// Text content, if any.
    pub content: Option<String>,
    /// Raw payload, if any.
    pub metadata: Option<Value>,
    /// Processing notes, if any.
    pub classification_notes: Option<String>,
}

impl Event {
    /// Records a canonical event for the given workspaces.
    ///
    /// Repeated workspaces are kept once, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NoWorkspaces`] when `workspace_ids` is
    /// empty and [`TaskDomainError::EmptyEventType`] when the event type is
    /// blank.
    pub fn record(
        canonical: &CanonicalEvent,
        mut workspace_ids: Vec<WorkspaceId>,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        let mut seen = HashSet::new();
        workspace_ids.retain(|workspace_id| seen.insert(workspace_id.clone()));
        if workspace_ids.is_empty() {
            return Err(TaskDomainError::NoWorkspaces);
        }
        let event_type = canonical.event_type.trim().to_owned();
        if event_type.is_empty() {
            return Err(TaskDomainError::EmptyEventType);
        }
        let provider_event_id = Some(canonical.event_id.trim().to_owned())
            .filter(|value| !value.is_empty());

        Ok(Self {
            id: EventId::new(),
            workspace_ids,
            created_at: clock.utc(),
            provider_name: Some(canonical.provider.clone()),
            provider_event_id,
            event_type,
            status: EventStatus::Unclassified,
            content: canonical.text.clone(),
            metadata: canonical.original_payload.clone(),
            classification_notes: None,
        })
    }

    /// Reconstructs an event from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedEventData) -> Self {
        Self {
            id: data.id,
            workspace_ids: data.workspace_ids,
            created_at: data.created_at,
            provider_name: data.provider_name,
            provider_event_id: data.provider_event_id,
            event_type: data.event_type,
            status: data.status,
            content: data.content,
            metadata: data.metadata,
            classification_notes: data.classification_notes,
        }
    }

    /// Returns the event identifier.
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// Returns the workspaces the event belongs to.
    #[must_use]
    pub fn workspace_ids(&self) -> &[WorkspaceId] {
        &self.workspace_ids
    }

    /// Returns the ingestion timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the originating provider, if known.
    #[must_use]
    pub fn provider_name(&self) -> Option<&str> {
        self.provider_name.as_deref()
    }

    /// Returns the provider-native identifier, if known.
    #[must_use]
    pub fn provider_event_id(&self) -> Option<&str> {
        self.provider_event_id.as_deref()
    }

    /// Returns the event type.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Returns the processing status.
    #[must_use]
    pub const fn status(&self) -> EventStatus {
        self.status
    }

    /// Returns the text content, if any.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Returns the raw payload, if any.
    #[must_use]
    pub const fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    /// Returns the processing notes, if any.
    #[must_use]
    pub fn classification_notes(&self) -> Option<&str> {
        self.classification_notes.as_deref()
    }

    /// Returns the de-duplication keys of this event, one per workspace.
    ///
    /// Empty when the provider or its event identifier is unknown.
    #[must_use]
    pub fn provider_keys(&self) -> Vec<ProviderEventKey> {
        let (Some(provider_name), Some(provider_event_id)) =
            (&self.provider_name, &self.provider_event_id)
        else {
            return Vec::new();
        };
        self.workspace_ids
            .iter()
            .map(|workspace_id| ProviderEventKey {
                workspace_id: workspace_id.clone(),
                provider_name: provider_name.clone(),
                provider_event_id: provider_event_id.clone(),
            })
            .collect()
    }

    /// Marks the event classified.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EventAlreadyProcessed`] unless the event is
    /// unclassified.
    pub fn mark_classified(&mut self, notes: impl Into<String>) -> Result<(), TaskDomainError> {
        self.finish(EventStatus::Classified, notes.into())
    }

    /// Marks the event failed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EventAlreadyProcessed`] unless the event is
    /// unclassified.
    pub fn mark_failed(&mut self, notes: impl Into<String>) -> Result<(), TaskDomainError> {
        self.finish(EventStatus::Failed, notes.into())
    }

    fn finish(&mut self, status: EventStatus, notes: String) -> Result<(), TaskDomainError> {
        if self.status != EventStatus::Unclassified {
            return Err(TaskDomainError::EventAlreadyProcessed {
                event_id: self.id,
                status: self.status,
            });
        }
        self.status = status;
        self.classification_notes = Some(notes);
        Ok(())
    }
}

/// De-duplication key for provider events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderEventKey {
    /// Workspace the event was ingested for.
    pub workspace_id: WorkspaceId,
    /// Originating provider.
    pub provider_name: String,
    /// Provider-native event identifier.
    pub provider_event_id: String,
}

//! Event watchers and structural payload matching.

use super::{EventWatcherId, TaskDomainError, TaskId, WorkspaceId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structural query matched against raw provider payloads.
///
/// A payload matches when it contains the query: every key of the query is
/// present with a matching value. Objects are compared recursively, a query
/// array matches when each of its elements is contained in some element of
/// the payload array, and scalars compare by equality.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use switchboard::task::domain::MatchQuery;
///
/// let query = MatchQuery::new(json!({ "event": { "channel": "C1" } })).expect("object query");
/// assert!(query.matches(&json!({ "event": { "channel": "C1", "text": "hi" } })));
/// assert!(!query.matches(&json!({ "event": { "channel": "C2" } })));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct MatchQuery(Map<String, Value>);

impl MatchQuery {
    /// Creates a query from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidMatchQuery`] when `query` is not an
    /// object.
    pub fn new(query: Value) -> Result<Self, TaskDomainError> {
        match query {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(TaskDomainError::InvalidMatchQuery(other.to_string())),
        }
    }

    /// Returns the query document.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns `true` if `payload` contains this query.
    #[must_use]
    pub fn matches(&self, payload: &Value) -> bool {
        payload
            .as_object()
            .is_some_and(|fields| object_contains(fields, &self.0))
    }
}

impl TryFrom<Value> for MatchQuery {
    type Error = TaskDomainError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MatchQuery> for Value {
    fn from(query: MatchQuery) -> Self {
        Self::Object(query.0)
    }
}

fn object_contains(payload: &Map<String, Value>, query: &Map<String, Value>) -> bool {
    query.iter().all(|(key, expected)| {
        payload
            .get(key)
            .is_some_and(|actual| value_contains(actual, expected))
    })
}

fn value_contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(payload), Value::Object(query)) => object_contains(payload, query),
        (Value::Array(payload), Value::Array(query)) => query
            .iter()
            .all(|wanted| payload.iter().any(|item| value_contains(item, wanted))),
        _ => actual == expected,
    }
}

/// Parameter object for creating a watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEventWatcher {
    task_id: TaskId,
    workspace_id: WorkspaceId,
    provider_name: String,
    event_type: String,
    team_id: Option<String>,
    organization_id: Option<String>,
    match_query: MatchQuery,
}

impl NewEventWatcher {
    /// Creates a watcher definition with the required fields.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        workspace_id: WorkspaceId,
        provider_name: impl Into<String>,
        event_type: impl Into<String>,
        match_query: MatchQuery,
    ) -> Self {
        Self {
            task_id,
            workspace_id,
            provider_name: provider_name.into(),
            event_type: event_type.into(),
            team_id: None,
            organization_id: None,
            match_query,
        }
    }

    /// Scopes the watcher to a team.
    #[must_use]
    pub fn with_team_id(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    /// Scopes the watcher to an organization.
    #[must_use]
    pub fn with_organization_id(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }
}

/// Stored rule that links future events to an existing task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWatcher {
    id: EventWatcherId,
    task_id: TaskId,
    workspace_id: WorkspaceId,
    provider_name: String,
    event_type: String,
    team_id: Option<String>,
    organization_id: Option<String>,
    match_query: MatchQuery,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedEventWatcherData {
    /// Watcher identifier.
    pub id: EventWatcherId,
    /// Owning task.
    pub task_id: TaskId,
    /// Workspace scope.
    pub workspace_id: WorkspaceId,
    /// Provider filter.
    pub provider_name: String,
    /// Event type filter.
    pub event_type: String,
    /// Optional team scope.
    pub team_id: Option<String>,
    /// Optional organization scope.
    pub organization_id: Option<String>,
    /// Structural payload query.
    pub match_query: MatchQuery,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl EventWatcher {
    /// Creates a watcher from a parameter object.
    #[must_use]
    pub fn create(new_watcher: NewEventWatcher, clock: &impl Clock) -> Self {
        Self {
            id: EventWatcherId::new(),
            task_id: new_watcher.task_id,
            workspace_id: new_watcher.workspace_id,
            provider_name: new_watcher.provider_name,
            event_type: new_watcher.event_type,
            team_id: new_watcher.team_id,
            organization_id: new_watcher.organization_id,
            match_query: new_watcher.match_query,
            created_at: clock.utc(),
        }
    }

    /// Reconstructs a watcher from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedEventWatcherData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            workspace_id: data.workspace_id,
            provider_name: data.provider_name,
            event_type: data.event_type,
            team_id: data.team_id,
            organization_id: data.organization_id,
            match_query: data.match_query,
            created_at: data.created_at,
        }
    }

    /// Returns the watcher identifier.
    #[must_use]
    pub const fn id(&self) -> EventWatcherId {
        self.id
    }

    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the workspace scope.
    #[must_use]
    pub const fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }

    /// Returns the provider filter.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Returns the event type filter.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Returns the team scope, if any.
    #[must_use]
    pub fn team_id(&self) -> Option<&str> {
        self.team_id.as_deref()
    }

    /// Returns the organization scope, if any.
    #[must_use]
    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    /// Returns the structural payload query.
    #[must_use]
    pub const fn match_query(&self) -> &MatchQuery {
        &self.match_query
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns `true` if the raw `payload` satisfies the scope and the
    /// structural query of this watcher.
    #[must_use]
    pub fn matches_payload(&self, payload: &Value) -> bool {
        scope_matches(payload, "team_id", self.team_id.as_deref())
            && scope_matches(payload, "organization_id", self.organization_id.as_deref())
            && self.match_query.matches(payload)
    }
}

fn scope_matches(payload: &Value, key: &str, expected: Option<&str>) -> bool {
    expected.is_none_or(|wanted| payload.get(key).and_then(Value::as_str) == Some(wanted))
}

//! Diesel row models for task orchestration persistence.

use super::schema::{activities, event_provider_keys, event_watchers, events, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

/// Task row, used for reads, inserts, and full-row updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct TaskRow {
    pub id: Uuid,
    pub workspace_id: String,
    pub name: String,
    pub task_type: String,
    pub status: String,
    pub priority: Option<String>,
    pub authorized_users: Option<Value>,
    pub triggering_event_id: Option<Uuid>,
    pub input: Value,
    pub output: Option<Value>,
    pub metadata: Value,
    pub provider_name: Option<String>,
    pub ai_description: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventRow {
    pub id: Uuid,
    pub workspace_ids: Value,
    pub created_at: DateTime<Utc>,
    pub provider_name: Option<String>,
    pub provider_event_id: Option<String>,
    pub event_type: String,
    pub status: String,
    pub content: Option<String>,
    pub metadata: Option<Value>,
    pub classification_notes: Option<String>,
}

/// Provider de-duplication key row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = event_provider_keys)]
pub struct ProviderKeyRow {
    pub workspace_id: String,
    pub provider_name: String,
    pub provider_event_id: String,
    pub event_id: Uuid,
}

/// Event watcher row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = event_watchers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WatcherRow {
    pub id: Uuid,
    pub task_id: Uuid,
    pub workspace_id: String,
    pub provider_name: String,
    pub event_type: String,
    pub team_id: Option<String>,
    pub organization_id: Option<String>,
    pub match_query: Value,
    pub created_at: DateTime<Utc>,
}

/// Activity row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = activities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ActivityRow {
    pub id: Uuid,
    pub task_id: Uuid,
    pub sequence_number: i64,
    pub parent_activity_id: Option<Uuid>,
    pub prev_activity_id: Option<Uuid>,
    pub next_activity_id: Option<Uuid>,
    pub activity_type: String,
    pub occurred_at: DateTime<Utc>,
    pub message_id: Option<Uuid>,
    pub message_content: Option<String>,
    pub message_metadata: Option<Value>,
    pub metadata: Value,
    pub ai_generated_data: Option<Value>,
}

//! Diesel schema for task orchestration persistence.

diesel::table! {
    /// Task records.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning workspace.
        #[max_length = 255]
        workspace_id -> Varchar,
        /// Task name.
        name -> Text,
        /// Task type.
        #[max_length = 50]
        task_type -> Varchar,
        /// Lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Optional priority.
        #[max_length = 50]
        priority -> Nullable<Varchar>,
        /// Optional user allow-list as a JSON array.
        authorized_users -> Nullable<Jsonb>,
        /// Event that caused the task.
        triggering_event_id -> Nullable<Uuid>,
        /// Task input.
        input -> Jsonb,
        /// Task output.
        output -> Nullable<Jsonb>,
        /// Task metadata.
        metadata -> Jsonb,
        /// Related provider.
        #[max_length = 255]
        provider_name -> Nullable<Varchar>,
        /// AI-generated description.
        ai_description -> Nullable<Text>,
        /// Scheduled time.
        scheduled_for -> Nullable<Timestamptz>,
        /// Expiry time.
        expires_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Ingested events.
    events (id) {
        /// Event identifier.
        id -> Uuid,
        /// Workspaces as a JSON array of strings.
        workspace_ids -> Jsonb,
        /// Ingestion timestamp.
        created_at -> Timestamptz,
        /// Originating provider.
        #[max_length = 255]
        provider_name -> Nullable<Varchar>,
        /// Provider-native identifier.
        #[max_length = 255]
        provider_event_id -> Nullable<Varchar>,
        /// Event type.
        #[max_length = 255]
        event_type -> Varchar,
        /// Processing status.
        #[max_length = 50]
        status -> Varchar,
        /// Text content.
        content -> Nullable<Text>,
        /// Raw payload.
        metadata -> Nullable<Jsonb>,
        /// Processing notes.
        classification_notes -> Nullable<Text>,
    }
}

diesel::table! {
    /// De-duplication keys of provider events, one row per workspace.
    event_provider_keys (workspace_id, provider_name, provider_event_id) {
        /// Workspace the event was ingested for.
        #[max_length = 255]
        workspace_id -> Varchar,
        /// Originating provider.
        #[max_length = 255]
        provider_name -> Varchar,
        /// Provider-native identifier.
        #[max_length = 255]
        provider_event_id -> Varchar,
        /// Stored event.
        event_id -> Uuid,
    }
}

diesel::table! {
    /// Event watchers.
    event_watchers (id) {
        /// Watcher identifier.
        id -> Uuid,
        /// Owning task.
        task_id -> Uuid,
        /// Workspace scope.
        #[max_length = 255]
        workspace_id -> Varchar,
        /// Provider filter.
        #[max_length = 255]
        provider_name -> Varchar,
        /// Event type filter.
        #[max_length = 255]
        event_type -> Varchar,
        /// Optional team scope.
        #[max_length = 255]
        team_id -> Nullable<Varchar>,
        /// Optional organization scope.
        #[max_length = 255]
        organization_id -> Nullable<Varchar>,
        /// Structural payload query.
        match_query -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Activity log.
    activities (id) {
        /// Activity identifier.
        id -> Uuid,
        /// Owning task.
        task_id -> Uuid,
        /// Position within the task.
        sequence_number -> Int8,
        /// Parent activity.
        parent_activity_id -> Nullable<Uuid>,
        /// Preceding activity.
        prev_activity_id -> Nullable<Uuid>,
        /// Following activity.
        next_activity_id -> Nullable<Uuid>,
        /// Activity type.
        #[max_length = 100]
        activity_type -> Varchar,
        /// Time the activity occurred.
        occurred_at -> Timestamptz,
        /// Message identifier.
        message_id -> Nullable<Uuid>,
        /// Message text.
        message_content -> Nullable<Text>,
        /// Message metadata.
        message_metadata -> Nullable<Jsonb>,
        /// Generic metadata.
        metadata -> Jsonb,
        /// AI-generated data.
        ai_generated_data -> Nullable<Jsonb>,
    }
}

diesel::table! {
    /// Last assigned activity sequence number per task.
    task_activity_counters (task_id) {
        /// Owning task.
        task_id -> Uuid,
        /// Last assigned sequence number.
        last_sequence -> Int8,
    }
}

diesel::joinable!(event_watchers -> tasks (task_id));
diesel::joinable!(activities -> tasks (task_id));
diesel::joinable!(task_activity_counters -> tasks (task_id));

diesel::allow_tables_to_appear_in_same_query!(
    tasks,
    events,
    event_provider_keys,
    event_watchers,
    activities,
    task_activity_counters,
);

//! In-memory integration tests for the event-to-task pipeline.

use std::sync::Arc;

use super::helpers::{ScriptedModel, clock, invoice_router, slack_message, store, workspace};
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::json;
use switchboard::task::{
    adapters::{
        RouterToolExecutor,
        llm::{LlmTaskClassifier, LlmToolSelector},
        memory::InMemoryTaskStore,
    },
    domain::{EventStatus, TaskStatus, TaskType},
    ports::{ActivityRepository, EventRepository, TaskRepository},
    services::{EventIntakeService, IncomingEvent, TaskProcessor},
};

fn reminder_classification() -> serde_json::Value {
    json!({
        "new_tasks": [{
            "name": "Check invoice INV-7",
            "ai_description": "Dana asked whether invoice INV-7 went out.",
            "priority": "high",
            "input": { "number": "INV-7" },
            "watcher": {
                "provider_name": "slack",
                "event_type": "message",
                "match_query": { "event": { "channel": "C1" } }
            }
        }],
        "existing_task_ids": [],
        "notes": "Created an invoice check."
    })
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn event_becomes_completed_task(
    store: Arc<InMemoryTaskStore>,
    clock: Arc<DefaultClock>,
) -> Result<(), eyre::Report> {
    let classifier_model = ScriptedModel::replying([
        json!({ "decision": "new_task", "reason": "Explicit request." }),
        reminder_classification(),
    ]);
    let intake = EventIntakeService::new(Arc::clone(&store), Arc::clone(&clock)).with_classifier(
        Arc::new(LlmTaskClassifier::new(Arc::clone(&classifier_model)).with_triage(true)),
    );

    let report = intake
        .process_incoming_event(IncomingEvent::new(
            slack_message("ev-100", "did invoice INV-7 go out?"),
            vec![workspace("acme")],
        ))
        .await?;
    eyre::ensure!(report.tasks.len() == 1, "expected one task, got {}", report.tasks.len());
    let task = report
        .tasks
        .into_iter()
        .next()
        .ok_or_else(|| eyre::eyre!("missing created task"))?;
    eyre::ensure!(task.task_type() == TaskType::Watcher, "task should watch the channel");
    eyre::ensure!(
        classifier_model.schema_names() == ["triage", "classification"],
        "unexpected model calls: {:?}",
        classifier_model.schema_names()
    );

    let router = Arc::new(invoice_router());
    let selector_model = ScriptedModel::replying([json!({
        "tool_calls": [{ "tool_name": "invoices_lookup", "arguments": { "number": "INV-7" } }],
        "notes": "Look the invoice up."
    })]);
    let processor = TaskProcessor::new(Arc::clone(&store), clock)
        .with_selector(Arc::new(LlmToolSelector::new(selector_model)))
        .with_executor(Arc::new(RouterToolExecutor::new(Arc::clone(&router))))
        .with_tools(router.tool_catalog());

    let outcome = processor.execute(task.clone()).await;
    eyre::ensure!(
        outcome.status == TaskStatus::Completed,
        "task ended as {} with {:?}",
        outcome.status,
        outcome.error
    );

    let stored = store
        .find_task(task.id())
        .await?
        .ok_or_else(|| eyre::eyre!("task disappeared"))?;
    eyre::ensure!(
        stored.output() == Some(&json!([{
            "tool_name": "invoices_lookup",
            "output": { "number": "INV-7", "status": "sent" }
        }])),
        "unexpected output {:?}",
        stored.output()
    );
    let kinds: Vec<String> = store
        .list_activities(task.id())
        .await?
        .iter()
        .map(|activity| activity.activity_type().to_owned())
        .collect();
    eyre::ensure!(
        kinds == ["system_update", "tool_call", "tool_result", "system_update"],
        "unexpected activity trail {kinds:?}"
    );

    let event = store
        .find_event(report.event_id)
        .await?
        .ok_or_else(|| eyre::eyre!("event disappeared"))?;
    eyre::ensure!(event.status() == EventStatus::Classified, "event not classified");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn follow_up_event_reaches_watched_task(
    store: Arc<InMemoryTaskStore>,
    clock: Arc<DefaultClock>,
) -> Result<(), eyre::Report> {
    let model = ScriptedModel::replying([
        reminder_classification(),
        json!({ "new_tasks": [], "existing_task_ids": [], "notes": "Chit-chat." }),
    ]);
    let intake = EventIntakeService::new(Arc::clone(&store), clock)
        .with_classifier(Arc::new(LlmTaskClassifier::new(model)));

    let first = intake
        .process_incoming_event(IncomingEvent::new(
            slack_message("ev-1", "did invoice INV-7 go out?"),
            vec![workspace("acme")],
        ))
        .await?;
    let watched = first
        .tasks
        .first()
        .map(|task| task.id())
        .ok_or_else(|| eyre::eyre!("missing created task"))?;

    let second = intake
        .process_incoming_event(IncomingEvent::new(
            slack_message("ev-2", "any news?"),
            vec![workspace("acme")],
        ))
        .await?;

    let activated: Vec<_> = second.tasks.iter().map(|task| task.id()).collect();
    eyre::ensure!(activated == [watched], "expected the watched task, got {activated:?}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn irrelevant_chatter_creates_nothing(
    store: Arc<InMemoryTaskStore>,
    clock: Arc<DefaultClock>,
) -> Result<(), eyre::Report> {
    let model = ScriptedModel::replying([json!({
        "decision": "irrelevant",
        "reason": "A greeting."
    })]);
    let intake = EventIntakeService::new(Arc::clone(&store), clock)
        .with_classifier(Arc::new(LlmTaskClassifier::new(Arc::clone(&model)).with_triage(true)));

    let report = intake
        .process_incoming_event(IncomingEvent::new(
            slack_message("ev-9", "morning all"),
            vec![workspace("acme")],
        ))
        .await?;

    eyre::ensure!(report.tasks.is_empty(), "no task should be created");
    eyre::ensure!(model.schema_names() == ["triage"], "classification should be skipped");
    let recent = store
        .find_recent_tasks(&workspace("acme"), None, 10)
        .await?;
    eyre::ensure!(recent.is_empty(), "store should hold no tasks");
    let notes = store
        .find_event(report.event_id)
        .await?
        .and_then(|event| event.classification_notes().map(str::to_owned));
    eyre::ensure!(
        notes.as_deref() == Some("Triage: irrelevant. A greeting."),
        "unexpected notes {notes:?}"
    );
    Ok(())
}

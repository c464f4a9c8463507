//! Shared world state for event intake BDD scenarios.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockable::DefaultClock;
use rstest::fixture;
use serde_json::json;
use switchboard::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{CanonicalEvent, ClassificationResult, TaskId, WorkspaceId},
    ports::{ClassificationError, ClassificationRequest, TaskClassifier},
    services::{EventIntakeService, IncomingEvent, IntakeError, IntakeReport},
};

/// Intake service type used by the BDD world.
pub type TestIntakeService = EventIntakeService<InMemoryTaskStore, DefaultClock>;

/// Classifier replaying scripted answers; an exhausted script finds nothing.
#[derive(Default)]
pub struct ScriptedClassifier {
    answers: Mutex<VecDeque<Result<ClassificationResult, ClassificationError>>>,
}

impl ScriptedClassifier {
    /// Queues an answer for the next classification.
    pub fn push(&self, answer: Result<ClassificationResult, ClassificationError>) {
        if let Ok(mut answers) = self.answers.lock() {
            answers.push_back(answer);
        }
    }
}

#[async_trait]
impl TaskClassifier for ScriptedClassifier {
    async fn classify(
        &self,
        _request: ClassificationRequest,
    ) -> Result<ClassificationResult, ClassificationError> {
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .unwrap_or_else(|| Ok(ClassificationResult::empty("Nothing to do.")))
    }
}

/// Scenario world for event intake behaviour tests.
pub struct IntakeWorld {
    pub store: Arc<InMemoryTaskStore>,
    pub classifier: Arc<ScriptedClassifier>,
    pub service: TestIntakeService,
    pub watcher_task: Option<TaskId>,
    pub last_result: Option<Result<IntakeReport, IntakeError>>,
}

impl IntakeWorld {
    /// Creates a world with an empty store and script.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryTaskStore::new());
        let classifier = Arc::new(ScriptedClassifier::default());
        let service = EventIntakeService::new(Arc::clone(&store), Arc::new(DefaultClock))
            .with_classifier(Arc::clone(&classifier) as Arc<dyn TaskClassifier>);

        Self {
            store,
            classifier,
            service,
            watcher_task: None,
            last_result: None,
        }
    }

    /// Returns the last successful intake report.
    ///
    /// # Errors
    ///
    /// Returns an error if no event was processed or intake failed.
    pub fn report(&self) -> Result<&IntakeReport, eyre::Report> {
        match self.last_result.as_ref() {
            Some(Ok(report)) => Ok(report),
            Some(Err(err)) => Err(eyre::eyre!("intake failed: {err}")),
            None => Err(eyre::eyre!("no event processed in scenario")),
        }
    }
}

impl Default for IntakeWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> IntakeWorld {
    IntakeWorld::default()
}

/// Builds a Slack message delivered to the `acme` workspace.
///
/// # Errors
///
/// Returns an error if the workspace identifier or timestamp is invalid.
pub fn slack_delivery(
    event_id: &str,
    text: &str,
    channel: &str,
) -> Result<IncomingEvent, eyre::Report> {
    let timestamp = Utc
        .with_ymd_and_hms(2026, 3, 6, 9, 0, 0)
        .single()
        .ok_or_else(|| eyre::eyre!("invalid scenario timestamp"))?;
    let event = CanonicalEvent::new("slack", "message", event_id, timestamp)
        .with_text(text)
        .with_channel(channel)
        .with_original_payload(json!({
            "event": { "channel": channel, "text": text }
        }));
    Ok(IncomingEvent::new(event, vec![WorkspaceId::new("acme")?]))
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

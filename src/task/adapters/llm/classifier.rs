//! Model-backed task classifier.

use super::prompts::{
    CLASSIFY_PROMPT, CLASSIFY_SYSTEM, TRIAGE_PROMPT, TRIAGE_SYSTEM, classification_schema, render,
    triage_schema,
};
use super::structured::generate_validated;
use crate::task::domain::{ClassificationResult, Triage, TriageDecision};
use crate::task::ports::{
    ClassificationError, ClassificationRequest, StructuredModel, TaskClassifier,
};
use async_trait::async_trait;
use minijinja::context;
use std::sync::Arc;
use tracing::{debug, warn};

/// Classifier that asks a structured-output model which tasks an event
/// creates or refers to.
///
/// With triage enabled, a first, cheaper call sorts the event into
/// `new_task`, `old_task`, or `irrelevant`; irrelevant events end there with
/// an empty result.
#[derive(Debug)]
pub struct LlmTaskClassifier<M> {
    model: Arc<M>,
    triage: bool,
}

impl<M> Clone for LlmTaskClassifier<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            triage: self.triage,
        }
    }
}

impl<M: StructuredModel> LlmTaskClassifier<M> {
    /// Creates a classifier without triage.
    #[must_use]
    pub const fn new(model: Arc<M>) -> Self {
        Self {
            model,
            triage: false,
        }
    }

    /// Enables or disables the triage pass.
    #[must_use]
    pub const fn with_triage(mut self, enabled: bool) -> Self {
        self.triage = enabled;
        self
    }

    async fn run_triage(
        &self,
        request: &ClassificationRequest,
    ) -> Result<Triage, ClassificationError> {
        let prompt = render(
            TRIAGE_PROMPT,
            context! { text => request.event.text.as_deref().unwrap_or_default() },
        )?;
        generate_validated(
            self.model.as_ref(),
            TRIAGE_SYSTEM.to_owned(),
            prompt,
            "triage",
            triage_schema(),
        )
        .await
    }

    fn classification_prompt(
        request: &ClassificationRequest,
    ) -> Result<String, ClassificationError> {
        let event = &request.event;
        let sender = event
            .sender
            .as_ref()
            .map_or_else(|| "unknown".to_owned(), ToString::to_string);
        let recent_tasks = if request.recent_tasks.is_empty() {
            String::new()
        } else {
            serde_json::to_string_pretty(&request.recent_tasks)
                .map_err(|err| ClassificationError::Prompt(err.to_string()))?
        };
        render(
            CLASSIFY_PROMPT,
            context! {
                sender => sender,
                provider => event.provider,
                event_type => event.event_type,
                channel => event.channel,
                text => event.text.as_deref().unwrap_or_default(),
                now => request.now.to_rfc3339(),
                recent_tasks => recent_tasks,
            },
        )
    }
}

#[async_trait]
impl<M: StructuredModel> TaskClassifier for LlmTaskClassifier<M> {
    async fn classify(
        &self,
        request: ClassificationRequest,
    ) -> Result<ClassificationResult, ClassificationError> {
        if self.triage {
            let verdict = self.run_triage(&request).await?;
            debug!(decision = ?verdict.decision, reason = %verdict.reason, "event triaged");
            if verdict.decision == TriageDecision::Irrelevant {
                return Ok(ClassificationResult::empty(format!(
                    "Triage: irrelevant. {}",
                    verdict.reason
                )));
            }
        }

        let prompt = Self::classification_prompt(&request)?;
        let mut result: ClassificationResult = generate_validated(
            self.model.as_ref(),
            CLASSIFY_SYSTEM.to_owned(),
            prompt,
            "classification",
            classification_schema(),
        )
        .await?;

        let offered = &request.recent_tasks;
        result.existing_task_ids.retain(|id| {
            let known = offered.iter().any(|task| task.id == *id);
            if !known {
                warn!(task_id = %id, "dropping task reference outside the offered context");
            }
            known
        });
        Ok(result)
    }
}

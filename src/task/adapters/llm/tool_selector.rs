//! Model-backed tool selector.

use super::prompts::{SELECT_PROMPT, SELECT_SYSTEM, render, selection_schema};
use super::structured::generate_validated;
use crate::router::domain::ToolDescriptor;
use crate::task::domain::{Task, ToolSelection};
use crate::task::ports::{ClassificationError, StructuredModel, ToolSelector};
use async_trait::async_trait;
use minijinja::context;
use std::sync::Arc;

/// Selector that asks a structured-output model which catalog tools to run
/// for a task.
#[derive(Debug)]
pub struct LlmToolSelector<M> {
    model: Arc<M>,
}

impl<M> Clone for LlmToolSelector<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
        }
    }
}

impl<M: StructuredModel> LlmToolSelector<M> {
    /// Creates a selector.
    #[must_use]
    pub const fn new(model: Arc<M>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<M: StructuredModel> ToolSelector for LlmToolSelector<M> {
    async fn select(
        &self,
        task: &Task,
        tools: &[ToolDescriptor],
    ) -> Result<ToolSelection, ClassificationError> {
        if tools.is_empty() {
            return Ok(ToolSelection {
                tool_calls: Vec::new(),
                notes: "No tools are available.".to_owned(),
            });
        }

        let catalog = serde_json::to_string_pretty(tools)
            .map_err(|err| ClassificationError::Prompt(err.to_string()))?;
        let task_json = serde_json::to_string_pretty(task)
            .map_err(|err| ClassificationError::Prompt(err.to_string()))?;
        let system = render(SELECT_SYSTEM, context! { tools => catalog })?;
        let prompt = render(SELECT_PROMPT, context! { task => task_json })?;

        let selection: ToolSelection = generate_validated(
            self.model.as_ref(),
            system,
            prompt,
            "tool_selection",
            selection_schema(),
        )
        .await?;

        if let Some(unknown) = selection
            .tool_calls
            .iter()
            .find(|call| !tools.iter().any(|tool| tool.name == call.tool_name))
        {
            return Err(ClassificationError::UnknownTool(unknown.tool_name.clone()));
        }
        Ok(selection)
    }
}

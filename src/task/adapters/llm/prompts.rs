//! Prompt text and result schemas for the model-backed adapters.

use crate::router::domain::JsonSchema;
use crate::task::ports::ClassificationError;
use minijinja::Environment;
use serde::Serialize;
use serde_json::json;

pub(super) const TRIAGE_SYSTEM: &str = "\
You triage inbound messages. Categorize the intent of one message:
- new_task: the sender explicitly asks for an action, a reminder, a ticket, or a scheduled item.
- old_task: the sender refers to earlier work, for example an update, a follow-up, or a completion.
- irrelevant: conversation, acknowledgements, or anything without a clear request.

Decide from the message text only and do not invent context.
When in doubt, answer irrelevant.
Reply with the JSON object only.";

pub(super) const TRIAGE_PROMPT: &str = r#"A user has sent the following message:
---
"{{ text }}"
---
Classify the intent of this message and reply with the required JSON object."#;

pub(super) const CLASSIFY_SYSTEM: &str = "\
You are an executive assistant that turns inbound events into tasks.

For every new request in the event add one entry to new_tasks:
- name: a short, active headline, for example \"Draft Q4 sales report\".
- ai_description: the full request including who asked and where it came from.
- priority: critical for outages, high for explicit urgency, medium for ordinary requests, low for casual reminders.
- input: structured parameters mentioned in the request, if any.
- scheduled_for: an ISO 8601 UTC timestamp, only when a deadline or future time is given. Use the current time as reference and schedule only the next occurrence of recurring requests.
- watcher: only when the sender asks for a rule such as \"every time\" or \"when a new\". It names the provider, the event type, and a match_query object that future payloads must contain.

List in existing_task_ids the identifiers of recent tasks the event updates or refers to. Use only identifiers from the recent task list.

Leave both lists empty when the event needs no action, and explain the decision briefly in notes.";

pub(super) const CLASSIFY_PROMPT: &str = r#"A new event has arrived.

Request details:
- From: {{ sender }}
- Source: {{ provider }} ({{ event_type }})
{%- if channel %}
- Channel: {{ channel }}
{%- endif %}
- Message: "{{ text }}"

Reference information:
- Current time: {{ now }}
{%- if recent_tasks %}
- Recent tasks:
{{ recent_tasks }}
{%- else %}
- Recent tasks: none
{%- endif %}

Reply with the classification JSON object now."#;

pub(super) const SELECT_SYSTEM: &str = r"You decompose a task into a sequence of concrete tool calls.

The task's goal is described by its name and ai_description; its input holds the data to work with.
1. Analyse the task details and its input.
2. Examine the available tools and their input schemas.
3. Produce the tool calls, in order, with arguments that satisfy each schema.
4. Outputs of one call are not fed into the next automatically; reason about dependencies yourself.
5. If no tool fits, return an empty tool_calls list.

Use only tool names from the list below.

Available tools:
{{ tools }}";

pub(super) const SELECT_PROMPT: &str = r"Task details:
```json
{{ task }}
```
Produce the tool calls required to complete this task.";

/// Renders a template with a serializable context.
pub(super) fn render(
    template: &str,
    context: impl Serialize,
) -> Result<String, ClassificationError> {
    Environment::new()
        .render_str(template, context)
        .map_err(|err| ClassificationError::Prompt(err.to_string()))
}

pub(super) fn triage_schema() -> JsonSchema {
    JsonSchema::new(json!({
        "type": "object",
        "required": ["decision", "reason"],
        "properties": {
            "decision": { "type": "string", "enum": ["new_task", "old_task", "irrelevant"] },
            "reason": { "type": "string" }
        },
        "additionalProperties": false
    }))
}

pub(super) fn classification_schema() -> JsonSchema {
    JsonSchema::new(json!({
        "type": "object",
        "required": ["new_tasks", "existing_task_ids", "notes"],
        "properties": {
            "new_tasks": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "ai_description", "priority"],
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "ai_description": { "type": "string" },
                        "priority": {
                            "type": "string",
                            "enum": ["low", "medium", "high", "critical"]
                        },
                        "input": {},
                        "scheduled_for": { "type": ["string", "null"] },
                        "watcher": {
                            "type": ["object", "null"],
                            "required": ["provider_name", "event_type"],
                            "properties": {
                                "provider_name": { "type": "string", "minLength": 1 },
                                "event_type": { "type": "string", "minLength": 1 },
                                "match_query": { "type": "object" }
                            }
                        }
                    }
                }
            },
            "existing_task_ids": { "type": "array", "items": { "type": "string" } },
            "notes": { "type": "string" }
        }
    }))
}

pub(super) fn selection_schema() -> JsonSchema {
    JsonSchema::new(json!({
        "type": "object",
        "required": ["tool_calls"],
        "properties": {
            "tool_calls": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["tool_name", "arguments"],
                    "properties": {
                        "tool_name": { "type": "string", "minLength": 1 },
                        "arguments": { "type": "object" }
                    }
                }
            },
            "notes": { "type": "string" }
        }
    }))
}

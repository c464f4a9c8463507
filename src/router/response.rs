//! Response chunks and the shared writer used by agents to emit them.

use super::domain::{AgentResult, RouterError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

const GENERATED_ID_LENGTH: usize = 10;

/// One unit of streamed response output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResponseChunk {
    /// Plain text output.
    Text {
        /// Text content.
        text: String,
    },
    /// Named structured data.
    Data {
        /// Data channel name.
        name: String,
        /// Payload.
        data: Value,
    },
    /// Metadata for the message being produced.
    MessageMetadata {
        /// Metadata payload.
        metadata: Value,
    },
    /// A tool call has started.
    ToolInputStart {
        /// Tool call identifier.
        tool_call_id: String,
        /// Name of the tool being called.
        tool_name: String,
    },
    /// Incremental tool input text.
    ToolInputDelta {
        /// Tool call identifier.
        tool_call_id: String,
        /// Text fragment of the tool input.
        input_text_delta: String,
    },
    /// Complete tool input.
    ToolInputAvailable {
        /// Tool call identifier.
        tool_call_id: String,
        /// Name of the tool being called.
        tool_name: String,
        /// Tool input.
        input: Value,
    },
    /// Tool output.
    ToolOutputAvailable {
        /// Tool call identifier.
        tool_call_id: String,
        /// Tool output.
        output: Value,
    },
    /// Error surfaced to the caller.
    Error {
        /// Error description.
        error_text: String,
    },
}

/// Custom tool call written as a sequence of tool chunks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomToolWrite {
    tool_name: String,
    tool_call_id: Option<String>,
    input: Option<Value>,
    input_text_delta: Vec<String>,
    output: Option<Value>,
}

impl CustomToolWrite {
    /// Creates a tool write for the named tool.
    #[must_use]
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            ..Self::default()
        }
    }

    /// Uses an explicit tool call identifier instead of a generated one.
    #[must_use]
    pub fn with_tool_call_id(mut self, tool_call_id: impl Into<String>) -> Self {
        self.tool_call_id = Some(tool_call_id.into());
        self
    }

    /// Sets the complete tool input.
    #[must_use]
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Sets streamed input fragments.
    #[must_use]
    pub fn with_input_text_delta(mut self, deltas: impl IntoIterator<Item = String>) -> Self {
        self.input_text_delta = deltas.into_iter().collect();
        self
    }

    /// Sets the tool output.
    #[must_use]
    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }
}

#[derive(Debug, Default)]
struct WriterState {
    chunks: Vec<ResponseChunk>,
    sink: Option<UnboundedSender<ResponseChunk>>,
}

/// Append-only response buffer shared by every context of a request.
///
/// Cloning is cheap; clones write to the same buffer. When created with a
/// sink, each chunk is also forwarded as soon as it is written.
#[derive(Debug, Clone, Default)]
pub struct ResponseWriter {
    state: Arc<Mutex<WriterState>>,
}

impl ResponseWriter {
    /// Creates a buffering writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer that also forwards chunks to `sink`.
    #[must_use]
    pub fn streaming(sink: UnboundedSender<ResponseChunk>) -> Self {
        Self {
            state: Arc::new(Mutex::new(WriterState {
                chunks: Vec::new(),
                sink: Some(sink),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a chunk.
    pub fn write(&self, chunk: ResponseChunk) {
        let mut state = self.lock();
        let disconnected = state
            .sink
            .as_ref()
            .is_some_and(|sink| sink.send(chunk.clone()).is_err());
        if disconnected {
            // Receiver dropped; keep buffering.
            state.sink = None;
        }
        state.chunks.push(chunk);
    }

    /// Appends a text chunk.
    pub fn write_text(&self, text: impl Into<String>) {
        self.write(ResponseChunk::Text { text: text.into() });
    }

    /// Appends a named data chunk.
    pub fn write_data(&self, name: impl Into<String>, data: Value) {
        self.write(ResponseChunk::Data {
            name: name.into(),
            data,
        });
    }

    /// Appends message metadata.
    pub fn write_message_metadata(&self, metadata: Value) {
        self.write(ResponseChunk::MessageMetadata { metadata });
    }

    /// Writes a custom tool call and returns its tool call identifier.
    ///
    /// Emits `tool-input-start` and deltas when fragments or output are
    /// present, `tool-input-available` when an input is present, and
    /// `tool-output-available` when an output is present.
    pub fn write_custom_tool(&self, tool: CustomToolWrite) -> String {
        let CustomToolWrite {
            tool_name,
            tool_call_id,
            input,
            input_text_delta,
            output,
        } = tool;
        let call_id =
            tool_call_id.unwrap_or_else(|| format!("{tool_name}-{}", Self::generate_id()));

        if !input_text_delta.is_empty() || output.is_some() {
            self.write(ResponseChunk::ToolInputStart {
                tool_call_id: call_id.clone(),
                tool_name: tool_name.clone(),
            });
            for delta in input_text_delta {
                self.write(ResponseChunk::ToolInputDelta {
                    tool_call_id: call_id.clone(),
                    input_text_delta: delta,
                });
            }
        }
        if let Some(tool_input) = input {
            self.write(ResponseChunk::ToolInputAvailable {
                tool_call_id: call_id.clone(),
                tool_name,
                input: tool_input,
            });
        }
        if let Some(tool_output) = output {
            self.write(ResponseChunk::ToolOutputAvailable {
                tool_call_id: call_id.clone(),
                output: tool_output,
            });
        }
        call_id
    }

    /// Writes a generated object as a complete tool call and returns its
    /// tool call identifier.
    ///
    /// `details` carries generation details such as usage or finish reason
    /// and is written as the tool input.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Handler`] when `object` is null.
    pub fn write_object_as_tool(
        &self,
        tool_name: &str,
        object: Value,
        details: Value,
    ) -> AgentResult<String> {
        if object.is_null() {
            return Err(RouterError::Handler(format!(
                "no object to write for tool {tool_name}"
            )));
        }
        let call_id = format!("{tool_name}-{}", Self::generate_id());
        self.write(ResponseChunk::ToolInputStart {
            tool_call_id: call_id.clone(),
            tool_name: tool_name.to_owned(),
        });
        self.write(ResponseChunk::ToolInputAvailable {
            tool_call_id: call_id.clone(),
            tool_name: tool_name.to_owned(),
            input: details,
        });
        self.write(ResponseChunk::ToolOutputAvailable {
            tool_call_id: call_id.clone(),
            output: object,
        });
        Ok(call_id)
    }

    /// Appends an error chunk.
    pub fn write_error(&self, error_text: impl Into<String>) {
        self.write(ResponseChunk::Error {
            error_text: error_text.into(),
        });
    }

    /// Returns a short random lowercase alphanumeric identifier.
    #[must_use]
    pub fn generate_id() -> String {
        Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(GENERATED_ID_LENGTH)
            .collect()
    }

    /// Returns a copy of every chunk written so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ResponseChunk> {
        self.lock().chunks.clone()
    }
}

/// Collected result of a top-level request.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentResponse {
    /// Identifier shared by every sub-call of the request.
    pub request_id: String,
    /// Terminal handler output or the dispatch failure.
    pub outcome: AgentResult<Value>,
    /// Every chunk written while serving the request.
    pub chunks: Vec<ResponseChunk>,
}

impl AgentResponse {
    /// Returns `true` when the request completed successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Concatenates every text chunk.
    #[must_use]
    pub fn text(&self) -> String {
        self.chunks
            .iter()
            .filter_map(|chunk| match chunk {
                ResponseChunk::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

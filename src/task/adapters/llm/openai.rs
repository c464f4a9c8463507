//! `OpenAI`-compatible chat completions client returning structured objects.

use crate::config::LlmConfig;
use crate::task::ports::{ModelError, StructuredModel, StructuredRequest};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

const CONTENT_POINTER: &str = "/choices/0/message/content";

/// Chat completions client that requests JSON-schema constrained output.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleModel {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatibleModel {
    /// Creates a client for `base_url` (for example
    /// `https://api.openai.com/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .build()
            .map_err(ModelError::transport)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Creates a client from configuration, reading the API key from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingCredential`] when the key variable is
    /// unset or blank.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ModelError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| ModelError::MissingCredential(config.api_key_env.clone()))?;
        Self::new(config.base_url.clone(), config.model.clone(), api_key)
    }

    fn request_body(&self, request: &StructuredRequest) -> Value {
        json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "schema": request.schema.as_value(),
                },
            },
        })
    }
}

#[async_trait]
impl StructuredModel for OpenAiCompatibleModel {
    async fn generate_object(&self, request: StructuredRequest) -> Result<Value, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, schema = %request.schema_name, "requesting structured object");

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(&request))
            .send()
            .await
            .map_err(ModelError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: Value = response.json().await.map_err(ModelError::transport)?;
        let content = reply
            .pointer(CONTENT_POINTER)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ModelError::MalformedResponse("missing choices[0].message.content".to_owned())
            })?;
        parse_object(content)
    }
}

/// Parses a reply body as a JSON object, tolerating a Markdown code fence.
pub(super) fn parse_object(content: &str) -> Result<Value, ModelError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    match serde_json::from_str::<Value>(unfenced.trim()) {
        Ok(object @ Value::Object(_)) => Ok(object),
        Ok(other) => Err(ModelError::MalformedResponse(format!(
            "expected a JSON object, found {other}"
        ))),
        Err(err) => Err(ModelError::MalformedResponse(err.to_string())),
    }
}

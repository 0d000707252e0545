//! Gemini Interactions API provider
//!
//! Model calls are a single `POST /interactions` with `{model, input}`.
//! Agent runs are started with `{agent, input, background: true}` and then
//! fetched with `GET /interactions/{id}` until they settle.

use crate::{
    BackgroundAgent, CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message,
    Result, StopReason, TaskState, TokenUsage,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Configuration for the Gemini provider
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key used when a request carries none
    pub api_key: String,

    /// Base URL (default: "https://generativelanguage.googleapis.com/v1beta")
    pub api_base: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create config from `GEMINI_API_KEY` and optional `ESG_API_BASE`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            LLMError::ConfigurationError("GEMINI_API_KEY environment variable not set".to_string())
        })?;
        let mut config = Self::new(api_key);
        if let Ok(base) = std::env::var("ESG_API_BASE") {
            config.api_base = base;
        }
        Ok(config)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Gemini provider over the Interactions API
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(GeminiConfig::new(api_key))
    }

    pub fn from_env() -> Result<Self> {
        Self::with_config(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.api_base.trim_end_matches('/'))
    }

    fn authorize(&self, builder: RequestBuilder, api_key: Option<String>) -> RequestBuilder {
        let key = api_key.unwrap_or_else(|| self.config.api_key.clone());
        builder.header("x-goog-api-key", key)
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Interaction> {
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed,
                429 => LLMError::RateLimitExceeded(error_text),
                400 => LLMError::InvalidRequest(error_text),
                404 => LLMError::ModelNotFound(what.to_string()),
                _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        response
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse interaction: {e}")))
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let input = interaction_input(&request);
        let body = CreateInteraction {
            input: &input,
            model: Some(&request.model),
            agent: None,
            background: None,
        };

        let builder = self.authorize(
            self.client.post(self.url("interactions")).json(&body),
            request.api_key.clone(),
        );
        let interaction = self.send(builder, &request.model).await?;

        let text = interaction
            .text()
            .ok_or_else(|| LLMError::EmptyResponse(request.model.clone()))?;

        debug!("Interaction {} returned {} chars", interaction.id, text.len());

        Ok(CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: interaction.usage.map(Into::into).unwrap_or_default(),
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[async_trait]
impl BackgroundAgent for GeminiProvider {
    #[instrument(skip(self, input, api_key))]
    async fn start(&self, agent: &str, input: &str, api_key: Option<String>) -> Result<String> {
        let body = CreateInteraction {
            input,
            model: None,
            agent: Some(agent),
            background: Some(true),
        };
        let builder = self.authorize(
            self.client.post(self.url("interactions")).json(&body),
            api_key,
        );
        let interaction = self.send(builder, agent).await?;
        debug!("Started interaction {}", interaction.id);
        Ok(interaction.id)
    }

    async fn poll(&self, task_id: &str, api_key: Option<String>) -> Result<TaskState> {
        let builder = self.authorize(
            self.client.get(self.url(&format!("interactions/{task_id}"))),
            api_key,
        );
        let interaction = self.send(builder, task_id).await?;
        Ok(interaction.state())
    }
}

/// Flatten the conversation into the single text input the API takes
fn interaction_input(request: &CompletionRequest) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = request.system.as_deref() {
        parts.push(system);
    }
    parts.extend(request.messages.iter().map(|m| m.content.as_str()));
    parts.join("\n\n")
}

// ============================================================================
// Interactions API wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateInteraction<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    background: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct Interaction {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    outputs: Vec<InteractionOutput>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    usage: Option<InteractionUsage>,
}

#[derive(Debug, Deserialize)]
struct InteractionOutput {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InteractionUsage {
    #[serde(default)]
    total_input_tokens: usize,
    #[serde(default)]
    total_output_tokens: usize,
}

impl From<InteractionUsage> for TokenUsage {
    fn from(usage: InteractionUsage) -> Self {
        Self {
            input_tokens: usage.total_input_tokens,
            output_tokens: usage.total_output_tokens,
        }
    }
}

impl Interaction {
    /// First `text` output, else the last output that has text
    fn text(&self) -> Option<String> {
        self.outputs
            .iter()
            .find(|o| o.kind.as_deref() == Some("text") && o.text.is_some())
            .or_else(|| self.outputs.iter().rev().find(|o| o.text.is_some()))
            .and_then(|o| o.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    fn state(&self) -> TaskState {
        let status = self.status.as_deref().unwrap_or("unknown");
        match status {
            "completed" => match self.text() {
                Some(text) => TaskState::Completed(text),
                None => TaskState::Failed("completed without text output".to_string()),
            },
            "failed" | "cancelled" => {
                let detail = self
                    .error
                    .as_ref()
                    .map_or_else(|| status.to_string(), |e| format!("{status}: {e}"));
                TaskState::Failed(detail)
            }
            other => TaskState::Running(other.to_string()),
        }
    }
}

//! DashScope (Qwen) provider implementation
//!
//! Talks to the native text-generation endpoint. Deep-research models only
//! answer in streaming mode, so a request with `stream` set is sent with SSE
//! enabled and the incremental chunks are accumulated into one reply.
//! See: https://help.aliyun.com/zh/model-studio/qwen-deep-research
//!
//! # Examples
//!
//! ```no_run
//! use esg_llm::{CompletionRequest, LLMProvider, Message};
//! use esg_llm::providers::{DashScopeConfig, DashScopeProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = DashScopeProvider::with_config(
//!         DashScopeConfig::new("sk-...").with_timeout(300),
//!     )?;
//!
//!     let request = CompletionRequest::builder("qwen3-max-preview")
//!         .add_message(Message::user("你好"))
//!         .build();
//!
//!     let response = provider.complete(request).await?;
//!     println!("{}", response.message.content);
//!     Ok(())
//! }
//! ```

use super::sse::{SseEvent, SseParser};
use crate::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, Result, StopReason,
    TokenUsage,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, trace};

pub const DEFAULT_DASHSCOPE_API_BASE: &str = "https://dashscope.aliyuncs.com/api/v1";
const GENERATION_PATH: &str = "/services/aigc/text-generation/generation";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Configuration for the DashScope provider
#[derive(Clone)]
pub struct DashScopeConfig {
    /// API key used when a request carries none
    pub api_key: String,

    /// Base URL (default: "https://dashscope.aliyuncs.com/api/v1")
    pub api_base: String,

    /// Request timeout in seconds; covers the whole stream
    pub timeout_secs: u64,
}

impl std::fmt::Debug for DashScopeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashScopeConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DashScopeConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Create config from environment variables
    ///
    /// Reads the API key from `DASHSCOPE_API_KEY` and, when set, the base URL
    /// from `ESG_API_BASE`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("DASHSCOPE_API_KEY").map_err(|_| {
            LLMError::ConfigurationError(
                "DASHSCOPE_API_KEY environment variable not set".to_string(),
            )
        })?;

        let api_base = std::env::var("ESG_API_BASE")
            .unwrap_or_else(|_| DEFAULT_DASHSCOPE_API_BASE.to_string());

        Ok(Self {
            api_key,
            api_base,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Default for DashScopeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_DASHSCOPE_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// DashScope provider for Qwen chat and deep-research models
pub struct DashScopeProvider {
    client: Client,
    config: DashScopeConfig,
}

impl DashScopeProvider {
    /// Create a new provider with custom configuration
    pub fn with_config(config: DashScopeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a new provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(DashScopeConfig::new(api_key))
    }

    /// Create a provider from environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(DashScopeConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &DashScopeConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}{GENERATION_PATH}", self.config.api_base.trim_end_matches('/'))
    }

    async fn read_stream(response: reqwest::Response, model: &str) -> Result<CompletionResponse> {
        let mut parser = SseParser::new();
        let mut collector = StreamCollector::default();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            for event in parser.feed(&chunk?) {
                collector.push(&event)?;
            }
        }
        if let Some(event) = parser.finish() {
            collector.push(&event)?;
        }

        collector.finish(model)
    }
}

#[async_trait]
impl LLMProvider for DashScopeProvider {
    #[instrument(skip(self, request), fields(model = %request.model, stream = request.stream))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending request to DashScope at {}", self.config.api_base);

        let api_key = request
            .api_key
            .clone()
            .unwrap_or_else(|| self.config.api_key.clone());

        let body = GenerationRequest {
            model: &request.model,
            input: GenerationInput {
                messages: build_messages(request.system.as_deref(), &request.messages),
            },
            parameters: GenerationParameters {
                result_format: "message",
                incremental_output: request.stream.then_some(true),
                max_tokens: request.max_tokens,
                temperature: request.temperature,
                stop: request.stop_sequences.as_deref(),
            },
        };

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body);
        if request.stream {
            builder = builder.header("X-DashScope-SSE", "enable");
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(map_status_error(status.as_u16(), error_text, &request.model));
        }

        if request.stream {
            return Self::read_stream(response, &request.model).await;
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;
        parse_generation(&value, &request.model)
    }

    fn name(&self) -> &'static str {
        "dashscope"
    }
}

// ============================================================================
// DashScope-specific request types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput<'a>,
    parameters: GenerationParameters<'a>,
}

#[derive(Debug, Serialize)]
struct GenerationInput<'a> {
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationParameters<'a> {
    result_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    incremental_output: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

// ============================================================================
// Conversion helpers
// ============================================================================

/// System prompt goes first in the messages array
fn build_messages<'a>(system: Option<&'a str>, messages: &'a [Message]) -> Vec<WireMessage<'a>> {
    system
        .map(|content| WireMessage {
            role: "system",
            content,
        })
        .into_iter()
        .chain(messages.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }))
        .collect()
}

fn map_status_error(status: u16, error_text: String, model: &str) -> LLMError {
    match status {
        401 | 403 => LLMError::AuthenticationFailed,
        429 => LLMError::RateLimitExceeded(error_text),
        400 => LLMError::InvalidRequest(error_text),
        404 => LLMError::ModelNotFound(model.to_string()),
        _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
    }
}

/// Pull assistant text out of a generation payload
///
/// Tries `output.text`, then `output.message.content`, then
/// `output.choices[0].message.content`.
fn output_text(output: &Value) -> Option<&str> {
    output
        .get("text")
        .and_then(Value::as_str)
        .or_else(|| output.pointer("/message/content").and_then(Value::as_str))
        .or_else(|| {
            output
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str)
        })
}

fn finish_reason(output: &Value) -> Option<&str> {
    output
        .pointer("/choices/0/finish_reason")
        .or_else(|| output.get("finish_reason"))
        .and_then(Value::as_str)
}

fn usage_of(value: &Value) -> TokenUsage {
    let field = |name: &str| {
        value
            .pointer(&format!("/usage/{name}"))
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default()
    };
    TokenUsage {
        input_tokens: field("input_tokens"),
        output_tokens: field("output_tokens"),
    }
}

/// An error payload carries a non-empty `code`
fn payload_error(value: &Value) -> Option<LLMError> {
    let code = value.get("code").and_then(Value::as_str)?;
    if code.is_empty() {
        return None;
    }
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(LLMError::ProviderError(format!("{code}: {message}")))
}

fn parse_generation(value: &Value, model: &str) -> Result<CompletionResponse> {
    if let Some(err) = payload_error(value) {
        return Err(err);
    }

    let output = value
        .get("output")
        .ok_or_else(|| LLMError::UnexpectedResponse("No output in response".to_string()))?;

    let text = output_text(output)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| LLMError::EmptyResponse(model.to_string()))?;

    let usage = usage_of(value);
    debug!(
        "Received response - tokens: {}/{}",
        usage.input_tokens, usage.output_tokens
    );

    Ok(CompletionResponse {
        message: Message::assistant(text),
        stop_reason: map_stop_reason(finish_reason(output)),
        usage,
    })
}

fn map_stop_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("stop") => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        Some(other) => {
            debug!("Unknown stop reason: {}", other);
            StopReason::Unknown
        }
        None => StopReason::Unknown,
    }
}

/// Accumulates incremental stream chunks
#[derive(Debug, Default)]
struct StreamCollector {
    content: String,
    usage: TokenUsage,
    stop_reason: Option<String>,
}

impl StreamCollector {
    fn push(&mut self, event: &SseEvent) -> Result<()> {
        let data = event.data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Ok(());
        }

        let value: Value = serde_json::from_str(data)?;
        if let Some(err) = payload_error(&value) {
            return Err(err);
        }
        let Some(output) = value.get("output") else {
            return Ok(());
        };

        if output.pointer("/message/phase").and_then(Value::as_str) == Some("KeepAlive") {
            trace!("keep-alive chunk");
            return Ok(());
        }

        if let Some(text) = output_text(output) {
            self.content.push_str(text);
        }
        if let Some(reason) = finish_reason(output).filter(|r| *r != "null") {
            self.stop_reason = Some(reason.to_string());
        }
        if value.get("usage").is_some() {
            self.usage = usage_of(&value);
        }
        Ok(())
    }

    fn finish(self, model: &str) -> Result<CompletionResponse> {
        let text = self.content.trim();
        if text.is_empty() {
            return Err(LLMError::EmptyResponse(model.to_string()));
        }
        Ok(CompletionResponse {
            message: Message::assistant(text),
            stop_reason: map_stop_reason(self.stop_reason.as_deref()),
            usage: self.usage,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(data: &str) -> SseEvent {
        SseEvent {
            event: None,
            data: data.to_string(),
        }
    }

    #[test]
    fn test_provider_creation() {
        let provider = DashScopeProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "dashscope");
        assert_eq!(provider.config().api_key, "test-key");
        assert_eq!(provider.config().api_base, DEFAULT_DASHSCOPE_API_BASE);
        assert_eq!(
            provider.endpoint(),
            "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation"
        );
    }

    #[test]
    fn test_custom_config() {
        let config = DashScopeConfig::new("k")
            .with_api_base("http://localhost:8080/api/v1/")
            .with_timeout(1800);
        let provider = DashScopeProvider::with_config(config).unwrap();
        assert_eq!(provider.config().timeout_secs, 1800);
        assert_eq!(
            provider.endpoint(),
            "http://localhost:8080/api/v1/services/aigc/text-generation/generation"
        );
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let debug = format!("{:?}", DashScopeConfig::new("sk-secret"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_system_message_first() {
        let messages = vec![Message::user("研究主题")];
        let wire = build_messages(Some("你是研究员"), &messages);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[1].content, "研究主题");
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![Message::user("hi")];
        let body = GenerationRequest {
            model: "qwen-deep-research",
            input: GenerationInput {
                messages: build_messages(None, &messages),
            },
            parameters: GenerationParameters {
                result_format: "message",
                incremental_output: Some(true),
                max_tokens: None,
                temperature: None,
                stop: None,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["input"]["messages"][0]["content"], "hi");
        assert_eq!(value["parameters"]["incremental_output"], true);
        assert!(value["parameters"].get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_choices_format() {
        let value = json!({
            "output": {
                "choices": [{
                    "finish_reason": "stop",
                    "message": { "role": "assistant", "content": "  润色后的文本  " }
                }]
            },
            "usage": { "input_tokens": 12, "output_tokens": 34 }
        });
        let response = parse_generation(&value, "qwen3-max-preview").unwrap();
        assert_eq!(response.message.content, "润色后的文本");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage.total(), 46);
    }

    #[test]
    fn test_parse_text_format() {
        let value = json!({ "output": { "text": "plain" } });
        let response = parse_generation(&value, "m").unwrap();
        assert_eq!(response.message.content, "plain");
        assert_eq!(response.stop_reason, StopReason::Unknown);
    }

    #[test]
    fn test_parse_empty_output() {
        let value = json!({ "output": { "choices": [{ "message": { "content": "   " } }] } });
        assert!(matches!(
            parse_generation(&value, "m"),
            Err(LLMError::EmptyResponse(_))
        ));
    }

    #[test]
    fn test_parse_error_payload() {
        let value = json!({ "code": "InvalidApiKey", "message": "Invalid API-key provided." });
        let err = parse_generation(&value, "m").unwrap_err();
        assert!(err.to_string().contains("InvalidApiKey"));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status_error(401, String::new(), "m"),
            LLMError::AuthenticationFailed
        ));
        assert!(matches!(
            map_status_error(429, "slow down".into(), "m"),
            LLMError::RateLimitExceeded(_)
        ));
        assert!(matches!(
            map_status_error(404, String::new(), "qwen-x"),
            LLMError::ModelNotFound(m) if m == "qwen-x"
        ));
        assert!(matches!(
            map_status_error(500, "boom".into(), "m"),
            LLMError::RequestFailed(_)
        ));
    }

    #[test]
    fn test_stream_collector_skips_keepalive() {
        let mut collector = StreamCollector::default();
        collector
            .push(&event(r#"{"output":{"message":{"phase":"KeepAlive","content":"..."}}}"#))
            .unwrap();
        collector
            .push(&event(r#"{"output":{"message":{"phase":"answer","content":"第一段"}}}"#))
            .unwrap();
        collector
            .push(&event(
                r#"{"output":{"message":{"phase":"answer","content":"第二段"}},"usage":{"input_tokens":5,"output_tokens":7}}"#,
            ))
            .unwrap();
        collector.push(&event("[DONE]")).unwrap();

        let response = collector.finish("qwen-deep-research").unwrap();
        assert_eq!(response.message.content, "第一段第二段");
        assert_eq!(response.usage.output_tokens, 7);
    }

    #[test]
    fn test_stream_collector_error_chunk() {
        let mut collector = StreamCollector::default();
        let result = collector.push(&event(r#"{"code":"Throttling","message":"busy"}"#));
        assert!(matches!(result, Err(LLMError::ProviderError(_))));
    }

    #[test]
    fn test_stream_collector_empty() {
        let collector = StreamCollector::default();
        assert!(matches!(
            collector.finish("m"),
            Err(LLMError::EmptyResponse(_))
        ));
    }
}

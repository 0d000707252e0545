//! Model capability interface
//!
//! The pipeline only ever needs two things from a provider: a long-running
//! deep-research call and a plain chat call. [`ModelCapability`] exposes
//! exactly those, and each provider is one implementation selected once per
//! run from [`CapabilitySettings`].

mod gemini;
mod qwen;

pub use gemini::GeminiCapability;
pub use qwen::QwenCapability;

use crate::providers::{
    DEFAULT_DASHSCOPE_API_BASE, DEFAULT_GEMINI_API_BASE, DashScopeConfig, DashScopeProvider,
    GeminiConfig, GeminiProvider,
};
use crate::{LLMError, Result, RetryPolicy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for one deep-research call
pub const DEFAULT_RESEARCH_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Upper bound for one chat call
pub const DEFAULT_CONVERSE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Interval between status checks of a background research task
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Deep research and chat, independent of provider
#[async_trait]
pub trait ModelCapability: Send + Sync {
    /// Run a deep-research task and return its report text
    async fn deep_research(&self, prompt: &str, identity: &Identity) -> Result<String>;

    /// Single-turn chat; `label` only tags log lines
    async fn converse(&self, prompt: &str, label: &str) -> Result<String>;

    /// Provider name for logs and run metadata
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: ModelCapability + ?Sized> ModelCapability for Arc<T> {
    async fn deep_research(&self, prompt: &str, identity: &Identity) -> Result<String> {
        (**self).deep_research(prompt, identity).await
    }

    async fn converse(&self, prompt: &str, label: &str) -> Result<String> {
        (**self).converse(prompt, label).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Credential a research call runs under
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    label: String,
    api_key: String,
}

impl Identity {
    pub fn new(label: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            api_key: api_key.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Reject blank keys and unfilled `YOUR_...` placeholders
    pub fn validated(self) -> Result<Self> {
        let key = self.api_key.trim();
        if key.is_empty() || key.starts_with("YOUR_") {
            return Err(LLMError::ConfigurationError(format!(
                "no usable API key for {}",
                self.label
            )));
        }
        Ok(self)
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("label", &self.label)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Supported providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Qwen,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Qwen => "qwen",
        }
    }

    pub fn default_chat_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-3-pro-preview",
            Self::Qwen => "qwen3-max-preview",
        }
    }

    /// Agent name for Gemini, model name for Qwen
    pub fn default_research_model(self) -> &'static str {
        match self {
            Self::Gemini => "deep-research-pro-preview-12-2025",
            Self::Qwen => "qwen-deep-research",
        }
    }

    pub fn default_api_base(self) -> &'static str {
        match self {
            Self::Gemini => DEFAULT_GEMINI_API_BASE,
            Self::Qwen => DEFAULT_DASHSCOPE_API_BASE,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "qwen" | "dashscope" | "aliyun" => Ok(Self::Qwen),
            other => Err(LLMError::ConfigurationError(format!(
                "unknown provider '{other}' (expected gemini or qwen)"
            ))),
        }
    }
}

/// Everything needed to build a capability for one run
#[derive(Clone)]
pub struct CapabilitySettings {
    pub provider: ProviderKind,
    /// Key for chat calls; research calls carry their own [`Identity`]
    pub api_key: String,
    pub chat_model: String,
    pub research_model: String,
    pub api_base: String,
    pub research_timeout: Duration,
    pub converse_timeout: Duration,
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for CapabilitySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilitySettings")
            .field("provider", &self.provider)
            .field("chat_model", &self.chat_model)
            .field("research_model", &self.research_model)
            .field("api_base", &self.api_base)
            .field("research_timeout", &self.research_timeout)
            .field("converse_timeout", &self.converse_timeout)
            .finish_non_exhaustive()
    }
}

impl CapabilitySettings {
    /// Provider defaults for models, endpoint and timeouts
    pub fn new(provider: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            chat_model: provider.default_chat_model().to_string(),
            research_model: provider.default_research_model().to_string(),
            api_base: provider.default_api_base().to_string(),
            research_timeout: DEFAULT_RESEARCH_TIMEOUT,
            converse_timeout: DEFAULT_CONVERSE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::converse_default(),
        }
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_research_model(mut self, model: impl Into<String>) -> Self {
        self.research_model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeouts(mut self, research: Duration, converse: Duration) -> Self {
        self.research_timeout = research;
        self.converse_timeout = converse;
        self
    }

    /// Build the provider-backed capability
    pub fn build(&self) -> Result<Arc<dyn ModelCapability>> {
        Identity::new("chat", self.api_key.clone()).validated()?;

        let capability: Arc<dyn ModelCapability> = match self.provider {
            ProviderKind::Gemini => {
                let provider = Arc::new(GeminiProvider::with_config(
                    GeminiConfig::new(self.api_key.clone())
                        .with_api_base(self.api_base.clone())
                        .with_timeout(self.converse_timeout.as_secs()),
                )?);
                Arc::new(
                    GeminiCapability::new(provider.clone(), provider)
                        .with_models(&self.chat_model, &self.research_model)
                        .with_timeouts(self.research_timeout, self.converse_timeout)
                        .with_poll_interval(self.poll_interval)
                        .with_retry(self.retry.clone()),
                )
            }
            ProviderKind::Qwen => {
                // Streams stay open for the whole research call
                let provider = DashScopeProvider::with_config(
                    DashScopeConfig::new(self.api_key.clone())
                        .with_api_base(self.api_base.clone())
                        .with_timeout(self.research_timeout.as_secs()),
                )?;
                Arc::new(
                    QwenCapability::new(Arc::new(provider))
                        .with_models(&self.chat_model, &self.research_model)
                        .with_timeouts(self.research_timeout, self.converse_timeout)
                        .with_retry(self.retry.clone()),
                )
            }
        };
        Ok(capability)
    }
}

/// Run `future` under an upper time bound, mapping expiry to [`LLMError::Timeout`]
pub(crate) async fn with_deadline<T>(
    operation: &str,
    limit: Duration,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| LLMError::Timeout {
            operation: operation.to_string(),
            elapsed: limit,
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_validation() {
        assert!(Identity::new("环境(E)", "sk-123").validated().is_ok());
        assert!(matches!(
            Identity::new("环境(E)", "  ").validated(),
            Err(LLMError::ConfigurationError(_))
        ));
        assert!(Identity::new("社会(S)", "YOUR_API_KEY").validated().is_err());
    }

    #[test]
    fn test_identity_debug_redacts_key() {
        let debug = format!("{:?}", Identity::new("治理(G)", "sk-secret"));
        assert!(debug.contains("治理(G)"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("qwen".parse::<ProviderKind>().unwrap(), ProviderKind::Qwen);
        assert_eq!("dashscope".parse::<ProviderKind>().unwrap(), ProviderKind::Qwen);
        assert!("openai".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = CapabilitySettings::new(ProviderKind::Qwen, "sk-1");
        assert_eq!(settings.chat_model, "qwen3-max-preview");
        assert_eq!(settings.research_model, "qwen-deep-research");
        assert_eq!(settings.research_timeout, Duration::from_secs(1800));
        assert_eq!(settings.converse_timeout, Duration::from_secs(300));

        let settings = CapabilitySettings::new(ProviderKind::Gemini, "k");
        assert_eq!(settings.research_model, "deep-research-pro-preview-12-2025");
        assert_eq!(settings.api_base, DEFAULT_GEMINI_API_BASE);
    }

    #[test]
    fn test_build_rejects_placeholder_key() {
        let settings = CapabilitySettings::new(ProviderKind::Gemini, "YOUR_GEMINI_KEY");
        assert!(settings.build().is_err());
    }

    #[test]
    fn test_build_selects_provider() {
        let qwen = CapabilitySettings::new(ProviderKind::Qwen, "sk-1").build().unwrap();
        assert_eq!(qwen.name(), "qwen");

        let gemini = CapabilitySettings::new(ProviderKind::Gemini, "k").build().unwrap();
        assert_eq!(gemini.name(), "gemini");
    }

    #[tokio::test]
    async fn test_with_deadline_maps_timeout() {
        let result: Result<()> = with_deadline("converse", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(LLMError::Timeout { .. })));
        assert!(result.unwrap_err().is_timeout_or_disconnect());
    }
}

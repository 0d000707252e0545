//! Gemini capability: background research agent plus model chat

use super::{
    DEFAULT_CONVERSE_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_RESEARCH_TIMEOUT, Identity,
    ModelCapability, ProviderKind, with_deadline,
};
use crate::{
    BackgroundAgent, CompletionRequest, LLMError, LLMProvider, Message, Result, RetryPolicy,
    TaskState,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub struct GeminiCapability {
    chat: Arc<dyn LLMProvider>,
    agent: Arc<dyn BackgroundAgent>,
    chat_model: String,
    research_agent: String,
    research_timeout: Duration,
    converse_timeout: Duration,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl GeminiCapability {
    pub fn new(chat: Arc<dyn LLMProvider>, agent: Arc<dyn BackgroundAgent>) -> Self {
        Self {
            chat,
            agent,
            chat_model: ProviderKind::Gemini.default_chat_model().to_string(),
            research_agent: ProviderKind::Gemini.default_research_model().to_string(),
            research_timeout: DEFAULT_RESEARCH_TIMEOUT,
            converse_timeout: DEFAULT_CONVERSE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::converse_default(),
        }
    }

    pub fn with_models(mut self, chat: &str, research_agent: &str) -> Self {
        self.chat_model = chat.to_string();
        self.research_agent = research_agent.to_string();
        self
    }

    pub fn with_timeouts(mut self, research: Duration, converse: Duration) -> Self {
        self.research_timeout = research;
        self.converse_timeout = converse;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn run_agent(&self, prompt: &str, identity: &Identity) -> Result<String> {
        let key = Some(identity.api_key().to_string());
        let task_id = self
            .agent
            .start(&self.research_agent, prompt, key.clone())
            .await?;
        info!("[{}] research task started: {}", identity.label(), task_id);

        let mut polls: u32 = 0;
        loop {
            polls += 1;
            match self.agent.poll(&task_id, key.clone()).await? {
                TaskState::Completed(text) => return Ok(text),
                TaskState::Failed(detail) => {
                    return Err(LLMError::ProviderError(format!(
                        "research task {task_id} failed: {detail}"
                    )));
                }
                TaskState::Running(status) => {
                    if polls % 3 == 0 {
                        info!("[{}] poll {}: {}", identity.label(), polls, status);
                    } else {
                        debug!("[{}] poll {}: {}", identity.label(), polls, status);
                    }
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl ModelCapability for GeminiCapability {
    #[instrument(skip(self, prompt, identity), fields(identity = identity.label()))]
    async fn deep_research(&self, prompt: &str, identity: &Identity) -> Result<String> {
        info!("[{}] starting Gemini deep research", identity.label());
        let report = with_deadline(
            "deep_research",
            self.research_timeout,
            self.run_agent(prompt, identity),
        )
        .await?;
        info!("[{}] research finished ({} chars)", identity.label(), report.len());
        Ok(report)
    }

    #[instrument(skip(self, prompt))]
    async fn converse(&self, prompt: &str, label: &str) -> Result<String> {
        debug!("[{}] converse with {}", label, self.chat_model);
        self.retry
            .execute(label, move || async move {
                let request = CompletionRequest::builder(&self.chat_model)
                    .add_message(Message::user(prompt))
                    .build();
                let response =
                    with_deadline("converse", self.converse_timeout, self.chat.complete(request))
                        .await?;
                response
                    .message
                    .text()
                    .map(str::to_string)
                    .ok_or_else(|| LLMError::EmptyResponse(self.chat_model.clone()))
            })
            .await
    }

    fn name(&self) -> &'static str {
        ProviderKind::Gemini.as_str()
    }
}

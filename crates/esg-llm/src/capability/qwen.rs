//! Qwen capability over DashScope
//!
//! Deep research is two streamed turns: the model first replies with
//! clarifying questions, then a fixed follow-up tells it to go ahead and
//! write the full report.

use super::{
    DEFAULT_CONVERSE_TIMEOUT, DEFAULT_RESEARCH_TIMEOUT, Identity, ModelCapability, ProviderKind,
    with_deadline,
};
use crate::{CompletionRequest, LLMError, LLMProvider, Message, Result, RetryPolicy};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Stand-in for the first reply when the model asks nothing
const EMPTY_CLARIFICATION: &str = "请直接进行深入研究。";

/// Second-turn instruction
const PROCEED_INSTRUCTION: &str =
    "请直接基于上述研究主题进行深入研究，输出完整的研究报告内容，无需再追问。";

pub struct QwenCapability {
    provider: Arc<dyn LLMProvider>,
    chat_model: String,
    research_model: String,
    research_timeout: Duration,
    converse_timeout: Duration,
    retry: RetryPolicy,
}

impl QwenCapability {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            chat_model: ProviderKind::Qwen.default_chat_model().to_string(),
            research_model: ProviderKind::Qwen.default_research_model().to_string(),
            research_timeout: DEFAULT_RESEARCH_TIMEOUT,
            converse_timeout: DEFAULT_CONVERSE_TIMEOUT,
            retry: RetryPolicy::converse_default(),
        }
    }

    pub fn with_models(mut self, chat: &str, research: &str) -> Self {
        self.chat_model = chat.to_string();
        self.research_model = research.to_string();
        self
    }

    pub fn with_timeouts(mut self, research: Duration, converse: Duration) -> Self {
        self.research_timeout = research;
        self.converse_timeout = converse;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn research_turns(&self, prompt: &str, identity: &Identity) -> Result<String> {
        let first = CompletionRequest::builder(&self.research_model)
            .add_message(Message::user(prompt))
            .stream(true)
            .api_key(identity.api_key())
            .build();

        let clarification = match self.provider.complete(first).await {
            Ok(response) => response
                .message
                .text()
                .unwrap_or(EMPTY_CLARIFICATION)
                .to_string(),
            Err(LLMError::EmptyResponse(_)) => EMPTY_CLARIFICATION.to_string(),
            Err(e) => return Err(e),
        };
        info!("[{}] first research turn done, continuing", identity.label());

        let second = CompletionRequest::builder(&self.research_model)
            .messages(vec![
                Message::user(prompt),
                Message::assistant(clarification),
                Message::user(PROCEED_INSTRUCTION),
            ])
            .stream(true)
            .api_key(identity.api_key())
            .build();

        let response = self.provider.complete(second).await?;
        response
            .message
            .text()
            .map(str::to_string)
            .ok_or_else(|| LLMError::EmptyResponse(self.research_model.clone()))
    }
}

#[async_trait]
impl ModelCapability for QwenCapability {
    #[instrument(skip(self, prompt, identity), fields(identity = identity.label()))]
    async fn deep_research(&self, prompt: &str, identity: &Identity) -> Result<String> {
        info!("[{}] starting Qwen deep research", identity.label());
        let report = with_deadline(
            "deep_research",
            self.research_timeout,
            self.research_turns(prompt, identity),
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
                    with_deadline("converse", self.converse_timeout, self.provider.complete(request))
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
        ProviderKind::Qwen.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockLLMProvider;
    use crate::{CompletionResponse, Role};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn capability(mock: MockLLMProvider) -> QwenCapability {
        QwenCapability::new(Arc::new(mock)).with_retry(RetryPolicy::fast())
    }

    #[tokio::test]
    async fn test_two_phase_research() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete()
            .times(2)
            .returning(|request| {
                assert!(request.stream);
                assert_eq!(request.api_key.as_deref(), Some("sk-e"));
                assert_eq!(request.model, "qwen-deep-research");
                match request.messages.len() {
                    1 => Ok(CompletionResponse::text("请问需要关注哪些行业？")),
                    3 => {
                        assert_eq!(request.messages[1].role, Role::Assistant);
                        assert_eq!(request.messages[1].content, "请问需要关注哪些行业？");
                        assert_eq!(request.messages[2].content, PROCEED_INSTRUCTION);
                        Ok(CompletionResponse::text("### 欧盟碳边境调节机制进入过渡期"))
                    }
                    n => panic!("unexpected message count {n}"),
                }
            });

        let report = capability(mock)
            .deep_research("研究环境动态", &Identity::new("环境(E)", "sk-e"))
            .await
            .unwrap();
        assert_eq!(report, "### 欧盟碳边境调节机制进入过渡期");
    }

    #[tokio::test]
    async fn test_blank_clarification_uses_fallback() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete()
            .times(2)
            .returning(|request| match request.messages.len() {
                1 => Err(LLMError::EmptyResponse("qwen-deep-research".into())),
                _ => {
                    assert_eq!(request.messages[1].content, EMPTY_CLARIFICATION);
                    Ok(CompletionResponse::text("报告"))
                }
            });

        let report = capability(mock)
            .deep_research("p", &Identity::new("社会(S)", "sk-s"))
            .await
            .unwrap();
        assert_eq!(report, "报告");
    }

    #[tokio::test]
    async fn test_first_turn_error_propagates() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete()
            .times(1)
            .returning(|_| Err(LLMError::AuthenticationFailed));

        let result = capability(mock)
            .deep_research("p", &Identity::new("治理(G)", "bad"))
            .await;
        assert!(matches!(result, Err(LLMError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_converse_retries_once_on_timeout() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let mut mock = MockLLMProvider::new();
        mock.expect_complete().returning(move |request| {
            assert!(!request.stream);
            assert_eq!(request.model, "qwen3-max-preview");
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(LLMError::Timeout {
                    operation: "converse".into(),
                    elapsed: Duration::from_secs(300),
                })
            } else {
                Ok(CompletionResponse::text(" 润色结果 "))
            }
        });

        let cap = capability(mock).with_retry(RetryPolicy::fixed(2, Duration::from_millis(1)));
        let text = cap.converse("润色", "polish").await.unwrap();
        assert_eq!(text, "润色结果");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_converse_empty_reply_is_error() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete()
            .times(1)
            .returning(|_| Ok(CompletionResponse::text("   ")));

        let result = capability(mock).converse("p", "merge").await;
        assert!(matches!(result, Err(LLMError::EmptyResponse(_))));
    }
}

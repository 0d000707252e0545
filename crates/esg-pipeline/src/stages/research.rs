//! Parallel deep research, one task per domain

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::prompts::{PromptResolver, RESEARCH};
use esg_core::{Domain, DomainResult, DomainResults, ReportContext};
use esg_llm::{Identity, ModelCapability};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ResearchStage {
    capability: Arc<dyn ModelCapability>,
    prompts: Arc<PromptResolver>,
}

impl ResearchStage {
    pub fn new(capability: Arc<dyn ModelCapability>, prompts: Arc<PromptResolver>) -> Self {
        Self {
            capability,
            prompts,
        }
    }

    /// Research all three domains concurrently
    ///
    /// Prompts and identities for every domain are prepared before anything
    /// is dispatched; a problem there is a [`PipelineError::DispatchFault`].
    /// Once dispatched, each domain's failure is recorded on its own result
    /// and never affects the others.
    pub async fn run(&self, context: &ReportContext, config: &PipelineConfig) -> Result<DomainResults> {
        let jobs = Domain::ALL
            .into_iter()
            .map(|domain| self.prepare(context, config, domain))
            .collect::<Result<Vec<_>>>()?;

        info!("Dispatching deep research for {} domains", jobs.len());
        let tasks = jobs
            .into_iter()
            .map(|(domain, prompt, identity)| self.research_one(domain, prompt, identity));

        Ok(DomainResults::from_results(join_all(tasks).await))
    }

    fn prepare(
        &self,
        context: &ReportContext,
        config: &PipelineConfig,
        domain: Domain,
    ) -> Result<(Domain, String, Identity)> {
        let identity = config
            .identity(domain)
            .clone()
            .validated()
            .map_err(|e| PipelineError::DispatchFault(e.to_string()))?;
        let prompt = self
            .prompts
            .resolve(RESEARCH, context, Some(domain))
            .map_err(|e| PipelineError::DispatchFault(format!("{}: {e}", domain.label())))?;
        Ok((domain, prompt, identity))
    }

    async fn research_one(&self, domain: Domain, prompt: String, identity: Identity) -> DomainResult {
        match self.capability.deep_research(&prompt, &identity).await {
            Ok(text) if !text.trim().is_empty() => {
                info!("[{}] research done ({} chars)", domain.label(), text.len());
                DomainResult::succeeded(domain, text)
            }
            Ok(_) => {
                warn!("[{}] research returned no text", domain.label());
                DomainResult::failed(domain, "deep research returned empty text")
            }
            Err(e) => {
                warn!("[{}] research failed: {}", domain.label(), e);
                DomainResult::failed(domain, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::MockCapability;
    use chrono::NaiveDate;
    use esg_core::{DomainStatus, ReportMode};
    use esg_llm::LLMError;
    use std::time::Duration;

    fn context() -> ReportContext {
        ReportContext::for_mode(ReportMode::Weekly, NaiveDate::from_ymd_opt(2025, 3, 12).unwrap())
    }

    fn stage(mock: MockCapability) -> ResearchStage {
        ResearchStage::new(Arc::new(mock), Arc::new(PromptResolver::builtin().unwrap()))
    }

    fn config() -> PipelineConfig {
        PipelineConfig::builder()
            .domain_key(Domain::Environmental, "key-e")
            .domain_key(Domain::Social, "key-s")
            .domain_key(Domain::Governance, "key-g")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_each_domain_uses_its_identity() {
        let mut mock = MockCapability::new();
        mock.expect_deep_research()
            .times(3)
            .returning(|prompt, identity| {
                let expected = match identity.label() {
                    "环境(E)" => ("key-e", "环境（E）"),
                    "社会(S)" => ("key-s", "社会（S）"),
                    "治理(G)" => ("key-g", "治理（G）"),
                    other => panic!("unexpected identity {other}"),
                };
                assert_eq!(identity.api_key(), expected.0);
                assert!(prompt.contains(expected.1));
                Ok(format!("{} research", identity.label()))
            });

        let results = stage(mock).run(&context(), &config()).await.unwrap();
        assert_eq!(results.ok_count(), 3);
        assert_eq!(
            results[Domain::Social].raw_text.as_deref(),
            Some("社会(S) research")
        );
    }

    #[tokio::test]
    async fn test_single_domain_failure_is_isolated() {
        let mut mock = MockCapability::new();
        mock.expect_deep_research().returning(|_, identity| {
            if identity.label() == "治理(G)" {
                Err(LLMError::Timeout {
                    operation: "deep_research".into(),
                    elapsed: Duration::from_secs(1800),
                })
            } else {
                Ok("内容".to_string())
            }
        });

        let results = stage(mock).run(&context(), &config()).await.unwrap();
        assert_eq!(results.failed_domains(), vec![Domain::Governance]);

        let governance = &results[Domain::Governance];
        assert_eq!(governance.status, DomainStatus::Failed);
        assert!(governance.raw_text.is_none());
        assert!(governance.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_blank_research_text_counts_as_failure() {
        let mut mock = MockCapability::new();
        mock.expect_deep_research()
            .returning(|_, identity| {
                if identity.label() == "环境(E)" {
                    Ok("  \n ".to_string())
                } else {
                    Ok("内容".to_string())
                }
            });

        let results = stage(mock).run(&context(), &config()).await.unwrap();
        assert_eq!(results.failed_domains(), vec![Domain::Environmental]);
    }

    #[tokio::test]
    async fn test_missing_key_is_dispatch_fault() {
        let mut mock = MockCapability::new();
        mock.expect_deep_research().never();

        let config = PipelineConfig::builder()
            .domain_key(Domain::Environmental, "key-e")
            .domain_key(Domain::Social, "YOUR_API_KEY")
            .domain_key(Domain::Governance, "key-g")
            .build()
            .unwrap();

        let err = stage(mock).run(&context(), &config).await.unwrap_err();
        assert!(matches!(err, PipelineError::DispatchFault(msg) if msg.contains("社会(S)")));
    }
}

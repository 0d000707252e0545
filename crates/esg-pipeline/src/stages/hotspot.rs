//! Cross-domain hotspot summary

use super::domain_blocks;
use crate::error::Result;
use crate::prompts::{HOTSPOT, PromptResolver};
use esg_core::{DomainResults, HotspotText, ReportContext};
use esg_llm::ModelCapability;
use esg_prompt::PromptBuilder;
use std::sync::Arc;
use tracing::{info, warn};

pub struct HotspotStage {
    capability: Arc<dyn ModelCapability>,
    prompts: Arc<PromptResolver>,
}

impl HotspotStage {
    pub fn new(capability: Arc<dyn ModelCapability>, prompts: Arc<PromptResolver>) -> Self {
        Self {
            capability,
            prompts,
        }
    }

    /// Summarize all three domains in one call
    ///
    /// Never fails: any error or blank reply yields [`HotspotText::Unavailable`] with the
    /// reason, and the caller decides how to surface it.
    pub async fn run(&self, context: &ReportContext, results: &DomainResults) -> HotspotText {
        match self.summarize(context, results).await {
            Ok(text) if text.trim().is_empty() => {
                warn!("Hotspot summary unavailable: empty response");
                HotspotText::unavailable("hotspot returned an empty response")
            }
            Ok(text) => {
                info!("Hotspot summary generated ({} chars)", text.len());
                HotspotText::generated(text)
            }
            Err(e) => {
                warn!("Hotspot summary unavailable: {}", e);
                HotspotText::unavailable(e.to_string())
            }
        }
    }

    async fn summarize(&self, context: &ReportContext, results: &DomainResults) -> Result<String> {
        let instructions = self.prompts.resolve(HOTSPOT, context, None)?;
        let builder = PromptBuilder::new()
            .paragraph(instructions)
            .paragraph("以下是E、S、G三个章节的研究内容：");
        let prompt = domain_blocks(builder, results).build_trimmed();

        Ok(self.capability.converse(&prompt, "热点聚焦").await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::MockCapability;
    use chrono::NaiveDate;
    use esg_core::{Domain, DomainResult, NO_CONTENT_PLACEHOLDER, ReportMode};
    use esg_llm::LLMError;
    use std::time::Duration;

    fn context() -> ReportContext {
        ReportContext::for_mode(ReportMode::Weekly, NaiveDate::from_ymd_opt(2025, 3, 12).unwrap())
    }

    fn stage(mock: MockCapability) -> HotspotStage {
        HotspotStage::new(Arc::new(mock), Arc::new(PromptResolver::builtin().unwrap()))
    }

    fn partial() -> DomainResults {
        let mut env = DomainResult::succeeded(Domain::Environmental, "E 原文");
        env.apply_polish("E 润色");
        DomainResults::from_results(vec![
            env,
            DomainResult::succeeded(Domain::Social, "S 原文"),
            DomainResult::failed(Domain::Governance, "timeout"),
        ])
    }

    #[tokio::test]
    async fn test_prompt_includes_every_domain() {
        let mut mock = MockCapability::new();
        mock.expect_converse().times(1).returning(|prompt, label| {
            assert_eq!(label, "热点聚焦");
            assert!(prompt.contains("【环境（E）章节】\nE 润色"));
            assert!(prompt.contains("【社会（S）章节】\nS 原文"));
            assert!(prompt.contains(&format!("【治理（G）章节】\n{NO_CONTENT_PLACEHOLDER}")));
            Ok("本周环境领域……".to_string())
        });

        let hotspot = stage(mock).run(&context(), &partial()).await;
        assert_eq!(hotspot.as_text(), Some("本周环境领域……"));
    }

    #[tokio::test]
    async fn test_failure_yields_unavailable_marker() {
        let mut mock = MockCapability::new();
        mock.expect_converse().returning(|_, _| {
            Err(LLMError::Timeout {
                operation: "converse".into(),
                elapsed: Duration::from_secs(300),
            })
        });

        let hotspot = stage(mock).run(&context(), &partial()).await;
        assert!(!hotspot.is_available());
        assert!(matches!(hotspot, HotspotText::Unavailable { ref reason } if reason.contains("timed out")));
    }

    #[tokio::test]
    async fn test_blank_reply_yields_unavailable_marker() {
        let mut mock = MockCapability::new();
        mock.expect_converse().returning(|_, _| Ok(" \n ".to_string()));

        let hotspot = stage(mock).run(&context(), &partial()).await;
        assert!(!hotspot.is_available());
        assert_eq!(hotspot.prompt_text(), esg_core::HOTSPOT_UNAVAILABLE_PLACEHOLDER);
    }
}

//! Final merge into one report document

use super::domain_blocks;
use crate::error::{PipelineError, Result, RunArtifacts};
use crate::prompts::{MERGE, PromptResolver};
use esg_core::ReportContext;
use esg_llm::ModelCapability;
use esg_prompt::PromptBuilder;
use std::sync::Arc;
use tracing::{error, info};

pub struct MergeStage {
    capability: Arc<dyn ModelCapability>,
    prompts: Arc<PromptResolver>,
}

impl MergeStage {
    pub fn new(capability: Arc<dyn ModelCapability>, prompts: Arc<PromptResolver>) -> Self {
        Self {
            capability,
            prompts,
        }
    }

    /// Merge the hotspot and domain texts into the final document
    ///
    /// On success the returned artifacts carry `final_text`. On failure the
    /// artifacts travel inside [`PipelineError::MergeFailure`] unchanged.
    pub async fn run(&self, context: &ReportContext, artifacts: RunArtifacts) -> Result<RunArtifacts> {
        match self.merge(context, &artifacts).await {
            Ok(text) => {
                info!("Merged report text ({} chars)", text.len());
                Ok(RunArtifacts {
                    final_text: Some(text),
                    ..artifacts
                })
            }
            Err(e) => {
                error!("Merge failed: {}", e);
                Err(PipelineError::MergeFailure {
                    reason: e.to_string(),
                    artifacts: Box::new(artifacts),
                })
            }
        }
    }

    async fn merge(&self, context: &ReportContext, artifacts: &RunArtifacts) -> Result<String> {
        let instructions = self.prompts.resolve(MERGE, context, None)?;
        let builder = PromptBuilder::new()
            .paragraph(instructions)
            .labeled_block("热点聚焦部分", artifacts.hotspot.prompt_text());
        let prompt = domain_blocks(builder, &artifacts.results).build_trimmed();

        Ok(self.capability.converse(&prompt, "合并报告").await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::MockCapability;
    use chrono::NaiveDate;
    use esg_core::{
        Domain, DomainResult, DomainResults, HOTSPOT_UNAVAILABLE_PLACEHOLDER, HotspotText,
        ReportMode,
    };
    use esg_llm::LLMError;

    fn context() -> ReportContext {
        ReportContext::for_mode(ReportMode::Weekly, NaiveDate::from_ymd_opt(2025, 3, 12).unwrap())
    }

    fn stage(mock: MockCapability) -> MergeStage {
        MergeStage::new(Arc::new(mock), Arc::new(PromptResolver::builtin().unwrap()))
    }

    fn artifacts(hotspot: HotspotText) -> RunArtifacts {
        RunArtifacts {
            results: DomainResults::from_results(vec![
                DomainResult::succeeded(Domain::Environmental, "E"),
                DomainResult::succeeded(Domain::Social, "S"),
                DomainResult::failed(Domain::Governance, "timeout"),
            ]),
            hotspot,
            final_text: None,
        }
    }

    #[tokio::test]
    async fn test_merge_sets_final_text() {
        let mut mock = MockCapability::new();
        mock.expect_converse().times(1).returning(|prompt, label| {
            assert_eq!(label, "合并报告");
            assert!(prompt.contains("【热点聚焦部分】\n本周焦点"));
            assert!(prompt.contains("【治理（G）章节】"));
            Ok("# ESG投研周报".to_string())
        });

        let merged = stage(mock)
            .run(&context(), artifacts(HotspotText::generated("本周焦点")))
            .await
            .unwrap();
        assert_eq!(merged.final_text.as_deref(), Some("# ESG投研周报"));
    }

    #[tokio::test]
    async fn test_unavailable_hotspot_uses_placeholder() {
        let mut mock = MockCapability::new();
        mock.expect_converse().returning(|prompt, _| {
            assert!(prompt.contains(HOTSPOT_UNAVAILABLE_PLACEHOLDER));
            Ok("merged".to_string())
        });

        let merged = stage(mock)
            .run(&context(), artifacts(HotspotText::unavailable("timeout")))
            .await
            .unwrap();
        assert!(merged.final_text.is_some());
    }

    #[tokio::test]
    async fn test_failure_preserves_artifacts() {
        let mut mock = MockCapability::new();
        mock.expect_converse()
            .returning(|_, _| Err(LLMError::AuthenticationFailed));

        let err = stage(mock)
            .run(&context(), artifacts(HotspotText::generated("焦点")))
            .await
            .unwrap_err();

        let kept = err.artifacts().unwrap();
        assert!(matches!(err, PipelineError::MergeFailure { .. }));
        assert_eq!(kept.results[Domain::Social].raw_text.as_deref(), Some("S"));
        assert_eq!(kept.hotspot.as_text(), Some("焦点"));
        assert!(kept.final_text.is_none());
    }
}

//! Parallel polish of each domain's research text

use crate::error::Result;
use crate::prompts::{POLISH, PromptResolver};
use esg_core::{Domain, DomainResults, ReportContext};
use esg_llm::ModelCapability;
use esg_prompt::PromptBuilder;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

pub struct PolishStage {
    capability: Arc<dyn ModelCapability>,
    prompts: Arc<PromptResolver>,
}

impl PolishStage {
    pub fn new(capability: Arc<dyn ModelCapability>, prompts: Arc<PromptResolver>) -> Self {
        Self {
            capability,
            prompts,
        }
    }

    /// Polish every successfully researched domain concurrently
    ///
    /// Failed domains are left untouched. A domain whose polish call fails
    /// or comes back blank keeps its raw text as the polished text and
    /// records the error.
    pub async fn run(&self, context: &ReportContext, mut results: DomainResults) -> DomainResults {
        let jobs: Vec<(Domain, String)> = results
            .iter()
            .filter(|r| r.is_ok())
            .filter_map(|r| r.raw_text.clone().map(|raw| (r.domain, raw)))
            .collect();

        info!("Polishing {} domain(s)", jobs.len());
        let tasks = jobs.into_iter().map(|(domain, raw)| async move {
            (domain, self.polish_one(context, domain, &raw).await)
        });

        for (domain, outcome) in join_all(tasks).await {
            let slot = results.get_mut(domain);
            match outcome {
                Ok(text) if text.trim().is_empty() => {
                    warn!("[{}] polish returned no text, keeping raw text", domain.label());
                    slot.polish_fallback("polish returned an empty response");
                }
                Ok(text) => slot.apply_polish(text),
                Err(e) => {
                    warn!("[{}] polish failed, keeping raw text: {}", domain.label(), e);
                    slot.polish_fallback(e.to_string());
                }
            }
        }
        results
    }

    async fn polish_one(&self, context: &ReportContext, domain: Domain, raw: &str) -> Result<String> {
        let instructions = self.prompts.resolve(POLISH, context, Some(domain))?;
        let prompt = PromptBuilder::new()
            .paragraph(instructions)
            .paragraph("以下是需要润色的内容：")
            .text(raw)
            .build();

        let label = format!("润色-{}", domain.code());
        Ok(self.capability.converse(&prompt, &label).await?)
    }
}

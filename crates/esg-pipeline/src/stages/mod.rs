//! The four model-backed stages of a report run
//!
//! Stages share nothing but the capability and the prompt resolver. Each one
//! takes the previous stage's output by value or reference and returns its
//! own; progress reporting is left to the orchestrator.

mod hotspot;
mod merge;
mod polish;
mod research;

pub use hotspot::HotspotStage;
pub use merge::MergeStage;
pub use polish::PolishStage;
pub use research::ResearchStage;

use esg_core::{Domain, DomainResults};
use esg_prompt::PromptBuilder;

/// Append one `【… 章节】` block per domain, with a placeholder for empty domains
fn domain_blocks(builder: PromptBuilder, results: &DomainResults) -> PromptBuilder {
    builder.labeled_blocks(Domain::ALL.map(move |domain| {
        let label = match domain {
            Domain::Governance => "治理（G）章节".to_string(),
            other => format!("{}（{}）章节", other.display_name(), other.code()),
        };
        (label, results[domain].prompt_text())
    }))
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use esg_llm::{Identity, ModelCapability, Result};
    use mockall::mock;

    mock! {
        pub Capability {}

        #[async_trait]
        impl ModelCapability for Capability {
            async fn deep_research(&self, prompt: &str, identity: &Identity) -> Result<String>;
            async fn converse(&self, prompt: &str, label: &str) -> Result<String>;
            fn name(&self) -> &'static str;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esg_core::{DomainResult, NO_CONTENT_PLACEHOLDER};

    #[test]
    fn test_domain_blocks_cover_every_domain() {
        let results = DomainResults::from_results(vec![
            DomainResult::succeeded(Domain::Environmental, "碳市场扩容"),
            DomainResult::failed(Domain::Social, "timeout"),
        ]);

        let text = domain_blocks(PromptBuilder::new(), &results).build();
        assert!(text.contains("【环境（E）章节】\n碳市场扩容"));
        assert!(text.contains(&format!("【社会（S）章节】\n{NO_CONTENT_PLACEHOLDER}")));
        assert!(text.contains("【治理（G）章节】"));
    }
}

//! Pipeline orchestrator
//!
//! Runs the stages in order as a state machine:
//!
//! ```text
//! PENDING → RESEARCHING → POLISHING → HOTSPOT → MERGING → EXTRACTING → DONE
//!               │                                  │           │
//!               └──────────────► FAILED ◄──────────┴───────────┘
//! ```
//!
//! Every transition, and every degraded domain or stage, is reported to the
//! run's [`ProgressSink`]. Stage N+1 only starts once stage N has finished
//! for all domains.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, RunArtifacts};
use crate::extract::ReportExtractor;
use crate::prompts::PromptResolver;
use crate::stages::{HotspotStage, MergeStage, PolishStage, ResearchStage};
use chrono::Utc;
use esg_core::{
    CanonicalReport, Domain, HotspotText, MISSING_RESULT, PipelineState, ProgressEvent,
    ProgressSink, ProgressStatus, ReportContext, ReportMetadata, TracingProgress,
};
use esg_llm::ModelCapability;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub report: CanonicalReport,
    /// Intermediate texts; `final_text` is always set
    pub artifacts: RunArtifacts,
}

/// A configured report pipeline
///
/// # Example
///
/// ```no_run
/// use esg_core::{ReportContext, ReportMode};
/// use esg_llm::{CapabilitySettings, ProviderKind};
/// use esg_pipeline::{Pipeline, PipelineConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let capability = CapabilitySettings::new(ProviderKind::Qwen, "sk-...").build()?;
/// let pipeline = Pipeline::builder(capability)
///     .config(PipelineConfig::builder().api_key("sk-...").build()?)
///     .build()?;
///
/// let today = chrono::Local::now().date_naive();
/// let output = pipeline
///     .run(&ReportContext::for_mode(ReportMode::Weekly, today))
///     .await?;
/// println!("{}", output.report.title);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    capability: Arc<dyn ModelCapability>,
    config: PipelineConfig,
    research: ResearchStage,
    polish: PolishStage,
    hotspot: HotspotStage,
    merge: MergeStage,
    extractor: ReportExtractor,
    progress: Arc<dyn ProgressSink>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder(capability: Arc<dyn ModelCapability>) -> PipelineBuilder {
        PipelineBuilder::new(capability)
    }

    /// Name of the provider behind the capability
    pub fn provider(&self) -> &'static str {
        self.capability.name()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one run for `context`
    ///
    /// Only a dispatch fault, a merge failure or a total extraction failure
    /// fail the run. Domain failures and an unavailable hotspot are reported
    /// to the progress sink and the run continues.
    #[instrument(skip(self, context), fields(run_id = %Uuid::new_v4(), mode = %context.mode()))]
    pub async fn run(&self, context: &ReportContext) -> Result<PipelineOutput> {
        let mut tracker = RunTracker::new(self.progress.as_ref());
        info!(
            "Generating {} for {} with {}",
            context.display_label(),
            context.date_range_cn(),
            self.provider()
        );

        tracker.enter(
            PipelineState::Researching,
            format!("研究期间：{}", context.date_range_cn()),
        );
        let results = match self.research.run(context, &self.config).await {
            Ok(results) => results,
            Err(e) => return Err(tracker.fail(e)),
        };
        for result in results.iter().filter(|r| !r.is_ok()) {
            let reason = result.error.as_deref().unwrap_or(MISSING_RESULT);
            tracker.domain_failure(result.domain, format!("研究失败：{reason}"));
        }

        tracker.enter(
            PipelineState::Polishing,
            format!("润色 {} 个领域", results.ok_count()),
        );
        let results = self.polish.run(context, results).await;
        for result in &results {
            if let Some(reason) = &result.polish_error {
                tracker.domain_failure(result.domain, format!("润色失败，保留原文：{reason}"));
            }
        }

        tracker.enter(PipelineState::Hotspot, "生成热点聚焦");
        let hotspot = self.hotspot.run(context, &results).await;
        if let HotspotText::Unavailable { reason } = &hotspot {
            tracker.warning(format!("热点聚焦不可用，继续合并：{reason}"));
        }

        tracker.enter(PipelineState::Merging, "合并报告");
        let artifacts = RunArtifacts {
            results,
            hotspot,
            final_text: None,
        };
        let artifacts = match self.merge.run(context, artifacts).await {
            Ok(artifacts) => artifacts,
            Err(e) => return Err(tracker.fail(e)),
        };

        tracker.enter(PipelineState::Extracting, "结构化提取");
        let metadata = ReportMetadata {
            start_date: context.start_date(),
            end_date: context.end_date(),
            generated_at: Utc::now(),
        };
        let final_text = artifacts.final_text.as_deref().unwrap_or_default();
        let report = match self.extractor.extract(final_text, metadata) {
            Ok(report) => report,
            Err(e) => return Err(tracker.fail(e.with_artifacts(artifacts))),
        };

        tracker.finish(format!("报告生成完成，共 {} 条动态", report.item_count()));
        Ok(PipelineOutput { report, artifacts })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("provider", &self.provider())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Pipeline`]
pub struct PipelineBuilder {
    capability: Arc<dyn ModelCapability>,
    config: Option<PipelineConfig>,
    prompts: Option<PromptResolver>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl PipelineBuilder {
    pub fn new(capability: Arc<dyn ModelCapability>) -> Self {
        Self {
            capability,
            config: None,
            prompts: None,
            progress: None,
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a prepared resolver instead of one derived from the config
    pub fn prompts(mut self, prompts: PromptResolver) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Progress sink for every run; defaults to [`TracingProgress`]
    pub fn progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline> {
        let config = self
            .config
            .ok_or_else(|| PipelineError::ConfigError("pipeline config is required".to_string()))?;
        config.validate()?;

        let prompts = match (self.prompts, config.prompts_dir()) {
            (Some(prompts), _) => prompts,
            (None, Some(dir)) => PromptResolver::with_overrides(dir)?,
            (None, None) => PromptResolver::builtin()?,
        };
        let prompts = Arc::new(prompts);
        let capability = self.capability;

        Ok(Pipeline {
            research: ResearchStage::new(capability.clone(), prompts.clone()),
            polish: PolishStage::new(capability.clone(), prompts.clone()),
            hotspot: HotspotStage::new(capability.clone(), prompts.clone()),
            merge: MergeStage::new(capability.clone(), prompts),
            extractor: ReportExtractor::new()?,
            progress: self.progress.unwrap_or_else(|| Arc::new(TracingProgress)),
            capability,
            config,
        })
    }
}

/// Current state of one run plus its progress sink
struct RunTracker<'a> {
    sink: &'a dyn ProgressSink,
    state: PipelineState,
}

impl<'a> RunTracker<'a> {
    fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            state: PipelineState::Pending,
        }
    }

    fn transition(&mut self, next: PipelineState) {
        if !self.state.can_transition_to(next) {
            warn!("Unexpected transition {} -> {}", self.state, next);
        }
        self.state = next;
    }

    fn enter(&mut self, stage: PipelineState, message: impl Into<String>) {
        self.transition(stage);
        info!("Stage {}: {}", stage, stage.label());
        self.sink
            .notify(&ProgressEvent::new(stage, ProgressStatus::Started, message));
    }

    fn domain_failure(&self, domain: Domain, message: String) {
        self.sink.notify(
            &ProgressEvent::new(self.state, ProgressStatus::DomainFailure, message)
                .with_domain(domain),
        );
    }

    fn warning(&self, message: String) {
        self.sink
            .notify(&ProgressEvent::new(self.state, ProgressStatus::StageWarning, message));
    }

    fn finish(&mut self, message: String) {
        self.transition(PipelineState::Done);
        info!("{}", message);
        self.sink.notify(&ProgressEvent::new(
            PipelineState::Done,
            ProgressStatus::Completed,
            message,
        ));
    }

    /// Move to `Failed`, report it, and hand the error back
    fn fail(&mut self, error: PipelineError) -> PipelineError {
        let failed_in = self.state;
        self.transition(PipelineState::Failed);
        self.sink.notify(&ProgressEvent::new(
            PipelineState::Failed,
            ProgressStatus::Failed,
            format!("{}阶段失败：{error}", failed_in.label()),
        ));
        error
    }
}

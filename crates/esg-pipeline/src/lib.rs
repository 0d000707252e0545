//! Report generation pipeline for ESG research
//!
//! This crate turns a [`ReportContext`](esg_core::ReportContext) into a
//! [`CanonicalReport`](esg_core::CanonicalReport) by running four
//! model-backed stages and a structured extraction:
//!
//! 1. **Research**: deep research for E, S and G in parallel, one identity
//!    per domain, with per-domain failure isolation
//! 2. **Polish**: parallel refinement of each researched domain, falling back
//!    to the raw text on failure
//! 3. **Hotspot**: one cross-domain summary, degrading to an explicit
//!    placeholder on failure
//! 4. **Merge**: one call assembling the final document
//!
//! The [`Pipeline`] orchestrator sequences the stages and reports every
//! transition to a [`ProgressSink`](esg_core::ProgressSink).

pub mod config;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod prompts;
pub mod stages;

// Re-export for convenience
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{PipelineError, Result, RunArtifacts};
pub use extract::ReportExtractor;
pub use orchestrator::{Pipeline, PipelineBuilder, PipelineOutput};
pub use prompts::PromptResolver;

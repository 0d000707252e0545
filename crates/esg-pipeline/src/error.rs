//! Error types for pipeline runs

use esg_core::{DomainResults, HotspotText};
use esg_llm::LLMError;
use esg_prompt::PromptError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Intermediate outputs of a run, kept for manual recovery when it fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunArtifacts {
    pub results: DomainResults,
    pub hotspot: HotspotText,
    /// Merged document, present once the merge stage succeeded
    pub final_text: Option<String>,
}

/// Run-level failures
///
/// Per-domain and per-item problems never surface here; they are recorded on
/// the domain results and reported through the progress sink instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage could not be started at all
    #[error("Dispatch fault: {0}")]
    DispatchFault(String),

    /// The merge call failed; earlier artifacts are preserved
    #[error("Merge failed: {reason}")]
    MergeFailure {
        reason: String,
        artifacts: Box<RunArtifacts>,
    },

    /// The merged document has no recognizable report structure
    #[error("Unparseable report: {reason}")]
    UnparseableReport {
        reason: String,
        artifacts: Option<Box<RunArtifacts>>,
    },

    /// Prompt template error
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// Model capability error
    #[error("Capability error: {0}")]
    Capability(#[from] LLMError),

    /// Invalid pipeline configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An extraction pattern failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

impl PipelineError {
    pub(crate) fn unparseable(reason: impl Into<String>) -> Self {
        Self::UnparseableReport {
            reason: reason.into(),
            artifacts: None,
        }
    }

    /// Attach run artifacts to an extraction failure
    pub(crate) fn with_artifacts(self, artifacts: RunArtifacts) -> Self {
        match self {
            Self::UnparseableReport { reason, .. } => Self::UnparseableReport {
                reason,
                artifacts: Some(Box::new(artifacts)),
            },
            other => other,
        }
    }

    /// Artifacts preserved by a failed run, if any
    pub fn artifacts(&self) -> Option<&RunArtifacts> {
        match self {
            Self::MergeFailure { artifacts, .. } => Some(artifacts),
            Self::UnparseableReport { artifacts, .. } => artifacts.as_deref(),
            _ => None,
        }
    }
}

//! Core data model for the ESG report pipeline
//!
//! This crate defines the types shared by every other crate in the workspace:
//! the three research domains, the immutable report context, per-domain
//! results, the canonical report record, and progress events.

pub mod context;
pub mod domain;
pub mod error;
pub mod progress;
pub mod report;
pub mod result;

pub use context::{ReportContext, ReportMode};
pub use domain::Domain;
pub use error::{Error, Result};
pub use progress::{
    NoopProgress, PipelineState, ProgressEvent, ProgressFanout, ProgressLog, ProgressSink,
    ProgressStatus, TracingProgress,
};
pub use report::{CanonicalReport, NewsItem, ReportMetadata, Section};
pub use result::{
    DomainResult, DomainResults, DomainStatus, HOTSPOT_UNAVAILABLE_PLACEHOLDER, HotspotText,
    MISSING_RESULT, NO_CONTENT_PLACEHOLDER,
};

//! Pipeline states and progress notification
//!
//! The orchestrator hands a [`ProgressSink`] one [`ProgressEvent`] after every
//! state transition and for every degraded domain or stage. Sinks are
//! fire-and-forget: they cannot fail the run and are never retried.

use crate::Domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Orchestrator state machine
///
/// `Pending → Researching → Polishing → Hotspot → Merging → Extracting → Done`,
/// with `Failed` reachable only from `Researching`, `Merging` and `Extracting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Pending,
    Researching,
    Polishing,
    Hotspot,
    Merging,
    Extracting,
    Done,
    Failed,
}

impl PipelineState {
    /// The next state on the success path
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Researching),
            Self::Researching => Some(Self::Polishing),
            Self::Polishing => Some(Self::Hotspot),
            Self::Hotspot => Some(Self::Merging),
            Self::Merging => Some(Self::Extracting),
            Self::Extracting => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Whether `target` is a legal transition from this state
    pub fn can_transition_to(self, target: Self) -> bool {
        if target == Self::Failed {
            return matches!(self, Self::Researching | Self::Merging | Self::Extracting);
        }
        self.next() == Some(target)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Human-readable stage label
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "准备",
            Self::Researching => "Deep Research（E/S/G）",
            Self::Polishing => "润色（E/S/G）",
            Self::Hotspot => "热点聚焦",
            Self::Merging => "合并报告",
            Self::Extracting => "结构化提取",
            Self::Done => "完成",
            Self::Failed => "失败",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Researching => "RESEARCHING",
            Self::Polishing => "POLISHING",
            Self::Hotspot => "HOTSPOT",
            Self::Merging => "MERGING",
            Self::Extracting => "EXTRACTING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Kind of progress notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// The orchestrator entered a stage
    Started,
    /// The run reached `Done`
    Completed,
    /// One domain's research or polish call failed and was absorbed
    DomainFailure,
    /// A stage degraded but the run continues
    StageWarning,
    /// The run reached `Failed`
    Failed,
}

/// One notification sent to the progress collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: PipelineState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    pub status: ProgressStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(stage: PipelineState, status: ProgressStatus, message: impl Into<String>) -> Self {
        Self {
            stage,
            domain: None,
            status,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }
}

/// Receiver of progress notifications
pub trait ProgressSink: Send + Sync {
    /// Deliver one event; implementations must not block for long
    fn notify(&self, event: &ProgressEvent);
}

impl<T: ProgressSink + ?Sized> ProgressSink for Arc<T> {
    fn notify(&self, event: &ProgressEvent) {
        (**self).notify(event);
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn notify(&self, _event: &ProgressEvent) {}
}

/// Emits every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn notify(&self, event: &ProgressEvent) {
        let domain = event.domain.map(|d| d.code()).unwrap_or("-");
        match event.status {
            ProgressStatus::Started | ProgressStatus::Completed => {
                tracing::info!(stage = %event.stage, domain, "{}", event.message);
            }
            ProgressStatus::DomainFailure | ProgressStatus::StageWarning => {
                tracing::warn!(stage = %event.stage, domain, "{}", event.message);
            }
            ProgressStatus::Failed => {
                tracing::error!(stage = %event.stage, domain, "{}", event.message);
            }
        }
    }
}

/// In-memory log of every event for one run
#[derive(Debug, Default)]
pub struct ProgressLog {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Recorded events with the given status
    pub fn with_status(&self, status: ProgressStatus) -> Vec<ProgressEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.status == status)
            .collect()
    }

    /// States entered, in order
    pub fn states(&self) -> Vec<PipelineState> {
        self.events()
            .into_iter()
            .filter(|e| {
                matches!(
                    e.status,
                    ProgressStatus::Started | ProgressStatus::Completed | ProgressStatus::Failed
                )
            })
            .map(|e| e.stage)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProgressSink for ProgressLog {
    fn notify(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Forwards every event to several sinks
#[derive(Default)]
pub struct ProgressFanout {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl ProgressFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl ProgressSink for ProgressFanout {
    fn notify(&self, event: &ProgressEvent) {
        for sink in &self.sinks {
            sink.notify(event);
        }
    }
}

impl fmt::Debug for ProgressFanout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressFanout")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

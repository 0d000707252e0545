//! Progress snapshot written to `<output>/.progress.json`

use chrono::{DateTime, Utc};
use esg_core::{PipelineState, ProgressEvent, ProgressSink, ProgressStatus};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Done,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: PipelineState,
    pub label: &'static str,
    pub elapsed_secs: f64,
}

/// What the file contains after each event
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub status: RunStatus,
    pub current_stage: Option<PipelineState>,
    pub current_label: Option<&'static str>,
    pub completed_stages: Vec<StageRecord>,
    pub total_elapsed_secs: f64,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

struct Tracking {
    started: Instant,
    current: Option<(PipelineState, Instant)>,
    completed: Vec<StageRecord>,
    status: RunStatus,
}

impl Tracking {
    fn close_current(&mut self) {
        if let Some((stage, entered)) = self.current.take() {
            self.completed.push(StageRecord {
                stage,
                label: stage.label(),
                elapsed_secs: round_secs(entered.elapsed().as_secs_f64()),
            });
        }
    }

    fn apply(&mut self, event: &ProgressEvent) {
        match event.status {
            ProgressStatus::Started => {
                self.close_current();
                self.current = Some((event.stage, Instant::now()));
            }
            ProgressStatus::Completed => {
                self.close_current();
                self.status = RunStatus::Done;
            }
            // the failing stage stays current
            ProgressStatus::Failed => self.status = RunStatus::Error,
            ProgressStatus::DomainFailure | ProgressStatus::StageWarning => {}
        }
    }

    fn snapshot(&self, message: &str) -> Snapshot {
        let current = self.current.map(|(stage, _)| stage);
        Snapshot {
            status: self.status,
            current_stage: current,
            current_label: current.map(PipelineState::label),
            completed_stages: self.completed.clone(),
            total_elapsed_secs: round_secs(self.started.elapsed().as_secs_f64()),
            message: message.to_string(),
            updated_at: Utc::now(),
        }
    }
}

fn round_secs(secs: f64) -> f64 {
    (secs * 10.0).round() / 10.0
}

/// Progress sink that rewrites a JSON snapshot on every event
///
/// Write failures are logged and otherwise ignored.
pub struct ProgressFile {
    path: PathBuf,
    tracking: Mutex<Tracking>,
}

impl ProgressFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tracking: Mutex::new(Tracking {
                started: Instant::now(),
                current: None,
                completed: Vec::new(),
                status: RunStatus::Running,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl ProgressSink for ProgressFile {
    fn notify(&self, event: &ProgressEvent) {
        let snapshot = match self.tracking.lock() {
            Ok(mut tracking) => {
                tracking.apply(event);
                tracking.snapshot(&event.message)
            }
            Err(_) => return,
        };
        if let Err(e) = self.write(&snapshot) {
            warn!("Failed to write {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esg_core::Domain;
    use serde_json::Value;

    fn read(sink: &ProgressFile) -> Value {
        serde_json::from_str(&std::fs::read_to_string(sink.path()).unwrap()).unwrap()
    }

    fn started(stage: PipelineState) -> ProgressEvent {
        ProgressEvent::new(stage, ProgressStatus::Started, stage.label())
    }

    #[test]
    fn test_tracks_current_and_completed_stages() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ProgressFile::new(dir.path().join("out").join(".progress.json"));

        sink.notify(&started(PipelineState::Researching));
        let snapshot = read(&sink);
        assert_eq!(snapshot["status"], "running");
        assert_eq!(snapshot["current_stage"], "RESEARCHING");
        assert_eq!(snapshot["completed_stages"].as_array().unwrap().len(), 0);

        sink.notify(
            &ProgressEvent::new(
                PipelineState::Researching,
                ProgressStatus::DomainFailure,
                "研究失败",
            )
            .with_domain(Domain::Governance),
        );
        assert_eq!(read(&sink)["current_stage"], "RESEARCHING");

        sink.notify(&started(PipelineState::Polishing));
        let snapshot = read(&sink);
        assert_eq!(snapshot["current_stage"], "POLISHING");
        assert_eq!(snapshot["completed_stages"][0]["stage"], "RESEARCHING");
        assert!(snapshot["completed_stages"][0]["elapsed_secs"].is_number());
    }

    #[test]
    fn test_done_closes_last_stage() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ProgressFile::new(dir.path().join(".progress.json"));

        sink.notify(&started(PipelineState::Extracting));
        sink.notify(&ProgressEvent::new(
            PipelineState::Done,
            ProgressStatus::Completed,
            "完成",
        ));

        let snapshot = read(&sink);
        assert_eq!(snapshot["status"], "done");
        assert!(snapshot["current_stage"].is_null());
        assert_eq!(snapshot["completed_stages"].as_array().unwrap().len(), 1);
        assert_eq!(snapshot["message"], "完成");
    }

    #[test]
    fn test_failure_keeps_failing_stage() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ProgressFile::new(dir.path().join(".progress.json"));

        sink.notify(&started(PipelineState::Merging));
        sink.notify(&ProgressEvent::new(
            PipelineState::Failed,
            ProgressStatus::Failed,
            "合并报告阶段失败",
        ));

        let snapshot = read(&sink);
        assert_eq!(snapshot["status"], "error");
        assert_eq!(snapshot["current_stage"], "MERGING");
        assert_eq!(snapshot["current_label"], "合并报告");
    }
}

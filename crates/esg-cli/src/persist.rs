//! Writing the finished report and the raw stage outputs to disk

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use esg_core::{CanonicalReport, Domain, ReportContext, ReportMode};
use esg_pipeline::RunArtifacts;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

const EMPTY: &str = "无内容";

/// Provider and models recorded alongside the report
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub provider: String,
    pub chat_model: String,
    pub research_model: String,
}

#[derive(Serialize)]
struct ReportFile<'a> {
    report_metadata: FileMetadata<'a>,
    report_content: &'a CanonicalReport,
}

#[derive(Serialize)]
struct FileMetadata<'a> {
    title: &'a str,
    report_type: ReportMode,
    start_date: NaiveDate,
    end_date: NaiveDate,
    generation_time: DateTime<Utc>,
    #[serde(flatten)]
    run: &'a RunInfo,
}

/// Writes `<root>/<mode>/<suffix>_报告.json` and `<suffix>_原始内容.txt`
pub struct ReportWriter {
    dir: PathBuf,
    run: RunInfo,
}

impl ReportWriter {
    pub fn new(root: &Path, mode: ReportMode, run: RunInfo) -> Self {
        Self {
            dir: root.join(mode.as_str()),
            run,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_report(&self, context: &ReportContext, report: &CanonicalReport) -> Result<PathBuf> {
        let file = ReportFile {
            report_metadata: FileMetadata {
                title: context.display_label(),
                report_type: context.mode(),
                start_date: report.metadata.start_date,
                end_date: report.metadata.end_date,
                generation_time: report.metadata.generated_at,
                run: &self.run,
            },
            report_content: report,
        };
        let json = serde_json::to_string_pretty(&file)?;
        let path = self.path(context, "报告.json");
        self.write(&path, &json)?;
        info!("Report saved to {}", path.display());
        Ok(path)
    }

    /// Raw content file; written even when the run failed after research
    pub fn write_raw(&self, context: &ReportContext, artifacts: &RunArtifacts) -> Result<PathBuf> {
        let text = render_raw(context, artifacts, Local::now());
        let path = self.path(context, "原始内容.txt");
        self.write(&path, &text)?;
        info!("Raw content saved to {}", path.display());
        Ok(path)
    }

    fn path(&self, context: &ReportContext, name: &str) -> PathBuf {
        self.dir.join(format!("{}_{name}", context.file_suffix()))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
    }
}

fn raw_section_label(domain: Domain) -> &'static str {
    match domain {
        Domain::Environmental => "环境（E）章节",
        Domain::Social => "社会（S）章节",
        Domain::Governance => "公司治理（G）章节",
    }
}

fn render_raw(context: &ReportContext, artifacts: &RunArtifacts, now: DateTime<Local>) -> String {
    let heavy = "=".repeat(80);
    let light = "-".repeat(80);
    let mut out = format!(
        "{heavy}\n{} - 原始内容\n研究期间：{}\n生成时间：{}\n{heavy}\n",
        context.display_label(),
        context.date_range_cn(),
        now.format("%Y-%m-%d %H:%M:%S"),
    );

    let mut section = |title: &str, body: &str| {
        out.push_str(&format!("\n【{title}】\n{light}\n{body}\n"));
    };
    section(
        "最终合并报告",
        artifacts.final_text.as_deref().unwrap_or(EMPTY),
    );
    section("热点聚焦", artifacts.hotspot.as_text().unwrap_or(EMPTY));
    for result in &artifacts.results {
        section(
            raw_section_label(result.domain),
            result.best_text().unwrap_or(EMPTY),
        );
    }

    out
}

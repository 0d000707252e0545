//! ESG report generator
//!
//! Runs the full research pipeline for one weekly or daily report and saves
//! the structured JSON report plus the raw stage outputs.
//!
//! # Usage
//!
//! ```bash
//! export ESG_PROVIDER=qwen
//! export DASHSCOPE_API_KEY=sk-...
//!
//! cargo run --bin esg-report -- --mode daily
//! cargo run --bin esg-report -- --mode weekly --today 2025-06-18 --prompts prompts/
//! ```

mod persist;
mod progress_file;
mod summary;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use esg_core::{Domain, ProgressFanout, ReportContext, ReportMode, TracingProgress};
use esg_llm::ProviderKind;
use esg_pipeline::{Pipeline, PipelineConfig, PipelineOutput};
use esg_utils::{AppConfig, LogFormat};
use persist::{ReportWriter, RunInfo};
use progress_file::ProgressFile;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "esg-report")]
#[command(about = "Generate ESG investment research reports", long_about = None)]
struct Args {
    /// Report cadence: weekly or daily
    #[arg(short, long, default_value = "weekly")]
    mode: ReportMode,

    /// Model provider: gemini or qwen (overrides config and ESG_PROVIDER)
    #[arg(short, long)]
    provider: Option<ProviderKind>,

    /// Path to config.json
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Directory of template overrides (`<name>.jinja` / `<name>.j2`)
    #[arg(long)]
    prompts: Option<PathBuf>,

    /// Output root (defaults to the configured output_dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Anchor date, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    esg_utils::init_tracing_with(format, "info");

    let mut config = AppConfig::load(&args.config)?.with_env()?;
    if let Some(provider) = args.provider {
        config = config.with_provider(provider);
    }
    config.validate()?;

    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let context = ReportContext::for_mode(args.mode, today);
    let output_root = args.output.unwrap_or_else(|| config.output_dir.clone());
    info!(
        "Starting {} for {} with provider {}",
        context.display_label(),
        context.date_range_cn(),
        config.provider
    );

    let capability = config.capability_settings()?.build()?;

    let keys = config.domain_keys()?;
    let mut pipeline_config = PipelineConfig::builder();
    for domain in Domain::ALL {
        pipeline_config = pipeline_config.domain_key(domain, keys.get(domain));
    }
    if let Some(dir) = args.prompts {
        pipeline_config = pipeline_config.prompts_dir(dir);
    }

    let progress_file = Arc::new(ProgressFile::new(output_root.join(".progress.json")));
    let progress = ProgressFanout::new()
        .with(Arc::new(TracingProgress))
        .with(progress_file);

    let pipeline = Pipeline::builder(capability)
        .config(pipeline_config.build()?)
        .progress(Arc::new(progress))
        .build()?;

    let writer = ReportWriter::new(
        &output_root,
        context.mode(),
        RunInfo {
            provider: config.provider.to_string(),
            chat_model: config.chat_model(),
            research_model: config.research_model(),
        },
    );

    match pipeline.run(&context).await {
        Ok(PipelineOutput {
            mut report,
            artifacts,
        }) => {
            if report.title.is_empty() {
                report.title = context.default_title();
            }
            writer.write_raw(&context, &artifacts)?;
            let path = writer.write_report(&context, &report)?;

            println!("{}", summary::render(&artifacts, Some(&report)));
            println!("报告已保存：{}", path.display());
            Ok(())
        }
        Err(err) => {
            error!("Pipeline failed: {}", err);
            if let Some(artifacts) = err.artifacts() {
                match writer.write_raw(&context, artifacts) {
                    Ok(path) => println!("原始内容已保存：{}", path.display()),
                    Err(e) => warn!("Could not save raw content: {:#}", e),
                }
                println!("{}", summary::render(artifacts, None));
            }
            Err(err).context(format!("{} generation failed", context.display_label()))
        }
    }
}

//! Report context: the mode and date range of one run
//!
//! A [`ReportContext`] is derived once from the requested mode and an anchor
//! date, and is immutable for the rest of the run. Every prompt placeholder
//! that mentions a date is formatted from it.

use crate::{Error, Result};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Report cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Previous Monday through Sunday
    #[default]
    Weekly,
    /// Previous calendar day
    Daily,
}

impl ReportMode {
    /// Stable identifier, also used as the output sub-directory name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Daily => "daily",
        }
    }

    /// Report label shown in titles
    pub const fn label(self) -> &'static str {
        match self {
            Self::Weekly => "ESG投研周报",
            Self::Daily => "ESG投研日报",
        }
    }

    /// Report type in Chinese (周报 / 日报)
    pub const fn type_cn(self) -> &'static str {
        match self {
            Self::Weekly => "周报",
            Self::Daily => "日报",
        }
    }

    /// Phrase describing the covered period (过去一周 / 当日)
    pub const fn period_phrase(self) -> &'static str {
        match self {
            Self::Weekly => "过去一周",
            Self::Daily => "当日",
        }
    }

    /// Phrase for "this period" (本周 / 当日)
    pub const fn this_period(self) -> &'static str {
        match self {
            Self::Weekly => "本周",
            Self::Daily => "当日",
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(Self::Weekly),
            "daily" | "day" => Ok(Self::Daily),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

/// Mode and date range of one report run
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use esg_core::{ReportContext, ReportMode};
///
/// // Wednesday 2025-01-15 -> previous Monday..Sunday
/// let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
/// let ctx = ReportContext::for_mode(ReportMode::Weekly, today);
///
/// assert_eq!(ctx.start_date().to_string(), "2025-01-06");
/// assert_eq!(ctx.end_date().to_string(), "2025-01-12");
/// assert_eq!(ctx.date_range_cn(), "2025年01月06日 至 2025年01月12日");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportContext {
    mode: ReportMode,
    start_date: NaiveDate,
    end_date: NaiveDate,
    display_label: String,
}

impl ReportContext {
    /// Derive the context for `mode` relative to the anchor date `today`
    pub fn for_mode(mode: ReportMode, today: NaiveDate) -> Self {
        let (start, end) = match mode {
            ReportMode::Weekly => {
                let back = u64::from(today.weekday().num_days_from_monday()) + 7;
                let monday = today - Days::new(back);
                (monday, monday + Days::new(6))
            }
            ReportMode::Daily => {
                let yesterday = today - Days::new(1);
                (yesterday, yesterday)
            }
        };

        Self {
            mode,
            start_date: start,
            end_date: end,
            display_label: mode.label().to_string(),
        }
    }

    /// Build a context for an explicit range
    pub fn new(mode: ReportMode, start_date: NaiveDate, end_date: NaiveDate) -> Result<Self> {
        if start_date > end_date {
            return Err(Error::InvalidDateRange {
                start: start_date.to_string(),
                end: end_date.to_string(),
            });
        }

        Ok(Self {
            mode,
            start_date,
            end_date,
            display_label: mode.label().to_string(),
        })
    }

    pub fn mode(&self) -> ReportMode {
        self.mode
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn display_label(&self) -> &str {
        &self.display_label
    }

    /// Whether the range covers a single day
    pub fn is_single_day(&self) -> bool {
        self.start_date == self.end_date
    }

    /// Start date as `YYYY年MM月DD日`
    pub fn start_date_cn(&self) -> String {
        format_cn(self.start_date)
    }

    /// End date as `YYYY年MM月DD日`
    pub fn end_date_cn(&self) -> String {
        format_cn(self.end_date)
    }

    /// Chinese date range, collapsed to one date for single-day runs
    pub fn date_range_cn(&self) -> String {
        self.join_range(format_cn, " 至 ")
    }

    /// ISO date range, collapsed to one date for single-day runs
    pub fn date_range_iso(&self) -> String {
        self.join_range(|d| d.format("%Y-%m-%d").to_string(), " 至 ")
    }

    /// Dotted range such as `2025.01.06-2025.01.12`
    pub fn date_range_compact(&self) -> String {
        self.join_range(|d| d.format("%Y.%m.%d").to_string(), "-")
    }

    /// File-name prefix: `YYYYMMDD` or `YYYYMMDD_YYYYMMDD`
    pub fn file_suffix(&self) -> String {
        self.join_range(|d| d.format("%Y%m%d").to_string(), "_")
    }

    /// Fallback title, e.g. `ESG投研周报（2025年01月06日 至 2025年01月12日）`
    pub fn default_title(&self) -> String {
        format!("{}（{}）", self.display_label, self.date_range_cn())
    }

    fn join_range(&self, fmt: impl Fn(NaiveDate) -> String, sep: &str) -> String {
        if self.is_single_day() {
            fmt(self.start_date)
        } else {
            format!("{}{sep}{}", fmt(self.start_date), fmt(self.end_date))
        }
    }
}

fn format_cn(date: NaiveDate) -> String {
    date.format("%Y年%m月%d日").to_string()
}

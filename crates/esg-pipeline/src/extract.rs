//! Structured extraction of the merged report text
//!
//! The merged document is split line by line into a preamble (title and
//! hotspot) and one region per domain, using the domain section headings as
//! boundaries. Each region is then split into items at `###` headings. The
//! parse is a pure function of the text and the supplied metadata, so the
//! same input always yields the same [`CanonicalReport`].

use crate::error::{PipelineError, Result};
use esg_core::{CanonicalReport, Domain, NewsItem, ReportMetadata, Section};
use regex::Regex;
use tracing::debug;

const HOTSPOT_HEADINGS: [&str; 2] = ["热点聚焦", "核心摘要"];

/// Hosts whose redirect links mark a line as a citation
const CITATION_HOSTS: [&str; 2] = ["vertexaisearch.cloud.google.com", "grounding-api-redirect"];

/// Field an unlabeled line is appended to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Lede,
    Body,
    Commentary,
    Closing,
}

/// Parser for merged report text
#[derive(Debug)]
pub struct ReportExtractor {
    spaces: Regex,
    domain_heading: Regex,
    label: Regex,
    source: Regex,
    url: Regex,
}

impl ReportExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            spaces: compile(r"[ \t\u{3000}\u{00A0}]+")?,
            domain_heading: compile(concat!(
                r"^(?:[一二三四五六七八九十\d]+\s*[、.．]\s*)?",
                r"(?:公司)?(环境|社会|治理)\s*[（(]\s*([ESG])\s*[）)]\s*",
                r"(?:(?:动态|章节|板块|部分)[^。！？!?】:：]*)?$",
            ))?,
            label: compile(r"^(导语|正文|点评|结语)\s*[:：]\s*(.*)$")?,
            source: compile(r"^(?:(?:资料来源|来源|(?i:sources?))\s*[:：]|\[资料来源\]|\[cite:)")?,
            url: compile(r"https?://[^\s)）\]】>，,]+")?,
        })
    }

    /// Parse `final_text` into a canonical report
    ///
    /// Fails with [`PipelineError::UnparseableReport`] when no domain
    /// heading is present, or when nothing precedes the first one. Missing
    /// items, fields or source lines degrade to empty values.
    pub fn extract(&self, final_text: &str, metadata: ReportMetadata) -> Result<CanonicalReport> {
        let lines = self.normalize(final_text);

        let mut preamble: Vec<&str> = Vec::new();
        let mut regions: [Vec<&str>; 3] = Default::default();
        let mut current: Option<Domain> = None;
        for line in &lines {
            if let Some(domain) = self.domain_of_heading(line) {
                current = Some(domain);
                continue;
            }
            match current {
                Some(domain) => regions[domain.index()].push(line),
                None => preamble.push(line),
            }
        }

        if current.is_none() {
            return Err(PipelineError::unparseable("no domain section headings found"));
        }

        let (title, hotspot) = split_preamble(&preamble);
        if title.is_empty() && hotspot.is_empty() {
            return Err(PipelineError::unparseable(
                "no title or hotspot before the first domain section",
            ));
        }

        let sections = Domain::ALL.map(|domain| Section {
            domain,
            title: domain.section_title().to_string(),
            items: self.parse_items(&regions[domain.index()]),
        });
        debug!(
            "Extracted {} item(s) across {} section(s)",
            sections.iter().map(|s| s.items.len()).sum::<usize>(),
            sections.len()
        );

        Ok(CanonicalReport {
            metadata,
            title,
            hotspot,
            sections,
        })
    }

    /// Trim lines, collapse whitespace runs, drop blank and rule-only lines
    fn normalize(&self, text: &str) -> Vec<String> {
        text.lines()
            .map(|line| self.spaces.replace_all(line.trim(), " ").into_owned())
            .filter(|line| !line.is_empty() && !is_rule(line))
            .collect()
    }

    fn domain_of_heading(&self, line: &str) -> Option<Domain> {
        if !line.starts_with(['【', '#', '*']) {
            return None;
        }
        let heading = strip_decoration(line).trim_end_matches([':', '：']);
        let caps = self.domain_heading.captures(heading)?;
        let domain: Domain = caps[2].parse().ok()?;
        (domain.display_name() == &caps[1]).then_some(domain)
    }

    fn parse_items(&self, lines: &[&str]) -> Vec<NewsItem> {
        let mut items = Vec::new();
        let mut current: Option<NewsItem> = None;
        let mut pending: Option<Field> = None;

        for line in lines {
            if line.starts_with("###") {
                if let Some(item) = current.take() {
                    items.push(item);
                }
                current = Some(NewsItem {
                    subtitle: clean_heading(line),
                    ..NewsItem::default()
                });
                pending = None;
                continue;
            }
            // Text before the first item heading is section preamble
            let Some(item) = current.as_mut() else {
                continue;
            };

            let text = line.replace("**", "");
            let text = text.trim();

            if self.is_source_line(text) {
                if item.source_url.is_empty() {
                    if let Some(url) = self.url.find(text) {
                        item.source_url = url.as_str().to_string();
                    }
                }
                pending = None;
                continue;
            }

            if let Some(caps) = self.label.captures(text) {
                let field = match &caps[1] {
                    "导语" => Field::Lede,
                    "点评" => Field::Commentary,
                    "结语" => Field::Closing,
                    _ => Field::Body,
                };
                let content = caps[2].trim();
                if content.is_empty() {
                    pending = Some(field);
                } else {
                    append(field_mut(item, field), content);
                    pending = None;
                }
                continue;
            }

            let field = pending.take().unwrap_or(Field::Body);
            append(field_mut(item, field), text);
        }

        if let Some(item) = current {
            items.push(item);
        }
        items.retain(|item| *item != NewsItem::default());
        items
    }

    fn is_source_line(&self, text: &str) -> bool {
        self.source.is_match(text) || CITATION_HOSTS.iter().any(|host| text.contains(host))
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| PipelineError::InvalidPattern(e.to_string()))
}

/// Title and hotspot text from the lines before the first domain heading
fn split_preamble(lines: &[&str]) -> (String, String) {
    let header = lines.iter().position(|line| hotspot_heading(line).is_some());

    let title = match lines.first() {
        Some(first) if header != Some(0) && looks_like_title(first) => clean_heading(first),
        _ => String::new(),
    };

    let mut hotspot: Vec<String> = Vec::new();
    match header {
        Some(idx) => {
            if let Some(inline) = hotspot_heading(lines[idx]).filter(|rest| !rest.is_empty()) {
                hotspot.push(inline.to_string());
            }
            hotspot.extend(lines[idx + 1..].iter().map(|line| line.replace("**", "")));
        }
        None => {
            let skip = usize::from(!title.is_empty());
            hotspot.extend(lines.iter().skip(skip).map(|line| line.replace("**", "")));
        }
    }

    (title, hotspot.join("\n").trim().to_string())
}

/// For a hotspot heading line, the text following the heading on that line
fn hotspot_heading(line: &str) -> Option<&str> {
    if !line.starts_with(['【', '#', '*']) {
        return None;
    }
    let stripped = strip_decoration(line);
    HOTSPOT_HEADINGS.iter().find_map(|heading| {
        stripped.strip_prefix(heading).map(|rest| {
            rest.trim_start_matches(['】', ':', '：', '*', ' '])
                .trim()
        })
    })
}

fn looks_like_title(line: &str) -> bool {
    line.starts_with('#') || (line.contains("ESG") && (line.contains("周报") || line.contains("日报")))
}

fn clean_heading(line: &str) -> String {
    line.trim_start_matches('#').replace('*', "").trim().to_string()
}

fn strip_decoration(line: &str) -> &str {
    line.trim_matches(|c: char| matches!(c, '#' | '*' | '【' | '】' | '[' | ']') || c.is_whitespace())
}

/// Lines made only of rule characters such as `---` or `***`
fn is_rule(line: &str) -> bool {
    line.chars().all(|c| matches!(c, '-' | '*' | '=' | '_' | ' '))
}

fn field_mut(item: &mut NewsItem, field: Field) -> &mut String {
    match field {
        Field::Lede => &mut item.lede,
        Field::Body => &mut item.body,
        Field::Commentary => &mut item.commentary,
        Field::Closing => &mut item.closing,
    }
}

fn append(target: &mut String, text: &str) {
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(text);
}

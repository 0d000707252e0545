//! Per-domain results and the hotspot summary
//!
//! Domain failures are values, not errors: a failed research call produces a
//! [`DomainResult`] with [`DomainStatus::Failed`] and the captured message, and
//! later stages inspect the status instead of unwinding.

use crate::Domain;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Error recorded for a domain slot that never received a result
pub const MISSING_RESULT: &str = "no research result was recorded for this domain";

/// Text handed to downstream prompts when a domain has no usable content
pub const NO_CONTENT_PLACEHOLDER: &str = "无内容（本期未检索到该领域的相关动态）";

/// Text handed to the merge prompt when the hotspot summary is unavailable
pub const HOTSPOT_UNAVAILABLE_PLACEHOLDER: &str = "（热点聚焦暂缺，请仅依据下列各领域内容撰写，不得编造）";

/// Outcome of a domain's research call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DomainStatus {
    Ok,
    Failed,
}

/// Research and polish output for one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainResult {
    pub domain: Domain,
    pub raw_text: Option<String>,
    pub polished_text: Option<String>,
    pub status: DomainStatus,
    /// Research failure message, set when `status` is `Failed`
    pub error: Option<String>,
    /// Polish failure message; `polished_text` then holds the raw text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polish_error: Option<String>,
}

impl DomainResult {
    /// A successful research result
    pub fn succeeded(domain: Domain, raw_text: impl Into<String>) -> Self {
        Self {
            domain,
            raw_text: Some(raw_text.into()),
            polished_text: None,
            status: DomainStatus::Ok,
            error: None,
            polish_error: None,
        }
    }

    /// A failed research result
    pub fn failed(domain: Domain, error: impl Into<String>) -> Self {
        Self {
            domain,
            raw_text: None,
            polished_text: None,
            status: DomainStatus::Failed,
            error: Some(error.into()),
            polish_error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == DomainStatus::Ok
    }

    /// Record a successful polish pass
    pub fn apply_polish(&mut self, text: impl Into<String>) {
        self.polished_text = Some(text.into());
        self.polish_error = None;
    }

    /// Record a failed polish pass; the raw text stands in for the polished text
    pub fn polish_fallback(&mut self, error: impl Into<String>) {
        self.polished_text.clone_from(&self.raw_text);
        self.polish_error = Some(error.into());
    }

    /// Polished text, else raw text; blank text counts as absent
    pub fn best_text(&self) -> Option<&str> {
        let non_blank = |t: &&str| !t.trim().is_empty();
        self.polished_text
            .as_deref()
            .filter(non_blank)
            .or_else(|| self.raw_text.as_deref().filter(non_blank))
    }

    /// Text for downstream prompts, with an explicit placeholder when empty
    pub fn prompt_text(&self) -> &str {
        self.best_text().unwrap_or(NO_CONTENT_PLACEHOLDER)
    }
}

/// Exactly one [`DomainResult`] per domain, in report order
///
/// Each domain owns one slot, so concurrent stages write disjoint slots and
/// no domain record is ever dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainResults {
    slots: [DomainResult; 3],
}

impl DomainResults {
    /// Collect results into their slots
    ///
    /// A domain with no entry is recorded as failed with [`MISSING_RESULT`];
    /// a later entry for the same domain replaces an earlier one.
    pub fn from_results(results: impl IntoIterator<Item = DomainResult>) -> Self {
        let mut slots = Domain::ALL.map(|d| DomainResult::failed(d, MISSING_RESULT));
        for result in results {
            let idx = result.domain.index();
            slots[idx] = result;
        }
        Self { slots }
    }

    pub fn get(&self, domain: Domain) -> &DomainResult {
        &self.slots[domain.index()]
    }

    pub fn get_mut(&mut self, domain: Domain) -> &mut DomainResult {
        &mut self.slots[domain.index()]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DomainResult> {
        self.slots.iter()
    }

    /// Domains whose research failed
    pub fn failed_domains(&self) -> Vec<Domain> {
        self.slots
            .iter()
            .filter(|r| !r.is_ok())
            .map(|r| r.domain)
            .collect()
    }

    /// Number of domains whose research succeeded
    pub fn ok_count(&self) -> usize {
        self.slots.iter().filter(|r| r.is_ok()).count()
    }
}

impl Index<Domain> for DomainResults {
    type Output = DomainResult;

    fn index(&self, domain: Domain) -> &Self::Output {
        self.get(domain)
    }
}

impl IntoIterator for DomainResults {
    type Item = DomainResult;
    type IntoIter = std::array::IntoIter<DomainResult, 3>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter()
    }
}

impl<'a> IntoIterator for &'a DomainResults {
    type Item = &'a DomainResult;
    type IntoIter = std::slice::Iter<'a, DomainResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

/// Cross-domain summary produced once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HotspotText {
    /// Summary produced by the model
    Generated { text: String },
    /// The hotspot call failed; the run continues without a summary
    Unavailable { reason: String },
}

impl HotspotText {
    pub fn generated(text: impl Into<String>) -> Self {
        Self::Generated { text: text.into() }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }

    /// The generated summary, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Generated { text } => Some(text),
            Self::Unavailable { .. } => None,
        }
    }

    /// Text for the merge prompt
    pub fn prompt_text(&self) -> &str {
        self.as_text().unwrap_or(HOTSPOT_UNAVAILABLE_PLACEHOLDER)
    }
}

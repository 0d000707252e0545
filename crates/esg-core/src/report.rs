//! Canonical report record handed to persistence and templating

use crate::Domain;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Run metadata carried on the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
}

/// One news entry inside a domain section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub subtitle: String,
    pub lede: String,
    pub body: String,
    pub commentary: String,
    pub closing: String,
    /// Empty when the item carried no source line
    pub source_url: String,
}

/// A domain section of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub domain: Domain,
    pub title: String,
    pub items: Vec<NewsItem>,
}

impl Section {
    /// A section with no items and the domain's standard title
    pub fn empty(domain: Domain) -> Self {
        Self {
            domain,
            title: domain.section_title().to_string(),
            items: Vec::new(),
        }
    }
}

/// Structured report extracted from the merged document
///
/// `sections` always holds exactly three entries in E, S, G order; a domain
/// with no content has an empty `items` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalReport {
    pub metadata: ReportMetadata,
    pub title: String,
    pub hotspot: String,
    pub sections: [Section; 3],
}

impl CanonicalReport {
    pub fn section(&self, domain: Domain) -> &Section {
        &self.sections[domain.index()]
    }

    /// Total number of news items across all sections
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            start_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 12).unwrap(),
            generated_at: DateTime::from_timestamp(1_736_700_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_section_lookup_and_counts() {
        let mut sections = Domain::ALL.map(Section::empty);
        sections[1].items.push(NewsItem {
            subtitle: "标题".to_string(),
            ..NewsItem::default()
        });

        let report = CanonicalReport {
            metadata: metadata(),
            title: "ESG投研周报".to_string(),
            hotspot: String::new(),
            sections,
        };

        assert_eq!(report.section(Domain::Social).items.len(), 1);
        assert_eq!(report.section(Domain::Governance).title, "公司治理（G）动态");
        assert_eq!(report.item_count(), 1);
    }

    #[test]
    fn test_serialization() {
        let report = CanonicalReport {
            metadata: metadata(),
            title: "t".to_string(),
            hotspot: "h".to_string(),
            sections: Domain::ALL.map(Section::empty),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["metadata"]["start_date"], "2025-01-06");
        assert_eq!(json["sections"][2]["domain"], "G");

        let back: CanonicalReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}

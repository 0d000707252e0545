//! End-of-run summary table

use comfy_table::{Table, presets::UTF8_FULL};
use esg_core::{CanonicalReport, DomainStatus};
use esg_pipeline::RunArtifacts;

/// One row per domain: status, item count, and the error if any
pub fn render(artifacts: &RunArtifacts, report: Option<&CanonicalReport>) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["领域", "状态", "条目数", "错误"]);

    for result in &artifacts.results {
        let status = match (result.status, &result.polish_error) {
            (DomainStatus::Failed, _) => "失败",
            (DomainStatus::Ok, Some(_)) => "成功（未润色）",
            (DomainStatus::Ok, None) => "成功",
        };
        let items = report.map_or_else(
            || "-".to_string(),
            |r| r.section(result.domain).items.len().to_string(),
        );
        let error = result
            .error
            .as_deref()
            .or(result.polish_error.as_deref())
            .unwrap_or("");
        table.add_row(vec![
            result.domain.label(),
            status.to_string(),
            items,
            error.to_string(),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use esg_core::{Domain, DomainResult, DomainResults, HotspotText};

    #[test]
    fn test_render_lists_each_domain() {
        let mut social = DomainResult::succeeded(Domain::Social, "S");
        social.polish_fallback("overloaded");
        let artifacts = RunArtifacts {
            results: DomainResults::from_results(vec![
                DomainResult::succeeded(Domain::Environmental, "E"),
                social,
                DomainResult::failed(Domain::Governance, "deep_research timed out after 1800s"),
            ]),
            hotspot: HotspotText::generated("焦点"),
            final_text: None,
        };

        let table = render(&artifacts, None);
        assert!(table.contains("环境(E)"));
        assert!(table.contains("成功（未润色）"));
        assert!(table.contains("overloaded"));
        assert!(table.contains("失败"));
        assert!(table.contains("timed out"));
    }
}

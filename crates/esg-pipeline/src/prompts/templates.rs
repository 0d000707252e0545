//! Builtin prompt templates
//!
//! Every template reads its date range from the run context; `research` and
//! `polish` also read the domain placeholders and therefore need a domain.

use super::{HOTSPOT, MERGE, POLISH, RESEARCH};
use esg_prompt::{JinjaTemplate, Result};

/// Deep-research instructions for one domain
pub fn research_prompt() -> Result<JinjaTemplate> {
    JinjaTemplate::new(
        RESEARCH,
        r"你是一名资深 ESG 投研分析师，正在为《{{ REPORT_LABEL }}》撰写{{ DOMAIN_CN }}（{{ DOMAIN }}）章节的素材。

请围绕{{ PERIOD_PHRASE }}（{{ DATE_RANGE }}）全球及中国市场{{ DOMAIN_CN }}（{{ DOMAIN }}）领域的重要动态开展深入研究。

研究要求：
1. 只收录发布或发生在 {{ DATE_RANGE_ISO }} 期间的事件，期间以外的内容一律不用。
2. 关注政策法规、监管动向、行业标准、企业实践及资本市场反应，优先选择对投资决策有实质影响的事件。
3. 每条动态给出一个简明标题，风格参考：“{{ DOMAIN_EXAMPLE }}”。
4. 每条动态说明事件经过、关键数据及潜在影响，并附可访问的原文链接。
5. 如{{ THIS_PERIOD }}确无该领域的重要动态，请如实说明，不得编造。",
    )
}

/// Reformat one domain's raw research into report items
pub fn polish_prompt() -> Result<JinjaTemplate> {
    JinjaTemplate::new(
        POLISH,
        r"请将下面的{{ DOMAIN_CN }}（{{ DOMAIN }}）领域研究内容整理为《{{ REPORT_LABEL }}》的正式章节，研究期间为{{ DATE_RANGE }}。

格式要求：
- 每条动态以“### ”开头写小标题；
- 小标题下依次写“导语：”“正文：”“点评：”“结语：”四段；
- 每条动态最后单独一行写“资料来源：”并附原文链接；
- 保留原文的事实、数据和链接，删去{{ DATE_RANGE }}以外的内容；
- 只输出章节内容，不要输出寒暄或说明。",
    )
}

/// Cross-domain hotspot summary
pub fn hotspot_prompt() -> Result<JinjaTemplate> {
    JinjaTemplate::new(
        HOTSPOT,
        r"你是《{{ REPORT_LABEL }}》的主编。请阅读下列 E、S、G 三个章节的研究内容，撰写{{ THIS_PERIOD }}的“热点聚焦”，研究期间为{{ DATE_RANGE }}。

要求：
- 分别用一段话概括环境（E）、社会（S）、公司治理（G）领域{{ PERIOD_PHRASE }}最值得关注的趋势，每段不超过 150 字；
- 某个章节标注为“无内容”时，写明该领域{{ THIS_PERIOD }}暂无重要动态，不得编造；
- 只输出热点聚焦正文，不要输出标题。",
    )
}

/// Final assembly into the report output format
pub fn merge_prompt() -> Result<JinjaTemplate> {
    JinjaTemplate::new(
        MERGE,
        r"请将下列热点聚焦与 E、S、G 三个章节合并为一篇完整的《{{ REPORT_LABEL }}》，研究期间为{{ DATE_RANGE }}。严格按以下格式输出：

# {{ REPORT_LABEL }}（{{ DATE_RANGE }}）
【热点聚焦】
热点聚焦正文
【环境（E）动态】
### 小标题
导语：……
正文：……
点评：……
结语：……
资料来源：原文链接
【社会（S）动态】
……
【公司治理（G）动态】
……

要求：
- 三个章节必须全部出现且顺序固定；某章节无内容时保留章节标题，并写一句“{{ THIS_PERIOD }}暂无重要动态”；
- 不得改写事实、数据和链接；
- 不要输出格式以外的任何说明。",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use esg_prompt::PromptTemplate;

    #[test]
    fn test_domain_placeholders_only_where_needed() {
        assert!(research_prompt().unwrap().references("DOMAIN_EXAMPLE"));
        assert!(polish_prompt().unwrap().references("DOMAIN_CN"));
        assert!(!hotspot_prompt().unwrap().references("DOMAIN"));
        assert!(!merge_prompt().unwrap().references("DOMAIN_CN"));
    }

    #[test]
    fn test_merge_prompt_spells_out_markers() {
        let template = merge_prompt().unwrap();
        for marker in ["【热点聚焦】", "【环境（E）动态】", "【社会（S）动态】", "【公司治理（G）动态】"] {
            assert!(template.raw_template().contains(marker), "missing {marker}");
        }
    }
}

//! Placeholder substitution for report prompts

use super::register_prompts;
use esg_core::{Domain, ReportContext};
use esg_prompt::{FileLoader, PromptRegistry, Result};
use serde_json::{Map, Value, json};
use std::path::Path;
use tracing::info;

/// Placeholder values for a run context and an optional domain
///
/// Domain placeholders are only present when a domain is given, so a
/// template that reads them without one fails with a placeholder error.
pub fn placeholders(context: &ReportContext, domain: Option<Domain>) -> Value {
    let mode = context.mode();
    let mut vars = Map::new();
    vars.insert("DATE_RANGE".into(), json!(context.date_range_cn()));
    vars.insert("START_DATE".into(), json!(context.start_date_cn()));
    vars.insert("END_DATE".into(), json!(context.end_date_cn()));
    vars.insert(
        "START_DATE_ISO".into(),
        json!(context.start_date().format("%Y-%m-%d").to_string()),
    );
    vars.insert(
        "END_DATE_ISO".into(),
        json!(context.end_date().format("%Y-%m-%d").to_string()),
    );
    vars.insert("DATE_RANGE_ISO".into(), json!(context.date_range_iso()));
    vars.insert("DATE_RANGE_COMPACT".into(), json!(context.date_range_compact()));
    vars.insert("REPORT_TYPE_CN".into(), json!(mode.type_cn()));
    vars.insert("PERIOD_PHRASE".into(), json!(mode.period_phrase()));
    vars.insert("THIS_PERIOD".into(), json!(mode.this_period()));
    vars.insert("REPORT_LABEL".into(), json!(context.display_label()));

    if let Some(domain) = domain {
        vars.insert("DOMAIN".into(), json!(domain.code()));
        vars.insert("DOMAIN_CN".into(), json!(domain.display_name()));
        vars.insert("DOMAIN_EXAMPLE".into(), json!(domain.example()));
    }

    Value::Object(vars)
}

/// Resolves named templates into final prompt strings
#[derive(Debug)]
pub struct PromptResolver {
    registry: PromptRegistry,
}

impl PromptResolver {
    /// Resolver over the builtin templates
    pub fn builtin() -> Result<Self> {
        let registry = PromptRegistry::new();
        register_prompts(&registry)?;
        Ok(Self { registry })
    }

    /// Builtin templates, with same-named files from `dir` taking precedence
    pub fn with_overrides(dir: &Path) -> Result<Self> {
        let resolver = Self::builtin()?;
        let count = FileLoader::new(dir).register_into(&resolver.registry)?;
        info!(
            "Loaded {} prompt file(s) from {}; overridden: {:?}",
            count,
            dir.display(),
            resolver.registry.overridden()
        );
        Ok(resolver)
    }

    /// Resolver over an arbitrary registry
    pub fn from_registry(registry: PromptRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PromptRegistry {
        &self.registry
    }

    /// Render `name` for the given context and domain
    pub fn resolve(
        &self,
        name: &str,
        context: &ReportContext,
        domain: Option<Domain>,
    ) -> Result<String> {
        self.registry.render(name, &placeholders(context, domain))
    }
}

//! MiniJinja-based template implementation
//!
//! This module provides a [`JinjaTemplate`] implementation that uses the MiniJinja
//! template engine for placeholder substitution.

use crate::{PromptError, PromptTemplate, Result};
use minijinja::{Environment, UndefinedBehavior};
use std::collections::BTreeSet;

/// A prompt template backed by MiniJinja
///
/// The placeholder set is computed once when the template is parsed, from the
/// variables the source reads without declaring them. Rendering checks every
/// placeholder against the supplied variables before the engine runs, so a
/// missing value is reported by name instead of rendering as an empty string.
///
/// # Template Syntax
///
/// - Placeholders: `{{ DATE_RANGE }}`
/// - Filters: `{{ name | upper }}`
/// - Conditionals: `{% if condition %}...{% endif %}`
///
/// # Examples
///
/// ```
/// use esg_prompt::{JinjaTemplate, PromptTemplate};
/// use serde_json::json;
///
/// let template = JinjaTemplate::new("greeting", "研究{{ DOMAIN_CN }}领域")?;
/// assert!(template.references("DOMAIN_CN"));
///
/// let result = template.render(&json!({ "DOMAIN_CN": "环境" }))?;
/// assert_eq!(result, "研究环境领域");
///
/// assert!(template.render(&json!({})).is_err());
/// # Ok::<(), esg_prompt::PromptError>(())
/// ```
pub struct JinjaTemplate {
    name: String,
    source: String,
    placeholders: BTreeSet<String>,
}

impl JinjaTemplate {
    /// Parse `source` and record the placeholders it reads
    ///
    /// Fails with [`PromptError::TemplateParseFailed`] on a syntax error.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let source = source.into();

        let placeholders = {
            let env = Environment::new();
            let parsed = env
                .template_from_str(&source)
                .map_err(|e| PromptError::TemplateParseFailed {
                    name: name.clone(),
                    detail: e.to_string(),
                })?;
            parsed.undeclared_variables(false).into_iter().collect()
        };

        Ok(Self {
            name,
            source,
            placeholders,
        })
    }

    fn check_placeholders(&self, vars: &serde_json::Value) -> Result<()> {
        let map = vars
            .as_object()
            .ok_or_else(|| PromptError::InvalidVariables(json_kind(vars).to_string()))?;

        for placeholder in &self.placeholders {
            match map.get(placeholder) {
                None | Some(serde_json::Value::Null) => {
                    return Err(PromptError::PlaceholderResolution {
                        template: self.name.clone(),
                        placeholder: placeholder.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl PromptTemplate for JinjaTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn placeholders(&self) -> &BTreeSet<String> {
        &self.placeholders
    }

    fn render(&self, vars: &serde_json::Value) -> Result<String> {
        self.check_placeholders(vars)?;

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        let value = minijinja::value::Value::from_serialize(vars);

        env.render_str(&self.source, value)
            .map_err(|e| PromptError::RenderError {
                name: self.name.clone(),
                detail: e.to_string(),
            })
    }

    fn raw_template(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Debug for JinjaTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JinjaTemplate")
            .field("name", &self.name)
            .field("placeholders", &self.placeholders)
            .finish()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render() {
        let template = JinjaTemplate::new("polish", "请润色{{ DOMAIN_CN }}章节").unwrap();

        let result = template.render(&json!({ "DOMAIN_CN": "社会" })).unwrap();
        assert_eq!(result, "请润色社会章节");
    }

    #[test]
    fn test_placeholder_detection() {
        let template = JinjaTemplate::new(
            "research",
            "{{ DATE_RANGE }} {{ DOMAIN }} {% for x in items %}{{ x }}{% endfor %}",
        )
        .unwrap();

        let names: Vec<_> = template.placeholders().iter().cloned().collect();
        assert_eq!(names, vec!["DATE_RANGE", "DOMAIN", "items"]);
    }

    #[test]
    fn test_missing_placeholder_is_named() {
        let template = JinjaTemplate::new("research", "{{ DATE_RANGE }} / {{ DOMAIN }}").unwrap();

        let err = template
            .render(&json!({ "DATE_RANGE": "2025-01-06 至 2025-01-12" }))
            .unwrap_err();

        match err {
            PromptError::PlaceholderResolution {
                template,
                placeholder,
            } => {
                assert_eq!(template, "research");
                assert_eq!(placeholder, "DOMAIN");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_counts_as_missing() {
        let template = JinjaTemplate::new("t", "{{ DOMAIN }}").unwrap();
        let err = template.render(&json!({ "DOMAIN": null }));
        assert!(matches!(err, Err(PromptError::PlaceholderResolution { .. })));
    }

    #[test]
    fn test_unused_variables_are_ignored() {
        let template = JinjaTemplate::new("t", "固定文本").unwrap();
        assert!(template.placeholders().is_empty());

        let result = template.render(&json!({ "DOMAIN": "E" })).unwrap();
        assert_eq!(result, "固定文本");
    }

    #[test]
    fn test_variables_must_be_object() {
        let template = JinjaTemplate::new("t", "x").unwrap();
        let err = template.render(&json!(["a"]));
        assert!(matches!(err, Err(PromptError::InvalidVariables(_))));
    }

    #[test]
    fn test_filters() {
        let template = JinjaTemplate::new("merge", "{{ label | upper }}").unwrap();

        let result = template.render(&json!({ "label": "esg" })).unwrap();
        assert_eq!(result, "ESG");
    }

    #[test]
    fn test_invalid_template_error() {
        let result = JinjaTemplate::new("hotspot", "{{ unclosed");
        assert!(matches!(
            result,
            Err(PromptError::TemplateParseFailed { .. })
        ));
    }

    #[test]
    fn test_conditional() {
        let template = JinjaTemplate::new(
            "conditional",
            r"{% if daily %}当日{% else %}本周{% endif %}",
        )
        .unwrap();

        assert_eq!(template.render(&json!({ "daily": true })).unwrap(), "当日");
        assert_eq!(template.render(&json!({ "daily": false })).unwrap(), "本周");
    }

    #[test]
    fn test_debug() {
        let template = JinjaTemplate::new("test", "{{ a }}").unwrap();
        let debug = format!("{template:?}");
        assert!(debug.contains("JinjaTemplate"));
        assert!(debug.contains("\"a\""));
    }
}

//! Named template store
//!
//! Builtin templates are registered first; on-disk templates registered later
//! under the same name replace them. Each entry remembers where it came from
//! so callers can report which prompts were overridden.

use crate::{PromptError, PromptTemplate, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Where a registered template came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateOrigin {
    /// Compiled into the binary
    Builtin,
    /// Loaded from a template file
    File(PathBuf),
}

#[derive(Clone)]
struct Entry {
    template: Arc<dyn PromptTemplate>,
    origin: TemplateOrigin,
}

/// Thread-safe map from template name to template
///
/// ```
/// use esg_prompt::{JinjaTemplate, PromptRegistry};
/// use serde_json::json;
///
/// let registry = PromptRegistry::new();
/// registry.register(JinjaTemplate::new("title", "{{ REPORT_LABEL }}")?);
///
/// let title = registry.render("title", &json!({ "REPORT_LABEL": "ESG投研周报" }))?;
/// assert_eq!(title, "ESG投研周报");
/// # Ok::<(), esg_prompt::PromptError>(())
/// ```
#[derive(Default)]
pub struct PromptRegistry {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builtin template
    pub fn register<T: PromptTemplate + 'static>(&self, template: T) {
        self.insert(Arc::new(template), TemplateOrigin::Builtin);
    }

    /// Register a template with an explicit origin
    ///
    /// Returns the origin of the entry it replaced, if any.
    pub fn register_from<T: PromptTemplate + 'static>(
        &self,
        template: T,
        origin: TemplateOrigin,
    ) -> Option<TemplateOrigin> {
        self.insert(Arc::new(template), origin)
    }

    fn insert(
        &self,
        template: Arc<dyn PromptTemplate>,
        origin: TemplateOrigin,
    ) -> Option<TemplateOrigin> {
        let mut entries = self.entries.write().ok()?;
        entries
            .insert(template.name().to_string(), Entry { template, origin })
            .map(|previous| previous.origin)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PromptTemplate>> {
        let entries = self.entries.read().ok()?;
        entries.get(name).map(|e| Arc::clone(&e.template))
    }

    /// Like [`get`](Self::get), failing with [`PromptError::TemplateNotFound`]
    pub fn require(&self, name: &str) -> Result<Arc<dyn PromptTemplate>> {
        self.get(name)
            .ok_or_else(|| PromptError::TemplateNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn origin(&self, name: &str) -> Option<TemplateOrigin> {
        let entries = self.entries.read().ok()?;
        entries.get(name).map(|e| e.origin.clone())
    }

    /// Names of templates that were loaded from files, sorted
    pub fn overridden(&self) -> Vec<String> {
        self.entries
            .read()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, e)| matches!(e.origin, TemplateOrigin::File(_)))
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Render the named template
    ///
    /// Fails when the template is missing or references a placeholder absent
    /// from `vars`.
    pub fn render(&self, name: &str, vars: &serde_json::Value) -> Result<String> {
        self.require(name)?.render(vars)
    }

    /// Registered names, sorted
    pub fn list(&self) -> Vec<String> {
        self.entries
            .read()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for PromptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRegistry")
            .field("templates", &self.list())
            .field("overridden", &self.overridden())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JinjaTemplate;
    use serde_json::json;

    fn template(name: &str, source: &str) -> JinjaTemplate {
        JinjaTemplate::new(name, source).unwrap()
    }

    #[test]
    fn test_render_registered_template() {
        let registry = PromptRegistry::new();
        registry.register(template("hotspot", "{{ THIS_PERIOD }}热点"));

        assert!(registry.contains("hotspot"));
        assert_eq!(
            registry.render("hotspot", &json!({ "THIS_PERIOD": "本周" })).unwrap(),
            "本周热点"
        );
        assert_eq!(registry.origin("hotspot"), Some(TemplateOrigin::Builtin));
    }

    #[test]
    fn test_missing_template() {
        let registry = PromptRegistry::new();
        assert!(registry.get("merge").is_none());
        assert!(matches!(
            registry.render("merge", &json!({})),
            Err(PromptError::TemplateNotFound(name)) if name == "merge"
        ));
    }

    #[test]
    fn test_file_template_replaces_builtin() {
        let registry = PromptRegistry::new();
        registry.register(template("polish", "builtin"));

        let replaced = registry.register_from(
            template("polish", "from disk"),
            TemplateOrigin::File(PathBuf::from("prompts/polish.jinja")),
        );

        assert_eq!(replaced, Some(TemplateOrigin::Builtin));
        assert_eq!(registry.render("polish", &json!({})).unwrap(), "from disk");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.overridden(), vec!["polish"]);
    }

    #[test]
    fn test_list_is_sorted() {
        let registry = PromptRegistry::new();
        registry.register(template("research", "R"));
        registry.register(template("merge", "M"));
        registry.register(template("hotspot", "H"));

        assert_eq!(registry.list(), vec!["hotspot", "merge", "research"]);
        assert!(registry.overridden().is_empty());
    }

    #[test]
    fn test_debug_names_templates() {
        let registry = PromptRegistry::new();
        registry.register(template("merge", "M"));

        let debug = format!("{registry:?}");
        assert!(debug.contains("PromptRegistry"));
        assert!(debug.contains("merge"));
    }
}

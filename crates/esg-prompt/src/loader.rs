//! File-based template loader
//!
//! This module provides [`FileLoader`] for loading templates from the filesystem.
//! It is gated behind the `file-loader` feature.

use crate::{JinjaTemplate, PromptError, PromptRegistry, PromptTemplate, Result, TemplateOrigin};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSIONS: [&str; 2] = ["jinja", "j2"];

/// A file-based template loader
///
/// Each template lives in its own file named `{name}.jinja` or `{name}.j2`.
/// When both exist, `.jinja` wins.
///
/// ```text
/// prompts/
/// ├── research.jinja
/// ├── polish.jinja
/// ├── hotspot.jinja
/// └── merge.j2
/// ```
#[derive(Debug, Clone)]
pub struct FileLoader {
    base_path: PathBuf,
}

impl FileLoader {
    /// Create a new file loader with the given base path
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the base path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Check if the base directory exists
    pub fn exists(&self) -> bool {
        self.base_path.is_dir()
    }

    /// Load a single template by name
    ///
    /// Fails with [`PromptError::TemplateNotFound`] when no file matches.
    pub fn load_template(&self, name: &str) -> Result<JinjaTemplate> {
        for ext in EXTENSIONS {
            let path = self.base_path.join(format!("{name}.{ext}"));
            if path.is_file() {
                return Self::load_file(name, &path);
            }
        }
        Err(PromptError::TemplateNotFound(name.to_string()))
    }

    /// Load every template file in the base directory
    pub fn load_all(&self) -> Result<Vec<JinjaTemplate>> {
        self.template_paths()?
            .into_iter()
            .map(|(name, path)| Self::load_file(&name, &path))
            .collect()
    }

    /// Load every template file and register it, replacing same-named entries
    ///
    /// Every file is parsed before anything is registered, so a broken file
    /// leaves the registry untouched. Returns the number of templates loaded.
    pub fn register_into(&self, registry: &PromptRegistry) -> Result<usize> {
        let loaded = self
            .template_paths()?
            .into_iter()
            .map(|(name, path)| Self::load_file(&name, &path).map(|t| (t, path)))
            .collect::<Result<Vec<_>>>()?;

        let count = loaded.len();
        for (template, path) in loaded {
            let name = template.name().to_string();
            match registry.register_from(template, TemplateOrigin::File(path.clone())) {
                Some(_) => debug!("Template '{}' overridden by {}", name, path.display()),
                None => debug!("Template '{}' added from {}", name, path.display()),
            }
        }
        Ok(count)
    }

    /// List all template names (without loading content), sorted
    pub fn list_templates(&self) -> Result<Vec<String>> {
        Ok(self.template_paths()?.into_keys().collect())
    }

    fn load_file(name: &str, path: &Path) -> Result<JinjaTemplate> {
        let content = std::fs::read_to_string(path).map_err(|e| PromptError::FileLoadError {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        JinjaTemplate::new(name, content)
    }

    fn template_paths(&self) -> Result<BTreeMap<String, PathBuf>> {
        let entries =
            std::fs::read_dir(&self.base_path).map_err(|e| PromptError::FileLoadError {
                path: self.base_path.display().to_string(),
                detail: e.to_string(),
            })?;

        let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();
        for entry in entries {
            let path = entry.map_err(PromptError::IoError)?.path();
            if !path.is_file() {
                continue;
            }

            let Some((stem, ext)) = split_template_name(&path) else {
                continue;
            };

            // `.jinja` takes precedence over `.j2`
            if ext == EXTENSIONS[0] || !found.contains_key(&stem) {
                found.insert(stem, path);
            }
        }
        Ok(found)
    }
}

fn split_template_name(path: &Path) -> Option<(String, String)> {
    let ext = path.extension()?.to_str()?;
    if !EXTENSIONS.contains(&ext) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    Some((stem.to_string(), ext.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn create_test_file(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_template() {
        let dir = tempdir().unwrap();
        create_test_file(dir.path(), "research.jinja", "研究{{ DOMAIN_CN }}");

        let loader = FileLoader::new(dir.path());
        let template = loader.load_template("research").unwrap();

        assert_eq!(template.name(), "research");
        assert!(template.references("DOMAIN_CN"));
    }

    #[test]
    fn test_load_j2_extension() {
        let dir = tempdir().unwrap();
        create_test_file(dir.path(), "merge.j2", "合并");

        let loader = FileLoader::new(dir.path());
        let template = loader.load_template("merge").unwrap();
        assert_eq!(template.render(&json!({})).unwrap(), "合并");
    }

    #[test]
    fn test_load_missing_template() {
        let dir = tempdir().unwrap();
        let loader = FileLoader::new(dir.path());

        let result = loader.load_template("nonexistent");
        assert!(matches!(result, Err(PromptError::TemplateNotFound(_))));
    }

    #[test]
    fn test_load_all_prefers_jinja() {
        let dir = tempdir().unwrap();
        create_test_file(dir.path(), "polish.jinja", "jinja");
        create_test_file(dir.path(), "polish.j2", "j2");
        create_test_file(dir.path(), "hotspot.j2", "hot");
        create_test_file(dir.path(), "notes.txt", "ignored");

        let loader = FileLoader::new(dir.path());
        let templates = loader.load_all().unwrap();
        assert_eq!(templates.len(), 2);

        let polish = templates.iter().find(|t| t.name() == "polish").unwrap();
        assert_eq!(polish.raw_template(), "jinja");
    }

    #[test]
    fn test_list_templates() {
        let dir = tempdir().unwrap();
        create_test_file(dir.path(), "research.jinja", "r");
        create_test_file(dir.path(), "merge.j2", "m");
        fs::create_dir(dir.path().join("nested.jinja")).unwrap();

        let loader = FileLoader::new(dir.path());
        assert_eq!(loader.list_templates().unwrap(), vec!["merge", "research"]);
    }

    #[test]
    fn test_register_into_overrides() {
        let dir = tempdir().unwrap();
        create_test_file(dir.path(), "polish.jinja", "override");

        let registry = PromptRegistry::new();
        registry.register(JinjaTemplate::new("polish", "builtin").unwrap());

        let loader = FileLoader::new(dir.path());
        assert_eq!(loader.register_into(&registry).unwrap(), 1);
        assert_eq!(registry.render("polish", &json!({})).unwrap(), "override");
        assert_eq!(
            registry.origin("polish"),
            Some(TemplateOrigin::File(dir.path().join("polish.jinja")))
        );
    }

    #[test]
    fn test_register_into_is_all_or_nothing() {
        let dir = tempdir().unwrap();
        create_test_file(dir.path(), "hotspot.jinja", "fine");
        create_test_file(dir.path(), "merge.jinja", "{% if %}");

        let registry = PromptRegistry::new();
        registry.register(JinjaTemplate::new("hotspot", "builtin").unwrap());

        assert!(FileLoader::new(dir.path()).register_into(&registry).is_err());
        assert_eq!(registry.origin("hotspot"), Some(TemplateOrigin::Builtin));
    }

    #[test]
    fn test_invalid_template_file() {
        let dir = tempdir().unwrap();
        create_test_file(dir.path(), "broken.jinja", "{{ unclosed");

        let loader = FileLoader::new(dir.path());
        assert!(loader.load_all().is_err());
    }

    #[test]
    fn test_missing_directory() {
        let loader = FileLoader::new("/nonexistent/prompt/dir");
        assert!(!loader.exists());
        assert!(matches!(
            loader.list_templates(),
            Err(PromptError::FileLoadError { .. })
        ));
    }
}

//! Core prompt template trait
//!
//! This module defines the [`PromptTemplate`] trait that all template implementations must follow.

use crate::Result;
use std::collections::BTreeSet;

/// Core trait for prompt templates
///
/// Variables are passed as a `serde_json::Value` object to keep the trait
/// dyn-compatible. Rendering must fail with
/// [`PromptError::PlaceholderResolution`](crate::PromptError::PlaceholderResolution)
/// when the template references a placeholder missing from `vars`.
pub trait PromptTemplate: Send + Sync {
    /// Get the template name/identifier
    fn name(&self) -> &str;

    /// Placeholders referenced by the template source
    fn placeholders(&self) -> &BTreeSet<String>;

    /// Whether the template references `placeholder`
    fn references(&self, placeholder: &str) -> bool {
        self.placeholders().contains(placeholder)
    }

    /// Render the template with variables
    fn render(&self, vars: &serde_json::Value) -> Result<String>;

    /// Raw template source (for debugging/inspection)
    fn raw_template(&self) -> &str;
}

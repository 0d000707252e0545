//! Error types for prompt operations

use thiserror::Error;

/// Result type for prompt operations
pub type Result<T> = std::result::Result<T, PromptError>;

/// Errors that can occur during prompt operations
#[derive(Error, Debug)]
pub enum PromptError {
    /// No template registered or on disk under this name
    #[error("Template '{0}' not found")]
    TemplateNotFound(String),

    /// Template source failed to parse
    #[error("Failed to parse template '{name}': {detail}")]
    TemplateParseFailed { name: String, detail: String },

    /// The template references a placeholder with no value
    #[error("Template '{template}' references placeholder '{placeholder}' but no value was supplied")]
    PlaceholderResolution {
        template: String,
        placeholder: String,
    },

    /// Template rendering failed
    #[error("Failed to render template '{name}': {detail}")]
    RenderError { name: String, detail: String },

    /// Variables were not a JSON object
    #[error("Template variables must be a JSON object, got {0}")]
    InvalidVariables(String),

    /// File loading error
    #[error("Failed to load template file '{path}': {detail}")]
    FileLoadError { path: String, detail: String },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

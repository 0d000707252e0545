//! Prompt template management for the ESG report pipeline
//!
//! This crate provides a small, type-safe system for managing prompt templates
//! whose placeholders are checked before rendering.
//!
//! # Features
//!
//! - **Strict placeholders**: a template that references a placeholder with no
//!   value fails with [`PromptError::PlaceholderResolution`] naming it
//! - **Template registry**: centralized, thread-safe management of templates
//! - **File loading**: optional support for loading templates from a directory
//! - **Builder pattern**: fluent API for assembling prompt text
//!
//! # Quick Start
//!
//! ```
//! use esg_prompt::{JinjaTemplate, PromptRegistry};
//! use serde_json::json;
//!
//! let registry = PromptRegistry::new();
//! registry.register(JinjaTemplate::new(
//!     "research",
//!     "研究{{ DATE_RANGE }}期间的{{ DOMAIN_CN }}（{{ DOMAIN }}）动态",
//! )?);
//!
//! let prompt = registry.render(
//!     "research",
//!     &json!({ "DATE_RANGE": "2025年01月06日 至 2025年01月12日", "DOMAIN": "E", "DOMAIN_CN": "环境" }),
//! )?;
//! assert_eq!(prompt, "研究2025年01月06日 至 2025年01月12日期间的环境（E）动态");
//! # Ok::<(), esg_prompt::PromptError>(())
//! ```
//!
//! # Feature Flags
//!
//! - `file-loader`: Enable loading templates from files

mod builder;
mod error;
mod jinja;
mod registry;
mod template;

#[cfg(feature = "file-loader")]
mod loader;

pub use builder::PromptBuilder;
pub use error::{PromptError, Result};
pub use jinja::JinjaTemplate;
pub use registry::{PromptRegistry, TemplateOrigin};
pub use template::PromptTemplate;

#[cfg(feature = "file-loader")]
pub use loader::FileLoader;

//! Report prompt templates
//!
//! Four templates drive the pipeline: `research`, `polish`, `hotspot` and
//! `merge`. Builtin versions are registered first; a template directory can
//! replace any of them by file name.

mod resolver;
mod templates;

pub use resolver::{PromptResolver, placeholders};
pub use templates::*;

use esg_prompt::{PromptRegistry, Result};

/// Per-domain deep-research prompt
pub const RESEARCH: &str = "research";
/// Per-domain polish prompt
pub const POLISH: &str = "polish";
/// Cross-domain hotspot prompt
pub const HOTSPOT: &str = "hotspot";
/// Final merge prompt
pub const MERGE: &str = "merge";

/// Register the builtin report prompts with the given registry
pub fn register_prompts(registry: &PromptRegistry) -> Result<()> {
    registry.register(research_prompt()?);
    registry.register(polish_prompt()?);
    registry.register(hotspot_prompt()?);
    registry.register(merge_prompt()?);
    Ok(())
}

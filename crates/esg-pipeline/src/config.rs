//! Configuration for pipeline runs

use crate::error::{PipelineError, Result};
use esg_core::Domain;
use esg_llm::Identity;
use std::path::{Path, PathBuf};

/// Per-run pipeline configuration
///
/// Research credentials are carried as one [`Identity`] per domain. They are
/// checked when the research stage dispatches, so a missing key surfaces as
/// a dispatch fault of the run rather than a build error here.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    identities: [Identity; 3],
    prompts_dir: Option<PathBuf>,
}

impl PipelineConfig {
    /// Create a new configuration builder
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Research identity for a domain
    pub fn identity(&self, domain: Domain) -> &Identity {
        &self.identities[domain.index()]
    }

    /// Directory whose templates override the builtin prompts
    pub fn prompts_dir(&self) -> Option<&Path> {
        self.prompts_dir.as_deref()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.prompts_dir {
            if !dir.is_dir() {
                return Err(PipelineError::ConfigError(format!(
                    "prompt directory {} does not exist",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`]
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    api_key: Option<String>,
    domain_keys: [Option<String>; 3],
    prompts_dir: Option<PathBuf>,
}

impl PipelineConfigBuilder {
    /// Key used for every domain without its own key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Research key for one domain
    pub fn domain_key(mut self, domain: Domain, key: impl Into<String>) -> Self {
        self.domain_keys[domain.index()] = Some(key.into());
        self
    }

    /// Load prompt overrides from a directory
    pub fn prompts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompts_dir = Some(dir.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<PipelineConfig> {
        let Self {
            api_key,
            domain_keys,
            prompts_dir,
        } = self;

        let identities = Domain::ALL.map(|domain| {
            let key = domain_keys[domain.index()]
                .clone()
                .or_else(|| api_key.clone())
                .unwrap_or_default();
            Identity::new(domain.label(), key)
        });

        let config = PipelineConfig {
            identities,
            prompts_dir,
        };
        config.validate()?;
        Ok(config)
    }
}

//! Application configuration
//!
//! Settings come from an optional `config.json` and are then overridden by
//! environment variables:
//!
//! | variable | effect |
//! |---|---|
//! | `ESG_PROVIDER` | `gemini` or `qwen` |
//! | `ESG_API_KEY` | one key for every call |
//! | `ESG_API_KEY_E` / `_S` / `_G` | per-domain research keys (Gemini) |
//! | `GEMINI_API_KEY` / `DASHSCOPE_API_KEY` | provider fallbacks |
//! | `ESG_API_BASE` | endpoint override |
//!
//! ```json
//! {
//!   "provider": "gemini",
//!   "gemini": { "api_keys": { "E": "...", "S": "...", "G": "..." } },
//!   "qwen": { "api_key": "sk-..." }
//! }
//! ```

use esg_core::Domain;
use esg_llm::{CapabilitySettings, ProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown provider '{0}' (expected gemini or qwen)")]
    InvalidProvider(String),

    /// No usable key; the message says where to configure one
    #[error("missing API key: {0}")]
    MissingKey(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Gemini-specific settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSection {
    pub api_key: Option<String>,
    /// Per-domain research keys keyed by `E`, `S`, `G`
    pub api_keys: Option<BTreeMap<String, String>>,
    pub agent: Option<String>,
    pub model: Option<String>,
}

/// Qwen-specific settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QwenSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub deep_research_model: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderKind,
    pub gemini: GeminiSection,
    pub qwen: QwenSection,
    /// Endpoint override for the selected provider
    pub api_base: Option<String>,
    pub research_timeout_secs: u64,
    pub converse_timeout_secs: u64,
    pub output_dir: PathBuf,

    /// Keys taken from the environment; never written back to disk
    #[serde(skip)]
    env_keys: EnvKeys,
}

#[derive(Clone, Default)]
struct EnvKeys {
    single: Option<String>,
    per_domain: [Option<String>; 3],
    gemini: Option<String>,
    dashscope: Option<String>,
}

impl std::fmt::Debug for EnvKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EnvKeys(<redacted>)")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            gemini: GeminiSection::default(),
            qwen: QwenSection::default(),
            api_base: None,
            research_timeout_secs: 30 * 60,
            converse_timeout_secs: 5 * 60,
            output_dir: PathBuf::from("output"),
            env_keys: EnvKeys::default(),
        }
    }
}

/// Research keys for the three domains
#[derive(Clone, PartialEq, Eq)]
pub struct DomainKeys([String; 3]);

impl DomainKeys {
    pub fn uniform(key: &str) -> Self {
        Self([key.to_string(), key.to_string(), key.to_string()])
    }

    pub fn get(&self, domain: Domain) -> &str {
        &self.0[domain.index()]
    }
}

impl std::fmt::Debug for DomainKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DomainKeys(<redacted>)")
    }
}

fn usable(key: Option<&str>) -> Option<&str> {
    key.map(str::trim)
        .filter(|k| !k.is_empty() && !k.starts_with("YOUR_"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Load `path` if it exists, otherwise start from defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Load and parse a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(provider) = non_blank(lookup("ESG_PROVIDER")) {
            self.provider = parse_provider(&provider)?;
        }
        if let Some(base) = non_blank(lookup("ESG_API_BASE")) {
            self.api_base = Some(base);
        }

        self.env_keys = EnvKeys {
            single: non_blank(lookup("ESG_API_KEY")),
            per_domain: Domain::ALL
                .map(|d| non_blank(lookup(&format!("ESG_API_KEY_{}", d.code())))),
            gemini: non_blank(lookup("GEMINI_API_KEY")),
            dashscope: non_blank(lookup("DASHSCOPE_API_KEY")),
        };
        Ok(self)
    }

    /// Override the provider (e.g. from the command line)
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.research_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "research_timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.converse_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "converse_timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        self.domain_keys()?;
        Ok(())
    }

    /// Key used for chat calls (polish, hotspot, merge)
    pub fn chat_key(&self) -> Result<String> {
        match self.provider {
            ProviderKind::Qwen => self.qwen_key(),
            ProviderKind::Gemini => Ok(self.domain_keys()?.get(Domain::Environmental).to_string()),
        }
    }

    /// Research key for every domain
    ///
    /// Qwen uses one key throughout. For Gemini, environment keys win: each
    /// missing per-domain key falls back to the single key, then borrows from
    /// the other domains. Without environment keys the config's `api_keys` must name all
    /// three domains, otherwise the single `api_key` is used for each.
    pub fn domain_keys(&self) -> Result<DomainKeys> {
        match self.provider {
            ProviderKind::Qwen => Ok(DomainKeys::uniform(&self.qwen_key()?)),
            ProviderKind::Gemini => self.gemini_domain_keys(),
        }
    }

    fn qwen_key(&self) -> Result<String> {
        usable(self.env_keys.single.as_deref())
            .or_else(|| usable(self.qwen.api_key.as_deref()))
            .or_else(|| usable(self.env_keys.dashscope.as_deref()))
            .map(str::to_string)
            .ok_or_else(|| {
                ConfigError::MissingKey(
                    "set ESG_API_KEY or DASHSCOPE_API_KEY, or qwen.api_key in config.json"
                        .to_string(),
                )
            })
    }

    fn gemini_domain_keys(&self) -> Result<DomainKeys> {
        let single = usable(self.env_keys.single.as_deref());
        let env: [Option<&str>; 3] = [0, 1, 2]
            .map(|i: usize| usable(self.env_keys.per_domain[i].as_deref()).or(single));

        if env.iter().any(Option::is_some) {
            let pick = |order: [usize; 3]| order.iter().find_map(|&i| env[i]).unwrap_or_default();
            return Ok(DomainKeys([
                pick([0, 1, 2]).to_string(),
                pick([1, 0, 2]).to_string(),
                pick([2, 0, 1]).to_string(),
            ]));
        }

        if let Some(keys) = &self.gemini.api_keys {
            let mut resolved: [String; 3] = Default::default();
            for domain in Domain::ALL {
                let key = usable(keys.get(domain.code()).map(String::as_str)).ok_or_else(|| {
                    ConfigError::MissingKey(format!(
                        "gemini.api_keys.{} in config.json is missing or a placeholder",
                        domain.code()
                    ))
                })?;
                resolved[domain.index()] = key.to_string();
            }
            return Ok(DomainKeys(resolved));
        }

        usable(self.gemini.api_key.as_deref())
            .or_else(|| usable(self.env_keys.gemini.as_deref()))
            .map(DomainKeys::uniform)
            .ok_or_else(|| {
                ConfigError::MissingKey(
                    "set ESG_API_KEY or GEMINI_API_KEY, or gemini.api_key(s) in config.json"
                        .to_string(),
                )
            })
    }

    pub fn chat_model(&self) -> String {
        let configured = match self.provider {
            ProviderKind::Gemini => self.gemini.model.clone(),
            ProviderKind::Qwen => self.qwen.model.clone(),
        };
        non_blank(configured).unwrap_or_else(|| self.provider.default_chat_model().to_string())
    }

    /// Research agent (Gemini) or deep-research model (Qwen)
    pub fn research_model(&self) -> String {
        let configured = match self.provider {
            ProviderKind::Gemini => self.gemini.agent.clone(),
            ProviderKind::Qwen => self.qwen.deep_research_model.clone(),
        };
        non_blank(configured)
            .unwrap_or_else(|| self.provider.default_research_model().to_string())
    }

    /// Everything the model capability needs for this run
    pub fn capability_settings(&self) -> Result<CapabilitySettings> {
        let mut settings = CapabilitySettings::new(self.provider, self.chat_key()?)
            .with_chat_model(self.chat_model())
            .with_research_model(self.research_model())
            .with_timeouts(
                Duration::from_secs(self.research_timeout_secs),
                Duration::from_secs(self.converse_timeout_secs),
            );
        if let Some(base) = non_blank(self.api_base.clone()) {
            settings = settings.with_api_base(base);
        }
        Ok(settings)
    }
}

fn parse_provider(value: &str) -> Result<ProviderKind> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidProvider(value.to_string()))
}

//! Shared utilities for the ESG report pipeline
//!
//! This crate provides logging setup and application configuration: the
//! `config.json` file, environment overrides, and API key resolution.

pub mod config;
pub mod logging;

pub use config::{AppConfig, ConfigError, DomainKeys, GeminiSection, QwenSection};
pub use logging::{LogFormat, init_tracing, init_tracing_with};

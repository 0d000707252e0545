//! Model access layer for the ESG report pipeline
//!
//! This crate provides:
//!
//! - Message and completion types for LLM communication
//! - The [`LLMProvider`] and [`BackgroundAgent`] traits
//! - DashScope (Qwen) and Gemini Interactions providers
//! - The [`ModelCapability`] interface the pipeline consumes, with one
//!   implementation per provider
//! - A retry policy for timeouts and dropped connections

pub mod capability;
pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod retry;

// Re-export main types
pub use capability::{
    CapabilitySettings, GeminiCapability, Identity, ModelCapability, ProviderKind,
    QwenCapability,
};
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::{BackgroundAgent, LLMProvider, TaskState};
pub use retry::RetryPolicy;

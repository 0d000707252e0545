//! LLM provider trait definitions

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// Trait for LLM providers
///
/// Implementations of this trait provide access to different LLM services
/// (e.g., DashScope or the Gemini Interactions API).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    ///
    /// # Arguments
    ///
    /// * `request` - The completion request with messages and parameters
    ///
    /// # Returns
    ///
    /// The completion response with the assistant's message and metadata
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g., "dashscope", "gemini")
    fn name(&self) -> &'static str;
}

/// State of a long-running agent task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Still running; carries the status string reported by the service
    Running(String),
    /// Finished with the task's text output
    Completed(String),
    /// Failed or cancelled, with whatever detail the service gave
    Failed(String),
}

/// A service that runs agents in the background and is polled for results
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackgroundAgent: Send + Sync {
    /// Start `agent` on `input`; returns the task id
    async fn start(&self, agent: &str, input: &str, api_key: Option<String>) -> Result<String>;

    /// Fetch the current state of a task
    async fn poll(&self, task_id: &str, api_key: Option<String>) -> Result<TaskState>;
}

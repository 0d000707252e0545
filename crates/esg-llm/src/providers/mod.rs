//! Concrete LLM provider implementations
//!
//! - [`DashScopeProvider`]: Qwen chat and streamed deep research
//! - [`GeminiProvider`]: Gemini models and background research agents

pub mod dashscope;
pub mod gemini;
mod sse;

pub use dashscope::{DEFAULT_DASHSCOPE_API_BASE, DashScopeConfig, DashScopeProvider};
pub use gemini::{DEFAULT_GEMINI_API_BASE, GeminiConfig, GeminiProvider};
pub use sse::{SseEvent, SseParser};

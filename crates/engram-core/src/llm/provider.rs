//! LlmProvider trait definition.
//!
//! This is the core abstraction that LLM providers implement. Uses native
//! async fn in traits (RPITIT, Rust 2024 edition). The engine only needs
//! blocking completions; there is no streaming surface.
//!
//! Implementations live in engram-infra (e.g., `AnthropicProvider`).

use engram_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for LLM provider backends.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}

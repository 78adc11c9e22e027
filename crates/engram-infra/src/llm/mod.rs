//! LLM provider implementations.
//!
//! Contains concrete implementations of the [`LlmProvider`] trait defined
//! in `engram-core`, starting with Anthropic Claude.
//!
//! [`LlmProvider`]: engram_core::llm::provider::LlmProvider

pub mod anthropic;

//! Embedding provider implementations.
//!
//! Contains the OpenAI embeddings client implementing the [`Embedder`]
//! trait from `engram-core`.
//!
//! [`Embedder`]: engram_core::memory::embedder::Embedder

pub mod openai;

pub use openai::OpenAiEmbedder;

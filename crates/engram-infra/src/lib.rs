//! Infrastructure layer for Engram.
//!
//! Contains implementations of the ports defined in `engram-core`:
//! SQLite storage (split reader/writer pool, message and memory
//! repositories), the Anthropic LLM provider, the OpenAI embeddings
//! client, and the configuration loader.

pub mod config;
pub mod embed;
pub mod llm;
pub mod sqlite;

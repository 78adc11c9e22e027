//! Business logic and repository trait definitions for Engram.
//!
//! This crate defines the "ports" (repository, embedder and LLM provider
//! traits) that the infrastructure layer implements, and the extraction
//! pipeline that turns pending conversational messages into durable,
//! deduplicated memories. It depends only on `engram-types` -- never on
//! `engram-infra` or any database/IO crate.

pub mod llm;
pub mod memory;

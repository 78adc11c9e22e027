//! LLM provider abstractions for Engram.
//!
//! This module defines the core traits and utilities for LLM integration:
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `StructuredClient`: schema-constrained calls with bounded retry

pub mod box_provider;
pub mod provider;
pub mod structured;

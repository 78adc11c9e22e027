//! Shared domain types for Engram.
//!
//! This crate contains the types used across the Engram memory engine:
//! messages, facts, memories, merge decisions, LLM request/response shapes,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror,
//! and schemars.

pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod message;

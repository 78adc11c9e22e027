//! SQLite storage implementations.
//!
//! Implements the repository traits from `engram-core` using sqlx with a
//! split reader/writer pool. All timestamps are stored as RFC 3339 TEXT,
//! UUIDs as TEXT, embeddings as little-endian f32 BLOBs.

pub mod memory;
pub mod message;
pub mod pool;
pub mod vector;

use chrono::{DateTime, Utc};
use engram_types::error::RepositoryError;

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

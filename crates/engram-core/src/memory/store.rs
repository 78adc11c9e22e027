//! Repository trait definitions for the extraction pipeline.
//!
//! Implementations live in engram-infra (`SqliteMessageRepository`,
//! `SqliteMemoryRepository`). Uses native async fn in traits (RPITIT,
//! Rust 2024 edition).

use engram_types::error::RepositoryError;
use engram_types::memory::{RankedMemory, WritePlan};
use engram_types::message::Message;
use uuid::Uuid;

/// Read-only source of a user's pending conversational messages.
pub trait MessageRepository: Send + Sync {
    /// Messages with `extracted = false` and `role = user`, ascending by
    /// creation time. Side-effect free and safely re-callable.
    fn pending_messages(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;
}

/// Vector-searchable memory store with an atomic plan applier.
pub trait MemoryRepository: Send + Sync {
    /// Memories of `user_id` ranked by cosine similarity to the query
    /// vector, keeping only `similarity > min_similarity` (strict), ordered
    /// descending, capped at `top_k`. Never crosses user boundaries.
    fn search_similar(
        &self,
        user_id: &Uuid,
        query: &[f32],
        top_k: usize,
        min_similarity: f32,
    ) -> impl std::future::Future<Output = Result<Vec<RankedMemory>, RepositoryError>> + Send;

    /// Commit a run's plan in one transaction: insert ADDs, overwrite
    /// UPDATE targets, then mark every originating message extracted.
    /// Any failure rolls the whole transaction back.
    fn commit_plan(
        &self,
        plan: &WritePlan,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

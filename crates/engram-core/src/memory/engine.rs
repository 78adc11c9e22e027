//! The extraction pipeline orchestrator.
//!
//! `MemoryEngine::extract_memory` is the sole operation this crate exposes
//! upward: fetch pending messages, extract facts, search for similar
//! memories per fact, adjudicate merges, plan writes, and commit the plan
//! in one transaction.
//!
//! Every read and every external model/embedding call completes before the
//! write transaction opens, so no locks are held across slow network calls.
//! The engine performs no inter-run mutual exclusion: two concurrent
//! invocations for the same user can read overlapping snapshots and race
//! at commit. Callers must serialize runs per user externally.

use std::collections::HashMap;

use uuid::Uuid;

use engram_types::config::EngineConfig;
use engram_types::error::{EmbeddingError, ExtractionError};
use engram_types::memory::{ExtractionReport, WritePlan};

use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::structured::StructuredClient;

use super::embedder::Embedder;
use super::extractor::FactExtractor;
use super::merger::MergeDecider;
use super::numbering::UnifiedIndex;
use super::planner::DecisionPlanner;
use super::store::{MemoryRepository, MessageRepository};

/// Orchestrates the extraction-search-merge-commit pipeline.
pub struct MemoryEngine<M, R, E>
where
    M: MessageRepository,
    R: MemoryRepository,
    E: Embedder,
{
    messages: M,
    memories: R,
    embedder: E,
    client: StructuredClient,
    config: EngineConfig,
}

impl<M, R, E> MemoryEngine<M, R, E>
where
    M: MessageRepository,
    R: MemoryRepository,
    E: Embedder,
{
    /// Create a new engine over the given repositories, embedder and
    /// LLM provider.
    pub fn new(
        messages: M,
        memories: R,
        embedder: E,
        provider: BoxLlmProvider,
        config: EngineConfig,
    ) -> Self {
        let client = StructuredClient::new(
            provider,
            config.model.clone(),
            config.max_tokens,
            config.retry,
        );
        Self {
            messages,
            memories,
            embedder,
            client,
            config,
        }
    }

    /// Run one extraction pass for the given user.
    ///
    /// Returns complete counts, or an error with zero side effects: the
    /// write transaction either never opened or rolled back, and the input
    /// messages stay pending for a later retry.
    #[tracing::instrument(name = "extract_memory", skip(self), fields(user_id = %user_id))]
    pub async fn extract_memory(
        &self,
        user_id: Uuid,
    ) -> Result<ExtractionReport, ExtractionError> {
        let pending = self.messages.pending_messages(&user_id).await?;
        if pending.is_empty() {
            tracing::debug!("no pending messages");
            return Ok(ExtractionReport::default());
        }
        let message_ids: Vec<Uuid> = pending.iter().map(|m| m.id).collect();

        let facts = FactExtractor::extract(&self.client, &pending).await?;
        if facts.is_empty() {
            // Nothing worth remembering: mark the batch consumed and stop.
            let plan = WritePlan {
                user_id,
                writes: Vec::new(),
                message_ids,
            };
            let messages_extracted = plan.message_ids.len() as u32;
            self.memories.commit_plan(&plan).await?;
            tracing::debug!(messages_extracted, "zero facts, marked batch extracted");
            return Ok(ExtractionReport {
                messages_extracted,
                ..ExtractionReport::default()
            });
        }

        // One batch for all fact texts; the vectors double as search
        // queries and as content vectors for verbatim ADDs.
        let fact_texts: Vec<String> = facts.iter().map(|f| f.text.clone()).collect();
        let fact_vectors = self.embedder.embed(&fact_texts).await?;
        if fact_vectors.len() != fact_texts.len() {
            return Err(EmbeddingError::CountMismatch {
                requested: fact_texts.len(),
                received: fact_vectors.len(),
            }
            .into());
        }
        let mut cache: HashMap<String, Vec<f32>> = fact_texts
            .iter()
            .cloned()
            .zip(fact_vectors.iter().cloned())
            .collect();

        // Per-fact searches are independent and read-only, so they run
        // concurrently against the immutable-during-read store.
        let per_fact_matches = futures_util::future::try_join_all(fact_vectors.iter().map(|v| {
            self.memories
                .search_similar(&user_id, v, self.config.top_k, self.config.min_similarity)
        }))
        .await?;

        let index = UnifiedIndex::build(&per_fact_matches, facts.len());
        let decisions = MergeDecider::decide(&self.client, &index, &facts).await?;

        let plan = DecisionPlanner::plan(
            user_id,
            decisions,
            &facts,
            &index,
            &mut cache,
            &self.embedder,
            message_ids,
        )
        .await?;

        let report = ExtractionReport {
            facts_extracted: facts.len() as u32,
            memories_added: plan.added(),
            memories_updated: plan.updated(),
            messages_extracted: plan.message_ids.len() as u32,
        };
        self.memories.commit_plan(&plan).await?;

        tracing::info!(
            facts = report.facts_extracted,
            added = report.memories_added,
            updated = report.memories_updated,
            messages = report.messages_extracted,
            "extraction run committed"
        );
        Ok(report)
    }
}

//! Decision planning: resolving merge decisions into concrete writes.
//!
//! The planner validates each decision's unified-number reference, resolves
//! ADD text fallback and UPDATE history, and batches the embedding of any
//! decision text not already known. All external calls happen here, before
//! the write transaction opens (plan-then-commit).
//!
//! The embedding cache is keyed by exact string equality: identical strings
//! are embedded once per run, near-duplicate merged texts re-embed. That is
//! an accepted cost/complexity tradeoff.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use engram_types::error::EmbeddingError;
use engram_types::memory::{
    Fact, MergeDecision, MergeEvent, NewMemory, PlannedWrite, WritePlan,
};

use super::embedder::Embedder;
use super::numbering::UnifiedIndex;

/// A validated decision with its references resolved, not yet embedded.
#[derive(Debug)]
enum Draft {
    Insert { text: String, fact: Fact },
    Overwrite {
        memory_id: Uuid,
        text: String,
        prev_content: String,
    },
}

impl Draft {
    fn text(&self) -> &str {
        match self {
            Draft::Insert { text, .. } => text,
            Draft::Overwrite { text, .. } => text,
        }
    }
}

/// Stateless planner turning merge decisions into a [`WritePlan`].
pub struct DecisionPlanner;

impl DecisionPlanner {
    /// Resolve decisions into a write plan, embedding novel texts in one
    /// deduplicated batch.
    ///
    /// `cache` maps text to embedding and arrives seeded with the run's
    /// fact texts, so a pure ADD that keeps its fact's wording verbatim
    /// costs no extra embedding. Invalid decisions -- an ADD not naming a
    /// fact number, an UPDATE not naming an existing-memory number, or an
    /// UPDATE with empty text -- are dropped with a warning.
    #[tracing::instrument(
        name = "plan_decisions",
        skip_all,
        fields(decision_count = decisions.len())
    )]
    pub async fn plan<E: Embedder>(
        user_id: Uuid,
        decisions: Vec<MergeDecision>,
        facts: &[Fact],
        index: &UnifiedIndex,
        cache: &mut HashMap<String, Vec<f32>>,
        embedder: &E,
        message_ids: Vec<Uuid>,
    ) -> Result<WritePlan, EmbeddingError> {
        let drafts = Self::resolve(decisions, facts, index);

        // One batched call for every text the cache has not seen yet,
        // deduplicated by exact string equality.
        let mut queued: HashSet<&str> = HashSet::new();
        let mut queue: Vec<String> = Vec::new();
        for draft in &drafts {
            let text = draft.text();
            if !cache.contains_key(text) && queued.insert(text) {
                queue.push(text.to_string());
            }
        }
        if !queue.is_empty() {
            let vectors = embedder.embed(&queue).await?;
            if vectors.len() != queue.len() {
                return Err(EmbeddingError::CountMismatch {
                    requested: queue.len(),
                    received: vectors.len(),
                });
            }
            for (text, vector) in queue.into_iter().zip(vectors) {
                cache.insert(text, vector);
            }
        }

        let now = Utc::now();
        let writes = drafts
            .into_iter()
            .map(|draft| {
                let embedding = cache
                    .get(draft.text())
                    .cloned()
                    .expect("embedding present for every planned text");
                match draft {
                    Draft::Insert { text, fact } => PlannedWrite::Insert(NewMemory {
                        id: Uuid::now_v7(),
                        user_id,
                        content: text,
                        category: fact.category,
                        importance: fact.importance,
                        confidence: fact.confidence,
                        embedding,
                        created_at: now,
                    }),
                    Draft::Overwrite {
                        memory_id,
                        text,
                        prev_content,
                    } => PlannedWrite::Overwrite {
                        memory_id,
                        content: text,
                        prev_content,
                        embedding,
                    },
                }
            })
            .collect();

        Ok(WritePlan {
            user_id,
            writes,
            message_ids,
        })
    }

    /// Validate references and resolve each decision into a draft.
    fn resolve(decisions: Vec<MergeDecision>, facts: &[Fact], index: &UnifiedIndex) -> Vec<Draft> {
        let mut drafts = Vec::with_capacity(decisions.len());

        for decision in decisions {
            match decision.event {
                MergeEvent::Add => match index.fact_index(decision.id) {
                    Some(fact_idx) => {
                        let fact = &facts[fact_idx];
                        // Empty decision text means "use the fact verbatim".
                        let text = if decision.text.trim().is_empty() {
                            fact.text.clone()
                        } else {
                            decision.text
                        };
                        drafts.push(Draft::Insert {
                            text,
                            fact: fact.clone(),
                        });
                    }
                    None => {
                        tracing::warn!(
                            id = decision.id,
                            "ADD decision references no fact number, dropping"
                        );
                    }
                },
                MergeEvent::Update => match index.existing_by_number(decision.id) {
                    Some(memory) if !decision.text.trim().is_empty() => {
                        drafts.push(Draft::Overwrite {
                            memory_id: memory.id,
                            text: decision.text,
                            prev_content: memory.content.clone(),
                        });
                    }
                    Some(_) => {
                        tracing::warn!(
                            id = decision.id,
                            "UPDATE decision has no replacement text, dropping"
                        );
                    }
                    None => {
                        tracing::warn!(
                            id = decision.id,
                            "UPDATE decision references no existing memory, dropping"
                        );
                    }
                },
            }
        }

        drafts
    }
}

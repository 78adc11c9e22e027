//! Merge adjudication via LLM.
//!
//! `MergeDecider` renders the unified catalog -- matched existing memories
//! numbered `1..=E`, new facts numbered `E+1..=E+F` -- and asks the model
//! to classify each fact as ADD, UPDATE against a numbered memory, or
//! (implicitly, by omission) SKIP.

use engram_types::llm::LlmError;
use engram_types::memory::{Fact, MergeDecision, MergeSheet};

use crate::llm::structured::StructuredClient;

use super::numbering::UnifiedIndex;

/// System prompt for the merge-decision call.
const MERGE_SYSTEM_PROMPT: &str = r#"You maintain a user's long-term memory collection. You receive two numbered lists: existing memories and new candidate facts. Decide, for each new fact, whether it becomes a new memory or revises an existing one.

For each decision emit an item with:
- "id": the number of the item the decision applies to
- "event": ADD or UPDATE
- "text": see below

Semantics:
- ADD: the fact is wholly new information. Use the fact's number as "id". "text" may be empty, which means "store the fact exactly as written".
- UPDATE: the fact revises, corrects, or conflicts with an existing memory. Use the existing memory's number as "id". "text" must be the full replacement statement merging the old memory and the new fact into one sentence.
- SKIP: the fact is already covered by an existing memory. Emit nothing for it.

Never emit more than one decision per fact. Never invent numbers that are not in the lists."#;

/// Stateless merge adjudicator.
pub struct MergeDecider;

impl MergeDecider {
    /// Render the two numbered lists the model decides over.
    pub fn render_catalog(index: &UnifiedIndex, facts: &[Fact]) -> String {
        let mut catalog = String::from("Existing memories:\n");
        if index.existing_count() == 0 {
            catalog.push_str("(none)\n");
        } else {
            for (i, memory) in index.existing().iter().enumerate() {
                catalog.push_str(&format!("{}. {}\n", i + 1, memory.content));
            }
        }

        catalog.push_str("\nNew facts:\n");
        let offset = index.existing_count();
        for (i, fact) in facts.iter().enumerate() {
            catalog.push_str(&format!("{}. {}\n", offset + i + 1, fact.text));
        }

        catalog
    }

    /// Ask the model for merge decisions over the catalog.
    ///
    /// Returns the raw decisions; reference validation happens in the
    /// planner, where invalid ids are dropped without aborting the run.
    #[tracing::instrument(
        name = "merge_decide",
        skip(client, index, facts),
        fields(existing = index.existing_count(), facts = facts.len())
    )]
    pub async fn decide(
        client: &StructuredClient,
        index: &UnifiedIndex,
        facts: &[Fact],
    ) -> Result<Vec<MergeDecision>, LlmError> {
        let catalog = Self::render_catalog(index, facts);
        let sheet: MergeSheet = client.call("MergeSheet", MERGE_SYSTEM_PROMPT, &catalog).await?;
        Ok(sheet.memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engram_types::memory::{MemoryAction, MemoryCategory, MemoryRecord, RankedMemory};
    use uuid::Uuid;

    fn make_fact(text: &str) -> Fact {
        Fact {
            text: text.to_string(),
            category: MemoryCategory::UserPreference,
            importance: 0.5,
            confidence: 0.8,
        }
    }

    fn make_ranked(content: &str) -> RankedMemory {
        RankedMemory {
            record: MemoryRecord {
                id: Uuid::now_v7(),
                user_id: Uuid::now_v7(),
                content: content.to_string(),
                prev_content: None,
                category: MemoryCategory::UserPreference,
                importance: 0.5,
                confidence: 0.8,
                action: MemoryAction::Add,
                embedding: vec![0.0; 4],
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            similarity: 0.82,
        }
    }

    #[test]
    fn test_render_catalog_numbers_both_lists() {
        let per_fact = vec![vec![make_ranked("User likes coffee")]];
        let facts = vec![make_fact("User prefers dark roast")];
        let index = UnifiedIndex::build(&per_fact, facts.len());

        let catalog = MergeDecider::render_catalog(&index, &facts);
        assert!(catalog.contains("1. User likes coffee"));
        assert!(catalog.contains("2. User prefers dark roast"));
    }

    #[test]
    fn test_render_catalog_without_existing() {
        let facts = vec![make_fact("User lives in Berlin"), make_fact("User has a dog")];
        let index = UnifiedIndex::build(&[vec![], vec![]], facts.len());

        let catalog = MergeDecider::render_catalog(&index, &facts);
        assert!(catalog.contains("(none)"));
        assert!(catalog.contains("1. User lives in Berlin"));
        assert!(catalog.contains("2. User has a dog"));
    }

    #[test]
    fn test_merge_prompt_describes_events() {
        assert!(MERGE_SYSTEM_PROMPT.contains("ADD"));
        assert!(MERGE_SYSTEM_PROMPT.contains("UPDATE"));
        assert!(MERGE_SYSTEM_PROMPT.contains("SKIP"));
        assert!(MERGE_SYSTEM_PROMPT.contains("full replacement statement"));
    }
}

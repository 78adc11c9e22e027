//! Fact extraction via LLM.
//!
//! `FactExtractor` turns a batch of pending user messages into candidate
//! facts with a single schema-constrained model call. An empty result is a
//! valid outcome (the caller short-circuits); a failed call propagates with
//! no side effects so the messages stay pending for a later retry.

use engram_types::llm::LlmError;
use engram_types::memory::{Fact, FactSheet};
use engram_types::message::Message;

use crate::llm::structured::StructuredClient;

/// System prompt for the fact-extraction call.
const EXTRACTION_SYSTEM_PROMPT: &str = r#"You extract factual statements about the user from conversation transcripts.

Rules:
1. Extract ONLY durable facts about the user worth remembering across conversations
2. Each fact must be a single, self-contained sentence starting with "User"
3. One fact per item -- never combine unrelated facts into one statement
4. Do NOT include greetings, pleasantries, or one-off conversational context
5. Prefer specific statements over vague observations

For each fact assign:
- "category": USER_INFO (identity, biography, circumstances), USER_PREFERENCE (likes, dislikes, habits), USER_GOAL (plans, intentions, things the user wants to achieve), or OTHER
- "importance": 0.0-1.0, how much future conversations benefit from knowing this (identity and stable preferences high, incidental details low)
- "confidence": 0.0-1.0, how directly the user stated it (explicit statements high, inferences low)

If the transcript contains nothing worth remembering, return an empty facts list.

Example facts:
- {"text": "User works as a data engineer in Berlin", "category": "USER_INFO", "importance": 0.9, "confidence": 0.95}
- {"text": "User prefers dark roast coffee", "category": "USER_PREFERENCE", "importance": 0.5, "confidence": 0.9}
- {"text": "User wants to run a marathon next spring", "category": "USER_GOAL", "importance": 0.7, "confidence": 0.85}"#;

/// Stateless utility for extracting facts from pending messages.
pub struct FactExtractor;

impl FactExtractor {
    /// Render messages as transcript lines in chronological order.
    pub fn render_transcript(messages: &[Message]) -> String {
        messages
            .iter()
            .map(Message::transcript_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Extract facts from the given messages.
    ///
    /// Scores outside `[0, 1]` are clamped rather than rejected.
    #[tracing::instrument(
        name = "extract_facts",
        skip(client, messages),
        fields(message_count = messages.len())
    )]
    pub async fn extract(
        client: &StructuredClient,
        messages: &[Message],
    ) -> Result<Vec<Fact>, LlmError> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let transcript = Self::render_transcript(messages);
        let sheet: FactSheet = client
            .call("FactSheet", EXTRACTION_SYSTEM_PROMPT, &transcript)
            .await?;

        let facts = sheet
            .facts
            .into_iter()
            .map(|fact| Fact {
                importance: fact.importance.clamp(0.0, 1.0),
                confidence: fact.confidence.clamp(0.0, 1.0),
                ..fact
            })
            .collect();

        Ok(facts)
    }
}

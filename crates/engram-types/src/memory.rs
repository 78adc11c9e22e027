//! Memory types for Engram.
//!
//! These types model the engine's durable memories and the ephemeral shapes
//! that exist only within one extraction run: facts, merge decisions, and
//! the planned writes produced from them.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Category band of an extracted fact (and of the memory it becomes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryCategory {
    UserInfo,
    UserPreference,
    UserGoal,
    Other,
}

impl fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryCategory::UserInfo => write!(f, "USER_INFO"),
            MemoryCategory::UserPreference => write!(f, "USER_PREFERENCE"),
            MemoryCategory::UserGoal => write!(f, "USER_GOAL"),
            MemoryCategory::Other => write!(f, "OTHER"),
        }
    }
}

impl FromStr for MemoryCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USER_INFO" => Ok(MemoryCategory::UserInfo),
            "USER_PREFERENCE" => Ok(MemoryCategory::UserPreference),
            "USER_GOAL" => Ok(MemoryCategory::UserGoal),
            "OTHER" => Ok(MemoryCategory::Other),
            other => Err(format!("invalid memory category: '{other}'")),
        }
    }
}

/// How a memory row was last written.
///
/// `Delete` exists in the persisted schema but no engine code path produces
/// it; deletion semantics are intentionally unimplemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryAction {
    Add,
    Update,
    Delete,
}

impl fmt::Display for MemoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryAction::Add => write!(f, "ADD"),
            MemoryAction::Update => write!(f, "UPDATE"),
            MemoryAction::Delete => write!(f, "DELETE"),
        }
    }
}

impl FromStr for MemoryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADD" => Ok(MemoryAction::Add),
            "UPDATE" => Ok(MemoryAction::Update),
            "DELETE" => Ok(MemoryAction::Delete),
            other => Err(format!("invalid memory action: '{other}'")),
        }
    }
}

/// A discrete factual statement extracted from a user's messages.
///
/// Ephemeral: exists only within one pipeline run. `importance` and
/// `confidence` are model-assigned scores in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Fact {
    /// Self-contained, "User"-prefixed statement of the fact.
    pub text: String,
    pub category: MemoryCategory,
    pub importance: f64,
    pub confidence: f64,
}

/// Output contract of the fact-extraction model call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FactSheet {
    pub facts: Vec<Fact>,
}

/// Event kind of a merge decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum MergeEvent {
    Add,
    Update,
}

/// One merge decision referencing an item by its unified number.
///
/// `id` is a per-run label: existing memories are numbered `1..=E`, new
/// facts `E+1..=E+F`. A skipped fact simply has no decision. For `Add`,
/// an empty `text` means "use the referenced fact's text verbatim"; for
/// `Update`, `text` is the full merged replacement statement.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MergeDecision {
    pub id: u32,
    pub event: MergeEvent,
    #[serde(default)]
    pub text: String,
}

/// Output contract of the merge-decision model call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MergeSheet {
    pub memory: Vec<MergeDecision>,
}

/// A durable memory row.
///
/// Created by ADD; `content`, `prev_content`, `embedding` and `action` are
/// overwritten by UPDATE. The embedding always reflects the current
/// `content`; `prev_content` holds exactly one level of history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub prev_content: Option<String>,
    pub category: MemoryCategory,
    pub importance: f64,
    pub confidence: f64,
    pub action: MemoryAction,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A memory returned from similarity search, with its cosine similarity
/// (`1 - cosine distance`) to the query vector.
#[derive(Debug, Clone)]
pub struct RankedMemory {
    pub record: MemoryRecord,
    pub similarity: f32,
}

/// A fully-resolved new memory ready for insertion (`action = ADD`).
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub category: MemoryCategory,
    pub importance: f64,
    pub confidence: f64,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// One concrete write resolved from an accepted merge decision.
#[derive(Debug, Clone)]
pub enum PlannedWrite {
    /// Insert a new memory row.
    Insert(NewMemory),
    /// Overwrite an existing memory: new content, one level of history,
    /// and the embedding of the new content.
    Overwrite {
        memory_id: Uuid,
        content: String,
        prev_content: String,
        embedding: Vec<f32>,
    },
}

/// Everything the transactional applier needs to commit one run.
///
/// Committed atomically: all writes plus marking `message_ids` extracted,
/// or nothing at all.
#[derive(Debug, Clone)]
pub struct WritePlan {
    pub user_id: Uuid,
    pub writes: Vec<PlannedWrite>,
    pub message_ids: Vec<Uuid>,
}

impl WritePlan {
    /// Number of planned inserts.
    pub fn added(&self) -> u32 {
        self.writes
            .iter()
            .filter(|w| matches!(w, PlannedWrite::Insert(_)))
            .count() as u32
    }

    /// Number of planned overwrites.
    pub fn updated(&self) -> u32 {
        self.writes
            .iter()
            .filter(|w| matches!(w, PlannedWrite::Overwrite { .. }))
            .count() as u32
    }
}

/// Counts returned by one extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub facts_extracted: u32,
    pub memories_added: u32,
    pub memories_updated: u32,
    pub messages_extracted: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_category_roundtrip() {
        for cat in [
            MemoryCategory::UserInfo,
            MemoryCategory::UserPreference,
            MemoryCategory::UserGoal,
            MemoryCategory::Other,
        ] {
            let s = cat.to_string();
            let parsed: MemoryCategory = s.parse().unwrap();
            assert_eq!(cat, parsed);
        }
    }

    #[test]
    fn test_memory_category_serde() {
        let cat = MemoryCategory::UserPreference;
        let json = serde_json::to_string(&cat).unwrap();
        assert_eq!(json, "\"USER_PREFERENCE\"");
        let parsed: MemoryCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, MemoryCategory::UserPreference);
    }

    #[test]
    fn test_memory_action_roundtrip() {
        for action in [MemoryAction::Add, MemoryAction::Update, MemoryAction::Delete] {
            let s = action.to_string();
            let parsed: MemoryAction = s.parse().unwrap();
            assert_eq!(action, parsed);
        }
    }

    #[test]
    fn test_fact_sheet_deserialize() {
        let json = r#"{
            "facts": [
                {"text": "User lives in Berlin", "category": "USER_INFO", "importance": 0.8, "confidence": 0.9},
                {"text": "User prefers dark roast coffee", "category": "USER_PREFERENCE", "importance": 0.5, "confidence": 0.7}
            ]
        }"#;
        let sheet: FactSheet = serde_json::from_str(json).unwrap();
        assert_eq!(sheet.facts.len(), 2);
        assert_eq!(sheet.facts[0].category, MemoryCategory::UserInfo);
        assert!((sheet.facts[1].importance - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_merge_decision_text_defaults_empty() {
        let json = r#"{"memory": [{"id": 3, "event": "ADD"}]}"#;
        let sheet: MergeSheet = serde_json::from_str(json).unwrap();
        assert_eq!(sheet.memory.len(), 1);
        assert_eq!(sheet.memory[0].id, 3);
        assert_eq!(sheet.memory[0].event, MergeEvent::Add);
        assert!(sheet.memory[0].text.is_empty());
    }

    #[test]
    fn test_write_plan_counts() {
        let user_id = Uuid::now_v7();
        let plan = WritePlan {
            user_id,
            writes: vec![
                PlannedWrite::Insert(NewMemory {
                    id: Uuid::now_v7(),
                    user_id,
                    content: "User likes Rust".to_string(),
                    category: MemoryCategory::UserPreference,
                    importance: 0.6,
                    confidence: 0.8,
                    embedding: vec![0.0; 4],
                    created_at: Utc::now(),
                }),
                PlannedWrite::Overwrite {
                    memory_id: Uuid::now_v7(),
                    content: "User likes dark roast coffee".to_string(),
                    prev_content: "User likes coffee".to_string(),
                    embedding: vec![0.0; 4],
                },
            ],
            message_ids: vec![Uuid::now_v7()],
        };
        assert_eq!(plan.added(), 1);
        assert_eq!(plan.updated(), 1);
    }

    #[test]
    fn test_extraction_report_camel_case() {
        let report = ExtractionReport {
            facts_extracted: 2,
            memories_added: 1,
            memories_updated: 1,
            messages_extracted: 3,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"factsExtracted\":2"));
        assert!(json.contains("\"memoriesAdded\":1"));
        assert!(json.contains("\"memoriesUpdated\":1"));
        assert!(json.contains("\"messagesExtracted\":3"));
    }
}

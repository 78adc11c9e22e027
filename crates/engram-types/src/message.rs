//! Conversational message types.
//!
//! Messages are created by the chat layer; the engine only ever reads them
//! and flips `extracted` from false to true once a run has committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::MessageRole;

/// A single message in a user's conversation history.
///
/// Owned by a user. The engine consumes messages with `role = User` and
/// `extracted = false`; `extracted` transitions false -> true exactly once,
/// inside the same transaction that commits the run's memory writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    /// Whether this message has been consumed by a committed extraction run.
    pub extracted: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Render this message as a single transcript line (`"<role>: <content>"`).
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_message(role: MessageRole, content: &str) -> Message {
        Message {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            role,
            content: content.to_string(),
            extracted: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_transcript_line_format() {
        let msg = make_message(MessageRole::User, "I live in Berlin");
        assert_eq!(msg.transcript_line(), "user: I live in Berlin");
    }

    #[test]
    fn test_message_serde_roundtrip() {
        let msg = make_message(MessageRole::User, "hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"extracted\":false"));
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, msg.id);
        assert_eq!(parsed.content, "hello");
    }
}

//! SQLite message repository implementation.
//!
//! Implements `MessageRepository` from `engram-core` using sqlx with the
//! split read/write pool: raw queries, private Row structs, reads on the
//! reader pool. Messages are created by the chat layer; this repository
//! only reads them, and the transaction-aware [`mark_extracted`] helper is
//! invoked by the memory repository inside the commit transaction.

use engram_core::memory::store::MessageRepository;
use engram_types::error::RepositoryError;
use engram_types::llm::MessageRole;
use engram_types::message::Message;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Message.
struct MessageRow {
    id: String,
    user_id: String,
    role: String,
    content: String,
    extracted: i64,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            extracted: row.try_get("extracted")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| RepositoryError::Query(format!("invalid user_id: {e}")))?;
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(Message {
            id,
            user_id,
            role,
            content: self.content,
            extracted: self.extracted != 0,
            created_at,
        })
    }
}

impl MessageRepository for SqliteMessageRepository {
    async fn pending_messages(&self, user_id: &Uuid) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE user_id = ? AND extracted = 0 AND role = 'user' ORDER BY created_at ASC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let message_row =
                MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(message_row.into_message()?);
        }

        Ok(messages)
    }
}

/// Mark messages extracted inside an open transaction.
///
/// Called by the memory repository as the last step of a run's commit so
/// memory writes and message marks are atomic together.
pub(crate) async fn mark_extracted(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    ids: &[Uuid],
) -> Result<(), RepositoryError> {
    for id in ids {
        sqlx::query("UPDATE messages SET extracted = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut **tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
    }
    Ok(())
}

/// Insert a user row if it does not exist yet (test and bootstrap helper;
/// user management itself lives outside the engine).
pub async fn ensure_user(pool: &DatabasePool, user_id: &Uuid) -> Result<(), RepositoryError> {
    sqlx::query("INSERT OR IGNORE INTO users (id, created_at) VALUES (?, ?)")
        .bind(user_id.to_string())
        .bind(format_datetime(&chrono::Utc::now()))
        .execute(&pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    Ok(())
}

//! SQLite memory repository implementation.
//!
//! Implements `MemoryRepository` from `engram-core`: cosine-ranked
//! similarity search over the user's BLOB-encoded embedding vectors, and
//! the transactional applier that commits a run's writes together with its
//! message marks. Raw queries with private Row structs, reads on the
//! reader pool, the commit on the single-connection writer.

use engram_core::memory::store::MemoryRepository;
use engram_types::error::RepositoryError;
use engram_types::memory::{
    MemoryAction, MemoryCategory, MemoryRecord, PlannedWrite, RankedMemory, WritePlan,
};
use sqlx::Row;
use uuid::Uuid;

use super::message::mark_extracted;
use super::pool::DatabasePool;
use super::vector::{blob_to_vec, cosine_similarity, vec_to_blob};
use super::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `MemoryRepository`.
pub struct SqliteMemoryRepository {
    pool: DatabasePool,
}

impl SqliteMemoryRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Fetch a single memory by id (used by tests and callers inspecting
    /// results; search and commit are the engine-facing surface).
    pub async fn get(&self, memory_id: &Uuid) -> Result<Option<MemoryRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM memories WHERE id = ?")
            .bind(memory_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| {
            MemoryRow::from_row(&row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_record()
        })
        .transpose()
    }
}

/// Internal row type for mapping SQLite rows to domain MemoryRecord.
struct MemoryRow {
    id: String,
    user_id: String,
    content: String,
    prev_content: Option<String>,
    category: String,
    importance: f64,
    confidence: f64,
    action: String,
    embedding: Vec<u8>,
    created_at: String,
    updated_at: String,
}

impl MemoryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            content: row.try_get("content")?,
            prev_content: row.try_get("prev_content")?,
            category: row.try_get("category")?,
            importance: row.try_get("importance")?,
            confidence: row.try_get("confidence")?,
            action: row.try_get("action")?,
            embedding: row.try_get("embedding")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_record(self) -> Result<MemoryRecord, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid memory id: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| RepositoryError::Query(format!("invalid user_id: {e}")))?;
        let category: MemoryCategory = self
            .category
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let action: MemoryAction = self
            .action
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let created_at = parse_datetime(&self.created_at)?;
        let updated_at = parse_datetime(&self.updated_at)?;

        Ok(MemoryRecord {
            id,
            user_id,
            content: self.content,
            prev_content: self.prev_content,
            category,
            importance: self.importance,
            confidence: self.confidence,
            action,
            embedding: blob_to_vec(&self.embedding),
            created_at,
            updated_at,
        })
    }
}

impl MemoryRepository for SqliteMemoryRepository {
    async fn search_similar(
        &self,
        user_id: &Uuid,
        query: &[f32],
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<RankedMemory>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM memories WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut ranked = Vec::new();
        for row in &rows {
            let record = MemoryRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_record()?;
            let similarity = cosine_similarity(&record.embedding, query);
            if similarity > min_similarity {
                ranked.push(RankedMemory { record, similarity });
            }
        }

        ranked.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(top_k);
        Ok(ranked)
    }

    async fn commit_plan(&self, plan: &WritePlan) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        for write in &plan.writes {
            match write {
                PlannedWrite::Insert(new) => {
                    sqlx::query(
                        r#"INSERT INTO memories (id, user_id, content, prev_content, category, importance, confidence, action, embedding, created_at, updated_at)
                           VALUES (?, ?, ?, NULL, ?, ?, ?, ?, ?, ?, ?)"#,
                    )
                    .bind(new.id.to_string())
                    .bind(new.user_id.to_string())
                    .bind(&new.content)
                    .bind(new.category.to_string())
                    .bind(new.importance)
                    .bind(new.confidence)
                    .bind(MemoryAction::Add.to_string())
                    .bind(vec_to_blob(&new.embedding))
                    .bind(format_datetime(&new.created_at))
                    .bind(format_datetime(&new.created_at))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                }
                PlannedWrite::Overwrite {
                    memory_id,
                    content,
                    prev_content,
                    embedding,
                } => {
                    let result = sqlx::query(
                        r#"UPDATE memories
                           SET content = ?, prev_content = ?, embedding = ?, action = ?, updated_at = ?
                           WHERE id = ?"#,
                    )
                    .bind(content)
                    .bind(prev_content)
                    .bind(vec_to_blob(embedding))
                    .bind(MemoryAction::Update.to_string())
                    .bind(format_datetime(&chrono::Utc::now()))
                    .bind(memory_id.to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;

                    // A vanished target aborts the run; dropping the
                    // transaction rolls back every prior write.
                    if result.rows_affected() == 0 {
                        return Err(RepositoryError::NotFound);
                    }
                }
            }
        }

        mark_extracted(&mut tx, &plan.message_ids).await?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }
}

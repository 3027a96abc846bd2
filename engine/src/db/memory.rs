//! Memory Repository
//!
//! SQLite-backed implementation of [`MemoryService`]. Context retrieval takes
//! a recency window and, when embeddings are available, re-ranks it by
//! cosine similarity to the query before filling up with the most recent
//! entries.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sdk::errors::EngineError;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::llm::{ConversationTurn, Role};
use crate::memory::{cosine_similarity, Embedder, MemoryEntry, MemoryService, Metadata};

const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Timestamp `amount` units before now. Spans too large to represent clamp
/// to the earliest timestamp, so nothing stored is older than the cutoff.
fn cutoff_before_now(amount: u64, unit_millis: i64) -> i64 {
    i64::try_from(amount)
        .ok()
        .and_then(|n| n.checked_mul(unit_millis))
        .and_then(|span| Utc::now().timestamp_millis().checked_sub(span))
        .unwrap_or(i64::MIN)
}

fn db_err(context: &str, e: sqlx::Error) -> EngineError {
    EngineError::Database(format!("{}: {}", context, e))
}

/// Repository for stored memories
#[derive(Clone)]
pub struct MemoryRepository {
    pool: SqlitePool,
    embedder: Option<Arc<dyn Embedder>>,
}

impl MemoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            embedder: None,
        }
    }

    /// Compute embeddings on append and refine retrieval by similarity
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Most recent entries, newest first
    pub async fn recent_entries(&self, limit: usize) -> Result<Vec<MemoryEntry>, EngineError> {
        let rows = sqlx::query(
            r#"
            SELECT id, created_at, content, metadata, embedding
            FROM memories
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("Failed to fetch recent memories", e))?;

        Ok(rows.iter().map(row_to_entry).collect())
    }

    /// Entries created after `cutoff_ms`, newest first
    async fn window(&self, cutoff_ms: i64, limit: usize) -> Result<Vec<MemoryEntry>, EngineError> {
        let rows = sqlx::query(
            r#"
            SELECT id, created_at, content, metadata, embedding
            FROM memories
            WHERE created_at > ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(cutoff_ms)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("Failed to fetch recent memories", e))?;

        Ok(rows.iter().map(row_to_entry).collect())
    }
}

fn row_to_entry(row: &SqliteRow) -> MemoryEntry {
    let created_at: i64 = row.get("created_at");
    let metadata: String = row.get("metadata");
    let embedding: Option<String> = row.get("embedding");

    MemoryEntry {
        id: row.get("id"),
        timestamp: Utc
            .timestamp_millis_opt(created_at)
            .single()
            .unwrap_or_default(),
        content: row.get("content"),
        metadata: serde_json::from_str(&metadata).unwrap_or_default(),
        embedding: embedding.and_then(|e| serde_json::from_str(&e).ok()),
    }
}

/// Order candidates by similarity to `query_vec`, then fill with the rest in
/// recency order. `candidates` must already be newest first.
pub(crate) fn rank_candidates(
    candidates: &[MemoryEntry],
    query_vec: &[f32],
    limit: usize,
) -> Vec<String> {
    let mut scored: Vec<(f32, &MemoryEntry)> = candidates
        .iter()
        .filter_map(|entry| {
            let embedding = entry.embedding.as_ref()?;
            (embedding.len() == query_vec.len())
                .then(|| (cosine_similarity(query_vec, embedding), entry))
        })
        .collect();

    // Stable sort keeps recency order among equal scores
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(limit);
    for entry in scored
        .into_iter()
        .map(|(_, e)| e)
        .take(limit)
        .chain(candidates.iter())
    {
        if out.len() >= limit {
            break;
        }
        if seen.insert(entry.id) {
            out.push(entry.content.clone());
        }
    }
    out
}

#[async_trait]
impl MemoryService for MemoryRepository {
    async fn append(
        &self,
        content: &str,
        metadata: Option<Metadata>,
        embedding: Option<Vec<f32>>,
    ) -> Result<i64, EngineError> {
        let embedding = embedding.or_else(|| self.embedder.as_ref().map(|e| e.embed(content)));

        let metadata_json = serde_json::to_string(&metadata.unwrap_or_default())
            .map_err(|e| EngineError::Database(format!("Failed to encode metadata: {}", e)))?;
        let embedding_json = embedding
            .map(|v| serde_json::to_string(&v))
            .transpose()
            .map_err(|e| EngineError::Database(format!("Failed to encode embedding: {}", e)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO memories (created_at, content, metadata, embedding)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(Utc::now().timestamp_millis())
        .bind(content)
        .bind(metadata_json)
        .bind(embedding_json)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to insert memory", e))?;

        let id = result.last_insert_rowid();
        debug!("Stored memory {}", id);
        Ok(id)
    }

    async fn relevant_context(
        &self,
        query: &str,
        limit: usize,
        window_hours: u64,
    ) -> Result<Vec<String>, EngineError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let cutoff = cutoff_before_now(window_hours, MILLIS_PER_HOUR);
        let candidates = self.window(cutoff, limit * 2).await?;

        if let Some(embedder) = &self.embedder {
            if candidates.iter().any(|c| c.embedding.is_some()) {
                let query_vec = embedder.embed(query);
                if query_vec.iter().any(|v| *v != 0.0) {
                    return Ok(rank_candidates(&candidates, &query_vec, limit));
                }
                debug!("Query has no embeddable tokens, using recency order");
            }
        }

        Ok(candidates
            .into_iter()
            .take(limit)
            .map(|entry| entry.content)
            .collect())
    }

    async fn conversation_history(
        &self,
        limit: usize,
        window_hours: u64,
    ) -> Result<Vec<ConversationTurn>, EngineError> {
        let cutoff = cutoff_before_now(window_hours, MILLIS_PER_HOUR);

        let rows = sqlx::query(
            r#"
            SELECT id, created_at, content, metadata, embedding
            FROM memories
            WHERE created_at > ?
            AND json_extract(metadata, '$.type') = 'conversation'
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(cutoff)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("Failed to fetch conversation history", e))?;

        Ok(rows
            .iter()
            .map(row_to_entry)
            .map(|entry| {
                let role = entry
                    .metadata
                    .get("role")
                    .and_then(|r| r.as_str())
                    .map(Role::from_name)
                    .unwrap_or(Role::Assistant);
                ConversationTurn::new(role, entry.content)
            })
            .collect())
    }

    async fn purge_older_than(&self, days: u64) -> Result<u64, EngineError> {
        let cutoff = cutoff_before_now(days, MILLIS_PER_DAY);

        let result = sqlx::query("DELETE FROM memories WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("Failed to delete old memories", e))?;

        let removed = result.rows_affected();
        if removed > 0 {
            info!("Cleared {} memories older than {} days", removed, days);
        } else {
            debug!("No memories older than {} days", days);
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<u64, EngineError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM memories")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_err("Failed to count memories", e))?;

        Ok(count.max(0) as u64)
    }
}

//! Memory service
//!
//! Durable record of conversation turns and tool executions, queried for
//! context at the start of every cycle. Entries are append-only and removed
//! only by an explicit age-based purge.
//!
//! The orchestrator only depends on the [`MemoryService`] trait; the SQLite
//! implementation lives in [`crate::db::MemoryRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::llm::ConversationTurn;

pub mod embedding;

pub use embedding::{cosine_similarity, Embedder, HashEmbedder};

/// Metadata attached to a memory entry
pub type Metadata = Map<String, Value>;

/// One stored memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Assigned by the store, never reused
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub metadata: Metadata,
    pub embedding: Option<Vec<f32>>,
}

impl MemoryEntry {
    /// Value of the `type` metadata key, if any
    pub fn kind(&self) -> Option<&str> {
        self.metadata.get("type").and_then(Value::as_str)
    }
}

/// Contract between the orchestrator and the memory store
#[async_trait]
pub trait MemoryService: Send + Sync {
    /// Store a new entry and return its id.
    ///
    /// When `embedding` is `None` the store may compute one itself.
    async fn append(
        &self,
        content: &str,
        metadata: Option<Metadata>,
        embedding: Option<Vec<f32>>,
    ) -> Result<i64, EngineError>;

    /// Contents relevant to `query` from the last `window_hours`, most relevant first
    async fn relevant_context(
        &self,
        query: &str,
        limit: usize,
        window_hours: u64,
    ) -> Result<Vec<String>, EngineError>;

    /// Stored conversation turns from the last `window_hours`, newest first
    async fn conversation_history(
        &self,
        limit: usize,
        window_hours: u64,
    ) -> Result<Vec<ConversationTurn>, EngineError>;

    /// Delete entries older than `days`; returns how many were removed
    async fn purge_older_than(&self, days: u64) -> Result<u64, EngineError>;

    /// Total number of stored entries
    async fn count(&self) -> Result<u64, EngineError>;
}

/// Metadata for one side of a conversation exchange
pub fn conversation_metadata(role: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("type".to_string(), Value::String("conversation".to_string()));
    metadata.insert("role".to_string(), Value::String(role.to_string()));
    metadata
}

/// Metadata for a recorded tool execution
pub fn tool_execution_metadata(tool: &str, details: String, success: bool) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(
        "type".to_string(),
        Value::String("tool_execution".to_string()),
    );
    metadata.insert("tool".to_string(), Value::String(tool.to_string()));
    metadata.insert("details".to_string(), Value::String(details));
    metadata.insert("success".to_string(), Value::Bool(success));
    metadata
}

/// Integration tests for the memory database
///
/// Tests the complete database lifecycle including:
/// - Database creation and initialization
/// - WAL mode configuration
/// - Memory retention and purge
/// - Graceful shutdown with WAL flush
use localagent_engine::db::Database;
use localagent_engine::memory::embedding::HashEmbedder;
use localagent_engine::memory::{tool_execution_metadata, MemoryService};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("memory.db");

    let db = Database::new(&db_path).await.unwrap();
    assert!(db_path.exists());

    let wal_path = temp_dir.path().join("memory.db-wal");
    assert!(wal_path.exists());

    let id = db.memories().append("first", None, None).await.unwrap();
    assert!(id > 0);

    db.close().await.unwrap();

    // Data survives a reopen
    let db = Database::new(&db_path).await.unwrap();
    assert_eq!(db.memories().count().await.unwrap(), 1);
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_purge_twice_removes_nothing_the_second_time() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("memory.db"))
        .await
        .unwrap();
    let repo = db.memories();

    // Backdate two rows past the threshold
    for content in ["old one", "old two"] {
        let id = repo.append(content, None, None).await.unwrap();
        sqlx::query("UPDATE memories SET created_at = created_at - ? WHERE id = ?")
            .bind(10_i64 * 24 * 60 * 60 * 1000)
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();
    }
    repo.append("fresh", None, None).await.unwrap();

    assert_eq!(repo.purge_older_than(7).await.unwrap(), 2);
    assert_eq!(repo.purge_older_than(7).await.unwrap(), 0);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_context_is_most_recent_first() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("memory.db"))
        .await
        .unwrap();
    let repo = db.memories();

    for i in 0..6 {
        repo.append(&format!("entry {}", i), None, None).await.unwrap();
    }

    let context = repo.relevant_context("anything", 3, 24).await.unwrap();
    assert_eq!(context, vec!["entry 5", "entry 4", "entry 3"]);
}

#[tokio::test]
async fn test_similarity_refines_within_recency_window() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("memory.db"))
        .await
        .unwrap();
    let repo = db
        .memories()
        .with_embedder(Arc::new(HashEmbedder::default()));

    repo.append("cargo build failed with a linker error", None, None)
        .await
        .unwrap();
    repo.append("weather is sunny today", None, None)
        .await
        .unwrap();

    let context = repo
        .relevant_context("why did cargo build fail", 1, 24)
        .await
        .unwrap();
    assert_eq!(context, vec!["cargo build failed with a linker error"]);
}

#[tokio::test]
async fn test_tool_metadata_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(&temp_dir.path().join("memory.db"))
        .await
        .unwrap();
    let repo = db.memories();

    let metadata = tool_execution_metadata("shell", "Arguments: {}\nResult: ok".to_string(), true);
    repo.append("Executed tool: shell", Some(metadata), None)
        .await
        .unwrap();

    let entries = repo.recent_entries(1).await.unwrap();
    assert_eq!(entries[0].content, "Executed tool: shell");
    assert_eq!(entries[0].kind(), Some("tool_execution"));
    assert_eq!(entries[0].metadata["tool"], "shell");
    assert_eq!(entries[0].metadata["success"], true);
}

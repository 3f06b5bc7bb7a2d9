//! Persistent embedding storage backing semantic search (§4.1).
//!
//! `SqliteVectorStore` is the default embedded backend: embeddings are kept
//! as BLOBs and cosine similarity runs in-process, matching the "persistent
//! vector store" wording in the spec without requiring an external service.

use crate::embedding::cosine_similarity;
use crate::error::{Result, ZooError};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Replace the embedding for one tool (insert or overwrite).
    async fn upsert(&self, tool_name: &str, server_name: &str, embedding: &[f32]) -> Result<()>;
    /// Remove every embedding belonging to one server, e.g. on re-index.
    async fn delete_by_server(&self, server_name: &str) -> Result<()>;
    /// Nearest neighbours by cosine similarity, highest first.
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<(String, f64)>>;
}

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub async fn connect(path: &str) -> Result<Self> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{path}?mode=rwc")
        };
        let pool = SqlitePool::connect(&url)
            .await
            .map_err(|e| ZooError::VectorStore(e.to_string()))?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tool_embeddings (
                tool_name TEXT PRIMARY KEY,
                server_name TEXT NOT NULL,
                embedding BLOB NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| ZooError::VectorStore(e.to_string()))?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tool_embeddings_server ON tool_embeddings(server_name)")
            .execute(&pool)
            .await
            .map_err(|e| ZooError::VectorStore(e.to_string()))?;
        Ok(Self { pool })
    }

    fn encode(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn decode(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, tool_name: &str, server_name: &str, embedding: &[f32]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tool_embeddings (tool_name, server_name, embedding)
            VALUES (?, ?, ?)
            ON CONFLICT(tool_name) DO UPDATE SET
                server_name = excluded.server_name,
                embedding = excluded.embedding
            "#,
        )
        .bind(tool_name)
        .bind(server_name)
        .bind(Self::encode(embedding))
        .execute(&self.pool)
        .await
        .map_err(|e| ZooError::VectorStore(e.to_string()))?;
        Ok(())
    }

    async fn delete_by_server(&self, server_name: &str) -> Result<()> {
        sqlx::query("DELETE FROM tool_embeddings WHERE server_name = ?")
            .bind(server_name)
            .execute(&self.pool)
            .await
            .map_err(|e| ZooError::VectorStore(e.to_string()))?;
        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<(String, f64)>> {
        let rows = sqlx::query("SELECT tool_name, embedding FROM tool_embeddings")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ZooError::VectorStore(e.to_string()))?;

        let mut scored: Vec<(String, f64)> = rows
            .iter()
            .map(|row| {
                let name: String = row.get("tool_name");
                let blob: Vec<u8> = row.get("embedding");
                let embedding = Self::decode(&blob);
                (name, cosine_similarity(query_embedding, &embedding))
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(top_k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn in_memory_store() -> SqliteVectorStore {
        SqliteVectorStore::connect(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn upsert_then_search_finds_closest_match() {
        let store = in_memory_store().await;
        store.upsert("fs.read_file", "fs", &[1.0, 0.0, 0.0]).await.unwrap();
        store.upsert("gh.create_issue", "gh", &[0.0, 1.0, 0.0]).await.unwrap();

        let results = store.search(&[0.9, 0.1, 0.0], 1).await.unwrap();
        assert_eq!(results[0].0, "fs.read_file");
    }

    #[tokio::test]
    async fn delete_by_server_removes_only_that_servers_vectors() {
        let store = in_memory_store().await;
        store.upsert("fs.read_file", "fs", &[1.0, 0.0]).await.unwrap();
        store.upsert("gh.create_issue", "gh", &[0.0, 1.0]).await.unwrap();
        store.delete_by_server("fs").await.unwrap();

        let results = store.search(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "gh.create_issue");
    }
}

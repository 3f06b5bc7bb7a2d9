use crate::embedding::EmbeddingBackend;
use crate::error::{Result, ZooError};
use crate::keyword;
use crate::snapshot::ZooSnapshot;
use crate::vector_store::VectorStore;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use ucp_core::config::ToolZooConfig;
use ucp_core::ToolSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Semantic,
    Keyword,
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZooStats {
    pub tool_count: usize,
    pub per_server_count: BTreeMap<String, usize>,
    pub last_index_time: Option<DateTime<Utc>>,
}

/// Persistent vector+keyword index over downstream tool schemas (§4.1).
pub struct ToolZoo {
    snapshot: RwLock<Arc<ZooSnapshot>>,
    embeddings: Arc<dyn EmbeddingBackend>,
    vectors: Arc<dyn VectorStore>,
    config: ToolZooConfig,
}

impl ToolZoo {
    pub fn new(
        embeddings: Arc<dyn EmbeddingBackend>,
        vectors: Arc<dyn VectorStore>,
        config: ToolZooConfig,
    ) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(ZooSnapshot::default())),
            embeddings,
            vectors,
            config,
        }
    }

    fn current(&self) -> Arc<ZooSnapshot> {
        self.snapshot.read().clone()
    }

    /// Atomic bulk replace across every server. In-flight queries observe
    /// either the pre- or post-state, never a mix, because the swap is a
    /// single `Arc` assignment under a short write lock.
    pub async fn index(&self, tools: Vec<ToolSchema>) -> Result<()> {
        for schema in &tools {
            let embedding = self.embeddings.embed(&schema.embedding_text()).await?;
            self.vectors
                .upsert(&schema.name, &schema.server_name, &embedding)
                .await?;
        }
        let next = ZooSnapshot::with_full_replace(tools);
        *self.snapshot.write() = Arc::new(next);
        Ok(())
    }

    /// Atomic per-server replace: re-indexing one server invalidates only
    /// its vectors and leaves every other server's entries untouched.
    pub async fn index_server(&self, server_name: &str, tools: Vec<ToolSchema>) -> Result<()> {
        self.vectors.delete_by_server(server_name).await?;
        for schema in &tools {
            let embedding = self.embeddings.embed(&schema.embedding_text()).await?;
            self.vectors
                .upsert(&schema.name, &schema.server_name, &embedding)
                .await?;
        }
        let current = self.current();
        let next = current.with_server_replaced(server_name, tools);
        *self.snapshot.write() = Arc::new(next);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<ToolSchema> {
        self.current()
            .tools
            .get(name)
            .cloned()
            .ok_or_else(|| ZooError::NotFound(name.to_string()))
    }

    /// Every indexed tool, name-sorted. Used as the router's last-resort
    /// fallback when both candidate retrieval and keyword search fail (§4.2).
    pub fn all_tools(&self) -> Vec<ToolSchema> {
        self.current().tools.values().cloned().collect()
    }

    pub fn stats(&self) -> ZooStats {
        let snapshot = self.current();
        ZooStats {
            tool_count: snapshot.tools.len(),
            per_server_count: snapshot.per_server_count(),
            last_index_time: snapshot.last_index_time,
        }
    }

    /// `search` never raises for an empty result; it returns an empty
    /// sequence. Embedding-backend failures in `semantic`/`hybrid` mode
    /// propagate so the Router's fallback chain can react (§4.1).
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        mode: SearchMode,
    ) -> Result<Vec<(ToolSchema, f64)>> {
        let snapshot = self.current();
        if query.is_empty() || snapshot.tools.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: BTreeMap<String, f64> = BTreeMap::new();

        if matches!(mode, SearchMode::Keyword | SearchMode::Hybrid) {
            for schema in snapshot.tools.values() {
                let score = keyword::score(query, schema);
                if score > 0.0 {
                    let weighted = if mode == SearchMode::Keyword {
                        score
                    } else {
                        self.config.keyword_weight * score
                    };
                    *scored.entry(schema.name.clone()).or_insert(0.0) += weighted;
                }
            }
        }

        if matches!(mode, SearchMode::Semantic | SearchMode::Hybrid) {
            let query_embedding = self.embeddings.embed(query).await?;
            let semantic_hits = self.vectors.search(&query_embedding, snapshot.tools.len().max(top_k)).await?;
            for (name, score) in semantic_hits {
                if !snapshot.tools.contains_key(&name) {
                    continue;
                }
                let weighted = if mode == SearchMode::Semantic {
                    score
                } else {
                    self.config.semantic_weight * score
                };
                *scored.entry(name).or_insert(0.0) += weighted;
            }
        }

        let floor = if mode == SearchMode::Hybrid {
            self.config.min_similarity
        } else {
            0.0
        };

        let mut results: Vec<(ToolSchema, f64)> = scored
            .into_iter()
            .filter(|(_, score)| *score > floor)
            .filter_map(|(name, score)| snapshot.tools.get(&name).cloned().map(|schema| (schema, score)))
            .collect();

        // Highest score first; ties broken by lexicographic tool name (stable).
        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.name.cmp(&b.0.name))
        });
        results.truncate(top_k);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingBackend;
    use crate::vector_store::SqliteVectorStore;
    use std::collections::BTreeSet;

    async fn build_zoo() -> ToolZoo {
        let embeddings = Arc::new(HashEmbeddingBackend::new(128));
        let vectors = Arc::new(SqliteVectorStore::connect(":memory:").await.unwrap());
        ToolZoo::new(embeddings, vectors, ToolZooConfig::default())
    }

    fn fs_tools() -> Vec<ToolSchema> {
        vec![
            ToolSchema::new(
                "fs",
                "read_file",
                "Read a file from disk",
                serde_json::json!({"type": "object"}),
                BTreeSet::from(["files".to_string()]),
            ),
            ToolSchema::new(
                "fs",
                "list_directory",
                "List the files in a directory",
                serde_json::json!({"type": "object"}),
                BTreeSet::from(["files".to_string()]),
            ),
            ToolSchema::new(
                "gh",
                "create_issue",
                "Open a new GitHub issue",
                serde_json::json!({"type": "object"}),
                BTreeSet::from(["github".to_string()]),
            ),
        ]
    }

    #[tokio::test]
    async fn keyword_search_ranks_name_match_first() {
        let zoo = build_zoo().await;
        zoo.index(fs_tools()).await.unwrap();
        let results = zoo.search("list directory", 5, SearchMode::Keyword).await.unwrap();
        assert_eq!(results[0].0.name, "fs.list_directory");
    }

    #[tokio::test]
    async fn search_on_empty_index_returns_empty() {
        let zoo = build_zoo().await;
        let results = zoo.search("anything", 5, SearchMode::Hybrid).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn empty_query_returns_empty() {
        let zoo = build_zoo().await;
        zoo.index(fs_tools()).await.unwrap();
        let results = zoo.search("", 5, SearchMode::Hybrid).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn reindex_unchanged_set_leaves_results_identical() {
        let zoo = build_zoo().await;
        zoo.index(fs_tools()).await.unwrap();
        let before = zoo.search("list directory", 5, SearchMode::Keyword).await.unwrap();
        zoo.index(fs_tools()).await.unwrap();
        let after = zoo.search("list directory", 5, SearchMode::Keyword).await.unwrap();
        let before_names: Vec<_> = before.iter().map(|(s, _)| s.name.clone()).collect();
        let after_names: Vec<_> = after.iter().map(|(s, _)| s.name.clone()).collect();
        assert_eq!(before_names, after_names);
    }

    #[tokio::test]
    async fn index_server_only_invalidates_that_servers_tools() {
        let zoo = build_zoo().await;
        zoo.index(fs_tools()).await.unwrap();
        zoo.index_server("gh", vec![]).await.unwrap();
        let stats = zoo.stats();
        assert_eq!(stats.per_server_count.get("gh"), None);
        assert_eq!(stats.per_server_count.get("fs"), Some(&2));
    }

    #[tokio::test]
    async fn get_missing_tool_errors() {
        let zoo = build_zoo().await;
        assert!(zoo.get("nope.nope").is_err());
    }
}

//! Pluggable Qdrant-backed `VectorStore` for operators who already run a
//! Qdrant instance instead of relying on the embedded SQLite default.

use crate::error::{Result, ZooError};
use crate::vector_store::VectorStore;
use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;

pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
}

impl QdrantVectorStore {
    pub async fn connect(url: &str, collection: impl Into<String>, dimensions: u64) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .skip_compatibility_check()
            .build()
            .map_err(|e| ZooError::VectorStore(e.to_string()))?;
        let store = Self {
            client,
            collection: collection.into(),
        };
        store.ensure_collection(dimensions).await?;
        Ok(store)
    }

    async fn ensure_collection(&self, dimensions: u64) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| ZooError::VectorStore(e.to_string()))?;
        if exists {
            return Ok(());
        }
        match self
            .client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dimensions, Distance::Cosine)),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("already exists") => Ok(()),
            Err(e) => Err(ZooError::VectorStore(e.to_string())),
        }
    }

    fn point_id_for(tool_name: &str) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        tool_name.hash(&mut hasher);
        hasher.finish()
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(&self, tool_name: &str, server_name: &str, embedding: &[f32]) -> Result<()> {
        let mut payload = HashMap::new();
        payload.insert("tool_name".to_string(), tool_name.to_string().into());
        payload.insert("server_name".to_string(), server_name.to_string().into());

        let point = PointStruct::new(Self::point_id_for(tool_name), embedding.to_vec(), payload);
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]))
            .await
            .map_err(|e| ZooError::VectorStore(e.to_string()))?;
        Ok(())
    }

    async fn delete_by_server(&self, server_name: &str) -> Result<()> {
        let filter = Filter::must([Condition::matches("server_name", server_name.to_string())]);
        self.client
            .delete_points(
                qdrant_client::qdrant::DeletePointsBuilder::new(&self.collection)
                    .points(filter)
                    .wait(true),
            )
            .await
            .map_err(|e| ZooError::VectorStore(e.to_string()))?;
        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<(String, f64)>> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query_embedding.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| ZooError::VectorStore(e.to_string()))?;

        Ok(results
            .result
            .into_iter()
            .filter_map(|point| {
                let name = point
                    .payload
                    .get("tool_name")
                    .and_then(|v| v.as_str().map(|s| s.to_string()))?;
                Some((name, point.score as f64))
            })
            .collect())
    }
}

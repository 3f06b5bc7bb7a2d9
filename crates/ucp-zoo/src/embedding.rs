//! Pluggable embedding backends for Tool Zoo semantic search (§4.1).
//!
//! `HashEmbeddingBackend` is the zero-dependency default: deterministic,
//! offline, no API key required, in the spirit of the "local, no key needed"
//! tier a production embedding client falls back to. `OpenAiEmbeddingBackend`
//! is the real pluggable backend for operators with an API key.

use crate::error::{Result, ZooError};
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimensions(&self) -> usize;
}

/// Deterministic bag-of-tokens hashing embedding. Not semantically rich, but
/// stable, free, and sufficient to exercise the hybrid-search pipeline and
/// its fallback chain without a network dependency.
pub struct HashEmbeddingBackend {
    dimensions: usize,
}

impl HashEmbeddingBackend {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingBackend for HashEmbeddingBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in crate::keyword::tokenize(text) {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            use std::hash::{Hash, Hasher};
            token.hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h as usize) % self.dimensions;
            let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// OpenAI-compatible embeddings client (text-embedding-3-small by default).
pub struct OpenAiEmbeddingBackend {
    api_key: String,
    model: String,
    dimensions: usize,
    http: reqwest::Client,
}

impl OpenAiEmbeddingBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
            http,
        }
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiEmbeddingBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({ "model": self.model, "input": text });
        let response = self
            .http
            .post(OPENAI_EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ZooError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ZooError::Embedding(format!("openai error {status}: {text}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ZooError::Embedding(e.to_string()))?;
        let values = json["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| ZooError::Embedding("missing embedding field".to_string()))?;
        Ok(values
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embedding_is_deterministic() {
        let backend = HashEmbeddingBackend::new(64);
        let a = backend.embed("list my files").await.unwrap();
        let b = backend.embed("list my files").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn similar_text_scores_higher_than_unrelated_text() {
        let backend = HashEmbeddingBackend::new(256);
        let query = backend.embed("list files in a directory").await.unwrap();
        let close = backend.embed("list directory contents").await.unwrap();
        let far = backend.embed("send an email to finance").await.unwrap();
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn cosine_similarity_handles_mismatched_length() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    }
}

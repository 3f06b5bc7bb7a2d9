use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZooError {
    #[error("embedding backend failed: {0}")]
    Embedding(String),
    #[error("vector store failed: {0}")]
    VectorStore(String),
    #[error("tool not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, ZooError>;

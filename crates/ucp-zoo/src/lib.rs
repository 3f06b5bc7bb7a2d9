//! Persistent vector+keyword index over downstream tool schemas.
//!
//! The Zoo is read lock-free: readers clone an `Arc<ZooSnapshot>` under a
//! short read lock and then operate without contention; writers build a new
//! snapshot off to the side and swap it in atomically (§5).

pub mod embedding;
pub mod error;
pub mod keyword;
pub mod snapshot;
pub mod vector_store;
#[cfg(feature = "qdrant")]
pub mod vector_store_qdrant;
pub mod zoo;

pub use embedding::{EmbeddingBackend, HashEmbeddingBackend, OpenAiEmbeddingBackend};
pub use error::ZooError;
pub use snapshot::ZooSnapshot;
pub use vector_store::{SqliteVectorStore, VectorStore};
#[cfg(feature = "qdrant")]
pub use vector_store_qdrant::QdrantVectorStore;
pub use zoo::{SearchMode, ToolZoo, ZooStats};

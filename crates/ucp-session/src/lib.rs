//! Per-client conversation state (§4.4): message history, recent tool usage
//! with geometric decay, and trace context, behind a pluggable store.

pub mod error;
pub mod memory_store;
pub mod sqlite_store;
pub mod store;

pub use error::SessionError;
pub use memory_store::InMemorySessionStore;
pub use sqlite_store::SqliteSessionStore;
pub use store::SessionStore;

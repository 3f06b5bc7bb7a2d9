//! Connection pool: one downstream MCP session per configured server, each
//! behind its own connection-state machine and circuit breaker (§4.3, §5).

pub mod client;
pub mod error;
pub mod pool;
pub mod runtime;

pub use error::PoolError;
pub use pool::{ConnectionPool, ServerStatus};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("server '{0}' is not configured")]
    UnknownServer(String),

    #[error("circuit breaker open for server '{server}', retry after {retry_after_secs}s")]
    BreakerOpen { server: String, retry_after_secs: u64 },

    #[error("failed to connect to server '{server}': {message}")]
    Connect { server: String, message: String },

    #[error("call to '{server}' timed out after {timeout_secs}s")]
    Timeout { server: String, timeout_secs: u64 },

    #[error("transport error talking to '{server}': {message}")]
    Transport { server: String, message: String },

    #[error("tool '{tool}' not found on server '{server}'")]
    ToolNotFound { server: String, tool: String },
}

pub type Result<T> = std::result::Result<T, PoolError>;

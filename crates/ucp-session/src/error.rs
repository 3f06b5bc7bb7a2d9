use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("session store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;

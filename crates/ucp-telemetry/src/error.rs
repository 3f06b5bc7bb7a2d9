use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry log io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("telemetry log serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

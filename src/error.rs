// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("queue has been released")]
    QueueReleased,

    #[error("gesture worker for {0} is not running")]
    WorkerStopped(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input injection error: {0}")]
    Injection(String),

    #[error("Recording error: {0}")]
    Recording(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

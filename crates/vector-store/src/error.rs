use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("embedding error: {0}")]
    EmbeddingError(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("insertBatch rejected: {0}")]
    InvalidInsert(String),

    #[error("store is corrupt: {0}")]
    Corrupt(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, VectorStoreError>;

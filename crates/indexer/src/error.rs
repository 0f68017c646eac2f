use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Chunker error: {0}")]
    ChunkerError(#[from] context_code_chunker::ChunkerError),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] context_vector_store::VectorStoreError),

    #[error("Full-text index error: {0}")]
    FtsError(#[from] context_fts::FtsError),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Index budget exceeded")]
    BudgetExceeded,

    #[error("embedding model mismatch: index was built with {recorded}, current pipeline is {current}; run reindexProject to rebuild")]
    ModelMismatch { recorded: String, current: String },

    #[error("operation requires explicit confirmation: {0}")]
    ConfirmationRequired(String),

    #[error("index is corrupt: {0}")]
    IndexCorrupt(String),

    #[error("path is not inside a detected project")]
    ProjectNotDetected,

    #[error("{0}")]
    Other(String),
}

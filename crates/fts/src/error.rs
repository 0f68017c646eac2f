use thiserror::Error;

#[derive(Debug, Error)]
pub enum FtsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("index is corrupt: {0}")]
    Corrupt(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FtsError>;

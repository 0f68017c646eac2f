use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("invalid glob pattern: {0}")]
    InvalidPattern(String),

    #[error(transparent)]
    Indexer(#[from] context_indexer::IndexerError),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("unsupported language for this operation: {0}")]
    UnsupportedLanguage(String),

    #[error("tree-sitter parse failed for {path}: {detail}")]
    ParseFailed { path: String, detail: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl ChunkerError {
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }
}

pub type Result<T> = std::result::Result<T, ChunkerError>;

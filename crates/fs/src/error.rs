use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path escapes project root: {0}")]
    PathEscape(String),

    #[error("symlink target escapes project root: {0}")]
    SymlinkEscape(String),

    #[error("glob pattern invalid: {0}")]
    InvalidPattern(String),

    #[error("max directory depth ({max}) exceeded at {path}")]
    DepthExceeded { path: String, max: usize },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FsError>;

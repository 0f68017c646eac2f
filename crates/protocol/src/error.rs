use context_vector_store::VectorStoreError;
use thiserror::Error;

/// Machine-readable error code from spec §7's taxonomy. Every [`CoreError`]
/// carries exactly one of these plus a human message and, where useful, a
/// developer-facing detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorKind {
    ProjectNotDetected,
    IndexNotFound,
    ModelUnavailable,
    ModelMismatch,
    IndexCorrupt,
    FileLimitWarning,
    PermissionDenied,
    DiskFull,
    FileNotFound,
    InvalidPattern,
    SymlinkNotAllowed,
    IndexingInProgress,
    ConfirmationRequired,
}

impl CoreErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProjectNotDetected => "PROJECT_NOT_DETECTED",
            Self::IndexNotFound => "INDEX_NOT_FOUND",
            Self::ModelUnavailable => "MODEL_UNAVAILABLE",
            Self::ModelMismatch => "MODEL_MISMATCH",
            Self::IndexCorrupt => "INDEX_CORRUPT",
            Self::FileLimitWarning => "FILE_LIMIT_WARNING",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::DiskFull => "DISK_FULL",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::InvalidPattern => "INVALID_PATTERN",
            Self::SymlinkNotAllowed => "SYMLINK_NOT_ALLOWED",
            Self::IndexingInProgress => "INDEXING_IN_PROGRESS",
            Self::ConfirmationRequired => "CONFIRMATION_REQUIRED",
        }
    }
}

/// A core-level error: machine code plus a message meant for the caller and
/// an optional detail meant for logs/developers.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub kind: CoreErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl CoreError {
    #[must_use]
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.as_str()
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<context_indexer::IndexerError> for CoreError {
    fn from(err: context_indexer::IndexerError) -> Self {
        use context_indexer::IndexerError as E;
        match err {
            E::ModelMismatch { recorded, current } => {
                CoreError::new(CoreErrorKind::ModelMismatch, format!("index was built with {recorded}, current pipeline is {current}; run reindexProject"))
            }
            E::ConfirmationRequired(op) => {
                CoreError::new(CoreErrorKind::ConfirmationRequired, format!("{op} requires explicit confirmation"))
            }
            E::IndexCorrupt(detail) => CoreError::new(CoreErrorKind::IndexCorrupt, "index is corrupt").with_detail(detail),
            E::ProjectNotDetected => CoreError::new(CoreErrorKind::ProjectNotDetected, "no project root detected from this path"),
            E::VectorStoreError(VectorStoreError::ModelUnavailable(detail)) => {
                CoreError::new(CoreErrorKind::ModelUnavailable, "embedding model unavailable").with_detail(detail)
            }
            E::VectorStoreError(VectorStoreError::Corrupt(detail)) => {
                CoreError::new(CoreErrorKind::IndexCorrupt, "vector store is corrupt").with_detail(detail)
            }
            E::IoError(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                CoreError::new(CoreErrorKind::PermissionDenied, "permission denied").with_detail(io.to_string())
            }
            E::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                CoreError::new(CoreErrorKind::FileNotFound, "file not found").with_detail(io.to_string())
            }
            E::IoError(io) if matches!(io.raw_os_error(), Some(28)) => {
                CoreError::new(CoreErrorKind::DiskFull, "disk full").with_detail(io.to_string())
            }
            other => CoreError::new(CoreErrorKind::IndexCorrupt, other.to_string()),
        }
    }
}

impl From<context_search::SearchError> for CoreError {
    fn from(err: context_search::SearchError) -> Self {
        use context_search::SearchError as E;
        match err {
            E::EmptyQuery => CoreError::new(CoreErrorKind::InvalidPattern, "query must not be empty"),
            E::InvalidPattern(pattern) => CoreError::new(CoreErrorKind::InvalidPattern, format!("invalid glob pattern: {pattern}")),
            E::Indexer(inner) => inner.into(),
        }
    }
}

impl From<globset::Error> for CoreError {
    fn from(err: globset::Error) -> Self {
        CoreError::new(CoreErrorKind::InvalidPattern, "invalid glob pattern").with_detail(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => CoreError::new(CoreErrorKind::PermissionDenied, "permission denied").with_detail(err.to_string()),
            std::io::ErrorKind::NotFound => CoreError::new(CoreErrorKind::FileNotFound, "file not found").with_detail(err.to_string()),
            _ => CoreError::new(CoreErrorKind::IndexCorrupt, "io error").with_detail(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::new(CoreErrorKind::IndexCorrupt, "malformed JSON").with_detail(err.to_string())
    }
}

impl From<context_code_chunker::ChunkerError> for CoreError {
    fn from(err: context_code_chunker::ChunkerError) -> Self {
        CoreError::new(CoreErrorKind::IndexCorrupt, "chunking failed").with_detail(err.to_string())
    }
}

impl From<VectorStoreError> for CoreError {
    fn from(err: VectorStoreError) -> Self {
        match err {
            VectorStoreError::ModelUnavailable(detail) => CoreError::new(CoreErrorKind::ModelUnavailable, "embedding model unavailable").with_detail(detail),
            VectorStoreError::Corrupt(detail) => CoreError::new(CoreErrorKind::IndexCorrupt, "vector store is corrupt").with_detail(detail),
            other => CoreError::new(CoreErrorKind::IndexCorrupt, other.to_string()),
        }
    }
}

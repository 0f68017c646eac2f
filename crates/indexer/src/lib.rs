//! # Context Indexer
//!
//! Project indexing for semantic code search.
//!
//! ## Pipeline
//!
//! ```text
//! Directory
//!     │
//!     ├──> File Scanner (.gitignore aware)
//!     │      └─> Source files
//!     │
//!     ├──> Chunker (AST-aware)
//!     │      └─> Code chunks
//!     │
//!     └──> Vector Store (batch embed)
//!            └─> Searchable index
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use context_indexer::ProjectIndexer;
//! use context_vector_store::{Embedder, EmbedderConfig};
//! use std::sync::Arc;
//!
//! # async fn run(code_config: EmbedderConfig, docs_config: EmbedderConfig) -> anyhow::Result<()> {
//! let code_embedder = Arc::new(Embedder::new(code_config));
//! let docs_embedder = Arc::new(Embedder::new(docs_config));
//! let indexer = ProjectIndexer::new("/path/to/project", code_embedder, docs_embedder).await?;
//! let stats = indexer.index().await?;
//!
//! println!("Indexed {} files, {} chunks", stats.files, stats.chunks);
//! # Ok(())
//! # }
//! ```

mod auto_reindex;
mod concurrency;
mod error;
mod fingerprints;
mod health;
mod index_state;
mod indexer;
mod integrity;
mod manager;
mod merkle;
mod metadata;
mod scanner;
mod stats;
mod watcher;
mod watermark_io;

pub use auto_reindex::{AutoReindexConfig, AutoReindexer};
pub use concurrency::{AsyncMutex, IndexingGuard, IndexingLock, ReadWriteLock};
pub use error::{IndexerError, Result};
pub use fingerprints::{FileDelta, FingerprintsStore};
pub use health::append_failure_reason;
pub use health::{
    health_file_path, read_health_snapshot, write_health_snapshot, HealthSnapshot, IndexingState,
};
pub use index_state::{
    assess_staleness, IndexSnapshot, IndexState, ReindexAttempt, ReindexResult, StaleAssessment,
    StaleReason, ToolMeta, Watermark, INDEX_STATE_SCHEMA_VERSION,
};
pub use indexer::{store_dir_for, ProjectIndexer};
pub use integrity::{check_drift, reconcile, spawn_startup_check, DriftReport};
pub use manager::{FusedHit, IndexManager, SearchMode, TableKind};
pub use merkle::{MerkleDiff, MerkleTree};
pub use metadata::{EmbeddingModelInfo, IndexMetadata, IndexStatsSnapshot, METADATA_SCHEMA_VERSION};
pub use scanner::FileScanner;
pub use stats::IndexStats;
pub use watcher::ProjectWatcher;
pub use watermark_io::{
    compute_project_watermark, index_watermark_path_for_store, read_index_watermark,
    write_index_watermark, PersistedIndexWatermark,
};

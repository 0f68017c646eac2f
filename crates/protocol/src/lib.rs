//! The core's language-neutral contract: the nine operations the CLI, an
//! RPC server, or a setup wizard would call, the `config.json` schema, and
//! the error taxonomy every operation reports through. `context_indexer`
//! and `context_search` provide the actual mechanics; [`local::LocalCore`]
//! is the thin wiring that makes this crate's trait concrete for a single
//! local project.

pub mod config;
pub mod error;
pub mod local;
pub mod models;
pub mod ops;
pub mod summary;

pub use config::{AutoReindexSettings, HybridSearchSettings, ProjectConfig, QueryExpansionSettings};
pub use error::{CoreError, CoreErrorKind, Result};
pub use local::LocalCore;
pub use models::{default_embedder_configs, resolve_model_dir};
pub use ops::{
    CoreOperations, DeleteIndexResult, GetConfigResult, IndexRunStats, IndexStatusResult, SearchResponse, SearchResultItem, SearchResultMetadata,
};
pub use summary::{ClassSummary, FileSummaryResult, FunctionSummary};

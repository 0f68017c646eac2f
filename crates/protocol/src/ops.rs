use crate::config::ProjectConfig;
use crate::error::Result;
use crate::summary::FileSummaryResult;
use async_trait::async_trait;
use context_indexer::SearchMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Stats returned by `createIndex`/`reindexProject`/`reindexFile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexRunStats {
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub chunks: usize,
    pub duration_ms: u64,
    pub device: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultMetadata {
    pub symbol: Option<String>,
    pub chunk_type: Option<String>,
    pub header_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub path: String,
    pub text: String,
    pub score: f32,
    pub start_line: usize,
    pub end_line: usize,
    pub metadata: Option<SearchResultMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total_results: usize,
    pub search_time_ms: u64,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatusResult {
    pub indexed: bool,
    pub code_chunks: usize,
    pub docs_chunks: usize,
    pub files_indexed: usize,
    pub storage_bytes: u64,
    pub project_root: String,
    pub store_dir: String,
    pub hybrid_search_enabled: bool,
    pub code_device: String,
    pub docs_device: String,
    pub compatibility_warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetConfigResult {
    pub config_path: String,
    pub config: ProjectConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteIndexResult {
    pub deleted: bool,
}

/// One async method per row of spec §6's operations table. Implemented by
/// composing `context_indexer::manager::IndexManager` (storage/search
/// orchestration) with `context_search::hybrid::HybridSearch` (ranking);
/// `LocalCore` in [`crate::local`] is the concrete wiring, `cli` the thin
/// caller.
#[async_trait]
pub trait CoreOperations: Send + Sync {
    async fn create_index(&self, project_path: &Path, confirmed: bool) -> Result<IndexRunStats>;

    async fn search_code(&self, query: &str, top_k: usize, mode: SearchMode, alpha: f32, compact: bool) -> Result<SearchResponse>;

    async fn search_docs(&self, query: &str, top_k: usize, mode: SearchMode, alpha: f32, compact: bool) -> Result<SearchResponse>;

    async fn search_by_path(&self, pattern: &str, limit: usize) -> Result<Vec<String>>;

    async fn get_index_status(&self) -> Result<IndexStatusResult>;

    async fn get_file_summary(&self, path: &str, include_complexity: bool, include_docstrings: bool) -> Result<FileSummaryResult>;

    async fn get_config(&self) -> Result<GetConfigResult>;

    async fn reindex_project(&self, confirmed: bool) -> Result<IndexRunStats>;

    async fn reindex_file(&self, path: &str) -> Result<IndexRunStats>;

    async fn delete_index(&self, confirmed: bool) -> Result<DeleteIndexResult>;
}

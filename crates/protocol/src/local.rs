use crate::config::{compile_path_glob, ProjectConfig};
use crate::error::{CoreError, CoreErrorKind, Result};
use crate::ops::{
    CoreOperations, DeleteIndexResult, GetConfigResult, IndexRunStats, IndexStatusResult, SearchResponse, SearchResultItem, SearchResultMetadata,
};
use crate::summary::{summarize_file, FileSummaryResult};
use async_trait::async_trait;
use context_fs::filter::FilterConfig;
use context_fs::project_id::find_project_root;
use context_indexer::{store_dir_for, IndexManager, SearchMode, TableKind};
use context_search::HybridSearch;
use context_vector_store::{Embedder, Purpose};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex as AsyncMutex;

/// Concrete, local (no RPC) implementation of [`CoreOperations`], composing
/// one project's [`IndexManager`] with a [`HybridSearch`] layered on top.
/// `cli` builds one of these per invocation and calls straight through.
pub struct LocalCore {
    project_root: PathBuf,
    store_dir: PathBuf,
    manager: Arc<IndexManager>,
    hybrid: AsyncMutex<HybridSearch>,
}

impl LocalCore {
    /// Resolves `path`'s project root (per spec §7's `PROJECT_NOT_DETECTED`
    /// walk), opens its `IndexManager` at the resolved state-root directory,
    /// and wires a [`HybridSearch`] on top.
    pub async fn open(path: &Path, code_embedder: Arc<Embedder>, docs_embedder: Arc<Embedder>) -> Result<Self> {
        let project_root = find_project_root(path).ok_or_else(|| CoreError::new(CoreErrorKind::ProjectNotDetected, "no project root detected from this path"))?;
        let store_dir = store_dir_for(&project_root)?;
        let manager = Arc::new(IndexManager::open(project_root.clone(), store_dir.clone(), code_embedder, docs_embedder).await?);
        let hybrid = AsyncMutex::new(HybridSearch::new(Arc::clone(&manager)));
        Ok(Self {
            project_root,
            store_dir,
            manager,
            hybrid,
        })
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    async fn config(&self) -> Result<ProjectConfig> {
        ProjectConfig::load_or_default(&self.store_dir).await
    }

    async fn scanned_file_count(&self) -> usize {
        let config = self.config().await.unwrap_or_default();
        let filter = config.filter_config();
        let Ok(scanner) = context_fs::scanner::FileScanner::new(&self.project_root, &filter, config.max_files.max(1)) else {
            return 0;
        };
        scanner.scan().accepted.len()
    }

    async fn run_stats(&self, files_scanned: usize, result: context_indexer::IndexStats) -> Result<IndexRunStats> {
        let device = self.manager.code_embedder().device().await?;
        let mut warnings = result.errors;
        let config = self.config().await.unwrap_or_default();
        if files_scanned > config.max_files {
            warnings.push(format!("scanned {files_scanned} files, exceeding configured maxFiles={}", config.max_files));
        }
        Ok(IndexRunStats {
            files_scanned,
            files_indexed: result.files,
            chunks: result.chunks,
            duration_ms: result.time_ms,
            device: device.as_str().to_string(),
            warnings,
        })
    }

    async fn run_hybrid_search(&self, kind: TableKind, query: &str, top_k: usize, compact: bool) -> Result<SearchResponse> {
        let started = Instant::now();
        let mut hybrid = self.hybrid.lock().await;
        let results = hybrid.search(kind, query, top_k).await?;
        drop(hybrid);
        Ok(to_search_response(results, started.elapsed().as_millis() as u64, None, compact))
    }

    /// Bypasses the classifier-driven hybrid pipeline for a caller-selected
    /// `mode`/`alpha` pair (vector-only or FTS-only): those modes don't
    /// benefit from query expansion or fuzzy fusion, so this talks to the
    /// manager directly rather than going through [`HybridSearch`].
    async fn run_raw_search(&self, kind: TableKind, query: &str, top_k: usize, mode: SearchMode, alpha: f32, compact: bool) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            return Err(CoreError::new(CoreErrorKind::InvalidPattern, "query must not be empty"));
        }
        let started = Instant::now();
        let embedder = match kind {
            TableKind::Code => self.manager.code_embedder(),
            TableKind::Docs => self.manager.docs_embedder(),
        };
        let query_vector = if matches!(mode, SearchMode::Hybrid | SearchMode::Vector) {
            embedder.embed(query, Purpose::Query).await.map_err(|e| {
                CoreError::new(CoreErrorKind::ModelUnavailable, "query embedding failed").with_detail(e.to_string())
            })?
        } else {
            Vec::new()
        };
        let (hits, warning) = self.manager.search(kind, query, &query_vector, top_k, mode, alpha).await?;
        let results = hits
            .into_iter()
            .map(|hit| context_search::SearchResult {
                file: hit.path,
                start_line: hit.start_line,
                end_line: hit.end_line,
                symbol: hit.symbol_name,
                symbol_type: hit.chunk_type,
                score: hit.score,
                content: hit.text,
            })
            .collect();
        Ok(to_search_response(results, started.elapsed().as_millis() as u64, warning, compact))
    }
}

fn to_search_response(results: Vec<context_search::SearchResult>, search_time_ms: u64, warning: Option<String>, compact: bool) -> SearchResponse {
    let total_results = results.len();
    let items = results
        .into_iter()
        .map(|r| SearchResultItem {
            path: r.file,
            text: if compact { truncate(&r.content, 280) } else { r.content },
            score: r.score,
            start_line: r.start_line,
            end_line: r.end_line,
            metadata: (!compact).then_some(SearchResultMetadata {
                symbol: r.symbol,
                chunk_type: r.symbol_type,
                header_path: None,
            }),
        })
        .collect();
    SearchResponse {
        results: items,
        total_results,
        search_time_ms,
        warning,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

#[async_trait]
impl CoreOperations for LocalCore {
    async fn create_index(&self, project_path: &Path, confirmed: bool) -> Result<IndexRunStats> {
        if !confirmed {
            return Err(CoreError::new(CoreErrorKind::ConfirmationRequired, "createIndex requires explicit confirmation"));
        }
        if project_path != self.project_root {
            log::warn!(
                "createIndex called with {} but this core was opened for {}",
                project_path.display(),
                self.project_root.display()
            );
        }
        let files_scanned = self.scanned_file_count().await;
        let stats = self.manager.full_index().await?;
        self.run_stats(files_scanned, stats).await
    }

    async fn search_code(&self, query: &str, top_k: usize, mode: SearchMode, alpha: f32, compact: bool) -> Result<SearchResponse> {
        match mode {
            SearchMode::Hybrid => self.run_hybrid_search(TableKind::Code, query, top_k, compact).await,
            _ => self.run_raw_search(TableKind::Code, query, top_k, mode, alpha, compact).await,
        }
    }

    async fn search_docs(&self, query: &str, top_k: usize, mode: SearchMode, alpha: f32, compact: bool) -> Result<SearchResponse> {
        match mode {
            SearchMode::Hybrid => self.run_hybrid_search(TableKind::Docs, query, top_k, compact).await,
            _ => self.run_raw_search(TableKind::Docs, query, top_k, mode, alpha, compact).await,
        }
    }

    async fn search_by_path(&self, pattern: &str, limit: usize) -> Result<Vec<String>> {
        let matcher = compile_path_glob(pattern)?;
        let config = self.config().await?;
        let filter = FilterConfig::default();
        let scanner = context_fs::scanner::FileScanner::new(&self.project_root, &filter, config.max_files.max(1))?;
        let report = scanner.scan();
        Ok(report
            .accepted
            .into_iter()
            .map(|f| f.relative_path)
            .filter(|rel| matcher.is_match(rel))
            .take(limit)
            .collect())
    }

    async fn get_index_status(&self) -> Result<IndexStatusResult> {
        let code_chunks = self.manager.all_rows(TableKind::Code).await.len();
        let docs_chunks = self.manager.all_rows(TableKind::Docs).await.len();
        let config = self.config().await.unwrap_or_default();
        let storage_bytes = directory_size(&self.store_dir);
        let code_device = self.manager.code_embedder().device().await?;
        let docs_device = self.manager.docs_embedder().device().await?;

        let mut compatibility_warnings = Vec::new();
        if let Some(metadata) = read_metadata_file(&self.store_dir).await {
            let current_code = (self.manager.code_embedder().model_id(), self.manager.code_embedder().dimension());
            let current_docs = (self.manager.docs_embedder().model_id(), self.manager.docs_embedder().dimension());
            if metadata.code_model.model_id != current_code.0 || metadata.code_model.dimension != current_code.1 {
                compatibility_warnings.push(format!(
                    "code table built with {} ({}d), current pipeline is {} ({}d); run reindexProject",
                    metadata.code_model.model_id, metadata.code_model.dimension, current_code.0, current_code.1
                ));
            }
            if metadata.docs_model.model_id != current_docs.0 || metadata.docs_model.dimension != current_docs.1 {
                compatibility_warnings.push(format!(
                    "docs table built with {} ({}d), current pipeline is {} ({}d); run reindexProject",
                    metadata.docs_model.model_id, metadata.docs_model.dimension, current_docs.0, current_docs.1
                ));
            }
        }

        Ok(IndexStatusResult {
            indexed: code_chunks > 0 || docs_chunks > 0,
            code_chunks,
            docs_chunks,
            files_indexed: self.scanned_file_count().await,
            storage_bytes,
            project_root: self.project_root.display().to_string(),
            store_dir: self.store_dir.display().to_string(),
            hybrid_search_enabled: config.hybrid_search.enabled,
            code_device: code_device.as_str().to_string(),
            docs_device: docs_device.as_str().to_string(),
            compatibility_warnings,
        })
    }

    async fn get_file_summary(&self, path: &str, include_complexity: bool, include_docstrings: bool) -> Result<FileSummaryResult> {
        summarize_file(&self.project_root, path, include_complexity, include_docstrings).await
    }

    async fn get_config(&self) -> Result<GetConfigResult> {
        let config = self.config().await?;
        Ok(GetConfigResult {
            config_path: ProjectConfig::config_path(&self.store_dir).display().to_string(),
            config,
        })
    }

    async fn reindex_project(&self, confirmed: bool) -> Result<IndexRunStats> {
        if !confirmed {
            return Err(CoreError::new(CoreErrorKind::ConfirmationRequired, "reindexProject requires explicit confirmation"));
        }
        let files_scanned = self.scanned_file_count().await;
        let stats = self.manager.full_index().await?;
        self.run_stats(files_scanned, stats).await
    }

    async fn reindex_file(&self, path: &str) -> Result<IndexRunStats> {
        let absolute = self.project_root.join(path);
        if tokio::fs::metadata(&absolute).await.is_err() {
            return Err(CoreError::new(CoreErrorKind::FileNotFound, format!("{path} not found under project root")));
        }
        let started = Instant::now();
        self.manager.reindex_file(path).await?;
        let device = self.manager.code_embedder().device().await?;
        Ok(IndexRunStats {
            files_scanned: 1,
            files_indexed: 1,
            chunks: 0,
            duration_ms: started.elapsed().as_millis() as u64,
            device: device.as_str().to_string(),
            warnings: Vec::new(),
        })
    }

    async fn delete_index(&self, confirmed: bool) -> Result<DeleteIndexResult> {
        if !confirmed {
            return Err(CoreError::new(CoreErrorKind::ConfirmationRequired, "deleteIndex requires explicit confirmation"));
        }
        match tokio::fs::remove_dir_all(&self.store_dir).await {
            Ok(()) => Ok(DeleteIndexResult { deleted: true }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(DeleteIndexResult { deleted: false }),
            Err(err) => Err(err.into()),
        }
    }
}

async fn read_metadata_file(store_dir: &Path) -> Option<context_indexer::IndexMetadata> {
    let bytes = tokio::fs::read(store_dir.join("metadata.json")).await.ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn directory_size(dir: &Path) -> u64 {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

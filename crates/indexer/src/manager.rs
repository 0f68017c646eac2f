use crate::concurrency::IndexingLock;
use crate::error::{IndexerError, Result};
use crate::fingerprints::{FileDelta, FingerprintsStore};
use crate::health::{self, IndexingState};
use crate::merkle::MerkleTree;
use crate::metadata::{self, EmbeddingModelInfo, IndexMetadata, IndexStatsSnapshot};
use crate::scanner::FileScanner;
use crate::stats::IndexStats;
use context_code_chunker::{Chunker, ChunkerConfig, CodeChunk};
use context_fs::filter::FilterConfig;
use context_fts::{open_fts_engine, normalize_scores, EngineChoice, FtsEngine, FtsHit};
use context_vector_store::{Embedder, Purpose, SearchHit, VectorRow, VectorStore};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex as AsyncMutexTokio;

const MAX_BATCH_SIZE: usize = 50;
const ADAPTIVE_BATCH_SIZE: usize = 3;
const RRF_K: f32 = 60.0;
const DOC_EXTENSIONS: &[&str] = &["md", "mdx", "rst", "txt", "adoc"];

/// Below this many previously-seen chunks for a file, the cost of diffing
/// and retagging isn't worth it; just delete and reinsert.
const MIN_CHUNKS_FOR_INCREMENTAL: usize = 3;
/// Incremental reindex is only taken when it re-embeds at most this
/// fraction of the file's chunks; otherwise fall back to full reinsert.
const INCREMENTAL_SAVINGS_THRESHOLD: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Hybrid,
    Vector,
    Fts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Code,
    Docs,
}

#[derive(Debug, Clone)]
pub struct FusedHit {
    pub id: String,
    pub path: String,
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
    pub chunk_type: Option<String>,
    pub symbol_name: Option<String>,
    pub score: f32,
}

/// Owns both per-kind vector stores and FTS engines, the fingerprints map,
/// the Merkle tree, the persisted index metadata, and the project-wide
/// indexing lock. The one entry point other crates use to keep an index in
/// sync with the filesystem and to run raw (unranked) retrieval against it.
pub struct IndexManager {
    root: PathBuf,
    store_dir: PathBuf,
    code_store: VectorStore,
    docs_store: VectorStore,
    code_fts: AsyncMutexTokio<Box<dyn FtsEngine>>,
    docs_fts: AsyncMutexTokio<Box<dyn FtsEngine>>,
    fingerprints: AsyncMutexTokio<FingerprintsStore>,
    merkle: AsyncMutexTokio<MerkleTree>,
    metadata: AsyncMutexTokio<Option<IndexMetadata>>,
    code_embedder: Arc<Embedder>,
    docs_embedder: Arc<Embedder>,
    chunker: Chunker,
    lock: IndexingLock,
}

impl IndexManager {
    pub async fn open(
        root: PathBuf,
        store_dir: PathBuf,
        code_embedder: Arc<Embedder>,
        docs_embedder: Arc<Embedder>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&store_dir)?;
        let code_store = VectorStore::open(store_dir.join("code"), code_embedder.dimension()).await?;
        let docs_store = VectorStore::open(store_dir.join("docs"), docs_embedder.dimension()).await?;

        let fingerprints_path = store_dir.join("fingerprints.json");
        let fingerprints = FingerprintsStore::load(&fingerprints_path).await?;

        let file_count = code_store.len().await + docs_store.len().await;
        let code_fts = open_fts_engine(EngineChoice::Auto, file_count, &store_dir.join("code-fts"))?;
        let docs_fts = open_fts_engine(EngineChoice::Auto, file_count, &store_dir.join("docs-fts"))?;

        let metadata = metadata::read_metadata(&store_dir).await?;

        Ok(Self {
            lock: IndexingLock::for_project(&root),
            root,
            store_dir,
            code_store,
            docs_store,
            code_fts: AsyncMutexTokio::new(code_fts),
            docs_fts: AsyncMutexTokio::new(docs_fts),
            fingerprints: AsyncMutexTokio::new(fingerprints),
            merkle: AsyncMutexTokio::new(MerkleTree::new()),
            metadata: AsyncMutexTokio::new(metadata),
            code_embedder,
            docs_embedder,
            chunker: Chunker::new(ChunkerConfig::default()),
        })
    }

    fn fingerprints_path(&self) -> PathBuf {
        self.store_dir.join("fingerprints.json")
    }

    fn table_for(relative_path: &str) -> TableKind {
        let ext = Path::new(relative_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        if DOC_EXTENSIONS.contains(&ext.as_str()) {
            TableKind::Docs
        } else {
            TableKind::Code
        }
    }

    fn store_fts_embedder(
        &self,
        kind: TableKind,
    ) -> (&VectorStore, &AsyncMutexTokio<Box<dyn FtsEngine>>, &Arc<Embedder>) {
        match kind {
            TableKind::Code => (&self.code_store, &self.code_fts, &self.code_embedder),
            TableKind::Docs => (&self.docs_store, &self.docs_fts, &self.docs_embedder),
        }
    }

    fn model_info(&self, kind: TableKind) -> EmbeddingModelInfo {
        let embedder = match kind {
            TableKind::Code => &self.code_embedder,
            TableKind::Docs => &self.docs_embedder,
        };
        EmbeddingModelInfo {
            model_id: embedder.model_id().to_string(),
            dimension: embedder.dimension(),
        }
    }

    /// Full scan + (re)embed of every file under the project root. Batches
    /// of up to [`MAX_BATCH_SIZE`] files; callers under memory pressure
    /// should instead drive [`Self::reindex_file`] per file in
    /// [`ADAPTIVE_BATCH_SIZE`]-sized micro-batches.
    pub async fn full_index(&self) -> Result<IndexStats> {
        let Some(_guard) = self.lock.try_acquire() else {
            return Err(IndexerError::Other("index run already in progress".into()));
        };
        let started = Instant::now();
        let mut stats = IndexStats::new();

        let filter = FilterConfig::default();
        let scanner = FileScanner::with_config(self.root.clone(), filter);
        let files = scanner.scan();

        for batch in files.chunks(MAX_BATCH_SIZE) {
            if let Err(e) = self.index_batch(batch, &mut stats).await {
                stats.add_error(e.to_string());
            }
        }

        self.persist_fingerprints().await?;
        self.code_store.ensure_ann_index().await?;
        self.docs_store.ensure_ann_index().await?;

        stats.time_ms = started.elapsed().as_millis() as u64;
        let snapshot_dir = self.store_dir.clone();
        let mut snapshot = health::read_health_snapshot(&snapshot_dir).await.unwrap_or_default();
        if stats.errors.is_empty() {
            snapshot.record_success(stats.time_ms);
        } else {
            snapshot.state = IndexingState::Idle;
            snapshot.last_duration_ms = Some(stats.time_ms);
        }
        health::write_health_snapshot(&snapshot_dir, &snapshot).await?;

        self.record_metadata(&stats).await?;
        Ok(stats)
    }

    /// Writes (or refreshes) `metadata.json` with the current model/dimension
    /// pair for both tables. Called after a run completes so a later
    /// `reindexProject` clears any previously recorded mismatch.
    async fn record_metadata(&self, stats: &IndexStats) -> Result<()> {
        let device = self.code_embedder.device().await?;
        let snapshot = IndexStatsSnapshot {
            code_chunks: self.code_store.len().await,
            docs_chunks: self.docs_store.len().await,
            files_indexed: stats.files,
        };
        let mut guard = self.metadata.lock().await;
        let mut current = guard.take().unwrap_or_else(|| {
            IndexMetadata::new(self.model_info(TableKind::Code), self.model_info(TableKind::Docs), device)
        });
        current.code_model = self.model_info(TableKind::Code);
        current.docs_model = self.model_info(TableKind::Docs);
        current.touch(snapshot);
        metadata::write_metadata(&self.store_dir, &current).await?;
        *guard = Some(current);
        Ok(())
    }

    async fn index_batch(&self, paths: &[PathBuf], stats: &mut IndexStats) -> Result<()> {
        for absolute in paths {
            let relative = pathdiff(&self.root, absolute);
            if let Err(e) = self.reindex_file_at(&relative, absolute).await {
                stats.add_error(format!("{relative}: {e}"));
                continue;
            }
            stats.files += 1;
        }
        Ok(())
    }

    /// Reindex a single file, resolving its absolute path from the project
    /// root.
    pub async fn reindex_file(&self, relative_path: &str) -> Result<()> {
        let absolute = self.root.join(relative_path);
        self.reindex_file_at(relative_path, &absolute).await
    }

    async fn reindex_file_at(&self, relative_path: &str, absolute: &Path) -> Result<()> {
        let bytes = tokio::fs::read(absolute).await?;
        let content_hash = context_fs::hash::content_hash(&bytes);

        {
            let mut fingerprints = self.fingerprints.lock().await;
            if fingerprints.get(relative_path) == Some(content_hash.as_str()) {
                return Ok(());
            }
            fingerprints.set(relative_path.to_string(), content_hash.clone());
        }

        let text = String::from_utf8_lossy(&bytes).to_string();
        let chunks = self.chunker.chunk_str(&text, Some(relative_path))?;
        let kind = Self::table_for(relative_path);
        let (store, fts, embedder) = self.store_fts_embedder(kind);

        let previous_hashes: Vec<String> = {
            let merkle = self.merkle.lock().await;
            merkle.chunk_hashes(relative_path).map(<[String]>::to_vec).unwrap_or_default()
        };

        if use_incremental(&previous_hashes, &chunks) {
            self.reindex_incremental(store, embedder, &chunks, &previous_hashes, relative_path, &content_hash)
                .await?;
        } else {
            reindex_full_reinsert(store, embedder, relative_path, &chunks, &content_hash).await?;
        }

        fts.lock().await.remove_by_path(relative_path).await?;
        fts.lock().await.add_chunks(&chunks).await?;

        self.merkle.lock().await.set_file_chunks(relative_path.to_string(), &chunks);
        Ok(())
    }

    /// Retags chunks whose hash already existed (content unchanged, position
    /// possibly different), embeds only newly-seen chunks, and deletes rows
    /// for hashes that disappeared. Mirrors what [`MerkleTree::diff`] computes
    /// for a single file without building a second tree just to call it.
    async fn reindex_incremental(
        &self,
        store: &VectorStore,
        embedder: &Arc<Embedder>,
        chunks: &[CodeChunk],
        previous_hashes: &[String],
        relative_path: &str,
        content_hash: &str,
    ) -> Result<()> {
        let previous: HashSet<&str> = previous_hashes.iter().map(String::as_str).collect();
        let current: HashSet<&str> = chunks.iter().map(|c| c.chunk_hash.as_str()).collect();

        let moved: Vec<VectorRow> = chunks
            .iter()
            .filter(|c| previous.contains(c.chunk_hash.as_str()))
            .map(|c| VectorRow::from_chunk(c, Vec::new(), content_hash.to_string()))
            .collect();
        if !moved.is_empty() {
            store.update_positions(&moved).await?;
        }

        let added: Vec<&CodeChunk> = chunks.iter().filter(|c| !previous.contains(c.chunk_hash.as_str())).collect();
        if !added.is_empty() {
            let texts: Vec<String> = added.iter().map(|c| c.content.clone()).collect();
            let vectors = embedder.embed_batch(&texts, Purpose::Document).await?;
            let rows: Vec<VectorRow> = added
                .iter()
                .zip(vectors.into_iter())
                .map(|(chunk, vector)| VectorRow::from_chunk(chunk, vector, content_hash.to_string()))
                .collect();
            store.insert_batch(rows).await?;
        }

        let removed_hashes: HashSet<&str> =
            previous_hashes.iter().map(String::as_str).filter(|h| !current.contains(h)).collect();
        if !removed_hashes.is_empty() {
            let all = store.all_chunks().await;
            let stale_ids: Vec<String> = all
                .into_iter()
                .filter(|row| row.path == relative_path && removed_hashes.contains(row.chunk_hash.as_str()))
                .map(|row| row.id)
                .collect();
            if !stale_ids.is_empty() {
                store.delete_by_ids(&stale_ids).await?;
            }
        }
        Ok(())
    }

    pub async fn delete_file(&self, relative_path: &str) -> Result<()> {
        self.code_store.delete_by_path(relative_path).await?;
        self.docs_store.delete_by_path(relative_path).await?;
        self.code_fts.lock().await.remove_by_path(relative_path).await?;
        self.docs_fts.lock().await.remove_by_path(relative_path).await?;
        self.fingerprints.lock().await.remove(relative_path);
        self.merkle.lock().await.remove_file(relative_path);
        Ok(())
    }

    pub async fn apply_delta(&self, delta: FileDelta) -> Result<IndexStats> {
        let mut stats = IndexStats::new();
        for relative in &delta.removed {
            if let Err(e) = self.delete_file(relative).await {
                stats.add_error(format!("{relative}: {e}"));
            }
        }
        for relative in delta.added.iter().chain(delta.modified.iter()) {
            if let Err(e) = self.reindex_file(relative).await {
                stats.add_error(format!("{relative}: {e}"));
            } else {
                stats.files += 1;
            }
        }
        self.persist_fingerprints().await?;
        self.record_metadata(&stats).await?;
        Ok(stats)
    }

    async fn persist_fingerprints(&self) -> Result<()> {
        self.fingerprints.lock().await.save(&self.fingerprints_path()).await
    }

    /// Checks the recorded model/dimension for `kind` against the embedder
    /// currently configured for it. A fresh index (no metadata yet written)
    /// has nothing to compare against and always passes.
    async fn check_compatibility(&self, kind: TableKind) -> Result<()> {
        let guard = self.metadata.lock().await;
        let Some(metadata) = guard.as_ref() else {
            return Ok(());
        };
        let current = self.model_info(kind);
        let recorded = match kind {
            TableKind::Code => &metadata.code_model,
            TableKind::Docs => &metadata.docs_model,
        };
        if recorded != &current {
            return Err(IndexerError::ModelMismatch {
                recorded: format!("{} ({}d)", recorded.model_id, recorded.dimension),
                current: format!("{} ({}d)", current.model_id, current.dimension),
            });
        }
        Ok(())
    }

    async fn in_progress_warning(&self) -> Option<String> {
        let snapshot = health::read_health_snapshot(&self.store_dir).await.ok()?;
        matches!(snapshot.state, IndexingState::InProgress)
            .then(|| "index is being rebuilt; results may be stale".to_string())
    }

    /// Runs a search against one table and returns the fused hits together
    /// with an optional advisory warning (e.g. an index rebuild is running).
    /// Fails with [`IndexerError::ModelMismatch`] if the table was built with
    /// a different embedding model than is currently configured — the caller
    /// should surface this as "reindex required".
    pub async fn search(
        &self,
        kind: TableKind,
        query_text: &str,
        query_vector: &[f32],
        top_k: usize,
        mode: SearchMode,
        alpha: f32,
    ) -> Result<(Vec<FusedHit>, Option<String>)> {
        self.check_compatibility(kind).await?;
        let warning = self.in_progress_warning().await;

        let top_k = top_k.clamp(1, 50);
        let alpha = alpha.clamp(0.0, 1.0);
        let (vector_store, fts, _embedder) = self.store_fts_embedder(kind);

        let vector_hits: Vec<SearchHit> = if matches!(mode, SearchMode::Hybrid | SearchMode::Vector) {
            vector_store.search(query_vector, top_k * 2).await?
        } else {
            Vec::new()
        };

        let mut fts_hits: Vec<FtsHit> = if matches!(mode, SearchMode::Hybrid | SearchMode::Fts) {
            fts.lock().await.search(query_text, top_k * 2).await?
        } else {
            Vec::new()
        };
        normalize_scores(&mut fts_hits);

        let fused = match mode {
            SearchMode::Vector => vector_hits.into_iter().map(fused_from_hit).collect(),
            SearchMode::Fts => {
                let rows = vector_store.all_chunks().await;
                fts_hits
                    .into_iter()
                    .filter_map(|hit| rows.iter().find(|r| r.id == hit.id).map(|row| fused_from_row(row, hit.score)))
                    .collect()
            }
            SearchMode::Hybrid => rrf_fuse(&vector_hits, &fts_hits, alpha),
        };

        let mut fused = fused;
        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        fused.truncate(top_k);
        Ok((fused, warning))
    }

    /// Every row currently stored for `kind`. Used by search-layer ranking
    /// that needs the full row (path, tags, docstring presence) rather than
    /// just the id/score pairs `search` returns.
    pub async fn all_rows(&self, kind: TableKind) -> Vec<VectorRow> {
        match kind {
            TableKind::Code => self.code_store.all_chunks().await,
            TableKind::Docs => self.docs_store.all_chunks().await,
        }
    }

    #[must_use]
    pub fn code_embedder(&self) -> &Arc<Embedder> {
        &self.code_embedder
    }

    #[must_use]
    pub fn docs_embedder(&self) -> &Arc<Embedder> {
        &self.docs_embedder
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Rescans the project tree and diffs freshly hashed bytes against the
    /// persisted fingerprints, without mutating any store.
    pub async fn compute_delta(&self) -> Result<FileDelta> {
        let filter = FilterConfig::default();
        let scanner = FileScanner::with_config(self.root.clone(), filter);
        let current: Vec<(String, PathBuf)> = scanner
            .scan()
            .into_iter()
            .map(|absolute| {
                let relative = pathdiff(&self.root, &absolute);
                (relative, absolute)
            })
            .collect();
        let fingerprints = self.fingerprints.lock().await;
        fingerprints.delta(&current).await
    }
}

/// True when at least [`MIN_CHUNKS_FOR_INCREMENTAL`] chunks already existed
/// for this file and re-embedding only the added chunks would cost at most
/// `1 - INCREMENTAL_SAVINGS_THRESHOLD` of a full reinsert.
fn use_incremental(previous_hashes: &[String], chunks: &[CodeChunk]) -> bool {
    if previous_hashes.len() < MIN_CHUNKS_FOR_INCREMENTAL || chunks.is_empty() {
        return false;
    }
    let previous: HashSet<&str> = previous_hashes.iter().map(String::as_str).collect();
    let added = chunks.iter().filter(|c| !previous.contains(c.chunk_hash.as_str())).count();
    let saved_ratio = 1.0 - (added as f32 / chunks.len() as f32);
    saved_ratio >= INCREMENTAL_SAVINGS_THRESHOLD
}

async fn reindex_full_reinsert(
    store: &VectorStore,
    embedder: &Arc<Embedder>,
    relative_path: &str,
    chunks: &[CodeChunk],
    content_hash: &str,
) -> Result<()> {
    store.delete_by_path(relative_path).await?;
    if chunks.is_empty() {
        return Ok(());
    }
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embedder.embed_batch(&texts, Purpose::Document).await?;
    let rows: Vec<VectorRow> = chunks
        .iter()
        .zip(vectors.into_iter())
        .map(|(chunk, vector)| VectorRow::from_chunk(chunk, vector, content_hash.to_string()))
        .collect();
    store.insert_batch(rows).await?;
    Ok(())
}

fn fused_from_hit(hit: SearchHit) -> FusedHit {
    FusedHit {
        id: hit.row.id,
        path: hit.row.path,
        text: hit.row.text,
        start_line: hit.row.start_line,
        end_line: hit.row.end_line,
        chunk_type: hit.row.chunk_type,
        symbol_name: hit.row.symbol_name,
        score: 1.0 / (1.0 + hit.distance),
    }
}

fn fused_from_row(row: &VectorRow, score: f32) -> FusedHit {
    FusedHit {
        id: row.id.clone(),
        path: row.path.clone(),
        text: row.text.clone(),
        start_line: row.start_line,
        end_line: row.end_line,
        chunk_type: row.chunk_type.clone(),
        symbol_name: row.symbol_name.clone(),
        score,
    }
}

/// Reciprocal-rank fusion: `score(d) = alpha / (k + rank_vec(d)) + (1-alpha) / (k + rank_fts(d))`.
/// A document missing from one ranking contributes zero for that term rather
/// than an infinite rank.
fn rrf_fuse(vector_hits: &[SearchHit], fts_hits: &[FtsHit], alpha: f32) -> Vec<FusedHit> {
    use std::collections::HashMap;

    let mut by_id: HashMap<String, FusedHit> = HashMap::new();
    for (rank, hit) in vector_hits.iter().enumerate() {
        let contribution = alpha / (RRF_K + rank as f32 + 1.0);
        by_id
            .entry(hit.row.id.clone())
            .and_modify(|f| f.score += contribution)
            .or_insert_with(|| {
                let mut fused = fused_from_hit(hit.clone());
                fused.score = contribution;
                fused
            });
    }
    for (rank, hit) in fts_hits.iter().enumerate() {
        let contribution = (1.0 - alpha) / (RRF_K + rank as f32 + 1.0);
        by_id.entry(hit.id.clone()).and_modify(|f| f.score += contribution).or_insert_with(|| FusedHit {
            id: hit.id.clone(),
            path: String::new(),
            text: String::new(),
            start_line: 0,
            end_line: 0,
            chunk_type: None,
            symbol_name: None,
            score: contribution,
        });
    }
    by_id.into_values().collect()
}

fn pathdiff(root: &Path, absolute: &Path) -> String {
    absolute
        .strip_prefix(root)
        .unwrap_or(absolute)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_vector_store::VectorRow as Row;

    fn hit(id: &str, distance: f32) -> SearchHit {
        SearchHit {
            row: Row {
                id: id.to_string(),
                path: "a.rs".into(),
                text: String::new(),
                vector: vec![],
                start_line: 1,
                end_line: 1,
                content_hash: String::new(),
                chunk_hash: String::new(),
                chunk_type: None,
                symbol_name: None,
                has_documentation: false,
                tags: Vec::new(),
            },
            distance,
        }
    }

    #[test]
    fn rrf_prefers_document_ranked_highly_in_both_lists() {
        let vector_hits = vec![hit("a", 0.1), hit("b", 0.2)];
        let fts_hits = vec![
            FtsHit { id: "a".into(), score: 1.0 },
            FtsHit { id: "c".into(), score: 0.9 },
        ];
        let fused = rrf_fuse(&vector_hits, &fts_hits, 0.5);
        let top = fused.iter().max_by(|x, y| x.score.partial_cmp(&y.score).unwrap()).unwrap();
        assert_eq!(top.id, "a");
    }

    fn chunk_with_hash(path: &str, content: &str, hash: &str) -> CodeChunk {
        let mut c = CodeChunk::new(path.to_string(), 1, 1, content.to_string(), Default::default());
        c.chunk_hash = hash.to_string();
        c
    }

    #[test]
    fn incremental_path_requires_minimum_chunk_count() {
        let previous = vec!["h1".to_string(), "h2".to_string()];
        let chunks = vec![chunk_with_hash("a.rs", "one", "h1"), chunk_with_hash("a.rs", "two", "h2")];
        assert!(!use_incremental(&previous, &chunks));
    }

    #[test]
    fn incremental_path_requires_enough_savings() {
        let previous = vec!["h1".to_string(), "h2".to_string(), "h3".to_string()];
        let chunks = vec![
            chunk_with_hash("a.rs", "one", "h1-new"),
            chunk_with_hash("a.rs", "two", "h2-new"),
            chunk_with_hash("a.rs", "three", "h3-new"),
        ];
        assert!(!use_incremental(&previous, &chunks));
    }

    #[test]
    fn incremental_path_taken_when_most_chunks_survive() {
        let previous = vec!["h1".to_string(), "h2".to_string(), "h3".to_string(), "h4".to_string()];
        let chunks = vec![
            chunk_with_hash("a.rs", "one", "h1"),
            chunk_with_hash("a.rs", "two", "h2"),
            chunk_with_hash("a.rs", "three", "h3"),
            chunk_with_hash("a.rs", "four-new", "h4-new"),
        ];
        assert!(use_incremental(&previous, &chunks));
    }
}

use crate::error::{Result, VectorStoreError};
use context_code_chunker::CodeChunk;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Chunk-count threshold past which an ANN index is built.
pub const ANN_THRESHOLD: usize = 10_000;
const LOCK_FILE: &str = ".lock";
const DATA_FILE: &str = "vectors.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VectorRow {
    pub id: String,
    pub path: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub start_line: usize,
    pub end_line: usize,
    pub content_hash: String,
    pub chunk_hash: String,
    pub chunk_type: Option<String>,
    pub symbol_name: Option<String>,
    #[serde(default)]
    pub has_documentation: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl VectorRow {
    #[must_use]
    pub fn from_chunk(chunk: &CodeChunk, vector: Vec<f32>, content_hash: String) -> Self {
        Self {
            id: chunk.id.clone(),
            path: chunk.file_path.clone(),
            text: chunk.content.clone(),
            vector,
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            content_hash,
            chunk_hash: chunk.chunk_hash.clone(),
            chunk_type: chunk.metadata.chunk_type.map(|c| c.as_str().to_string()),
            symbol_name: chunk.metadata.symbol_name.clone(),
            has_documentation: chunk.metadata.documentation.is_some(),
            tags: chunk.metadata.tags.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub row: VectorRow,
    pub distance: f32,
}

/// Coarse IVF-style partitioning: a handful of centroids chosen once the
/// chunk count crosses [`ANN_THRESHOLD`]. `search` only scans the
/// `n_probe` nearest partitions instead of every row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnIndex {
    pub num_partitions: usize,
    pub num_sub_vectors: usize,
    centroids: Vec<Vec<f32>>,
    assignments: HashMap<String, usize>,
}

#[derive(Default, Serialize, Deserialize)]
struct TableState {
    dimension: usize,
    rows: Vec<VectorRow>,
    ann: Option<AnnIndex>,
}

/// Per-table (code or docs) columnar vector store. One instance wraps one
/// on-disk directory; reads may run concurrently, writes are exclusive —
/// enforced by wrapping the whole table in a `tokio::sync::RwLock`, whose
/// writer-waits-for-readers semantics match the contract directly.
pub struct VectorStore {
    dir: PathBuf,
    dimension: usize,
    state: RwLock<TableState>,
}

impl VectorStore {
    pub async fn open(dir: impl AsRef<Path>, dimension: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        recover_stale_lock(&dir)?;
        acquire_lock(&dir)?;

        let state = load_state(&dir, dimension)?;
        Ok(Self {
            dir,
            dimension,
            state: RwLock::new(state),
        })
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Idempotent on id collision (delete-then-insert); rejects any row
    /// carrying a zero vector or a vector of the wrong dimension.
    pub async fn insert_batch(&self, rows: Vec<VectorRow>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        for row in &rows {
            if row.vector.len() != self.dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual: row.vector.len(),
                });
            }
            if row.vector.iter().all(|v| *v == 0.0) {
                return Err(VectorStoreError::InvalidInsert(format!(
                    "zero vector rejected for chunk {}",
                    row.id
                )));
            }
        }

        let mut state = self.state.write().await;
        let ids: std::collections::HashSet<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        state.rows.retain(|r| !ids.contains(r.id.as_str()));
        state.rows.extend(rows);
        self.persist(&state)
    }

    /// Updates id/line-span/content-hash for rows matching on `(path,
    /// chunk_hash)`, without touching the stored vector. Used for chunks that
    /// moved position within the same file but whose content — and
    /// therefore embedding — is unchanged. Matching on path too avoids
    /// retagging an unrelated row in a different file that happens to share
    /// a chunk hash. Returns the number of rows actually retagged.
    pub async fn update_positions(&self, moved: &[VectorRow]) -> Result<usize> {
        if moved.is_empty() {
            return Ok(0);
        }
        let mut state = self.state.write().await;
        let mut updated = 0;
        for replacement in moved {
            if let Some(row) = state
                .rows
                .iter_mut()
                .find(|r| r.chunk_hash == replacement.chunk_hash && r.path == replacement.path)
            {
                row.id = replacement.id.clone();
                row.path = replacement.path.clone();
                row.start_line = replacement.start_line;
                row.end_line = replacement.end_line;
                row.content_hash = replacement.content_hash.clone();
                row.chunk_type = replacement.chunk_type.clone();
                row.symbol_name = replacement.symbol_name.clone();
                row.has_documentation = replacement.has_documentation;
                row.tags = replacement.tags.clone();
                updated += 1;
            }
        }
        self.persist(&state)?;
        Ok(updated)
    }

    pub async fn delete_by_path(&self, path: &str) -> Result<usize> {
        let mut state = self.state.write().await;
        let before = state.rows.len();
        state.rows.retain(|r| r.path != path);
        let removed = before - state.rows.len();
        self.persist(&state)?;
        Ok(removed)
    }

    /// Ids must look like the stable-chunk-id's hyphenated hex shape;
    /// anything else is logged and skipped rather than erroring the batch.
    pub async fn delete_by_ids(&self, ids: &[String]) -> Result<usize> {
        let valid: Vec<&String> = ids.iter().filter(|id| looks_like_chunk_id(id)).collect();
        for id in ids {
            if !looks_like_chunk_id(id) {
                log::warn!("delete_by_ids: skipping malformed id {id}");
            }
        }
        let mut state = self.state.write().await;
        let before = state.rows.len();
        let valid_set: std::collections::HashSet<&str> = valid.iter().map(|s| s.as_str()).collect();
        state.rows.retain(|r| !valid_set.contains(r.id.as_str()));
        let removed = before - state.rows.len();
        self.persist(&state)?;
        Ok(removed)
    }

    /// `top_k` is clamped to `[1, 100]`. Uses the ANN index when present,
    /// otherwise brute force over every row.
    pub async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let top_k = top_k.clamp(1, 100);
        let state = self.state.read().await;
        if query_vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }

        let candidates: Vec<&VectorRow> = match &state.ann {
            Some(ann) => ann.candidate_rows(&state.rows, query_vector),
            None => state.rows.iter().collect(),
        };

        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .map(|row| SearchHit {
                row: row.clone(),
                distance: l2_distance(&row.vector, query_vector),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    /// Translates a glob into a conservative substring/prefix match; strips
    /// characters that would matter if this were ever backed by a SQL LIKE
    /// clause (quotes, semicolons, comment sequences, null bytes).
    pub async fn search_by_path(&self, glob_pattern: &str, limit: usize) -> Result<Vec<String>> {
        let pattern = sanitize_like_pattern(glob_pattern);
        let matcher = globset::Glob::new(&pattern)
            .map_err(|e| VectorStoreError::Other(format!("invalid glob: {e}")))?
            .compile_matcher();

        let state = self.state.read().await;
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for row in &state.rows {
            if matcher.is_match(&row.path) && seen.insert(row.path.clone()) {
                out.push(row.path.clone());
                if out.len() >= limit {
                    break;
                }
            }
        }
        Ok(out)
    }

    pub async fn all_chunks(&self) -> Vec<VectorRow> {
        self.state.read().await.rows.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    /// Builds (or rebuilds) the IVF index once chunk count crosses
    /// [`ANN_THRESHOLD`]. Logs and leaves the store on brute force if the
    /// build fails for any reason.
    pub async fn ensure_ann_index(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if state.rows.len() < ANN_THRESHOLD {
            return Ok(());
        }
        match build_ann_index(&state.rows, self.dimension) {
            Ok(ann) => {
                log::info!(
                    "built ANN index: {} partitions, {} sub-vectors over {} rows",
                    ann.num_partitions,
                    ann.num_sub_vectors,
                    state.rows.len()
                );
                state.ann = Some(ann);
                self.persist(&state)
            }
            Err(e) => {
                log::warn!("ANN index build failed ({e}), continuing with brute force");
                Ok(())
            }
        }
    }

    fn persist(&self, state: &TableState) -> Result<()> {
        let tmp = self.dir.join(format!("{DATA_FILE}.tmp"));
        let final_path = self.dir.join(DATA_FILE);
        let bytes = serde_json::to_vec(state)?;
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &final_path)?;
        Ok(())
    }
}

impl Drop for VectorStore {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(self.dir.join(LOCK_FILE));
    }
}

impl AnnIndex {
    fn candidate_rows<'a>(&self, rows: &'a [VectorRow], query: &[f32]) -> Vec<&'a VectorRow> {
        const N_PROBE: usize = 4;
        let mut ranked: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (i, l2_distance(c, query)))
            .collect();
        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let probe: std::collections::HashSet<usize> =
            ranked.into_iter().take(N_PROBE).map(|(i, _)| i).collect();

        rows.iter()
            .filter(|r| self.assignments.get(&r.id).is_some_and(|p| probe.contains(p)))
            .collect()
    }
}

fn build_ann_index(rows: &[VectorRow], dimension: usize) -> Result<AnnIndex> {
    let n = rows.len();
    let num_partitions = (n as f64).sqrt().round().clamp(1.0, 256.0) as usize;
    let num_sub_vectors = if dimension % 16 == 0 { dimension / 16 } else { dimension / 8 };

    // Seed centroids by evenly sampling the row set (a cheap stand-in for a
    // full k-means init), then run a handful of Lloyd iterations.
    let stride = (n / num_partitions).max(1);
    let mut centroids: Vec<Vec<f32>> = (0..num_partitions)
        .map(|i| rows[(i * stride).min(n - 1)].vector.clone())
        .collect();

    let mut assignments = HashMap::new();
    for _ in 0..4 {
        let mut sums = vec![vec![0f32; dimension]; num_partitions];
        let mut counts = vec![0usize; num_partitions];
        assignments.clear();

        for row in rows {
            let (best, _) = centroids
                .iter()
                .enumerate()
                .map(|(i, c)| (i, l2_distance(c, &row.vector)))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .ok_or_else(|| VectorStoreError::Other("no centroids".to_string()))?;
            assignments.insert(row.id.clone(), best);
            counts[best] += 1;
            for (s, v) in sums[best].iter_mut().zip(row.vector.iter()) {
                *s += v;
            }
        }

        for (i, centroid) in centroids.iter_mut().enumerate() {
            if counts[i] == 0 {
                continue;
            }
            for (c, s) in centroid.iter_mut().zip(sums[i].iter()) {
                *c = *s / counts[i] as f32;
            }
        }
    }

    Ok(AnnIndex {
        num_partitions,
        num_sub_vectors,
        centroids,
        assignments,
    })
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}

fn looks_like_chunk_id(id: &str) -> bool {
    let parts: Vec<&str> = id.split('-').collect();
    parts.len() == 5
        && parts[0].len() == 8
        && parts[1].len() == 4
        && parts[2].len() == 4
        && parts[3].len() == 4
        && parts[4].len() == 12
        && id.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

fn sanitize_like_pattern(pattern: &str) -> String {
    pattern
        .chars()
        .filter(|c| *c != '\0')
        .collect::<String>()
        .replace('\'', "")
        .replace(';', "")
        .replace("--", "")
        .replace("/*", "")
        .replace("*/", "")
}

fn load_state(dir: &Path, dimension: usize) -> Result<TableState> {
    let path = dir.join(DATA_FILE);
    if !path.exists() {
        return Ok(TableState {
            dimension,
            rows: Vec::new(),
            ann: None,
        });
    }
    match std::fs::read(&path) {
        Ok(bytes) => serde_json::from_slice(&bytes).or_else(|e| {
            log::warn!("vector store at {} is corrupt ({e}), backing up and starting empty", path.display());
            let _ = std::fs::rename(&path, dir.join(format!("{DATA_FILE}.bak")));
            Ok(TableState {
                dimension,
                rows: Vec::new(),
                ann: None,
            })
        }),
        Err(e) => Err(VectorStoreError::Io(e)),
    }
}

/// If a lockfile exists and names a pid that is no longer alive, remove it
/// and proceed. There remains an unavoidable TOCTOU window between this
/// check and the subsequent `acquire_lock` call; this is accepted because
/// the system targets one server process per project.
fn recover_stale_lock(dir: &Path) -> Result<()> {
    let lock_path = dir.join(LOCK_FILE);
    let Ok(contents) = std::fs::read_to_string(&lock_path) else {
        return Ok(());
    };
    let Ok(pid) = contents.trim().parse::<u32>() else {
        std::fs::remove_file(&lock_path)?;
        return Ok(());
    };
    if !process_is_alive(pid) {
        log::warn!("removing stale vector-store lockfile from dead pid {pid}");
        std::fs::remove_file(&lock_path)?;
    }
    Ok(())
}

fn acquire_lock(dir: &Path) -> Result<()> {
    std::fs::write(dir.join(LOCK_FILE), std::process::id().to_string())?;
    Ok(())
}

#[cfg(unix)]
fn process_is_alive(pid: u32) -> bool {
    // kill(pid, 0) checks existence/permission without sending a signal.
    unsafe { libc_kill(pid as i32, 0) == 0 }
}

#[cfg(not(unix))]
fn process_is_alive(_pid: u32) -> bool {
    // Without a portable process-liveness check, assume alive: recovery
    // falls back to "leave the lockfile, the operator can remove it".
    true
}

#[cfg(unix)]
extern "C" {
    #[link_name = "kill"]
    fn libc_kill(pid: i32, sig: i32) -> i32;
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_code_chunker::{ChunkMetadata, CodeChunk};

    fn make_chunk(path: &str, line: usize) -> CodeChunk {
        CodeChunk::new(path.to_string(), line, line, "fn f() {}".to_string(), ChunkMetadata::default())
    }

    #[tokio::test]
    async fn insert_then_search_returns_nearest_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path(), 3).await.unwrap();
        let chunk = make_chunk("a.rs", 1);
        let row = VectorRow::from_chunk(&chunk, vec![1.0, 0.0, 0.0], "hash".to_string());
        store.insert_batch(vec![row]).await.unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].distance < 1e-5);
    }

    #[tokio::test]
    async fn insert_rejects_zero_vector() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path(), 3).await.unwrap();
        let chunk = make_chunk("a.rs", 1);
        let row = VectorRow::from_chunk(&chunk, vec![0.0, 0.0, 0.0], "hash".to_string());
        assert!(store.insert_batch(vec![row]).await.is_err());
    }

    #[tokio::test]
    async fn insert_batch_is_idempotent_on_id_collision() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path(), 3).await.unwrap();
        let chunk = make_chunk("a.rs", 1);
        let row = VectorRow::from_chunk(&chunk, vec![1.0, 0.0, 0.0], "hash".to_string());
        store.insert_batch(vec![row.clone()]).await.unwrap();
        store.insert_batch(vec![row]).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn delete_by_path_removes_all_rows_for_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path(), 3).await.unwrap();
        let c1 = make_chunk("a.rs", 1);
        let c2 = make_chunk("a.rs", 2);
        store
            .insert_batch(vec![
                VectorRow::from_chunk(&c1, vec![1.0, 0.0, 0.0], "h1".to_string()),
                VectorRow::from_chunk(&c2, vec![0.0, 1.0, 0.0], "h2".to_string()),
            ])
            .await
            .unwrap();
        let removed = store.delete_by_path("a.rs").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn update_positions_retags_without_touching_the_vector() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path(), 3).await.unwrap();
        let original = make_chunk("a.rs", 1);
        let row = VectorRow::from_chunk(&original, vec![1.0, 0.0, 0.0], "h1".to_string());
        let chunk_hash = row.chunk_hash.clone();
        store.insert_batch(vec![row]).await.unwrap();

        let moved = make_chunk("a.rs", 40);
        let mut replacement = VectorRow::from_chunk(&moved, vec![9.9, 9.9, 9.9], "h2".to_string());
        replacement.chunk_hash = chunk_hash;
        let updated = store.update_positions(&[replacement]).await.unwrap();
        assert_eq!(updated, 1);

        let rows = store.all_chunks().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].start_line, 40);
        assert_eq!(rows[0].vector, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn sanitize_strips_sql_metacharacters() {
        let cleaned = sanitize_like_pattern("**/a';DROP--*/b\0.rs");
        assert!(!cleaned.contains('\''));
        assert!(!cleaned.contains(';'));
        assert!(!cleaned.contains('\0'));
    }
}

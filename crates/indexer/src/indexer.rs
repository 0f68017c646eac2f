use crate::manager::{FusedHit, IndexManager, SearchMode, TableKind};
use crate::stats::IndexStats;
use crate::{IndexerError, Result};
use context_fs::project_id::{default_state_root, resolve_index_dir};
use context_vector_store::{Embedder, Purpose};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Convenience wrapper most callers reach for: one project root, the code
/// and docs embedding pipelines, one [`IndexManager`] underneath.
pub struct ProjectIndexer {
    manager: IndexManager,
}

impl ProjectIndexer {
    pub async fn new(
        root: impl Into<PathBuf>,
        code_embedder: Arc<Embedder>,
        docs_embedder: Arc<Embedder>,
    ) -> Result<Self> {
        let root = root.into();
        let store_dir = store_dir_for(&root)?;
        let manager = IndexManager::open(root, store_dir, code_embedder, docs_embedder).await?;
        Ok(Self { manager })
    }

    pub async fn index(&self) -> Result<IndexStats> {
        self.manager.full_index().await
    }

    pub async fn reindex_file(&self, relative_path: &str) -> Result<()> {
        self.manager.reindex_file(relative_path).await
    }

    pub async fn delete_file(&self, relative_path: &str) -> Result<()> {
        self.manager.delete_file(relative_path).await
    }

    pub async fn search_code(
        &self,
        query: &str,
        top_k: usize,
        mode: SearchMode,
        alpha: f32,
    ) -> Result<(Vec<FusedHit>, Option<String>)> {
        self.search(TableKind::Code, query, top_k, mode, alpha).await
    }

    pub async fn search_docs(
        &self,
        query: &str,
        top_k: usize,
        mode: SearchMode,
        alpha: f32,
    ) -> Result<(Vec<FusedHit>, Option<String>)> {
        self.search(TableKind::Docs, query, top_k, mode, alpha).await
    }

    async fn search(
        &self,
        kind: TableKind,
        query: &str,
        top_k: usize,
        mode: SearchMode,
        alpha: f32,
    ) -> Result<(Vec<FusedHit>, Option<String>)> {
        let embedder = match kind {
            TableKind::Code => self.manager.code_embedder(),
            TableKind::Docs => self.manager.docs_embedder(),
        };
        let vector = if matches!(mode, SearchMode::Hybrid | SearchMode::Vector) {
            embedder
                .embed(query, Purpose::Query)
                .await
                .map_err(|e| IndexerError::Other(format!("query embedding failed: {e}")))?
        } else {
            Vec::new()
        };
        self.manager.search(kind, query, &vector, top_k, mode, alpha).await
    }

    #[must_use]
    pub fn manager(&self) -> &IndexManager {
        &self.manager
    }
}

/// Resolves the on-disk store directory for a project root: the state root
/// (`$CONTEXT_FINDER_HOME` or `~/.context-finder`) joined with the project's
/// hash directory, preferring an existing legacy directory over creating a
/// new one. Canonicalizes `root` first so the same project always hashes to
/// the same directory regardless of how it was referenced.
pub fn store_dir_for(root: &Path) -> Result<PathBuf> {
    let canonical = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let canonical_str = canonical.to_string_lossy().replace('\\', "/");
    Ok(resolve_index_dir(&default_state_root(), &canonical_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_fs::project_id::project_hash32;

    #[test]
    fn store_dir_lives_under_the_state_root_hashed_by_canonical_path() {
        std::env::set_var("CONTEXT_FINDER_HOME", "/tmp/context-finder-state-root-test");
        let root = Path::new("/tmp/context-finder-state-root-test-does-not-exist");
        let expected_hash = project_hash32(&root.to_string_lossy());
        let resolved = store_dir_for(root).unwrap();
        assert_eq!(resolved, Path::new("/tmp/context-finder-state-root-test").join(expected_hash));
        std::env::remove_var("CONTEXT_FINDER_HOME");
    }
}

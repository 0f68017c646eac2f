use crate::error::{IndexerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Cap on the persisted fingerprints file; past this we treat it the same
/// as a corrupt file rather than risk loading something pathological.
const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct FileDelta {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

/// In-memory `relativePath -> SHA-256(bytes)` map, persisted atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FingerprintsStore {
    fingerprints: HashMap<String, String>,
}

impl FingerprintsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, relative_path: &str) -> Option<&str> {
        self.fingerprints.get(relative_path).map(String::as_str)
    }

    pub fn set(&mut self, relative_path: String, hash: String) {
        self.fingerprints.insert(relative_path, hash);
    }

    pub fn remove(&mut self, relative_path: &str) {
        self.fingerprints.remove(relative_path);
    }

    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let meta = tokio::fs::metadata(path).await?;
        if meta.len() > MAX_FILE_BYTES {
            return Err(IndexerError::Other(format!(
                "fingerprints file exceeds {MAX_FILE_BYTES} bytes"
            )));
        }
        let bytes = tokio::fs::read(path).await?;
        match serde_json::from_slice(&bytes) {
            Ok(store) => Ok(store),
            Err(e) => {
                log::warn!(
                    "fingerprints file at {} is corrupt ({e}), backing up and starting empty",
                    path.display()
                );
                let backup = path.with_extension("json.bak");
                let _ = tokio::fs::rename(path, &backup).await;
                Ok(Self::default())
            }
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(self)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Hashes the current files in parallel (bounded worker pool via
    /// `spawn_blocking`) and diffs against the stored fingerprints.
    pub async fn delta(&self, current_files: &[(String, std::path::PathBuf)]) -> Result<FileDelta> {
        const MAX_CONCURRENT: usize = 16;
        let mut seen = std::collections::HashSet::new();
        let mut hashes: HashMap<String, String> = HashMap::new();

        for batch in current_files.chunks(MAX_CONCURRENT) {
            let mut tasks = Vec::with_capacity(batch.len());
            for (rel, abs) in batch {
                let rel = rel.clone();
                let abs = abs.clone();
                tasks.push(tokio::task::spawn_blocking(move || {
                    std::fs::read(&abs).ok().map(|bytes| (rel, context_fs::hash::content_hash(&bytes)))
                }));
            }
            for task in tasks {
                if let Ok(Some((rel, hash))) = task.await {
                    hashes.insert(rel, hash);
                }
            }
        }

        let mut delta = FileDelta::default();
        for (rel, hash) in &hashes {
            seen.insert(rel.clone());
            match self.fingerprints.get(rel) {
                None => delta.added.push(rel.clone()),
                Some(old) if old != hash => delta.modified.push(rel.clone()),
                _ => {}
            }
        }
        for rel in self.fingerprints.keys() {
            if !seen.contains(rel) {
                delta.removed.push(rel.clone());
            }
        }
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fingerprints.json");
        let mut store = FingerprintsStore::new();
        store.set("a.rs".to_string(), "abc".to_string());
        store.save(&path).await.unwrap();

        let loaded = FingerprintsStore::load(&path).await.unwrap();
        assert_eq!(loaded.get("a.rs"), Some("abc"));
    }

    #[tokio::test]
    async fn delta_detects_added_modified_removed() {
        let dir = tempfile::tempdir().unwrap();
        let file_a = dir.path().join("a.rs");
        std::fs::write(&file_a, "fn a() {}").unwrap();

        let mut store = FingerprintsStore::new();
        store.set("b.rs".to_string(), "stale-hash".to_string());

        let delta = store
            .delta(&[("a.rs".to_string(), file_a)])
            .await
            .unwrap();
        assert_eq!(delta.added, vec!["a.rs".to_string()]);
        assert_eq!(delta.removed, vec!["b.rs".to_string()]);
    }
}

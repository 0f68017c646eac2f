use crate::error::{IndexerError, Result};
use context_vector_store::Device;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const METADATA_FILE_NAME: &str = "metadata.json";
pub const METADATA_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddingModelInfo {
    pub model_id: String,
    pub dimension: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatsSnapshot {
    pub code_chunks: usize,
    pub docs_chunks: usize,
    pub files_indexed: usize,
}

impl Default for IndexStatsSnapshot {
    fn default() -> Self {
        Self {
            code_chunks: 0,
            docs_chunks: 0,
            files_indexed: 0,
        }
    }
}

/// Everything spec §3's Metadata entity requires: schema version, timestamps,
/// stats, the model/dimension each table was built with, the vector-index
/// descriptor, and compute device. Written atomically after every phase that
/// touches the index (full index, reindex, delete), same as [`crate::health`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub schema_version: u32,
    pub created_unix_ms: u64,
    pub updated_unix_ms: u64,
    pub stats: IndexStatsSnapshot,
    pub code_model: EmbeddingModelInfo,
    pub docs_model: EmbeddingModelInfo,
    pub vector_index_descriptor: String,
    pub compute_device: String,
}

impl IndexMetadata {
    #[must_use]
    pub fn new(code_model: EmbeddingModelInfo, docs_model: EmbeddingModelInfo, device: Device) -> Self {
        let now = unix_now_ms();
        Self {
            schema_version: METADATA_SCHEMA_VERSION,
            created_unix_ms: now,
            updated_unix_ms: now,
            stats: IndexStatsSnapshot::default(),
            code_model,
            docs_model,
            vector_index_descriptor: "brute-force/ivf".to_string(),
            compute_device: device.as_str().to_string(),
        }
    }

    pub fn touch(&mut self, stats: IndexStatsSnapshot) {
        self.stats = stats;
        self.updated_unix_ms = unix_now_ms();
    }

    /// Compares the recorded code/docs model identifiers and dimensions
    /// against the currently configured pipeline, per spec §4.7's
    /// "Compatibility check". `table` names which side mismatched, so the
    /// error message can point at the right table.
    pub fn check_compatible(&self, code: &EmbeddingModelInfo, docs: &EmbeddingModelInfo) -> Result<()> {
        if &self.code_model != code {
            return Err(IndexerError::ModelMismatch {
                recorded: format!("{} ({}d)", self.code_model.model_id, self.code_model.dimension),
                current: format!("{} ({}d)", code.model_id, code.dimension),
            });
        }
        if &self.docs_model != docs {
            return Err(IndexerError::ModelMismatch {
                recorded: format!("{} ({}d)", self.docs_model.model_id, self.docs_model.dimension),
                current: format!("{} ({}d)", docs.model_id, docs.dimension),
            });
        }
        Ok(())
    }
}

#[must_use]
pub fn metadata_file_path(store_dir: &Path) -> PathBuf {
    store_dir.join(METADATA_FILE_NAME)
}

pub async fn write_metadata(store_dir: &Path, metadata: &IndexMetadata) -> Result<()> {
    tokio::fs::create_dir_all(store_dir).await?;
    let path = metadata_file_path(store_dir);
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(metadata)?).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
}

/// Returns `None` if no metadata has ever been written (fresh index).
/// A corrupt file is backed up and treated the same as missing, so a fresh
/// index run can recreate it rather than fail outright.
pub async fn read_metadata(store_dir: &Path) -> Result<Option<IndexMetadata>> {
    let path = metadata_file_path(store_dir);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = tokio::fs::read(&path).await?;
    match serde_json::from_slice(&bytes) {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) => {
            log::warn!("metadata file at {} is corrupt ({e}), backing up and starting fresh", path.display());
            let backup = path.with_extension("json.bak");
            let _ = tokio::fs::rename(&path, &backup).await;
            Ok(None)
        }
    }
}

fn unix_now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str, dim: usize) -> EmbeddingModelInfo {
        EmbeddingModelInfo {
            model_id: id.to_string(),
            dimension: dim,
        }
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = IndexMetadata::new(model("bge-small-en", 384), model("bge-base-en", 768), Device::Cpu);
        write_metadata(dir.path(), &metadata).await.unwrap();

        let loaded = read_metadata(dir.path()).await.unwrap().unwrap();
        assert_eq!(loaded.code_model.dimension, 384);
        assert_eq!(loaded.docs_model.dimension, 768);
    }

    #[test]
    fn compatibility_check_fails_on_dimension_drift() {
        let metadata = IndexMetadata::new(model("bge-small-en", 384), model("bge-base-en", 768), Device::Cpu);
        let err = metadata.check_compatible(&model("bge-small-en", 512), &model("bge-base-en", 768));
        assert!(matches!(err, Err(IndexerError::ModelMismatch { .. })));
    }

    #[test]
    fn compatibility_check_passes_when_unchanged() {
        let metadata = IndexMetadata::new(model("bge-small-en", 384), model("bge-base-en", 768), Device::Cpu);
        assert!(metadata.check_compatible(&model("bge-small-en", 384), &model("bge-base-en", 768)).is_ok());
    }
}

use crate::error::{Result, VectorStoreError};
use ndarray::{Array2, ArrayView2, Axis};
use ort::execution_providers::{CPUExecutionProvider, DirectMLExecutionProvider};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::Tokenizer;
use tokio::sync::OnceCell;

/// Either embedding pipeline's purpose: queries get the search-instruction
/// prefix, documents go in raw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Purpose {
    Query,
    Document,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    Cpu,
    DirectMl,
}

impl Device {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::DirectMl => "directml",
        }
    }
}

const QUERY_PREFIX: &str = "Represent this sentence for searching relevant passages: ";
const BATCH_SIZE_GPU: usize = 64;
const BATCH_SIZE_CPU: usize = 32;

#[derive(Clone, Debug)]
pub struct EmbedderConfig {
    pub model_id: String,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub dimension: usize,
}

struct LoadedModel {
    session: Session,
    tokenizer: Tokenizer,
    device: Device,
}

/// One of the two singleton embedding pipelines (code/docs). Model load is
/// atomic: concurrent first callers share a single in-flight init future via
/// `OnceCell::get_or_try_init`, and a failed init leaves the cell empty so a
/// later call retries instead of being poisoned forever.
pub struct Embedder {
    config: EmbedderConfig,
    model: OnceCell<Arc<LoadedModel>>,
}

impl Embedder {
    #[must_use]
    pub fn new(config: EmbedderConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.config.model_id
    }

    pub async fn device(&self) -> Result<Device> {
        Ok(self.ensure_loaded().await?.device)
    }

    pub async fn embed(&self, text: &str, purpose: Purpose) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()], purpose).await?;
        Ok(out.pop().unwrap_or_default())
    }

    pub async fn embed_batch(&self, texts: &[String], purpose: Purpose) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.ensure_loaded().await?;
        let batch_size = match model.device {
            Device::Cpu => BATCH_SIZE_CPU,
            Device::DirectMl => BATCH_SIZE_GPU,
        };

        let mut out = Vec::with_capacity(texts.len());
        for group in texts.chunks(batch_size) {
            let prepared: Vec<String> = group
                .iter()
                .map(|t| match purpose {
                    Purpose::Query => format!("{QUERY_PREFIX}{t}"),
                    Purpose::Document => t.clone(),
                })
                .collect();
            out.extend(run_batch(&model, &prepared, self.config.dimension)?);
        }
        Ok(out)
    }

    async fn ensure_loaded(&self) -> Result<Arc<LoadedModel>> {
        self.model
            .get_or_try_init(|| load_model(&self.config))
            .await
            .cloned()
    }
}

async fn load_model(config: &EmbedderConfig) -> Result<Arc<LoadedModel>> {
    let (session, device) = build_session(&config.model_path)?;
    let tokenizer = Tokenizer::from_file(&config.tokenizer_path)
        .map_err(|e| VectorStoreError::ModelUnavailable(format!("tokenizer load failed: {e}")))?;
    log::info!(
        "loaded embedding model {} on {} ({}d)",
        config.model_id,
        device.as_str(),
        config.dimension
    );
    Ok(Arc::new(LoadedModel {
        session,
        tokenizer,
        device,
    }))
}

/// Device order per spec: Windows tries DirectML first, falling back to CPU
/// on any GPU init failure; macOS/Linux go straight to CPU.
fn build_session(model_path: &Path) -> Result<(Session, Device)> {
    if cfg!(windows) {
        let directml = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_execution_providers([DirectMLExecutionProvider::default().build()]))
            .and_then(|b| b.commit_from_file(model_path));
        match directml {
            Ok(session) => return Ok((session, Device::DirectMl)),
            Err(e) => log::warn!("DirectML init failed ({e}), falling back to CPU"),
        }
    }

    let session = Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_execution_providers([CPUExecutionProvider::default().build()]))
        .and_then(|b| b.commit_from_file(model_path))
        .map_err(|e| VectorStoreError::ModelUnavailable(format!("ONNX session init failed: {e}")))?;
    Ok((session, Device::Cpu))
}

fn run_batch(model: &LoadedModel, texts: &[String], dimension: usize) -> Result<Vec<Vec<f32>>> {
    let encodings = model
        .tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| VectorStoreError::EmbeddingError(format!("tokenization failed: {e}")))?;

    let max_len = encodings.iter().map(|e| e.len()).max().unwrap_or(1).max(1);
    let batch = encodings.len();

    let mut ids = Array2::<i64>::zeros((batch, max_len));
    let mut mask = Array2::<i64>::zeros((batch, max_len));
    for (row, enc) in encodings.iter().enumerate() {
        for (col, &id) in enc.get_ids().iter().enumerate() {
            ids[[row, col]] = i64::from(id);
            mask[[row, col]] = 1;
        }
    }

    let input_ids = Value::from_array(ids)
        .map_err(|e| VectorStoreError::EmbeddingError(format!("input tensor build failed: {e}")))?;
    let attention_mask = Value::from_array(mask.clone())
        .map_err(|e| VectorStoreError::EmbeddingError(format!("mask tensor build failed: {e}")))?;

    let outputs = model
        .session
        .run(ort::inputs![
            "input_ids" => input_ids,
            "attention_mask" => attention_mask,
        ])
        .map_err(|e| VectorStoreError::EmbeddingError(format!("inference failed: {e}")))?;

    let (shape, data) = outputs[0]
        .try_extract_raw_tensor::<f32>()
        .map_err(|e| VectorStoreError::EmbeddingError(format!("output extraction failed: {e}")))?;

    // [batch, seq_len, hidden] token embeddings; mean-pool over the sequence
    // axis using the attention mask, then L2-normalize each row.
    let hidden = shape
        .last()
        .copied()
        .ok_or_else(|| VectorStoreError::EmbeddingError("empty output shape".to_string()))? as usize;
    let seq_len = if shape.len() >= 2 { shape[shape.len() - 2] as usize } else { max_len };
    let token_embeddings = ArrayView2::from_shape((batch * seq_len, hidden), data)
        .map_err(|e| VectorStoreError::EmbeddingError(format!("reshape failed: {e}")))?;

    let mut pooled = Vec::with_capacity(batch);
    for row in 0..batch {
        let mut sum = vec![0f32; hidden];
        let mut count = 0f32;
        for col in 0..seq_len {
            if mask[[row, col]] == 0 {
                continue;
            }
            let token_row = token_embeddings.index_axis(Axis(0), row * seq_len + col);
            for (s, v) in sum.iter_mut().zip(token_row.iter()) {
                *s += v;
            }
            count += 1.0;
        }
        if count > 0.0 {
            for v in &mut sum {
                *v /= count;
            }
        }
        l2_normalize(&mut sum);
        sum.truncate(dimension);
        pooled.push(sum);
    }
    Ok(pooled)
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_prefix_is_applied_only_for_queries() {
        assert!(QUERY_PREFIX.ends_with(": "));
    }

    #[test]
    fn l2_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm = (v[0] * v[0] + v[1] * v[1]).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}

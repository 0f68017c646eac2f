use context_vector_store::EmbedderConfig;
use std::path::PathBuf;

/// Code- and docs-pipeline defaults, matching the dimensions recorded
/// throughout the indexer's own tests: a small 384-d model for code, a
/// larger 768-d model for prose.
const CODE_MODEL_ID: &str = "bge-small-en";
const DOCS_MODEL_ID: &str = "bge-base-en";
const CODE_DIMENSION: usize = 384;
const DOCS_DIMENSION: usize = 768;

/// Resolves the directory holding `<model-id>/model.onnx` +
/// `<model-id>/tokenizer.json` pairs: `$CONTEXT_FINDER_MODEL_DIR` if set,
/// otherwise `./models` relative to the current working directory.
#[must_use]
pub fn resolve_model_dir() -> PathBuf {
    std::env::var_os("CONTEXT_FINDER_MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("models"))
}

fn config_for(model_dir: &std::path::Path, model_id: &str, dimension: usize) -> EmbedderConfig {
    let dir = model_dir.join(model_id);
    EmbedderConfig {
        model_id: model_id.to_string(),
        model_path: dir.join("model.onnx"),
        tokenizer_path: dir.join("tokenizer.json"),
        dimension,
    }
}

/// Default code/docs embedder configs rooted at `model_dir`.
#[must_use]
pub fn default_embedder_configs(model_dir: &std::path::Path) -> (EmbedderConfig, EmbedderConfig) {
    (
        config_for(model_dir, CODE_MODEL_ID, CODE_DIMENSION),
        config_for(model_dir, DOCS_MODEL_ID, DOCS_DIMENSION),
    )
}

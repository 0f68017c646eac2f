use crate::error::{CoreError, CoreErrorKind, Result};
use context_code_chunker::ChunkingStrategy;
use context_fs::filter::FilterConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";

fn default_include() -> Vec<String> {
    vec!["**/*".to_string()]
}

fn default_doc_patterns() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

fn default_max_file_size() -> String {
    "1MB".to_string()
}

fn default_max_files() -> usize {
    50_000
}

fn default_true() -> bool {
    true
}

fn default_chunking_strategy() -> String {
    "code-aware".to_string()
}

fn default_fts_engine() -> String {
    "auto".to_string()
}

fn default_alpha() -> f32 {
    0.5
}

fn default_max_expansion_terms() -> usize {
    10
}

fn default_check_every_n_searches() -> u64 {
    10
}

fn default_max_auto_reindex_files() -> usize {
    5
}

fn default_staleness_threshold_ms() -> u64 {
    300_000
}

fn default_indexing_strategy() -> String {
    "realtime".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridSearchSettings {
    pub enabled: bool,
    #[serde(rename = "ftsEngine")]
    pub fts_engine: String,
    #[serde(rename = "defaultAlpha")]
    pub default_alpha: f32,
}

impl Default for HybridSearchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            fts_engine: default_fts_engine(),
            default_alpha: default_alpha(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryExpansionSettings {
    pub enabled: bool,
    #[serde(rename = "maxExpansionTerms")]
    pub max_expansion_terms: usize,
}

impl Default for QueryExpansionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_expansion_terms: default_max_expansion_terms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoReindexSettings {
    pub enabled: bool,
    #[serde(rename = "checkEveryNSearches")]
    pub check_every_n_searches: u64,
    #[serde(rename = "maxAutoReindexFiles")]
    pub max_auto_reindex_files: usize,
    #[serde(rename = "stalenessThresholdMs")]
    pub staleness_threshold_ms: u64,
}

impl Default for AutoReindexSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            check_every_n_searches: default_check_every_n_searches(),
            max_auto_reindex_files: default_max_auto_reindex_files(),
            staleness_threshold_ms: default_staleness_threshold_ms(),
        }
    }
}

/// The project's `config.json`: spec §6's full 15-key table. `FilterConfig`
/// (used by the scanner) only covers four of these; this is the struct that
/// owns all of them and derives the narrower structs each lower crate wants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(rename = "respectGitignore", default = "default_true")]
    pub respect_gitignore: bool,
    #[serde(rename = "maxFileSize", default = "default_max_file_size")]
    pub max_file_size: String,
    #[serde(rename = "maxFiles", default = "default_max_files")]
    pub max_files: usize,
    #[serde(rename = "docPatterns", default = "default_doc_patterns")]
    pub doc_patterns: Vec<String>,
    #[serde(rename = "indexDocs", default = "default_true")]
    pub index_docs: bool,
    #[serde(rename = "extractComments", default = "default_true")]
    pub extract_comments: bool,
    #[serde(rename = "chunkingStrategy", default = "default_chunking_strategy")]
    pub chunking_strategy: String,
    #[serde(rename = "hybridSearch")]
    pub hybrid_search: HybridSearchSettings,
    #[serde(rename = "queryExpansion")]
    pub query_expansion: QueryExpansionSettings,
    #[serde(rename = "autoReindex")]
    pub auto_reindex: AutoReindexSettings,
    #[serde(rename = "indexingStrategy", default = "default_indexing_strategy")]
    pub indexing_strategy: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: Vec::new(),
            respect_gitignore: true,
            max_file_size: default_max_file_size(),
            max_files: default_max_files(),
            doc_patterns: default_doc_patterns(),
            index_docs: true,
            extract_comments: true,
            chunking_strategy: default_chunking_strategy(),
            hybrid_search: HybridSearchSettings::default(),
            query_expansion: QueryExpansionSettings::default(),
            auto_reindex: AutoReindexSettings::default(),
            indexing_strategy: default_indexing_strategy(),
        }
    }
}

impl ProjectConfig {
    #[must_use]
    pub fn config_path(store_dir: &Path) -> PathBuf {
        store_dir.join(CONFIG_FILE_NAME)
    }

    /// Loads `config.json` from `store_dir`, falling back to defaults if the
    /// file doesn't exist yet (a project is always indexable before its
    /// first `createIndex`).
    pub async fn load_or_default(store_dir: &Path) -> Result<Self> {
        let path = Self::config_path(store_dir);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn save(&self, store_dir: &Path) -> Result<()> {
        let path = Self::config_path(store_dir);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    /// Parses `maxFileSize` (`"1MB"`, `"512KB"`, or a bare byte count) into
    /// bytes, falling back to [`FilterConfig`]'s own default on a malformed
    /// value rather than failing the whole config load over one bad key.
    #[must_use]
    pub fn max_file_size_bytes(&self) -> u64 {
        parse_size(&self.max_file_size).unwrap_or_else(|| FilterConfig::default().max_file_size)
    }

    /// Derives the narrower [`FilterConfig`] the scanner actually consumes.
    #[must_use]
    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            respect_gitignore: self.respect_gitignore,
            max_file_size: self.max_file_size_bytes(),
        }
    }

    /// Maps the `chunkingStrategy` key to the chunker's own enum, defaulting
    /// to `CodeAware` for an unrecognized value.
    #[must_use]
    pub fn chunking_strategy(&self) -> ChunkingStrategy {
        match self.chunking_strategy.as_str() {
            "character" => ChunkingStrategy::Character,
            "ast" => ChunkingStrategy::Ast,
            _ => ChunkingStrategy::CodeAware,
        }
    }
}

fn parse_size(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let (number, multiplier) = if let Some(prefix) = trimmed.strip_suffix("KB").or_else(|| trimmed.strip_suffix("kb")) {
        (prefix, 1024)
    } else if let Some(prefix) = trimmed.strip_suffix("MB").or_else(|| trimmed.strip_suffix("mb")) {
        (prefix, 1024 * 1024)
    } else if let Some(prefix) = trimmed.strip_suffix("GB").or_else(|| trimmed.strip_suffix("gb")) {
        (prefix, 1024 * 1024 * 1024)
    } else {
        (trimmed, 1)
    };
    number.trim().parse::<u64>().ok().map(|n| n * multiplier)
}

/// Validates a `searchByPath` glob up front so a bad pattern fails with
/// [`CoreErrorKind::InvalidPattern`] instead of a lower-level error type.
pub fn compile_path_glob(pattern: &str) -> Result<globset::GlobMatcher> {
    globset::Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|err| CoreError::new(CoreErrorKind::InvalidPattern, format!("invalid glob pattern: {pattern}")).with_detail(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_config_table() {
        let config = ProjectConfig::default();
        assert_eq!(config.include, vec!["**/*"]);
        assert!(config.respect_gitignore);
        assert_eq!(config.max_files, 50_000);
        assert_eq!(config.hybrid_search.default_alpha, 0.5);
        assert_eq!(config.query_expansion.max_expansion_terms, 10);
        assert_eq!(config.auto_reindex.max_auto_reindex_files, 5);
        assert_eq!(config.indexing_strategy, "realtime");
    }

    #[test]
    fn parses_human_readable_file_sizes() {
        assert_eq!(parse_size("1MB"), Some(1024 * 1024));
        assert_eq!(parse_size("512KB"), Some(512 * 1024));
        assert_eq!(parse_size("2GB"), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_size("bogus"), None);
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ProjectConfig::default();
        config.max_files = 1234;
        config.save(dir.path()).await.unwrap();

        let loaded = ProjectConfig::load_or_default(dir.path()).await.unwrap();
        assert_eq!(loaded.max_files, 1234);
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ProjectConfig::load_or_default(dir.path()).await.unwrap();
        assert_eq!(loaded.max_files, ProjectConfig::default().max_files);
    }
}
